use actix_web::{post, get, web, HttpRequest, HttpResponse};
use actix_web::cookie::{time::Duration as DureeCookie, Cookie, SameSite};
use sea_orm::{DatabaseConnection, EntityTrait, QueryFilter, ColumnTrait, Set, ActiveModelTrait};
use chrono::Utc;
use validator::Validate;

use crate::models::dto::{
    erreurs_validation, LoginRequest, RefreshRequest, RegisterRequest, UserResponse,
};
use crate::models::users::{self, Entity as Users, Column as UserColumn, Role, StatutCompte};
use crate::middleware::AuthUser;
use crate::routes::reponse_erreur_bd;
use crate::utils::{jwt, password};

/// Construit les deux cookies de session (httpOnly, SameSite=Lax).
/// Les tokens sont aussi renvoyés dans le corps JSON pour les clients
/// sans cookies (application mobile).
fn cookies_de_session(token: &str, refresh_token: &str) -> (Cookie<'static>, Cookie<'static>) {
    let cookie_acces = Cookie::build("token", token.to_string())
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(DureeCookie::minutes(15))
        .finish();

    let cookie_refresh = Cookie::build("refreshToken", refresh_token.to_string())
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(DureeCookie::days(7))
        .finish();

    (cookie_acces, cookie_refresh)
}

/// Cookies vidés et expirés, pour le logout
fn cookies_expires() -> (Cookie<'static>, Cookie<'static>) {
    let cookie_acces = Cookie::build("token", "")
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(DureeCookie::ZERO)
        .finish();

    let cookie_refresh = Cookie::build("refreshToken", "")
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(DureeCookie::ZERO)
        .finish();

    (cookie_acces, cookie_refresh)
}

fn reponse_identifiants_invalides() -> HttpResponse {
    HttpResponse::Unauthorized().json(serde_json::json!({
        "success": false,
        "error": { "code": "NON_AUTORISE", "message": "Email ou mot de passe incorrect" }
    }))
}

fn reponse_token_expire() -> HttpResponse {
    HttpResponse::Unauthorized().json(serde_json::json!({
        "success": false,
        "error": { "code": "TOKEN_EXPIRE", "message": "Session expirée, veuillez vous reconnecter" }
    }))
}

/// Le refresh token présenté n'est valable que s'il correspond exactement au
/// token stocké pour l'utilisateur : chaque rotation remplace le token
/// stocké, donc tout token antérieur cesse de correspondre (session unique).
fn refresh_correspond(stocke: Option<&str>, presente: &str) -> bool {
    stocke == Some(presente)
}

/// POST /auth/register - Créer un compte passager (PUBLIC)
#[post("/register")]
pub async fn register(
    body: web::Json<RegisterRequest>,
    db: web::Data<DatabaseConnection>,
) -> HttpResponse {
    // 1. Valider le DTO
    if let Err(erreurs) = body.validate() {
        return HttpResponse::BadRequest().json(erreurs_validation(&erreurs));
    }

    // 2. Vérifier que l'email est libre
    let existant = Users::find()
        .filter(UserColumn::Email.eq(&body.email))
        .one(db.get_ref())
        .await;

    match existant {
        Ok(Some(_)) => {
            return HttpResponse::Conflict().json(serde_json::json!({
                "success": false,
                "error": { "code": "CONFLIT", "message": "Un compte existe déjà avec cet email" }
            }));
        }
        Err(e) => return reponse_erreur_bd(e),
        _ => {}
    }

    // 3. Hasher le mot de passe
    let password_hash = match password::hash_password(&body.password) {
        Ok(hash) => hash,
        Err(e) => {
            eprintln!("❌ Failed to hash password: {}", e);
            return HttpResponse::InternalServerError().json(serde_json::json!({
                "success": false,
                "error": { "code": "ERREUR_SERVEUR", "message": "Erreur interne du serveur" }
            }));
        }
    };

    // 4. Créer l'utilisateur (toujours passager à l'inscription)
    let nouveau = users::ActiveModel {
        nom: Set(body.nom.clone()),
        prenom: Set(body.prenom.clone()),
        email: Set(body.email.clone()),
        telephone: Set(body.telephone.clone()),
        password_hash: Set(password_hash),
        role: Set(Role::Passager.as_str().to_string()),
        statut: Set(StatutCompte::Actif.as_str().to_string()),
        refresh_token: Set(None),
        photo_url: Set(None),
        created_at: Set(Some(Utc::now().naive_utc())),
        ..Default::default()
    };

    let user = match nouveau.insert(db.get_ref()).await {
        Ok(user) => user,
        Err(e) => return reponse_erreur_bd(e),
    };

    // 5. Émettre la paire de tokens et persister le refresh token
    emettre_session(db.get_ref(), user, true).await
}

/// POST /auth/login - Se connecter (PUBLIC)
#[post("/login")]
pub async fn login(
    body: web::Json<LoginRequest>,
    db: web::Data<DatabaseConnection>,
) -> HttpResponse {
    // 1. Trouver l'utilisateur
    let user = match Users::find()
        .filter(UserColumn::Email.eq(&body.email))
        .one(db.get_ref())
        .await
    {
        Ok(Some(user)) => user,
        Ok(None) => return reponse_identifiants_invalides(),
        Err(e) => return reponse_erreur_bd(e),
    };

    // 2. Vérifier le mot de passe
    match password::verify_password(&body.password, &user.password_hash) {
        Ok(true) => {}
        Ok(false) => return reponse_identifiants_invalides(),
        Err(e) => {
            eprintln!("❌ Password verification error: {}", e);
            return reponse_identifiants_invalides();
        }
    }

    // 3. Refuser les comptes suspendus
    if user.statut == StatutCompte::Suspendu.as_str() {
        return HttpResponse::Forbidden().json(serde_json::json!({
            "success": false,
            "error": { "code": "ACCES_REFUSE", "message": "Ce compte est suspendu" }
        }));
    }

    emettre_session(db.get_ref(), user, false).await
}

/// POST /auth/refresh - Échanger un refresh token contre une nouvelle paire (PUBLIC)
///
/// Le token est accepté dans le corps JSON (clients mobiles) ou dans le
/// cookie refreshToken (navigateurs). Un token réémis ou inconnu est traité
/// comme expiré : la rotation n'admet qu'une seule session active.
#[post("/refresh")]
pub async fn refresh(
    req: HttpRequest,
    body: Option<web::Json<RefreshRequest>>,
    db: web::Data<DatabaseConnection>,
) -> HttpResponse {
    // 1. Récupérer le token présenté (corps prioritaire sur cookie)
    let presente = body
        .and_then(|b| b.refresh_token.clone())
        .or_else(|| req.cookie("refreshToken").map(|c| c.value().to_string()));

    let presente = match presente {
        Some(t) if !t.is_empty() => t,
        _ => {
            return HttpResponse::Unauthorized().json(serde_json::json!({
                "success": false,
                "error": { "code": "NON_AUTORISE", "message": "Refresh token manquant" }
            }));
        }
    };

    // 2. Vérifier signature et expiration
    let claims = match jwt::verify_refresh_token(&presente) {
        Ok(claims) => claims,
        Err(_) => return reponse_token_expire(),
    };

    // 3. Charger l'utilisateur et exiger une correspondance exacte avec le
    //    token stocké : tout décalage (rotation déjà consommée, logout)
    //    invalide la session
    let user = match Users::find_by_id(claims.sub).one(db.get_ref()).await {
        Ok(Some(user)) => user,
        Ok(None) => return reponse_token_expire(),
        Err(e) => return reponse_erreur_bd(e),
    };

    if !refresh_correspond(user.refresh_token.as_deref(), &presente) {
        return reponse_token_expire();
    }

    if user.statut == StatutCompte::Suspendu.as_str() {
        return HttpResponse::Forbidden().json(serde_json::json!({
            "success": false,
            "error": { "code": "ACCES_REFUSE", "message": "Ce compte est suspendu" }
        }));
    }

    // 4. Émettre la nouvelle paire ; le nouveau refresh token remplace
    //    l'ancien en base (rotation)
    emettre_session(db.get_ref(), user, false).await
}

/// POST /auth/logout - Invalider la session (PROTÉGÉE)
#[post("/logout")]
pub async fn logout(auth_user: AuthUser, db: web::Data<DatabaseConnection>) -> HttpResponse {
    let user = match Users::find_by_id(auth_user.user_id).one(db.get_ref()).await {
        Ok(Some(user)) => user,
        Ok(None) => return crate::routes::reponse_introuvable("Utilisateur introuvable"),
        Err(e) => return reponse_erreur_bd(e),
    };

    let mut active: users::ActiveModel = user.into();
    active.refresh_token = Set(None);
    if let Err(e) = active.update(db.get_ref()).await {
        return reponse_erreur_bd(e);
    }

    let (cookie_acces, cookie_refresh) = cookies_expires();
    HttpResponse::Ok()
        .cookie(cookie_acces)
        .cookie(cookie_refresh)
        .json(serde_json::json!({
            "success": true,
            "data": { "message": "Déconnecté" }
        }))
}

/// GET /auth/me - Profil de l'utilisateur authentifié (PROTÉGÉE)
#[get("/me")]
pub async fn me(auth_user: AuthUser, db: web::Data<DatabaseConnection>) -> HttpResponse {
    match Users::find_by_id(auth_user.user_id).one(db.get_ref()).await {
        Ok(Some(user)) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "data": UserResponse::from(user)
        })),
        Ok(None) => crate::routes::reponse_introuvable("Utilisateur introuvable"),
        Err(e) => reponse_erreur_bd(e),
    }
}

/// Génère la paire access/refresh pour un utilisateur, remplace le refresh
/// token stocké (chaque refresh invalide tous les précédents) et construit
/// la réponse : cookies + corps JSON.
async fn emettre_session(
    db: &DatabaseConnection,
    user: users::Model,
    creation: bool,
) -> HttpResponse {
    // Les claims sont re-dérivés de la ligne utilisateur, jamais du client
    let role = match Role::from_str(&user.role) {
        Some(role) => role,
        None => {
            eprintln!("❌ Unknown role in database for user {}: {}", user.id, user.role);
            return HttpResponse::InternalServerError().json(serde_json::json!({
                "success": false,
                "error": { "code": "ERREUR_SERVEUR", "message": "Erreur interne du serveur" }
            }));
        }
    };

    let token = match jwt::generate_access_token(user.id, &user.email, role) {
        Ok(token) => token,
        Err(e) => {
            eprintln!("❌ Failed to generate access token: {}", e);
            return HttpResponse::InternalServerError().json(serde_json::json!({
                "success": false,
                "error": { "code": "ERREUR_SERVEUR", "message": "Erreur interne du serveur" }
            }));
        }
    };

    let refresh_token = match jwt::generate_refresh_token(user.id, &user.email, role) {
        Ok(token) => token,
        Err(e) => {
            eprintln!("❌ Failed to generate refresh token: {}", e);
            return HttpResponse::InternalServerError().json(serde_json::json!({
                "success": false,
                "error": { "code": "ERREUR_SERVEUR", "message": "Erreur interne du serveur" }
            }));
        }
    };

    let mut active: users::ActiveModel = user.into();
    active.refresh_token = Set(Some(refresh_token.clone()));
    let user = match active.update(db).await {
        Ok(user) => user,
        Err(e) => return reponse_erreur_bd(e),
    };

    let (cookie_acces, cookie_refresh) = cookies_de_session(&token, &refresh_token);
    let corps = serde_json::json!({
        "success": true,
        "data": {
            "user": UserResponse::from(user),
            "token": token,
            "refreshToken": refresh_token,
        }
    });

    if creation {
        HttpResponse::Created()
            .cookie(cookie_acces)
            .cookie(cookie_refresh)
            .json(corps)
    } else {
        HttpResponse::Ok()
            .cookie(cookie_acces)
            .cookie(cookie_refresh)
            .json(corps)
    }
}

pub fn auth_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .service(register)
            .service(login)
            .service(refresh)
            .service(logout)
            .service(me),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reutilisation_apres_rotation_rejetee() {
        // La rotation remplace le token stocké : l'ancien ne correspond
        // plus et doit être traité comme expiré
        let ancien = "ancien.refresh.token";
        let nouveau = "nouveau.refresh.token";

        assert!(refresh_correspond(Some(ancien), ancien));
        assert!(!refresh_correspond(Some(nouveau), ancien));
        assert!(refresh_correspond(Some(nouveau), nouveau));
    }

    #[test]
    fn test_refresh_sans_token_stocke_rejete() {
        // Après logout ou suspension, plus aucun token stocké : aucun
        // refresh présenté n'est accepté
        assert!(!refresh_correspond(None, "nimporte.quel.token"));
    }
}
