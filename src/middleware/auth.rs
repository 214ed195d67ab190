use actix_web::{dev::Payload, Error, FromRequest, HttpRequest, HttpResponse};
use futures::future::{ready, Ready};
use serde::{Deserialize, Serialize};

use crate::models::users::Role;
use crate::utils::jwt::{self, Claims};

/// Structure qui contient les infos de l'utilisateur authentifié.
/// Utilisée comme extracteur dans les routes protégées.
///
/// Les claims viennent exclusivement du token signé : aucune lecture BD.
/// Un changement de rôle ne prend donc effet qu'au prochain token émis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub user_id: i32,
    pub email: String,
    pub role: Role,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Administrateur
    }
}

/// Extrait le token d'une valeur de header "Bearer <token>"
pub fn token_du_header(valeur: &str) -> Option<&str> {
    valeur.strip_prefix("Bearer ").filter(|t| !t.is_empty())
}

fn reponse_non_autorise(message: &str) -> Error {
    let response = HttpResponse::Unauthorized().json(serde_json::json!({
        "success": false,
        "error": { "code": "NON_AUTORISE", "message": message }
    }));
    actix_web::error::InternalError::from_response("", response).into()
}

fn reponse_acces_refuse(message: &str) -> Error {
    let response = HttpResponse::Forbidden().json(serde_json::json!({
        "success": false,
        "error": { "code": "ACCES_REFUSE", "message": message }
    }));
    actix_web::error::InternalError::from_response("", response).into()
}

/// Récupère et vérifie le token d'accès d'une requête.
/// Le header Authorization est prioritaire sur le cookie "token"
/// (clients mobiles vs navigateur, même API).
fn claims_de_la_requete(req: &HttpRequest) -> Result<Claims, Error> {
    // 1. Header Authorization: Bearer <token>
    let token = match req.headers().get("Authorization") {
        Some(header) => {
            let valeur = header
                .to_str()
                .map_err(|_| reponse_non_autorise("Header Authorization invalide"))?;
            match token_du_header(valeur) {
                Some(t) => Some(t.to_string()),
                None => {
                    return Err(reponse_non_autorise(
                        "Format Authorization invalide (attendu: Bearer <token>)",
                    ));
                }
            }
        }
        None => None,
    };

    // 2. Sinon, cookie httpOnly "token"
    let token = match token.or_else(|| req.cookie("token").map(|c| c.value().to_string())) {
        Some(t) => t,
        None => return Err(reponse_non_autorise("Token d'authentification manquant")),
    };

    // 3. Vérifier signature et expiration
    jwt::verify_access_token(&token)
        .map_err(|_| reponse_non_autorise("Token invalide ou expiré"))
}

/// Implémentation de FromRequest pour AuthUser.
/// Cela permet à Actix-Web d'extraire automatiquement AuthUser des requêtes.
impl FromRequest for AuthUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(claims_de_la_requete(req).map(|claims| AuthUser {
            user_id: claims.sub,
            email: claims.email,
            role: claims.role,
        }))
    }
}

/// Extracteur des routes /api/admin : authentification + rôle administrateur.
/// Prédicat pur sur les claims du token, aucun état supplémentaire.
#[derive(Debug, Clone)]
pub struct AdminUser {
    pub user_id: i32,
    pub email: String,
}

impl FromRequest for AdminUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let resultat = claims_de_la_requete(req).and_then(|claims| {
            if claims.role != Role::Administrateur {
                return Err(reponse_acces_refuse("Réservé aux administrateurs"));
            }
            Ok(AdminUser {
                user_id: claims.sub,
                email: claims.email,
            })
        });
        ready(resultat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::cookie::Cookie;
    use actix_web::test::TestRequest;

    #[test]
    fn test_token_du_header() {
        assert_eq!(token_du_header("Bearer abc.def.ghi"), Some("abc.def.ghi"));
        assert_eq!(token_du_header("bearer abc"), None);
        assert_eq!(token_du_header("Basic abc"), None);
        assert_eq!(token_du_header("Bearer "), None);
    }

    #[actix_web::test]
    async fn test_requete_sans_token_rejetee() {
        let req = TestRequest::default().to_http_request();
        assert!(AuthUser::from_request(&req, &mut Payload::None).await.is_err());
        assert!(AdminUser::from_request(&req, &mut Payload::None).await.is_err());
    }

    #[actix_web::test]
    async fn test_garde_admin_par_role() {
        // Seul le rôle administrateur passe la garde des routes /api/admin
        let cas = [
            (Role::Passager, false),
            (Role::Conducteur, false),
            (Role::Administrateur, true),
        ];
        for (role, attendu) in cas {
            let token = jwt::generate_access_token(1, "u@exemple.com", role).unwrap();
            let req = TestRequest::default()
                .insert_header(("Authorization", format!("Bearer {}", token)))
                .to_http_request();

            // Le même token reste accepté comme utilisateur authentifié
            assert!(AuthUser::from_request(&req, &mut Payload::None).await.is_ok());
            let resultat = AdminUser::from_request(&req, &mut Payload::None).await;
            assert_eq!(resultat.is_ok(), attendu, "rôle {:?}", role);
        }
    }

    #[actix_web::test]
    async fn test_cookie_accepte_sans_header() {
        let token = jwt::generate_access_token(2, "c@exemple.com", Role::Conducteur).unwrap();
        let req = TestRequest::default()
            .cookie(Cookie::new("token", token))
            .to_http_request();

        let user = AuthUser::from_request(&req, &mut Payload::None).await.unwrap();
        assert_eq!(user.user_id, 2);
        assert_eq!(user.role, Role::Conducteur);
    }

    #[actix_web::test]
    async fn test_header_prioritaire_sur_cookie() {
        let token = jwt::generate_access_token(3, "p@exemple.com", Role::Passager).unwrap();
        let req = TestRequest::default()
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .cookie(Cookie::new("token", "pas-un-token-valide"))
            .to_http_request();

        let user = AuthUser::from_request(&req, &mut Payload::None).await.unwrap();
        assert_eq!(user.user_id, 3);
    }

    #[actix_web::test]
    async fn test_refresh_token_refuse_comme_token_dacces() {
        // Un refresh token, signé avec l'autre clé, ne donne jamais accès
        let refresh = jwt::generate_refresh_token(4, "r@exemple.com", Role::Passager).unwrap();
        let req = TestRequest::default()
            .insert_header(("Authorization", format!("Bearer {}", refresh)))
            .to_http_request();

        assert!(AuthUser::from_request(&req, &mut Payload::None).await.is_err());
    }
}
