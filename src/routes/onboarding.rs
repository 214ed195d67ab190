use actix_web::{get, post, web, HttpResponse};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use chrono::Utc;
use validator::Validate;

use crate::middleware::AuthUser;
use crate::models::demandes_conducteur::{self, Column as DemandeColumn, Entity as Demandes};
use crate::models::dto::{erreurs_validation, CreateOnboardingRequest};
use crate::models::users::Role;
use crate::routes::{reponse_erreur_bd, reponse_introuvable};

pub const STATUT_EN_ATTENTE: &str = "en_attente";
pub const STATUT_APPROUVEE: &str = "approuvee";
pub const STATUT_REFUSEE: &str = "refusee";

/// POST /api/onboarding - Demander à devenir conducteur (PROTÉGÉE, passagers)
///
/// Une seule demande en_attente à la fois par utilisateur.
#[post("")]
pub async fn creer_demande(
    auth_user: AuthUser,
    body: web::Json<CreateOnboardingRequest>,
    db: web::Data<DatabaseConnection>,
) -> HttpResponse {
    if auth_user.role != Role::Passager {
        return HttpResponse::BadRequest().json(serde_json::json!({
            "success": false,
            "error": { "code": "REQUETE_INVALIDE", "message": "Vous êtes déjà conducteur" }
        }));
    }

    if let Err(erreurs) = body.validate() {
        return HttpResponse::BadRequest().json(erreurs_validation(&erreurs));
    }

    let en_cours = Demandes::find()
        .filter(DemandeColumn::UserId.eq(auth_user.user_id))
        .filter(DemandeColumn::Statut.eq(STATUT_EN_ATTENTE))
        .one(db.get_ref())
        .await;

    match en_cours {
        Ok(Some(_)) => {
            return HttpResponse::Conflict().json(serde_json::json!({
                "success": false,
                "error": { "code": "CONFLIT", "message": "Une demande est déjà en cours d'examen" }
            }));
        }
        Err(e) => return reponse_erreur_bd(e),
        _ => {}
    }

    let nouvelle = demandes_conducteur::ActiveModel {
        user_id: Set(auth_user.user_id),
        numero_permis: Set(body.numero_permis.clone()),
        marque: Set(body.marque.clone()),
        modele: Set(body.modele.clone()),
        immatriculation: Set(body.immatriculation.clone()),
        nb_places: Set(body.nb_places),
        statut: Set(STATUT_EN_ATTENTE.to_string()),
        motif_refus: Set(None),
        traitee_le: Set(None),
        created_at: Set(Some(Utc::now().naive_utc())),
        ..Default::default()
    };

    match nouvelle.insert(db.get_ref()).await {
        Ok(demande) => HttpResponse::Created().json(serde_json::json!({
            "success": true,
            "data": demande
        })),
        Err(e) => reponse_erreur_bd(e),
    }
}

/// GET /api/onboarding/ma-demande - Dernière demande de l'utilisateur (PROTÉGÉE)
#[get("/ma-demande")]
pub async fn ma_demande(auth_user: AuthUser, db: web::Data<DatabaseConnection>) -> HttpResponse {
    match Demandes::find()
        .filter(DemandeColumn::UserId.eq(auth_user.user_id))
        .order_by_desc(DemandeColumn::Id)
        .one(db.get_ref())
        .await
    {
        Ok(Some(demande)) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "data": demande
        })),
        Ok(None) => reponse_introuvable("Aucune demande déposée"),
        Err(e) => reponse_erreur_bd(e),
    }
}

pub fn onboarding_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/onboarding")
            .service(creer_demande)
            .service(ma_demande),
    );
}
