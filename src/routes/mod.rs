pub mod auth;
pub mod health;
pub mod trajets;
pub mod reservations;
pub mod vehicules;
pub mod motos;
pub mod zones;
pub mod notifications;
pub mod signalements;
pub mod onboarding;
pub mod upload;
pub mod admin;

use actix_web::{web, HttpResponse};

use crate::services::ServiceError;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(health::health_check)
            .configure(auth::auth_routes)
            .configure(trajets::trajet_routes)
            .configure(reservations::reservation_routes)
            .configure(vehicules::vehicule_routes)
            .configure(motos::moto_routes)
            .configure(zones::zone_routes)
            .configure(notifications::notification_routes)
            .configure(signalements::signalement_routes)
            .configure(onboarding::onboarding_routes)
            .configure(upload::upload_routes)
            .configure(admin::admin_routes),
    );
}

/// Traduit une erreur de service en enveloppe HTTP uniforme
/// {success: false, error: {code, message}}.
pub fn reponse_erreur_service(erreur: ServiceError) -> HttpResponse {
    match erreur {
        ServiceError::NotFound(message) => HttpResponse::NotFound().json(serde_json::json!({
            "success": false,
            "error": { "code": "INTROUVABLE", "message": message }
        })),
        ServiceError::BusinessRule(message) => {
            HttpResponse::BadRequest().json(serde_json::json!({
                "success": false,
                "error": { "code": "REQUETE_INVALIDE", "message": message }
            }))
        }
        ServiceError::Conflict(message) => HttpResponse::Conflict().json(serde_json::json!({
            "success": false,
            "error": { "code": "CONFLIT", "message": message }
        })),
        ServiceError::Forbidden(message) => HttpResponse::Forbidden().json(serde_json::json!({
            "success": false,
            "error": { "code": "ACCES_REFUSE", "message": message }
        })),
        ServiceError::Db(e) => reponse_erreur_bd(e),
    }
}

/// Erreur inattendue de la couche persistance : loggée côté serveur,
/// jamais détaillée au client.
pub fn reponse_erreur_bd(e: sea_orm::DbErr) -> HttpResponse {
    eprintln!("❌ Database error: {}", e);
    HttpResponse::InternalServerError().json(serde_json::json!({
        "success": false,
        "error": { "code": "ERREUR_SERVEUR", "message": "Erreur interne du serveur" }
    }))
}

/// 404 uniforme pour une ressource absente.
pub fn reponse_introuvable(message: &str) -> HttpResponse {
    HttpResponse::NotFound().json(serde_json::json!({
        "success": false,
        "error": { "code": "INTROUVABLE", "message": message }
    }))
}

/// 403 uniforme pour un appel authentifié mais non autorisé.
pub fn reponse_acces_refuse(message: &str) -> HttpResponse {
    HttpResponse::Forbidden().json(serde_json::json!({
        "success": false,
        "error": { "code": "ACCES_REFUSE", "message": message }
    }))
}
