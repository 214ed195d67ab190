pub mod audit_service;
pub mod notification_service;
pub mod reservation_service;
pub mod trajet_service;

use sea_orm::DbErr;

/// Erreurs métier renvoyées par les services, traduites en enveloppe HTTP
/// par les routes (voir routes::reponse_erreur_service).
#[derive(Debug)]
pub enum ServiceError {
    /// Ressource absente → 404
    NotFound(String),
    /// Règle métier violée (plus de places, transition invalide, ...) → 400
    BusinessRule(String),
    /// Doublon (email, immatriculation, réservation, ...) → 409
    Conflict(String),
    /// Authentifié mais pas le bon rôle ou pas le propriétaire → 403
    Forbidden(String),
    /// Erreur de la couche persistance → 500
    Db(DbErr),
}

impl From<DbErr> for ServiceError {
    fn from(e: DbErr) -> Self {
        ServiceError::Db(e)
    }
}

impl std::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceError::NotFound(m)
            | ServiceError::BusinessRule(m)
            | ServiceError::Conflict(m)
            | ServiceError::Forbidden(m) => write!(f, "{}", m),
            ServiceError::Db(e) => write!(f, "{}", e),
        }
    }
}
