// DTOs des requêtes/réponses API + enveloppe de pagination

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationErrors};

use crate::models::users;

// ---------------------------------------------------------------------------
// Pagination
// ---------------------------------------------------------------------------

pub const LIMITE_PAR_DEFAUT: u64 = 20;
pub const LIMITE_MAX: u64 = 100;

#[derive(Debug, Deserialize)]
pub struct PaginationQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

impl PaginationQuery {
    pub fn page(&self) -> u64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn limit(&self) -> u64 {
        self.limit.unwrap_or(LIMITE_PAR_DEFAUT).clamp(1, LIMITE_MAX)
    }
}

/// Bloc "meta" renvoyé avec toutes les listes paginées.
pub fn pagination_meta(page: u64, limit: u64, total: u64) -> serde_json::Value {
    let total_pages = if total == 0 { 0 } else { total.div_ceil(limit) };
    serde_json::json!({
        "page": page,
        "limit": limit,
        "total": total,
        "totalPages": total_pages,
        "hasNext": page < total_pages,
        "hasPrev": page > 1,
    })
}

/// Traduit les erreurs du validateur en enveloppe d'erreur structurée,
/// avec un détail {field, message} par champ rejeté.
pub fn erreurs_validation(erreurs: &ValidationErrors) -> serde_json::Value {
    let mut details: Vec<serde_json::Value> = Vec::new();
    for (champ, erreurs_champ) in erreurs.field_errors() {
        for e in erreurs_champ {
            let message = e
                .message
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| e.code.to_string());
            details.push(serde_json::json!({ "field": champ, "message": message }));
        }
    }
    serde_json::json!({
        "success": false,
        "error": {
            "code": "ERREUR_VALIDATION",
            "message": "Données invalides",
            "details": details,
        }
    })
}

// ---------------------------------------------------------------------------
// Authentification
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 2, max = 50, message = "Le nom doit faire entre 2 et 50 caractères"))]
    pub nom: String,
    #[validate(length(min = 2, max = 50, message = "Le prénom doit faire entre 2 et 50 caractères"))]
    pub prenom: String,
    #[validate(email(message = "Adresse email invalide"))]
    pub email: String,
    #[validate(length(min = 8, message = "Le mot de passe doit faire au moins 8 caractères"))]
    pub password: String,
    #[validate(length(min = 8, max = 20, message = "Numéro de téléphone invalide"))]
    pub telephone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    #[serde(rename = "refreshToken")]
    pub refresh_token: Option<String>,
}

/// Profil utilisateur exposé par l'API (jamais de password_hash ni de
/// refresh_token).
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i32,
    pub nom: String,
    pub prenom: String,
    pub email: String,
    pub telephone: Option<String>,
    pub role: String,
    pub statut: String,
    pub photo_url: Option<String>,
    pub created_at: Option<NaiveDateTime>,
}

impl From<users::Model> for UserResponse {
    fn from(user: users::Model) -> Self {
        UserResponse {
            id: user.id,
            nom: user.nom,
            prenom: user.prenom,
            email: user.email,
            telephone: user.telephone,
            role: user.role,
            statut: user.statut,
            photo_url: user.photo_url,
            created_at: user.created_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Trajets
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct CreateTrajetRequest {
    #[validate(length(min = 2, max = 100, message = "Le départ doit faire entre 2 et 100 caractères"))]
    pub depart: String,
    #[validate(length(min = 2, max = 100, message = "La destination doit faire entre 2 et 100 caractères"))]
    pub destination: String,
    pub zone_depart_id: Option<i32>,
    pub zone_arrivee_id: Option<i32>,
    pub date_depart: NaiveDateTime,
    pub prix: Decimal,
    #[validate(range(min = 1, max = 8, message = "La capacité doit être comprise entre 1 et 8 places"))]
    pub capacite: i32,
    #[validate(length(max = 500, message = "Description trop longue (500 caractères max)"))]
    pub description: Option<String>,
}

// La capacité n'est pas modifiable après création : le compteur de places
// en dépend.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTrajetRequest {
    #[validate(length(min = 2, max = 100, message = "Le départ doit faire entre 2 et 100 caractères"))]
    pub depart: Option<String>,
    #[validate(length(min = 2, max = 100, message = "La destination doit faire entre 2 et 100 caractères"))]
    pub destination: Option<String>,
    pub zone_depart_id: Option<i32>,
    pub zone_arrivee_id: Option<i32>,
    pub date_depart: Option<NaiveDateTime>,
    pub prix: Option<Decimal>,
    #[validate(length(max = 500, message = "Description trop longue (500 caractères max)"))]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FiltreTrajets {
    pub depart: Option<String>,
    pub destination: Option<String>,
    pub zone_depart_id: Option<i32>,
    pub zone_arrivee_id: Option<i32>,
    pub statut: Option<String>,
}

// ---------------------------------------------------------------------------
// Réservations
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct CreateReservationRequest {
    pub trajet_id: i32,
    #[validate(length(max = 300, message = "Message trop long (300 caractères max)"))]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateReservationRequest {
    pub statut: String, // validé par StatutReservation::from_str côté route
}

// ---------------------------------------------------------------------------
// Véhicules et motos
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct CreateVehiculeRequest {
    #[validate(length(min = 1, max = 50, message = "Marque requise"))]
    pub marque: String,
    #[validate(length(min = 1, max = 50, message = "Modèle requis"))]
    pub modele: String,
    #[validate(length(max = 30, message = "Couleur trop longue"))]
    pub couleur: Option<String>,
    #[validate(length(min = 2, max = 20, message = "Immatriculation invalide"))]
    pub immatriculation: String,
    #[validate(range(min = 1, max = 8, message = "Le nombre de places doit être compris entre 1 et 8"))]
    pub nb_places: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateVehiculeRequest {
    #[validate(length(min = 1, max = 50, message = "Marque requise"))]
    pub marque: Option<String>,
    #[validate(length(min = 1, max = 50, message = "Modèle requis"))]
    pub modele: Option<String>,
    #[validate(length(max = 30, message = "Couleur trop longue"))]
    pub couleur: Option<String>,
    #[validate(range(min = 1, max = 8, message = "Le nombre de places doit être compris entre 1 et 8"))]
    pub nb_places: Option<i32>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateMotoRequest {
    #[validate(length(min = 1, max = 50, message = "Marque requise"))]
    pub marque: String,
    #[validate(length(min = 1, max = 50, message = "Modèle requis"))]
    pub modele: String,
    #[validate(length(min = 2, max = 20, message = "Immatriculation invalide"))]
    pub immatriculation: String,
    #[validate(range(min = 50, max = 2000, message = "Cylindrée invalide"))]
    pub cylindree: Option<i32>,
}

// ---------------------------------------------------------------------------
// Zones
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct CreateZoneRequest {
    #[validate(length(min = 2, max = 100, message = "Le nom doit faire entre 2 et 100 caractères"))]
    pub nom: String,
    #[validate(length(max = 100, message = "Ville trop longue"))]
    pub ville: Option<String>,
    #[validate(length(max = 500, message = "Description trop longue"))]
    pub description: Option<String>,
    pub latitude: Option<Decimal>,
    pub longitude: Option<Decimal>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateZoneRequest {
    #[validate(length(min = 2, max = 100, message = "Le nom doit faire entre 2 et 100 caractères"))]
    pub nom: Option<String>,
    #[validate(length(max = 100, message = "Ville trop longue"))]
    pub ville: Option<String>,
    #[validate(length(max = 500, message = "Description trop longue"))]
    pub description: Option<String>,
    pub latitude: Option<Decimal>,
    pub longitude: Option<Decimal>,
}

// ---------------------------------------------------------------------------
// Signalements
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSignalementRequest {
    pub cible_user_id: Option<i32>,
    pub trajet_id: Option<i32>,
    #[validate(length(min = 5, max = 100, message = "Le motif doit faire entre 5 et 100 caractères"))]
    pub motif: String,
    #[validate(length(max = 1000, message = "Description trop longue (1000 caractères max)"))]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TraiterSignalementRequest {
    pub statut: String, // traite | rejete
}

// ---------------------------------------------------------------------------
// Onboarding conducteur
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct CreateOnboardingRequest {
    #[validate(length(min = 5, max = 30, message = "Numéro de permis invalide"))]
    pub numero_permis: String,
    #[validate(length(min = 1, max = 50, message = "Marque requise"))]
    pub marque: String,
    #[validate(length(min = 1, max = 50, message = "Modèle requis"))]
    pub modele: String,
    #[validate(length(min = 2, max = 20, message = "Immatriculation invalide"))]
    pub immatriculation: String,
    #[validate(range(min = 1, max = 8, message = "Le nombre de places doit être compris entre 1 et 8"))]
    pub nb_places: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RefuserDemandeRequest {
    #[validate(length(min = 5, max = 300, message = "Le motif doit faire entre 5 et 300 caractères"))]
    pub motif: String,
}

// ---------------------------------------------------------------------------
// Administration des utilisateurs
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
pub struct SuspendreUserRequest {
    #[validate(length(min = 10, max = 500, message = "La justification doit faire au moins 10 caractères"))]
    pub motif: String,
}

#[derive(Debug, Deserialize)]
pub struct AdminUpdateUserRequest {
    pub role: Option<String>,   // validé par Role::from_str côté route
    pub statut: Option<String>, // validé par StatutCompte::from_str côté route
}

#[derive(Debug, Deserialize)]
pub struct FiltreUtilisateurs {
    pub role: Option<String>,
    pub statut: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_valeurs_par_defaut() {
        let q = PaginationQuery { page: None, limit: None };
        assert_eq!(q.page(), 1);
        assert_eq!(q.limit(), 20);
    }

    #[test]
    fn test_pagination_limite_plafonnee() {
        let q = PaginationQuery { page: Some(0), limit: Some(1000) };
        assert_eq!(q.page(), 1);
        assert_eq!(q.limit(), 100);
    }

    #[test]
    fn test_pagination_meta() {
        let meta = pagination_meta(2, 20, 45);
        assert_eq!(meta["totalPages"], 3);
        assert_eq!(meta["hasNext"], true);
        assert_eq!(meta["hasPrev"], true);

        let vide = pagination_meta(1, 20, 0);
        assert_eq!(vide["totalPages"], 0);
        assert_eq!(vide["hasNext"], false);
        assert_eq!(vide["hasPrev"], false);
    }

    #[test]
    fn test_suspension_motif_trop_court() {
        let req = SuspendreUserRequest { motif: "court".to_string() };
        assert!(req.validate().is_err());

        let req = SuspendreUserRequest {
            motif: "comportement dangereux signalé trois fois".to_string(),
        };
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_erreurs_validation_enveloppe() {
        let req = RegisterRequest {
            nom: "A".to_string(),
            prenom: "Koffi".to_string(),
            email: "pas-un-email".to_string(),
            password: "court".to_string(),
            telephone: None,
        };
        let erreurs = req.validate().unwrap_err();
        let enveloppe = erreurs_validation(&erreurs);
        assert_eq!(enveloppe["success"], false);
        assert_eq!(enveloppe["error"]["code"], "ERREUR_VALIDATION");
        let details = enveloppe["error"]["details"].as_array().unwrap();
        assert!(details.len() >= 3);
        assert!(details.iter().all(|d| d["field"].is_string() && d["message"].is_string()));
    }
}
