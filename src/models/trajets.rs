// ============================================================================
// MODÈLE : TRAJETS
// ============================================================================
//
// Description:
//   Trajet publié par un conducteur. Le compteur places_disponibles est
//   la seule ressource partagée contendue de l'application : il n'est
//   modifié que dans les transitions transactionnelles du service
//   réservations (voir services/reservation_service.rs).
//
// Colonnes de la table trajets:
//   - id (INTEGER, PRIMARY KEY, SERIAL)
//   - conducteur_id (INTEGER, NOT NULL, FK vers users)
//   - depart / destination (VARCHAR, NOT NULL)
//   - zone_depart_id / zone_arrivee_id (INTEGER, FK vers zones, NULL)
//   - date_depart (TIMESTAMP, NOT NULL)
//   - prix (NUMERIC, NOT NULL) - prix par place
//   - capacite (INTEGER, NOT NULL) - nombre de places initial
//   - places_disponibles (INTEGER, NOT NULL)
//   - statut (VARCHAR) - ouvert | plein | termine | annule
//   - description (VARCHAR, NULL)
//   - created_at (TIMESTAMP, DEFAULT CURRENT_TIMESTAMP)
//
// Points d'attention:
//   - Invariant : 0 <= places_disponibles <= capacite
//   - ouvert <-> plein est piloté par le compteur ; termine et annule
//     sont terminaux
//   - Les trajets ouverts dont la date est passée sont basculés en
//     "termine" par TrajetService::cloturer_trajets_passes
//
// ============================================================================

use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "trajets")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub conducteur_id: i32,
    pub depart: String,
    pub destination: String,
    pub zone_depart_id: Option<i32>,
    pub zone_arrivee_id: Option<i32>,
    pub date_depart: DateTime,
    pub prix: Decimal,
    pub capacite: i32,
    pub places_disponibles: i32,
    pub statut: String, // ouvert | plein | termine | annule
    pub description: Option<String>,
    pub created_at: Option<DateTime>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::ConducteurId",
        to = "super::users::Column::Id"
    )]
    Conducteur,

    #[sea_orm(
        belongs_to = "super::zones::Entity",
        from = "Column::ZoneDepartId",
        to = "super::zones::Column::Id"
    )]
    ZoneDepart,

    #[sea_orm(
        belongs_to = "super::zones::Entity",
        from = "Column::ZoneArriveeId",
        to = "super::zones::Column::Id"
    )]
    ZoneArrivee,

    #[sea_orm(has_many = "super::reservations::Entity")]
    Reservations,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Conducteur.def()
    }
}

impl Related<super::reservations::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reservations.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Statut d'un trajet. "plein" et "ouvert" sont interchangeables au gré
/// du compteur de places ; "termine" et "annule" sont terminaux.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatutTrajet {
    Ouvert,
    Plein,
    Termine,
    Annule,
}

impl StatutTrajet {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatutTrajet::Ouvert => "ouvert",
            StatutTrajet::Plein => "plein",
            StatutTrajet::Termine => "termine",
            StatutTrajet::Annule => "annule",
        }
    }

    pub fn from_str(valeur: &str) -> Option<StatutTrajet> {
        match valeur {
            "ouvert" => Some(StatutTrajet::Ouvert),
            "plein" => Some(StatutTrajet::Plein),
            "termine" => Some(StatutTrajet::Termine),
            "annule" => Some(StatutTrajet::Annule),
            _ => None,
        }
    }
}
