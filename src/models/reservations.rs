use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "reservations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub trajet_id: i32,
    pub passager_id: i32,
    pub statut: String, // en_attente | confirme | refuse | termine | annule
    pub message: Option<String>,
    pub created_at: Option<DateTime>,
    pub updated_at: Option<DateTime>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::trajets::Entity",
        from = "Column::TrajetId",
        to = "super::trajets::Column::Id"
    )]
    Trajet,

    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::PassagerId",
        to = "super::users::Column::Id"
    )]
    Passager,
}

impl Related<super::trajets::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Trajet.def()
    }
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Passager.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Statut d'une réservation.
///
/// Les transitions autorisées et leur effet sur le compteur de places du
/// trajet sont centralisés dans reservation_service::delta_places.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatutReservation {
    EnAttente,
    Confirme,
    Refuse,
    Termine,
    Annule,
}

impl StatutReservation {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatutReservation::EnAttente => "en_attente",
            StatutReservation::Confirme => "confirme",
            StatutReservation::Refuse => "refuse",
            StatutReservation::Termine => "termine",
            StatutReservation::Annule => "annule",
        }
    }

    pub fn from_str(valeur: &str) -> Option<StatutReservation> {
        match valeur {
            "en_attente" => Some(StatutReservation::EnAttente),
            "confirme" => Some(StatutReservation::Confirme),
            "refuse" => Some(StatutReservation::Refuse),
            "termine" => Some(StatutReservation::Termine),
            "annule" => Some(StatutReservation::Annule),
            _ => None,
        }
    }
}
