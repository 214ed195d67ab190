use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;

// Signalement d'un utilisateur ou d'un trajet, traité par un administrateur
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "signalements")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub auteur_id: i32,
    pub cible_user_id: Option<i32>,
    pub trajet_id: Option<i32>,
    pub motif: String,
    pub description: Option<String>,
    pub statut: String, // ouvert | traite | rejete
    pub created_at: Option<DateTime>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::AuteurId",
        to = "super::users::Column::Id"
    )]
    Auteur,

    #[sea_orm(
        belongs_to = "super::trajets::Entity",
        from = "Column::TrajetId",
        to = "super::trajets::Column::Id"
    )]
    Trajet,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Auteur.def()
    }
}

impl Related<super::trajets::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Trajet.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
