use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;

// Même cycle de validation admin que les véhicules (en_attente → approuve | refuse)
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "motos")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub conducteur_id: i32,
    pub marque: String,
    pub modele: String,
    #[sea_orm(unique)]
    pub immatriculation: String,
    pub cylindree: Option<i32>,
    pub statut: String, // en_attente | approuve | refuse
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
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Conducteur.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
