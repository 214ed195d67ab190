use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;

/// Journal des actions administrateur. Append-only : aucune route ne met à
/// jour ni ne supprime ces lignes.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "audit_log")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub admin_id: i32,
    pub action: String,
    pub cible_type: Option<String>,
    pub cible_id: Option<i32>,
    pub details: String,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: Option<DateTime>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::AdminId",
        to = "super::users::Column::Id"
    )]
    Admin,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Admin.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
