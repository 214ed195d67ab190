// ============================================================================
// MODÈLE : DEMANDES CONDUCTEUR
// ============================================================================
//
// Description:
//   Demande d'un passager pour devenir conducteur. Tant qu'une demande
//   est en_attente, l'utilisateur ne peut pas en déposer une autre.
//
// Workflow:
//   1. Le passager envoie POST /api/onboarding avec permis + véhicule
//   2. Un administrateur approuve ou refuse via /api/admin/onboarding
//   3. Approbation = rôle promu à "conducteur" + véhicule créé approuvé,
//      dans la même transaction que le changement de statut de la demande
//   4. Une demande déjà traitée ne peut plus changer de statut (409)
//
// ============================================================================

use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "demandes_conducteur")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: i32,
    pub numero_permis: String,
    pub marque: String,
    pub modele: String,
    pub immatriculation: String,
    pub nb_places: i32,
    pub statut: String, // en_attente | approuvee | refusee
    pub motif_refus: Option<String>,
    pub traitee_le: Option<DateTime>,
    pub created_at: Option<DateTime>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id"
    )]
    User,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
