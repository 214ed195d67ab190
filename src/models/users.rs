use serde::{Serialize, Deserialize};
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub nom: String,
    pub prenom: String,
    #[sea_orm(unique)]
    pub email: String,
    pub telephone: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String, // Format: pbkdf2:sha256:iterations$salt$hash
    pub role: String,   // passager | conducteur | administrateur
    pub statut: String, // actif | suspendu
    #[serde(skip_serializing)]
    pub refresh_token: Option<String>, // unique refresh token actif (rotation)
    pub photo_url: Option<String>,
    pub created_at: Option<DateTime>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::trajets::Entity")]
    Trajets,

    #[sea_orm(has_many = "super::reservations::Entity")]
    Reservations,

    #[sea_orm(has_many = "super::vehicules::Entity")]
    Vehicules,

    #[sea_orm(has_many = "super::motos::Entity")]
    Motos,

    #[sea_orm(has_many = "super::notifications::Entity")]
    Notifications,
}

impl Related<super::trajets::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Trajets.def()
    }
}

impl Related<super::reservations::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reservations.def()
    }
}

impl Related<super::vehicules::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Vehicules.def()
    }
}

impl Related<super::motos::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Motos.def()
    }
}

impl Related<super::notifications::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Notifications.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Rôle applicatif, embarqué tel quel dans les claims JWT.
/// Un changement de rôle en BD ne prend effet qu'à la prochaine émission de token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Passager,
    Conducteur,
    Administrateur,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Passager => "passager",
            Role::Conducteur => "conducteur",
            Role::Administrateur => "administrateur",
        }
    }

    pub fn from_str(valeur: &str) -> Option<Role> {
        match valeur {
            "passager" => Some(Role::Passager),
            "conducteur" => Some(Role::Conducteur),
            "administrateur" => Some(Role::Administrateur),
            _ => None,
        }
    }
}

/// Statut du compte. Un compte suspendu ne peut plus se connecter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatutCompte {
    Actif,
    Suspendu,
}

impl StatutCompte {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatutCompte::Actif => "actif",
            StatutCompte::Suspendu => "suspendu",
        }
    }

    pub fn from_str(valeur: &str) -> Option<StatutCompte> {
        match valeur {
            "actif" => Some(StatutCompte::Actif),
            "suspendu" => Some(StatutCompte::Suspendu),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_roundtrip() {
        for role in [Role::Passager, Role::Conducteur, Role::Administrateur] {
            assert_eq!(Role::from_str(role.as_str()), Some(role));
        }
        assert_eq!(Role::from_str("admin"), None);
    }

    #[test]
    fn test_role_serde_snake_case() {
        let json = serde_json::to_string(&Role::Administrateur).unwrap();
        assert_eq!(json, "\"administrateur\"");
    }
}
