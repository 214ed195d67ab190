// ============================================================================
// MODELS - MODULE PRINCIPAL
// ============================================================================
//
// Description:
//   Point d'entrée pour tous les modèles de données.
//   Chaque modèle correspond à une table PostgreSQL avec SeaORM.
//
// Liste des modules:
//   - users : Comptes utilisateurs (passager, conducteur, administrateur)
//   - trajets : Trajets publiés par les conducteurs (compteur de places)
//   - reservations : Réservations des passagers (machine à états)
//   - vehicules : Véhicules des conducteurs (validation admin)
//   - motos : Motos des conducteurs (validation admin)
//   - zones : Zones géographiques de départ/arrivée
//   - notifications : Notifications persistées (lu / non lu)
//   - signalements : Signalements d'utilisateurs ou de trajets
//   - demandes_conducteur : Demandes de promotion passager → conducteur
//   - audit_log : Journal des actions administrateur (append-only)
//   - dto : Data Transfer Objects pour les requêtes/réponses API
//
// Points d'attention:
//   - Tous les modèles utilisent SeaORM (pas de SQL brut)
//   - Les rôles et statuts sont stockés en chaîne côté BD et exposés
//     en enum côté Rust (users::Role, reservations::StatutReservation, etc.)
//   - Les relations entre tables sont définies dans chaque modèle
//
// ============================================================================

pub mod users;
pub mod trajets;
pub mod reservations;
pub mod vehicules;
pub mod motos;
pub mod zones;
pub mod notifications;
pub mod signalements;
pub mod demandes_conducteur;
pub mod audit_log;
pub mod dto;
