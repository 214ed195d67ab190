use sea_orm::*;
use sea_orm::sea_query::Expr;
use chrono::Utc;

use crate::middleware::AuthUser;
use crate::models::reservations::{self, Entity as Reservations, StatutReservation};
use crate::models::trajets::{self, Entity as Trajets, StatutTrajet};
use crate::services::ServiceError;

pub struct TrajetService;

impl TrajetService {
    /// Bascule en "termine" les trajets actifs (ouverts ou pleins) dont la
    /// date de départ est passée, ainsi que leurs réservations encore
    /// vivantes (sans toucher au compteur de places).
    ///
    /// Routine opportuniste : elle est invoquée au fil de l'eau par la liste
    /// des trajets, pas par un planificateur. Un trajet peut donc rester
    /// visible "ouvert" quelques requêtes après son heure de départ.
    pub async fn cloturer_trajets_passes(db: &DatabaseConnection) -> Result<u64, DbErr> {
        let maintenant = Utc::now().naive_utc();

        let passes = Trajets::find()
            .filter(trajets::Column::Statut.is_in([
                StatutTrajet::Ouvert.as_str(),
                StatutTrajet::Plein.as_str(),
            ]))
            .filter(trajets::Column::DateDepart.lt(maintenant))
            .all(db)
            .await?;

        if passes.is_empty() {
            return Ok(0);
        }

        let ids: Vec<i32> = passes.iter().map(|t| t.id).collect();
        let txn = db.begin().await?;

        Trajets::update_many()
            .col_expr(
                trajets::Column::Statut,
                Expr::value(StatutTrajet::Termine.as_str()),
            )
            .filter(trajets::Column::Id.is_in(ids.clone()))
            .exec(&txn)
            .await?;

        Reservations::update_many()
            .col_expr(
                reservations::Column::Statut,
                Expr::value(StatutReservation::Termine.as_str()),
            )
            .filter(reservations::Column::TrajetId.is_in(ids.clone()))
            .filter(reservations::Column::Statut.is_in([
                StatutReservation::EnAttente.as_str(),
                StatutReservation::Confirme.as_str(),
            ]))
            .exec(&txn)
            .await?;

        txn.commit().await?;
        Ok(ids.len() as u64)
    }

    /// Annule un trajet et toutes ses réservations encore vivantes.
    /// Permission : conducteur du trajet ou administrateur.
    pub async fn annuler(
        db: &DatabaseConnection,
        trajet_id: i32,
        acteur: &AuthUser,
    ) -> Result<trajets::Model, ServiceError> {
        let txn = db.begin().await?;

        let trajet = Trajets::find_by_id(trajet_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Trajet introuvable".to_string()))?;

        if !acteur.is_admin() && trajet.conducteur_id != acteur.user_id {
            return Err(ServiceError::Forbidden(
                "Seul le conducteur ou un administrateur peut annuler ce trajet".to_string(),
            ));
        }

        match StatutTrajet::from_str(&trajet.statut) {
            Some(StatutTrajet::Termine) | Some(StatutTrajet::Annule) => {
                return Err(ServiceError::BusinessRule(
                    "Ce trajet est déjà clôturé".to_string(),
                ));
            }
            _ => {}
        }

        Reservations::update_many()
            .col_expr(
                reservations::Column::Statut,
                Expr::value(StatutReservation::Annule.as_str()),
            )
            .filter(reservations::Column::TrajetId.eq(trajet_id))
            .filter(reservations::Column::Statut.is_in([
                StatutReservation::EnAttente.as_str(),
                StatutReservation::Confirme.as_str(),
            ]))
            .exec(&txn)
            .await?;

        let mut active: trajets::ActiveModel = trajet.into();
        active.statut = Set(StatutTrajet::Annule.as_str().to_string());
        let annule = active.update(&txn).await?;

        txn.commit().await?;
        Ok(annule)
    }
}
