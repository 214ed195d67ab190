// ============================================================================
// SERVICE : RÉSERVATIONS (machine à états + compteur de places)
// ============================================================================
//
// Description:
//   Toute modification de places_disponibles passe par ce service. La table
//   des transitions est une fonction pure (delta_places) ; son application
//   est transactionnelle : lecture réservation + trajet, décision, écriture
//   des deux lignes, commit. Le décrément du compteur est conditionnel côté
//   SQL (places_disponibles >= 1), donc deux confirmations concurrentes sur
//   la dernière place ne peuvent pas réussir toutes les deux.
//
// Transitions autorisées:
//   en_attente -> confirme   (places > 0 requis ; compteur -1)
//   en_attente -> refuse     (compteur inchangé)
//   en_attente -> annule     (compteur inchangé)
//   confirme   -> refuse     (compteur +1)
//   confirme   -> annule     (compteur +1)
//   (tout)     -> termine    (clôture ; compteur inchangé)
//   X          -> X          (no-op accepté, donc double annulation idempotente)
//
// Invariant:
//   0 <= places_disponibles <= capacite ; chaque retour de place correspond
//   exactement à un décrément antérieur (incrément uniquement depuis
//   "confirme").
//
// ============================================================================

use sea_orm::*;
use sea_orm::sea_query::Expr;
use chrono::Utc;

use crate::middleware::AuthUser;
use crate::models::reservations::{self, Entity as Reservations, StatutReservation};
use crate::models::trajets::{self, Entity as Trajets, StatutTrajet};
use crate::services::ServiceError;

/// Variation du compteur de places induite par une transition de statut.
/// Retourne Err pour une transition hors table.
pub fn delta_places(
    avant: StatutReservation,
    apres: StatutReservation,
) -> Result<i32, String> {
    use StatutReservation::*;

    // Re-poser le même statut est un no-op accepté
    if avant == apres {
        return Ok(0);
    }

    match (avant, apres) {
        (EnAttente, Confirme) => Ok(-1),
        (EnAttente, Refuse) | (EnAttente, Annule) => Ok(0),
        (Confirme, Refuse) | (Confirme, Annule) => Ok(1),
        // Clôture administrative/automatique, depuis n'importe quel statut
        (_, Termine) => Ok(0),
        (avant, apres) => Err(format!(
            "Transition invalide de {} vers {}",
            avant.as_str(),
            apres.as_str()
        )),
    }
}

pub struct ReservationService;

impl ReservationService {
    /// Crée une réservation en_attente. Le trajet doit exister et être
    /// encore actif (ouvert ou plein) : réserver un trajet plein place le
    /// passager en file d'attente, la place n'est consommée qu'à la
    /// confirmation par le conducteur.
    pub async fn creer(
        db: &DatabaseConnection,
        passager_id: i32,
        trajet_id: i32,
        message: Option<String>,
    ) -> Result<(reservations::Model, trajets::Model), ServiceError> {
        let trajet = Trajets::find_by_id(trajet_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Trajet introuvable".to_string()))?;

        if trajet.conducteur_id == passager_id {
            return Err(ServiceError::BusinessRule(
                "Impossible de réserver son propre trajet".to_string(),
            ));
        }

        match StatutTrajet::from_str(&trajet.statut) {
            Some(StatutTrajet::Ouvert) | Some(StatutTrajet::Plein) => {}
            _ => {
                return Err(ServiceError::BusinessRule(
                    "Ce trajet n'accepte plus de réservations".to_string(),
                ));
            }
        }

        let existante = Reservations::find()
            .filter(reservations::Column::TrajetId.eq(trajet_id))
            .filter(reservations::Column::PassagerId.eq(passager_id))
            .filter(reservations::Column::Statut.ne(StatutReservation::Annule.as_str()))
            .one(db)
            .await?;
        if existante.is_some() {
            return Err(ServiceError::Conflict(
                "Une réservation existe déjà pour ce trajet".to_string(),
            ));
        }

        let maintenant = Utc::now().naive_utc();
        let nouvelle = reservations::ActiveModel {
            trajet_id: Set(trajet_id),
            passager_id: Set(passager_id),
            statut: Set(StatutReservation::EnAttente.as_str().to_string()),
            message: Set(message),
            created_at: Set(Some(maintenant)),
            updated_at: Set(Some(maintenant)),
            ..Default::default()
        };

        let reservation = nouvelle.insert(db).await?;
        Ok((reservation, trajet))
    }

    /// Applique une transition de statut. Toute la séquence lecture-décision-
    /// écriture (statut de la réservation + compteur du trajet) s'exécute
    /// dans une seule transaction.
    ///
    /// Permission : conducteur du trajet ou administrateur.
    pub async fn changer_statut(
        db: &DatabaseConnection,
        reservation_id: i32,
        nouveau_statut: StatutReservation,
        acteur: &AuthUser,
    ) -> Result<reservations::Model, ServiceError> {
        let txn = db.begin().await?;

        let reservation = Reservations::find_by_id(reservation_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Réservation introuvable".to_string()))?;

        let trajet = Trajets::find_by_id(reservation.trajet_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Trajet introuvable".to_string()))?;

        if !acteur.is_admin() && trajet.conducteur_id != acteur.user_id {
            return Err(ServiceError::Forbidden(
                "Seul le conducteur du trajet ou un administrateur peut modifier cette réservation"
                    .to_string(),
            ));
        }

        let statut_actuel = StatutReservation::from_str(&reservation.statut).ok_or_else(|| {
            ServiceError::Db(DbErr::Custom(format!(
                "Statut de réservation inconnu en base: {}",
                reservation.statut
            )))
        })?;

        let delta = delta_places(statut_actuel, nouveau_statut).map_err(ServiceError::BusinessRule)?;

        if delta != 0 {
            Self::appliquer_delta(&txn, &trajet, delta).await?;
        }

        let mut active: reservations::ActiveModel = reservation.into();
        active.statut = Set(nouveau_statut.as_str().to_string());
        active.updated_at = Set(Some(Utc::now().naive_utc()));
        let mise_a_jour = active.update(&txn).await?;

        txn.commit().await?;
        Ok(mise_a_jour)
    }

    /// Supprime une réservation. Permission : le passager propriétaire, le
    /// conducteur du trajet ou un administrateur. Une réservation confirmée
    /// rend sa place au trajet dans la même transaction que la suppression.
    pub async fn supprimer(
        db: &DatabaseConnection,
        reservation_id: i32,
        acteur: &AuthUser,
    ) -> Result<(), ServiceError> {
        let txn = db.begin().await?;

        let reservation = Reservations::find_by_id(reservation_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Réservation introuvable".to_string()))?;

        let trajet = Trajets::find_by_id(reservation.trajet_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Trajet introuvable".to_string()))?;

        let est_passager = reservation.passager_id == acteur.user_id;
        let est_conducteur = trajet.conducteur_id == acteur.user_id;
        if !acteur.is_admin() && !est_passager && !est_conducteur {
            return Err(ServiceError::Forbidden(
                "Vous ne pouvez pas supprimer cette réservation".to_string(),
            ));
        }

        if reservation.statut == StatutReservation::Confirme.as_str() {
            Self::appliquer_delta(&txn, &trajet, 1).await?;
        }

        reservation.delete(&txn).await?;
        txn.commit().await?;
        Ok(())
    }

    /// Applique un delta au compteur du trajet. Le décrément est conditionnel
    /// côté SQL (WHERE places_disponibles >= delta requis) : le compteur ne
    /// peut jamais passer en négatif, même sous requêtes concurrentes.
    /// Bascule aussi le statut ouvert <-> plein selon le compteur résultant.
    async fn appliquer_delta(
        txn: &DatabaseTransaction,
        trajet: &trajets::Model,
        delta: i32,
    ) -> Result<(), ServiceError> {
        let mut requete = Trajets::update_many()
            .col_expr(
                trajets::Column::PlacesDisponibles,
                Expr::col(trajets::Column::PlacesDisponibles).add(delta),
            )
            .filter(trajets::Column::Id.eq(trajet.id));

        if delta < 0 {
            requete = requete.filter(trajets::Column::PlacesDisponibles.gte(-delta));
        }

        let resultat = requete.exec(txn).await?;
        if resultat.rows_affected == 0 {
            return Err(ServiceError::BusinessRule(
                "Plus aucune place disponible sur ce trajet".to_string(),
            ));
        }

        // Relire le compteur dans la transaction pour basculer ouvert <-> plein
        let a_jour = Trajets::find_by_id(trajet.id)
            .one(txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Trajet introuvable".to_string()))?;

        let bascule = match StatutTrajet::from_str(&a_jour.statut) {
            Some(StatutTrajet::Ouvert) if a_jour.places_disponibles == 0 => Some(StatutTrajet::Plein),
            Some(StatutTrajet::Plein) if a_jour.places_disponibles > 0 => Some(StatutTrajet::Ouvert),
            _ => None,
        };
        if let Some(statut) = bascule {
            let mut active: trajets::ActiveModel = a_jour.into();
            active.statut = Set(statut.as_str().to_string());
            active.update(txn).await?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use StatutReservation::*;

    #[test]
    fn test_table_des_transitions() {
        assert_eq!(delta_places(EnAttente, Confirme), Ok(-1));
        assert_eq!(delta_places(EnAttente, Refuse), Ok(0));
        assert_eq!(delta_places(EnAttente, Annule), Ok(0));
        assert_eq!(delta_places(Confirme, Refuse), Ok(1));
        assert_eq!(delta_places(Confirme, Annule), Ok(1));

        // Clôture depuis n'importe quel statut
        for depuis in [EnAttente, Confirme, Refuse, Annule] {
            assert_eq!(delta_places(depuis, Termine), Ok(0));
        }
    }

    #[test]
    fn test_transitions_invalides() {
        assert!(delta_places(Refuse, Confirme).is_err());
        assert!(delta_places(Annule, Confirme).is_err());
        assert!(delta_places(Termine, Confirme).is_err());
        assert!(delta_places(Refuse, Annule).is_err());
        assert!(delta_places(Annule, EnAttente).is_err());
        assert!(delta_places(Confirme, EnAttente).is_err());
    }

    #[test]
    fn test_meme_statut_est_un_noop() {
        for statut in [EnAttente, Confirme, Refuse, Termine, Annule] {
            assert_eq!(delta_places(statut, statut), Ok(0));
        }
    }

    // Simulateur en mémoire du couple (compteur, réservations) : applique la
    // même table et les mêmes gardes que le service, sans base de données.
    struct TrajetSimule {
        capacite: i32,
        places: i32,
        reservations: Vec<StatutReservation>,
    }

    impl TrajetSimule {
        fn new(capacite: i32) -> Self {
            TrajetSimule {
                capacite,
                places: capacite,
                reservations: Vec::new(),
            }
        }

        fn reserver(&mut self) -> usize {
            self.reservations.push(EnAttente);
            self.reservations.len() - 1
        }

        fn transition(&mut self, id: usize, vers: StatutReservation) -> Result<(), String> {
            let avant = self.reservations[id];
            let delta = delta_places(avant, vers)?;
            if delta < 0 && self.places + delta < 0 {
                return Err("Plus aucune place disponible".to_string());
            }
            self.places += delta;
            self.reservations[id] = vers;
            Ok(())
        }

        fn confirmees(&self) -> i32 {
            self.reservations.iter().filter(|s| **s == Confirme).count() as i32
        }

        fn verifier_invariant(&self) {
            assert!(self.places >= 0, "compteur négatif");
            assert!(self.places <= self.capacite, "compteur au-delà de la capacité");
            assert_eq!(
                self.places + self.confirmees(),
                self.capacite,
                "places + confirmées != capacité"
            );
        }
    }

    #[test]
    fn test_scenario_derniere_place() {
        // Trajet à 1 place : A réserve, est confirmé ; B réserve (file
        // d'attente), sa confirmation échoue tant que A tient la place ;
        // l'annulation de A libère la place et B peut être confirmé.
        let mut trajet = TrajetSimule::new(1);

        let a = trajet.reserver();
        assert_eq!(trajet.places, 1);
        trajet.verifier_invariant();

        trajet.transition(a, Confirme).unwrap();
        assert_eq!(trajet.places, 0);
        trajet.verifier_invariant();

        let b = trajet.reserver();
        assert_eq!(trajet.places, 0);
        assert_eq!(trajet.reservations[b], EnAttente);

        let erreur = trajet.transition(b, Confirme).unwrap_err();
        assert!(erreur.contains("place"));
        assert_eq!(trajet.reservations[b], EnAttente);
        assert_eq!(trajet.places, 0);
        trajet.verifier_invariant();

        trajet.transition(a, Annule).unwrap();
        assert_eq!(trajet.places, 1);
        trajet.verifier_invariant();

        trajet.transition(b, Confirme).unwrap();
        assert_eq!(trajet.places, 0);
        trajet.verifier_invariant();
    }

    #[test]
    fn test_conservation_des_places() {
        // Propriété : places + confirmées == capacité après chaque étape
        // d'une longue séquence de transitions valides (hors clôture, qui
        // sort la réservation du décompte sans rendre la place).
        let mut trajet = TrajetSimule::new(3);
        let cibles = [Confirme, Refuse, Annule];

        let mut ids = Vec::new();
        for _ in 0..12 {
            ids.push(trajet.reserver());
            trajet.verifier_invariant();
        }

        for (i, id) in ids.iter().enumerate() {
            let vers = cibles[i % cibles.len()];
            // Une transition refusée (plus de places, table violée) doit
            // laisser l'état inchangé
            let avant = (trajet.places, trajet.reservations.clone());
            if trajet.transition(*id, vers).is_err() {
                assert_eq!(avant, (trajet.places, trajet.reservations.clone()));
            }
            trajet.verifier_invariant();
        }

        // Libérer tous les confirmés : le compteur doit revenir à la capacité
        for id in &ids {
            if trajet.reservations[*id] == Confirme {
                trajet.transition(*id, Annule).unwrap();
                trajet.verifier_invariant();
            }
        }
        assert_eq!(trajet.places, 3);
    }

    #[test]
    fn test_jamais_de_compteur_negatif() {
        let mut trajet = TrajetSimule::new(2);
        let r1 = trajet.reserver();
        let r2 = trajet.reserver();
        let r3 = trajet.reserver();

        trajet.transition(r1, Confirme).unwrap();
        trajet.transition(r2, Confirme).unwrap();
        assert_eq!(trajet.places, 0);

        // Troisième confirmation : rejetée, état intact
        assert!(trajet.transition(r3, Confirme).is_err());
        assert_eq!(trajet.places, 0);
        assert_eq!(trajet.reservations[r3], EnAttente);
        trajet.verifier_invariant();
    }

    #[test]
    fn test_double_annulation_idempotente() {
        let mut trajet = TrajetSimule::new(2);
        let r = trajet.reserver();
        trajet.transition(r, Confirme).unwrap();
        assert_eq!(trajet.places, 1);

        trajet.transition(r, Annule).unwrap();
        assert_eq!(trajet.places, 2);

        // Annuler une réservation déjà annulée ne rend pas de place en plus
        trajet.transition(r, Annule).unwrap();
        assert_eq!(trajet.places, 2);
        trajet.verifier_invariant();
    }

    #[test]
    fn test_refus_apres_confirmation_rend_la_place() {
        let mut trajet = TrajetSimule::new(1);
        let r = trajet.reserver();
        trajet.transition(r, Confirme).unwrap();
        assert_eq!(trajet.places, 0);

        trajet.transition(r, Refuse).unwrap();
        assert_eq!(trajet.places, 1);
        trajet.verifier_invariant();
    }

    #[test]
    fn test_refus_en_attente_sans_effet_sur_compteur() {
        let mut trajet = TrajetSimule::new(1);
        let r = trajet.reserver();
        trajet.transition(r, Refuse).unwrap();
        assert_eq!(trajet.places, 1);
    }
}
