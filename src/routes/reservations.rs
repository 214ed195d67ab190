use actix_web::{delete, get, patch, post, web, HttpResponse};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
};
use validator::Validate;

use crate::middleware::AuthUser;
use crate::models::dto::{
    erreurs_validation, pagination_meta, CreateReservationRequest, PaginationQuery,
    UpdateReservationRequest,
};
use crate::models::reservations::{Column as ReservationColumn, Entity as Reservations, StatutReservation};
use crate::models::trajets::Entity as Trajets;
use crate::routes::{
    reponse_acces_refuse, reponse_erreur_bd, reponse_erreur_service, reponse_introuvable,
};
use crate::services::notification_service::{NotificationHub, NotificationService};
use crate::services::reservation_service::ReservationService;

/// POST /api/reservations - Réserver une place sur un trajet (PROTÉGÉE)
///
/// Le conducteur du trajet est prévenu (effet de bord, hors transaction).
#[post("")]
pub async fn creer_reservation(
    auth_user: AuthUser,
    body: web::Json<CreateReservationRequest>,
    db: web::Data<DatabaseConnection>,
    hub: web::Data<NotificationHub>,
) -> HttpResponse {
    if let Err(erreurs) = body.validate() {
        return HttpResponse::BadRequest().json(erreurs_validation(&erreurs));
    }

    let (reservation, trajet) = match ReservationService::creer(
        db.get_ref(),
        auth_user.user_id,
        body.trajet_id,
        body.message.clone(),
    )
    .await
    {
        Ok(resultat) => resultat,
        Err(e) => return reponse_erreur_service(e),
    };

    if let Err(e) = NotificationService::envoyer(
        db.get_ref(),
        hub.get_ref(),
        trajet.conducteur_id,
        "reservation",
        "Nouvelle demande de réservation",
        &format!(
            "Un passager souhaite réserver une place sur le trajet {} → {}",
            trajet.depart, trajet.destination
        ),
    )
    .await
    {
        eprintln!("⚠️  Failed to notify driver {}: {}", trajet.conducteur_id, e);
    }

    HttpResponse::Created().json(serde_json::json!({
        "success": true,
        "data": reservation
    }))
}

/// GET /api/reservations - Réservations du passager authentifié (PROTÉGÉE)
#[get("")]
pub async fn mes_reservations(
    auth_user: AuthUser,
    db: web::Data<DatabaseConnection>,
    pagination: web::Query<PaginationQuery>,
) -> HttpResponse {
    let page = pagination.page();
    let limit = pagination.limit();

    let paginateur = Reservations::find()
        .filter(ReservationColumn::PassagerId.eq(auth_user.user_id))
        .order_by_desc(ReservationColumn::CreatedAt)
        .paginate(db.get_ref(), limit);

    let total = match paginateur.num_items().await {
        Ok(total) => total,
        Err(e) => return reponse_erreur_bd(e),
    };
    let liste = match paginateur.fetch_page(page - 1).await {
        Ok(liste) => liste,
        Err(e) => return reponse_erreur_bd(e),
    };

    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "data": liste,
        "meta": pagination_meta(page, limit, total),
    }))
}

/// GET /api/reservations/trajet/{id} - Réservations d'un trajet (PROTÉGÉE,
/// conducteur du trajet ou admin)
#[get("/trajet/{id}")]
pub async fn reservations_du_trajet(
    auth_user: AuthUser,
    chemin: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> HttpResponse {
    let trajet_id = chemin.into_inner();

    let trajet = match Trajets::find_by_id(trajet_id).one(db.get_ref()).await {
        Ok(Some(trajet)) => trajet,
        Ok(None) => return reponse_introuvable("Trajet introuvable"),
        Err(e) => return reponse_erreur_bd(e),
    };

    if !auth_user.is_admin() && trajet.conducteur_id != auth_user.user_id {
        return reponse_acces_refuse("Seul le conducteur du trajet peut consulter ses réservations");
    }

    match Reservations::find()
        .filter(ReservationColumn::TrajetId.eq(trajet_id))
        .order_by_asc(ReservationColumn::CreatedAt)
        .all(db.get_ref())
        .await
    {
        Ok(liste) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "data": liste
        })),
        Err(e) => reponse_erreur_bd(e),
    }
}

/// PATCH /api/reservations/{id} - Transition de statut (PROTÉGÉE,
/// conducteur du trajet ou admin)
///
/// Le passager est prévenu d'une confirmation ou d'un refus.
#[patch("/{id}")]
pub async fn changer_statut_reservation(
    auth_user: AuthUser,
    chemin: web::Path<i32>,
    body: web::Json<UpdateReservationRequest>,
    db: web::Data<DatabaseConnection>,
    hub: web::Data<NotificationHub>,
) -> HttpResponse {
    let nouveau_statut = match StatutReservation::from_str(&body.statut) {
        Some(statut) => statut,
        None => {
            return HttpResponse::BadRequest().json(serde_json::json!({
                "success": false,
                "error": { "code": "REQUETE_INVALIDE", "message": "Statut de réservation inconnu" }
            }));
        }
    };

    let reservation = match ReservationService::changer_statut(
        db.get_ref(),
        chemin.into_inner(),
        nouveau_statut,
        &auth_user,
    )
    .await
    {
        Ok(reservation) => reservation,
        Err(e) => return reponse_erreur_service(e),
    };

    let annonce = match nouveau_statut {
        StatutReservation::Confirme => Some(("Réservation confirmée", "Votre réservation a été confirmée")),
        StatutReservation::Refuse => Some(("Réservation refusée", "Votre réservation a été refusée")),
        _ => None,
    };
    if let Some((titre, message)) = annonce {
        if let Err(e) = NotificationService::envoyer(
            db.get_ref(),
            hub.get_ref(),
            reservation.passager_id,
            "reservation",
            titre,
            message,
        )
        .await
        {
            eprintln!(
                "⚠️  Failed to notify passenger {}: {}",
                reservation.passager_id, e
            );
        }
    }

    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "data": reservation
    }))
}

/// DELETE /api/reservations/{id} - Supprimer une réservation (PROTÉGÉE,
/// passager propriétaire, conducteur du trajet ou admin)
#[delete("/{id}")]
pub async fn supprimer_reservation(
    auth_user: AuthUser,
    chemin: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> HttpResponse {
    match ReservationService::supprimer(db.get_ref(), chemin.into_inner(), &auth_user).await {
        Ok(()) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "data": { "message": "Réservation supprimée" }
        })),
        Err(e) => reponse_erreur_service(e),
    }
}

pub fn reservation_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/reservations")
            .service(creer_reservation)
            .service(mes_reservations)
            .service(reservations_du_trajet)
            .service(changer_statut_reservation)
            .service(supprimer_reservation),
    );
}
