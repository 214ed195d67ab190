use actix_web::{delete, get, post, put, web, HttpResponse};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use chrono::Utc;
use validator::Validate;

use crate::middleware::AuthUser;
use crate::models::dto::{
    erreurs_validation, pagination_meta, CreateTrajetRequest, FiltreTrajets, PaginationQuery,
    UpdateTrajetRequest,
};
use crate::models::reservations::{self, Entity as Reservations, StatutReservation};
use crate::models::trajets::{self, Column as TrajetColumn, Entity as Trajets, StatutTrajet};
use crate::models::users::Role;
use crate::routes::{
    reponse_acces_refuse, reponse_erreur_bd, reponse_erreur_service, reponse_introuvable,
};
use crate::services::notification_service::{NotificationHub, NotificationService};
use crate::services::trajet_service::TrajetService;

/// GET /api/trajets - Liste paginée des trajets (PUBLIC)
///
/// Déclenche au passage la clôture des trajets dont la date est passée
/// (routine opportuniste, pas de planificateur dédié).
#[get("")]
pub async fn lister_trajets(
    db: web::Data<DatabaseConnection>,
    pagination: web::Query<PaginationQuery>,
    filtres: web::Query<FiltreTrajets>,
) -> HttpResponse {
    if let Err(e) = TrajetService::cloturer_trajets_passes(db.get_ref()).await {
        eprintln!("⚠️  Failed to close past trips: {}", e);
    }

    let mut requete = Trajets::find();

    if let Some(depart) = &filtres.depart {
        requete = requete.filter(TrajetColumn::Depart.contains(depart));
    }
    if let Some(destination) = &filtres.destination {
        requete = requete.filter(TrajetColumn::Destination.contains(destination));
    }
    if let Some(zone_depart_id) = filtres.zone_depart_id {
        requete = requete.filter(TrajetColumn::ZoneDepartId.eq(zone_depart_id));
    }
    if let Some(zone_arrivee_id) = filtres.zone_arrivee_id {
        requete = requete.filter(TrajetColumn::ZoneArriveeId.eq(zone_arrivee_id));
    }
    if let Some(statut) = &filtres.statut {
        match StatutTrajet::from_str(statut) {
            Some(statut) => requete = requete.filter(TrajetColumn::Statut.eq(statut.as_str())),
            None => {
                return HttpResponse::BadRequest().json(serde_json::json!({
                    "success": false,
                    "error": { "code": "REQUETE_INVALIDE", "message": "Statut de trajet inconnu" }
                }));
            }
        }
    }

    let page = pagination.page();
    let limit = pagination.limit();
    let paginateur = requete
        .order_by_asc(TrajetColumn::DateDepart)
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

/// GET /api/trajets/mes-trajets - Trajets publiés par le conducteur (PROTÉGÉE)
#[get("/mes-trajets")]
pub async fn mes_trajets(
    auth_user: AuthUser,
    db: web::Data<DatabaseConnection>,
    pagination: web::Query<PaginationQuery>,
) -> HttpResponse {
    let page = pagination.page();
    let limit = pagination.limit();

    let paginateur = Trajets::find()
        .filter(TrajetColumn::ConducteurId.eq(auth_user.user_id))
        .order_by_desc(TrajetColumn::DateDepart)
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

/// GET /api/trajets/{id} - Détail d'un trajet (PUBLIC)
#[get("/{id}")]
pub async fn detail_trajet(
    chemin: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> HttpResponse {
    match Trajets::find_by_id(chemin.into_inner()).one(db.get_ref()).await {
        Ok(Some(trajet)) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "data": trajet
        })),
        Ok(None) => reponse_introuvable("Trajet introuvable"),
        Err(e) => reponse_erreur_bd(e),
    }
}

/// POST /api/trajets - Publier un trajet (PROTÉGÉE, conducteurs)
#[post("")]
pub async fn creer_trajet(
    auth_user: AuthUser,
    body: web::Json<CreateTrajetRequest>,
    db: web::Data<DatabaseConnection>,
) -> HttpResponse {
    if auth_user.role == Role::Passager {
        return reponse_acces_refuse("Seuls les conducteurs peuvent publier un trajet");
    }

    if let Err(erreurs) = body.validate() {
        return HttpResponse::BadRequest().json(erreurs_validation(&erreurs));
    }

    if body.date_depart <= Utc::now().naive_utc() {
        return HttpResponse::BadRequest().json(serde_json::json!({
            "success": false,
            "error": { "code": "REQUETE_INVALIDE", "message": "La date de départ doit être dans le futur" }
        }));
    }

    let nouveau = trajets::ActiveModel {
        conducteur_id: Set(auth_user.user_id),
        depart: Set(body.depart.clone()),
        destination: Set(body.destination.clone()),
        zone_depart_id: Set(body.zone_depart_id),
        zone_arrivee_id: Set(body.zone_arrivee_id),
        date_depart: Set(body.date_depart),
        prix: Set(body.prix),
        capacite: Set(body.capacite),
        places_disponibles: Set(body.capacite),
        statut: Set(StatutTrajet::Ouvert.as_str().to_string()),
        description: Set(body.description.clone()),
        created_at: Set(Some(Utc::now().naive_utc())),
        ..Default::default()
    };

    match nouveau.insert(db.get_ref()).await {
        Ok(trajet) => HttpResponse::Created().json(serde_json::json!({
            "success": true,
            "data": trajet
        })),
        Err(e) => reponse_erreur_bd(e),
    }
}

/// PUT /api/trajets/{id} - Modifier un trajet (PROTÉGÉE, conducteur du trajet ou admin)
#[put("/{id}")]
pub async fn modifier_trajet(
    auth_user: AuthUser,
    chemin: web::Path<i32>,
    body: web::Json<UpdateTrajetRequest>,
    db: web::Data<DatabaseConnection>,
) -> HttpResponse {
    if let Err(erreurs) = body.validate() {
        return HttpResponse::BadRequest().json(erreurs_validation(&erreurs));
    }

    let trajet = match Trajets::find_by_id(chemin.into_inner()).one(db.get_ref()).await {
        Ok(Some(trajet)) => trajet,
        Ok(None) => return reponse_introuvable("Trajet introuvable"),
        Err(e) => return reponse_erreur_bd(e),
    };

    if !auth_user.is_admin() && trajet.conducteur_id != auth_user.user_id {
        return reponse_acces_refuse("Vous ne pouvez pas modifier ce trajet");
    }

    match StatutTrajet::from_str(&trajet.statut) {
        Some(StatutTrajet::Termine) | Some(StatutTrajet::Annule) => {
            return HttpResponse::BadRequest().json(serde_json::json!({
                "success": false,
                "error": { "code": "REQUETE_INVALIDE", "message": "Ce trajet est clôturé" }
            }));
        }
        _ => {}
    }

    let mut active: trajets::ActiveModel = trajet.into();
    if let Some(depart) = &body.depart {
        active.depart = Set(depart.clone());
    }
    if let Some(destination) = &body.destination {
        active.destination = Set(destination.clone());
    }
    if let Some(zone_depart_id) = body.zone_depart_id {
        active.zone_depart_id = Set(Some(zone_depart_id));
    }
    if let Some(zone_arrivee_id) = body.zone_arrivee_id {
        active.zone_arrivee_id = Set(Some(zone_arrivee_id));
    }
    if let Some(date_depart) = body.date_depart {
        active.date_depart = Set(date_depart);
    }
    if let Some(prix) = body.prix {
        active.prix = Set(prix);
    }
    if let Some(description) = &body.description {
        active.description = Set(Some(description.clone()));
    }

    match active.update(db.get_ref()).await {
        Ok(trajet) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "data": trajet
        })),
        Err(e) => reponse_erreur_bd(e),
    }
}

/// DELETE /api/trajets/{id} - Annuler un trajet (PROTÉGÉE, conducteur ou admin)
///
/// Les passagers ayant une réservation encore vivante sont prévenus.
#[delete("/{id}")]
pub async fn annuler_trajet(
    auth_user: AuthUser,
    chemin: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
    hub: web::Data<NotificationHub>,
) -> HttpResponse {
    let trajet_id = chemin.into_inner();

    // Récupérer les passagers à prévenir avant de basculer les statuts
    let a_prevenir: Vec<i32> = match Reservations::find()
        .filter(reservations::Column::TrajetId.eq(trajet_id))
        .filter(reservations::Column::Statut.is_in([
            StatutReservation::EnAttente.as_str(),
            StatutReservation::Confirme.as_str(),
        ]))
        .all(db.get_ref())
        .await
    {
        Ok(liste) => liste.into_iter().map(|r| r.passager_id).collect(),
        Err(e) => return reponse_erreur_bd(e),
    };

    let trajet = match TrajetService::annuler(db.get_ref(), trajet_id, &auth_user).await {
        Ok(trajet) => trajet,
        Err(e) => return reponse_erreur_service(e),
    };

    // Effet de bord hors transaction : l'annulation reste acquise même si
    // une notification échoue
    for passager_id in a_prevenir {
        if let Err(e) = NotificationService::envoyer(
            db.get_ref(),
            hub.get_ref(),
            passager_id,
            "trajet",
            "Trajet annulé",
            &format!(
                "Le trajet {} → {} du {} a été annulé",
                trajet.depart, trajet.destination, trajet.date_depart
            ),
        )
        .await
        {
            eprintln!("⚠️  Failed to notify passenger {}: {}", passager_id, e);
        }
    }

    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "data": trajet
    }))
}

pub fn trajet_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/trajets")
            .service(lister_trajets)
            .service(mes_trajets)
            .service(creer_trajet)
            .service(detail_trajet)
            .service(modifier_trajet)
            .service(annuler_trajet),
    );
}
