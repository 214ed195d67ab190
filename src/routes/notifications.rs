use actix_web::{delete, get, patch, web, HttpResponse};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use tokio_stream::{wrappers::BroadcastStream, StreamExt};

use crate::middleware::AuthUser;
use crate::models::dto::{pagination_meta, PaginationQuery};
use crate::models::notifications::{self, Column as NotificationColumn, Entity as Notifications};
use crate::routes::{reponse_acces_refuse, reponse_erreur_bd, reponse_introuvable};
use crate::services::notification_service::NotificationHub;

/// GET /api/notifications - Notifications de l'utilisateur (PROTÉGÉE)
#[get("")]
pub async fn mes_notifications(
    auth_user: AuthUser,
    db: web::Data<DatabaseConnection>,
    pagination: web::Query<PaginationQuery>,
) -> HttpResponse {
    let page = pagination.page();
    let limit = pagination.limit();

    let paginateur = Notifications::find()
        .filter(NotificationColumn::UserId.eq(auth_user.user_id))
        .order_by_desc(NotificationColumn::CreatedAt)
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

/// GET /api/notifications/stream - Flux SSE des notifications (PROTÉGÉE)
///
/// Livraison at-most-once : seuls les événements émis pendant l'abonnement
/// sont poussés. L'historique complet reste disponible via GET /notifications.
#[get("/stream")]
pub async fn flux_notifications(
    auth_user: AuthUser,
    hub: web::Data<NotificationHub>,
) -> HttpResponse {
    let user_id = auth_user.user_id;

    let flux = BroadcastStream::new(hub.subscribe()).filter_map(move |evenement| {
        match evenement {
            Ok(e) if e.user_id == user_id => {
                let json = serde_json::to_string(&e).unwrap_or_default();
                Some(Ok::<web::Bytes, actix_web::Error>(web::Bytes::from(
                    format!("data: {}\n\n", json),
                )))
            }
            // Événements d'autres utilisateurs, ou retard de lecture
            // (RecvError::Lagged) : simplement passés sous silence
            _ => None,
        }
    });

    HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header(("Cache-Control", "no-cache"))
        .streaming(flux)
}

/// PATCH /api/notifications/toutes-lues - Tout marquer comme lu (PROTÉGÉE)
#[patch("/toutes-lues")]
pub async fn tout_marquer_lu(
    auth_user: AuthUser,
    db: web::Data<DatabaseConnection>,
) -> HttpResponse {
    let resultat = Notifications::update_many()
        .col_expr(NotificationColumn::Lu, Expr::value(true))
        .filter(NotificationColumn::UserId.eq(auth_user.user_id))
        .filter(NotificationColumn::Lu.eq(false))
        .exec(db.get_ref())
        .await;

    match resultat {
        Ok(r) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "data": { "marquees": r.rows_affected }
        })),
        Err(e) => reponse_erreur_bd(e),
    }
}

/// PATCH /api/notifications/{id}/lue - Marquer comme lue (PROTÉGÉE, destinataire)
#[patch("/{id}/lue")]
pub async fn marquer_lue(
    auth_user: AuthUser,
    chemin: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> HttpResponse {
    let notification = match Notifications::find_by_id(chemin.into_inner())
        .one(db.get_ref())
        .await
    {
        Ok(Some(notification)) => notification,
        Ok(None) => return reponse_introuvable("Notification introuvable"),
        Err(e) => return reponse_erreur_bd(e),
    };

    if notification.user_id != auth_user.user_id {
        return reponse_acces_refuse("Cette notification ne vous appartient pas");
    }

    let mut active: notifications::ActiveModel = notification.into();
    active.lu = Set(true);

    match active.update(db.get_ref()).await {
        Ok(notification) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "data": notification
        })),
        Err(e) => reponse_erreur_bd(e),
    }
}

/// DELETE /api/notifications/{id} - Supprimer une notification (PROTÉGÉE, destinataire)
#[delete("/{id}")]
pub async fn supprimer_notification(
    auth_user: AuthUser,
    chemin: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> HttpResponse {
    let notification = match Notifications::find_by_id(chemin.into_inner())
        .one(db.get_ref())
        .await
    {
        Ok(Some(notification)) => notification,
        Ok(None) => return reponse_introuvable("Notification introuvable"),
        Err(e) => return reponse_erreur_bd(e),
    };

    if notification.user_id != auth_user.user_id {
        return reponse_acces_refuse("Cette notification ne vous appartient pas");
    }

    match notification.delete(db.get_ref()).await {
        Ok(_) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "data": { "message": "Notification supprimée" }
        })),
        Err(e) => reponse_erreur_bd(e),
    }
}

pub fn notification_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/notifications")
            .service(mes_notifications)
            .service(flux_notifications)
            .service(tout_marquer_lu)
            .service(marquer_lue)
            .service(supprimer_notification),
    );
}
