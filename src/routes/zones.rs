use actix_web::{get, web, HttpResponse};
use sea_orm::{DatabaseConnection, EntityTrait, PaginatorTrait, QueryOrder};

use crate::models::dto::{pagination_meta, PaginationQuery};
use crate::models::zones::{Column as ZoneColumn, Entity as Zones};
use crate::routes::{reponse_erreur_bd, reponse_introuvable};

// Lecture publique ; les mutations sont réservées aux administrateurs
// (voir routes/admin.rs).

/// GET /api/zones - Liste paginée des zones (PUBLIC)
#[get("")]
pub async fn lister_zones(
    db: web::Data<DatabaseConnection>,
    pagination: web::Query<PaginationQuery>,
) -> HttpResponse {
    let page = pagination.page();
    let limit = pagination.limit();

    let paginateur = Zones::find()
        .order_by_asc(ZoneColumn::Nom)
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

/// GET /api/zones/{id} - Détail d'une zone (PUBLIC)
#[get("/{id}")]
pub async fn detail_zone(chemin: web::Path<i32>, db: web::Data<DatabaseConnection>) -> HttpResponse {
    match Zones::find_by_id(chemin.into_inner()).one(db.get_ref()).await {
        Ok(Some(zone)) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "data": zone
        })),
        Ok(None) => reponse_introuvable("Zone introuvable"),
        Err(e) => reponse_erreur_bd(e),
    }
}

pub fn zone_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/zones")
            .service(lister_zones)
            .service(detail_zone),
    );
}
