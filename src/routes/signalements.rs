use actix_web::{get, post, web, HttpResponse};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use chrono::Utc;
use validator::Validate;

use crate::middleware::AuthUser;
use crate::models::dto::{
    erreurs_validation, pagination_meta, CreateSignalementRequest, PaginationQuery,
};
use crate::models::signalements::{self, Column as SignalementColumn, Entity as Signalements};
use crate::models::trajets::Entity as Trajets;
use crate::models::users::Entity as Users;
use crate::routes::{reponse_erreur_bd, reponse_introuvable};

pub const STATUT_OUVERT: &str = "ouvert";
pub const STATUT_TRAITE: &str = "traite";
pub const STATUT_REJETE: &str = "rejete";

/// POST /api/signalements - Signaler un utilisateur ou un trajet (PROTÉGÉE)
#[post("")]
pub async fn creer_signalement(
    auth_user: AuthUser,
    body: web::Json<CreateSignalementRequest>,
    db: web::Data<DatabaseConnection>,
) -> HttpResponse {
    if let Err(erreurs) = body.validate() {
        return HttpResponse::BadRequest().json(erreurs_validation(&erreurs));
    }

    // Un signalement vise au moins un utilisateur ou un trajet
    if body.cible_user_id.is_none() && body.trajet_id.is_none() {
        return HttpResponse::BadRequest().json(serde_json::json!({
            "success": false,
            "error": { "code": "REQUETE_INVALIDE", "message": "Un signalement doit viser un utilisateur ou un trajet" }
        }));
    }

    if let Some(cible_user_id) = body.cible_user_id {
        match Users::find_by_id(cible_user_id).one(db.get_ref()).await {
            Ok(Some(_)) => {}
            Ok(None) => return reponse_introuvable("Utilisateur signalé introuvable"),
            Err(e) => return reponse_erreur_bd(e),
        }
    }
    if let Some(trajet_id) = body.trajet_id {
        match Trajets::find_by_id(trajet_id).one(db.get_ref()).await {
            Ok(Some(_)) => {}
            Ok(None) => return reponse_introuvable("Trajet signalé introuvable"),
            Err(e) => return reponse_erreur_bd(e),
        }
    }

    let nouveau = signalements::ActiveModel {
        auteur_id: Set(auth_user.user_id),
        cible_user_id: Set(body.cible_user_id),
        trajet_id: Set(body.trajet_id),
        motif: Set(body.motif.clone()),
        description: Set(body.description.clone()),
        statut: Set(STATUT_OUVERT.to_string()),
        created_at: Set(Some(Utc::now().naive_utc())),
        ..Default::default()
    };

    match nouveau.insert(db.get_ref()).await {
        Ok(signalement) => HttpResponse::Created().json(serde_json::json!({
            "success": true,
            "data": signalement
        })),
        Err(e) => reponse_erreur_bd(e),
    }
}

/// GET /api/signalements/mes-signalements - Signalements déposés par
/// l'utilisateur (PROTÉGÉE)
#[get("/mes-signalements")]
pub async fn mes_signalements(
    auth_user: AuthUser,
    db: web::Data<DatabaseConnection>,
    pagination: web::Query<PaginationQuery>,
) -> HttpResponse {
    let page = pagination.page();
    let limit = pagination.limit();

    let paginateur = Signalements::find()
        .filter(SignalementColumn::AuteurId.eq(auth_user.user_id))
        .order_by_desc(SignalementColumn::CreatedAt)
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

pub fn signalement_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/signalements")
            .service(creer_signalement)
            .service(mes_signalements),
    );
}
