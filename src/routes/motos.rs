use actix_web::{delete, get, post, web, HttpResponse};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder, Set,
};
use chrono::Utc;
use validator::Validate;

use crate::middleware::AuthUser;
use crate::models::dto::{erreurs_validation, CreateMotoRequest};
use crate::models::motos::{self, Column as MotoColumn, Entity as Motos};
use crate::models::users::Role;
use crate::routes::{reponse_acces_refuse, reponse_erreur_bd, reponse_introuvable};
use crate::routes::vehicules::STATUT_EN_ATTENTE;

// Même parcours que les véhicules : déclaration par le conducteur,
// approbation par un administrateur.

/// GET /api/motos - Motos du conducteur authentifié (PROTÉGÉE)
#[get("")]
pub async fn mes_motos(auth_user: AuthUser, db: web::Data<DatabaseConnection>) -> HttpResponse {
    match Motos::find()
        .filter(MotoColumn::ConducteurId.eq(auth_user.user_id))
        .order_by_asc(MotoColumn::Id)
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

/// POST /api/motos - Déclarer une moto (PROTÉGÉE, conducteurs)
#[post("")]
pub async fn creer_moto(
    auth_user: AuthUser,
    body: web::Json<CreateMotoRequest>,
    db: web::Data<DatabaseConnection>,
) -> HttpResponse {
    if auth_user.role == Role::Passager {
        return reponse_acces_refuse("Seuls les conducteurs peuvent déclarer une moto");
    }

    if let Err(erreurs) = body.validate() {
        return HttpResponse::BadRequest().json(erreurs_validation(&erreurs));
    }

    match Motos::find()
        .filter(MotoColumn::Immatriculation.eq(&body.immatriculation))
        .one(db.get_ref())
        .await
    {
        Ok(Some(_)) => {
            return HttpResponse::Conflict().json(serde_json::json!({
                "success": false,
                "error": { "code": "CONFLIT", "message": "Une moto existe déjà avec cette immatriculation" }
            }));
        }
        Err(e) => return reponse_erreur_bd(e),
        _ => {}
    }

    let nouvelle = motos::ActiveModel {
        conducteur_id: Set(auth_user.user_id),
        marque: Set(body.marque.clone()),
        modele: Set(body.modele.clone()),
        immatriculation: Set(body.immatriculation.clone()),
        cylindree: Set(body.cylindree),
        statut: Set(STATUT_EN_ATTENTE.to_string()),
        created_at: Set(Some(Utc::now().naive_utc())),
        ..Default::default()
    };

    match nouvelle.insert(db.get_ref()).await {
        Ok(moto) => HttpResponse::Created().json(serde_json::json!({
            "success": true,
            "data": moto
        })),
        Err(e) => reponse_erreur_bd(e),
    }
}

/// DELETE /api/motos/{id} - Supprimer une moto (PROTÉGÉE, propriétaire ou admin)
#[delete("/{id}")]
pub async fn supprimer_moto(
    auth_user: AuthUser,
    chemin: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> HttpResponse {
    let moto = match Motos::find_by_id(chemin.into_inner()).one(db.get_ref()).await {
        Ok(Some(moto)) => moto,
        Ok(None) => return reponse_introuvable("Moto introuvable"),
        Err(e) => return reponse_erreur_bd(e),
    };

    if !auth_user.is_admin() && moto.conducteur_id != auth_user.user_id {
        return reponse_acces_refuse("Vous ne pouvez pas supprimer cette moto");
    }

    match moto.delete(db.get_ref()).await {
        Ok(_) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "data": { "message": "Moto supprimée" }
        })),
        Err(e) => reponse_erreur_bd(e),
    }
}

pub fn moto_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/motos")
            .service(mes_motos)
            .service(creer_moto)
            .service(supprimer_moto),
    );
}
