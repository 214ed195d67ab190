use actix_web::{delete, get, post, put, web, HttpResponse};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter,
    QueryOrder, Set,
};
use chrono::Utc;
use validator::Validate;

use crate::middleware::AuthUser;
use crate::models::dto::{erreurs_validation, CreateVehiculeRequest, UpdateVehiculeRequest};
use crate::models::users::Role;
use crate::models::vehicules::{self, Column as VehiculeColumn, Entity as Vehicules};
use crate::routes::{reponse_acces_refuse, reponse_erreur_bd, reponse_introuvable};

pub const STATUT_EN_ATTENTE: &str = "en_attente";
pub const STATUT_APPROUVE: &str = "approuve";
pub const STATUT_REFUSE: &str = "refuse";

/// GET /api/vehicules - Véhicules du conducteur authentifié (PROTÉGÉE)
#[get("")]
pub async fn mes_vehicules(auth_user: AuthUser, db: web::Data<DatabaseConnection>) -> HttpResponse {
    match Vehicules::find()
        .filter(VehiculeColumn::ConducteurId.eq(auth_user.user_id))
        .order_by_asc(VehiculeColumn::Id)
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

/// POST /api/vehicules - Déclarer un véhicule (PROTÉGÉE, conducteurs)
///
/// Le véhicule démarre en_attente : seul un administrateur l'approuve.
#[post("")]
pub async fn creer_vehicule(
    auth_user: AuthUser,
    body: web::Json<CreateVehiculeRequest>,
    db: web::Data<DatabaseConnection>,
) -> HttpResponse {
    if auth_user.role == Role::Passager {
        return reponse_acces_refuse("Seuls les conducteurs peuvent déclarer un véhicule");
    }

    if let Err(erreurs) = body.validate() {
        return HttpResponse::BadRequest().json(erreurs_validation(&erreurs));
    }

    // Immatriculation unique sur toute la plateforme
    match Vehicules::find()
        .filter(VehiculeColumn::Immatriculation.eq(&body.immatriculation))
        .one(db.get_ref())
        .await
    {
        Ok(Some(_)) => {
            return HttpResponse::Conflict().json(serde_json::json!({
                "success": false,
                "error": { "code": "CONFLIT", "message": "Un véhicule existe déjà avec cette immatriculation" }
            }));
        }
        Err(e) => return reponse_erreur_bd(e),
        _ => {}
    }

    let nouveau = vehicules::ActiveModel {
        conducteur_id: Set(auth_user.user_id),
        marque: Set(body.marque.clone()),
        modele: Set(body.modele.clone()),
        couleur: Set(body.couleur.clone()),
        immatriculation: Set(body.immatriculation.clone()),
        nb_places: Set(body.nb_places),
        statut: Set(STATUT_EN_ATTENTE.to_string()),
        created_at: Set(Some(Utc::now().naive_utc())),
        ..Default::default()
    };

    match nouveau.insert(db.get_ref()).await {
        Ok(vehicule) => HttpResponse::Created().json(serde_json::json!({
            "success": true,
            "data": vehicule
        })),
        Err(e) => reponse_erreur_bd(e),
    }
}

/// PUT /api/vehicules/{id} - Modifier un véhicule (PROTÉGÉE, propriétaire ou admin)
#[put("/{id}")]
pub async fn modifier_vehicule(
    auth_user: AuthUser,
    chemin: web::Path<i32>,
    body: web::Json<UpdateVehiculeRequest>,
    db: web::Data<DatabaseConnection>,
) -> HttpResponse {
    if let Err(erreurs) = body.validate() {
        return HttpResponse::BadRequest().json(erreurs_validation(&erreurs));
    }

    let vehicule = match Vehicules::find_by_id(chemin.into_inner()).one(db.get_ref()).await {
        Ok(Some(vehicule)) => vehicule,
        Ok(None) => return reponse_introuvable("Véhicule introuvable"),
        Err(e) => return reponse_erreur_bd(e),
    };

    if !auth_user.is_admin() && vehicule.conducteur_id != auth_user.user_id {
        return reponse_acces_refuse("Vous ne pouvez pas modifier ce véhicule");
    }

    let mut active: vehicules::ActiveModel = vehicule.into();
    if let Some(marque) = &body.marque {
        active.marque = Set(marque.clone());
    }
    if let Some(modele) = &body.modele {
        active.modele = Set(modele.clone());
    }
    if let Some(couleur) = &body.couleur {
        active.couleur = Set(Some(couleur.clone()));
    }
    if let Some(nb_places) = body.nb_places {
        active.nb_places = Set(nb_places);
    }

    match active.update(db.get_ref()).await {
        Ok(vehicule) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "data": vehicule
        })),
        Err(e) => reponse_erreur_bd(e),
    }
}

/// DELETE /api/vehicules/{id} - Supprimer un véhicule (PROTÉGÉE, propriétaire ou admin)
#[delete("/{id}")]
pub async fn supprimer_vehicule(
    auth_user: AuthUser,
    chemin: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> HttpResponse {
    let vehicule = match Vehicules::find_by_id(chemin.into_inner()).one(db.get_ref()).await {
        Ok(Some(vehicule)) => vehicule,
        Ok(None) => return reponse_introuvable("Véhicule introuvable"),
        Err(e) => return reponse_erreur_bd(e),
    };

    if !auth_user.is_admin() && vehicule.conducteur_id != auth_user.user_id {
        return reponse_acces_refuse("Vous ne pouvez pas supprimer ce véhicule");
    }

    match vehicule.delete(db.get_ref()).await {
        Ok(_) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "data": { "message": "Véhicule supprimé" }
        })),
        Err(e) => reponse_erreur_bd(e),
    }
}

pub fn vehicule_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/vehicules")
            .service(mes_vehicules)
            .service(creer_vehicule)
            .service(modifier_vehicule)
            .service(supprimer_vehicule),
    );
}
