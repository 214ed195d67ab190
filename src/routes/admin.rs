// Routes /api/admin : toutes gardées par l'extracteur AdminUser, et chaque
// mutation réussie écrit une entrée dans le journal d'audit.

use actix_web::{delete, get, patch, post, put, web, HttpRequest, HttpResponse};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use chrono::Utc;
use serde::Deserialize;
use validator::Validate;

use crate::middleware::AdminUser;
use crate::models::audit_log::{self, Column as AuditColumn, Entity as AuditLog};
use crate::models::demandes_conducteur::{self, Column as DemandeColumn, Entity as Demandes};
use crate::models::dto::{
    erreurs_validation, pagination_meta, AdminUpdateUserRequest, CreateZoneRequest,
    FiltreUtilisateurs, PaginationQuery, RefuserDemandeRequest, SuspendreUserRequest,
    TraiterSignalementRequest, UpdateZoneRequest, UserResponse,
};
use crate::models::motos::{self, Column as MotoColumn, Entity as Motos};
use crate::models::reservations::{Column as ReservationColumn, Entity as Reservations, StatutReservation};
use crate::models::signalements::{self, Column as SignalementColumn, Entity as Signalements};
use crate::models::trajets::{Column as TrajetColumn, Entity as Trajets, StatutTrajet};
use crate::models::users::{self, Column as UserColumn, Entity as Users, Role, StatutCompte};
use crate::models::vehicules::{self, Column as VehiculeColumn, Entity as Vehicules};
use crate::models::zones::{self, Column as ZoneColumn, Entity as Zones};
use crate::routes::onboarding::{
    STATUT_APPROUVEE, STATUT_EN_ATTENTE as DEMANDE_EN_ATTENTE, STATUT_REFUSEE,
};
use crate::routes::signalements::{STATUT_OUVERT, STATUT_REJETE, STATUT_TRAITE};
use crate::routes::vehicules::{STATUT_APPROUVE, STATUT_EN_ATTENTE, STATUT_REFUSE};
use crate::routes::{reponse_erreur_bd, reponse_introuvable};
use crate::services::audit_service::AuditService;
use crate::services::notification_service::{NotificationHub, NotificationService};

#[derive(Debug, Deserialize)]
pub struct FiltreStatut {
    pub statut: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AuditQuery {
    pub format: Option<String>,
}

fn reponse_requete_invalide(message: &str) -> HttpResponse {
    HttpResponse::BadRequest().json(serde_json::json!({
        "success": false,
        "error": { "code": "REQUETE_INVALIDE", "message": message }
    }))
}

fn reponse_conflit(message: &str) -> HttpResponse {
    HttpResponse::Conflict().json(serde_json::json!({
        "success": false,
        "error": { "code": "CONFLIT", "message": message }
    }))
}

// ---------------------------------------------------------------------------
// Utilisateurs
// ---------------------------------------------------------------------------

/// GET /api/admin/users - Liste paginée, filtrable par rôle et statut
#[get("/users")]
pub async fn lister_utilisateurs(
    _admin: AdminUser,
    db: web::Data<DatabaseConnection>,
    pagination: web::Query<PaginationQuery>,
    filtres: web::Query<FiltreUtilisateurs>,
) -> HttpResponse {
    let mut requete = Users::find();

    if let Some(role) = &filtres.role {
        match Role::from_str(role) {
            Some(role) => requete = requete.filter(UserColumn::Role.eq(role.as_str())),
            None => return reponse_requete_invalide("Rôle inconnu"),
        }
    }
    if let Some(statut) = &filtres.statut {
        match StatutCompte::from_str(statut) {
            Some(statut) => requete = requete.filter(UserColumn::Statut.eq(statut.as_str())),
            None => return reponse_requete_invalide("Statut de compte inconnu"),
        }
    }

    let page = pagination.page();
    let limit = pagination.limit();
    let paginateur = requete.order_by_asc(UserColumn::Id).paginate(db.get_ref(), limit);

    let total = match paginateur.num_items().await {
        Ok(total) => total,
        Err(e) => return reponse_erreur_bd(e),
    };
    let liste = match paginateur.fetch_page(page - 1).await {
        Ok(liste) => liste,
        Err(e) => return reponse_erreur_bd(e),
    };

    let data: Vec<UserResponse> = liste.into_iter().map(UserResponse::from).collect();

    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "data": data,
        "meta": pagination_meta(page, limit, total),
    }))
}

/// PATCH /api/admin/users/{id} - Modifier rôle et/ou statut
#[patch("/users/{id}")]
pub async fn modifier_utilisateur(
    admin: AdminUser,
    req: HttpRequest,
    chemin: web::Path<i32>,
    body: web::Json<AdminUpdateUserRequest>,
    db: web::Data<DatabaseConnection>,
) -> HttpResponse {
    let role = match &body.role {
        Some(valeur) => match Role::from_str(valeur) {
            Some(role) => Some(role),
            None => return reponse_requete_invalide("Rôle inconnu"),
        },
        None => None,
    };
    let statut = match &body.statut {
        Some(valeur) => match StatutCompte::from_str(valeur) {
            Some(statut) => Some(statut),
            None => return reponse_requete_invalide("Statut de compte inconnu"),
        },
        None => None,
    };
    if role.is_none() && statut.is_none() {
        return reponse_requete_invalide("Aucun champ à modifier");
    }

    let user = match Users::find_by_id(chemin.into_inner()).one(db.get_ref()).await {
        Ok(Some(user)) => user,
        Ok(None) => return reponse_introuvable("Utilisateur introuvable"),
        Err(e) => return reponse_erreur_bd(e),
    };
    let user_id = user.id;
    let email = user.email.clone();

    let mut changements: Vec<String> = Vec::new();
    let mut active: users::ActiveModel = user.into();
    if let Some(role) = role {
        active.role = Set(role.as_str().to_string());
        changements.push(format!("rôle → {}", role.as_str()));
    }
    if let Some(statut) = statut {
        active.statut = Set(statut.as_str().to_string());
        changements.push(format!("statut → {}", statut.as_str()));
    }

    let user = match active.update(db.get_ref()).await {
        Ok(user) => user,
        Err(e) => return reponse_erreur_bd(e),
    };

    AuditService::journaliser(
        db.get_ref(),
        admin.user_id,
        "modification_utilisateur",
        Some("user"),
        Some(user_id),
        format!("Modification de {} : {}", email, changements.join(", ")),
        &req,
    )
    .await;

    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "data": UserResponse::from(user)
    }))
}

/// DELETE /api/admin/users/{id} - Supprimer définitivement un compte
#[delete("/users/{id}")]
pub async fn supprimer_utilisateur(
    admin: AdminUser,
    req: HttpRequest,
    chemin: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> HttpResponse {
    let user_id = chemin.into_inner();
    if user_id == admin.user_id {
        return reponse_requete_invalide("Impossible de supprimer son propre compte");
    }

    let user = match Users::find_by_id(user_id).one(db.get_ref()).await {
        Ok(Some(user)) => user,
        Ok(None) => return reponse_introuvable("Utilisateur introuvable"),
        Err(e) => return reponse_erreur_bd(e),
    };
    let email = user.email.clone();

    if let Err(e) = user.delete(db.get_ref()).await {
        return reponse_erreur_bd(e);
    }

    AuditService::journaliser(
        db.get_ref(),
        admin.user_id,
        "suppression_utilisateur",
        Some("user"),
        Some(user_id),
        format!("Suppression du compte {}", email),
        &req,
    )
    .await;

    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "data": { "message": "Utilisateur supprimé" }
    }))
}

/// POST /api/admin/users/{id}/suspendre - Suspendre un compte
///
/// Exige une justification d'au moins 10 caractères. Le refresh token
/// stocké est effacé : la session ne survivra pas à l'expiration du token
/// d'accès courant.
#[post("/users/{id}/suspendre")]
pub async fn suspendre_utilisateur(
    admin: AdminUser,
    req: HttpRequest,
    chemin: web::Path<i32>,
    body: web::Json<SuspendreUserRequest>,
    db: web::Data<DatabaseConnection>,
    hub: web::Data<NotificationHub>,
) -> HttpResponse {
    if let Err(erreurs) = body.validate() {
        return HttpResponse::BadRequest().json(erreurs_validation(&erreurs));
    }

    let user = match Users::find_by_id(chemin.into_inner()).one(db.get_ref()).await {
        Ok(Some(user)) => user,
        Ok(None) => return reponse_introuvable("Utilisateur introuvable"),
        Err(e) => return reponse_erreur_bd(e),
    };

    if user.statut == StatutCompte::Suspendu.as_str() {
        return reponse_conflit("Ce compte est déjà suspendu");
    }

    let user_id = user.id;
    let email = user.email.clone();

    let mut active: users::ActiveModel = user.into();
    active.statut = Set(StatutCompte::Suspendu.as_str().to_string());
    active.refresh_token = Set(None);
    if let Err(e) = active.update(db.get_ref()).await {
        return reponse_erreur_bd(e);
    }

    AuditService::journaliser(
        db.get_ref(),
        admin.user_id,
        "suspension_utilisateur",
        Some("user"),
        Some(user_id),
        format!("Suspension de {} : {}", email, body.motif),
        &req,
    )
    .await;

    if let Err(e) = NotificationService::envoyer(
        db.get_ref(),
        hub.get_ref(),
        user_id,
        "compte",
        "Compte suspendu",
        &format!("Votre compte a été suspendu : {}", body.motif),
    )
    .await
    {
        eprintln!("⚠️  Failed to notify user {}: {}", user_id, e);
    }

    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "data": { "message": "Utilisateur suspendu" }
    }))
}

/// POST /api/admin/users/{id}/reactiver - Réactiver un compte suspendu
#[post("/users/{id}/reactiver")]
pub async fn reactiver_utilisateur(
    admin: AdminUser,
    req: HttpRequest,
    chemin: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> HttpResponse {
    let user = match Users::find_by_id(chemin.into_inner()).one(db.get_ref()).await {
        Ok(Some(user)) => user,
        Ok(None) => return reponse_introuvable("Utilisateur introuvable"),
        Err(e) => return reponse_erreur_bd(e),
    };

    if user.statut == StatutCompte::Actif.as_str() {
        return reponse_conflit("Ce compte est déjà actif");
    }

    let user_id = user.id;
    let email = user.email.clone();

    let mut active: users::ActiveModel = user.into();
    active.statut = Set(StatutCompte::Actif.as_str().to_string());
    if let Err(e) = active.update(db.get_ref()).await {
        return reponse_erreur_bd(e);
    }

    AuditService::journaliser(
        db.get_ref(),
        admin.user_id,
        "reactivation_utilisateur",
        Some("user"),
        Some(user_id),
        format!("Réactivation du compte {}", email),
        &req,
    )
    .await;

    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "data": { "message": "Utilisateur réactivé" }
    }))
}

// ---------------------------------------------------------------------------
// Demandes conducteur (onboarding)
// ---------------------------------------------------------------------------

/// GET /api/admin/onboarding - Demandes conducteur, filtrables par statut
#[get("/onboarding")]
pub async fn lister_demandes(
    _admin: AdminUser,
    db: web::Data<DatabaseConnection>,
    pagination: web::Query<PaginationQuery>,
    filtre: web::Query<FiltreStatut>,
) -> HttpResponse {
    let mut requete = Demandes::find();
    if let Some(statut) = &filtre.statut {
        if ![DEMANDE_EN_ATTENTE, STATUT_APPROUVEE, STATUT_REFUSEE].contains(&statut.as_str()) {
            return reponse_requete_invalide("Statut de demande inconnu");
        }
        requete = requete.filter(DemandeColumn::Statut.eq(statut.as_str()));
    }

    let page = pagination.page();
    let limit = pagination.limit();
    let paginateur = requete
        .order_by_desc(DemandeColumn::CreatedAt)
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

/// POST /api/admin/onboarding/{id}/approuver - Approuver une demande
///
/// Promotion du rôle, création du véhicule approuvé et clôture de la
/// demande dans une seule transaction. Le nouveau rôle ne sera visible
/// dans les claims qu'au prochain token émis.
#[post("/onboarding/{id}/approuver")]
pub async fn approuver_demande(
    admin: AdminUser,
    req: HttpRequest,
    chemin: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
    hub: web::Data<NotificationHub>,
) -> HttpResponse {
    let txn = match db.begin().await {
        Ok(txn) => txn,
        Err(e) => return reponse_erreur_bd(e),
    };

    let demande = match Demandes::find_by_id(chemin.into_inner()).one(&txn).await {
        Ok(Some(demande)) => demande,
        Ok(None) => return reponse_introuvable("Demande introuvable"),
        Err(e) => return reponse_erreur_bd(e),
    };

    if demande.statut != DEMANDE_EN_ATTENTE {
        return reponse_conflit("Cette demande a déjà été traitée");
    }

    let user = match Users::find_by_id(demande.user_id).one(&txn).await {
        Ok(Some(user)) => user,
        Ok(None) => return reponse_introuvable("Utilisateur introuvable"),
        Err(e) => return reponse_erreur_bd(e),
    };

    match Vehicules::find()
        .filter(VehiculeColumn::Immatriculation.eq(&demande.immatriculation))
        .one(&txn)
        .await
    {
        Ok(Some(_)) => {
            return reponse_conflit("Un véhicule existe déjà avec cette immatriculation");
        }
        Err(e) => return reponse_erreur_bd(e),
        _ => {}
    }

    let email = user.email.clone();
    let demande_user_id = demande.user_id;
    let demande_id = demande.id;

    let mut user_actif: users::ActiveModel = user.into();
    user_actif.role = Set(Role::Conducteur.as_str().to_string());
    if let Err(e) = user_actif.update(&txn).await {
        return reponse_erreur_bd(e);
    }

    let vehicule = vehicules::ActiveModel {
        conducteur_id: Set(demande_user_id),
        marque: Set(demande.marque.clone()),
        modele: Set(demande.modele.clone()),
        couleur: Set(None),
        immatriculation: Set(demande.immatriculation.clone()),
        nb_places: Set(demande.nb_places),
        statut: Set(STATUT_APPROUVE.to_string()),
        created_at: Set(Some(Utc::now().naive_utc())),
        ..Default::default()
    };
    let vehicule = match vehicule.insert(&txn).await {
        Ok(vehicule) => vehicule,
        Err(e) => return reponse_erreur_bd(e),
    };

    let mut demande_active: demandes_conducteur::ActiveModel = demande.into();
    demande_active.statut = Set(STATUT_APPROUVEE.to_string());
    demande_active.traitee_le = Set(Some(Utc::now().naive_utc()));
    let demande = match demande_active.update(&txn).await {
        Ok(demande) => demande,
        Err(e) => return reponse_erreur_bd(e),
    };

    if let Err(e) = txn.commit().await {
        return reponse_erreur_bd(e);
    }

    AuditService::journaliser(
        db.get_ref(),
        admin.user_id,
        "approbation_demande_conducteur",
        Some("demande_conducteur"),
        Some(demande_id),
        format!("Promotion de {} en conducteur, véhicule {} créé", email, vehicule.immatriculation),
        &req,
    )
    .await;

    if let Err(e) = NotificationService::envoyer(
        db.get_ref(),
        hub.get_ref(),
        demande_user_id,
        "onboarding",
        "Demande approuvée",
        "Votre demande a été approuvée, vous êtes maintenant conducteur. Reconnectez-vous pour activer votre nouveau rôle.",
    )
    .await
    {
        eprintln!("⚠️  Failed to notify user {}: {}", demande_user_id, e);
    }

    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "data": { "demande": demande, "vehicule": vehicule }
    }))
}

/// POST /api/admin/onboarding/{id}/refuser - Refuser une demande
#[post("/onboarding/{id}/refuser")]
pub async fn refuser_demande(
    admin: AdminUser,
    req: HttpRequest,
    chemin: web::Path<i32>,
    body: web::Json<RefuserDemandeRequest>,
    db: web::Data<DatabaseConnection>,
    hub: web::Data<NotificationHub>,
) -> HttpResponse {
    if let Err(erreurs) = body.validate() {
        return HttpResponse::BadRequest().json(erreurs_validation(&erreurs));
    }

    let demande = match Demandes::find_by_id(chemin.into_inner()).one(db.get_ref()).await {
        Ok(Some(demande)) => demande,
        Ok(None) => return reponse_introuvable("Demande introuvable"),
        Err(e) => return reponse_erreur_bd(e),
    };

    if demande.statut != DEMANDE_EN_ATTENTE {
        return reponse_conflit("Cette demande a déjà été traitée");
    }

    let demande_id = demande.id;
    let demande_user_id = demande.user_id;

    let mut active: demandes_conducteur::ActiveModel = demande.into();
    active.statut = Set(STATUT_REFUSEE.to_string());
    active.motif_refus = Set(Some(body.motif.clone()));
    active.traitee_le = Set(Some(Utc::now().naive_utc()));
    let demande = match active.update(db.get_ref()).await {
        Ok(demande) => demande,
        Err(e) => return reponse_erreur_bd(e),
    };

    AuditService::journaliser(
        db.get_ref(),
        admin.user_id,
        "refus_demande_conducteur",
        Some("demande_conducteur"),
        Some(demande_id),
        format!("Refus de la demande : {}", body.motif),
        &req,
    )
    .await;

    if let Err(e) = NotificationService::envoyer(
        db.get_ref(),
        hub.get_ref(),
        demande_user_id,
        "onboarding",
        "Demande refusée",
        &format!("Votre demande a été refusée : {}", body.motif),
    )
    .await
    {
        eprintln!("⚠️  Failed to notify user {}: {}", demande_user_id, e);
    }

    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "data": demande
    }))
}

// ---------------------------------------------------------------------------
// Validation des véhicules et motos
// ---------------------------------------------------------------------------

/// GET /api/admin/vehicules/en-attente - Véhicules à valider
#[get("/vehicules/en-attente")]
pub async fn vehicules_en_attente(
    _admin: AdminUser,
    db: web::Data<DatabaseConnection>,
) -> HttpResponse {
    match Vehicules::find()
        .filter(VehiculeColumn::Statut.eq(STATUT_EN_ATTENTE))
        .order_by_asc(VehiculeColumn::CreatedAt)
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

async fn valider_vehicule(
    admin: AdminUser,
    req: HttpRequest,
    vehicule_id: i32,
    nouveau_statut: &str,
    db: &DatabaseConnection,
    hub: &NotificationHub,
) -> HttpResponse {
    let vehicule = match Vehicules::find_by_id(vehicule_id).one(db).await {
        Ok(Some(vehicule)) => vehicule,
        Ok(None) => return reponse_introuvable("Véhicule introuvable"),
        Err(e) => return reponse_erreur_bd(e),
    };

    if vehicule.statut != STATUT_EN_ATTENTE {
        return reponse_conflit("Ce véhicule a déjà été traité");
    }

    let conducteur_id = vehicule.conducteur_id;
    let immatriculation = vehicule.immatriculation.clone();

    let mut active: vehicules::ActiveModel = vehicule.into();
    active.statut = Set(nouveau_statut.to_string());
    let vehicule = match active.update(db).await {
        Ok(vehicule) => vehicule,
        Err(e) => return reponse_erreur_bd(e),
    };

    let approuve = nouveau_statut == STATUT_APPROUVE;
    AuditService::journaliser(
        db,
        admin.user_id,
        if approuve { "approbation_vehicule" } else { "refus_vehicule" },
        Some("vehicule"),
        Some(vehicule.id),
        format!(
            "{} du véhicule {}",
            if approuve { "Approbation" } else { "Refus" },
            immatriculation
        ),
        &req,
    )
    .await;

    if let Err(e) = NotificationService::envoyer(
        db,
        hub,
        conducteur_id,
        "vehicule",
        if approuve { "Véhicule approuvé" } else { "Véhicule refusé" },
        &format!(
            "Votre véhicule {} a été {}",
            immatriculation,
            if approuve { "approuvé" } else { "refusé" }
        ),
    )
    .await
    {
        eprintln!("⚠️  Failed to notify driver {}: {}", conducteur_id, e);
    }

    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "data": vehicule
    }))
}

/// PATCH /api/admin/vehicules/{id}/approuver
#[patch("/vehicules/{id}/approuver")]
pub async fn approuver_vehicule(
    admin: AdminUser,
    req: HttpRequest,
    chemin: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
    hub: web::Data<NotificationHub>,
) -> HttpResponse {
    valider_vehicule(admin, req, chemin.into_inner(), STATUT_APPROUVE, db.get_ref(), hub.get_ref()).await
}

/// PATCH /api/admin/vehicules/{id}/refuser
#[patch("/vehicules/{id}/refuser")]
pub async fn refuser_vehicule(
    admin: AdminUser,
    req: HttpRequest,
    chemin: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
    hub: web::Data<NotificationHub>,
) -> HttpResponse {
    valider_vehicule(admin, req, chemin.into_inner(), STATUT_REFUSE, db.get_ref(), hub.get_ref()).await
}

/// GET /api/admin/motos/en-attente - Motos à valider
#[get("/motos/en-attente")]
pub async fn motos_en_attente(_admin: AdminUser, db: web::Data<DatabaseConnection>) -> HttpResponse {
    match Motos::find()
        .filter(MotoColumn::Statut.eq(STATUT_EN_ATTENTE))
        .order_by_asc(MotoColumn::CreatedAt)
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

async fn valider_moto(
    admin: AdminUser,
    req: HttpRequest,
    moto_id: i32,
    nouveau_statut: &str,
    db: &DatabaseConnection,
    hub: &NotificationHub,
) -> HttpResponse {
    let moto = match Motos::find_by_id(moto_id).one(db).await {
        Ok(Some(moto)) => moto,
        Ok(None) => return reponse_introuvable("Moto introuvable"),
        Err(e) => return reponse_erreur_bd(e),
    };

    if moto.statut != STATUT_EN_ATTENTE {
        return reponse_conflit("Cette moto a déjà été traitée");
    }

    let conducteur_id = moto.conducteur_id;
    let immatriculation = moto.immatriculation.clone();

    let mut active: motos::ActiveModel = moto.into();
    active.statut = Set(nouveau_statut.to_string());
    let moto = match active.update(db).await {
        Ok(moto) => moto,
        Err(e) => return reponse_erreur_bd(e),
    };

    let approuve = nouveau_statut == STATUT_APPROUVE;
    AuditService::journaliser(
        db,
        admin.user_id,
        if approuve { "approbation_moto" } else { "refus_moto" },
        Some("moto"),
        Some(moto.id),
        format!(
            "{} de la moto {}",
            if approuve { "Approbation" } else { "Refus" },
            immatriculation
        ),
        &req,
    )
    .await;

    if let Err(e) = NotificationService::envoyer(
        db,
        hub,
        conducteur_id,
        "vehicule",
        if approuve { "Moto approuvée" } else { "Moto refusée" },
        &format!(
            "Votre moto {} a été {}",
            immatriculation,
            if approuve { "approuvée" } else { "refusée" }
        ),
    )
    .await
    {
        eprintln!("⚠️  Failed to notify driver {}: {}", conducteur_id, e);
    }

    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "data": moto
    }))
}

/// PATCH /api/admin/motos/{id}/approuver
#[patch("/motos/{id}/approuver")]
pub async fn approuver_moto(
    admin: AdminUser,
    req: HttpRequest,
    chemin: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
    hub: web::Data<NotificationHub>,
) -> HttpResponse {
    valider_moto(admin, req, chemin.into_inner(), STATUT_APPROUVE, db.get_ref(), hub.get_ref()).await
}

/// PATCH /api/admin/motos/{id}/refuser
#[patch("/motos/{id}/refuser")]
pub async fn refuser_moto(
    admin: AdminUser,
    req: HttpRequest,
    chemin: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
    hub: web::Data<NotificationHub>,
) -> HttpResponse {
    valider_moto(admin, req, chemin.into_inner(), STATUT_REFUSE, db.get_ref(), hub.get_ref()).await
}

// ---------------------------------------------------------------------------
// Signalements
// ---------------------------------------------------------------------------

/// GET /api/admin/signalements - Signalements, filtrables par statut
#[get("/signalements")]
pub async fn lister_signalements(
    _admin: AdminUser,
    db: web::Data<DatabaseConnection>,
    pagination: web::Query<PaginationQuery>,
    filtre: web::Query<FiltreStatut>,
) -> HttpResponse {
    let mut requete = Signalements::find();
    if let Some(statut) = &filtre.statut {
        if ![STATUT_OUVERT, STATUT_TRAITE, STATUT_REJETE].contains(&statut.as_str()) {
            return reponse_requete_invalide("Statut de signalement inconnu");
        }
        requete = requete.filter(SignalementColumn::Statut.eq(statut.as_str()));
    }

    let page = pagination.page();
    let limit = pagination.limit();
    let paginateur = requete
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

/// PATCH /api/admin/signalements/{id} - Clore un signalement (traite | rejete)
#[patch("/signalements/{id}")]
pub async fn traiter_signalement(
    admin: AdminUser,
    req: HttpRequest,
    chemin: web::Path<i32>,
    body: web::Json<TraiterSignalementRequest>,
    db: web::Data<DatabaseConnection>,
) -> HttpResponse {
    if ![STATUT_TRAITE, STATUT_REJETE].contains(&body.statut.as_str()) {
        return reponse_requete_invalide("Statut attendu : traite ou rejete");
    }

    let signalement = match Signalements::find_by_id(chemin.into_inner()).one(db.get_ref()).await {
        Ok(Some(signalement)) => signalement,
        Ok(None) => return reponse_introuvable("Signalement introuvable"),
        Err(e) => return reponse_erreur_bd(e),
    };

    if signalement.statut != STATUT_OUVERT {
        return reponse_conflit("Ce signalement a déjà été clos");
    }

    let signalement_id = signalement.id;
    let motif = signalement.motif.clone();

    let mut active: signalements::ActiveModel = signalement.into();
    active.statut = Set(body.statut.clone());
    let signalement = match active.update(db.get_ref()).await {
        Ok(signalement) => signalement,
        Err(e) => return reponse_erreur_bd(e),
    };

    AuditService::journaliser(
        db.get_ref(),
        admin.user_id,
        "traitement_signalement",
        Some("signalement"),
        Some(signalement_id),
        format!("Signalement \"{}\" clos en {}", motif, body.statut),
        &req,
    )
    .await;

    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "data": signalement
    }))
}

// ---------------------------------------------------------------------------
// Zones
// ---------------------------------------------------------------------------

/// POST /api/admin/zones - Créer une zone
#[post("/zones")]
pub async fn creer_zone(
    admin: AdminUser,
    req: HttpRequest,
    body: web::Json<CreateZoneRequest>,
    db: web::Data<DatabaseConnection>,
) -> HttpResponse {
    if let Err(erreurs) = body.validate() {
        return HttpResponse::BadRequest().json(erreurs_validation(&erreurs));
    }

    match Zones::find().filter(ZoneColumn::Nom.eq(&body.nom)).one(db.get_ref()).await {
        Ok(Some(_)) => return reponse_conflit("Une zone existe déjà avec ce nom"),
        Err(e) => return reponse_erreur_bd(e),
        _ => {}
    }

    let nouvelle = zones::ActiveModel {
        nom: Set(body.nom.clone()),
        ville: Set(body.ville.clone()),
        description: Set(body.description.clone()),
        latitude: Set(body.latitude),
        longitude: Set(body.longitude),
        created_at: Set(Some(Utc::now().naive_utc())),
        ..Default::default()
    };

    let zone = match nouvelle.insert(db.get_ref()).await {
        Ok(zone) => zone,
        Err(e) => return reponse_erreur_bd(e),
    };

    AuditService::journaliser(
        db.get_ref(),
        admin.user_id,
        "creation_zone",
        Some("zone"),
        Some(zone.id),
        format!("Création de la zone {}", zone.nom),
        &req,
    )
    .await;

    HttpResponse::Created().json(serde_json::json!({
        "success": true,
        "data": zone
    }))
}

/// PUT /api/admin/zones/{id} - Modifier une zone
#[put("/zones/{id}")]
pub async fn modifier_zone(
    admin: AdminUser,
    req: HttpRequest,
    chemin: web::Path<i32>,
    body: web::Json<UpdateZoneRequest>,
    db: web::Data<DatabaseConnection>,
) -> HttpResponse {
    if let Err(erreurs) = body.validate() {
        return HttpResponse::BadRequest().json(erreurs_validation(&erreurs));
    }

    let zone = match Zones::find_by_id(chemin.into_inner()).one(db.get_ref()).await {
        Ok(Some(zone)) => zone,
        Ok(None) => return reponse_introuvable("Zone introuvable"),
        Err(e) => return reponse_erreur_bd(e),
    };

    if let Some(nom) = &body.nom {
        if *nom != zone.nom {
            match Zones::find().filter(ZoneColumn::Nom.eq(nom)).one(db.get_ref()).await {
                Ok(Some(_)) => return reponse_conflit("Une zone existe déjà avec ce nom"),
                Err(e) => return reponse_erreur_bd(e),
                _ => {}
            }
        }
    }

    let zone_id = zone.id;
    let mut active: zones::ActiveModel = zone.into();
    if let Some(nom) = &body.nom {
        active.nom = Set(nom.clone());
    }
    if let Some(ville) = &body.ville {
        active.ville = Set(Some(ville.clone()));
    }
    if let Some(description) = &body.description {
        active.description = Set(Some(description.clone()));
    }
    if let Some(latitude) = body.latitude {
        active.latitude = Set(Some(latitude));
    }
    if let Some(longitude) = body.longitude {
        active.longitude = Set(Some(longitude));
    }

    let zone = match active.update(db.get_ref()).await {
        Ok(zone) => zone,
        Err(e) => return reponse_erreur_bd(e),
    };

    AuditService::journaliser(
        db.get_ref(),
        admin.user_id,
        "modification_zone",
        Some("zone"),
        Some(zone_id),
        format!("Modification de la zone {}", zone.nom),
        &req,
    )
    .await;

    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "data": zone
    }))
}

/// DELETE /api/admin/zones/{id} - Supprimer une zone
#[delete("/zones/{id}")]
pub async fn supprimer_zone(
    admin: AdminUser,
    req: HttpRequest,
    chemin: web::Path<i32>,
    db: web::Data<DatabaseConnection>,
) -> HttpResponse {
    let zone = match Zones::find_by_id(chemin.into_inner()).one(db.get_ref()).await {
        Ok(Some(zone)) => zone,
        Ok(None) => return reponse_introuvable("Zone introuvable"),
        Err(e) => return reponse_erreur_bd(e),
    };

    let zone_id = zone.id;
    let nom = zone.nom.clone();

    if let Err(e) = zone.delete(db.get_ref()).await {
        return reponse_erreur_bd(e);
    }

    AuditService::journaliser(
        db.get_ref(),
        admin.user_id,
        "suppression_zone",
        Some("zone"),
        Some(zone_id),
        format!("Suppression de la zone {}", nom),
        &req,
    )
    .await;

    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "data": { "message": "Zone supprimée" }
    }))
}

// ---------------------------------------------------------------------------
// Statistiques et journal d'audit
// ---------------------------------------------------------------------------

/// GET /api/admin/stats - Compteurs agrégés de la plateforme
#[get("/stats")]
pub async fn statistiques(_admin: AdminUser, db: web::Data<DatabaseConnection>) -> HttpResponse {
    let resultat: Result<serde_json::Value, DbErr> = async {
        let db = db.get_ref();

        let utilisateurs = serde_json::json!({
            "total": Users::find().count(db).await?,
            "passagers": Users::find().filter(UserColumn::Role.eq(Role::Passager.as_str())).count(db).await?,
            "conducteurs": Users::find().filter(UserColumn::Role.eq(Role::Conducteur.as_str())).count(db).await?,
            "suspendus": Users::find().filter(UserColumn::Statut.eq(StatutCompte::Suspendu.as_str())).count(db).await?,
        });

        let trajets = serde_json::json!({
            "total": Trajets::find().count(db).await?,
            "ouverts": Trajets::find().filter(TrajetColumn::Statut.is_in([
                StatutTrajet::Ouvert.as_str(),
                StatutTrajet::Plein.as_str(),
            ])).count(db).await?,
            "termines": Trajets::find().filter(TrajetColumn::Statut.eq(StatutTrajet::Termine.as_str())).count(db).await?,
            "annules": Trajets::find().filter(TrajetColumn::Statut.eq(StatutTrajet::Annule.as_str())).count(db).await?,
        });

        let reservations = serde_json::json!({
            "total": Reservations::find().count(db).await?,
            "en_attente": Reservations::find().filter(ReservationColumn::Statut.eq(StatutReservation::EnAttente.as_str())).count(db).await?,
            "confirmees": Reservations::find().filter(ReservationColumn::Statut.eq(StatutReservation::Confirme.as_str())).count(db).await?,
        });

        Ok(serde_json::json!({
            "utilisateurs": utilisateurs,
            "trajets": trajets,
            "reservations": reservations,
            "signalements_ouverts": Signalements::find().filter(SignalementColumn::Statut.eq(STATUT_OUVERT)).count(db).await?,
            "demandes_en_attente": Demandes::find().filter(DemandeColumn::Statut.eq(DEMANDE_EN_ATTENTE)).count(db).await?,
        }))
    }
    .await;

    match resultat {
        Ok(stats) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "data": stats
        })),
        Err(e) => reponse_erreur_bd(e),
    }
}

fn csv_echapper(valeur: &str) -> String {
    if valeur.contains(',') || valeur.contains('"') || valeur.contains('\n') {
        format!("\"{}\"", valeur.replace('"', "\"\""))
    } else {
        valeur.to_string()
    }
}

fn audit_en_csv(entrees: &[audit_log::Model]) -> String {
    let mut csv =
        String::from("id,admin_id,action,cible_type,cible_id,details,ip,user_agent,created_at\n");
    for e in entrees {
        let ligne = [
            e.id.to_string(),
            e.admin_id.to_string(),
            csv_echapper(&e.action),
            csv_echapper(e.cible_type.as_deref().unwrap_or("")),
            e.cible_id.map(|i| i.to_string()).unwrap_or_default(),
            csv_echapper(&e.details),
            csv_echapper(e.ip.as_deref().unwrap_or("")),
            csv_echapper(e.user_agent.as_deref().unwrap_or("")),
            e.created_at.map(|d| d.to_string()).unwrap_or_default(),
        ];
        csv.push_str(&ligne.join(","));
        csv.push('\n');
    }
    csv
}

/// GET /api/admin/audit - Journal d'audit paginé ; ?format=csv pour l'export
#[get("/audit")]
pub async fn lister_audit(
    _admin: AdminUser,
    db: web::Data<DatabaseConnection>,
    pagination: web::Query<PaginationQuery>,
    format_demande: web::Query<AuditQuery>,
) -> HttpResponse {
    let page = pagination.page();
    let limit = pagination.limit();

    let paginateur = AuditLog::find()
        .order_by_desc(AuditColumn::CreatedAt)
        .paginate(db.get_ref(), limit);

    let total = match paginateur.num_items().await {
        Ok(total) => total,
        Err(e) => return reponse_erreur_bd(e),
    };
    let liste = match paginateur.fetch_page(page - 1).await {
        Ok(liste) => liste,
        Err(e) => return reponse_erreur_bd(e),
    };

    if format_demande.format.as_deref() == Some("csv") {
        return HttpResponse::Ok()
            .content_type("text/csv; charset=utf-8")
            .insert_header(("Content-Disposition", "attachment; filename=\"audit.csv\""))
            .body(audit_en_csv(&liste));
    }

    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "data": liste,
        "meta": pagination_meta(page, limit, total),
    }))
}

pub fn admin_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin")
            .service(lister_utilisateurs)
            .service(modifier_utilisateur)
            .service(supprimer_utilisateur)
            .service(suspendre_utilisateur)
            .service(reactiver_utilisateur)
            .service(lister_demandes)
            .service(approuver_demande)
            .service(refuser_demande)
            .service(vehicules_en_attente)
            .service(approuver_vehicule)
            .service(refuser_vehicule)
            .service(motos_en_attente)
            .service(approuver_moto)
            .service(refuser_moto)
            .service(lister_signalements)
            .service(traiter_signalement)
            .service(creer_zone)
            .service(modifier_zone)
            .service(supprimer_zone)
            .service(statistiques)
            .service(lister_audit),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_echapper() {
        assert_eq!(csv_echapper("simple"), "simple");
        assert_eq!(csv_echapper("avec, virgule"), "\"avec, virgule\"");
        assert_eq!(csv_echapper("avec \"guillemets\""), "\"avec \"\"guillemets\"\"\"");
        assert_eq!(csv_echapper("avec\nretour"), "\"avec\nretour\"");
    }

    #[test]
    fn test_audit_en_csv() {
        let entrees = vec![audit_log::Model {
            id: 1,
            admin_id: 2,
            action: "suspension_utilisateur".to_string(),
            cible_type: Some("user".to_string()),
            cible_id: Some(9),
            details: "Suspension de ama@example.com : spam, répété".to_string(),
            ip: Some("127.0.0.1".to_string()),
            user_agent: None,
            created_at: None,
        }];

        let csv = audit_en_csv(&entrees);
        let lignes: Vec<&str> = csv.lines().collect();
        assert_eq!(lignes.len(), 2);
        assert!(lignes[0].starts_with("id,admin_id,action"));
        assert!(lignes[1].contains("suspension_utilisateur"));
        // Le détail contient une virgule : il doit être entre guillemets
        assert!(lignes[1].contains("\"Suspension de ama@example.com : spam, répété\""));
    }
}
