use actix_web::HttpRequest;
use sea_orm::*;
use chrono::Utc;

use crate::models::audit_log;

pub struct AuditService;

impl AuditService {
    /// Ajoute une entrée au journal d'audit avec l'IP et le user-agent de la
    /// requête quand ils sont disponibles. Un échec d'écriture est signalé
    /// puis ignoré : le journal n'est jamais bloquant pour l'action admin
    /// déjà effectuée.
    pub async fn journaliser(
        db: &DatabaseConnection,
        admin_id: i32,
        action: &str,
        cible_type: Option<&str>,
        cible_id: Option<i32>,
        details: String,
        req: &HttpRequest,
    ) {
        let infos = req.connection_info();
        let ip = infos.realip_remote_addr().map(|s| s.to_string());
        drop(infos);
        let user_agent = req
            .headers()
            .get("User-Agent")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let entree = audit_log::ActiveModel {
            admin_id: Set(admin_id),
            action: Set(action.to_string()),
            cible_type: Set(cible_type.map(|s| s.to_string())),
            cible_id: Set(cible_id),
            details: Set(details),
            ip: Set(ip),
            user_agent: Set(user_agent),
            created_at: Set(Some(Utc::now().naive_utc())),
            ..Default::default()
        };

        if let Err(e) = entree.insert(db).await {
            eprintln!("⚠️  Failed to write audit log entry for action {}: {}", action, e);
        }
    }
}
