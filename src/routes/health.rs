use actix_web::{get, web, HttpResponse};
use chrono::Utc;
use sea_orm::DatabaseConnection;

#[get("/health")]
pub async fn health_check(db: web::Data<DatabaseConnection>) -> HttpResponse {
    let bd_ok = db.ping().await.is_ok();

    HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "data": {
            "status": if bd_ok { "ok" } else { "degraded" },
            "database": bd_ok,
            "time": Utc::now(),
        }
    }))
}
