mod models;
mod routes;
mod db;
mod services;
mod utils;
mod middleware;

use actix_cors::Cors;
use actix_web::{http, web, App, HttpServer};

use crate::services::notification_service::NotificationHub;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();

    println!("🔌 Connecting to database...");
    let db = db::establish_connection()
        .await
        .expect("Failed to connect to database");
    println!("✅ Database connected!");

    // Canal de diffusion des notifications temps réel (voir notification_service)
    let hub = web::Data::new(NotificationHub::new(256));

    let adresse = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    println!("🚀 Starting server on http://{}:{}", adresse, port);

    HttpServer::new(move || {
        // Origines autorisées pour le CORS (front web + app mobile en dev)
        let origines = std::env::var("ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000,http://localhost:5173".to_string());

        let mut cors = Cors::default()
            .allowed_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"])
            .allowed_headers(vec![http::header::AUTHORIZATION, http::header::CONTENT_TYPE])
            .supports_credentials()
            .max_age(3600);
        for origine in origines.split(',').map(str::trim).filter(|o| !o.is_empty()) {
            cors = cors.allowed_origin(origine);
        }

        App::new()
            .wrap(cors)
            .app_data(web::Data::new(db.clone()))
            .app_data(hub.clone())
            .configure(routes::configure_routes)
    })
    .bind((adresse.as_str(), port))?
    .run()
    .await
}
