mod api;
mod config;
mod database;
mod jobs;
mod middleware;
mod models;
mod services;
mod state;
mod utils;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::{AppConfig, StoreBackend};
use crate::database::{DraftStore, MemoryDraftStore, MemoryStore, MongoDraftStore, MongoStore, Store};
use crate::state::AppState;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("❌ Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    log::info!("🚀 Starting Venture Registry...");
    log::info!("🏷️  Environment: {}", if config.production { "production" } else { "development" });

    let (store, drafts): (Arc<dyn Store>, Arc<dyn DraftStore>) = match config.store_backend {
        StoreBackend::Memory => {
            log::warn!("⚠️  Using the in-memory store; data is lost on restart");
            (Arc::new(MemoryStore::new()), Arc::new(MemoryDraftStore::new()))
        }
        StoreBackend::Mongo => {
            let url = config.database_url.clone().unwrap_or_default();
            let db = match database::MongoDB::new(&url).await {
                Ok(db) => db,
                Err(e) => {
                    log::error!("❌ Failed to connect to MongoDB: {}", e);
                    std::process::exit(1);
                }
            };
            log::info!("✅ MongoDB connected successfully");
            (Arc::new(MongoStore::new(db.clone())), Arc::new(MongoDraftStore::new(db)))
        }
    };

    let storage = services::storage_service::build_storage(&config.storage, &config.jwt.secret);

    log::info!("📅 Starting background jobs...");
    jobs::application_expiry::start_application_expiry(store.clone(), drafts.clone());
    log::info!("✅ Background jobs started");

    let host = config.host.clone();
    let port = config.port;
    let state = web::Data::new(AppState::new(store, drafts, storage, config));

    log::info!("🌐 Server starting on {}:{}", host, port);
    log::info!("📚 Swagger UI available at: http://{}:{}/swagger-ui/", host, port);
    log::info!("📄 OpenAPI spec at: http://{}:{}/api-docs/openapi.json", host, port);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin("http://localhost:3000")
            .allowed_origin("http://localhost:5173")
            .allowed_origin("http://127.0.0.1:3000")
            .allowed_origin("http://127.0.0.1:5173")
            .allowed_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                actix_web::http::header::AUTHORIZATION,
                actix_web::http::header::CONTENT_TYPE,
                actix_web::http::header::ACCEPT,
                actix_web::http::header::CACHE_CONTROL,
            ])
            .expose_headers(vec![actix_web::http::header::CONTENT_TYPE])
            .supports_credentials()
            .max_age(3600);

        let openapi = api::swagger::ApiDoc::openapi();

        App::new()
            .app_data(state.clone())
            .app_data(web::JsonConfig::default().limit(16 * 1024 * 1024))
            .wrap(cors)
            .wrap(middleware::SecurityHeaders)
            .wrap(Logger::default())
            .service(SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", openapi))
            .route("/health", web::get().to(api::health::health_check))
            .route("/metrics", web::get().to(api::metrics::get_metrics))
            .configure(api::configure)
    })
    .bind(format!("{}:{}", host, port))?
    .run()
    .await
}
