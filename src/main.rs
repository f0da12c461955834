use actix_cors::Cors;
use actix_web::{web, App, HttpResponse, HttpServer};
use personalization_service::clients::{HttpTextEmbedder, HttpTopicClassifier};
use personalization_service::db::{ensure_tables, PgStorage};
use personalization_service::handlers::{self, PersonalizationState};
use personalization_service::services::ThreadRngSource;
use personalization_service::storage::Storage;
use personalization_service::Config;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;
use tracing_actix_web::TracingLogger;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

struct HealthState {
    db_pool: PgPool,
}

async fn health_summary(state: web::Data<HealthState>) -> HttpResponse {
    match sqlx::query("SELECT 1").fetch_one(&state.db_pool).await {
        Ok(_) => HttpResponse::Ok().json(serde_json::json!({
            "status": "ok",
            "service": "personalization-service",
            "version": env!("CARGO_PKG_VERSION")
        })),
        Err(e) => HttpResponse::ServiceUnavailable().json(serde_json::json!({
            "status": "unhealthy",
            "error": format!("PostgreSQL connection failed: {}", e),
            "service": "personalization-service"
        })),
    }
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    // Load config
    let config = Config::from_env().expect("Failed to load config");

    info!(
        "Starting personalization-service on {}:{}",
        config.app.host, config.app.port
    );

    // Initialize database pool and schema
    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database.url)
        .await
        .expect("Failed to connect to Postgres");

    ensure_tables(&pool)
        .await
        .expect("Failed to ensure personalization tables");

    // Inference sidecars
    let classifier = Arc::new(HttpTopicClassifier::new(&config.inference));
    let embedder = Arc::new(HttpTextEmbedder::new(&config.inference));

    let storage: Arc<dyn Storage> = Arc::new(PgStorage::new(pool.clone()));
    let state = web::Data::new(PersonalizationState::new(
        storage,
        classifier,
        embedder,
        Arc::new(ThreadRngSource),
        &config,
    ));
    let health_state = web::Data::new(HealthState { db_pool: pool });

    let bind_addr = (config.app.host.clone(), config.app.port);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .app_data(health_state.clone())
            .wrap(TracingLogger::default())
            .wrap(Cors::permissive())
            .configure(handlers::configure)
            .route("/health", web::get().to(health_summary))
    })
    .bind(bind_addr)?
    .run()
    .await
}
