use actix_cors::Cors;
use actix_web::{error, http::StatusCode, middleware, web, App, HttpResponse, HttpServer};
use lume_pulse::config::{Settings, StoreBackend};
use lume_pulse::core::{CoordinatorContext, MatchTemplate};
use lume_pulse::routes::{self, AppState};
use lume_pulse::services::{
    AppwriteClient, AppwriteCollections, CacheManager, DataStore, MemoryStore, PostgresClient,
    TokenVerifier,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// JSON error response for JSON payload errors
#[derive(Debug, serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}

impl std::fmt::Display for JsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

impl std::error::Error for JsonError {}

impl error::ResponseError for JsonError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::BAD_REQUEST))
            .json(self)
    }
}

/// Handle JSON payload errors
pub fn handle_json_payload_error(err: error::JsonPayloadError, req: &actix_web::HttpRequest) -> actix_web::Error {
    tracing::info!("JSON payload error on {}: {}", req.path(), err);
    JsonError {
        error: "invalid_json".to_string(),
        message: format!("Invalid JSON: {}", err),
        status_code: 400,
    }
    .into()
}

/// Handle query payload errors
pub fn handle_query_payload_error(err: error::QueryPayloadError, _req: &actix_web::HttpRequest) -> actix_web::Error {
    JsonError {
        error: "invalid_query".to_string(),
        message: format!("Invalid query: {}", err),
        status_code: 400,
    }
    .into()
}

fn config_error(message: impl Into<String>) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::InvalidInput, message.into())
}

async fn build_store(settings: &Settings) -> std::io::Result<Arc<dyn DataStore>> {
    match settings.store.backend {
        StoreBackend::Appwrite => {
            let appwrite = settings
                .appwrite
                .as_ref()
                .ok_or_else(|| config_error("store.backend = appwrite requires [appwrite]"))?;

            let collections = AppwriteCollections {
                favorites: settings.collection.favorites.clone(),
                pulse_counts: settings.collection.pulse_counts.clone(),
                notifications: settings.collection.notifications.clone(),
                blocks: settings.collection.blocks.clone(),
                visits: settings.collection.visits.clone(),
            };

            let client = AppwriteClient::new(
                appwrite.endpoint.clone(),
                appwrite.api_key.clone(),
                appwrite.project_id.clone(),
                appwrite.database_id.clone(),
                collections,
                Duration::from_secs(appwrite.timeout_secs.unwrap_or(30)),
            )
            .map_err(|e| config_error(format!("Failed to create Appwrite client: {}", e)))?;

            info!("Appwrite store initialized");
            Ok(Arc::new(client))
        }
        StoreBackend::Postgres => {
            let database = settings
                .database
                .as_ref()
                .ok_or_else(|| config_error("store.backend = postgres requires [database]"))?;

            let client = PostgresClient::from_settings(
                &database.url,
                database.max_connections,
                database.min_connections,
                database.acquire_timeout_secs,
                database.idle_timeout_secs,
            )
            .await
            .map_err(|e| {
                error!("Failed to connect to PostgreSQL: {}", e);
                std::io::Error::new(std::io::ErrorKind::ConnectionRefused, e.to_string())
            })?;

            info!(
                "PostgreSQL store initialized (max: {} connections)",
                database.max_connections.unwrap_or(10)
            );
            Ok(Arc::new(client))
        }
        StoreBackend::Memory => {
            warn!("Using in-memory store; data is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

async fn build_cache(settings: &Settings) -> Arc<CacheManager> {
    let ttl = settings.cache.ttl_secs.unwrap_or(60);
    let l1_size = settings.cache.l1_cache_size.unwrap_or(10_000);

    if let Some(redis_url) = &settings.cache.redis_url {
        match CacheManager::new(redis_url, l1_size, ttl).await {
            Ok(cache) => {
                info!(
                    "Cache manager initialized (L1: {} entries, L2: {}, TTL: {}s)",
                    l1_size,
                    cache.has_l2(),
                    ttl
                );
                return Arc::new(cache);
            }
            Err(e) => {
                error!("Failed to connect to Redis ({}), falling back to L1 only", e);
            }
        }
    }

    info!("Cache manager initialized (L1: {} entries, TTL: {}s)", l1_size, ttl);
    Arc::new(CacheManager::in_memory(l1_size, ttl))
}

fn init_logging(level: &str, format: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.json().init();
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            return Err(config_error(format!("Configuration error: {}", e)));
        }
    };

    let log_level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| settings.logging.level.clone());
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| settings.logging.format.clone());
    init_logging(&log_level, &log_format);

    info!("Starting Lume Pulse service...");

    let store = build_store(&settings).await?;
    let cache = build_cache(&settings).await;

    let context = CoordinatorContext::new(store, cache).with_match_template(MatchTemplate {
        title: settings.notifications.match_title.clone(),
        message: settings.notifications.match_message.clone(),
    });

    let verifier = Arc::new(TokenVerifier::new(
        &settings.auth.jwt_secret,
        settings.auth.issuer.as_deref(),
    ));

    let app_state = AppState { context, verifier };

    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .app_data(web::QueryConfig::default().error_handler(handle_query_payload_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
