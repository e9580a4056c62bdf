use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use lume_match::config::Settings;
use lume_match::core::{Engine, EngineLimits};
use lume_match::routes::{self, AppState};
use lume_match::services::{
    AppwriteClient, AppwriteCollections, CacheManager, CachedDirectory, MemoryStore,
    MessageStore, NotificationDispatcher, PostgresClient, RelationshipStore, UserDirectory,
};

fn io_error(context: &str, err: impl std::fmt::Display) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, format!("{}: {}", context, err))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    // Load configuration
    let settings = Settings::load().map_err(|e| io_error("Configuration error", e))?;

    // Initialize logging; RUST_LOG wins over the configured level
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| settings.logging.format.clone());
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.logging.level.clone()));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if log_format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.init();
    }

    info!("Starting Lume Match interaction service...");

    // Initialize Appwrite client
    let appwrite = Arc::new(
        AppwriteClient::new(
            settings.appwrite.endpoint.clone(),
            settings.appwrite.api_key.clone(),
            settings.appwrite.project_id.clone(),
            settings.appwrite.database_id.clone(),
            AppwriteCollections {
                user_profiles: settings.collection.user_profiles.clone(),
                notifications: settings.collection.notifications.clone(),
            },
            Duration::from_secs(settings.appwrite.timeout_secs),
        )
        .map_err(|e| io_error("Appwrite client error", e))?,
    );

    info!("Appwrite client initialized");

    // Initialize cache manager; falls back to the in-process tier without Redis
    let cache_ttl = settings.cache.ttl_secs.unwrap_or(300);
    let l1_cache_size = settings.cache.l1_cache_size.unwrap_or(1000);

    let cache = match CacheManager::new(&settings.cache.redis_url, l1_cache_size, cache_ttl).await {
        Ok(c) => {
            info!("Cache manager initialized (L1: {} entries, TTL: {}s)", l1_cache_size, cache_ttl);
            Arc::new(c)
        }
        Err(e) => {
            warn!("Failed to connect to Redis ({}), using local cache only", e);
            Arc::new(CacheManager::local(l1_cache_size, cache_ttl))
        }
    };

    let directory: Arc<dyn UserDirectory> = Arc::new(CachedDirectory::new(appwrite.clone(), cache));
    let notifier: Arc<dyn NotificationDispatcher> = appwrite;

    // Initialize storage
    let relationships: Arc<dyn RelationshipStore>;
    let messages: Arc<dyn MessageStore>;

    if settings.database.is_memory() {
        warn!("Using in-memory store; nothing survives a restart");
        let store = MemoryStore::new();
        relationships = Arc::new(store.clone());
        messages = Arc::new(store);
    } else {
        let postgres = Arc::new(
            PostgresClient::from_settings(
                &settings.database.url,
                settings.database.max_connections,
                settings.database.min_connections,
                settings.database.acquire_timeout_secs,
                settings.database.idle_timeout_secs,
            )
            .await
            .map_err(|e| {
                error!("Failed to connect to PostgreSQL: {}", e);
                io_error("PostgreSQL connection error", e)
            })?,
        );
        info!("PostgreSQL client initialized");
        relationships = postgres.clone();
        messages = postgres;
    }

    let engine = Engine::new(
        relationships,
        messages,
        directory,
        notifier,
        settings.engine.retry_policy(),
        EngineLimits::from(&settings.engine),
    );

    info!(
        "Engine initialized (retries: {}, storage timeout: {}ms)",
        settings.engine.max_retries, settings.engine.storage_timeout_ms
    );

    let app_state = AppState {
        engine,
        page_size: settings.engine.conversation_page_size,
    };

    // Configure HTTP server
    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(routes::handle_json_payload_error))
            .app_data(web::QueryConfig::default().error_handler(routes::handle_query_payload_error))
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
