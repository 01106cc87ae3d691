//! Carz-34 Inventory Backend
//!
//! Serves the dealership catalog from a hosted document store when one is
//! configured, and from local SQLite storage otherwise.

mod api;
mod auth;
mod catalog;
mod config;
mod db;
mod errors;
mod models;
mod recommend;
mod search;
mod store;
mod sync;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use auth::AccessGate;
use config::Config;
use db::KvStore;
use recommend::Recommender;
use search::SearchIndex;
use store::{DocumentStore, FirestoreStore, LocalBackend};
use sync::InventorySync;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub sync: Arc<InventorySync>,
    pub search: Arc<SearchIndex>,
    pub gate: Arc<AccessGate>,
    pub recommender: Arc<Recommender>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env();

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let registry = tracing_subscriber::registry().with(env_filter);
    if config.log_json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("Starting Carz-34 Inventory Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Index path: {:?}", config.index_path);
    tracing::info!("Bind address: {}", config.bind_addr);

    if config.recommender.api_key.is_none() {
        tracing::warn!("No GEMINI_API_KEY configured. Recommendations will use the fallback text");
    }

    // Initialize local durable state
    let pool = db::init_database(&config.db_path).await?;
    let kv = KvStore::new(pool);
    let local = LocalBackend::new(kv.clone(), config.storage_quota_bytes);

    // Cloud store is optional; a bad client setup means local mode
    let cloud: Option<Arc<dyn DocumentStore>> = match &config.cloud {
        Some(cloud_config) => match FirestoreStore::new(cloud_config, config.request_timeout) {
            Ok(store) => Some(Arc::new(store)),
            Err(e) => {
                tracing::warn!("Failed to set up cloud store, using local storage: {}", e);
                None
            }
        },
        None => None,
    };

    let sync = InventorySync::start(local, cloud).await;
    tracing::info!(mode = sync.mode().as_str(), "Inventory sync started");

    let loading = Arc::clone(&sync);
    tokio::spawn(async move {
        loading.wait_until_loaded().await;
        let status = loading.status();
        tracing::info!(
            mode = status.mode.as_str(),
            count = status.count,
            "Inventory loaded"
        );
    });

    // Search index follows every catalog revision
    let search = Arc::new(SearchIndex::open(&config.index_path)?);
    let refresher = search::spawn_refresher(Arc::clone(&search), Arc::clone(&sync));

    let state = AppState {
        sync: Arc::clone(&sync),
        search,
        gate: Arc::new(AccessGate::new(kv, config.admin_passcode.clone())),
        recommender: Arc::new(Recommender::new(
            config.recommender.clone(),
            config.request_timeout,
        )?),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    refresher.abort();
    sync.shutdown();
    tracing::info!("Server stopped");

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Routes below this layer need the admin gate open
    let gate = Arc::clone(&state.gate);
    let admin_only = middleware::from_fn(move |req, next| {
        auth::admin_gate_layer(Arc::clone(&gate), req, next)
    });

    // API routes
    let api_routes = Router::new()
        // Sync status
        .route("/sync", get(api::get_sync_status))
        // Storefront
        .route("/vehicles", get(api::list_vehicles))
        .route("/vehicles/featured", get(api::featured_vehicles))
        .route("/vehicles/brands", get(api::list_brands))
        .route("/vehicles/{id}", get(api::get_vehicle))
        .route("/search", get(api::search_vehicles))
        .route("/recommend", post(api::recommend_vehicles))
        // Admin gate
        .route("/admin/login", post(api::admin_login))
        .route("/admin/logout", post(api::admin_logout))
        .route("/admin/status", get(api::admin_status))
        // Inventory management
        .route(
            "/admin/vehicles",
            get(api::admin_list_vehicles).layer(admin_only.clone()),
        )
        .route(
            "/vehicles",
            post(api::create_vehicle).layer(admin_only.clone()),
        )
        .route(
            "/vehicles/{id}",
            put(api::update_vehicle).layer(admin_only.clone()),
        )
        .route("/vehicles/{id}", delete(api::delete_vehicle).layer(admin_only));

    // Health check
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
