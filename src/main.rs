use std::sync::Arc;

use papertrail::config::Config;
use papertrail::services::{BarStore, SessionManager, SnapshotStore};
use papertrail::{api, AppState};

use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "papertrail=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Arc::new(Config::from_env());
    info!("Starting Papertrail server on {}:{}", config.host, config.port);

    // Open the snapshot store and build the session manager
    let store = Arc::new(SnapshotStore::new(&config.database_path)?);
    let bars = Arc::new(BarStore::new());
    let sessions = Arc::new(SessionManager::new(
        config.clone(),
        store,
        bars.clone(),
    ));

    // Restore the most recent persisted session, stopped; the operator
    // resumes explicitly via the API.
    sessions.load_at_boot().await;

    // Create application state
    let state = AppState {
        config: config.clone(),
        sessions,
        bars,
    };

    // Build CORS layer
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build the router
    let app = api::router()
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start the server
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Papertrail server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
