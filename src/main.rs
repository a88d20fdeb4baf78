use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quickdrop::config::Config;
use quickdrop::db::Database;
use quickdrop::services::DropService;
use quickdrop::storage::{LocalStorage, StorageProvider};
use quickdrop::{create_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quickdrop=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting quickdrop...");

    // Load configuration
    let config = Config::load()?;
    let config = Arc::new(config);
    tracing::info!("Configuration loaded");

    // Initialize database
    let db = Database::new(&config.database.path).await?;
    db.run_migrations().await?;
    tracing::info!("Database initialized");

    // Initialize blob storage
    let storage: Arc<dyn StorageProvider> = Arc::new(LocalStorage::new(&config.storage.local_path));

    let state = AppState {
        db,
        config: config.clone(),
        storage,
    };

    spawn_purge_sweep(state.clone());

    // Build router
    let app = create_router(state);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Periodic storage-hygiene sweep. Lazy expiry already removes drops that
/// get accessed past their deadline; this clears the ones nobody asks for
/// again.
fn spawn_purge_sweep(state: AppState) {
    let interval = Duration::from_secs(state.config.drops.cleanup_interval_minutes * 60);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            match DropService::purge_expired(&state.db, state.storage.as_ref(), Utc::now()).await {
                Ok(0) => {}
                Ok(count) => tracing::info!("Purged {} expired drops", count),
                Err(e) => tracing::error!("Purge sweep failed: {}", e),
            }
        }
    });
}
