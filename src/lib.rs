pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;
pub mod services;
pub mod storage;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use crate::config::Config;
pub use crate::db::Database;
use crate::storage::StorageProvider;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<Config>,
    pub storage: Arc<dyn StorageProvider>,
}

pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/upload", post(handlers::drop::upload_drop))
        .route("/retrieve", get(handlers::drop::retrieve_drop))
        .route("/download/:file_id", get(handlers::drop::download_file))
        .route("/download-folder/:code", get(handlers::drop::download_folder))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
