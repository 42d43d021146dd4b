// src/handlers/mod.rs
pub mod dialogs;
pub mod status;

use crate::middleware::logging::request_logging_middleware;
use crate::store::SqliteTranscriptStore;
use axum::{middleware, Extension, Router};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

/// Shared state of the query service.
pub struct ApiState {
    pub db_pool: SqlitePool,
    pub store: SqliteTranscriptStore,
}

impl ApiState {
    pub fn new(db_pool: SqlitePool) -> Self {
        Self {
            store: SqliteTranscriptStore::new(db_pool.clone()),
            db_pool,
        }
    }
}

pub fn api_router(state: Arc<ApiState>) -> Router {
    Router::new()
        .merge(dialogs::dialog_routes())
        .merge(status::status_routes())
        .layer(middleware::from_fn(request_logging_middleware))
        .layer(CorsLayer::permissive())
        .layer(Extension(state))
}
