// src/handlers/status.rs
use super::ApiState;
use axum::{
    extract::Extension,
    response::Json,
    routing::get,
    Router,
};
use serde_json::{json, Value};
use std::sync::Arc;

/// GET /api/status - Service and database health
pub async fn api_status(Extension(state): Extension<Arc<ApiState>>) -> Json<Value> {
    let db_status = match sqlx::query("SELECT 1").fetch_one(&state.db_pool).await {
        Ok(_) => "healthy",
        Err(e) => {
            tracing::error!("Database health check failed: {}", e);
            "unhealthy"
        }
    };

    Json(json!({
        "status": "operational",
        "version": env!("CARGO_PKG_VERSION"),
        "services": {
            "database": db_status
        },
        "endpoints": {
            "participants": "/dialogs",
            "latest": "/dialogs/{user_id}",
            "all": "/dialogs/{user_id}/all",
            "status": "/api/status"
        }
    }))
}

pub fn status_routes() -> Router {
    Router::new().route("/api/status", get(api_status))
}
