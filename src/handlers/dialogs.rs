// src/handlers/dialogs.rs
//! Read-only access to saved interview transcripts.

use super::ApiState;
use crate::models::transcript::DialogView;
use crate::store::{StoreError, TranscriptStore};
use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde_json::json;
use std::sync::Arc;

fn store_failure(e: StoreError) -> Response {
    tracing::error!("Failed to read transcripts: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"error": "Failed to read transcripts"})),
    )
        .into_response()
}

/// GET /dialogs - Distinct participant ids, first interview first
pub async fn list_dialogs(Extension(state): Extension<Arc<ApiState>>) -> Response {
    match state.store.list_participants().await {
        Ok(ids) => Json(ids).into_response(),
        Err(e) => store_failure(e),
    }
}

/// GET /dialogs/:user_id - Most recent transcript of a participant
pub async fn get_dialog(
    Path(user_id): Path<i64>,
    Extension(state): Extension<Arc<ApiState>>,
) -> Response {
    match state.store.latest_for(user_id).await {
        Ok(Some(record)) => Json(DialogView::from(record)).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(json!({"error": format!("No interviews for user {}", user_id)})),
        )
            .into_response(),
        Err(e) => store_failure(e),
    }
}

/// GET /dialogs/:user_id/all - Every transcript of a participant, oldest first
pub async fn get_all_dialogs(
    Path(user_id): Path<i64>,
    Extension(state): Extension<Arc<ApiState>>,
) -> Response {
    match state.store.all_for(user_id).await {
        Ok(records) => {
            let views: Vec<DialogView> = records.into_iter().map(DialogView::from).collect();
            Json(views).into_response()
        }
        Err(e) => store_failure(e),
    }
}

pub fn dialog_routes() -> Router {
    Router::new()
        .route("/dialogs", get(list_dialogs))
        .route("/dialogs/:user_id", get(get_dialog))
        .route("/dialogs/:user_id/all", get(get_all_dialogs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_in_memory_pool;
    use crate::handlers::api_router;
    use crate::models::transcript::{NewTranscript, Turn};
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    async fn state_with(user_ids: &[i64]) -> Arc<ApiState> {
        let state = Arc::new(ApiState::new(create_in_memory_pool().await.unwrap()));
        for (n, user_id) in user_ids.iter().enumerate() {
            state
                .store
                .insert(&NewTranscript {
                    user_id: *user_id,
                    username: Some(format!("user{}", user_id)),
                    start_time: "2025-06-01 10:00:00".to_string(),
                    end_time: format!("2025-06-01 10:{:02}:00", n + 1),
                    dialog: vec![Turn::assistant("Why?"), Turn::user(format!("answer {}", n))],
                    summary: format!("report {}", n),
                })
                .await
                .unwrap();
        }
        state
    }

    async fn get_json(state: Arc<ApiState>, uri: &str) -> (StatusCode, Value) {
        let response = api_router(state)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_list_in_first_insert_order() {
        let state = state_with(&[101, 202, 101]).await;

        let (status, body) = get_json(state.clone(), "/dialogs").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([101, 202]));

        // No writes in between: same answer
        let (_, again) = get_json(state, "/dialogs").await;
        assert_eq!(again, body);
    }

    #[tokio::test]
    async fn test_empty_list() {
        let (status, body) = get_json(state_with(&[]).await, "/dialogs").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn test_latest_dialog_is_parsed() {
        let state = state_with(&[101, 202, 101]).await;

        let (status, body) = get_json(state, "/dialogs/101").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user_id"], 101);
        assert_eq!(body["summary"], "report 2");
        assert_eq!(body["dialog"][1]["role"], "user");
        assert_eq!(body["dialog"][1]["content"], "answer 2");
    }

    #[tokio::test]
    async fn test_unknown_participant_is_not_found() {
        let (status, body) = get_json(state_with(&[101]).await, "/dialogs/999").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("999"));
    }

    #[tokio::test]
    async fn test_all_dialogs_oldest_first() {
        let state = state_with(&[101, 202, 101]).await;

        let (status, body) = get_json(state, "/dialogs/101/all").await;
        assert_eq!(status, StatusCode::OK);
        let records = body.as_array().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["summary"], "report 0");
        assert_eq!(records[1]["summary"], "report 2");
    }
}
