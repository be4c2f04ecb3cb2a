//! Axum router configuration with middleware.
//!
//! REST routes live under `/api/v1/`, the chat socket under `/ws/`.
//! Middleware: CORS, request tracing.

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Chat
        .route("/chat", post(handlers::chat::chat))
        .route("/chat/stream", post(handlers::chat::stream_chat))
        // Sessions
        .route(
            "/sessions/{visitor_id}/history",
            get(handlers::session::get_history).delete(handlers::session::clear_history),
        )
        .route(
            "/sessions/{visitor_id}/transcript",
            get(handlers::session::get_transcript),
        );

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/ws/chat/{visitor_id}", get(handlers::ws::ws_chat))
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health - liveness probe.
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "ts": chrono::Utc::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use leadpilot_types::llm::{FinishReason, StreamEvent};

    use super::*;
    use crate::state::testing::{CannedProvider, test_state, text_round};

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let app = build_router(test_state(CannedProvider::default()).await);
        let response = app.oneshot(get_request("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
        assert!(body["ts"].is_string());
    }

    #[tokio::test]
    async fn test_chat_returns_reply_and_records_history() {
        let state = test_state(CannedProvider::replying(vec!["Hi! What are you building?"])).await;
        let app = build_router(state);

        let response = app
            .clone()
            .oneshot(post_json("/api/v1/chat", json!({"visitor_id": "v1", "message": "hello"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["message"], "Hi! What are you building?");
        assert_eq!(body["tools"], json!([]));

        let response = app
            .oneshot(get_request("/api/v1/sessions/v1/history"))
            .await
            .unwrap();
        let history = body_json(response).await;
        assert_eq!(
            history,
            json!([
                {"role": "user", "content": "hello"},
                {"role": "assistant", "content": "Hi! What are you building?"},
            ])
        );
    }

    #[tokio::test]
    async fn test_chat_with_empty_reply_answers_done() {
        let app = build_router(test_state(CannedProvider::replying(vec![""])).await);
        let response = app
            .oneshot(post_json("/api/v1/chat", json!({"visitor_id": "v1", "message": "ok"})))
            .await
            .unwrap();
        assert_eq!(body_json(response).await["message"], "Done.");
    }

    #[tokio::test]
    async fn test_chat_rejects_empty_message() {
        let app = build_router(test_state(CannedProvider::default()).await);
        let response = app
            .oneshot(post_json("/api/v1/chat", json!({"visitor_id": "v1", "message": "   "})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "EMPTY_MESSAGE");
        assert_eq!(body["error"]["message"], "Empty message");
    }

    #[tokio::test]
    async fn test_chat_rejects_blank_visitor() {
        let app = build_router(test_state(CannedProvider::default()).await);
        let response = app
            .oneshot(post_json("/api/v1/chat", json!({"visitor_id": "", "message": "hi"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_stream_chat_emits_sse_frames_in_order() {
        let provider = CannedProvider::streaming(vec![text_round(&["Hel", "lo"])]);
        let app = build_router(test_state(provider).await);

        let response = app
            .oneshot(post_json(
                "/api/v1/chat/stream",
                json!({"visitor_id": "v1", "message": "hi"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["content-type"].to_str().unwrap(),
            "text/event-stream"
        );

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        let events: Vec<Value> = text
            .lines()
            .filter_map(|line| line.strip_prefix("data: "))
            .map(|data| serde_json::from_str(data).unwrap())
            .collect();

        assert_eq!(
            events,
            vec![
                json!({"type": "token", "data": "Hel"}),
                json!({"type": "token", "data": "lo"}),
                json!({"type": "done", "data": "Hello"}),
                json!({"type": "round_complete"}),
            ]
        );
    }

    #[tokio::test]
    async fn test_stream_chat_reports_unknown_tool() {
        let provider = CannedProvider::streaming(vec![vec![
            StreamEvent::ToolCallDelta {
                index: 0,
                id: Some("call_1".to_string()),
                name: Some("drop_tables".to_string()),
                arguments: Some("{}".to_string()),
            },
            StreamEvent::Finish {
                reason: FinishReason::ToolCalls,
            },
        ]]);
        let app = build_router(test_state(provider).await);

        let response = app
            .oneshot(post_json(
                "/api/v1/chat/stream",
                json!({"visitor_id": "v2", "message": "do it"}),
            ))
            .await
            .unwrap();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();

        assert!(text.contains(r#""type":"tool""#));
        assert!(text.contains(r#""error":"unknown tool""#));
        assert!(text.contains(r#""type":"round_complete""#));
    }

    #[tokio::test]
    async fn test_clear_history_keeps_transcript() {
        let state = test_state(CannedProvider::replying(vec!["Sure."])).await;
        let app = build_router(state);

        app.clone()
            .oneshot(post_json("/api/v1/chat", json!({"visitor_id": "v3", "message": "hi"})))
            .await
            .unwrap();

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/api/v1/sessions/v3/history")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app
            .clone()
            .oneshot(get_request("/api/v1/sessions/v3/history"))
            .await
            .unwrap();
        assert_eq!(body_json(response).await, json!([]));

        let response = app
            .oneshot(get_request("/api/v1/sessions/v3/transcript"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["conversation"]["visitor_id"], "v3");
        assert_eq!(body["messages"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_transcript_for_unknown_visitor_is_404() {
        let app = build_router(test_state(CannedProvider::default()).await);
        let response = app
            .oneshot(get_request("/api/v1/sessions/nobody/transcript"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
