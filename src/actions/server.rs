//! HTTP action endpoint.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tower_http::trace::TraceLayer;
use tracing::warn;

use super::protocol::ActionRequest;
use super::{ActionContext, ActionName, run_action};
use crate::ej::HttpEjPlatform;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct ServerState {
    pub context: Arc<ActionContext>,
    /// Connection pool reused by every request's EJ client.
    pub http: reqwest::Client,
}

/// Build the Axum router serving the actions.
pub fn action_routes(context: Arc<ActionContext>, http: reqwest::Client) -> Router {
    let state = ServerState { context, http };

    Router::new()
        .route("/webhook", post(webhook))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn webhook(State(state): State<ServerState>, Json(request): Json<ActionRequest>) -> Response {
    let Some(action) = ActionName::parse(&request.next_action) else {
        warn!(action = %request.next_action, "Unknown action requested");
        return (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({
                "error": format!("No registered action found for name '{}'.", request.next_action),
                "action_name": request.next_action,
            })),
        )
            .into_response();
    };

    // One client per request: it holds this participant's tokens.
    let platform = HttpEjPlatform::new(
        state.http.clone(),
        &state.context.config,
        request.tracker.tokens(),
    );
    let response = run_action(&state.context, &platform, action, &request).await;
    Json(response).into_response()
}

#[cfg(test)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::actions::test_support::context;

    fn app() -> Router {
        action_routes(Arc::new(context()), reqwest::Client::new())
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_is_ok() {
        let response = app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({"status": "ok"}));
    }

    #[tokio::test]
    async fn unknown_action_is_not_found() {
        let request = Request::post("/webhook")
            .header("content-type", "application/json")
            .body(Body::from(
                json!({"next_action": "action_order_pizza", "sender_id": "42"}).to_string(),
            ))
            .unwrap();

        let response = app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["action_name"], json!("action_order_pizza"));
    }

    #[tokio::test]
    async fn help_needs_no_platform() {
        let request = Request::post("/webhook")
            .header("content-type", "application/json")
            .body(Body::from(
                json!({
                    "next_action": "validate_help_form",
                    "sender_id": "42",
                    "tracker": {"slots": {"help_topic": "help_plan"}}
                })
                .to_string(),
            ))
            .unwrap();

        let response = app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["responses"], json!([{"response": "utter_explain_help_plan"}]));
    }
}
