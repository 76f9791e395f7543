// src/api.rs
//! Status surface: liveness, health, manual check, test message, metrics.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;

use crate::metrics::Metrics;
use crate::notify::Dispatcher;
use crate::worker::WorkerHandle;

pub const LIVENESS_TEXT: &str = "Bot is running fine!";
pub const TEST_MESSAGE: &str = "🧪 Test message from the RSS relay bot";

#[derive(Clone)]
pub struct AppState {
    /// Last forwarded id as published by the worker.
    pub cursor: watch::Receiver<String>,
    pub dispatcher: Arc<Dispatcher>,
    /// `None` when the worker runs in another process.
    pub worker: Option<WorkerHandle>,
    pub root_triggers_check: bool,
}

pub fn router(state: AppState, metrics: Option<&Metrics>) -> Router {
    let app = Router::new()
        .route("/", get(root))
        .route("/check", get(check))
        .route("/health", get(health))
        .route("/test", get(send_test))
        .layer(CorsLayer::very_permissive())
        .with_state(state);

    match metrics {
        Some(m) => app.merge(m.router()),
        None => app,
    }
}

async fn root(State(state): State<AppState>) -> Response {
    if state.root_triggers_check {
        return check(State(state)).await.into_response();
    }
    LIVENESS_TEXT.into_response()
}

#[derive(Debug, Serialize)]
struct StatusOut {
    status: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    posts_sent: Option<usize>,
}

impl StatusOut {
    fn new(status: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            posts_sent: None,
        }
    }
}

async fn check(State(state): State<AppState>) -> (StatusCode, Json<StatusOut>) {
    let Some(worker) = &state.worker else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(StatusOut::new("error", "worker is not running in this process")),
        );
    };

    let out = match worker.check_now().await {
        Ok(r) if r.entries == 0 => StatusOut::new("warning", "No RSS posts found."),
        Ok(r) => {
            let mut message = if r.sent == 0 && r.failed == 0 {
                "No new posts.".to_string()
            } else {
                format!("Sent {} new post(s).", r.sent)
            };
            if r.failed > 0 {
                message.push_str(&format!(" {} failed.", r.failed));
            }
            StatusOut {
                posts_sent: Some(r.sent),
                ..StatusOut::new(if r.failed > 0 { "error" } else { "success" }, message)
            }
        }
        Err(e) => StatusOut::new("error", e.to_string()),
    };
    (StatusCode::OK, Json(out))
}

#[derive(Debug, Serialize)]
struct HealthOut {
    status: &'static str,
    timestamp: String,
    last_post_id: String,
}

async fn health(State(state): State<AppState>) -> Json<HealthOut> {
    Json(HealthOut {
        status: "healthy",
        timestamp: chrono::Utc::now().to_rfc3339(),
        last_post_id: state.cursor.borrow().clone(),
    })
}

async fn send_test(State(state): State<AppState>) -> Json<StatusOut> {
    match state.dispatcher.dispatch(TEST_MESSAGE, &[]).await {
        Ok(_) => Json(StatusOut::new("success", "Test message sent")),
        Err(e) => {
            tracing::warn!(error = %e, "test message failed");
            Json(StatusOut::new("error", format!("Failed to send test message: {e}")))
        }
    }
}
