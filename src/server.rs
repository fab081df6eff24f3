//! HTTP shim between the hosting platform and the dispatcher.
//!
//! Authorized deliveries are always acknowledged with 200, even when
//! processing fails: Telegram retries non-2xx responses and a retry would
//! relay the same request twice. Failures go to the log instead.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode};
use axum::routing::{any, get};
use axum::{Json, Router};
use serde::Serialize;
use teloxide::types::Update;
use tracing::{error, warn};

use crate::bot::{self, AppState};

/// Header Telegram echoes the webhook secret in.
pub const SECRET_TOKEN_HEADER: &str = "x-telegram-bot-api-secret-token";

#[derive(Serialize)]
struct HealthStatus {
    status: &'static str,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/webhook", any(webhook))
        .route("/health", get(health))
        .with_state(state)
}

/// Liveness check (process is alive)
async fn health() -> Json<HealthStatus> {
    Json(HealthStatus { status: "ok" })
}

async fn webhook(
    State(state): State<Arc<AppState>>,
    method: Method,
    headers: HeaderMap,
    body: String,
) -> (StatusCode, &'static str) {
    let presented = headers
        .get(SECRET_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok());
    if !secret_matches(presented, &state.config.webhook_secret) {
        return (StatusCode::UNAUTHORIZED, "Unauthorized");
    }

    // Keeps health checks and probes quiet.
    if method != Method::POST {
        return (StatusCode::OK, "OK");
    }

    let update: Update = match serde_json::from_str(&body) {
        Ok(update) => update,
        Err(e) => {
            warn!("Discarding undecodable update payload: {e}");
            return (StatusCode::OK, "OK");
        }
    };

    if let Err(e) = bot::handle_update(state, update).await {
        error!("Update processing failed: {e:#}");
    }

    (StatusCode::OK, "OK")
}

fn secret_matches(presented: Option<&str>, expected: &str) -> bool {
    presented == Some(expected)
}
