use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use redis::AsyncCommands;

use crate::domain::payment::{ErrorEnvelope, ErrorPayload};

/// Counters outlive their minute so late increments still land in a live key.
const WINDOW_TTL_SECS: i64 = 120;

#[derive(Clone)]
pub struct RateLimitState {
    pub redis_client: redis::Client,
    pub max_per_minute: i64,
}

/// First hop of `x-forwarded-for`, or `unknown`.
pub fn client_address(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or("unknown")
        .to_string()
}

pub fn window_key(client: &str, now: DateTime<Utc>) -> String {
    format!("checkout-rate:{}:{}", client, now.format("%Y%m%d%H%M"))
}

/// Redis being unreachable lets the request through.
pub async fn enforce(
    State(state): State<RateLimitState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let key = window_key(&client_address(request.headers()), Utc::now());

    if let Ok(mut conn) = state.redis_client.get_multiplexed_async_connection().await {
        let count: i64 = conn.incr(&key, 1).await.unwrap_or(1);
        let _: bool = conn.expire(&key, WINDOW_TTL_SECS).await.unwrap_or(false);
        if count > state.max_per_minute {
            tracing::warn!(key = %key, count, "checkout rate limit exceeded");
            let body = ErrorEnvelope {
                error: ErrorPayload {
                    code: "RATE_LIMITED".to_string(),
                    message: "Too many checkout attempts. Try again in a minute.".to_string(),
                    details: None,
                },
            };
            return (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
        }
    }

    next.run(request).await
}
