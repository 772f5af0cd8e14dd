//! Admission control middleware.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use tracing::warn;

use super::handlers::ErrorResponse;
use super::server::AppState;

/// Header consulted before falling back to the peer address.
const FORWARDED_FOR: &str = "x-forwarded-for";

/// Admit or reject a request before any handler runs.
///
/// Disabled configuration bypasses the limiter entirely. The client key is
/// the first `X-Forwarded-For` entry when present, otherwise the peer
/// address; a request carrying neither passes through unlimited.
pub async fn rate_limit(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    if !state.config.rate_limiter.enabled {
        return next.run(request).await;
    }

    let Some(client_key) = client_key(&request) else {
        return next.run(request).await;
    };

    let (allowed, retry_after) = state.limiter.allow(&client_key);
    if allowed {
        return next.run(request).await;
    }

    warn!(
        method = %request.method(),
        path = %request.uri().path(),
        client = %client_key,
        "rate limit exceeded"
    );

    rate_limit_exceeded(retry_after)
}

/// Resolve the key counters are partitioned by.
fn client_key(request: &Request) -> Option<String> {
    let forwarded = request
        .headers()
        .get(FORWARDED_FOR)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty());

    if let Some(addr) = forwarded {
        return Some(addr.to_string());
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
}

/// Build the 429 response; the retry hint is rounded up to whole seconds.
fn rate_limit_exceeded(retry_after: Duration) -> Response {
    let mut secs = retry_after.as_secs();
    if retry_after.subsec_nanos() > 0 {
        secs += 1;
    }

    (
        StatusCode::TOO_MANY_REQUESTS,
        [(header::RETRY_AFTER, secs.to_string())],
        Json(ErrorResponse {
            error: format!("rate limit exceeded, retry after: {}s", secs),
            retry_after_secs: secs,
        }),
    )
        .into_response()
}
