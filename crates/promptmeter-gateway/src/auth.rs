//! API-key authentication middleware
//!
//! Every route except health and metrics requires the static `x-api-key`
//! header. Key comparison is a straight equality check against the
//! configured value; there are no scopes or identities beyond it.

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::state::AppState;

/// Paths reachable without a key.
pub const EXEMPT_PATHS: &[&str] = &["/healthz", "/metrics"];

/// Reject requests without the configured API key.
pub async fn require_api_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if EXEMPT_PATHS.contains(&request.uri().path()) {
        return next.run(request).await;
    }

    let presented = request
        .headers()
        .get("x-api-key")
        .and_then(|value| value.to_str().ok());

    if presented == Some(state.config.api_key.as_str()) {
        next.run(request).await
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "Unauthorized"})),
        )
            .into_response()
    }
}
