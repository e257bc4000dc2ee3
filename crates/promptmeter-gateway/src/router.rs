//! HTTP routes for the Promptmeter gateway

use std::time::Instant;

use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, HeaderValue};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use uuid::Uuid;

use crate::auth;
use crate::metrics;
use crate::service::{
    self, ApiError, EstimateRequest, GenerateApiRequest, GenerateApiResponse, PlanRequest,
    PlanResponse,
};
use crate::state::AppState;

/// Build the main router for the gateway
pub fn build_routes(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(health))
        .route("/metrics", get(metrics_endpoint))
        .route("/estimate", post(estimate))
        .route("/plan", post(plan))
        .route("/generate", post(generate))
        .route("/clear", post(clear_memory))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_api_key,
        ))
        .layer(middleware::from_fn(request_context))
        .with_state(state)
}

/// Tag every response with a request id and record HTTP metrics.
async fn request_context(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let request_id = Uuid::new_v4().to_string();
    let started = Instant::now();

    metrics::HTTP_REQUESTS_TOTAL
        .with_label_values(&[&method, &path])
        .inc();

    let mut response = next.run(request).await;

    metrics::HTTP_LATENCY
        .with_label_values(&[&method, &path])
        .observe(started.elapsed().as_secs_f64());
    metrics::HTTP_RESPONSES
        .with_label_values(&[&method, &path, response.status().as_str()])
        .inc();

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert("x-request-id", value);
    }
    response
}

/// Liveness check
async fn health() -> Json<serde_json::Value> {
    Json(json!({"status": "ok"}))
}

/// Prometheus metrics endpoint
async fn metrics_endpoint() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::export(),
    )
}

/// Token count, context fit, and worst-case cost for a prompt.
async fn estimate(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<EstimateRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user_id = caller_id(&headers);
    let started = Instant::now();

    let response = service::process_estimate(&state, &user_id, &req).await?;
    let duration_ms = round2(started.elapsed().as_secs_f64() * 1000.0);

    Ok(Json(json!({
        "prompt_tokens": response.prompt_tokens,
        "fits_context": response.fits_context,
        "estimated_max_cost_usd": response.estimated_max_cost_usd,
        "duration_ms": duration_ms,
    })))
}

/// Chunk-and-cost estimate for a long transcript.
async fn plan(
    State(state): State<AppState>,
    Json(req): Json<PlanRequest>,
) -> Result<Json<PlanResponse>, ApiError> {
    let response = service::process_plan(&state, &req).await?;
    Ok(Json(response))
}

/// Forward a prompt to the model with clamped sampling controls.
async fn generate(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<GenerateApiRequest>,
) -> Result<Json<GenerateApiResponse>, ApiError> {
    let user_id = caller_id(&headers);
    let response = service::process_generate(&state, &user_id, &req).await?;
    Ok(Json(response))
}

/// Drop the caller's conversation memory.
async fn clear_memory(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Json<serde_json::Value> {
    let user_id = caller_id(&headers);
    state.memory.clear(&user_id).await;
    Json(json!({"status": "memory_cleared"}))
}

fn caller_id(headers: &HeaderMap) -> String {
    headers
        .get("x-user-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("anonymous")
        .to_string()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request as HttpRequest, StatusCode};
    use promptmeter_cache::InMemoryTtlCache;
    use promptmeter_runtime::{GenerateResponse, MockProvider, Usage};
    use promptmeter_tokenizer::CharCounter;
    use serde_json::Value;
    use tower::ServiceExt;

    use super::*;
    use crate::config::GatewayConfig;

    const API_KEY: &str = "test-key";

    fn test_app(provider: Arc<MockProvider>) -> Router {
        let config = GatewayConfig {
            api_key: API_KEY.to_string(),
            context_limit: 4000,
            ..GatewayConfig::default()
        };
        let state = AppState::new(
            config,
            Arc::new(CharCounter::new()),
            provider,
            Arc::new(InMemoryTtlCache::new()),
        )
        .unwrap();
        build_routes(state)
    }

    fn post_json(uri: &str, body: Value) -> HttpRequest<Body> {
        HttpRequest::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .header("x-api-key", API_KEY)
            .header("x-user-id", "alice")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_check_is_public() {
        let app = test_app(Arc::new(MockProvider::new()));
        let response = app
            .oneshot(
                HttpRequest::builder()
                    .uri("/healthz")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn metrics_endpoint_is_public() {
        let app = test_app(Arc::new(MockProvider::new()));
        let response = app
            .oneshot(
                HttpRequest::builder()
                    .uri("/metrics")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        // The request-context middleware records this very request first.
        assert!(text.contains("promptmeter_http_requests_total"));
    }

    #[tokio::test]
    async fn estimate_requires_api_key() {
        let app = test_app(Arc::new(MockProvider::new()));
        let request = HttpRequest::builder()
            .method("POST")
            .uri("/estimate")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"prompt": "Hi"}"#))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["detail"], "Unauthorized");
    }

    #[tokio::test]
    async fn wrong_api_key_is_rejected() {
        let app = test_app(Arc::new(MockProvider::new()));
        let request = HttpRequest::builder()
            .method("POST")
            .uri("/estimate")
            .header("content-type", "application/json")
            .header("x-api-key", "not-the-key")
            .body(Body::from(r#"{"prompt": "Hi"}"#))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn estimate_reports_token_economics() {
        let app = test_app(Arc::new(MockProvider::new()));
        let response = app
            .oneshot(post_json(
                "/estimate",
                json!({"prompt": "hello", "max_completion_tokens": 512}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));

        let body = body_json(response).await;
        assert_eq!(body["prompt_tokens"], 5);
        assert_eq!(body["fits_context"], true);
        assert!(body["estimated_max_cost_usd"].as_f64().unwrap() > 0.0);
        assert!(body["duration_ms"].as_f64().is_some());
    }

    #[tokio::test]
    async fn estimate_defaults_completion_reserve() {
        let app = test_app(Arc::new(MockProvider::new()));
        let response = app
            .oneshot(post_json("/estimate", json!({"prompt": "Hi"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        // 2 prompt chars + default 512 completion reserve fit 4000
        assert_eq!(body["fits_context"], true);
    }

    #[tokio::test]
    async fn plan_reports_chunk_statistics() {
        let app = test_app(Arc::new(MockProvider::new()));
        let transcript = "This is a short meeting.\n".repeat(300);
        let response = app
            .oneshot(post_json("/plan", json!({"transcript": transcript})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert!(body["num_chunks"].as_u64().unwrap() >= 2);
        assert!(body["chunk_size_tokens"].as_u64().unwrap() > 0);
        assert!(body["estimated_total_cost_usd"].as_f64().unwrap() >= 0.0);
    }

    #[tokio::test]
    async fn plan_maps_window_too_small_to_422() {
        let config = GatewayConfig {
            api_key: API_KEY.to_string(),
            context_limit: 100,
            ..GatewayConfig::default()
        };
        let state = AppState::new(
            config,
            Arc::new(CharCounter::new()),
            Arc::new(MockProvider::new()),
            Arc::new(InMemoryTtlCache::new()),
        )
        .unwrap();
        let app = build_routes(state);

        let response = app
            .oneshot(post_json("/plan", json!({"transcript": "anything"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn generate_round_trip_with_clear() {
        let provider = Arc::new(MockProvider::new());
        provider.enqueue_generate(Ok(GenerateResponse {
            text: "Test response".to_string(),
            model: Some("mock-1".to_string()),
            finish_reason: Some("stop".to_string()),
            usage: Some(Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            }),
        }));
        let app = test_app(provider);

        let response = app
            .clone()
            .oneshot(post_json(
                "/generate",
                json!({"prompt": "Hello world", "preset": "rag_qa"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["text"], "Test response");
        assert_eq!(body["finish_reason"], "stop");
        assert_eq!(body["usage"]["total_tokens"], 15);

        let response = app
            .oneshot(post_json("/clear", json!({})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "memory_cleared");
    }

    #[tokio::test]
    async fn generate_maps_overflow_to_413() {
        let config = GatewayConfig {
            api_key: API_KEY.to_string(),
            context_limit: 60,
            ..GatewayConfig::default()
        };
        let state = AppState::new(
            config,
            Arc::new(CharCounter::new()),
            Arc::new(MockProvider::new()),
            Arc::new(InMemoryTtlCache::new()),
        )
        .unwrap();
        let app = build_routes(state);

        let response = app
            .oneshot(post_json(
                "/generate",
                json!({"prompt": "x".repeat(500)}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn generate_maps_unknown_preset_to_400() {
        let app = test_app(Arc::new(MockProvider::new()));
        let response = app
            .oneshot(post_json(
                "/generate",
                json!({"prompt": "Hi", "preset": "nonexistent"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
