//! Estimation and generation services
//!
//! The functions here orchestrate the planner plus the injected
//! collaborators: cache lookups before computation, spend accounting after,
//! provider calls for generation. Handlers stay thin.

use std::time::{Duration, Instant};

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use promptmeter_budget::{estimate_cost, fits_context, BudgetError, Plan};
use promptmeter_cache::estimate_key;
use promptmeter_controls::GenerationConfig;
use promptmeter_runtime::{GenerateRequest, ProviderError, Usage};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use crate::metrics;
use crate::state::AppState;

/// Tokens assumed consumed by the per-chunk wrapper text when a transcript
/// chunk is submitted as its own request.
pub const CHUNK_WRAPPER_TOKENS: usize = 50;

// ============================================================================
// Request / Response bodies
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct EstimateRequest {
    pub prompt: String,
    #[serde(default = "default_max_completion_tokens")]
    pub max_completion_tokens: usize,
}

fn default_max_completion_tokens() -> usize {
    512
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimateResponse {
    pub prompt_tokens: usize,
    pub fits_context: bool,
    pub estimated_max_cost_usd: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlanRequest {
    pub transcript: String,
    #[serde(default = "default_plan_instructions")]
    pub instructions: String,
}

fn default_plan_instructions() -> String {
    "You are a meeting summarization assistant.".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanResponse {
    pub num_chunks: usize,
    pub chunk_size_tokens: usize,
    pub total_prompt_tokens: usize,
    pub total_completion_tokens: usize,
    pub estimated_total_cost_usd: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateApiRequest {
    pub prompt: String,
    #[serde(default)]
    pub model: Option<String>,
    /// Named preset; takes precedence over inline `controls`.
    #[serde(default)]
    pub preset: Option<String>,
    #[serde(default)]
    pub controls: Option<GenerationConfig>,
    #[serde(default = "default_generate_instructions")]
    pub instructions: String,
}

fn default_generate_instructions() -> String {
    "You are a helpful assistant that answers concisely.".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateApiResponse {
    pub text: String,
    pub finish_reason: Option<String>,
    pub usage: Option<Usage>,
}

// ============================================================================
// Error mapping
// ============================================================================

/// Gateway error surfaced to callers as `{"detail": ...}` with a status.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Budget(#[from] BudgetError),

    #[error("provider call failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("unknown preset: {0}")]
    UnknownPreset(String),

    #[error("spend limit exceeded: ${spent:.6} of ${limit:.2} budget used")]
    SpendLimitExceeded { spent: f64, limit: f64 },
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Budget(BudgetError::InvalidArgument(_)) => StatusCode::BAD_REQUEST,
            ApiError::Budget(BudgetError::ContextOverflow { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Budget(BudgetError::WindowTooSmall { .. }) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ApiError::Budget(BudgetError::Tokenizer(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Provider(_) => StatusCode::BAD_GATEWAY,
            ApiError::UnknownPreset(_) => StatusCode::BAD_REQUEST,
            ApiError::SpendLimitExceeded { .. } => StatusCode::PAYMENT_REQUIRED,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }
        (status, Json(json!({"detail": self.to_string()}))).into_response()
    }
}

// ============================================================================
// Services
// ============================================================================

/// Token count, context fit, and worst-case cost for a prompt.
///
/// Repeated identical requests are served from the cache; a cache failure
/// only costs the recomputation.
pub async fn process_estimate(
    state: &AppState,
    user_id: &str,
    req: &EstimateRequest,
) -> Result<EstimateResponse, ApiError> {
    metrics::ESTIMATE_REQUESTS.inc();
    let _timer = metrics::ESTIMATE_LATENCY.start_timer();

    let key = estimate_key(user_id, &req.prompt, req.max_completion_tokens);
    match state.cache.get(&key).await {
        Ok(Some(value)) => {
            if let Ok(cached) = serde_json::from_value::<EstimateResponse>(value) {
                metrics::CACHE_HITS.inc();
                return Ok(cached);
            }
        }
        Ok(None) => {}
        Err(err) => tracing::warn!(error = %err, "cache read failed"),
    }
    metrics::CACHE_MISSES.inc();

    ensure_spend_headroom(state, user_id).await?;

    let prompt_tokens = state.counter.count(&req.prompt);
    let fits = fits_context(
        prompt_tokens,
        req.max_completion_tokens,
        state.config.context_limit,
    );
    let cost = estimate_cost(prompt_tokens, req.max_completion_tokens, &state.rates);
    let total = state.spend.record(user_id, cost.estimated_cost_usd).await;

    let response = EstimateResponse {
        prompt_tokens,
        fits_context: fits,
        estimated_max_cost_usd: cost.estimated_cost_usd,
    };

    if let Ok(value) = serde_json::to_value(&response) {
        let ttl = Duration::from_secs(state.config.cache_ttl_secs);
        if let Err(err) = state.cache.set(&key, value, ttl).await {
            tracing::warn!(error = %err, "cache write failed");
        }
    }

    tracing::info!(
        user_id,
        prompt_tokens,
        fits_context = fits,
        estimated_max_cost_usd = cost.estimated_cost_usd,
        spent_usd = total,
        "estimate request"
    );

    Ok(response)
}

/// Chunk-and-cost estimate for a long transcript.
pub async fn process_plan(state: &AppState, req: &PlanRequest) -> Result<PlanResponse, ApiError> {
    let overhead = state.counter.count(&req.instructions) + CHUNK_WRAPPER_TOKENS;
    let planner = state.planner(state.config.default_max_completion_tokens, overhead)?;
    let chunk_plan = planner.plan_chunked(&req.transcript)?;

    Ok(PlanResponse {
        num_chunks: chunk_plan.num_chunks(),
        chunk_size_tokens: chunk_plan.chunk_size_tokens,
        total_prompt_tokens: chunk_plan.total_prompt_tokens,
        total_completion_tokens: chunk_plan.total_completion_tokens,
        estimated_total_cost_usd: chunk_plan.estimated_total_cost_usd,
    })
}

/// Prepare a prompt (direct or summarized), forward it to the provider with
/// clamped sampling controls, and account the spend.
pub async fn process_generate(
    state: &AppState,
    user_id: &str,
    req: &GenerateApiRequest,
) -> Result<GenerateApiResponse, ApiError> {
    let controls = resolve_controls(req)?.clamped();

    ensure_spend_headroom(state, user_id).await?;

    let user_text = match state.memory.prefix(user_id).await {
        Some(prefix) => format!("{prefix}{}", req.prompt),
        None => req.prompt.clone(),
    };

    let planner = state.planner(controls.max_tokens as usize, 0)?;
    let plan = planner.plan_direct_or_fallback(&user_text, &req.instructions)?;
    let (prompt, prompt_tokens) = match plan {
        Plan::Direct {
            prompt,
            prompt_tokens,
        }
        | Plan::Summarized {
            prompt,
            prompt_tokens,
        } => (prompt, prompt_tokens),
        Plan::Chunked(_) => {
            return Err(ApiError::Budget(BudgetError::InvalidArgument(
                "chunked plans cannot be submitted as a single generation".to_string(),
            )));
        }
    };

    let provider_name = state.provider.name();
    metrics::AI_REQUESTS_TOTAL
        .with_label_values(&[provider_name])
        .inc();
    let started = Instant::now();

    let result = state
        .provider
        .generate(GenerateRequest {
            prompt,
            model: req.model.clone(),
            controls: controls.clone(),
        })
        .await;

    metrics::AI_LATENCY
        .with_label_values(&[provider_name])
        .observe(started.elapsed().as_secs_f64());

    let response = match result {
        Ok(response) => response,
        Err(err) => {
            metrics::AI_ERRORS
                .with_label_values(&[provider_name, error_type(&err)])
                .inc();
            return Err(err.into());
        }
    };

    // Bill actual usage when the provider reports it, worst case otherwise.
    let billed_prompt = response
        .usage
        .map_or(prompt_tokens, |u| u.prompt_tokens as usize);
    let billed_completion = response
        .usage
        .map_or(controls.max_tokens as usize, |u| u.completion_tokens as usize);
    let cost = estimate_cost(billed_prompt, billed_completion, &state.rates);
    let total = state.spend.record(user_id, cost.estimated_cost_usd).await;

    if let Some(usage) = response.usage {
        metrics::AI_TOKENS_TOTAL
            .with_label_values(&[provider_name, "prompt"])
            .inc_by(f64::from(usage.prompt_tokens));
        metrics::AI_TOKENS_TOTAL
            .with_label_values(&[provider_name, "completion"])
            .inc_by(f64::from(usage.completion_tokens));
    }

    state
        .memory
        .record_turn(user_id, &req.prompt, &response.text)
        .await;

    tracing::info!(
        user_id,
        latency_ms = started.elapsed().as_millis() as u64,
        temperature = controls.temperature,
        top_p = controls.top_p,
        max_tokens = controls.max_tokens,
        frequency_penalty = controls.frequency_penalty,
        presence_penalty = controls.presence_penalty,
        finish_reason = response.finish_reason.as_deref().unwrap_or("unknown"),
        total_tokens = ?response.usage.map(|u| u.total_tokens),
        cost_usd = cost.estimated_cost_usd,
        spent_usd = total,
        "generate request"
    );

    Ok(GenerateApiResponse {
        text: response.text,
        finish_reason: response.finish_reason,
        usage: response.usage,
    })
}

fn resolve_controls(req: &GenerateApiRequest) -> Result<GenerationConfig, ApiError> {
    match (&req.preset, &req.controls) {
        (Some(name), _) => {
            GenerationConfig::preset(name).ok_or_else(|| ApiError::UnknownPreset(name.clone()))
        }
        (None, Some(controls)) => Ok(controls.clone()),
        (None, None) => Ok(GenerationConfig::default()),
    }
}

async fn ensure_spend_headroom(state: &AppState, user_id: &str) -> Result<(), ApiError> {
    let spent = state.spend.total(user_id).await;
    if spent >= state.config.spend_limit_usd {
        return Err(ApiError::SpendLimitExceeded {
            spent,
            limit: state.config.spend_limit_usd,
        });
    }
    Ok(())
}

fn error_type(err: &ProviderError) -> &'static str {
    match err {
        ProviderError::Transport(_) => "transport",
        ProviderError::HttpStatus { .. } => "http_status",
        ProviderError::Decode(_) => "decode",
        ProviderError::MockQueueEmpty => "mock_queue_empty",
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use promptmeter_cache::InMemoryTtlCache;
    use promptmeter_runtime::{GenerateResponse, MockProvider, ProviderError};
    use promptmeter_tokenizer::CharCounter;

    use super::*;
    use crate::config::GatewayConfig;

    fn test_state(provider: Arc<MockProvider>) -> AppState {
        let config = GatewayConfig {
            context_limit: 4000,
            ..GatewayConfig::default()
        };
        AppState::new(
            config,
            Arc::new(CharCounter::new()),
            provider,
            Arc::new(InMemoryTtlCache::new()),
        )
        .unwrap()
    }

    fn mock_response(text: &str) -> GenerateResponse {
        GenerateResponse {
            text: text.to_string(),
            model: Some("mock-1".to_string()),
            finish_reason: Some("stop".to_string()),
            usage: Some(Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            }),
        }
    }

    #[tokio::test]
    async fn estimate_counts_and_prices_prompt() {
        let state = test_state(Arc::new(MockProvider::new()));
        let req = EstimateRequest {
            prompt: "hello".to_string(),
            max_completion_tokens: 512,
        };

        let response = process_estimate(&state, "alice", &req).await.unwrap();

        assert_eq!(response.prompt_tokens, 5);
        assert!(response.fits_context);
        // 5 prompt tokens at $1/M + 512 completion tokens at $2/M
        assert_eq!(response.estimated_max_cost_usd, 0.001029);
    }

    #[tokio::test]
    async fn estimate_reports_oversized_prompt() {
        let state = test_state(Arc::new(MockProvider::new()));
        let req = EstimateRequest {
            prompt: "x".repeat(5000),
            max_completion_tokens: 512,
        };

        let response = process_estimate(&state, "alice", &req).await.unwrap();

        assert_eq!(response.prompt_tokens, 5000);
        assert!(!response.fits_context);
    }

    #[tokio::test]
    async fn repeated_estimates_are_idempotent() {
        let state = test_state(Arc::new(MockProvider::new()));
        let req = EstimateRequest {
            prompt: "hello world".to_string(),
            max_completion_tokens: 256,
        };

        let first = process_estimate(&state, "alice", &req).await.unwrap();
        let second = process_estimate(&state, "alice", &req).await.unwrap();

        assert_eq!(first, second);
        // Second call was a cache hit; the ledger only grew once.
        let spent = state.spend.total("alice").await;
        assert!((spent - first.estimated_max_cost_usd).abs() < 1e-12);
    }

    #[tokio::test]
    async fn estimate_is_blocked_once_spend_limit_is_hit() {
        let state = test_state(Arc::new(MockProvider::new()));
        state.spend.record("alice", 100.0).await;

        let req = EstimateRequest {
            prompt: "hello".to_string(),
            max_completion_tokens: 512,
        };
        let err = process_estimate(&state, "alice", &req).await.unwrap_err();

        assert_eq!(err.status(), StatusCode::PAYMENT_REQUIRED);
    }

    #[tokio::test]
    async fn plan_chunks_long_transcript() {
        let state = test_state(Arc::new(MockProvider::new()));
        let req = PlanRequest {
            transcript: "This is a short meeting.\n".repeat(300),
            instructions: default_plan_instructions(),
        };

        let response = process_plan(&state, &req).await.unwrap();

        assert!(response.num_chunks >= 2);
        assert!(response.estimated_total_cost_usd >= 0.0);
        assert_eq!(
            response.total_completion_tokens,
            response.num_chunks * state.config.default_max_completion_tokens
        );
    }

    #[tokio::test]
    async fn plan_rejects_unusable_window() {
        let provider = Arc::new(MockProvider::new());
        let config = GatewayConfig {
            context_limit: 100,
            default_max_completion_tokens: 512,
            ..GatewayConfig::default()
        };
        let state = AppState::new(
            config,
            Arc::new(CharCounter::new()),
            provider,
            Arc::new(InMemoryTtlCache::new()),
        )
        .unwrap();

        let req = PlanRequest {
            transcript: "anything".to_string(),
            instructions: default_plan_instructions(),
        };
        let err = process_plan(&state, &req).await.unwrap_err();

        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn generate_forwards_to_provider_and_records_memory() {
        let provider = Arc::new(MockProvider::new());
        provider.enqueue_generate(Ok(mock_response("Test response")));
        let state = test_state(provider);

        let req = GenerateApiRequest {
            prompt: "Hello world".to_string(),
            model: None,
            preset: None,
            controls: None,
            instructions: default_generate_instructions(),
        };
        let response = process_generate(&state, "alice", &req).await.unwrap();

        assert_eq!(response.text, "Test response");
        assert_eq!(response.finish_reason.as_deref(), Some("stop"));

        let prefix = state.memory.prefix("alice").await.unwrap();
        assert!(prefix.contains("User: Hello world"));
        assert!(prefix.contains("Bot: Test response"));

        assert!(state.spend.total("alice").await > 0.0);
    }

    #[tokio::test]
    async fn generate_rejects_unknown_preset() {
        let state = test_state(Arc::new(MockProvider::new()));
        let req = GenerateApiRequest {
            prompt: "Hello".to_string(),
            model: None,
            preset: Some("nonexistent".to_string()),
            controls: None,
            instructions: default_generate_instructions(),
        };

        let err = process_generate(&state, "alice", &req).await.unwrap_err();

        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn generate_surfaces_provider_failure_as_bad_gateway() {
        let provider = Arc::new(MockProvider::new());
        provider.enqueue_generate(Err(ProviderError::HttpStatus {
            status: 500,
            body: "upstream exploded".to_string(),
        }));
        let state = test_state(provider);

        let req = GenerateApiRequest {
            prompt: "Hello".to_string(),
            model: None,
            preset: None,
            controls: None,
            instructions: default_generate_instructions(),
        };
        let err = process_generate(&state, "alice", &req).await.unwrap_err();

        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn generate_summarizes_oversized_prompt_before_sending() {
        let provider = Arc::new(MockProvider::new());
        provider.enqueue_generate(Ok(mock_response("ok")));
        let state = test_state(provider);

        let req = GenerateApiRequest {
            prompt: "long ".repeat(2000),
            model: None,
            preset: None,
            controls: None,
            instructions: default_generate_instructions(),
        };
        let response = process_generate(&state, "alice", &req).await.unwrap();

        assert_eq!(response.text, "ok");
    }

    #[tokio::test]
    async fn generate_fails_when_nothing_fits() {
        let provider = Arc::new(MockProvider::new());
        let config = GatewayConfig {
            // Smaller than instructions + completion reserve: terminal.
            context_limit: 60,
            ..GatewayConfig::default()
        };
        let state = AppState::new(
            config,
            Arc::new(CharCounter::new()),
            provider,
            Arc::new(InMemoryTtlCache::new()),
        )
        .unwrap();

        let req = GenerateApiRequest {
            prompt: "x".repeat(500),
            model: None,
            preset: None,
            controls: None,
            instructions: default_generate_instructions(),
        };
        let err = process_generate(&state, "alice", &req).await.unwrap_err();

        assert_eq!(err.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }
}
