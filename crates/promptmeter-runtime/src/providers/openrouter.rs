//! OpenRouter API Provider
//!
//! Implements the ChatProvider trait against OpenRouter's chat-completions
//! endpoint, forwarding the full set of sampling controls.

use std::env;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::{ChatProvider, GenerateRequest, GenerateResponse, ProviderError, Usage};

const OPENROUTER_API_BASE: &str = "https://openrouter.ai/api/v1";
const DEFAULT_MODEL: &str = "openai/gpt-4o-mini";

/// OpenRouter chat-completions provider
#[derive(Debug)]
pub struct OpenRouterProvider {
    client: Client,
    api_key: String,
    base_url: String,
    pub default_model: String,
}

impl OpenRouterProvider {
    /// Create a new provider from environment variables
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let api_key = env::var("OPENROUTER_API_KEY")
            .expect("OPENROUTER_API_KEY environment variable must be set");

        let base_url =
            env::var("OPENROUTER_API_BASE").unwrap_or_else(|_| OPENROUTER_API_BASE.to_string());

        let default_model =
            env::var("OPENROUTER_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        Self::new(api_key, base_url, default_model)
    }

    /// Create a new provider with explicit configuration
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        default_model: impl Into<String>,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into(),
            default_model: default_model.into(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    fn get_model(&self, req: &GenerateRequest) -> String {
        req.model.clone().unwrap_or_else(|| self.default_model.clone())
    }
}

// ============================================================================
// OpenRouter API Types
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatCompletionsRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f64,
    top_p: f64,
    max_tokens: u32,
    frequency_penalty: f64,
    presence_penalty: f64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    stop: Vec<String>,
}

#[derive(Debug, Serialize, Clone)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionsResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    usage: Option<UsageBody>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: MessageBody,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessageBody {
    content: String,
}

#[derive(Debug, Deserialize)]
struct UsageBody {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

impl From<UsageBody> for Usage {
    fn from(usage: UsageBody) -> Self {
        Self {
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
            total_tokens: usage.total_tokens,
        }
    }
}

#[async_trait]
impl ChatProvider for OpenRouterProvider {
    fn name(&self) -> &'static str {
        "openrouter"
    }

    async fn generate(&self, req: GenerateRequest) -> Result<GenerateResponse, ProviderError> {
        let controls = req.controls.clone().clamped();
        let body = ChatCompletionsRequest {
            model: self.get_model(&req),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: req.prompt,
            }],
            temperature: controls.temperature,
            top_p: controls.top_p,
            max_tokens: controls.max_tokens,
            frequency_penalty: controls.frequency_penalty,
            presence_penalty: controls.presence_penalty,
            stop: controls.stop,
        };

        let response = self
            .client
            .post(self.endpoint("/chat/completions"))
            .bearer_auth(&self.api_key)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unable to read body>".to_string());
            return Err(ProviderError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        let completion: ChatCompletionsResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Decode(e.to_string()))?;

        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::Decode("response contained no choices".to_string()))?;

        Ok(GenerateResponse {
            text: choice.message.content,
            model: completion.model,
            finish_reason: choice.finish_reason,
            usage: completion.usage.map(Usage::from),
        })
    }
}
