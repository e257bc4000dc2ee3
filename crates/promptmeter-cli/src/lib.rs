use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub fn crate_name() -> &'static str {
    "promptmeter-cli"
}

#[derive(Debug, Clone, Parser)]
#[command(
    name = "promptmeter-cli",
    version,
    about = "Promptmeter command line client",
    long_about = "Promptmeter command line client for estimating token counts, planning chunked submissions, and generating text through the gateway"
)]
pub struct Cli {
    #[arg(
        long,
        global = true,
        default_value = "http://127.0.0.1:8080",
        help = "Gateway base HTTP URL"
    )]
    pub server: String,
    #[arg(
        long,
        global = true,
        env = "PROMPTMETER_API_KEY",
        default_value = "dev-secret-key",
        help = "API key sent as x-api-key"
    )]
    pub api_key: String,
    #[arg(
        long,
        global = true,
        default_value = "anonymous",
        help = "Caller id sent as x-user-id"
    )]
    pub user: String,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    #[command(about = "Check gateway liveness")]
    Health,
    #[command(about = "Estimate token count, context fit, and worst-case cost")]
    Estimate {
        #[arg(help = "Prompt text")]
        prompt: String,
        #[arg(long, default_value_t = 512, help = "Reserved completion tokens")]
        max_completion_tokens: usize,
    },
    #[command(about = "Plan a chunked transcript submission and its cost")]
    Plan {
        #[arg(help = "Transcript text; omit when using --file")]
        transcript: Option<String>,
        #[arg(long, help = "Read the transcript from a file")]
        file: Option<PathBuf>,
    },
    #[command(about = "Generate text through the gateway")]
    Generate {
        #[arg(help = "Prompt text")]
        prompt: String,
        #[arg(long, help = "Named preset (deterministic_tool, rag_qa, creative_writer)")]
        preset: Option<String>,
        #[arg(long, help = "Model override")]
        model: Option<String>,
    },
    #[command(about = "Clear the caller's conversation memory")]
    Clear,
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("http transport error: {0}")]
    HttpTransport(String),
    #[error("http status {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("json decode error: {0}")]
    Decode(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct CliClient {
    base_url: String,
    api_key: String,
    user: String,
    http: reqwest::Client,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EstimateResponse {
    pub prompt_tokens: usize,
    pub fits_context: bool,
    pub estimated_max_cost_usd: f64,
    pub duration_ms: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlanResponse {
    pub num_chunks: usize,
    pub chunk_size_tokens: usize,
    pub total_prompt_tokens: usize,
    pub total_completion_tokens: usize,
    pub estimated_total_cost_usd: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateResponse {
    pub text: String,
    pub finish_reason: Option<String>,
    #[serde(default)]
    pub usage: Option<UsageBody>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct UsageBody {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

#[derive(Debug, Clone, Serialize)]
struct EstimateRequest {
    prompt: String,
    max_completion_tokens: usize,
}

#[derive(Debug, Clone, Serialize)]
struct PlanRequest {
    transcript: String,
}

#[derive(Debug, Clone, Serialize)]
struct GenerateRequest {
    prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    preset: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<String>,
}

impl CliClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        user: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            user: user.into(),
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(90))
                .build()
                .expect("build http client"),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn post_json<B: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, CliError> {
        let response = self
            .http
            .post(self.endpoint(path))
            .header("x-api-key", &self.api_key)
            .header("x-user-id", &self.user)
            .json(body)
            .send()
            .await
            .map_err(|e| CliError::HttpTransport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unable to read body>".to_string());
            return Err(CliError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<R>()
            .await
            .map_err(|e| CliError::Decode(e.to_string()))
    }

    pub async fn health(&self) -> Result<StatusCode, CliError> {
        let response = self
            .http
            .get(self.endpoint("/healthz"))
            .send()
            .await
            .map_err(|e| CliError::HttpTransport(e.to_string()))?;
        Ok(response.status())
    }

    pub async fn estimate(
        &self,
        prompt: String,
        max_completion_tokens: usize,
    ) -> Result<EstimateResponse, CliError> {
        self.post_json(
            "/estimate",
            &EstimateRequest {
                prompt,
                max_completion_tokens,
            },
        )
        .await
    }

    pub async fn plan(&self, transcript: String) -> Result<PlanResponse, CliError> {
        self.post_json("/plan", &PlanRequest { transcript }).await
    }

    pub async fn generate(
        &self,
        prompt: String,
        preset: Option<String>,
        model: Option<String>,
    ) -> Result<GenerateResponse, CliError> {
        self.post_json(
            "/generate",
            &GenerateRequest {
                prompt,
                preset,
                model,
            },
        )
        .await
    }

    pub async fn clear(&self) -> Result<(), CliError> {
        let _: serde_json::Value = self.post_json("/clear", &serde_json::json!({})).await?;
        Ok(())
    }
}

/// Execute one CLI command and render its output.
pub async fn run(cli: Cli) -> Result<String, CliError> {
    let client = CliClient::new(cli.server, cli.api_key, cli.user);

    match cli.command {
        Commands::Health => {
            let status = client.health().await?;
            Ok(format!("gateway status: {status}"))
        }
        Commands::Estimate {
            prompt,
            max_completion_tokens,
        } => {
            let estimate = client.estimate(prompt, max_completion_tokens).await?;
            Ok(format!(
                "prompt tokens: {}\nfits context: {}\nestimated worst-case cost: ${:.6}\nlatency: {:.2}ms",
                estimate.prompt_tokens,
                estimate.fits_context,
                estimate.estimated_max_cost_usd,
                estimate.duration_ms
            ))
        }
        Commands::Plan { transcript, file } => {
            let transcript = match (transcript, file) {
                (_, Some(path)) => std::fs::read_to_string(path)?,
                (Some(text), None) => text,
                (None, None) => {
                    return Err(CliError::InvalidArgument(
                        "provide a transcript argument or --file".to_string(),
                    ));
                }
            };
            let plan = client.plan(transcript).await?;
            Ok(format!(
                "chunks: {} x {} tokens\ntotal prompt tokens: {}\ntotal completion tokens: {}\nestimated total cost: ${:.6}",
                plan.num_chunks,
                plan.chunk_size_tokens,
                plan.total_prompt_tokens,
                plan.total_completion_tokens,
                plan.estimated_total_cost_usd
            ))
        }
        Commands::Generate {
            prompt,
            preset,
            model,
        } => {
            let generated = client.generate(prompt, preset, model).await?;
            let mut output = generated.text;
            if let Some(usage) = generated.usage {
                output.push_str(&format!("\n[{} tokens total]", usage.total_tokens));
            }
            Ok(output)
        }
        Commands::Clear => {
            client.clear().await?;
            Ok("memory cleared".to_string())
        }
    }
}
