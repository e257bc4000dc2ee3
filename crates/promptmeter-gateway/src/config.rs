//! Gateway configuration from environment variables

use std::str::FromStr;

use anyhow::Context;

/// Runtime configuration for the gateway.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Listen address, e.g. `0.0.0.0:8080`.
    pub bind_addr: String,
    /// Static API key required on every request except health and metrics.
    pub api_key: String,
    /// Total tokens the model accepts across prompt + completion.
    pub context_limit: usize,
    /// Completion reserve applied when a request does not specify one.
    pub default_max_completion_tokens: usize,
    /// USD per million prompt tokens.
    pub prompt_rate_per_million: f64,
    /// USD per million completion tokens.
    pub completion_rate_per_million: f64,
    /// Fractional shrink factor for the chunk window.
    pub safety_margin: f64,
    /// Per-user accumulated spend ceiling in USD.
    pub spend_limit_usd: f64,
    /// TTL for cached estimate responses, seconds.
    pub cache_ttl_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            api_key: "dev-secret-key".to_string(),
            context_limit: 16_000,
            default_max_completion_tokens: 512,
            prompt_rate_per_million: 1.0,
            completion_rate_per_million: 2.0,
            safety_margin: 0.8,
            spend_limit_usd: 5.0,
            cache_ttl_secs: 300,
        }
    }
}

impl GatewayConfig {
    /// Load configuration from `PROMPTMETER_*` environment variables,
    /// falling back to defaults for anything unset.
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            bind_addr: std::env::var("PROMPTMETER_BIND_ADDR").unwrap_or(defaults.bind_addr),
            api_key: std::env::var("PROMPTMETER_API_KEY").unwrap_or(defaults.api_key),
            context_limit: parse_env("PROMPTMETER_CONTEXT_LIMIT", defaults.context_limit)?,
            default_max_completion_tokens: parse_env(
                "PROMPTMETER_MAX_COMPLETION_TOKENS",
                defaults.default_max_completion_tokens,
            )?,
            prompt_rate_per_million: parse_env(
                "PROMPTMETER_PROMPT_RATE_PER_MILLION",
                defaults.prompt_rate_per_million,
            )?,
            completion_rate_per_million: parse_env(
                "PROMPTMETER_COMPLETION_RATE_PER_MILLION",
                defaults.completion_rate_per_million,
            )?,
            safety_margin: parse_env("PROMPTMETER_SAFETY_MARGIN", defaults.safety_margin)?,
            spend_limit_usd: parse_env("PROMPTMETER_SPEND_LIMIT_USD", defaults.spend_limit_usd)?,
            cache_ttl_secs: parse_env("PROMPTMETER_CACHE_TTL_SECS", defaults.cache_ttl_secs)?,
        })
    }
}

fn parse_env<T: FromStr>(name: &str, default: T) -> anyhow::Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .parse::<T>()
            .with_context(|| format!("invalid value for {name}: {raw}")),
        Err(_) => Ok(default),
    }
}
