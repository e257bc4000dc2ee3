//! The budget planner

use std::sync::Arc;

use promptmeter_tokenizer::TokenCounter;

use crate::error::{BudgetError, BudgetResult};
use crate::params::{BudgetParameters, PricingRates};
use crate::plan::{ChunkPlan, CostEstimate, Plan};

/// Token cap for the summarization fallback.
pub const SUMMARY_TOKEN_CAP: usize = 200;

/// Marker appended to text truncated by the fallback.
pub const TRUNCATION_MARKER: &str = " ... [TRUNCATED SUMMARY]";

const USER_SEPARATOR: &str = "\n\nUser:\n";
const SUMMARY_SEPARATOR: &str = "\n\nUser (summarized):\n";

/// Whether a prompt plus its reserved completion fits the context window.
pub fn fits_context(prompt_tokens: usize, max_completion_tokens: usize, context_limit: usize) -> bool {
    prompt_tokens.saturating_add(max_completion_tokens) <= context_limit
}

/// Worst-case USD cost for a prompt/completion token pair, rounded to six
/// decimal places.
pub fn estimate_cost(
    prompt_tokens: usize,
    completion_tokens: usize,
    rates: &PricingRates,
) -> CostEstimate {
    let cost = prompt_tokens as f64 / 1_000_000.0 * rates.prompt_rate_per_million
        + completion_tokens as f64 / 1_000_000.0 * rates.completion_rate_per_million;
    CostEstimate {
        prompt_tokens,
        completion_tokens,
        estimated_cost_usd: round_to_micros(cost),
    }
}

fn round_to_micros(value: f64) -> f64 {
    (value * 1_000_000.0).round() / 1_000_000.0
}

/// Decides how a payload reaches the model: direct, summarized, or chunked.
///
/// Holds no mutable state; safe to share across threads behind an `Arc` or
/// to rebuild per request with request-specific parameters.
#[derive(Clone)]
pub struct BudgetPlanner {
    counter: Arc<dyn TokenCounter>,
    params: BudgetParameters,
    rates: PricingRates,
}

impl BudgetPlanner {
    pub fn new(counter: Arc<dyn TokenCounter>, params: BudgetParameters, rates: PricingRates) -> Self {
        Self {
            counter,
            params,
            rates,
        }
    }

    pub fn params(&self) -> &BudgetParameters {
        &self.params
    }

    pub fn rates(&self) -> &PricingRates {
        &self.rates
    }

    /// Worst-case cost under this planner's pricing.
    pub fn cost(&self, prompt_tokens: usize, completion_tokens: usize) -> CostEstimate {
        estimate_cost(prompt_tokens, completion_tokens, &self.rates)
    }

    /// Build the full prompt and decide between direct submission and the
    /// summarization fallback.
    ///
    /// A `context_limit` smaller than the instruction overhead plus the
    /// completion reserve always fails with `ContextOverflow` for non-empty
    /// input; that is the configured answer, not a planner bug.
    pub fn plan_direct_or_fallback(
        &self,
        user_text: &str,
        fixed_instructions: &str,
    ) -> BudgetResult<Plan> {
        let full_prompt = format!("{fixed_instructions}{USER_SEPARATOR}{user_text}");
        let prompt_tokens = self.counter.count(&full_prompt);

        if self.fits(prompt_tokens) {
            tracing::debug!(prompt_tokens, "prompt fits context window");
            return Ok(Plan::Direct {
                prompt: full_prompt,
                prompt_tokens,
            });
        }

        let summarized = self.token_summary(user_text)?;
        let fallback_prompt = format!("{fixed_instructions}{SUMMARY_SEPARATOR}{summarized}");
        let fallback_tokens = self.counter.count(&fallback_prompt);

        if !self.fits(fallback_tokens) {
            return Err(BudgetError::ContextOverflow {
                prompt_tokens: fallback_tokens,
                context_limit: self.params.context_limit,
            });
        }

        tracing::debug!(prompt_tokens, fallback_tokens, "fell back to summarized prompt");
        Ok(Plan::Summarized {
            prompt: fallback_prompt,
            prompt_tokens: fallback_tokens,
        })
    }

    /// Split a long payload into consecutive token windows and report the
    /// aggregate token and cost statistics of submitting every chunk with
    /// the configured overhead and completion reserve.
    ///
    /// Chunk order follows the source text. Decoding a window that was cut
    /// mid-character is tokenizer-dependent; a failure surfaces as a
    /// `Tokenizer` error rather than silently dropping bytes.
    pub fn plan_chunked(&self, full_text: &str) -> BudgetResult<ChunkPlan> {
        let window = self.usable_window()?;

        let tokens = self.counter.encode(full_text);
        let mut chunks = Vec::with_capacity(tokens.len().div_ceil(window));
        for slice in tokens.chunks(window) {
            chunks.push(self.counter.decode(slice)?);
        }

        let num_chunks = chunks.len();
        let total_prompt_tokens = num_chunks * (window + self.params.overhead_tokens);
        let total_completion_tokens = num_chunks * self.params.max_completion_tokens;
        let cost = estimate_cost(total_prompt_tokens, total_completion_tokens, &self.rates);

        tracing::debug!(num_chunks, chunk_size_tokens = window, "planned chunked submission");
        Ok(ChunkPlan {
            chunks,
            chunk_size_tokens: window,
            total_prompt_tokens,
            total_completion_tokens,
            estimated_total_cost_usd: cost.estimated_cost_usd,
        })
    }

    fn fits(&self, prompt_tokens: usize) -> bool {
        fits_context(
            prompt_tokens,
            self.params.max_completion_tokens,
            self.params.context_limit,
        )
    }

    /// Tokens available per chunk after overhead, completion reserve, and
    /// the safety margin.
    fn usable_window(&self) -> BudgetResult<usize> {
        let p = &self.params;
        let reserved = p.overhead_tokens + p.max_completion_tokens;
        let budget = p.context_limit as i64 - reserved as i64;
        let window = (budget as f64 * p.safety_margin).floor() as i64;
        if window <= 0 {
            return Err(BudgetError::WindowTooSmall {
                context_limit: p.context_limit,
                reserved,
            });
        }
        Ok(window as usize)
    }

    fn token_summary(&self, text: &str) -> BudgetResult<String> {
        let tokens = self.counter.encode(text);
        if tokens.len() <= SUMMARY_TOKEN_CAP {
            return Ok(text.to_string());
        }
        let truncated = self.counter.decode(&tokens[..SUMMARY_TOKEN_CAP])?;
        Ok(format!("{truncated}{TRUNCATION_MARKER}"))
    }
}

impl std::fmt::Debug for BudgetPlanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BudgetPlanner")
            .field("counter", &self.counter.name())
            .field("params", &self.params)
            .field("rates", &self.rates)
            .finish()
    }
}
