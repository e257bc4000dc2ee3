//! Budget parameters and pricing rates

use serde::{Deserialize, Serialize};

use crate::error::{BudgetError, BudgetResult};

/// Immutable token limits for one planning call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BudgetParameters {
    /// Total tokens the model accepts across prompt + completion.
    pub context_limit: usize,
    /// Tokens reserved for the response.
    pub max_completion_tokens: usize,
    /// Fractional shrink factor in (0, 1] applied to the usable window.
    pub safety_margin: f64,
    /// Tokens consumed by fixed instructions wrapped around every prompt.
    pub overhead_tokens: usize,
}

impl BudgetParameters {
    pub const DEFAULT_SAFETY_MARGIN: f64 = 0.8;

    /// Validated constructor. Zero limits are configuration errors, not
    /// planner outcomes.
    pub fn new(context_limit: usize, max_completion_tokens: usize) -> BudgetResult<Self> {
        if context_limit == 0 {
            return Err(BudgetError::InvalidArgument(
                "context_limit must be positive".to_string(),
            ));
        }
        if max_completion_tokens == 0 {
            return Err(BudgetError::InvalidArgument(
                "max_completion_tokens must be positive".to_string(),
            ));
        }
        Ok(Self {
            context_limit,
            max_completion_tokens,
            safety_margin: Self::DEFAULT_SAFETY_MARGIN,
            overhead_tokens: 0,
        })
    }

    /// Set the safety margin; must lie in (0, 1].
    pub fn with_safety_margin(mut self, margin: f64) -> BudgetResult<Self> {
        if !(margin > 0.0 && margin <= 1.0) {
            return Err(BudgetError::InvalidArgument(format!(
                "safety_margin must be in (0, 1], got {margin}"
            )));
        }
        self.safety_margin = margin;
        Ok(self)
    }

    /// Set the fixed-instruction overhead.
    pub fn with_overhead(mut self, overhead_tokens: usize) -> Self {
        self.overhead_tokens = overhead_tokens;
        self
    }
}

/// USD pricing per million tokens, prompt and completion sides.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricingRates {
    pub prompt_rate_per_million: f64,
    pub completion_rate_per_million: f64,
}

impl PricingRates {
    /// Validated constructor; rates must be positive and finite.
    pub fn new(prompt_rate_per_million: f64, completion_rate_per_million: f64) -> BudgetResult<Self> {
        for (name, rate) in [
            ("prompt_rate_per_million", prompt_rate_per_million),
            ("completion_rate_per_million", completion_rate_per_million),
        ] {
            if !(rate.is_finite() && rate > 0.0) {
                return Err(BudgetError::InvalidArgument(format!(
                    "{name} must be positive and finite, got {rate}"
                )));
            }
        }
        Ok(Self {
            prompt_rate_per_million,
            completion_rate_per_million,
        })
    }
}
