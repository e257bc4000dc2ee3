//! Shared application state
//!
//! All collaborators are injected here once at startup; handlers never reach
//! for ambient globals.

use std::sync::Arc;

use promptmeter_budget::{BudgetParameters, BudgetPlanner, PricingRates};
use promptmeter_cache::ResponseCache;
use promptmeter_runtime::ChatProvider;
use promptmeter_tokenizer::TokenCounter;

use crate::config::GatewayConfig;
use crate::ledger::SpendLedger;
use crate::memory::ConversationMemory;

/// Gateway state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub counter: Arc<dyn TokenCounter>,
    pub provider: Arc<dyn ChatProvider>,
    pub cache: Arc<dyn ResponseCache>,
    pub rates: PricingRates,
    pub spend: SpendLedger,
    pub memory: ConversationMemory,
}

impl AppState {
    /// Assemble the state, validating the pricing configuration up front so
    /// the arithmetic helpers never see invalid rates.
    pub fn new(
        config: GatewayConfig,
        counter: Arc<dyn TokenCounter>,
        provider: Arc<dyn ChatProvider>,
        cache: Arc<dyn ResponseCache>,
    ) -> anyhow::Result<Self> {
        let rates = PricingRates::new(
            config.prompt_rate_per_million,
            config.completion_rate_per_million,
        )?;

        Ok(Self {
            config: Arc::new(config),
            counter,
            provider,
            cache,
            rates,
            spend: SpendLedger::new(),
            memory: ConversationMemory::new(),
        })
    }

    /// Planner for one request, with a request-specific completion reserve
    /// and overhead. Construction is cheap; parameters vary per call.
    pub fn planner(
        &self,
        max_completion_tokens: usize,
        overhead_tokens: usize,
    ) -> promptmeter_budget::BudgetResult<BudgetPlanner> {
        let params = BudgetParameters::new(self.config.context_limit, max_completion_tokens)?
            .with_safety_margin(self.config.safety_margin)?
            .with_overhead(overhead_tokens);
        Ok(BudgetPlanner::new(self.counter.clone(), params, self.rates))
    }
}
