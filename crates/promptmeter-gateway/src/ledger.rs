//! Per-user spend accounting
//!
//! Concurrent requests from the same caller race on the accumulated total,
//! so the read-modify-write happens under a single write lock. The ledger is
//! an explicit store passed through the app state, never ambient
//! process-wide state.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

/// Running USD spend per caller id.
#[derive(Debug, Clone, Default)]
pub struct SpendLedger {
    totals: Arc<RwLock<HashMap<String, f64>>>,
}

impl SpendLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `cost_usd` to the caller's total and return the new total.
    pub async fn record(&self, user_id: &str, cost_usd: f64) -> f64 {
        let mut totals = self.totals.write().await;
        let total = totals.entry(user_id.to_string()).or_insert(0.0);
        *total += cost_usd;
        *total
    }

    /// Current accumulated total for a caller.
    pub async fn total(&self, user_id: &str) -> f64 {
        self.totals.read().await.get(user_id).copied().unwrap_or(0.0)
    }
}
