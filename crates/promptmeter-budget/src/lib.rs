//! Promptmeter budget planner
//!
//! The one piece of decision logic shared by all the services: given a token
//! budget, decide whether a payload fits the model's context window as-is,
//! must be summarized, or must be split into ordered chunks - and what the
//! chosen plan costs in worst-case USD.
//!
//! Every operation here is a pure, single-shot computation over its inputs.
//! There is no shared mutable state and no I/O; the tokenizer is injected as
//! a capability so tests can substitute a deterministic counter.

pub mod error;
pub mod params;
pub mod plan;
pub mod planner;

pub use error::{BudgetError, BudgetResult};
pub use params::{BudgetParameters, PricingRates};
pub use plan::{ChunkPlan, CostEstimate, Plan};
pub use planner::{estimate_cost, fits_context, BudgetPlanner, SUMMARY_TOKEN_CAP};

/// Prelude for common imports
pub mod prelude {
    pub use crate::error::{BudgetError, BudgetResult};
    pub use crate::params::{BudgetParameters, PricingRates};
    pub use crate::plan::{ChunkPlan, CostEstimate, Plan};
    pub use crate::planner::{estimate_cost, fits_context, BudgetPlanner};
}
