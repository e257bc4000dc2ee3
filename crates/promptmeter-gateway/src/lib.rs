//! Promptmeter Gateway
//!
//! This crate implements the HTTP surface for the token-economics services:
//! - `/estimate`: token count, context fit, and worst-case cost for a prompt
//! - `/plan`: chunk-and-cost estimate for long transcripts
//! - `/generate`: sampling-controlled forwarding to the chat-completions API
//! - `/healthz`, `/metrics`, `/clear`
//!
//! Handlers are thin callers of the budget planner plus the injected
//! collaborators (tokenizer, provider, cache, per-user stores).

pub mod auth;
pub mod config;
pub mod ledger;
pub mod memory;
pub mod metrics;
pub mod router;
pub mod service;
pub mod state;

pub use config::GatewayConfig;
pub use router::build_routes;
pub use state::AppState;

/// Gateway version
pub const GATEWAY_VERSION: &str = env!("CARGO_PKG_VERSION");
