//! Promptmeter tokenization - the `TokenCounter` capability
//!
//! This crate provides:
//! - The `TokenCounter` trait consumed by the budget planner
//! - A cl100k_base implementation backed by `tiktoken-rs`
//! - A deterministic per-character counter for tests

pub mod chars;
pub mod cl100k;
pub mod error;

pub use chars::CharCounter;
pub use cl100k::Cl100kCounter;
pub use error::{TokenizerError, TokenizerResult};

/// Token counting capability.
///
/// Implementations must keep `encode` and `decode` consistent with each
/// other: `decode(encode(t)) == t` for valid input text, and
/// `count(t) == encode(t).len()`. Decoding an arbitrary sub-slice of an
/// encoded sequence may fail or lose bytes at the cut points - subword
/// tokenizers do not guarantee that every split lands on a character
/// boundary. Callers that slice token sequences accept that tolerance.
pub trait TokenCounter: Send + Sync {
    /// Short identifier for logs and diagnostics.
    fn name(&self) -> &'static str;

    /// Encode text into an ordered sequence of token ids.
    fn encode(&self, text: &str) -> Vec<u32>;

    /// Decode a token sequence back into text.
    fn decode(&self, tokens: &[u32]) -> TokenizerResult<String>;

    /// Number of tokens in `text`. Always equal to `encode(text).len()`.
    fn count(&self, text: &str) -> usize {
        self.encode(text).len()
    }
}
