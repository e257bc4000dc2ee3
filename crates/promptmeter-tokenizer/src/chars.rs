//! Deterministic per-character counter for tests
//!
//! One token per Unicode scalar value, with the codepoint as the token id.
//! Unlike a subword tokenizer this round-trips exactly at every split point,
//! which makes planner tests independent of BPE table details.

use crate::error::{TokenizerError, TokenizerResult};
use crate::TokenCounter;

/// One token per character; token id = codepoint.
#[derive(Debug, Clone, Copy, Default)]
pub struct CharCounter;

impl CharCounter {
    pub fn new() -> Self {
        Self
    }
}

impl TokenCounter for CharCounter {
    fn name(&self) -> &'static str {
        "chars"
    }

    fn encode(&self, text: &str) -> Vec<u32> {
        text.chars().map(|c| c as u32).collect()
    }

    fn decode(&self, tokens: &[u32]) -> TokenizerResult<String> {
        tokens
            .iter()
            .map(|&id| char::from_u32(id).ok_or(TokenizerError::UnknownToken(id)))
            .collect()
    }
}
