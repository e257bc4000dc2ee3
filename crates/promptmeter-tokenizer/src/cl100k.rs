//! cl100k_base tokenizer backed by tiktoken-rs
//!
//! The BPE tables are built once at construction; `CoreBPE` is immutable and
//! thread-safe, so a single instance can be shared behind an `Arc` across
//! request handlers.

use tiktoken_rs::CoreBPE;

use crate::error::{TokenizerError, TokenizerResult};
use crate::TokenCounter;

/// `TokenCounter` over the cl100k_base encoding.
pub struct Cl100kCounter {
    bpe: CoreBPE,
}

impl Cl100kCounter {
    /// Build the cl100k_base encoder. Construction is the expensive part;
    /// do it once at startup and share the instance.
    pub fn new() -> TokenizerResult<Self> {
        let bpe = tiktoken_rs::cl100k_base().map_err(|e| TokenizerError::Init(e.to_string()))?;
        Ok(Self { bpe })
    }
}

impl std::fmt::Debug for Cl100kCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cl100kCounter").finish_non_exhaustive()
    }
}

impl TokenCounter for Cl100kCounter {
    fn name(&self) -> &'static str {
        "cl100k_base"
    }

    fn encode(&self, text: &str) -> Vec<u32> {
        self.bpe.encode_with_special_tokens(text)
    }

    fn decode(&self, tokens: &[u32]) -> TokenizerResult<String> {
        // A slice cut mid-character cannot be decoded to valid UTF-8; the
        // error is surfaced rather than papered over.
        self.bpe
            .decode(tokens.to_vec())
            .map_err(|e| TokenizerError::Decode(e.to_string()))
    }
}
