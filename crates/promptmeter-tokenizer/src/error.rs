//! Error types for tokenization

use thiserror::Error;

/// Tokenizer error type
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenizerError {
    #[error("failed to initialize tokenizer: {0}")]
    Init(String),

    #[error("failed to decode token sequence: {0}")]
    Decode(String),

    #[error("unknown token id: {0}")]
    UnknownToken(u32),
}

/// Result type for tokenizer operations
pub type TokenizerResult<T> = Result<T, TokenizerError>;
