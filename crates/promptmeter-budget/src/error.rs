//! Error types for budget planning

use promptmeter_tokenizer::TokenizerError;
use thiserror::Error;

/// Budget planning error type
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BudgetError {
    /// The input cannot be made to fit the context window, even after the
    /// summarization fallback. Terminal: the caller decides what to do,
    /// the planner never degrades the input further.
    #[error("prompt of {prompt_tokens} tokens exceeds the {context_limit}-token context window even after summarization")]
    ContextOverflow {
        prompt_tokens: usize,
        context_limit: usize,
    },

    /// The configured limits leave no positive chunk size.
    #[error("context limit {context_limit} minus {reserved} reserved tokens leaves no usable chunk window")]
    WindowTooSmall {
        context_limit: usize,
        reserved: usize,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Tokenizer(#[from] TokenizerError),
}

/// Result type for budget operations
pub type BudgetResult<T> = Result<T, BudgetError>;
