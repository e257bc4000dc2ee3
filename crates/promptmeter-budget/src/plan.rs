//! Planning outcomes

use serde::{Deserialize, Serialize};

/// The planner's decision for one payload. Exactly one case per invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Plan {
    /// The full prompt fits the context window as-is.
    Direct { prompt: String, prompt_tokens: usize },
    /// The user text was truncated to the summary cap and marked as such.
    Summarized { prompt: String, prompt_tokens: usize },
    /// The payload was split into ordered, token-bounded chunks.
    Chunked(ChunkPlan),
}

impl Plan {
    /// Prompt tokens the chosen plan will submit, across all requests.
    pub fn prompt_tokens(&self) -> usize {
        match self {
            Plan::Direct { prompt_tokens, .. } | Plan::Summarized { prompt_tokens, .. } => {
                *prompt_tokens
            }
            Plan::Chunked(chunk_plan) => chunk_plan.total_prompt_tokens,
        }
    }
}

/// Chunked-submission statistics.
///
/// Chunk order is the order of appearance in the source text and is an
/// invariant: each chunk is summarized independently and the summaries are
/// re-assembled in sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkPlan {
    pub chunks: Vec<String>,
    pub chunk_size_tokens: usize,
    pub total_prompt_tokens: usize,
    pub total_completion_tokens: usize,
    pub estimated_total_cost_usd: f64,
}

impl ChunkPlan {
    pub fn num_chunks(&self) -> usize {
        self.chunks.len()
    }
}

/// Deterministic worst-case cost for a prompt/completion token pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostEstimate {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub estimated_cost_usd: f64,
}
