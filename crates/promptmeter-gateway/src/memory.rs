//! Per-user conversation memory
//!
//! Short transcript of previous turns, prepended to the next generation
//! request so follow-up prompts carry context. Keyed by the caller-supplied
//! id; an explicit store object injected through the app state.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

/// In-memory conversation log per caller id.
#[derive(Debug, Clone, Default)]
pub struct ConversationMemory {
    turns: Arc<RwLock<HashMap<String, Vec<String>>>>,
}

impl ConversationMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Previous turns joined into a prompt prefix, or `None` for a fresh
    /// caller.
    pub async fn prefix(&self, user_id: &str) -> Option<String> {
        let turns = self.turns.read().await;
        let lines = turns.get(user_id)?;
        if lines.is_empty() {
            return None;
        }
        Some(format!("{}\n", lines.join("\n")))
    }

    /// Append one user/bot exchange to the caller's log.
    pub async fn record_turn(&self, user_id: &str, user_text: &str, bot_text: &str) {
        let mut turns = self.turns.write().await;
        let lines = turns.entry(user_id.to_string()).or_default();
        lines.push(format!("User: {user_text}"));
        lines.push(format!("Bot: {bot_text}"));
    }

    /// Forget everything recorded for a caller.
    pub async fn clear(&self, user_id: &str) {
        self.turns.write().await.remove(user_id);
    }
}
