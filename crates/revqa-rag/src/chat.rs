//! Plain conversational replies with a bounded history window.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use revqa_core::config::ChatSettings;
use revqa_core::{RagError, Result};

use crate::generator::{ChatMessage, ChatModel};

pub const CHAT_FAILURE: &str = "Failed to generate desired results";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Speaker {
    Human,
    Ai,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub speaker: Speaker,
    pub content: String,
}

impl ConversationTurn {
    pub fn human(content: impl Into<String>) -> Self { Self { speaker: Speaker::Human, content: content.into() } }
    pub fn ai(content: impl Into<String>) -> Self { Self { speaker: Speaker::Ai, content: content.into() } }
}

/// Transcript of the turns before the last one, as `Human:`/`AI:` lines.
///
/// While the conversation has at most `max_turns` turns every prior turn is
/// kept; past that only the last `history_turns` prior turns are.
pub fn trim_history(turns: &[ConversationTurn], history_turns: usize, max_turns: usize) -> String {
    let Some(prior_end) = turns.len().checked_sub(1) else { return String::new() };
    let start = if turns.len() > max_turns { turns.len().saturating_sub(history_turns + 1) } else { 0 };
    turns[start..prior_end]
        .iter()
        .map(|t| match t.speaker {
            Speaker::Human => format!("Human: {}", t.content),
            Speaker::Ai => format!("AI: {}", t.content),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub struct ChatResponder {
    model: Arc<dyn ChatModel>,
    settings: ChatSettings,
}

impl ChatResponder {
    pub fn new(model: Arc<dyn ChatModel>, settings: ChatSettings) -> Self { Self { model, settings } }

    pub async fn respond(&self, turns: &[ConversationTurn]) -> String {
        match self.try_respond(turns).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!("Chat reply failed: {}", e);
                CHAT_FAILURE.to_string()
            }
        }
    }

    async fn try_respond(&self, turns: &[ConversationTurn]) -> Result<String> {
        let query = turns.last().ok_or_else(|| RagError::GenerationFailure("empty conversation".into()))?;
        let history = trim_history(turns, self.settings.history_turns, self.settings.max_turns);
        let system = format!("You are a helpful assistant. Answer the user's query very concisely.\nConversation history:\n{history}");
        let messages = [ChatMessage::system(system), ChatMessage::user(query.content.clone())];
        let reply = self.model.complete(&messages).await?;
        if reply.trim().is_empty() {
            return Err(RagError::GenerationFailure("model returned an empty reply".into()));
        }
        Ok(reply)
    }
}
