//! Public types for the chat API
use serde::{Deserialize, Serialize};

use crate::openai::{Message, Role};

/// Roles a caller may send. The system instruction is always added by
/// the relay, so `system` is rejected at deserialization.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

/// A single prior conversation turn in the request body
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct ChatTurn {
    pub role: TurnRole,
    pub content: String,
}

impl From<ChatTurn> for Message {
    fn from(turn: ChatTurn) -> Self {
        let role = match turn.role {
            TurnRole::User => Role::User,
            TurnRole::Assistant => Role::Assistant,
        };
        Message {
            role,
            content: turn.content,
        }
    }
}

/// The request body is a bare JSON array of turns
pub type ChatRequest = Vec<ChatTurn>;
