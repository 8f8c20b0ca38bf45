//! UI-agnostic chat state types
//!
//! These are shared by every front end (the terminal UI, the one-shot CLI)
//! and don't depend on any specific UI framework.

use serde::{Deserialize, Serialize};

/// A single message in the conversation. Never mutated once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Who a message is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Bot,
    System,
}

impl ChatRole {
    /// Short label shown next to the message. System rows carry none.
    pub fn label(&self) -> Option<&'static str> {
        match self {
            ChatRole::User => Some("Tú"),
            ChatRole::Bot => Some("AI"),
            ChatRole::System => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Bot => "bot",
            ChatRole::System => "system",
        }
    }
}
