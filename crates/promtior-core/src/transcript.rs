//! Append-only conversation log with a single optional typing row.

use crate::state::{ChatMessage, ChatRole};

/// Text of the placeholder row shown while a reply is pending.
pub const TYPING_TEXT: &str = "El asistente está escribiendo";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Row {
    Message(ChatMessage),
    Typing,
}

#[derive(Debug, Clone, Default)]
pub struct Transcript {
    rows: Vec<Row>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append_message(&mut self, role: ChatRole, text: &str) {
        self.rows.push(Row::Message(ChatMessage::new(role, text)));
    }

    /// Show or hide the typing row. Calling it twice with the same value is a no-op.
    pub fn set_typing(&mut self, typing: bool) {
        let existing = self.rows.iter().position(|row| *row == Row::Typing);
        match (typing, existing) {
            (true, None) => self.rows.push(Row::Typing),
            (false, Some(idx)) => {
                self.rows.remove(idx);
            }
            _ => {}
        }
    }

    pub fn is_typing(&self) -> bool {
        self.rows.contains(&Row::Typing)
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn messages(&self) -> impl Iterator<Item = &ChatMessage> {
        self.rows.iter().filter_map(|row| match row {
            Row::Message(msg) => Some(msg),
            Row::Typing => None,
        })
    }

    pub fn last_message(&self) -> Option<&ChatMessage> {
        self.messages().last()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
