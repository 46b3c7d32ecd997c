//! Conversation buffer — short-term context for the text-generation backend.
//!
//! A bounded FIFO of the last few exchanged turns. One buffer serves the
//! whole process rather than one per owner; that matches the reference scale
//! (one chat surface, modest traffic) and is a documented simplification,
//! not an invariant.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Default capacity: 10 turns, i.e. 5 user/assistant exchanges.
pub const BUFFER_CAPACITY: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    User,
    Assistant,
}

impl TurnRole {
    fn label(self) -> &'static str {
        match self {
            TurnRole::User => "User",
            TurnRole::Assistant => "Assistant",
        }
    }
}

/// One exchanged message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: TurnRole,
    pub text: String,
}

/// Bounded rolling log of recent turns, oldest first.
#[derive(Debug, Clone)]
pub struct ConversationBuffer {
    turns: VecDeque<ConversationTurn>,
    capacity: usize,
}

impl ConversationBuffer {
    pub fn new() -> Self {
        Self::with_capacity(BUFFER_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            turns: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a turn, evicting the oldest once over capacity.
    pub fn append(&mut self, role: TurnRole, text: &str) {
        self.turns.push_back(ConversationTurn {
            role,
            text: text.to_string(),
        });
        while self.turns.len() > self.capacity {
            self.turns.pop_front();
        }
    }

    /// The last `n` turns in conversation order (oldest first).
    pub fn recent(&self, n: usize) -> Vec<&ConversationTurn> {
        let skip = self.turns.len().saturating_sub(n);
        self.turns.iter().skip(skip).collect()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Render the buffer as a prompt prefix for the backend. Empty buffer
    /// renders to an empty string.
    pub fn context_prompt(&self) -> String {
        if self.turns.is_empty() {
            return String::new();
        }
        let mut prompt = String::from("Previous conversation:\n");
        for turn in &self.turns {
            prompt.push_str(turn.role.label());
            prompt.push_str(": ");
            prompt.push_str(&turn.text);
            prompt.push('\n');
        }
        prompt
    }
}

impl Default for ConversationBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_and_recent_preserve_order() {
        let mut buffer = ConversationBuffer::new();
        buffer.append(TurnRole::User, "hola");
        buffer.append(TurnRole::Assistant, "¿en qué te ayudo?");

        let recent = buffer.recent(10);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].text, "hola");
        assert_eq!(recent[1].text, "¿en qué te ayudo?");
    }

    #[test]
    fn recent_limits_to_n_latest() {
        let mut buffer = ConversationBuffer::new();
        for i in 0..5 {
            buffer.append(TurnRole::User, &format!("msg {i}"));
        }
        let recent = buffer.recent(2);
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].text, "msg 3");
        assert_eq!(recent[1].text, "msg 4");
    }

    #[test]
    fn oldest_turn_evicted_at_capacity() {
        let mut buffer = ConversationBuffer::with_capacity(3);
        for i in 0..5 {
            buffer.append(TurnRole::User, &format!("msg {i}"));
        }
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.recent(3)[0].text, "msg 2");
    }

    #[test]
    fn context_prompt_empty_when_no_turns() {
        let buffer = ConversationBuffer::new();
        assert!(buffer.context_prompt().is_empty());
    }

    #[test]
    fn context_prompt_labels_roles() {
        let mut buffer = ConversationBuffer::new();
        buffer.append(TurnRole::User, "hola");
        buffer.append(TurnRole::Assistant, "buenas");

        let prompt = buffer.context_prompt();
        assert!(prompt.starts_with("Previous conversation:\n"));
        assert!(prompt.contains("User: hola\n"));
        assert!(prompt.contains("Assistant: buenas\n"));
    }
}
