//! Conversation transcript
//!
//! Append-only log of what the user said and what the assistant answered.
//! Cleared only by an explicit session reset.

use crate::classifier::Intent;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role of a message sender
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

/// A single message in the transcript
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub message_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub role: MessageRole,
    pub content: String,
    /// Intent the turn resolved to (assistant messages only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent: Option<Intent>,
}

impl ConversationMessage {
    pub fn user(content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            message_id: Uuid::new_v4(),
            timestamp,
            role: MessageRole::User,
            content: content.into(),
            intent: None,
        }
    }

    pub fn assistant(content: impl Into<String>, intent: Intent, timestamp: DateTime<Utc>) -> Self {
        Self {
            message_id: Uuid::new_v4(),
            timestamp,
            role: MessageRole::Assistant,
            content: content.into(),
            intent: Some(intent),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationHistory {
    messages: Vec<ConversationMessage>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_message(&mut self, message: ConversationMessage) {
        self.messages.push(message);
    }

    /// Iterate over all messages, oldest first
    pub fn messages(&self) -> impl Iterator<Item = &ConversationMessage> {
        self.messages.iter()
    }

    /// Iterate over the N most recent messages, newest first
    pub fn recent_messages(&self, count: usize) -> impl Iterator<Item = &ConversationMessage> {
        self.messages.iter().rev().take(count)
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_keeps_order() {
        let now = Utc::now();
        let mut history = ConversationHistory::new();
        history.add_message(ConversationMessage::user("show my ES trades", now));
        history.add_message(ConversationMessage::assistant(
            "Found 3 trades.",
            Intent::SearchTrades,
            now,
        ));
        history.add_message(ConversationMessage::user("thanks", now));

        assert_eq!(history.message_count(), 3);
        let roles: Vec<MessageRole> = history.messages().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![MessageRole::User, MessageRole::Assistant, MessageRole::User]
        );

        let recent: Vec<&str> = history.recent_messages(2).map(|m| m.content.as_str()).collect();
        assert_eq!(recent, vec!["thanks", "Found 3 trades."]);
    }

    #[test]
    fn test_clear() {
        let now = Utc::now();
        let mut history = ConversationHistory::new();
        history.add_message(ConversationMessage::user("hello", now));
        assert!(!history.is_empty());

        history.clear();
        assert!(history.is_empty());
        assert_eq!(history.messages().count(), 0);
    }

    #[test]
    fn test_intent_serialized_only_for_assistant() {
        let now = Utc::now();
        let user = serde_json::to_value(ConversationMessage::user("hi", now)).unwrap();
        assert!(user.get("intent").is_none());
        assert_eq!(user["role"], "user");

        let reply = serde_json::to_value(ConversationMessage::assistant("Hi!", Intent::Greeting, now))
            .unwrap();
        assert_eq!(reply["intent"], "greeting");
    }
}
