//! Conversation memory
//!
//! Per-session transcript of the chat. Dialogue state lives in
//! [`crate::dialogue`]; this module only records what was said.

pub mod store;

pub use store::{ConversationHistory, ConversationMessage, MessageRole};
