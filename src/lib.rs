//! Trading Journal Assistant
//!
//! A rule-based conversational assistant for a trading journal that:
//! - Extracts amounts, symbols, strategies and dates from free text
//! - Classifies each utterance into one intent through a fixed priority table
//! - Completes add-trade requests across several turns
//! - Answers searches, summaries, analyses and strategy comparisons
//! - Emits trade mutations as actions for the caller to execute
//! - Tracks journal goals against the recorded trades
//!
//! TURN:
//! TRANSCRIPT → EXTRACT → CLASSIFY → OVERRIDE? → HANDLE → UPDATE STATE → REPLY

pub mod api;
pub mod classifier;
pub mod config;
pub mod conversational;
pub mod dialogue;
pub mod entities;
pub mod error;
pub mod goals;
pub mod handlers;
pub mod lexicon;
pub mod memory;
pub mod models;
pub mod state;
pub mod stats;

pub use error::{JournalError, Result};

// Re-export common types
pub use classifier::{Intent, IntentClassifier};
pub use config::AssistantConfig;
pub use conversational::{ConversationSession, SessionStore};
pub use models::*;
