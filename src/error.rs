//! Error types for the trading journal assistant

use thiserror::Error;

/// Result type alias for journal operations
pub type Result<T> = std::result::Result<T, JournalError>;

#[derive(Error, Debug)]
pub enum JournalError {

    // =============================
    // Domain Errors
    // =============================

    #[error("Invalid trade: {0}")]
    InvalidTrade(String),

    #[error("Trade not found: {0}")]
    TradeNotFound(String),

    #[error("Invalid goal: {0}")]
    InvalidGoal(String),

    #[error("Goal not found: {0}")]
    GoalNotFound(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
