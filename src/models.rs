//! Core data models for the trading journal

use crate::error::JournalError;
use crate::Result;
use chrono::{DateTime, Utc};
use num_format::{Locale, ToFormattedString};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Symbol used for cash withdrawals recorded in the journal
pub const WITHDRAWAL_SYMBOL: &str = "WITHDRAWAL";

//
// ================= Enums =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TradeStatus {
    Win,
    Loss,
    Withdrawal,
}

impl TradeStatus {
    /// Status of a regular trade derived from the sign of its PnL
    pub fn from_pnl(pnl: f64) -> Self {
        if pnl >= 0.0 {
            TradeStatus::Win
        } else {
            TradeStatus::Loss
        }
    }
}

//
// ================= Trade =================
//

/// A journal entry as owned by the trade store
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Trade {
    pub id: Uuid,
    pub symbol: String,
    pub status: TradeStatus,
    pub pnl: f64,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub strategy: Option<String>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub image_urls: Vec<String>,
    #[serde(default)]
    pub rr: Option<f64>,
    #[serde(default)]
    pub followed_plan: bool,
}

impl Trade {
    pub fn is_withdrawal(&self) -> bool {
        self.status == TradeStatus::Withdrawal
    }

    /// Apply a partial update in place, re-validating the result
    pub fn apply(&mut self, changes: &TradeUpdate) -> Result<()> {
        let mut updated = self.clone();

        if let Some(symbol) = &changes.symbol {
            updated.symbol = symbol.clone();
        }
        if let Some(pnl) = changes.pnl {
            updated.pnl = pnl;
        }
        if let Some(status) = changes.status {
            updated.status = status;
        }
        if let Some(date) = changes.date {
            updated.date = date;
        }
        if let Some(strategy) = &changes.strategy {
            updated.strategy = Some(strategy.clone());
        }
        if let Some(notes) = &changes.notes {
            updated.notes = notes.clone();
        }
        if let Some(rr) = changes.rr {
            updated.rr = Some(rr);
        }
        if let Some(followed_plan) = changes.followed_plan {
            updated.followed_plan = followed_plan;
        }

        validate_fields(&updated.symbol, updated.status, updated.pnl, updated.rr)?;
        *self = updated;
        Ok(())
    }
}

/// Fields needed to create a trade; the store assigns the identifier
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewTrade {
    pub symbol: String,
    pub status: TradeStatus,
    pub pnl: f64,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub strategy: Option<String>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub image_urls: Vec<String>,
    #[serde(default)]
    pub rr: Option<f64>,
    #[serde(default)]
    pub followed_plan: bool,
}

impl NewTrade {
    /// Build the record that represents a cash withdrawal of `amount`
    pub fn withdrawal(amount: f64, now: DateTime<Utc>) -> Result<Self> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(JournalError::InvalidTrade(format!(
                "Withdrawal amount must be a positive number, got {}",
                amount
            )));
        }

        Ok(Self {
            symbol: WITHDRAWAL_SYMBOL.to_string(),
            status: TradeStatus::Withdrawal,
            pnl: -amount,
            date: now,
            strategy: None,
            notes: format!("Withdrew {}", format_currency(amount)),
            image_urls: Vec::new(),
            rr: None,
            followed_plan: true,
        })
    }

    pub fn validate(&self) -> Result<()> {
        validate_fields(&self.symbol, self.status, self.pnl, self.rr)
    }

    pub fn into_trade(self, id: Uuid) -> Trade {
        Trade {
            id,
            symbol: self.symbol,
            status: self.status,
            pnl: self.pnl,
            date: self.date,
            strategy: self.strategy,
            notes: self.notes,
            image_urls: self.image_urls,
            rr: self.rr,
            followed_plan: self.followed_plan,
        }
    }
}

fn validate_fields(symbol: &str, status: TradeStatus, pnl: f64, rr: Option<f64>) -> Result<()> {
    if symbol.trim().is_empty() {
        return Err(JournalError::InvalidTrade("symbol is required".to_string()));
    }
    if !pnl.is_finite() {
        return Err(JournalError::InvalidTrade(format!("pnl must be finite, got {}", pnl)));
    }
    match status {
        TradeStatus::Win if pnl < 0.0 => {
            return Err(JournalError::InvalidTrade(format!(
                "a win cannot have negative pnl ({})",
                pnl
            )));
        }
        TradeStatus::Loss if pnl > 0.0 => {
            return Err(JournalError::InvalidTrade(format!(
                "a loss cannot have positive pnl ({})",
                pnl
            )));
        }
        _ => {}
    }
    if let Some(rr) = rr {
        if !rr.is_finite() || rr < 0.0 {
            return Err(JournalError::InvalidTrade(format!(
                "risk/reward must be a non-negative number, got {}",
                rr
            )));
        }
    }
    Ok(())
}

/// Partial set of trade fields for an update
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TradeUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TradeStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pnl: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rr: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub followed_plan: Option<bool>,
}

impl TradeUpdate {
    pub fn is_empty(&self) -> bool {
        *self == TradeUpdate::default()
    }
}

//
// ================= Assistant I/O =================
//

/// Mutation requested by the assistant; the caller executes it against the store
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum TradeAction {
    AddTrade(NewTrade),
    UpdateTrade { id: Uuid, changes: TradeUpdate },
    DeleteTrade { id: Uuid },
}

impl TradeAction {
    pub fn kind(&self) -> &'static str {
        match self {
            TradeAction::AddTrade(_) => "add_trade",
            TradeAction::UpdateTrade { .. } => "update_trade",
            TradeAction::DeleteTrade { .. } => "delete_trade",
        }
    }
}

/// Reply produced by a single conversation turn
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChatResponse {
    pub content: String,
    #[serde(default)]
    pub actions: Vec<TradeAction>,
}

impl ChatResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            actions: Vec::new(),
        }
    }

    pub fn with_action(content: impl Into<String>, action: TradeAction) -> Self {
        Self {
            content: content.into(),
            actions: vec![action],
        }
    }
}

impl fmt::Display for TradeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TradeStatus::Win => "win",
            TradeStatus::Loss => "loss",
            TradeStatus::Withdrawal => "withdrawal",
        };
        write!(f, "{}", s)
    }
}

/// Format an amount as US dollars, e.g. `-$1,250.50`
pub fn format_currency(amount: f64) -> String {
    let cents = (amount.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_formatted_string(&Locale::en);
    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
    format!("{}${}.{:02}", sign, whole, cents % 100)
}
