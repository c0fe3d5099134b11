//! Dialogue state tracking
//!
//! A two-state machine that lets an add-trade request be completed over
//! several turns. `Idle` means no pending trade; `AwaitingTradeFields`
//! means a partially built trade is waiting for symbol, PnL or strategy.

use crate::classifier::Intent;
use crate::entities::Entities;
use crate::error::JournalError;
use crate::models::{NewTrade, TradeStatus};
use crate::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogueState {
    Idle,
    AwaitingTradeFields,
}

/// Fields a trade cannot be logged without
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingField {
    Symbol,
    Pnl,
    Strategy,
}

impl fmt::Display for MissingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MissingField::Symbol => "symbol",
            MissingField::Pnl => "PnL",
            MissingField::Strategy => "strategy",
        };
        write!(f, "{}", s)
    }
}

/// Trade being assembled across turns
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PendingTrade {
    pub symbol: Option<String>,
    pub pnl: Option<f64>,
    pub rr: Option<f64>,
    pub strategy: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

impl PendingTrade {
    /// Newly detected values overwrite what was collected so far, except
    /// the strategy: the first one named in the conversation is kept
    pub fn merge(&mut self, entities: &Entities) {
        if let Some(symbol) = &entities.symbol {
            self.symbol = Some(symbol.clone());
        }
        if let Some(pnl) = entities.pnl {
            self.pnl = Some(pnl);
        }
        if let Some(rr) = entities.rr {
            self.rr = Some(rr);
        }
        if self.strategy.is_none() {
            self.strategy = entities.strategies.first().cloned();
        }
        if let Some(date) = entities.date {
            self.date = Some(date);
        }
    }

    /// Keep the user's words as notes, never repeating the same text
    pub fn append_note(&mut self, utterance: &str) {
        match &mut self.notes {
            None => self.notes = Some(utterance.to_string()),
            Some(notes) if !notes.contains(utterance) => {
                notes.push('\n');
                notes.push_str(utterance);
            }
            Some(_) => {}
        }
    }

    pub fn missing_fields(&self) -> Vec<MissingField> {
        let mut missing = Vec::new();
        if self.symbol.is_none() {
            missing.push(MissingField::Symbol);
        }
        if self.pnl.is_none() {
            missing.push(MissingField::Pnl);
        }
        if self.strategy.is_none() {
            missing.push(MissingField::Strategy);
        }
        missing
    }

    /// Build the final trade record; status follows the PnL sign
    pub fn finalize(&self, now: DateTime<Utc>) -> Result<NewTrade> {
        let missing = self.missing_fields();
        if !missing.is_empty() {
            let names: Vec<String> = missing.iter().map(|m| m.to_string()).collect();
            return Err(JournalError::InvalidTrade(format!(
                "pending trade is missing {}",
                names.join(", ")
            )));
        }

        let pnl = self.pnl.unwrap_or_default();
        let trade = NewTrade {
            symbol: self.symbol.clone().unwrap_or_default(),
            status: TradeStatus::from_pnl(pnl),
            pnl,
            date: self.date.unwrap_or(now),
            strategy: self.strategy.clone(),
            notes: self.notes.clone().unwrap_or_default(),
            image_urls: Vec::new(),
            rr: self.rr,
            followed_plan: false,
        };

        trade.validate()?;
        Ok(trade)
    }
}

/// Per-conversation working memory
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationContext {
    pub last_intent: Option<Intent>,
    pub pending_trade: Option<PendingTrade>,
    pub last_added_trade: Option<NewTrade>,
}

impl ConversationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> DialogueState {
        if self.pending_trade.is_some() {
            DialogueState::AwaitingTradeFields
        } else {
            DialogueState::Idle
        }
    }

    /// While a trade is being assembled, every turn except an analysis
    /// request is treated as part of the add-trade exchange.
    pub fn resolve_intent(&self, classified: Intent) -> Intent {
        let awaiting = self.last_intent == Some(Intent::AddTrade) && self.pending_trade.is_some();
        if awaiting && classified != Intent::GetAnalysis {
            Intent::AddTrade
        } else {
            classified
        }
    }

    /// Record the turn's final intent; any other intent drops the pending trade
    pub fn finish_turn(&mut self, intent: Intent) {
        self.last_intent = Some(intent);
        if intent != Intent::AddTrade {
            self.pending_trade = None;
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 14, 30, 0).unwrap()
    }

    #[test]
    fn test_merge_overwrites_only_detected_fields() {
        let mut pending = PendingTrade {
            symbol: Some("NQ".to_string()),
            pnl: Some(100.0),
            ..Default::default()
        };

        pending.merge(&Entities {
            pnl: Some(-150.0),
            strategies: vec!["breakout".to_string()],
            ..Default::default()
        });

        assert_eq!(pending.symbol.as_deref(), Some("NQ"));
        assert_eq!(pending.pnl, Some(-150.0));
        assert_eq!(pending.strategy.as_deref(), Some("breakout"));

        pending.merge(&Entities {
            strategies: vec!["smt".to_string()],
            ..Default::default()
        });
        assert_eq!(pending.strategy.as_deref(), Some("breakout"));
    }

    #[test]
    fn test_append_note_skips_duplicates() {
        let mut pending = PendingTrade::default();
        pending.append_note("lost 150");
        pending.append_note("lost 150");
        pending.append_note("it was NQ");
        assert_eq!(pending.notes.as_deref(), Some("lost 150\nit was NQ"));
    }

    #[test]
    fn test_missing_fields_and_finalize() {
        let mut pending = PendingTrade {
            symbol: Some("ES".to_string()),
            ..Default::default()
        };
        assert_eq!(pending.missing_fields(), vec![MissingField::Pnl, MissingField::Strategy]);
        assert!(pending.finalize(now()).is_err());

        pending.pnl = Some(-75.0);
        pending.strategy = Some("amd".to_string());
        let trade = pending.finalize(now()).unwrap();
        assert_eq!(trade.status, TradeStatus::Loss);
        assert_eq!(trade.date, now());
    }

    #[test]
    fn test_pending_override_rule() {
        let mut ctx = ConversationContext::new();
        assert_eq!(ctx.resolve_intent(Intent::Greeting), Intent::Greeting);

        ctx.pending_trade = Some(PendingTrade::default());
        ctx.finish_turn(Intent::AddTrade);
        assert_eq!(ctx.state(), DialogueState::AwaitingTradeFields);
        assert_eq!(ctx.resolve_intent(Intent::Unknown), Intent::AddTrade);
        assert_eq!(ctx.resolve_intent(Intent::DeleteTrade), Intent::AddTrade);
        assert_eq!(ctx.resolve_intent(Intent::GetAnalysis), Intent::GetAnalysis);

        ctx.finish_turn(Intent::GetAnalysis);
        assert_eq!(ctx.state(), DialogueState::Idle);
        assert_eq!(ctx.last_intent, Some(Intent::GetAnalysis));
    }

    #[test]
    fn test_reset_is_idempotent() {
        let mut ctx = ConversationContext::new();
        ctx.pending_trade = Some(PendingTrade::default());
        ctx.last_intent = Some(Intent::AddTrade);
        ctx.reset();
        ctx.reset();
        assert_eq!(ctx.state(), DialogueState::Idle);
        assert!(ctx.last_intent.is_none());
        assert!(ctx.last_added_trade.is_none());
    }
}
