//! Trade persistence layer
//!
//! The assistant never writes trades itself: it returns actions, and the
//! caller runs them against a [`TradeStore`] with [`apply_actions`].
//! Currently in-memory; the trait is the seam for a database backend.

use crate::error::JournalError;
use crate::models::{NewTrade, Trade, TradeAction, TradeUpdate};
use crate::Result;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

/// Trait for trade persistence
#[async_trait::async_trait]
pub trait TradeStore: Send + Sync {
    /// All trades, newest first
    async fn list(&self) -> Result<Vec<Trade>>;
    async fn get(&self, id: Uuid) -> Result<Option<Trade>>;
    async fn create(&self, trade: NewTrade) -> Result<Trade>;
    async fn update(&self, id: Uuid, changes: TradeUpdate) -> Result<Trade>;
    async fn delete(&self, id: Uuid) -> Result<()>;
}

/// In-memory trade store for development and tests
pub struct InMemoryTradeStore {
    trades: Arc<RwLock<HashMap<Uuid, Trade>>>,
}

impl InMemoryTradeStore {
    pub fn new() -> Self {
        Self {
            trades: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Store pre-built trades, keeping their ids
    pub async fn seed(&self, trades: impl IntoIterator<Item = Trade>) {
        let mut stored = self.trades.write().await;
        for trade in trades {
            stored.insert(trade.id, trade);
        }
    }
}

impl Default for InMemoryTradeStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl TradeStore for InMemoryTradeStore {
    async fn list(&self) -> Result<Vec<Trade>> {
        let trades = self.trades.read().await;
        let mut all: Vec<Trade> = trades.values().cloned().collect();
        all.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(all)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Trade>> {
        Ok(self.trades.read().await.get(&id).cloned())
    }

    async fn create(&self, trade: NewTrade) -> Result<Trade> {
        trade.validate()?;

        let trade = trade.into_trade(Uuid::new_v4());
        self.trades.write().await.insert(trade.id, trade.clone());
        Ok(trade)
    }

    async fn update(&self, id: Uuid, changes: TradeUpdate) -> Result<Trade> {
        let mut trades = self.trades.write().await;
        let trade = trades
            .get_mut(&id)
            .ok_or_else(|| JournalError::TradeNotFound(id.to_string()))?;

        trade.apply(&changes)?;
        Ok(trade.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        self.trades
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| JournalError::TradeNotFound(id.to_string()))
    }
}

/// Result of executing one assistant action
#[derive(Debug, Clone, Serialize)]
pub struct ActionOutcome {
    pub action: TradeAction,
    pub ok: bool,
    /// Stored trade after an add or update
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trade: Option<Trade>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Execute actions in order. A rejected action is reported, not propagated,
/// and does not stop the ones after it.
pub async fn apply_actions(store: &dyn TradeStore, actions: &[TradeAction]) -> Vec<ActionOutcome> {
    let mut outcomes = Vec::with_capacity(actions.len());

    for action in actions {
        let result = match action {
            TradeAction::AddTrade(trade) => store.create(trade.clone()).await.map(Some),
            TradeAction::UpdateTrade { id, changes } => {
                store.update(*id, changes.clone()).await.map(Some)
            }
            TradeAction::DeleteTrade { id } => store.delete(*id).await.map(|_| None),
        };

        let outcome = match result {
            Ok(trade) => {
                info!(action = action.kind(), "Trade action applied");
                ActionOutcome {
                    action: action.clone(),
                    ok: true,
                    trade,
                    error: None,
                }
            }
            Err(e) => {
                warn!(action = action.kind(), "Trade action rejected: {}", e);
                ActionOutcome {
                    action: action.clone(),
                    ok: false,
                    trade: None,
                    error: Some(e.to_string()),
                }
            }
        };
        outcomes.push(outcome);
    }

    outcomes
}
