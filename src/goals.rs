//! Goal tracking
//!
//! Every journal starts with three default goals. They can be retargeted
//! but never deleted. Built-in kinds measure their current value from the
//! trades; custom goals carry a value the user keeps up to date.

use crate::error::JournalError;
use crate::models::Trade;
use crate::stats::{self, PerformanceStats};
use crate::Result;
use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GoalKind {
    /// Net PnL of the current calendar month
    MonthlyPnl,
    /// Percent of winning trades, all time
    WinRate,
    /// Trades logged in the current calendar month
    TradesPerMonth,
    Custom,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub id: Uuid,
    pub kind: GoalKind,
    pub title: String,
    pub target: f64,
    /// Manually tracked value; only used by custom goals
    #[serde(default)]
    pub current: f64,
    pub unit: String,
    pub is_default: bool,
}

impl Goal {
    pub fn defaults() -> Vec<Goal> {
        let preset = |kind, title: &str, target, unit: &str| Goal {
            id: Uuid::new_v4(),
            kind,
            title: title.to_string(),
            target,
            current: 0.0,
            unit: unit.to_string(),
            is_default: true,
        };

        vec![
            preset(GoalKind::MonthlyPnl, "Monthly P&L Target", 5_000.0, "$"),
            preset(GoalKind::WinRate, "Win Rate Goal", 60.0, "%"),
            preset(GoalKind::TradesPerMonth, "Trades per Month", 50.0, "trades"),
        ]
    }

    /// Current value of the goal, withdrawals excluded
    pub fn measure(&self, trades: &[Trade], now: DateTime<Utc>) -> f64 {
        match self.kind {
            GoalKind::MonthlyPnl => PerformanceStats::compute(trades, now).monthly_pnl,
            GoalKind::WinRate => PerformanceStats::compute(trades, now).win_rate,
            GoalKind::TradesPerMonth => stats::trading_trades(trades)
                .filter(|t| {
                    t.date <= now && t.date.year() == now.year() && t.date.month() == now.month()
                })
                .count() as f64,
            GoalKind::Custom => self.current,
        }
    }
}

/// Percent of `target` reached, capped at 100; zero for a non-positive target
pub fn progress_percent(current: f64, target: f64) -> f64 {
    if target <= 0.0 {
        return 0.0;
    }
    (current / target * 100.0).min(100.0)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GoalProgress {
    pub goal: Goal,
    pub current: f64,
    pub progress: f64,
    pub completed: bool,
}

impl GoalProgress {
    pub fn compute(goal: &Goal, trades: &[Trade], now: DateTime<Utc>) -> Self {
        let current = goal.measure(trades, now);
        let progress = progress_percent(current, goal.target);
        Self {
            goal: goal.clone(),
            current,
            progress,
            completed: progress >= 100.0,
        }
    }
}

/// Fields for a new custom goal
#[derive(Debug, Clone, Deserialize)]
pub struct NewGoal {
    pub title: String,
    pub target: f64,
    #[serde(default)]
    pub current: f64,
    #[serde(default)]
    pub unit: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GoalUpdate {
    pub title: Option<String>,
    pub target: Option<f64>,
    pub current: Option<f64>,
}

fn validate(title: &str, target: f64, current: f64) -> Result<()> {
    if title.trim().is_empty() {
        return Err(JournalError::InvalidGoal("title must not be empty".into()));
    }
    if !target.is_finite() || !current.is_finite() {
        return Err(JournalError::InvalidGoal("target and current must be finite".into()));
    }
    Ok(())
}

/// Goal list shared by the HTTP handlers, seeded with the defaults
#[derive(Clone)]
pub struct GoalBook {
    goals: Arc<RwLock<Vec<Goal>>>,
}

impl Default for GoalBook {
    fn default() -> Self {
        Self::new()
    }
}

impl GoalBook {
    pub fn new() -> Self {
        Self {
            goals: Arc::new(RwLock::new(Goal::defaults())),
        }
    }

    pub async fn list(&self) -> Vec<Goal> {
        self.goals.read().await.clone()
    }

    pub async fn progress(&self, trades: &[Trade], now: DateTime<Utc>) -> Vec<GoalProgress> {
        self.goals
            .read()
            .await
            .iter()
            .map(|goal| GoalProgress::compute(goal, trades, now))
            .collect()
    }

    pub async fn add(&self, new_goal: NewGoal) -> Result<Goal> {
        validate(&new_goal.title, new_goal.target, new_goal.current)?;

        let goal = Goal {
            id: Uuid::new_v4(),
            kind: GoalKind::Custom,
            title: new_goal.title.trim().to_string(),
            target: new_goal.target,
            current: new_goal.current,
            unit: new_goal.unit,
            is_default: false,
        };
        self.goals.write().await.push(goal.clone());
        info!(goal_id = %goal.id, title = %goal.title, "Goal added");
        Ok(goal)
    }

    pub async fn update(&self, id: Uuid, changes: GoalUpdate) -> Result<Goal> {
        let mut goals = self.goals.write().await;
        let goal = goals
            .iter_mut()
            .find(|g| g.id == id)
            .ok_or_else(|| JournalError::GoalNotFound(id.to_string()))?;

        let mut updated = goal.clone();
        if let Some(title) = changes.title {
            updated.title = title.trim().to_string();
        }
        if let Some(target) = changes.target {
            updated.target = target;
        }
        if let Some(current) = changes.current {
            updated.current = current;
        }
        validate(&updated.title, updated.target, updated.current)?;

        *goal = updated.clone();
        Ok(updated)
    }

    /// Remove a custom goal; default goals are refused
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        let mut goals = self.goals.write().await;
        let index = goals
            .iter()
            .position(|g| g.id == id)
            .ok_or_else(|| JournalError::GoalNotFound(id.to_string()))?;

        if goals[index].is_default {
            return Err(JournalError::InvalidGoal(format!(
                "default goal '{}' cannot be deleted",
                goals[index].title
            )));
        }

        let removed = goals.remove(index);
        info!(goal_id = %removed.id, title = %removed.title, "Goal removed");
        Ok(())
    }
}
