//! Trade statistics
//!
//! Aggregations shared by the assistant handlers and the HTTP surface:
//! dashboard totals, per-strategy breakdown, calendar days, withdrawal
//! eligibility and funded-account rule tracking. Withdrawals are cash
//! movements, not trades, and are left out of every win/loss figure.

use crate::models::Trade;
use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Days with at least this much profit count toward a withdrawal
pub const WITHDRAWAL_PROFIT_MINIMUM: f64 = 100.0;
/// Profitable days needed before a withdrawal is allowed
pub const WITHDRAWAL_TARGET_DAYS: usize = 5;

/// Trades that are not withdrawals
pub fn trading_trades(trades: &[Trade]) -> impl Iterator<Item = &Trade> {
    trades.iter().filter(|t| !t.is_withdrawal())
}

pub fn total_pnl<'a>(trades: impl IntoIterator<Item = &'a Trade>) -> f64 {
    trades.into_iter().map(|t| t.pnl).sum()
}

/// Mean of the positive risk/reward values, if any
pub fn average_rr<'a>(trades: impl IntoIterator<Item = &'a Trade>) -> Option<f64> {
    let values: Vec<f64> = trades
        .into_iter()
        .filter_map(|t| t.rr)
        .filter(|rr| *rr > 0.0)
        .collect();

    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Trades sorted newest first
pub fn most_recent_first(trades: &[Trade]) -> Vec<&Trade> {
    let mut sorted: Vec<&Trade> = trades.iter().collect();
    sorted.sort_by(|a, b| b.date.cmp(&a.date));
    sorted
}

pub fn most_recent(trades: &[Trade]) -> Option<&Trade> {
    trades.iter().max_by_key(|t| t.date)
}

//
// ================= Dashboard =================
//

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceStats {
    pub total_pnl: f64,
    pub win_rate: f64,
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub avg_win: f64,
    /// Magnitude of the average losing trade
    pub avg_loss: f64,
    pub best_trade: f64,
    pub worst_trade: f64,
    pub avg_rr: f64,
    pub weekly_pnl: f64,
    pub monthly_pnl: f64,
}

impl PerformanceStats {
    /// Dashboard figures; weeks start on Sunday
    pub fn compute(trades: &[Trade], now: DateTime<Utc>) -> Self {
        let trading: Vec<&Trade> = trading_trades(trades).collect();
        if trading.is_empty() {
            return Self::default();
        }

        let today = now.date_naive();
        let week_start = today - Duration::days(today.weekday().num_days_from_sunday() as i64);
        let month_start = today.with_day(1).unwrap_or(today);
        let since = |start: NaiveDate| {
            let start = Utc.from_utc_datetime(&start.and_hms_opt(0, 0, 0).unwrap_or_default());
            trading
                .iter()
                .filter(move |t| t.date >= start && t.date <= now)
                .map(|t| t.pnl)
                .sum::<f64>()
        };

        let wins: Vec<f64> = trading.iter().map(|t| t.pnl).filter(|p| *p > 0.0).collect();
        let losses: Vec<f64> = trading.iter().map(|t| t.pnl).filter(|p| *p < 0.0).collect();

        Self {
            total_pnl: total_pnl(trading.iter().copied()),
            win_rate: wins.len() as f64 / trading.len() as f64 * 100.0,
            total_trades: trading.len(),
            winning_trades: wins.len(),
            losing_trades: losses.len(),
            avg_win: mean(&wins),
            avg_loss: mean(&losses).abs(),
            best_trade: trading.iter().map(|t| t.pnl).fold(0.0, f64::max),
            worst_trade: trading.iter().map(|t| t.pnl).fold(0.0, f64::min),
            avg_rr: average_rr(trading.iter().copied()).unwrap_or(0.0),
            weekly_pnl: since(week_start),
            monthly_pnl: since(month_start),
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

//
// ================= Strategies =================
//

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyStats {
    pub strategy: String,
    pub pnl: f64,
    pub wins: usize,
    pub losses: usize,
    pub count: usize,
}

impl StrategyStats {
    pub fn win_rate(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.wins as f64 / self.count as f64 * 100.0
        }
    }
}

/// Per-strategy totals, highest PnL first. Untagged trades are skipped;
/// a trade that did not make money counts as a loss.
pub fn strategy_breakdown(trades: &[Trade]) -> Vec<StrategyStats> {
    let mut by_strategy: BTreeMap<&str, StrategyStats> = BTreeMap::new();

    for trade in trading_trades(trades) {
        let Some(strategy) = trade.strategy.as_deref().filter(|s| !s.is_empty()) else {
            continue;
        };

        let entry = by_strategy.entry(strategy).or_insert_with(|| StrategyStats {
            strategy: strategy.to_string(),
            pnl: 0.0,
            wins: 0,
            losses: 0,
            count: 0,
        });
        entry.pnl += trade.pnl;
        entry.count += 1;
        if trade.pnl > 0.0 {
            entry.wins += 1;
        } else {
            entry.losses += 1;
        }
    }

    let mut breakdown: Vec<StrategyStats> = by_strategy.into_values().collect();
    breakdown.sort_by(|a, b| b.pnl.total_cmp(&a.pnl));
    breakdown
}

//
// ================= Calendar =================
//

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DaySummary {
    pub pnl: f64,
    pub count: usize,
    pub has_withdrawal: bool,
}

/// Net PnL and trade count per calendar day (UTC)
pub fn daily_summaries(trades: &[Trade]) -> BTreeMap<NaiveDate, DaySummary> {
    let mut days: BTreeMap<NaiveDate, DaySummary> = BTreeMap::new();

    for trade in trades {
        let day = days.entry(trade.date.date_naive()).or_default();
        day.pnl += trade.pnl;
        if trade.is_withdrawal() {
            day.has_withdrawal = true;
        } else {
            day.count += 1;
        }
    }

    days
}

//
// ================= Withdrawal rule =================
//

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithdrawalProgress {
    pub last_withdrawal: Option<DateTime<Utc>>,
    /// Qualifying days since the last withdrawal, newest first
    pub profitable_days: Vec<NaiveDate>,
    pub target_days: usize,
    pub eligible: bool,
}

impl WithdrawalProgress {
    pub fn compute(trades: &[Trade]) -> Self {
        let last_withdrawal = trades
            .iter()
            .filter(|t| t.is_withdrawal())
            .map(|t| t.date)
            .max();

        let mut daily: BTreeMap<NaiveDate, f64> = BTreeMap::new();
        for trade in trading_trades(trades) {
            if last_withdrawal.is_some_and(|w| trade.date <= w) {
                continue;
            }
            *daily.entry(trade.date.date_naive()).or_default() += trade.pnl;
        }

        let profitable_days: Vec<NaiveDate> = daily
            .into_iter()
            .rev()
            .filter(|(_, pnl)| *pnl >= WITHDRAWAL_PROFIT_MINIMUM)
            .map(|(day, _)| day)
            .collect();

        Self {
            last_withdrawal,
            eligible: profitable_days.len() >= WITHDRAWAL_TARGET_DAYS,
            profitable_days,
            target_days: WITHDRAWAL_TARGET_DAYS,
        }
    }
}

/// Total withdrawn so far (positive)
pub fn total_withdrawn(trades: &[Trade]) -> f64 {
    -trades.iter().filter(|t| t.is_withdrawal()).map(|t| t.pnl).sum::<f64>()
}

//
// ================= Funded account =================
//

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FundedRules {
    pub starting_balance: f64,
    pub profit_target: f64,
    pub max_drawdown: f64,
}

impl FundedRules {
    /// Challenge presets by account size label ("50K", "100K", "150K")
    pub fn preset(account_size: &str) -> Option<Self> {
        let (starting_balance, profit_target, max_drawdown) =
            match account_size.trim().to_ascii_uppercase().as_str() {
                "50K" => (50_000.0, 3_000.0, 2_000.0),
                "100K" => (100_000.0, 6_000.0, 3_500.0),
                "150K" => (150_000.0, 9_000.0, 5_000.0),
                _ => return None,
            };
        Some(Self {
            starting_balance,
            profit_target,
            max_drawdown,
        })
    }
}

impl Default for FundedRules {
    fn default() -> Self {
        Self {
            starting_balance: 100_000.0,
            profit_target: 6_000.0,
            max_drawdown: 3_500.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundedProgress {
    pub rules: FundedRules,
    pub total_pnl: f64,
    pub balance: f64,
    pub high_water_mark: f64,
    pub trailing_drawdown: f64,
    /// Percent of the profit target reached, capped at 100
    pub target_progress: f64,
    pub passed: bool,
    pub violated: bool,
}

impl FundedProgress {
    /// Replays the account in date order to find the trailing high
    pub fn compute(trades: &[Trade], rules: FundedRules) -> Self {
        let mut chronological: Vec<&Trade> = trades.iter().collect();
        chronological.sort_by_key(|t| t.date);

        let mut balance = rules.starting_balance;
        let mut high_water_mark = rules.starting_balance;
        for trade in chronological {
            balance += trade.pnl;
            high_water_mark = high_water_mark.max(balance);
        }

        let total_pnl = balance - rules.starting_balance;
        let trailing_drawdown = high_water_mark - balance;
        let target_progress = if rules.profit_target > 0.0 {
            (total_pnl / rules.profit_target * 100.0).clamp(0.0, 100.0)
        } else {
            0.0
        };

        Self {
            rules,
            total_pnl,
            balance,
            high_water_mark,
            trailing_drawdown,
            target_progress,
            passed: total_pnl >= rules.profit_target,
            violated: trailing_drawdown > rules.max_drawdown,
        }
    }
}
