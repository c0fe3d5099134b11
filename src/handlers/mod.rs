//! Response handlers
//!
//! One handler per intent. Handlers read the trade collection but never
//! write to it: mutations are returned as [`TradeAction`]s for the caller
//! to execute.
//!
//! [`TradeAction`]: crate::models::TradeAction

pub mod queries;
pub mod small_talk;
pub mod trades;

use crate::classifier::Intent;
use crate::config::AssistantConfig;
use crate::dialogue::ConversationContext;
use crate::entities::Entities;
use crate::models::{format_currency, ChatResponse, Trade};
use crate::Result;
use chrono::{DateTime, Utc};

/// Everything a handler may look at for one turn
pub struct HandlerContext<'a> {
    pub entities: &'a Entities,
    pub utterance: &'a str,
    pub trades: &'a [Trade],
    pub now: DateTime<Utc>,
    pub config: &'a AssistantConfig,
}

/// Route a resolved intent to its handler
pub fn dispatch(
    intent: Intent,
    ctx: &HandlerContext<'_>,
    conversation: &mut ConversationContext,
) -> Result<ChatResponse> {
    match intent {
        Intent::AddTrade => trades::add_trade(ctx, conversation),
        Intent::UpdateTrade => trades::update_trade(ctx, conversation),
        Intent::DeleteTrade => trades::delete_trade(ctx, conversation),
        Intent::SearchTrades => queries::search_trades(ctx),
        Intent::GetSummary => queries::get_summary(ctx),
        Intent::GetAnalysis => queries::get_analysis(ctx),
        Intent::CompareStrategies => queries::compare_strategies(ctx),
        Intent::Greeting => Ok(small_talk::greeting()),
        Intent::CasualGreeting => Ok(small_talk::casual_greeting(ctx.trades)),
        Intent::HowAreYou => Ok(small_talk::how_are_you()),
        Intent::WhatNow => Ok(small_talk::what_now(ctx)),
        Intent::Unknown => Ok(small_talk::unknown()),
    }
}

pub(crate) fn format_date(date: DateTime<Utc>) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// Bullet line used when listing trades
pub(crate) fn trade_line(trade: &Trade) -> String {
    format!(
        "- **{}** ({}): {}",
        trade.symbol,
        format_date(trade.date),
        format_currency(trade.pnl)
    )
}

pub(crate) fn plural(count: usize, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("{} {}", count, singular)
    } else {
        format!("{} {}", count, plural)
    }
}
