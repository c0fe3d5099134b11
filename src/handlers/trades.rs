//! Handlers that produce trade mutations: add, update, delete

use super::{format_date, HandlerContext};
use crate::dialogue::ConversationContext;
use crate::models::{format_currency, ChatResponse, Trade, TradeAction, TradeStatus, TradeUpdate};
use crate::stats;
use crate::Result;
use tracing::debug;

/// Collect trade fields, ask for whatever is missing, emit the trade once complete
pub fn add_trade(
    ctx: &HandlerContext<'_>,
    conversation: &mut ConversationContext,
) -> Result<ChatResponse> {
    let mut pending = conversation.pending_trade.take().unwrap_or_default();

    pending.merge(ctx.entities);
    if pending.date.is_none() {
        pending.date = Some(ctx.now);
    }
    pending.append_note(ctx.utterance);

    let missing = pending.missing_fields();
    if !missing.is_empty() {
        let names: Vec<String> = missing.iter().map(|m| m.to_string()).collect();
        debug!(missing = ?names, "Pending trade incomplete");
        conversation.pending_trade = Some(pending);

        return Ok(ChatResponse::text(format!(
            "Got it. I just need a few more details to log this trade: {}. Can you provide them?",
            names.join(", ")
        )));
    }

    let trade = pending.finalize(ctx.now)?;
    conversation.last_added_trade = Some(trade.clone());

    let status = match trade.status {
        TradeStatus::Win => "Win",
        TradeStatus::Loss => "Loss",
        TradeStatus::Withdrawal => "Withdrawal",
    };
    let content = format!(
        "Great, I've added a new trade:\n- **Symbol:** {}\n- **Status:** {}\n- **PnL:** {}\n- **Strategy:** {}",
        trade.symbol,
        status,
        format_currency(trade.pnl),
        trade.strategy.as_deref().unwrap_or("-"),
    );

    Ok(ChatResponse::with_action(content, TradeAction::AddTrade(trade)))
}

/// Trade a mutation refers to.
///
/// A mentioned symbol picks the newest trade on that symbol; otherwise the
/// trade added earlier in this conversation, if it can still be found;
/// otherwise the newest trade overall.
pub fn select_target<'a>(
    ctx: &HandlerContext<'a>,
    conversation: &ConversationContext,
) -> Option<&'a Trade> {
    let newest_first = stats::most_recent_first(ctx.trades);
    let fallback = newest_first.first().copied();

    if let Some(symbol) = &ctx.entities.symbol {
        return newest_first
            .iter()
            .find(|t| t.symbol.eq_ignore_ascii_case(symbol))
            .copied()
            .or(fallback);
    }

    if let Some(last) = &conversation.last_added_trade {
        let found = newest_first.iter().find(|t| {
            t.symbol == last.symbol && t.date.timestamp_millis() == last.date.timestamp_millis()
        });
        if let Some(found) = found {
            return Some(*found);
        }
    }

    fallback
}

pub fn delete_trade(
    ctx: &HandlerContext<'_>,
    conversation: &mut ConversationContext,
) -> Result<ChatResponse> {
    let Some(target) = select_target(ctx, conversation) else {
        return Ok(ChatResponse::text("There are no trades to delete."));
    };

    let forgets_last_added = conversation.last_added_trade.as_ref().is_some_and(|last| {
        last.symbol == target.symbol
            && last.date.timestamp_millis() == target.date.timestamp_millis()
    });
    if forgets_last_added {
        conversation.last_added_trade = None;
    }

    let content = format!(
        "I deleted the **{}** trade from {} with a P&L of **{}**.",
        target.symbol,
        format_date(target.date),
        format_currency(target.pnl)
    );

    Ok(ChatResponse::with_action(content, TradeAction::DeleteTrade { id: target.id }))
}

/// Change PnL, R:R, strategy or date of an existing trade
pub fn update_trade(
    ctx: &HandlerContext<'_>,
    conversation: &mut ConversationContext,
) -> Result<ChatResponse> {
    let Some(target) = select_target(ctx, conversation) else {
        return Ok(ChatResponse::text("There are no trades to update."));
    };

    let mut changes = TradeUpdate::default();
    let mut described = Vec::new();

    if let Some(pnl) = ctx.entities.pnl {
        changes.pnl = Some(pnl);
        if !target.is_withdrawal() {
            changes.status = Some(TradeStatus::from_pnl(pnl));
        }
        described.push(format!("PnL → {}", format_currency(pnl)));
    }
    if let Some(rr) = ctx.entities.rr {
        changes.rr = Some(rr);
        described.push(format!("R:R → {:.2}", rr));
    }
    if let Some(strategy) = ctx.entities.strategies.first() {
        changes.strategy = Some(strategy.clone());
        described.push(format!("strategy → {}", strategy));
    }
    if let Some(date) = ctx.entities.date {
        changes.date = Some(date);
        described.push(format!("date → {}", format_date(date)));
    }

    if changes.is_empty() {
        return Ok(ChatResponse::text(format!(
            "What should I change on the **{}** trade from {}? Tell me the new PnL, R:R, strategy or date.",
            target.symbol,
            format_date(target.date)
        )));
    }

    let content = format!(
        "Updated the **{}** trade from {}: {}.",
        target.symbol,
        format_date(target.date),
        described.join(", ")
    );

    Ok(ChatResponse::with_action(
        content,
        TradeAction::UpdateTrade {
            id: target.id,
            changes,
        },
    ))
}
