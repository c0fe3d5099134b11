//! Canned replies for greetings, small talk and unrecognised input

use super::HandlerContext;
use crate::models::{format_currency, ChatResponse, Trade};
use crate::stats;

pub fn greeting() -> ChatResponse {
    ChatResponse::text(
        "Hi! I'm your personal trading coach. What are we doing today: logging a trade, reviewing performance, or something else?",
    )
}

/// Light reply that reports where the whole journal stands
pub fn casual_greeting(trades: &[Trade]) -> ChatResponse {
    let total = stats::total_pnl(trades);
    let status = if total >= 0.0 { "in the green" } else { "in the red" };

    ChatResponse::text(format!(
        "All good! We're sitting at a total PnL of {}, so you could say we're {}. Ready to keep taking on the market?",
        format_currency(total),
        status
    ))
}

pub fn how_are_you() -> ChatResponse {
    ChatResponse::text(
        "I'm just lines of code, but I feel great when I'm helping you succeed! Everything is ready to analyze your trades. What's on the agenda?",
    )
}

pub fn what_now(ctx: &HandlerContext<'_>) -> ChatResponse {
    let Some(latest) = stats::most_recent(ctx.trades) else {
        return ChatResponse::text(
            "The first step is to start journaling. Let's add your first trade and get going!",
        );
    };

    let days_since = (ctx.now - latest.date).num_seconds() as f64 / 86_400.0;
    if days_since > ctx.config.stale_after_days {
        return ChatResponse::text(
            "It's been a while since your last logged trade. Maybe it's time to update the journal? Or we could review your overall performance.",
        );
    }

    ChatResponse::text(
        "We can analyze your performance, set new goals, or log another trade. Which way do you want to go?",
    )
}

pub fn unknown() -> ChatResponse {
    ChatResponse::text(
        "I didn't quite get that. I can help you log trades, analyze your strengths and weaknesses, show summaries and more. Just tell me what you need.",
    )
}
