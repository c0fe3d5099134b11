//! Read-only handlers: search, summary, analysis, strategy comparison

use super::{plural, trade_line, HandlerContext};
use crate::models::{format_currency, ChatResponse, Trade};
use crate::stats::{self, StrategyStats};
use crate::Result;

/// Filter trades by symbol, strategy, PnL sign and calendar day (all must hold)
pub fn filter_trades<'a>(ctx: &HandlerContext<'a>) -> Vec<&'a Trade> {
    let entities = ctx.entities;

    stats::most_recent_first(ctx.trades)
        .into_iter()
        .filter(|t| {
            entities
                .symbol
                .as_ref()
                .map_or(true, |symbol| t.symbol.eq_ignore_ascii_case(symbol))
        })
        .filter(|t| {
            if entities.strategies.is_empty() {
                return true;
            }
            let strategy = t.strategy.as_deref().unwrap_or_default().to_lowercase();
            entities.strategies.iter().any(|s| strategy.contains(s.as_str()))
        })
        .filter(|t| match entities.pnl {
            // Only the sign of the requested amount matters
            Some(requested) if requested >= 0.0 => t.pnl > 0.0,
            Some(_) => t.pnl < 0.0,
            None => true,
        })
        .filter(|t| {
            entities
                .date
                .map_or(true, |day| t.date.date_naive() == day.date_naive())
        })
        .collect()
}

pub fn search_trades(ctx: &HandlerContext<'_>) -> Result<ChatResponse> {
    if ctx.trades.is_empty() {
        return Ok(ChatResponse::text("There are no trades recorded yet."));
    }

    let matches = filter_trades(ctx);
    if matches.is_empty() {
        return Ok(ChatResponse::text("I couldn't find any trades matching your search."));
    }

    let shown = matches.len().min(ctx.config.search_result_limit);
    let lines: Vec<String> = matches.iter().take(shown).map(|t| trade_line(t)).collect();

    Ok(ChatResponse::text(format!(
        "Found {}. Here are the {} most recent:\n{}",
        plural(matches.len(), "trade", "trades"),
        shown,
        lines.join("\n")
    )))
}

pub fn get_summary(ctx: &HandlerContext<'_>) -> Result<ChatResponse> {
    let trades: Vec<&Trade> = if ctx.config.summary_excludes_withdrawals {
        stats::trading_trades(ctx.trades).collect()
    } else {
        ctx.trades.iter().collect()
    };

    if trades.is_empty() {
        return Ok(ChatResponse::text(
            "There isn't enough data for a summary yet. Try adding a few trades first.",
        ));
    }

    let total = trades.len();
    let winners = trades.iter().filter(|t| t.pnl > 0.0).count();
    let win_rate = winners as f64 / total as f64 * 100.0;
    let total_pnl = stats::total_pnl(trades.iter().copied());
    let avg_rr = stats::average_rr(trades.iter().copied())
        .map(|rr| format!("{:.2}R", rr))
        .unwrap_or_else(|| "N/A".to_string());

    Ok(ChatResponse::text(format!(
        "Sure, here's your performance summary:\n- **Total trades:** {}\n- **Win rate:** {:.1}%\n- **Total P&L:** {}\n- **Average R:R:** {}",
        total,
        win_rate,
        format_currency(total_pnl),
        avg_rr
    )))
}

pub fn get_analysis(ctx: &HandlerContext<'_>) -> Result<ChatResponse> {
    let trading: Vec<&Trade> = stats::trading_trades(ctx.trades).collect();
    if trading.len() < ctx.config.analysis_min_trades {
        return Ok(ChatResponse::text(format!(
            "I need at least {} trades to run a meaningful analysis. Keep logging and I'll be back with insights soon!",
            ctx.config.analysis_min_trades
        )));
    }

    let mut strengths = Vec::new();
    let mut weaknesses = Vec::new();

    let breakdown = stats::strategy_breakdown(ctx.trades);
    if let Some(best) = breakdown.first().filter(|s| s.pnl > 0.0) {
        strengths.push(format!(
            "**Your strongest strategy is '{}',** which produced {}.",
            best.strategy,
            format_currency(best.pnl)
        ));
    }
    if let Some(worst) = breakdown.last().filter(|s| s.pnl < 0.0) {
        weaknesses.push(format!(
            "**'{}' is your weak spot,** with a total loss of {}.",
            worst.strategy,
            format_currency(worst.pnl)
        ));
    }

    let wins: Vec<f64> = trading.iter().map(|t| t.pnl).filter(|p| *p > 0.0).collect();
    let losses: Vec<f64> = trading.iter().map(|t| t.pnl).filter(|p| *p < 0.0).collect();
    let avg_win = average(&wins);
    let avg_loss = average(&losses);

    if avg_win > 0.0 {
        strengths.push(format!(
            "**Your average winning trade is {},** which shows you let winners grow.",
            format_currency(avg_win)
        ));
    }
    if avg_loss != 0.0 && avg_loss.abs() > avg_win {
        weaknesses.push(format!(
            "**Your average loss ({}) is larger than your average win,** which suggests you may be letting losses run.",
            format_currency(avg_loss.abs())
        ));
    }

    if strengths.is_empty() {
        strengths.push(
            "I couldn't spot a standout strength yet, but more data will bring it out!".to_string(),
        );
    }
    if weaknesses.is_empty() {
        weaknesses.push("Well done! I didn't find any significant weaknesses right now.".to_string());
    }

    Ok(ChatResponse::text(format!(
        "Alright, I analyzed your performance. Here's what I found:\n### 👍 Your strengths\n{}\n\n### 🧐 Room for improvement\n{}\n\n### 🚀 Recommendation\nKeep focusing on the strategies that work for you, and consider cutting risk on the losing ones or studying them again.",
        bullets(&strengths),
        bullets(&weaknesses)
    )))
}

/// Side-by-side strategy results, best first
pub fn compare_strategies(ctx: &HandlerContext<'_>) -> Result<ChatResponse> {
    let mut breakdown = stats::strategy_breakdown(ctx.trades);

    let requested = &ctx.entities.strategies;
    if requested.len() >= 2 {
        breakdown.retain(|s| {
            let name = s.strategy.to_lowercase();
            requested.iter().any(|r| name.contains(r.as_str()))
        });
    }

    if breakdown.is_empty() {
        return Ok(ChatResponse::text(
            "I need trades tagged with a strategy before I can compare anything.",
        ));
    }

    let lines: Vec<String> = breakdown.iter().map(strategy_line).collect();
    let mut content = format!("Here's how your strategies compare:\n{}", lines.join("\n"));

    if breakdown.len() > 1 {
        let best = &breakdown[0];
        content.push_str(&format!(
            "\n\n**{}** is leading with {}.",
            best.strategy,
            format_currency(best.pnl)
        ));
    }

    Ok(ChatResponse::text(content))
}

fn strategy_line(s: &StrategyStats) -> String {
    format!(
        "- **{}**: {} over {} (win rate {:.1}%)",
        s.strategy,
        format_currency(s.pnl),
        plural(s.count, "trade", "trades"),
        s.win_rate()
    )
}

fn average(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn bullets(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("- {}", item))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AssistantConfig;
    use crate::entities::Entities;
    use crate::models::TradeStatus;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use uuid::Uuid;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, 14, 30, 0).unwrap()
    }

    fn trade(symbol: &str, pnl: f64, strategy: &str, days_ago: i64) -> Trade {
        Trade {
            id: Uuid::new_v4(),
            symbol: symbol.to_string(),
            status: TradeStatus::from_pnl(pnl),
            pnl,
            date: now() - Duration::days(days_ago),
            strategy: Some(strategy.to_string()),
            notes: String::new(),
            image_urls: vec![],
            rr: None,
            followed_plan: true,
        }
    }

    fn withdrawal(amount: f64, days_ago: i64) -> Trade {
        let mut t = trade("WITHDRAWAL", -amount, "", days_ago);
        t.status = TradeStatus::Withdrawal;
        t.strategy = None;
        t
    }

    fn ctx<'a>(entities: &'a Entities, trades: &'a [Trade], config: &'a AssistantConfig) -> HandlerContext<'a> {
        HandlerContext {
            entities,
            utterance: "",
            trades,
            now: now(),
            config,
        }
    }

    fn journal() -> Vec<Trade> {
        vec![
            trade("ES", 120.0, "smt", 4),
            trade("NQ", -80.0, "amd", 3),
            trade("ES", -40.0, "turtle soup", 2),
            trade("NQ", 300.0, "smt", 1),
            trade("ES", 60.0, "ifvg", 0),
        ]
    }

    #[test]
    fn test_search_by_symbol_newest_first() {
        let config = AssistantConfig::default();
        let trades = journal();
        let entities = Entities {
            symbol: Some("ES".to_string()),
            ..Default::default()
        };

        let context = ctx(&entities, &trades, &config);
        let found = filter_trades(&context);
        let ids: Vec<Uuid> = found.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![trades[4].id, trades[2].id, trades[0].id]);

        let reply = search_trades(&context).unwrap();
        assert!(reply.content.starts_with("Found 3 trades."));
        assert!(reply.actions.is_empty());
    }

    #[test]
    fn test_search_filters_compose() {
        let config = AssistantConfig::default();
        let trades = journal();

        let losers_on_es = Entities {
            symbol: Some("es".to_string()),
            pnl: Some(-1.0),
            ..Default::default()
        };
        let context = ctx(&losers_on_es, &trades, &config);
        let found = filter_trades(&context);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, trades[2].id);

        let smt_yesterday = Entities {
            strategies: vec!["smt".to_string()],
            date: Some(now() - Duration::days(1)),
            ..Default::default()
        };
        let context = ctx(&smt_yesterday, &trades, &config);
        let found = filter_trades(&context);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, trades[3].id);

        // Magnitude is ignored, only the sign
        let winners = Entities {
            pnl: Some(5_000.0),
            ..Default::default()
        };
        assert_eq!(filter_trades(&ctx(&winners, &trades, &config)).len(), 3);
    }

    #[test]
    fn test_search_by_spelled_out_date() {
        let config = AssistantConfig::default();
        let trades = vec![trade("NQ", 90.0, "smt", 12), trade("ES", 40.0, "amd", 11)];
        let entities = crate::entities::extract_entities("show me trades from march 3rd", now());

        let context = ctx(&entities, &trades, &config);
        let found = filter_trades(&context);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, trades[0].id);
        assert!(search_trades(&context).unwrap().content.starts_with("Found 1 trade."));
    }

    #[test]
    fn test_search_limits_listing() {
        let config = AssistantConfig {
            search_result_limit: 2,
            ..Default::default()
        };
        let trades = journal();
        let none = Entities::default();
        let reply = search_trades(&ctx(&none, &trades, &config)).unwrap();
        assert!(reply.content.starts_with("Found 5 trades. Here are the 2 most recent:"));
        assert_eq!(reply.content.lines().filter(|l| l.starts_with("- ")).count(), 2);
    }

    #[test]
    fn test_search_without_trades_or_matches() {
        let config = AssistantConfig::default();
        let none = Entities::default();
        let reply = search_trades(&ctx(&none, &[], &config)).unwrap();
        assert_eq!(reply.content, "There are no trades recorded yet.");

        let trades = journal();
        let btc = Entities {
            symbol: Some("BTC".to_string()),
            ..Default::default()
        };
        let reply = search_trades(&ctx(&btc, &trades, &config)).unwrap();
        assert_eq!(reply.content, "I couldn't find any trades matching your search.");
    }

    #[test]
    fn test_summary_withdrawal_switch() {
        let mut trades = journal();
        trades[0].rr = Some(2.0);
        trades[3].rr = Some(3.0);
        trades.push(withdrawal(500.0, 0));
        let none = Entities::default();

        let including = AssistantConfig::default();
        let reply = get_summary(&ctx(&none, &trades, &including)).unwrap();
        assert!(reply.content.contains("**Total trades:** 6"));
        assert!(reply.content.contains("**Win rate:** 50.0%"));
        assert!(reply.content.contains("**Total P&L:** -$140.00"));
        assert!(reply.content.contains("**Average R:R:** 2.50R"));

        let excluding = AssistantConfig {
            summary_excludes_withdrawals: true,
            ..Default::default()
        };
        let reply = get_summary(&ctx(&none, &trades, &excluding)).unwrap();
        assert!(reply.content.contains("**Total trades:** 5"));
        assert!(reply.content.contains("**Win rate:** 60.0%"));
        assert!(reply.content.contains("**Total P&L:** $360.00"));
    }

    #[test]
    fn test_analysis_needs_enough_trades() {
        let config = AssistantConfig::default();
        let trades: Vec<Trade> = journal().into_iter().take(4).collect();
        let none = Entities::default();
        let reply = get_analysis(&ctx(&none, &trades, &config)).unwrap();
        assert!(reply.content.starts_with("I need at least 5 trades"));
        assert!(!reply.content.contains("strengths"));
        assert!(reply.actions.is_empty());
    }

    #[test]
    fn test_analysis_reports_strengths_and_weaknesses() {
        let config = AssistantConfig::default();
        let trades = vec![
            trade("ES", 100.0, "smt", 5),
            trade("ES", 100.0, "smt", 4),
            trade("NQ", -400.0, "amd", 3),
            trade("NQ", -300.0, "amd", 2),
            trade("ES", 50.0, "ifvg", 1),
        ];
        let none = Entities::default();
        let reply = get_analysis(&ctx(&none, &trades, &config)).unwrap();

        assert!(reply.content.contains("strongest strategy is 'smt'"));
        assert!(reply.content.contains("'amd' is your weak spot"));
        assert!(reply.content.contains("-$700.00"));
        // avg win 83.33 vs avg loss 350
        assert!(reply.content.contains("letting losses run"));
    }

    #[test]
    fn test_analysis_fallback_text() {
        let config = AssistantConfig::default();
        let trades: Vec<Trade> = (0..5).map(|d| trade("ES", -10.0, "smt", d)).collect();
        let none = Entities::default();
        let reply = get_analysis(&ctx(&none, &trades, &config)).unwrap();
        assert!(reply.content.contains("couldn't spot a standout strength"));
        assert!(reply.content.contains("letting losses run"));
    }

    #[test]
    fn test_compare_strategies() {
        let config = AssistantConfig::default();
        let trades = journal();

        let none = Entities::default();
        let reply = compare_strategies(&ctx(&none, &trades, &config)).unwrap();
        assert!(reply.content.contains("- **smt**: $420.00 over 2 trades (win rate 100.0%)"));
        assert!(reply.content.contains("**smt** is leading"));

        let pair = Entities {
            strategies: vec!["amd".to_string(), "ifvg".to_string()],
            ..Default::default()
        };
        let reply = compare_strategies(&ctx(&pair, &trades, &config)).unwrap();
        assert!(!reply.content.contains("**smt**"));
        assert!(reply.content.contains("**ifvg** is leading"));

        let reply = compare_strategies(&ctx(&none, &[], &config)).unwrap();
        assert!(reply.content.starts_with("I need trades tagged"));
    }
}
