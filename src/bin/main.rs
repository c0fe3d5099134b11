use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;
use trading_journal_assistant::{
    config::AssistantConfig,
    conversational::ConversationSession,
    goals::GoalBook,
    models::format_currency,
    state::{apply_actions, InMemoryTradeStore, TradeStore},
    stats::PerformanceStats,
};

const HELP: &str = "Commands: /trades, /stats, /goals, /reset, /quit";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let config = AssistantConfig::from_env()?;
    let store = InMemoryTradeStore::new();
    let goals = GoalBook::new();
    let mut session = ConversationSession::new(Arc::new(config));

    info!(session_id = %session.session_id(), "Trading journal chat starting");
    println!("📓 Trading journal assistant. {}", HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        match input {
            "/quit" | "/exit" => break,
            "/help" => println!("{}", HELP),
            "/reset" => {
                session.reset();
                println!("Conversation cleared.");
            }
            "/trades" => {
                let trades = store.list().await?;
                if trades.is_empty() {
                    println!("No trades yet.");
                }
                for t in &trades {
                    println!(
                        "  {}  {:<10} {:>12}  {}",
                        t.date.format("%d/%m/%Y"),
                        t.symbol,
                        format_currency(t.pnl),
                        t.strategy.as_deref().unwrap_or("-")
                    );
                }
            }
            "/stats" => {
                let trades = store.list().await?;
                let stats = PerformanceStats::compute(&trades, chrono::Utc::now());
                println!("{}", serde_json::to_string_pretty(&stats)?);
            }
            "/goals" => {
                let trades = store.list().await?;
                for p in goals.progress(&trades, chrono::Utc::now()).await {
                    println!(
                        "  {:<20} {:>10.1} / {:<10} {:>5.0}%{}",
                        p.goal.title,
                        p.current,
                        p.goal.target,
                        p.progress,
                        if p.completed { "  🎯" } else { "" }
                    );
                }
            }
            utterance => {
                let trades = store.list().await?;
                let response = session.submit_turn(utterance, &trades).await;
                println!("\n{}\n", response.content);

                for outcome in apply_actions(&store, &response.actions).await {
                    match outcome.error {
                        None => println!("  ✅ {}", outcome.action.kind()),
                        Some(error) => println!("  ❌ {}: {}", outcome.action.kind(), error),
                    }
                }
            }
        }
    }

    Ok(())
}
