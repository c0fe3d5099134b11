//! REST API server for the trading journal assistant
//!
//! Exposes chat turns, trade CRUD and journal statistics over HTTP.
//! The server is the "caller" of the assistant: actions emitted by a
//! turn are executed against the trade store and their outcomes are
//! returned alongside the reply.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

use crate::config::AssistantConfig;
use crate::conversational::SessionStore;
use crate::error::JournalError;
use crate::goals::{GoalBook, GoalUpdate, NewGoal};
use crate::models::{NewTrade, TradeUpdate};
use crate::state::{apply_actions, TradeStore};
use crate::stats::{
    self, FundedProgress, FundedRules, PerformanceStats, StrategyStats, WithdrawalProgress,
};

/// =============================
/// Request Models
/// =============================

#[derive(Debug, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Either a single `message` or a transcript whose last user entry is the turn
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub session_id: Option<String>,
    pub message: Option<String>,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize)]
pub struct ResetRequest {
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WithdrawalRequest {
    pub amount: f64,
}

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    /// Funded account preset ("50K", "100K", "150K")
    pub account: Option<String>,
}

/// =============================
/// Response Wrapper
/// =============================

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse {
    pub success: bool,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub timestamp: String,
}

impl ApiResponse {
    pub fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: serde_json::to_value(data).ok(),
            error: None,
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

type ApiResult = (StatusCode, Json<ApiResponse>);

fn ok<T: Serialize>(status: StatusCode, data: T) -> ApiResult {
    (status, Json(ApiResponse::success(data)))
}

fn fail(error: JournalError) -> ApiResult {
    let status = match error {
        JournalError::InvalidTrade(_) | JournalError::InvalidGoal(_) => StatusCode::BAD_REQUEST,
        JournalError::TradeNotFound(_) | JournalError::GoalNotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(ApiResponse::error(error.to_string())))
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct ApiState {
    pub sessions: SessionStore,
    pub trades: Arc<dyn TradeStore>,
    pub goals: GoalBook,
    /// Held from the eligibility check until the payout is stored
    pub withdrawals: Arc<Mutex<()>>,
}

impl ApiState {
    pub fn new(config: AssistantConfig, trades: Arc<dyn TradeStore>) -> Self {
        Self {
            sessions: SessionStore::new(config),
            trades,
            goals: GoalBook::new(),
            withdrawals: Arc::new(Mutex::new(())),
        }
    }
}

/// =============================
/// Helpers
/// =============================

fn stable_uuid_from_string(input: &str) -> Uuid {
    use sha2::{Digest, Sha256};

    let hash = Sha256::digest(input.as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&hash[..16]);

    // Set UUID version (4) and variant (RFC4122) bits.
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;

    Uuid::from_bytes(bytes)
}

/// Client session ids may be arbitrary strings; they map to a stable UUID
fn parse_or_stable_uuid(value: Option<&str>, fallback_seed: &str) -> Uuid {
    match value {
        Some(v) if !v.trim().is_empty() => {
            Uuid::parse_str(v).unwrap_or_else(|_| stable_uuid_from_string(v))
        }
        _ => stable_uuid_from_string(fallback_seed),
    }
}

/// =============================
/// Health Endpoint
/// =============================

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339()
    }))
}

/// =============================
/// Chat Endpoints
/// =============================

async fn chat_handler(State(state): State<ApiState>, Json(req): Json<ChatRequest>) -> ApiResult {
    let utterance = req
        .message
        .filter(|m| !m.trim().is_empty())
        .or_else(|| {
            req.messages
                .iter()
                .rev()
                .find(|m| m.role == "user")
                .map(|m| m.content.clone())
        });

    let Some(utterance) = utterance else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error("No user message found".into())),
        );
    };

    let session_id = parse_or_stable_uuid(req.session_id.as_deref(), "anonymous-session");
    info!(%session_id, "chat turn received");

    let trades = match state.trades.list().await {
        Ok(trades) => trades,
        Err(e) => return fail(e),
    };

    let response = state.sessions.submit_turn(session_id, &utterance, &trades).await;
    let outcomes = apply_actions(state.trades.as_ref(), &response.actions).await;

    ok(
        StatusCode::OK,
        serde_json::json!({
            "session_id": session_id.to_string(),
            "content": response.content,
            "actions": response.actions,
            "outcomes": outcomes,
        }),
    )
}

async fn reset_handler(State(state): State<ApiState>, Json(req): Json<ResetRequest>) -> ApiResult {
    let session_id = parse_or_stable_uuid(req.session_id.as_deref(), "anonymous-session");
    state.sessions.reset(session_id).await;

    ok(
        StatusCode::OK,
        serde_json::json!({ "session_id": session_id.to_string(), "reset": true }),
    )
}

async fn history_handler(State(state): State<ApiState>, Path(session_id): Path<String>) -> ApiResult {
    let session_id = parse_or_stable_uuid(Some(&session_id), "anonymous-session");

    match state.sessions.transcript(session_id).await {
        Some(messages) => ok(
            StatusCode::OK,
            serde_json::json!({ "session_id": session_id.to_string(), "messages": messages }),
        ),
        None => (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error(format!("Unknown session: {}", session_id))),
        ),
    }
}

/// =============================
/// Trade Endpoints
/// =============================

async fn list_trades(State(state): State<ApiState>) -> ApiResult {
    match state.trades.list().await {
        Ok(trades) => ok(StatusCode::OK, trades),
        Err(e) => fail(e),
    }
}

async fn create_trade(State(state): State<ApiState>, Json(trade): Json<NewTrade>) -> ApiResult {
    match state.trades.create(trade).await {
        Ok(trade) => {
            info!(trade_id = %trade.id, symbol = %trade.symbol, "Trade created");
            ok(StatusCode::CREATED, trade)
        }
        Err(e) => fail(e),
    }
}

async fn update_trade(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
    Json(changes): Json<TradeUpdate>,
) -> ApiResult {
    match state.trades.update(id, changes).await {
        Ok(trade) => ok(StatusCode::OK, trade),
        Err(e) => fail(e),
    }
}

async fn delete_trade(State(state): State<ApiState>, Path(id): Path<Uuid>) -> ApiResult {
    match state.trades.delete(id).await {
        Ok(()) => ok(StatusCode::OK, serde_json::json!({ "id": id, "deleted": true })),
        Err(e) => fail(e),
    }
}

/// Records a payout once the profitable-days rule is met
async fn withdraw(State(state): State<ApiState>, Json(req): Json<WithdrawalRequest>) -> ApiResult {
    let _guard = state.withdrawals.lock().await;

    let trades = match state.trades.list().await {
        Ok(trades) => trades,
        Err(e) => return fail(e),
    };

    let progress = WithdrawalProgress::compute(&trades);
    if !progress.eligible {
        return (
            StatusCode::CONFLICT,
            Json(ApiResponse::error(format!(
                "Withdrawal not available yet: {}/{} profitable days",
                progress.profitable_days.len(),
                progress.target_days
            ))),
        );
    }

    let record = match NewTrade::withdrawal(req.amount, Utc::now()) {
        Ok(record) => record,
        Err(e) => return fail(e),
    };

    match state.trades.create(record).await {
        Ok(trade) => {
            info!(amount = req.amount, "Withdrawal recorded");
            ok(StatusCode::CREATED, trade)
        }
        Err(e) => fail(e),
    }
}

/// =============================
/// Statistics Endpoint
/// =============================

#[derive(Debug, Serialize)]
struct StatsReport {
    performance: PerformanceStats,
    strategies: Vec<StrategyStats>,
    withdrawal: WithdrawalProgress,
    total_withdrawn: f64,
    funded: FundedProgress,
    daily: Vec<DayEntry>,
}

#[derive(Debug, Serialize)]
struct DayEntry {
    date: chrono::NaiveDate,
    #[serde(flatten)]
    summary: stats::DaySummary,
}

async fn stats_handler(State(state): State<ApiState>, Query(query): Query<StatsQuery>) -> ApiResult {
    let rules = match query.account.as_deref() {
        Some(size) => match FundedRules::preset(size) {
            Some(rules) => rules,
            None => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(ApiResponse::error(format!("Unknown account size: {}", size))),
                )
            }
        },
        None => FundedRules::default(),
    };

    let trades = match state.trades.list().await {
        Ok(trades) => trades,
        Err(e) => return fail(e),
    };

    let report = StatsReport {
        performance: PerformanceStats::compute(&trades, Utc::now()),
        strategies: stats::strategy_breakdown(&trades),
        withdrawal: WithdrawalProgress::compute(&trades),
        total_withdrawn: stats::total_withdrawn(&trades),
        funded: FundedProgress::compute(&trades, rules),
        daily: stats::daily_summaries(&trades)
            .into_iter()
            .map(|(date, summary)| DayEntry { date, summary })
            .collect(),
    };

    ok(StatusCode::OK, report)
}

/// =============================
/// Goal Endpoints
/// =============================

async fn list_goals(State(state): State<ApiState>) -> ApiResult {
    let trades = match state.trades.list().await {
        Ok(trades) => trades,
        Err(e) => return fail(e),
    };

    ok(StatusCode::OK, state.goals.progress(&trades, Utc::now()).await)
}

async fn create_goal(State(state): State<ApiState>, Json(goal): Json<NewGoal>) -> ApiResult {
    match state.goals.add(goal).await {
        Ok(goal) => ok(StatusCode::CREATED, goal),
        Err(e) => fail(e),
    }
}

async fn update_goal(
    State(state): State<ApiState>,
    Path(id): Path<Uuid>,
    Json(changes): Json<GoalUpdate>,
) -> ApiResult {
    match state.goals.update(id, changes).await {
        Ok(goal) => ok(StatusCode::OK, goal),
        Err(e) => fail(e),
    }
}

async fn delete_goal(State(state): State<ApiState>, Path(id): Path<Uuid>) -> ApiResult {
    match state.goals.delete(id).await {
        Ok(()) => ok(StatusCode::OK, serde_json::json!({ "id": id, "deleted": true })),
        Err(e) => fail(e),
    }
}

/// =============================
/// Router
/// =============================

pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/chat", post(chat_handler))
        .route("/api/chat/reset", post(reset_handler))
        .route("/api/chat/:session_id/history", get(history_handler))
        .route("/api/trades", get(list_trades).post(create_trade))
        .route("/api/trades/:id", put(update_trade).delete(delete_trade))
        .route("/api/withdrawals", post(withdraw))
        .route("/api/stats", get(stats_handler))
        .route("/api/goals", get(list_goals).post(create_goal))
        .route("/api/goals/:id", put(update_goal).delete(delete_goal))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    config: AssistantConfig,
    trades: Arc<dyn TradeStore>,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let port = config.api_port;
    let router = create_router(ApiState::new(config, trades));

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Trade, TradeStatus};
    use crate::state::InMemoryTradeStore;
    use axum::body::Body;
    use axum::http::Request;
    use chrono::Duration;
    use tower::ServiceExt;

    fn trade(pnl: f64, days_ago: i64) -> Trade {
        Trade {
            id: Uuid::new_v4(),
            symbol: "ES".to_string(),
            status: TradeStatus::from_pnl(pnl),
            pnl,
            date: Utc::now() - Duration::days(days_ago),
            strategy: Some("smt".to_string()),
            notes: String::new(),
            image_urls: vec![],
            rr: None,
            followed_plan: true,
        }
    }

    fn app(store: Arc<InMemoryTradeStore>) -> Router {
        create_router(ApiState::new(AssistantConfig::default(), store))
    }

    async fn call(router: Router, method: &str, uri: &str, body: serde_json::Value) -> (StatusCode, ApiResponse) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();

        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn test_stable_uuid() {
        let a = parse_or_stable_uuid(Some("browser-tab-1"), "x");
        let b = parse_or_stable_uuid(Some("browser-tab-1"), "y");
        assert_eq!(a, b);
        assert_eq!(a.get_version_num(), 4);

        let id = Uuid::new_v4();
        assert_eq!(parse_or_stable_uuid(Some(&id.to_string()), "x"), id);
        assert_eq!(parse_or_stable_uuid(None, "seed"), parse_or_stable_uuid(Some(" "), "seed"));
    }

    #[tokio::test]
    async fn test_chat_executes_actions() {
        let store = Arc::new(InMemoryTradeStore::new());
        let router = app(store.clone());

        let (status, body) = call(
            router,
            "POST",
            "/api/chat",
            serde_json::json!({ "session_id": "tab-1", "message": "add NQ trade, profit 250, ifvg" }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let data = body.data.unwrap();
        assert_eq!(data["actions"][0]["type"], "add_trade");
        assert_eq!(data["outcomes"][0]["ok"], true);

        let stored = store.list().await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].symbol, "NQ");
        assert_eq!(stored[0].pnl, 250.0);
    }

    #[tokio::test]
    async fn test_chat_requires_user_message() {
        let store = Arc::new(InMemoryTradeStore::new());
        let (status, body) = call(
            app(store),
            "POST",
            "/api/chat",
            serde_json::json!({ "messages": [{ "role": "assistant", "content": "hi" }] }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!body.success);
    }

    #[tokio::test]
    async fn test_trade_crud_status_codes() {
        let store = Arc::new(InMemoryTradeStore::new());
        let router = app(store.clone());

        let new_trade = serde_json::json!({
            "symbol": "ES",
            "status": "loss",
            "pnl": 50.0,
            "date": Utc::now().to_rfc3339(),
        });
        let (status, _) = call(router.clone(), "POST", "/api/trades", new_trade).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let existing = trade(80.0, 1);
        let id = existing.id;
        store.seed([existing]).await;

        let (status, body) = call(
            router.clone(),
            "PUT",
            &format!("/api/trades/{}", id),
            serde_json::json!({ "rr": 2.0 }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.data.unwrap()["rr"], 2.0);

        let (status, _) = call(router.clone(), "DELETE", &format!("/api/trades/{}", id), serde_json::json!({})).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = call(router, "DELETE", &format!("/api/trades/{}", id), serde_json::json!({})).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_withdrawal_requires_profitable_days() {
        let store = Arc::new(InMemoryTradeStore::new());
        let router = app(store.clone());

        store.seed((1..=4).map(|d| trade(150.0, d))).await;
        let (status, _) = call(router.clone(), "POST", "/api/withdrawals", serde_json::json!({ "amount": 300.0 })).await;
        assert_eq!(status, StatusCode::CONFLICT);

        store.seed([trade(150.0, 5)]).await;
        let (status, body) =
            call(router.clone(), "POST", "/api/withdrawals", serde_json::json!({ "amount": 300.0 })).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body.data.unwrap()["status"], "withdrawal");

        let (status, body) = call(router, "GET", "/api/stats?account=50K", serde_json::json!({})).await;
        assert_eq!(status, StatusCode::OK);
        let data = body.data.unwrap();
        assert_eq!(data["total_withdrawn"], 300.0);
        assert_eq!(data["withdrawal"]["eligible"], false);
        assert_eq!(data["performance"]["total_trades"], 5);
        assert_eq!(data["funded"]["rules"]["starting_balance"], 50_000.0);
    }

    #[tokio::test]
    async fn test_concurrent_withdrawals_pay_out_once() {
        let store = Arc::new(InMemoryTradeStore::new());
        let router = app(store.clone());
        store.seed((1..=5).map(|d| trade(150.0, d))).await;

        let body = serde_json::json!({ "amount": 300.0 });
        let (first, second) = tokio::join!(
            call(router.clone(), "POST", "/api/withdrawals", body.clone()),
            call(router.clone(), "POST", "/api/withdrawals", body),
        );

        let mut statuses = vec![first.0, second.0];
        statuses.sort();
        assert_eq!(statuses, vec![StatusCode::CREATED, StatusCode::CONFLICT]);

        let stored = store.list().await.unwrap();
        assert_eq!(stored.iter().filter(|t| t.is_withdrawal()).count(), 1);
    }

    #[tokio::test]
    async fn test_goals_endpoints() {
        let store = Arc::new(InMemoryTradeStore::new());
        let router = app(store.clone());
        store.seed([trade(250.0, 0)]).await;

        let (status, body) = call(router.clone(), "GET", "/api/goals", serde_json::json!({})).await;
        assert_eq!(status, StatusCode::OK);
        let goals = body.data.unwrap();
        assert_eq!(goals.as_array().unwrap().len(), 3);
        assert_eq!(goals[1]["goal"]["kind"], "win_rate");
        assert_eq!(goals[1]["current"], 100.0);
        assert_eq!(goals[1]["completed"], true);

        let default_id = goals[0]["goal"]["id"].as_str().unwrap().to_string();
        let (status, _) = call(router.clone(), "DELETE", &format!("/api/goals/{}", default_id), serde_json::json!({})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = call(
            router.clone(),
            "POST",
            "/api/goals",
            serde_json::json!({ "title": "Review every loss", "target": 10.0 }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let custom_id = body.data.unwrap()["id"].as_str().unwrap().to_string();

        let (status, _) = call(router.clone(), "DELETE", &format!("/api/goals/{}", custom_id), serde_json::json!({})).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = call(router, "DELETE", &format!("/api/goals/{}", custom_id), serde_json::json!({})).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_chat_history_endpoint() {
        let store = Arc::new(InMemoryTradeStore::new());
        let router = app(store);

        let (status, _) = call(router.clone(), "GET", "/api/chat/tab-9/history", serde_json::json!({})).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        call(
            router.clone(),
            "POST",
            "/api/chat",
            serde_json::json!({ "session_id": "tab-9", "message": "hello" }),
        )
        .await;

        let (status, body) = call(router, "GET", "/api/chat/tab-9/history", serde_json::json!({})).await;
        assert_eq!(status, StatusCode::OK);
        let data = body.data.unwrap();
        assert_eq!(data["messages"][0]["role"], "user");
        assert_eq!(data["messages"][0]["content"], "hello");
        assert_eq!(data["messages"][1]["intent"], "greeting");
    }

    #[tokio::test]
    async fn test_unknown_account_preset() {
        let store = Arc::new(InMemoryTradeStore::new());
        let (status, _) = call(app(store), "GET", "/api/stats?account=75K", serde_json::json!({})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
