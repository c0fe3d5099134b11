//! Conversation orchestrator
//!
//! Runs one chat turn: transcript, entity extraction, intent
//! classification with the dialogue override, handler dispatch, state
//! update. Each [`ConversationSession`] owns its own transcript and
//! dialogue state, and [`SessionStore`] keys them by session id so
//! concurrent conversations never share mutable state.

use crate::classifier::{Intent, IntentClassifier};
use crate::config::AssistantConfig;
use crate::dialogue::ConversationContext;
use crate::entities::extract_entities;
use crate::handlers::{self, small_talk, HandlerContext};
use crate::memory::{ConversationHistory, ConversationMessage};
use crate::models::{ChatResponse, Trade};
use chrono::{DateTime, Utc};
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// One user's conversation with the assistant
#[derive(Debug)]
pub struct ConversationSession {
    session_id: Uuid,
    history: ConversationHistory,
    context: ConversationContext,
    config: Arc<AssistantConfig>,
}

impl ConversationSession {
    pub fn new(config: Arc<AssistantConfig>) -> Self {
        Self::with_id(Uuid::new_v4(), config)
    }

    pub fn with_id(session_id: Uuid, config: Arc<AssistantConfig>) -> Self {
        Self {
            session_id,
            history: ConversationHistory::new(),
            context: ConversationContext::new(),
            config,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    pub fn context(&self) -> &ConversationContext {
        &self.context
    }

    /// Run one turn against a snapshot of the trade collection.
    ///
    /// Never fails: a handler error is logged and answered with the
    /// generic fallback reply.
    pub fn respond_at(&mut self, utterance: &str, trades: &[Trade], now: DateTime<Utc>) -> ChatResponse {
        self.history.add_message(ConversationMessage::user(utterance, now));

        let entities = extract_entities(utterance, now);
        let classified = IntentClassifier::classify(utterance);
        let intent = self.context.resolve_intent(classified);
        if intent != classified {
            debug!(
                session_id = %self.session_id,
                classified = %classified,
                "Pending trade keeps the turn on add_trade"
            );
        }

        let ctx = HandlerContext {
            entities: &entities,
            utterance,
            trades,
            now,
            config: &self.config,
        };

        let (intent, response) = match handlers::dispatch(intent, &ctx, &mut self.context) {
            Ok(response) => (intent, response),
            Err(e) => {
                warn!(session_id = %self.session_id, intent = %intent, "Handler failed: {}", e);
                (Intent::Unknown, small_talk::unknown())
            }
        };

        self.context.finish_turn(intent);
        self.history
            .add_message(ConversationMessage::assistant(response.content.clone(), intent, now));

        info!(
            session_id = %self.session_id,
            intent = %intent,
            actions = response.actions.len(),
            state = ?self.context.state(),
            "Turn complete"
        );

        response
    }

    /// Async turn entry point; waits the configured reply delay before answering
    pub async fn submit_turn(&mut self, utterance: &str, trades: &[Trade]) -> ChatResponse {
        let response = self.respond_at(utterance, trades, Utc::now());

        let delay = reply_delay(&self.config);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        response
    }

    /// Forget the transcript and all dialogue state
    pub fn reset(&mut self) {
        self.history.clear();
        self.context.reset();
        info!(session_id = %self.session_id, "Conversation reset");
    }
}

/// Random pause between the configured bounds
fn reply_delay(config: &AssistantConfig) -> Duration {
    let min = config.reply_delay_min.as_millis() as u64;
    let max = config.reply_delay_max.as_millis() as u64;
    if max <= min {
        return Duration::from_millis(min);
    }
    Duration::from_millis(rand::thread_rng().gen_range(min..=max))
}

struct SessionSlot {
    session: Arc<Mutex<ConversationSession>>,
    last_used: Instant,
}

/// Sessions keyed by id. Sessions idle for longer than the configured
/// timeout are dropped the next time any session is looked up.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, SessionSlot>>>,
    config: Arc<AssistantConfig>,
}

impl SessionStore {
    pub fn new(config: AssistantConfig) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            config: Arc::new(config),
        }
    }

    /// Get or create the session with this id and mark it as used
    pub async fn session(&self, session_id: Uuid) -> Arc<Mutex<ConversationSession>> {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        self.evict_idle(&mut sessions, now);

        let slot = sessions.entry(session_id).or_insert_with(|| {
            debug!(%session_id, "Creating conversation session");
            SessionSlot {
                session: Arc::new(Mutex::new(ConversationSession::with_id(
                    session_id,
                    Arc::clone(&self.config),
                ))),
                last_used: now,
            }
        });
        slot.last_used = now;
        Arc::clone(&slot.session)
    }

    /// A zero timeout keeps sessions forever
    fn evict_idle(&self, sessions: &mut HashMap<Uuid, SessionSlot>, now: Instant) {
        let timeout = self.config.session_idle_timeout;
        if timeout.is_zero() {
            return;
        }

        let before = sessions.len();
        sessions.retain(|_, slot| now.duration_since(slot.last_used) <= timeout);
        let evicted = before - sessions.len();
        if evicted > 0 {
            info!(evicted, remaining = sessions.len(), "Evicted idle conversation sessions");
        }
    }

    /// Turns on one session are serialized; different sessions run independently
    pub async fn submit_turn(&self, session_id: Uuid, utterance: &str, trades: &[Trade]) -> ChatResponse {
        let session = self.session(session_id).await;
        let mut session = session.lock().await;
        session.submit_turn(utterance, trades).await
    }

    async fn existing(&self, session_id: Uuid) -> Option<Arc<Mutex<ConversationSession>>> {
        let sessions = self.sessions.read().await;
        sessions.get(&session_id).map(|slot| Arc::clone(&slot.session))
    }

    /// Reset a session; unknown ids are a no-op
    pub async fn reset(&self, session_id: Uuid) {
        if let Some(session) = self.existing(session_id).await {
            session.lock().await.reset();
        }
    }

    /// Transcript of a session, oldest first; `None` for unknown ids
    pub async fn transcript(&self, session_id: Uuid) -> Option<Vec<ConversationMessage>> {
        let session = self.existing(session_id).await?;
        let session = session.lock().await;
        Some(session.history().messages().cloned().collect())
    }

    pub async fn remove(&self, session_id: Uuid) -> bool {
        self.sessions.write().await.remove(&session_id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
