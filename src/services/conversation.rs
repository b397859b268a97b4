use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use tokio::sync::Mutex as AsyncMutex;

use crate::models::Business;
use crate::services::ai::{Message, ModelReply};
use crate::services::tools::{self, ToolCall, ToolCatalog};
use crate::state::AppState;

/// Sent when the destination address maps to no business.
pub const SYSTEM_ERROR_REPLY: &str =
    "System error: this number is not connected to a business yet.";

/// Sent when a turn fails; the session is dropped so the next message starts fresh.
pub const APOLOGY_REPLY: &str =
    "Sorry, I'm having a little trouble right now. Could you say that again?";

/// Tool calls the model may chain before it has to answer in text.
const MAX_TOOL_ROUNDS: usize = 4;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SessionKey {
    pub business_id: String,
    pub sender: String,
}

impl SessionKey {
    pub fn new(business_id: &str, sender: &str) -> Self {
        Self {
            business_id: business_id.to_string(),
            sender: sender.to_string(),
        }
    }
}

/// Conversation state for one customer of one business.
///
/// Persona, timezone and tool catalog are captured when the session is
/// created; later edits to the business apply to new sessions only.
pub struct Session {
    pub business_name: String,
    pub sheet_id: String,
    pub persona: String,
    pub timezone: Tz,
    pub catalog: ToolCatalog,
    pub history: Vec<Message>,
}

impl Session {
    fn new(business: &Business) -> Self {
        Self {
            business_name: business.name.clone(),
            sheet_id: business.sheet_id.clone(),
            persona: business.system_instruction.clone(),
            timezone: business.tz(),
            catalog: ToolCatalog::for_business(business),
            history: Vec::new(),
        }
    }

    /// Persona plus the context the model cannot know on its own.
    pub fn system_prompt(&self, sender: &str, now: DateTime<Utc>) -> String {
        let today = now.with_timezone(&self.timezone);
        let phone = sender.strip_prefix("whatsapp:").unwrap_or(sender);
        format!(
            "{}\n\nContext:\n- Today is {} ({}).\n- The customer is messaging from {}.",
            self.persona.trim_end(),
            today.format("%Y-%m-%d"),
            today.format("%A"),
            phone,
        )
    }
}

struct Entry {
    session: Arc<AsyncMutex<Session>>,
    last_seen: DateTime<Utc>,
}

/// In-memory sessions keyed by (business, sender).
///
/// Turns for the same key are serialized by the session's own lock; different
/// keys never contend beyond the brief map lookup.
pub struct SessionManager {
    sessions: Mutex<HashMap<SessionKey, Entry>>,
    idle_timeout: Duration,
}

impl SessionManager {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            idle_timeout,
        }
    }

    fn map(&self) -> MutexGuard<'_, HashMap<SessionKey, Entry>> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Returns the live session for `key`, creating one if it is missing or
    /// has been idle longer than the timeout.
    pub fn checkout(
        &self,
        business: &Business,
        sender: &str,
        now: DateTime<Utc>,
    ) -> Arc<AsyncMutex<Session>> {
        let key = SessionKey::new(&business.id, sender);
        let mut map = self.map();

        if let Some(entry) = map.get_mut(&key) {
            if now - entry.last_seen < self.idle_timeout {
                entry.last_seen = now;
                return Arc::clone(&entry.session);
            }
            tracing::debug!(business = %business.name, sender, "session idle, starting fresh");
        }

        let session = Arc::new(AsyncMutex::new(Session::new(business)));
        map.insert(
            key,
            Entry {
                session: Arc::clone(&session),
                last_seen: now,
            },
        );
        session
    }

    /// Drops `session` unless a newer one has already replaced it.
    pub fn discard(&self, key: &SessionKey, session: &Arc<AsyncMutex<Session>>) {
        let mut map = self.map();
        if map.get(key).is_some_and(|e| Arc::ptr_eq(&e.session, session)) {
            map.remove(key);
        }
    }

    /// True while `session` is still the one stored under `key`.
    pub fn is_current(&self, key: &SessionKey, session: &Arc<AsyncMutex<Session>>) -> bool {
        self.map()
            .get(key)
            .is_some_and(|e| Arc::ptr_eq(&e.session, session))
    }

    pub fn evict_idle(&self, now: DateTime<Utc>) -> usize {
        let mut map = self.map();
        let before = map.len();
        map.retain(|_, e| now - e.last_seen < self.idle_timeout);
        before - map.len()
    }

    pub fn len(&self) -> usize {
        self.map().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub async fn history(&self, key: &SessionKey) -> Option<Vec<Message>> {
        let session = self.map().get(key).map(|e| Arc::clone(&e.session))?;
        let session = session.lock().await;
        Some(session.history.clone())
    }
}

pub async fn process_message(state: &AppState, from: &str, to: &str, body: &str) -> String {
    process_message_at(state, from, to, body, Utc::now()).await
}

/// Resolves the business behind `to`, runs one turn of the sender's session
/// and returns the text to send back. Never fails: errors become a fixed reply.
pub async fn process_message_at(
    state: &AppState,
    from: &str,
    to: &str,
    body: &str,
    now: DateTime<Utc>,
) -> String {
    let business = match state.registry.resolve(to) {
        Ok(Some(b)) => b,
        Ok(None) => {
            tracing::warn!(to, "no business for destination");
            return SYSTEM_ERROR_REPLY.to_string();
        }
        Err(e) => {
            tracing::error!(error = %e, to, "business lookup failed");
            return SYSTEM_ERROR_REPLY.to_string();
        }
    };

    let key = SessionKey::new(&business.id, from);
    loop {
        let handle = state.sessions.checkout(&business, from, now);
        let mut session = handle.lock().await;
        // A turn that failed while this one waited has dropped the session.
        if !state.sessions.is_current(&key, &handle) {
            continue;
        }

        // Discarded before the lock is released, so queued turns see it gone.
        return match run_turn(state, &mut session, from, body, now).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    business = %business.name,
                    from,
                    "conversation turn failed, resetting session"
                );
                state.sessions.discard(&key, &handle);
                APOLOGY_REPLY.to_string()
            }
        };
    }
}

/// History is only committed to the session when the turn succeeds.
async fn run_turn(
    state: &AppState,
    session: &mut Session,
    from: &str,
    body: &str,
    now: DateTime<Utc>,
) -> anyhow::Result<String> {
    let system_prompt = session.system_prompt(from, now);
    let declarations = session.catalog.declarations();
    let mut history = session.history.clone();
    history.push(Message::User(body.to_string()));

    let mut reply = state
        .llm
        .chat(&system_prompt, &declarations, &history)
        .await?;
    let mut rounds = 0;

    loop {
        let calls = match reply {
            ModelReply::Text(text) => {
                history.push(Message::Assistant(text.clone()));
                session.history = history;
                return Ok(text);
            }
            ModelReply::ToolCalls(calls) => calls,
        };

        rounds += 1;
        anyhow::ensure!(
            rounds <= MAX_TOOL_ROUNDS,
            "model kept calling tools after {MAX_TOOL_ROUNDS} rounds"
        );

        let mut calls = calls.into_iter();
        let call = calls
            .next()
            .ok_or_else(|| anyhow::anyhow!("model sent an empty tool call batch"))?;
        let ignored = calls.len();
        if ignored > 0 {
            tracing::warn!(tool = %call.name, ignored, "only the first tool call is honoured");
        }

        let parsed = ToolCall::parse(&session.catalog, &call.name, &call.args)?;
        tracing::info!(
            tool = parsed.tool().name(),
            business = %session.business_name,
            from,
            "dispatching tool call"
        );
        let result = tools::dispatch(
            &state.appointments,
            &state.knowledge_base,
            &session.sheet_id,
            &parsed,
        )
        .await?;

        history.push(Message::ToolCall(call.clone()));
        history.push(Message::ToolResult { call, result });

        reply = state
            .llm
            .chat(&system_prompt, &declarations, &history)
            .await?;
    }
}

/// Periodically drops sessions that have gone idle.
pub fn spawn_session_reaper(state: Arc<AppState>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(std::time::Duration::from_secs(60));
        loop {
            tick.tick().await;
            let evicted = state.sessions.evict_idle(Utc::now());
            if evicted > 0 {
                tracing::debug!(evicted, "evicted idle sessions");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn business(knowledge_base: bool) -> Business {
        Business {
            id: "b1".to_string(),
            phone_number: "whatsapp:+14155238886".to_string(),
            name: "Horizon Dental".to_string(),
            system_instruction: "You are Rayan, the receptionist.".to_string(),
            sheet_id: "sheet-1".to_string(),
            timezone: "Asia/Muscat".to_string(),
            knowledge_base,
        }
    }

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 12, 24, h, m, 0).unwrap()
    }

    #[test]
    fn test_checkout_reuses_live_session() {
        let mgr = SessionManager::new(Duration::minutes(30));
        let a = mgr.checkout(&business(true), "whatsapp:+96899999999", at(10, 0));
        let b = mgr.checkout(&business(true), "whatsapp:+96899999999", at(10, 20));
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(mgr.len(), 1);

        let other = mgr.checkout(&business(true), "whatsapp:+96811111111", at(10, 20));
        assert!(!Arc::ptr_eq(&a, &other));
        assert_eq!(mgr.len(), 2);
    }

    #[test]
    fn test_idle_session_replaced() {
        let mgr = SessionManager::new(Duration::minutes(30));
        let a = mgr.checkout(&business(true), "s", at(10, 0));
        // Activity refreshes the timer.
        mgr.checkout(&business(true), "s", at(10, 25));
        let b = mgr.checkout(&business(true), "s", at(10, 50));
        assert!(Arc::ptr_eq(&a, &b));

        let c = mgr.checkout(&business(true), "s", at(11, 30));
        assert!(!Arc::ptr_eq(&a, &c));
    }

    #[tokio::test]
    async fn test_evict_idle() {
        let mgr = SessionManager::new(Duration::minutes(30));
        mgr.checkout(&business(true), "old", at(9, 0));
        mgr.checkout(&business(true), "new", at(10, 0));
        assert_eq!(mgr.evict_idle(at(10, 10)), 1);
        assert_eq!(mgr.len(), 1);
        assert!(mgr.history(&SessionKey::new("b1", "old")).await.is_none());
        assert_eq!(mgr.history(&SessionKey::new("b1", "new")).await, Some(vec![]));
    }

    #[test]
    fn test_discard_ignores_replaced_session() {
        let mgr = SessionManager::new(Duration::minutes(30));
        let key = SessionKey::new("b1", "s");
        let stale = mgr.checkout(&business(true), "s", at(9, 0));
        let fresh = mgr.checkout(&business(true), "s", at(11, 0));

        assert!(!mgr.is_current(&key, &stale));
        assert!(mgr.is_current(&key, &fresh));

        mgr.discard(&key, &stale);
        assert_eq!(mgr.len(), 1);
        mgr.discard(&key, &fresh);
        assert!(mgr.is_empty());
        assert!(!mgr.is_current(&key, &fresh));
    }

    #[test]
    fn test_catalog_follows_business() {
        assert_eq!(Session::new(&business(true)).catalog.tools().len(), 8);
        assert_eq!(Session::new(&business(false)).catalog.tools().len(), 5);
    }

    #[test]
    fn test_system_prompt_uses_business_timezone() {
        let session = Session::new(&business(true));
        // 22:30 UTC on the 24th is already the 25th in Muscat.
        let prompt = session.system_prompt("whatsapp:+96899999999", at(22, 30));
        assert!(prompt.starts_with("You are Rayan, the receptionist."));
        assert!(prompt.contains("Today is 2025-12-25 (Thursday)"));
        assert!(prompt.contains("messaging from +96899999999"));
    }
}
