//! Session registry.
//!
//! A session owns its conversation memory and a request lock. The request
//! lock serializes chat turns within one session while different sessions
//! proceed in parallel. The store bounds its size with idle expiry and
//! least-recently-used eviction; sessions with a request in flight are
//! never evicted.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use parley_core::config::SessionConfig;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::memory::ConversationMemory;

/// Opaque caller-chosen session identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// A fresh random identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Listing entry for a session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub id: SessionId,
    pub turns: usize,
    pub created_at: String,
    pub last_active: String,
}

/// State for one conversation.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    created_at: DateTime<Utc>,
    last_active: Mutex<DateTime<Utc>>,
    request_lock: Arc<tokio::sync::Mutex<()>>,
    memory: Mutex<ConversationMemory>,
}

impl Session {
    fn new(id: SessionId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            created_at: now,
            last_active: Mutex::new(now),
            request_lock: Arc::new(tokio::sync::Mutex::new(())),
            memory: Mutex::new(ConversationMemory::new()),
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_active(&self) -> DateTime<Utc> {
        *lock_recovering(&self.last_active)
    }

    /// Mark the session as active now.
    pub fn touch(&self) {
        self.touch_at(Utc::now());
    }

    fn touch_at(&self, now: DateTime<Utc>) {
        *lock_recovering(&self.last_active) = now;
    }

    /// Lock held for the duration of one chat turn.
    pub fn request_lock(&self) -> Arc<tokio::sync::Mutex<()>> {
        Arc::clone(&self.request_lock)
    }

    /// Whether a request currently holds this session.
    pub fn is_busy(&self) -> bool {
        self.request_lock.try_lock().is_err()
    }

    /// Short-lived access to the conversation memory.
    ///
    /// Never hold the guard across an await point.
    pub fn memory(&self) -> MutexGuard<'_, ConversationMemory> {
        lock_recovering(&self.memory)
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id.clone(),
            turns: self.memory().len(),
            created_at: self.created_at.to_rfc3339(),
            last_active: self.last_active().to_rfc3339(),
        }
    }
}

/// Poisoning only means another request panicked mid-update; the data is a
/// plain list of turns and stays usable.
fn lock_recovering<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::warn!("Session lock poisoned, recovering");
            poisoned.into_inner()
        }
    }
}

/// Registry of live sessions.
#[derive(Debug)]
pub struct SessionStore {
    sessions: Mutex<HashMap<SessionId, Arc<Session>>>,
    max_sessions: usize,
    /// `None` disables idle expiry.
    idle_timeout: Option<Duration>,
}

impl SessionStore {
    pub fn new(config: &SessionConfig) -> Self {
        let idle_timeout = (config.idle_timeout_minutes > 0)
            .then(|| Duration::minutes(i64::from(config.idle_timeout_minutes)));
        Self {
            sessions: Mutex::new(HashMap::new()),
            max_sessions: config.max_sessions.max(1),
            idle_timeout,
        }
    }

    /// Fetch a session, creating it with empty memory on first use.
    pub fn get_or_create(&self, id: &SessionId) -> Arc<Session> {
        self.get_or_create_at(id, Utc::now())
    }

    fn get_or_create_at(&self, id: &SessionId, now: DateTime<Utc>) -> Arc<Session> {
        let mut sessions = lock_recovering(&self.sessions);

        if let Some(session) = sessions.get(id) {
            if !self.is_expired(session, now) || session.is_busy() {
                session.touch_at(now);
                return Arc::clone(session);
            }
            tracing::debug!(session = %id, "Session expired, starting fresh");
            sessions.remove(id);
        }

        self.evict(&mut sessions, now);

        let session = Arc::new(Session::new(id.clone(), now));
        sessions.insert(id.clone(), Arc::clone(&session));
        tracing::debug!(session = %id, total = sessions.len(), "Session created");
        session
    }

    /// Fetch an existing session without creating one.
    pub fn get(&self, id: &SessionId) -> Option<Arc<Session>> {
        lock_recovering(&self.sessions).get(id).cloned()
    }

    /// Remove a session. Returns whether it existed.
    pub fn remove(&self, id: &SessionId) -> bool {
        lock_recovering(&self.sessions).remove(id).is_some()
    }

    /// Summaries of all sessions, most recently active first.
    pub fn list(&self) -> Vec<SessionSummary> {
        let sessions: Vec<Arc<Session>> =
            lock_recovering(&self.sessions).values().cloned().collect();
        let mut ordered: Vec<(DateTime<Utc>, SessionSummary)> = sessions
            .iter()
            .map(|s| (s.last_active(), s.summary()))
            .collect();
        ordered.sort_by(|a, b| b.0.cmp(&a.0));
        ordered.into_iter().map(|(_, summary)| summary).collect()
    }

    pub fn len(&self) -> usize {
        lock_recovering(&self.sessions).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn is_expired(&self, session: &Session, now: DateTime<Utc>) -> bool {
        self.idle_timeout
            .is_some_and(|timeout| now - session.last_active() > timeout)
    }

    /// Make room for one new session.
    fn evict(&self, sessions: &mut HashMap<SessionId, Arc<Session>>, now: DateTime<Utc>) {
        let before = sessions.len();
        sessions.retain(|_, s| s.is_busy() || !self.is_expired(s, now));
        let expired = before - sessions.len();

        let mut evicted = 0;
        while sessions.len() >= self.max_sessions {
            let oldest = sessions
                .values()
                .filter(|s| !s.is_busy())
                .min_by_key(|s| s.last_active())
                .map(|s| s.id.clone());
            match oldest {
                Some(id) => {
                    sessions.remove(&id);
                    evicted += 1;
                }
                None => {
                    tracing::warn!(
                        total = sessions.len(),
                        max = self.max_sessions,
                        "All sessions busy, exceeding session limit"
                    );
                    break;
                }
            }
        }

        if expired > 0 || evicted > 0 {
            tracing::debug!(expired, evicted, "Sessions evicted");
        }
    }
}
