//! Session store - one append-only conversation history per session id
//!
//! Sessions are created lazily and exactly once: `ensure` takes the map's
//! write lock before inserting, so concurrent first requests for the same id
//! all observe the same session. Each session also owns a turn lock that the
//! runner holds for a whole turn, serializing turns within one session while
//! leaving other sessions untouched.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, MutexGuard, RwLock};

use crate::llm::Message;

/// Who authored a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Agent,
}

/// One message within a session, immutable once appended
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn agent(text: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Agent,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }

    /// Convert to a model message
    pub fn to_message(&self) -> Message {
        match self.role {
            TurnRole::User => Message::user(&self.text),
            TurnRole::Agent => Message::assistant(&self.text),
        }
    }
}

/// Ordered history of turns for one conversational identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub turns: Vec<Turn>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            turns: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Most recent `window` turns (all of them when `window` is 0)
    pub fn window(&self, window: usize) -> &[Turn] {
        if window == 0 || self.turns.len() <= window {
            &self.turns
        } else {
            &self.turns[self.turns.len() - window..]
        }
    }
}

/// Session store errors
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(String),
}

/// Shared slot for one session: its history plus the per-session turn lock
#[derive(Debug)]
pub struct SessionHandle {
    id: String,
    turn_lock: Mutex<()>,
    session: RwLock<Session>,
}

impl SessionHandle {
    fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            turn_lock: Mutex::new(()),
            session: RwLock::new(Session::new(id)),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Acquire exclusive use of this session for one turn
    pub async fn begin_turn(&self) -> MutexGuard<'_, ()> {
        self.turn_lock.lock().await
    }

    /// Copy of the session as it stands
    pub async fn snapshot(&self) -> Session {
        self.session.read().await.clone()
    }
}

/// Process-lifetime map of sessions keyed by id
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Arc<SessionHandle>>>,
    created: AtomicUsize,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the session for `session_id`, creating it on first reference.
    ///
    /// Idempotent and atomic: exactly one creation happens per id regardless
    /// of how many callers race here.
    pub async fn ensure(&self, session_id: &str) -> Arc<SessionHandle> {
        if let Some(handle) = self.sessions.read().await.get(session_id) {
            return Arc::clone(handle);
        }

        let mut sessions = self.sessions.write().await;
        let handle = sessions.entry(session_id.to_string()).or_insert_with(|| {
            self.created.fetch_add(1, Ordering::SeqCst);
            info!("Created session {}", session_id);
            Arc::new(SessionHandle::new(session_id))
        });
        Arc::clone(handle)
    }

    /// Look up an existing session without creating it
    pub async fn get(&self, session_id: &str) -> Result<Arc<SessionHandle>, SessionError> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .cloned()
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))
    }

    /// Append a turn to an existing session; never creates one
    pub async fn append(&self, session_id: &str, turn: Turn) -> Result<(), SessionError> {
        let handle = self.get(session_id).await?;
        handle.session.write().await.turns.push(turn);
        Ok(())
    }

    /// Snapshot of a session's turns
    pub async fn history(&self, session_id: &str) -> Result<Vec<Turn>, SessionError> {
        let handle = self.get(session_id).await?;
        let session = handle.session.read().await;
        Ok(session.turns.clone())
    }

    /// Whether a session exists
    pub async fn contains(&self, session_id: &str) -> bool {
        self.sessions.read().await.contains_key(session_id)
    }

    /// Number of sessions held
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Number of sessions ever created
    pub fn created_count(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ensure_creates_once() {
        let store = SessionStore::new();
        let first = store.ensure("s1").await;
        let second = store.ensure("s1").await;

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(store.created_count(), 1);
        assert_eq!(store.len().await, 1);
        assert_eq!(first.id(), "s1");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_ensure_single_creation() {
        let store = Arc::new(SessionStore::new());
        let mut tasks = Vec::new();
        for _ in 0..32 {
            let store = Arc::clone(&store);
            tasks.push(tokio::spawn(async move { store.ensure("s1").await }));
        }

        let mut handles = Vec::new();
        for task in tasks {
            handles.push(task.await.unwrap());
        }

        assert_eq!(store.created_count(), 1);
        assert!(handles.iter().all(|h| Arc::ptr_eq(h, &handles[0])));
    }

    #[tokio::test]
    async fn test_append_to_missing_session_fails() {
        let store = SessionStore::new();
        let result = store.append("ghost", Turn::user("hello")).await;
        assert!(matches!(result, Err(SessionError::NotFound(id)) if id == "ghost"));
        assert!(!store.contains("ghost").await);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_append_preserves_order() {
        let store = SessionStore::new();
        store.ensure("s1").await;
        store.append("s1", Turn::user("Q1")).await.unwrap();
        store.append("s1", Turn::agent("A1")).await.unwrap();
        store.append("s1", Turn::user("Q2")).await.unwrap();

        let history = store.history("s1").await.unwrap();
        let texts: Vec<_> = history.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["Q1", "A1", "Q2"]);
        assert_eq!(history[1].role, TurnRole::Agent);
    }

    #[tokio::test]
    async fn test_sessions_are_independent() {
        let store = SessionStore::new();
        store.ensure("a").await;
        store.ensure("b").await;
        store.append("a", Turn::user("only in a")).await.unwrap();

        assert_eq!(store.history("a").await.unwrap().len(), 1);
        assert!(store.history("b").await.unwrap().is_empty());
        assert_eq!(store.created_count(), 2);
    }

    #[tokio::test]
    async fn test_turn_lock_is_per_session() {
        let store = SessionStore::new();
        let a = store.ensure("a").await;
        let b = store.ensure("b").await;

        let _held = a.begin_turn().await;
        let other = tokio::time::timeout(std::time::Duration::from_millis(100), b.begin_turn()).await;
        assert!(other.is_ok());

        let same = tokio::time::timeout(std::time::Duration::from_millis(50), a.begin_turn()).await;
        assert!(same.is_err());
    }

    #[test]
    fn test_session_window() {
        let mut session = Session::new("s1");
        for i in 0..5 {
            session.turns.push(Turn::user(format!("q{}", i)));
        }

        assert_eq!(session.window(0).len(), 5);
        assert_eq!(session.window(10).len(), 5);
        let tail = session.window(2);
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].text, "q3");
    }

    #[test]
    fn test_turn_to_message() {
        assert_eq!(Turn::user("hi").to_message().role, crate::llm::Role::User);
        assert_eq!(Turn::agent("hello").to_message().role, crate::llm::Role::Assistant);
    }

    #[test]
    fn test_turn_serialization() {
        let json = serde_json::to_value(Turn::agent("hello")).unwrap();
        assert_eq!(json["role"], "agent");
        assert_eq!(json["text"], "hello");
        assert!(json["timestamp"].is_string());
    }
}
