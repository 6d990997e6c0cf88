//! Conversation sessions.
//!
//! A [`ConversationSession`] is an append-only log of turns for one user
//! interaction. It starts [`SessionState::Empty`] and becomes
//! [`SessionState::Active`] on the first append; turns are never edited or
//! removed.
//!
//! [`SessionStore`] keys sessions by [`SessionId`] so a process serving many
//! users keeps each history isolated. Every session sits behind its own lock,
//! so requests of different sessions do not contend. Sessions live until
//! [`SessionStore::end`] or, with an idle timeout configured,
//! [`SessionStore::evict_expired`].

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use ahash::AHashMap;
use chrono::{DateTime, Utc};
use log::{debug, info};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::engine::{InferenceEngine, Reply};
use crate::error::{Result, SapaError};

/// Who produced a turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Bot,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Bot => write!(f, "bot"),
        }
    }
}

/// One message of a conversation. Immutable once created.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    role: Role,
    text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timestamp: Option<DateTime<Utc>>,
}

impl ConversationTurn {
    /// Create a turn stamped with the current time.
    pub fn new<S: Into<String>>(role: Role, text: S) -> Self {
        ConversationTurn {
            role,
            text: text.into(),
            timestamp: Some(Utc::now()),
        }
    }

    /// Create a turn without a timestamp.
    pub fn untimed<S: Into<String>>(role: Role, text: S) -> Self {
        ConversationTurn {
            role,
            text: text.into(),
            timestamp: None,
        }
    }

    pub fn user<S: Into<String>>(text: S) -> Self {
        Self::new(Role::User, text)
    }

    pub fn bot<S: Into<String>>(text: S) -> Self {
        Self::new(Role::Bot, text)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp
    }
}

/// Identifier of a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        SessionId(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for SessionId {
    type Err = SapaError;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(SessionId)
            .map_err(|e| SapaError::other(format!("invalid session id '{s}': {e}")))
    }
}

/// Lifecycle state of a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Empty,
    Active,
}

/// Ordered, append-only history of one conversation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConversationSession {
    id: SessionId,
    turns: Vec<ConversationTurn>,
    created_at: DateTime<Utc>,
    last_activity: DateTime<Utc>,
}

impl ConversationSession {
    pub fn new() -> Self {
        Self::with_id(SessionId::new())
    }

    pub fn with_id(id: SessionId) -> Self {
        let now = Utc::now();
        ConversationSession {
            id,
            turns: Vec::new(),
            created_at: now,
            last_activity: now,
        }
    }

    /// Append a turn at the end of the history.
    pub fn append(&mut self, turn: ConversationTurn) {
        self.last_activity = turn.timestamp.unwrap_or_else(Utc::now);
        self.turns.push(turn);
    }

    /// Turns in insertion order.
    pub fn history(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn state(&self) -> SessionState {
        if self.turns.is_empty() {
            SessionState::Empty
        } else {
            SessionState::Active
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_activity
    }

    /// Ask `engine` for a reply and record both sides of the exchange.
    pub fn exchange(&mut self, engine: &InferenceEngine, input: &str) -> Reply {
        let reply = engine.handle(input);
        self.append(ConversationTurn::user(input));
        self.append(ConversationTurn::bot(reply.response.as_str()));
        reply
    }
}

impl Default for ConversationSession {
    fn default() -> Self {
        Self::new()
    }
}

/// When sessions expire.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionPolicy {
    /// Inactivity after which a session is evicted. `None` never expires.
    pub idle_timeout: Option<Duration>,
}

impl From<&SessionConfig> for SessionPolicy {
    fn from(config: &SessionConfig) -> Self {
        SessionPolicy {
            idle_timeout: config.idle_timeout(),
        }
    }
}

type SharedSession = Arc<Mutex<ConversationSession>>;

/// Sessions of one process, keyed by id.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<AHashMap<SessionId, SharedSession>>,
    policy: SessionPolicy,
}

impl SessionStore {
    pub fn new(policy: SessionPolicy) -> Self {
        SessionStore {
            sessions: RwLock::new(AHashMap::new()),
            policy,
        }
    }

    /// Start a new, empty session.
    pub fn create(&self) -> SessionId {
        let session = ConversationSession::new();
        let id = session.id();
        self.sessions.write().insert(id, Arc::new(Mutex::new(session)));
        info!("session {id} started");
        id
    }

    fn session(&self, id: SessionId) -> Result<SharedSession> {
        self.sessions
            .read()
            .get(&id)
            .cloned()
            .ok_or_else(|| SapaError::session_not_found(id.to_string()))
    }

    /// Snapshot of a session.
    pub fn get(&self, id: SessionId) -> Result<ConversationSession> {
        Ok(self.session(id)?.lock().clone())
    }

    /// Append a turn to a session.
    pub fn append(&self, id: SessionId, turn: ConversationTurn) -> Result<()> {
        self.session(id)?.lock().append(turn);
        Ok(())
    }

    /// Copy of a session's turns in insertion order.
    pub fn history(&self, id: SessionId) -> Result<Vec<ConversationTurn>> {
        Ok(self.session(id)?.lock().history().to_vec())
    }

    /// Handle `input` and record the exchange in the session.
    ///
    /// The session lock is held for the whole exchange, so concurrent
    /// requests of one session are serialized and turns stay paired.
    pub fn exchange(&self, id: SessionId, engine: &InferenceEngine, input: &str) -> Result<Reply> {
        let session = self.session(id)?;
        let mut session = session.lock();
        Ok(session.exchange(engine, input))
    }

    /// End a session, returning its final state.
    pub fn end(&self, id: SessionId) -> Result<ConversationSession> {
        let session = self
            .sessions
            .write()
            .remove(&id)
            .ok_or_else(|| SapaError::session_not_found(id.to_string()))?;
        info!("session {id} ended");
        let session = session.lock().clone();
        Ok(session)
    }

    /// Drop sessions idle for longer than the policy allows at `now`.
    ///
    /// Returns the number of evicted sessions. Does nothing without an idle
    /// timeout.
    pub fn evict_expired(&self, now: DateTime<Utc>) -> usize {
        let Some(timeout) = self.policy.idle_timeout else {
            return 0;
        };
        let Ok(timeout) = chrono::Duration::from_std(timeout) else {
            return 0;
        };

        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|id, session| {
            let keep = now - session.lock().last_activity() <= timeout;
            if !keep {
                debug!("session {id} expired");
            }
            keep
        });
        let evicted = before - sessions.len();
        if evicted > 0 {
            info!("evicted {evicted} idle sessions");
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    pub fn policy(&self) -> SessionPolicy {
        self.policy
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    #[test]
    fn test_append_keeps_order() {
        let mut session = ConversationSession::new();
        assert_eq!(session.state(), SessionState::Empty);

        for i in 0..50 {
            let turn = if i % 2 == 0 {
                ConversationTurn::user(format!("message {i}"))
            } else {
                ConversationTurn::bot(format!("message {i}"))
            };
            session.append(turn);
        }

        assert_eq!(session.state(), SessionState::Active);
        assert_eq!(session.len(), 50);
        for (i, turn) in session.history().iter().enumerate() {
            assert_eq!(turn.text(), format!("message {i}"));
            let expected = if i % 2 == 0 { Role::User } else { Role::Bot };
            assert_eq!(turn.role(), expected);
        }
    }

    #[test]
    fn test_duplicates_are_kept() {
        let mut session = ConversationSession::new();
        session.append(ConversationTurn::untimed(Role::User, "hi"));
        session.append(ConversationTurn::untimed(Role::User, "hi"));
        assert_eq!(session.len(), 2);
        assert_eq!(session.history()[0].timestamp(), None);
    }

    #[test]
    fn test_store_isolates_sessions() {
        let store = SessionStore::default();
        let a = store.create();
        let b = store.create();
        assert_ne!(a, b);

        store.append(a, ConversationTurn::user("from a")).unwrap();
        store.append(b, ConversationTurn::user("from b")).unwrap();
        store.append(a, ConversationTurn::bot("to a")).unwrap();

        let history_a = store.history(a).unwrap();
        assert_eq!(history_a.len(), 2);
        assert!(history_a.iter().all(|t| t.text().ends_with('a')));
        assert_eq!(store.history(b).unwrap().len(), 1);
    }

    #[test]
    fn test_concurrent_appends() {
        let store = Arc::new(SessionStore::default());
        let ids: Vec<SessionId> = (0..4).map(|_| store.create()).collect();

        let handles: Vec<_> = ids
            .iter()
            .map(|&id| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for i in 0..100 {
                        store.append(id, ConversationTurn::user(i.to_string())).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        for id in ids {
            let history = store.history(id).unwrap();
            let texts: Vec<String> = history.iter().map(|t| t.text().to_string()).collect();
            let expected: Vec<String> = (0..100).map(|i| i.to_string()).collect();
            assert_eq!(texts, expected);
        }
    }

    #[test]
    fn test_end_session() {
        let store = SessionStore::default();
        let id = store.create();
        store.append(id, ConversationTurn::user("bye")).unwrap();

        let session = store.end(id).unwrap();
        assert_eq!(session.len(), 1);
        assert!(store.is_empty());
        assert!(matches!(store.history(id), Err(SapaError::SessionNotFound(_))));
        assert!(store.end(id).is_err());
    }

    #[test]
    fn test_evict_expired() {
        let store = SessionStore::new(SessionPolicy {
            idle_timeout: Some(Duration::from_secs(60)),
        });
        let id = store.create();
        assert_eq!(store.evict_expired(Utc::now()), 0);
        assert_eq!(store.evict_expired(Utc::now() + chrono::Duration::seconds(120)), 1);
        assert!(store.get(id).is_err());
    }

    #[test]
    fn test_never_expire_policy() {
        let store = SessionStore::default();
        store.create();
        assert_eq!(store.evict_expired(Utc::now() + chrono::Duration::days(365)), 0);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_session_id_parse() {
        let id = SessionId::new();
        let parsed: SessionId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);

        let err = "not-a-uuid".parse::<SessionId>().unwrap_err();
        assert!(matches!(err, SapaError::Other(_)));
        assert!(err.to_string().contains("invalid session id 'not-a-uuid'"));
    }
}
