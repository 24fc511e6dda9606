//! In-memory chat session storage.
//!
//! Sessions live for the process lifetime only: created on the first message,
//! removed by explicit deletion, lost on restart. The store is an owned value
//! cloned into request state, so tests get full isolation.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Maximum characters of the first message used as the session title.
const TITLE_LEN: usize = 30;

/// A single turn in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub text: String,
    pub is_user: bool,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Create a user message timestamped now.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_user: true,
            timestamp: Utc::now(),
        }
    }

    /// Create an assistant message timestamped now.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_user: false,
            timestamp: Utc::now(),
        }
    }
}

/// A named, ordered conversation history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSession {
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    /// Fixed at creation from the first user message; never recomputed.
    pub title: String,
    pub messages: Vec<Message>,
}

impl ChatSession {
    /// Create an empty session titled after the first message.
    pub fn new(first_message: &str) -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            title: truncate_title(first_message),
            messages: Vec::new(),
        }
    }
}

/// Title is the first 30 characters of the first message, char-boundary safe.
fn truncate_title(message: &str) -> String {
    message.chars().take(TITLE_LEN).collect()
}

/// Process-wide session store.
///
/// One async RwLock over the whole map: appends take the write lock, so
/// concurrent requests against the same session serialize instead of racing.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, ChatSession>>>,
}

impl SessionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve an existing session id, or create a new session.
    ///
    /// An absent or unknown id always yields a fresh session whose title is
    /// taken from `first_message`. Returns the resolved id.
    pub async fn resolve_or_create(&self, session_id: Option<&str>, first_message: &str) -> String {
        let mut sessions = self.sessions.write().await;

        if let Some(id) = session_id {
            if sessions.contains_key(id) {
                return id.to_string();
            }
        }

        let session = ChatSession::new(first_message);
        let id = session.session_id.clone();
        sessions.insert(id.clone(), session);
        id
    }

    /// Append a message to a session.
    pub async fn append(&self, id: &str, message: Message) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(id)
            .ok_or_else(|| Error::NotFound(format!("session '{}'", id)))?;
        session.messages.push(message);
        Ok(())
    }

    /// Get the last `n` messages of a session, oldest first.
    pub async fn tail(&self, id: &str, n: usize) -> Result<Vec<Message>> {
        let sessions = self.sessions.read().await;
        let session = sessions
            .get(id)
            .ok_or_else(|| Error::NotFound(format!("session '{}'", id)))?;
        let skip = session.messages.len().saturating_sub(n);
        Ok(session.messages[skip..].to_vec())
    }

    /// Get a full session by id.
    pub async fn get(&self, id: &str) -> Result<ChatSession> {
        let sessions = self.sessions.read().await;
        sessions
            .get(id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("session '{}'", id)))
    }

    /// List all sessions, in no particular order.
    pub async fn list(&self) -> Vec<ChatSession> {
        let sessions = self.sessions.read().await;
        sessions.values().cloned().collect()
    }

    /// Delete a session. Deleting an unknown id is a no-op.
    ///
    /// Returns whether a record was actually removed.
    pub async fn delete(&self, id: &str) -> bool {
        let mut sessions = self.sessions.write().await;
        sessions.remove(id).is_some()
    }

    /// Number of sessions in the store.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Whether the store holds no sessions.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_resolve_creates_fresh_session() {
        let store = SessionStore::new();
        let id = store.resolve_or_create(None, "Hello there").await;

        // UUID v4 string form
        assert_eq!(id.len(), 36);
        let session = store.get(&id).await.unwrap();
        assert_eq!(session.title, "Hello there");
        assert!(session.messages.is_empty());
    }

    #[tokio::test]
    async fn test_resolve_unknown_id_creates_new() {
        let store = SessionStore::new();
        let id = store.resolve_or_create(Some("no-such-id"), "hi").await;
        assert_ne!(id, "no-such-id");
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_resolve_existing_id_reuses_session() {
        let store = SessionStore::new();
        let id = store.resolve_or_create(None, "first").await;
        let resolved = store.resolve_or_create(Some(&id), "second").await;

        assert_eq!(resolved, id);
        assert_eq!(store.len().await, 1);
        // Title stays fixed from the first message
        assert_eq!(store.get(&id).await.unwrap().title, "first");
    }

    #[tokio::test]
    async fn test_title_truncated_to_30_chars() {
        let store = SessionStore::new();
        let long = "a".repeat(100);
        let id = store.resolve_or_create(None, &long).await;
        assert_eq!(store.get(&id).await.unwrap().title.len(), 30);
    }

    #[test]
    fn test_title_multibyte_boundary() {
        // chars(), not bytes: must not panic mid-codepoint
        let title = truncate_title(&"é".repeat(40));
        assert_eq!(title.chars().count(), 30);
    }

    #[tokio::test]
    async fn test_append_and_tail() {
        let store = SessionStore::new();
        let id = store.resolve_or_create(None, "hi").await;

        for i in 0..10 {
            store
                .append(&id, Message::user(format!("msg {}", i)))
                .await
                .unwrap();
        }

        let tail = store.tail(&id, 6).await.unwrap();
        assert_eq!(tail.len(), 6);
        assert_eq!(tail[0].text, "msg 4");
        assert_eq!(tail[5].text, "msg 9");
    }

    #[tokio::test]
    async fn test_tail_shorter_than_window() {
        let store = SessionStore::new();
        let id = store.resolve_or_create(None, "hi").await;
        store.append(&id, Message::user("only one")).await.unwrap();

        let tail = store.tail(&id, 6).await.unwrap();
        assert_eq!(tail.len(), 1);
    }

    #[tokio::test]
    async fn test_append_unknown_session() {
        let store = SessionStore::new();
        let result = store.append("missing", Message::user("x")).await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = SessionStore::new();
        let id = store.resolve_or_create(None, "hi").await;

        assert!(store.delete(&id).await);
        assert!(!store.delete(&id).await);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_list_returns_all_sessions() {
        let store = SessionStore::new();
        store.resolve_or_create(None, "one").await;
        store.resolve_or_create(None, "two").await;

        let sessions = store.list().await;
        assert_eq!(sessions.len(), 2);
    }

    #[test]
    fn test_message_serialization_uses_rfc3339() {
        let message = Message::user("hello");
        let json = serde_json::to_string(&message).unwrap();
        assert!(json.contains("\"is_user\":true"));
        assert!(json.contains("T")); // ISO-8601 date/time separator
    }
}
