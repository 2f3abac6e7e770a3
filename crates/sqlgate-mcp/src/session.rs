//! Session registry: one entry per open streaming connection.
//!
//! A session binds an opaque id to a target database, a permission grant
//! and the push channel for its event stream. Sessions are immutable once
//! created; routing changes mean a new session. Removal happens exactly
//! once, driven by the transport's close notification, and closing an
//! unknown id is a no-op.

use crate::protocol::SseEvent;
use sqlgate_core::permissions::Grant;
use std::collections::HashMap;
use tokio::sync::{RwLock, mpsc};

/// One open streaming session.
#[derive(Debug, Clone)]
pub struct Session {
    pub database_url: String,
    pub grant: Grant,
    /// Push handle for the session's stream. The receiving side is owned
    /// by the transport; sends fail once the stream is closed.
    pub events: mpsc::Sender<SseEvent>,
}

/// Registry of open sessions, keyed by opaque session id.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Session>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new session and return its id.
    pub async fn open(
        &self,
        database_url: impl Into<String>,
        grant: Grant,
        events: mpsc::Sender<SseEvent>,
    ) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        self.sessions.write().await.insert(
            id.clone(),
            Session {
                database_url: database_url.into(),
                grant,
                events,
            },
        );
        id
    }

    /// Look up a session. Pure read.
    pub async fn resolve(&self, id: &str) -> Option<Session> {
        self.sessions.read().await.get(id).cloned()
    }

    /// Remove a session. Idempotent: unknown ids are a no-op.
    pub async fn close(&self, id: &str) {
        self.sessions.write().await.remove(id);
    }

    /// Some open session, for clients that omit the id.
    ///
    /// Best-effort compatibility only: under multiple concurrent sessions
    /// the choice is arbitrary and callers should pass an explicit id.
    pub async fn first_available(&self) -> Option<String> {
        self.sessions.read().await.keys().next().cloned()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
