// SPDX-License-Identifier: MIT OR Apache-2.0

//! Live connections and per-user session state
//!
//! Identity is stable; the connection handle behind it is swapped on
//! reconnect. Events already queued on a replaced connection stay in that
//! connection's channel.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use crate::events::{Outbound, ServerEvent};
use crate::{MatchId, UserId};

/// Authenticated user as supplied by the identity provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: UserId,
    pub display_name: String,
    pub profile_picture: Option<String>,
}

impl Identity {
    pub fn new(id: impl Into<UserId>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            profile_picture: None,
        }
    }
}

/// Send capability for one client connection
#[derive(Debug, Clone)]
pub struct Connection {
    id: Uuid,
    tx: mpsc::UnboundedSender<ServerEvent>,
}

impl Connection {
    /// New connection plus the receiving end the transport drains
    pub fn open() -> (Self, mpsc::UnboundedReceiver<ServerEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                id: Uuid::new_v4(),
                tx,
            },
            rx,
        )
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Queue an event; false when the receiver is gone
    pub fn send(&self, event: ServerEvent) -> bool {
        self.tx.send(event).is_ok()
    }
}

/// State kept for each user the process has seen
#[derive(Debug, Clone)]
pub struct UserSession {
    pub identity: Identity,
    pub connection: Option<Connection>,
    pub active_match: Option<MatchId>,
    pub active_replay: Option<MatchId>,
}

/// Maps user id to the current connection and session state
#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<UserId, UserSession>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `connection` as the user's current connection, replacing any
    /// previous one. Returns the match the user was active in.
    pub async fn attach(&self, identity: Identity, connection: Connection) -> Option<MatchId> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .entry(identity.id.clone())
            .or_insert_with(|| UserSession {
                identity: identity.clone(),
                connection: None,
                active_match: None,
                active_replay: None,
            });

        if let Some(previous) = session.connection.replace(connection) {
            tracing::debug!(user_id = %identity.id, stale = %previous.id(), "Replacing connection");
        }
        session.identity = identity;
        session.active_match.clone()
    }

    /// Drop the user's connection if it is still `connection_id`. Returns the
    /// match the user was active in when the connection was current.
    pub async fn detach(&self, user_id: &str, connection_id: Uuid) -> Option<MatchId> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(user_id)?;
        if session.connection.as_ref().map(Connection::id) != Some(connection_id) {
            tracing::debug!(user_id, "Ignoring disconnect of a replaced connection");
            return None;
        }
        session.connection = None;
        session.active_match.clone()
    }

    /// Record a match the user belongs to before they have connected
    pub async fn remember(&self, identity: Identity, match_id: MatchId) {
        let mut sessions = self.sessions.write().await;
        sessions
            .entry(identity.id.clone())
            .or_insert_with(|| UserSession {
                identity,
                connection: None,
                active_match: None,
                active_replay: None,
            })
            .active_match = Some(match_id);
    }

    pub async fn identity(&self, user_id: &str) -> Option<Identity> {
        let sessions = self.sessions.read().await;
        sessions.get(user_id).map(|s| s.identity.clone())
    }

    pub async fn active_match(&self, user_id: &str) -> Option<MatchId> {
        let sessions = self.sessions.read().await;
        sessions.get(user_id).and_then(|s| s.active_match.clone())
    }

    pub async fn set_active_match(&self, user_id: &str, match_id: Option<MatchId>) {
        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.get_mut(user_id) {
            session.active_match = match_id;
        }
    }

    /// Clear the active match only if it is still `match_id`
    pub async fn clear_active_match(&self, user_id: &str, match_id: &str) {
        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.get_mut(user_id) {
            if session.active_match.as_deref() == Some(match_id) {
                session.active_match = None;
            }
        }
    }

    pub async fn active_replay(&self, user_id: &str) -> Option<MatchId> {
        let sessions = self.sessions.read().await;
        sessions.get(user_id).and_then(|s| s.active_replay.clone())
    }

    pub async fn set_active_replay(&self, user_id: &str, match_id: MatchId) {
        let mut sessions = self.sessions.write().await;
        if let Some(session) = sessions.get_mut(user_id) {
            session.active_replay = Some(match_id);
        }
    }

    /// Send to one user's current connection; dropped when offline
    pub async fn send(&self, user_id: &str, event: ServerEvent) {
        let sessions = self.sessions.read().await;
        match sessions.get(user_id).and_then(|s| s.connection.as_ref()) {
            Some(connection) => {
                if !connection.send(event) {
                    tracing::debug!(user_id, "Connection receiver closed");
                }
            }
            None => tracing::debug!(user_id, "No live connection, dropping event"),
        }
    }

    /// Deliver a batch in order
    pub async fn dispatch(&self, outbound: Vec<Outbound>) {
        for Outbound { to, event } in outbound {
            self.send(&to, event).await;
        }
    }
}
