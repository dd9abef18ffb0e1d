use axum::extract::ws::Message;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::mpsc;

/// Sender half of a connection's outbound queue.
/// The connection's writer task owns the receiving end and drains it into the
/// socket; a stuck socket is bounded by the writer's send timeout, not here.
pub type ConnectionSender = mpsc::UnboundedSender<Message>;

/// Process-unique session identifier. Starts at 1 and is never reused.
pub type SessionId = u64;

/// Identity of one connected client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: SessionId,
    pub display_name: String,
}

impl Session {
    fn new(id: SessionId) -> Self {
        Self {
            id,
            display_name: format!("Client {}", id),
        }
    }
}

/// Registry slot: the session record plus the connection it was issued to.
pub(crate) struct SessionEntry {
    pub(crate) session: Session,
    pub(crate) sender: ConnectionSender,
}

impl SessionEntry {
    /// A connection is open while its writer task still holds the receiver.
    pub(crate) fn is_open(&self) -> bool {
        !self.sender.is_closed()
    }
}

#[derive(Default)]
pub(crate) struct SessionTable {
    last_id: SessionId,
    pub(crate) entries: HashMap<SessionId, SessionEntry>,
}

/// Tracks every live session, keyed by session id.
///
/// A single `RwLock` guards the table: register/unregister take the write side,
/// fan-out holds the read side for the whole iteration, so a broadcast never
/// observes a half-applied connect or disconnect.
#[derive(Default)]
pub struct ConnectionRegistry {
    table: RwLock<SessionTable>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh id for `sender` and store the association.
    pub fn register(&self, sender: ConnectionSender) -> Session {
        self.register_with(sender, |_| None)
    }

    /// Like `register`, but `greeting` is queued on the new connection while
    /// the table is still write-locked, so it precedes every broadcast the
    /// session can receive.
    pub fn register_with(
        &self,
        sender: ConnectionSender,
        greeting: impl FnOnce(&Session) -> Option<Message>,
    ) -> Session {
        let mut table = self.write();
        table.last_id += 1;
        let session = Session::new(table.last_id);

        if let Some(frame) = greeting(&session) {
            if sender.send(frame).is_err() {
                tracing::debug!(session_id = session.id, "Connection closed before greeting");
            }
        }

        table.entries.insert(
            session.id,
            SessionEntry {
                session: session.clone(),
                sender,
            },
        );

        tracing::debug!(
            session_id = session.id,
            sessions = table.entries.len(),
            "Session registered"
        );
        session
    }

    /// Resolve the session for an id, if it is still registered.
    pub fn lookup(&self, id: SessionId) -> Option<Session> {
        self.read().entries.get(&id).map(|entry| entry.session.clone())
    }

    /// Remove a session. Returns the removed record, or `None` when the id
    /// was already gone; calling this twice is harmless.
    pub fn unregister(&self, id: SessionId) -> Option<Session> {
        let mut table = self.write();
        let removed = table.entries.remove(&id).map(|entry| entry.session);

        if removed.is_some() {
            tracing::debug!(
                session_id = id,
                sessions = table.entries.len(),
                "Session unregistered"
            );
        }
        removed
    }

    /// Number of live sessions.
    pub fn size(&self) -> usize {
        self.read().entries.len()
    }

    /// Shared view of the table, held for the duration of a fan-out.
    pub(crate) fn read(&self) -> RwLockReadGuard<'_, SessionTable> {
        self.table.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionTable> {
        self.table.write().unwrap_or_else(PoisonError::into_inner)
    }
}
