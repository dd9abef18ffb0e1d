use std::sync::Arc;

use crate::config::ConnectionConfig;
use crate::ws::{Broadcaster, ConnectionRegistry};

/// Shared application state passed to all handlers via axum State extractor.
/// Created once at startup; lives as long as the server.
#[derive(Clone)]
pub struct AppState {
    /// Live sessions, keyed by session id
    pub registry: Arc<ConnectionRegistry>,
    /// Fan-out over `registry`
    pub broadcaster: Broadcaster,
    /// Per-connection limits
    pub connection: Arc<ConnectionConfig>,
}

impl AppState {
    pub fn new(connection: ConnectionConfig) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        Self {
            broadcaster: Broadcaster::new(registry.clone()),
            registry,
            connection: Arc::new(connection),
        }
    }
}
