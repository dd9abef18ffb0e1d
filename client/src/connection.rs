//! Connection lifecycle: connect at startup, then retry forever after a
//! fixed delay whenever the session ends or an attempt fails.

use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::sleep;

use crate::error::ClientError;

pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionStatus {
    pub fn is_connected(self) -> bool {
        self == Self::Connected
    }
}

/// One way of reaching the server.
///
/// `connect` establishes a transport, `serve` drives it until it closes.
/// Returning from `serve`, successfully or not, means the session is over.
pub trait Connector {
    type Connection;

    fn connect(&mut self) -> impl Future<Output = Result<Self::Connection, ClientError>>;

    fn serve(&mut self, connection: Self::Connection)
        -> impl Future<Output = Result<(), ClientError>>;

    /// Called on every status transition, before observers see it.
    fn on_status(&mut self, _status: ConnectionStatus) {}
}

/// Fixed-delay reconnect loop with an observable status.
pub struct Reconnector {
    delay: Duration,
    status: watch::Sender<ConnectionStatus>,
}

impl Reconnector {
    pub fn new(delay: Duration) -> Self {
        let (status, _) = watch::channel(ConnectionStatus::Disconnected);
        Self { delay, status }
    }

    pub fn subscribe(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.subscribe()
    }

    pub fn status(&self) -> ConnectionStatus {
        *self.status.borrow()
    }

    /// Runs until the future is dropped.
    pub async fn run<C: Connector>(&self, connector: &mut C) {
        let mut attempt: u64 = 0;
        loop {
            attempt += 1;
            self.transition(connector, ConnectionStatus::Connecting);

            match connector.connect().await {
                Ok(connection) => {
                    self.transition(connector, ConnectionStatus::Connected);
                    match connector.serve(connection).await {
                        Ok(()) => tracing::info!("Connection closed"),
                        Err(e) => tracing::warn!(error = %e, "Connection lost"),
                    }
                }
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "Connection attempt failed");
                }
            }

            self.transition(connector, ConnectionStatus::Disconnected);
            tracing::info!(delay_ms = self.delay.as_millis() as u64, "Reconnecting after delay");
            sleep(self.delay).await;
        }
    }

    fn transition<C: Connector>(&self, connector: &mut C, next: ConnectionStatus) {
        let previous = self.status();
        if previous == next {
            return;
        }
        tracing::debug!(?previous, ?next, "Connection status changed");
        connector.on_status(next);
        self.status.send_replace(next);
    }
}
