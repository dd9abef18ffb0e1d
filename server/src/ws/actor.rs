use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout};

use crate::chat::broadcast::{announce_departure, announce_join, welcome};
use crate::state::AppState;
use crate::ws::broadcast::encode_frame;
use crate::ws::protocol::{self, FrameOutcome};
use crate::ws::{ConnectionSender, Session, SessionId};

/// Lifecycle of a server-side connection. There is no way back from `Closed`;
/// reconnecting is the client's job and produces a brand new session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
}

/// Per-connection state machine.
///
/// `open`, `on_text` and `close` are the only ways a connection touches the
/// shared registry. `close` runs at most once; dropping the connection runs it
/// too, so an aborted actor still leaves the registry clean.
pub struct Connection {
    app: AppState,
    state: ConnectionState,
    session: Option<Session>,
}

impl Connection {
    pub fn new(app: &AppState) -> Self {
        Self {
            app: app.clone(),
            state: ConnectionState::Connecting,
            session: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Connecting -> Open: register, greet privately, announce to the rest,
    /// then publish the new head count.
    pub fn open(&mut self, tx: ConnectionSender) -> Option<&Session> {
        if self.state != ConnectionState::Connecting {
            return None;
        }

        let session = self
            .app
            .registry
            .register_with(tx, |session| encode_frame(&welcome(session)));
        announce_join(&self.app.broadcaster, &session);
        self.app.broadcaster.announce_user_count();

        tracing::info!(
            session_id = session.id,
            display_name = %session.display_name,
            "Client connected"
        );

        self.state = ConnectionState::Open;
        self.session = Some(session);
        self.session.as_ref()
    }

    /// Inbound text frame. Frames arriving outside `Open` are ignored.
    pub fn on_text(&self, text: &str) -> FrameOutcome {
        match (self.state, &self.session) {
            (ConnectionState::Open, Some(session)) => {
                protocol::handle_text_frame(text, session.id, &self.app)
            }
            _ => FrameOutcome::Ignored,
        }
    }

    /// Any state -> Closed. Returns false if the connection was already closed.
    pub fn close(&mut self) -> bool {
        if self.state == ConnectionState::Closed {
            return false;
        }
        self.state = ConnectionState::Closed;

        let Some(session) = self.session.take() else {
            return true;
        };

        if let Some(session) = self.app.registry.unregister(session.id) {
            tracing::info!(
                session_id = session.id,
                display_name = %session.display_name,
                "Client disconnected"
            );
            announce_departure(&self.app.broadcaster, &session);
            self.app.broadcaster.announce_user_count();
        }
        true
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}

/// Run the actor-per-connection pattern for an upgraded WebSocket.
///
/// - Writer task: owns the sink, drains the outbound queue, and gives up on
///   the connection when one write exceeds the send timeout
/// - Keepalive task: pings periodically and ends when a pong is overdue
/// - Reader loop (this task): feeds inbound frames to the state machine
///
/// Whichever of the three stops first ends the connection.
pub async fn run_connection(socket: WebSocket, app: AppState) {
    let limits = app.connection.clone();
    let (ws_sender, mut ws_receiver) = socket.split();
    let (tx, rx) = mpsc::unbounded_channel::<Message>();

    // Writer starts first so the greeting frames have somewhere to go.
    let mut writer_handle = tokio::spawn(writer_task(ws_sender, rx, limits.send_timeout()));

    let mut connection = Connection::new(&app);
    let session_id = match connection.open(tx.clone()) {
        Some(session) => session.id,
        None => return,
    };

    let (pong_tx, pong_rx) = mpsc::unbounded_channel::<()>();
    let mut keepalive_handle = tokio::spawn(keepalive_task(
        tx.clone(),
        pong_rx,
        limits.ping_interval(),
        limits.pong_timeout(),
    ));

    loop {
        tokio::select! {
            frame = ws_receiver.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    connection.on_text(text.as_str());
                }
                Some(Ok(Message::Binary(data))) => {
                    tracing::debug!(session_id, bytes = data.len(), "Ignoring binary frame");
                }
                Some(Ok(Message::Pong(_))) => {
                    if pong_tx.send(()).is_err() {
                        tracing::debug!(session_id, "Pong after keepalive stopped");
                    }
                }
                Some(Ok(Message::Ping(data))) => {
                    if tx.send(Message::Pong(data)).is_err() {
                        tracing::debug!(session_id, "Writer gone, pong not queued");
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    tracing::info!(session_id, reason = ?frame, "Client initiated close");
                    break;
                }
                Some(Err(e)) => {
                    tracing::warn!(session_id, error = %e, "WebSocket receive error");
                    break;
                }
                None => {
                    tracing::info!(session_id, "WebSocket stream ended");
                    break;
                }
            },
            _ = &mut writer_handle => {
                tracing::debug!(session_id, "Writer stopped, closing connection");
                keepalive_handle.abort();
                connection.close();
                return;
            }
            _ = &mut keepalive_handle => {
                tracing::warn!(session_id, "Keepalive expired, closing connection");
                break;
            }
        }
    }

    keepalive_handle.abort();
    connection.close();
    drop(tx);
    drain_writer(writer_handle, limits.send_timeout(), session_id).await;
}

/// Give the writer one send timeout to flush what is already queued, such as
/// a close frame from the keepalive. Unregistering and dropping the local
/// sender let its queue run dry.
async fn drain_writer(mut writer: JoinHandle<()>, limit: Duration, session_id: SessionId) {
    if timeout(limit, &mut writer).await.is_err() {
        tracing::debug!(session_id, "Writer did not drain in time");
        writer.abort();
    }
}

/// Writer task: receives frames from the outbound queue and forwards them to the sink.
async fn writer_task(
    mut ws_sender: SplitSink<WebSocket, Message>,
    mut rx: mpsc::UnboundedReceiver<Message>,
    send_timeout: Duration,
) {
    while let Some(msg) = rx.recv().await {
        let closing = matches!(msg, Message::Close(_));
        match timeout(send_timeout, ws_sender.send(msg)).await {
            Ok(Ok(())) if closing => break,
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::debug!(error = %e, "WebSocket send failed");
                break;
            }
            Err(_) => {
                tracing::warn!(timeout_ms = send_timeout.as_millis() as u64, "WebSocket send timed out");
                break;
            }
        }
    }
}

/// Keepalive task: returns when the peer misses a pong deadline or the
/// connection's queue is gone.
async fn keepalive_task(
    tx: ConnectionSender,
    mut pong_rx: mpsc::UnboundedReceiver<()>,
    every: Duration,
    deadline: Duration,
) {
    let mut ping_timer = interval(every.max(Duration::from_millis(1)));
    // Skip the first immediate tick
    ping_timer.tick().await;

    loop {
        ping_timer.tick().await;

        // Discard pongs that answered earlier pings.
        while pong_rx.try_recv().is_ok() {}

        if tx.send(Message::Ping(vec![1, 2, 3, 4].into())).is_err() {
            return;
        }

        match timeout(deadline, pong_rx.recv()).await {
            Ok(Some(())) => {}
            _ => {
                let close = Message::Close(Some(CloseFrame {
                    code: 1001,
                    reason: "Pong timeout".into(),
                }));
                if tx.send(close).is_err() {
                    tracing::debug!("Writer gone before pong timeout close");
                }
                return;
            }
        }
    }
}
