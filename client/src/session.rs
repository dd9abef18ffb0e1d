//! A single WebSocket session: renders server events and turns local input
//! into chat and typing frames.

use futures_util::{SinkExt, StreamExt};
use relay_protocol::{ClientEvent, Frame, ServerEvent};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::connection::{ConnectionStatus, Connector};
use crate::error::ClientError;
use crate::roster::TypingRoster;
use crate::typing::TypingTracker;
use crate::view::ChatView;

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Local input activity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    /// The input now holds this content.
    Changed(String),
    /// The user asked to send this content.
    Submit(String),
    /// The input lost focus.
    Blur,
}

pub struct WsConnector<V> {
    url: String,
    input: mpsc::Receiver<InputEvent>,
    view: V,
    typing: TypingTracker,
    roster: TypingRoster,
}

impl<V: ChatView> WsConnector<V> {
    pub fn new(
        url: impl Into<String>,
        typing_idle: Duration,
        input: mpsc::Receiver<InputEvent>,
        view: V,
    ) -> Self {
        Self {
            url: url.into(),
            input,
            view,
            typing: TypingTracker::new(typing_idle),
            roster: TypingRoster::default(),
        }
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    fn handle_frame(&mut self, text: &str) {
        let event = match ServerEvent::decode(text) {
            Ok(Some(event)) => event,
            Ok(None) => {
                tracing::debug!("Ignoring unknown event type");
                return;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring malformed frame");
                return;
            }
        };

        match event {
            ServerEvent::System { message, timestamp } => self.view.system(&message, timestamp),
            ServerEvent::Chat {
                sender,
                message,
                timestamp,
            } => self.view.chat(&sender, &message, timestamp),
            ServerEvent::UserCount { count } => self.view.user_count(count),
            ServerEvent::Typing { sender, is_typing } => {
                self.roster.apply(&sender, is_typing);
                let summary = self.roster.summary();
                self.view.typing(&summary);
            }
        }
    }

    /// Frames to send in response to one input event, in order.
    fn handle_input(&mut self, input: InputEvent) -> Vec<ClientEvent> {
        let now = Instant::now();
        match input {
            InputEvent::Changed(content) => self.typing.on_input(&content, now).into_iter().collect(),
            InputEvent::Submit(content) => {
                let message = content.trim();
                if message.is_empty() {
                    return Vec::new();
                }
                let mut out = vec![ClientEvent::chat(message)];
                out.extend(self.typing.on_send());
                out
            }
            InputEvent::Blur => self.typing.on_blur().into_iter().collect(),
        }
    }
}

async fn send_event(ws: &mut WsStream, event: &ClientEvent) -> Result<(), ClientError> {
    let text = event.encode()?;
    ws.send(Message::Text(text.into()))
        .await
        .map_err(ClientError::Transport)
}

impl<V: ChatView> Connector for WsConnector<V> {
    type Connection = WsStream;

    async fn connect(&mut self) -> Result<WsStream, ClientError> {
        tracing::info!(url = %self.url, "Connecting");
        let (ws, _response) = connect_async(self.url.as_str())
            .await
            .map_err(|source| ClientError::Connect {
                url: self.url.clone(),
                source,
            })?;
        Ok(ws)
    }

    async fn serve(&mut self, mut ws: WsStream) -> Result<(), ClientError> {
        loop {
            tokio::select! {
                frame = ws.next() => match frame {
                    Some(Ok(Message::Text(text))) => self.handle_frame(text.as_str()),
                    Some(Ok(Message::Close(_))) | None => return Ok(()),
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(ClientError::Transport(e)),
                },
                Some(input) = self.input.recv() => {
                    for event in self.handle_input(input) {
                        send_event(&mut ws, &event).await?;
                    }
                }
                _ = self.typing.idle_deadline().expired() => {
                    if let Some(event) = self.typing.on_tick(Instant::now()) {
                        send_event(&mut ws, &event).await?;
                    }
                }
            }
        }
    }

    fn on_status(&mut self, status: ConnectionStatus) {
        self.view.status(status);
        if status == ConnectionStatus::Disconnected {
            self.typing.reset();
            if !self.roster.is_empty() {
                self.roster.clear();
                self.view.typing("");
            }
        }
    }
}
