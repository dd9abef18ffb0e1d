use relay_protocol::{ClientEvent, Frame};

use crate::chat::broadcast::{relay_chat, relay_typing};
use crate::state::AppState;
use crate::ws::{Delivery, SessionId};

/// What became of one inbound text frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// The event was fanned out.
    Relayed(Delivery),
    /// Not parseable as a client event; dropped.
    Malformed,
    /// Well-formed, but a `type` this server does not handle.
    Ignored,
    /// The sender's session is no longer registered.
    UnknownSender,
}

/// Handle an incoming text frame: decode, classify, and relay.
///
/// Never sends anything back to the originating client on failure and never
/// changes the connection's state.
pub fn handle_text_frame(text: &str, session_id: SessionId, state: &AppState) -> FrameOutcome {
    let event = match ClientEvent::decode(text) {
        Ok(Some(event)) => event,
        Ok(None) => {
            tracing::debug!(session_id, "Ignoring frame with unknown type");
            return FrameOutcome::Ignored;
        }
        Err(e) => {
            tracing::warn!(
                session_id,
                error = %e,
                "Failed to parse inbound frame: {}",
                text.chars().take(100).collect::<String>()
            );
            return FrameOutcome::Malformed;
        }
    };

    // Only reachable when a frame races the connection's own close.
    let Some(sender) = state.registry.lookup(session_id) else {
        tracing::warn!(session_id, kind = event.kind(), "Dropping frame from unknown session");
        return FrameOutcome::UnknownSender;
    };

    let delivery = match event {
        ClientEvent::Chat { message } => relay_chat(&state.broadcaster, &sender, message),
        ClientEvent::Typing { is_typing } => relay_typing(&state.broadcaster, &sender, is_typing),
    };

    FrameOutcome::Relayed(delivery)
}
