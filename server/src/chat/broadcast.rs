//! Chat-level announcements built on top of the raw broadcaster.
//! Each helper builds one event and picks its audience.

use relay_protocol::ServerEvent;

use crate::ws::{Broadcaster, Delivery, Session};

/// Private greeting for a freshly opened connection. It is queued during
/// registration, see `ConnectionRegistry::register_with`.
pub fn welcome(session: &Session) -> ServerEvent {
    ServerEvent::system(format!("Welcome! You are {}", session.display_name))
}

/// Tell everyone else that `session` arrived.
pub fn announce_join(broadcaster: &Broadcaster, session: &Session) -> Delivery {
    let event = ServerEvent::system(format!("{} joined the chat", session.display_name));
    broadcaster.broadcast(&event, Some(session.id))
}

/// Tell the remaining connections that `session` left.
pub fn announce_departure(broadcaster: &Broadcaster, session: &Session) -> Delivery {
    let event = ServerEvent::system(format!("{} disconnected", session.display_name));
    broadcaster.broadcast(&event, None)
}

/// Relay a chat message to every connection, the author included.
/// Clients render their own messages only from this echo.
pub fn relay_chat(broadcaster: &Broadcaster, sender: &Session, message: String) -> Delivery {
    let event = ServerEvent::chat(sender.display_name.clone(), message);
    broadcaster.broadcast(&event, None)
}

/// Relay a typing signal to everyone except its author.
pub fn relay_typing(broadcaster: &Broadcaster, sender: &Session, is_typing: bool) -> Delivery {
    let event = ServerEvent::typing(sender.display_name.clone(), is_typing);
    broadcaster.broadcast(&event, Some(sender.id))
}
