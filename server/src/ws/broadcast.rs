use axum::extract::ws::Message;
use relay_protocol::{Frame, ServerEvent};
use std::sync::Arc;

use super::registry::{ConnectionRegistry, SessionEntry, SessionId};

/// Per-call delivery tally. Informational only; a broadcast never fails.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    /// Frames queued for a recipient's writer.
    pub delivered: usize,
    /// Recipients whose connection was no longer open.
    pub skipped: usize,
}

/// Fans server events out to registered connections.
#[derive(Clone)]
pub struct Broadcaster {
    registry: Arc<ConnectionRegistry>,
}

impl Broadcaster {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Serialize `event` once and offer it to every open connection except `exclude`.
    pub fn broadcast(&self, event: &ServerEvent, exclude: Option<SessionId>) -> Delivery {
        let Some(frame) = encode_frame(event) else {
            return Delivery::default();
        };

        let table = self.registry.read();
        let delivery = fan_out(table.entries.values(), &frame, exclude);

        tracing::debug!(
            kind = event.kind(),
            delivered = delivery.delivered,
            skipped = delivery.skipped,
            "Broadcast"
        );
        delivery
    }

    /// Broadcast the current session count to everyone.
    ///
    /// The count is read under the same guard used for the fan-out, so no
    /// connect or disconnect can slip in between counting and sending.
    pub fn announce_user_count(&self) -> Delivery {
        let table = self.registry.read();
        let event = ServerEvent::user_count(table.entries.len());
        let Some(frame) = encode_frame(&event) else {
            return Delivery::default();
        };

        let delivery = fan_out(table.entries.values(), &frame, None);
        tracing::debug!(
            count = table.entries.len(),
            delivered = delivery.delivered,
            "User count announced"
        );
        delivery
    }
}

fn fan_out<'a>(
    entries: impl Iterator<Item = &'a SessionEntry>,
    frame: &Message,
    exclude: Option<SessionId>,
) -> Delivery {
    let mut delivery = Delivery::default();

    for entry in entries {
        if Some(entry.session.id) == exclude {
            continue;
        }
        if offer(entry, frame) {
            delivery.delivered += 1;
        } else {
            delivery.skipped += 1;
        }
    }

    delivery
}

/// Non-blocking hand-off to one connection's writer. Fails only when the
/// writer has already gone away.
fn offer(entry: &SessionEntry, frame: &Message) -> bool {
    if !entry.is_open() {
        return false;
    }
    entry.sender.send(frame.clone()).is_ok()
}

/// Encode an event as a WebSocket text frame, logging encode failures.
pub(crate) fn encode_frame(event: &ServerEvent) -> Option<Message> {
    match event.encode() {
        Ok(json) => Some(Message::Text(json.into())),
        Err(e) => {
            tracing::error!(kind = event.kind(), error = %e, "Failed to encode event");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ws::registry::Session;
    use tokio::sync::mpsc;

    struct Peer {
        session: Session,
        rx: mpsc::UnboundedReceiver<Message>,
    }

    impl Peer {
        fn frames(&mut self) -> Vec<ServerEvent> {
            let mut out = Vec::new();
            while let Ok(msg) = self.rx.try_recv() {
                match msg {
                    Message::Text(text) => {
                        out.push(ServerEvent::decode(text.as_str()).unwrap().unwrap())
                    }
                    other => panic!("Expected text frame, got: {:?}", other),
                }
            }
            out
        }
    }

    fn setup(peers: usize) -> (Broadcaster, Arc<ConnectionRegistry>, Vec<Peer>) {
        let registry = Arc::new(ConnectionRegistry::new());
        let peers = (0..peers)
            .map(|_| {
                let (tx, rx) = mpsc::unbounded_channel();
                Peer {
                    session: registry.register(tx),
                    rx,
                }
            })
            .collect();
        (Broadcaster::new(registry.clone()), registry, peers)
    }

    #[test]
    fn test_broadcast_reaches_everyone_without_exclusion() {
        let (broadcaster, _registry, mut peers) = setup(3);

        let delivery = broadcaster.broadcast(&ServerEvent::chat("Client 1", "hello"), None);
        assert_eq!(delivery.delivered, 3);

        for peer in peers.iter_mut() {
            let frames = peer.frames();
            assert_eq!(frames.len(), 1);
            assert!(matches!(&frames[0], ServerEvent::Chat { message, .. } if message == "hello"));
        }
    }

    #[test]
    fn test_broadcast_skips_excluded_connection() {
        let (broadcaster, _registry, mut peers) = setup(3);
        let excluded = peers[0].session.id;

        let delivery = broadcaster.broadcast(&ServerEvent::typing("Client 1", true), Some(excluded));
        assert_eq!(delivery.delivered, 2);

        assert!(peers[0].frames().is_empty());
        assert_eq!(peers[1].frames().len(), 1);
        assert_eq!(peers[2].frames().len(), 1);
    }

    #[test]
    fn test_closed_connection_is_skipped_silently() {
        let (broadcaster, registry, mut peers) = setup(3);
        let gone = peers.remove(1);
        drop(gone.rx);

        let delivery = broadcaster.broadcast(&ServerEvent::system("hi"), None);
        assert_eq!(delivery.delivered, 2);
        assert_eq!(delivery.skipped, 1);
        // Skipping never touches the registry; the close path owns removal.
        assert_eq!(registry.size(), 3);
    }

    #[test]
    fn test_idle_recipient_keeps_every_frame() {
        let (broadcaster, registry, mut peers) = setup(2);

        // Peer 0 never drains while the room churns; peer 1 keeps up.
        for n in 1..=200 {
            broadcaster.broadcast(&ServerEvent::system(format!("notice {}", n)), None);
            broadcaster.announce_user_count();
            assert_eq!(peers[1].frames().len(), 2);
        }
        let extra = registry.register(mpsc::unbounded_channel().0);
        let delivery = broadcaster.announce_user_count();
        assert_eq!(delivery.delivered, 2);
        assert_eq!(delivery.skipped, 1);
        registry.unregister(extra.id);

        let backlog = peers[0].frames();
        assert_eq!(backlog.len(), 401);
        assert_eq!(backlog.last(), Some(&ServerEvent::user_count(3)));
    }

    #[test]
    fn test_announce_user_count_reports_registry_size() {
        let (broadcaster, registry, mut peers) = setup(4);

        broadcaster.announce_user_count();
        for peer in peers.iter_mut() {
            assert_eq!(peer.frames(), vec![ServerEvent::user_count(4)]);
        }

        registry.unregister(peers[0].session.id);
        broadcaster.announce_user_count();
        assert!(peers[0].frames().is_empty());
        for peer in peers.iter_mut().skip(1) {
            assert_eq!(peer.frames(), vec![ServerEvent::user_count(3)]);
        }
    }
}
