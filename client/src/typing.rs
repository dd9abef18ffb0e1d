//! Local typing indicator state.
//!
//! Turns raw input activity into at most one `typing: true` per burst and
//! exactly one `typing: false` when the burst ends, whether that is by
//! sending, blurring, or going idle.

use relay_protocol::ClientEvent;
use std::time::Duration;
use tokio::time::Instant;

use crate::timer::Deadline;

/// How long the input may sit untouched before typing is considered over.
pub const DEFAULT_TYPING_IDLE: Duration = Duration::from_millis(2000);

#[derive(Debug)]
pub struct TypingTracker {
    idle: Duration,
    typing: bool,
    idle_deadline: Deadline,
}

impl Default for TypingTracker {
    fn default() -> Self {
        Self::new(DEFAULT_TYPING_IDLE)
    }
}

impl TypingTracker {
    pub fn new(idle: Duration) -> Self {
        Self {
            idle,
            typing: false,
            idle_deadline: Deadline::default(),
        }
    }

    pub fn is_typing(&self) -> bool {
        self.typing
    }

    pub fn idle_deadline(&self) -> &Deadline {
        &self.idle_deadline
    }

    /// Input content changed. Non-blank content starts (or extends) a typing
    /// burst; clearing the input ends it.
    pub fn on_input(&mut self, content: &str, now: Instant) -> Option<ClientEvent> {
        if content.trim().is_empty() {
            return self.stop();
        }

        self.idle_deadline.arm(now + self.idle);
        if self.typing {
            return None;
        }
        self.typing = true;
        Some(ClientEvent::typing(true))
    }

    pub fn on_send(&mut self) -> Option<ClientEvent> {
        self.stop()
    }

    pub fn on_blur(&mut self) -> Option<ClientEvent> {
        self.stop()
    }

    /// Poll the idle deadline.
    pub fn on_tick(&mut self, now: Instant) -> Option<ClientEvent> {
        if self.idle_deadline.fire_if_due(now) {
            self.stop()
        } else {
            None
        }
    }

    /// Forget all state without signalling, used when the connection drops.
    pub fn reset(&mut self) {
        self.typing = false;
        self.idle_deadline.cancel();
    }

    fn stop(&mut self) -> Option<ClientEvent> {
        self.idle_deadline.cancel();
        if !self.typing {
            return None;
        }
        self.typing = false;
        Some(ClientEvent::typing(false))
    }
}
