use tokio::time::{sleep_until, Instant};

/// A single cancellable deadline.
///
/// Arming replaces whatever was armed before, so at most one expiry is ever
/// pending and it fires at most once.
#[derive(Debug, Default, Clone, Copy)]
pub struct Deadline {
    at: Option<Instant>,
}

impl Deadline {
    pub fn arm(&mut self, at: Instant) {
        self.at = Some(at);
    }

    pub fn cancel(&mut self) {
        self.at = None;
    }

    pub fn at(&self) -> Option<Instant> {
        self.at
    }

    pub fn is_armed(&self) -> bool {
        self.at.is_some()
    }

    /// Consume the deadline if it has passed.
    pub fn fire_if_due(&mut self, now: Instant) -> bool {
        match self.at {
            Some(at) if now >= at => {
                self.at = None;
                true
            }
            _ => false,
        }
    }

    /// Resolves when the armed deadline passes; never resolves while disarmed.
    pub async fn expired(&self) {
        match self.at {
            Some(at) => sleep_until(at).await,
            None => std::future::pending::<()>().await,
        }
    }
}
