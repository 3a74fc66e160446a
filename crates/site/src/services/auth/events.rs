//! In-process auth event bus.

use tokio::sync::broadcast;

use haven_core::UserId;

/// Capacity of the event channel. Slow subscribers that fall further behind
/// than this receive `RecvError::Lagged`.
const EVENT_CAPACITY: usize = 256;

/// A change to some visitor's session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn { user_id: UserId },
    SignedOut { user_id: Option<UserId> },
    TokenRefreshed { user_id: UserId },
}

/// Broadcasts [`AuthEvent`]s to every subscriber.
#[derive(Debug, Clone)]
pub struct AuthEvents {
    sender: broadcast::Sender<AuthEvent>,
}

impl Default for AuthEvents {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthEvents {
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CAPACITY);
        Self { sender }
    }

    /// Publish an event. Having no subscribers is not an error.
    pub fn publish(&self, event: AuthEvent) {
        let receivers = self.sender.send(event).unwrap_or(0);
        tracing::debug!(?event, receivers, "Auth event published");
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.sender.subscribe()
    }
}
