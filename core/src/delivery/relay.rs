//! Process-wide push channel
//!
//! One logical channel; every attached subscriber sees every delivery
//! published after it attached. There is no replay, and a subscriber that
//! falls more than `capacity` events behind skips what it missed.

use std::sync::atomic::{AtomicU64, Ordering};

use chime_types::{Delivery, PushMessage, SessionStatus};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

pub struct BroadcastRelay {
    tx: broadcast::Sender<Delivery>,
    sessions: AtomicU64,
}

impl BroadcastRelay {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            sessions: AtomicU64::new(0),
        }
    }

    /// Attach a subscriber. Its first message is always `status`.
    pub fn attach(&self) -> Subscription {
        let n = self.sessions.fetch_add(1, Ordering::Relaxed) + 1;
        let id = format!("session-{n}");
        tracing::debug!(session = %id, subscribers = self.tx.receiver_count() + 1, "Subscriber attached");
        Subscription {
            status: Some(SessionStatus {
                connected: true,
                id: id.clone(),
            }),
            id,
            rx: self.tx.subscribe(),
        }
    }

    /// Send to everyone currently attached. Returns how many subscribers
    /// received it; zero is not an error.
    pub fn publish(&self, delivery: Delivery) -> usize {
        match self.tx.send(delivery) {
            Ok(receivers) => receivers,
            Err(_) => {
                tracing::debug!(id = %delivery.id, "No push subscribers attached");
                0
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// One attached subscriber's view of the relay
pub struct Subscription {
    id: String,
    status: Option<SessionStatus>,
    rx: broadcast::Receiver<Delivery>,
}

impl Subscription {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Next message for this subscriber, `None` once the relay is gone
    pub async fn next(&mut self) -> Option<PushMessage> {
        if let Some(status) = self.status.take() {
            return Some(PushMessage::Status(status));
        }
        loop {
            match self.rx.recv().await {
                Ok(delivery) => return Some(PushMessage::TriggerSound(delivery)),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(session = %self.id, skipped, "Push subscriber lagged, skipping missed amounts");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}
