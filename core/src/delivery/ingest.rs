//! Ingestion: validate an amount from the producing device and fan it out
//! to the push and poll paths.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chime_types::{Delivery, DeliveryId, RawAmount};
use thiserror::Error;

use super::pull_buffer::{PullBuffer, PullBufferError};
use super::relay::BroadcastRelay;
use crate::amount::{Amount, AmountError};

#[derive(Debug, Error)]
pub enum IngestError {
    /// Rejected before entering delivery (400-class)
    #[error("invalid amount")]
    Invalid(#[source] AmountError),

    #[error("failed to buffer amount for polling")]
    Buffer(#[source] PullBufferError),
}

/// Stateless per call; safe to share across request handlers.
pub struct Ingestor {
    relay: Arc<BroadcastRelay>,
    pull: Arc<PullBuffer>,
    boot: u64,
    seq: AtomicU64,
}

impl Ingestor {
    /// `boot` is taken from the wall clock so ids from a restarted server
    /// never collide with ones a listener has already seen.
    pub fn new(relay: Arc<BroadcastRelay>, pull: Arc<PullBuffer>) -> Self {
        let boot = chrono::Utc::now().timestamp_millis().max(0) as u64;
        Self::with_boot(relay, pull, boot)
    }

    pub fn with_boot(relay: Arc<BroadcastRelay>, pull: Arc<PullBuffer>, boot: u64) -> Self {
        Self {
            relay,
            pull,
            boot,
            seq: AtomicU64::new(0),
        }
    }

    pub fn boot(&self) -> u64 {
        self.boot
    }

    fn next_id(&self) -> DeliveryId {
        DeliveryId::new(self.boot, self.seq.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// Accept one amount. Returns once it is in the pull buffer and has been
    /// published; says nothing about eventual playback.
    pub fn accept(&self, raw: Option<&RawAmount>) -> Result<Delivery, IngestError> {
        let amount = Amount::from_raw(raw).map_err(IngestError::Invalid)?;
        let delivery = Delivery {
            id: self.next_id(),
            amount: amount.value(),
        };

        self.pull.enqueue(delivery).map_err(IngestError::Buffer)?;
        let subscribers = self.relay.publish(delivery);
        tracing::info!(amount = %amount, id = %delivery.id, subscribers, "Amount received");
        Ok(delivery)
    }

    /// Re-broadcast an amount to push subscribers only (the `play-amount`
    /// client event). Not buffered for polling.
    pub fn accept_relay_only(&self, value: f64) -> Result<Delivery, IngestError> {
        let amount = Amount::positive(value).map_err(IngestError::Invalid)?;
        let delivery = Delivery {
            id: self.next_id(),
            amount: amount.value(),
        };
        let subscribers = self.relay.publish(delivery);
        tracing::info!(amount = %amount, id = %delivery.id, subscribers, "Relayed play-amount");
        Ok(delivery)
    }
}
