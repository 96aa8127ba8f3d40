use std::sync::Mutex;

use chime_types::Delivery;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PullBufferError {
    #[error("pull buffer lock poisoned")]
    Poisoned,
}

/// FIFO of deliveries awaiting a polling listener.
///
/// `enqueue` and `drain_all` serialize on one lock, so a drain returns either
/// all or none of a concurrent append.
#[derive(Debug, Default)]
pub struct PullBuffer {
    pending: Mutex<Vec<Delivery>>,
}

impl PullBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&self, delivery: Delivery) -> Result<(), PullBufferError> {
        let mut pending = self.pending.lock().map_err(|_| PullBufferError::Poisoned)?;
        pending.push(delivery);
        Ok(())
    }

    /// Take the full contents and leave the buffer empty in one step
    pub fn drain_all(&self) -> Result<Vec<Delivery>, PullBufferError> {
        let mut pending = self.pending.lock().map_err(|_| PullBufferError::Poisoned)?;
        Ok(std::mem::take(&mut *pending))
    }

    pub fn len(&self) -> usize {
        self.pending.lock().map(|p| p.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
