//! Error types for push and poll transports

use thiserror::Error;

/// Failures on either delivery path. Never fatal: the owning loop logs and
/// retries on its next tick.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to connect to {url}: {reason}")]
    Connect { url: String, reason: String },

    #[error("connection closed: {reason}")]
    Closed { reason: String },

    #[error("request to {url} failed: {reason}")]
    Request { url: String, reason: String },

    #[error("unexpected status {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("failed to decode message: {reason}")]
    Decode { reason: String },
}
