use std::future::Future;

use thiserror::Error;

use crate::catalogue::{AssetLoadError, Clip};

/// Errors while opening the audio output
#[derive(Debug, Error)]
pub enum AudioInitError {
    #[error("no audio output device available: {reason}")]
    NoDevice { reason: String },

    #[error("failed to open audio stream: {reason}")]
    Stream { reason: String },

    #[error("failed to start audio thread")]
    Thread(#[source] std::io::Error),
}

/// Resource initialization performed when the audio gate opens
pub trait AudioBackend: Send + Sync + 'static {
    type Player: ClipPlayer;

    /// Open the output. Runs on the async runtime, so implementations must
    /// not block while the device opens.
    fn initialize(&self) -> impl Future<Output = Result<Self::Player, AudioInitError>> + Send;
}

/// Plays a single clip, suspending until it ends or fails
pub trait ClipPlayer: Send + Sync + 'static {
    fn play(&self, clip: &Clip) -> impl Future<Output = Result<(), AssetLoadError>> + Send;

    /// Silence whatever clip is currently audible. No-op when idle.
    fn stop(&self);
}
