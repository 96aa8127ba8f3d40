//! Core of the chime amount announcer
//!
//! This crate provides:
//! - **Decomposition**: amount to spoken-token sequence (Indian numbering)
//! - **Playback**: audio gate, pending queue and the serial token sequencer
//! - **Delivery**: ingestion, broadcast relay, pull buffer, and the listener-side
//!   connection supervisor and poller

pub mod amount;
pub mod audio;
pub mod catalogue;
pub mod config;
pub mod decompose;
pub mod delivery;
pub mod playback;
pub mod token;

// Re-exports for convenience
pub use amount::{Amount, AmountError};
pub use audio::{AudioBackend, AudioInitError, ClipPlayer, RodioBackend};
pub use catalogue::{AssetLoadError, Clip, SoundCatalogue};
pub use config::{ChimeConfigExt, ConfigError};
pub use decompose::{TokenSequence, decompose, decompose_amount};
pub use delivery::{
    BroadcastRelay, ConnectionState, ConnectionSupervisor, IngestError, Ingestor, Poller,
    PullBuffer, PullBufferError, PullSource, PushConnector, PushEvent, Subscription,
    TransportError,
};
pub use playback::{
    ActivityLog, AudioGate, GateState, PendingQueue, PlaybackCommand, PlaybackError,
    PlaybackEvent, PlaybackHandle, PlaybackOptions, PlaybackService, PlaybackSnapshot,
    PlaybackState, SequenceError, SequenceOutcome, SequenceState, Sequencer,
};
pub use token::SoundToken;

pub use chime_types::{Delivery, DeliveryId};
