//! Playback side of a listener session
//!
//! This module provides:
//! - **AudioGate**: closed until a user gesture initializes audio output
//! - **PendingQueue**: FIFO backlog of amounts awaiting playback
//! - **Sequencer**: plays one token sequence serially with fixed spacing
//! - **PlaybackService**: single task owning all of the above; every queue
//!   mutation is serialized through its command channel

mod activity;
mod gate;
mod queue;
mod sequencer;
mod service;

#[cfg(test)]
mod service_tests;

pub use activity::ActivityLog;
pub use gate::{AudioGate, GateState};
pub use queue::{DedupeWindow, PendingQueue};
pub use sequencer::{SequenceError, SequenceState, Sequencer};
pub use service::{
    PlaybackCommand, PlaybackError, PlaybackEvent, PlaybackHandle, PlaybackOptions,
    PlaybackService, PlaybackSnapshot, PlaybackState, SequenceOutcome,
};
