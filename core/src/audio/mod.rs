//! Audio output
//!
//! The gate initializes an [`AudioBackend`] once, after a user gesture; the
//! resulting [`ClipPlayer`] plays one clip at a time to completion.

mod backend;
mod rodio_backend;

pub use backend::{AudioBackend, AudioInitError, ClipPlayer};
pub use rodio_backend::{RodioBackend, RodioPlayer};
