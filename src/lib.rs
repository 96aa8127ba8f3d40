//! chime: spoken announcement of payment amounts
//!
//! - `server`: ingestion endpoint, push channel and pull endpoint (axum)
//! - `listener`: push/poll clients feeding the playback service, plus console
//! - `logging`: file + stdout tracing setup

pub mod listener;
pub mod logging;
pub mod server;
