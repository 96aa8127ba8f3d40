//! Getting accepted amounts from the producing device to listeners
//!
//! Server side:
//! - **Ingestor**: validates an amount and hands it to both delivery paths
//! - **BroadcastRelay**: push path, live subscribers only
//! - **PullBuffer**: poll path, drained atomically per poll
//!
//! Listener side:
//! - **ConnectionSupervisor**: keeps the push connection alive (fixed retry)
//! - **Poller**: fetches the pull buffer on a fixed interval

mod error;
mod ingest;
mod poller;
mod pull_buffer;
mod relay;
mod supervisor;

pub use error::TransportError;
pub use ingest::{IngestError, Ingestor};
pub use poller::{Poller, PullSource};
pub use pull_buffer::{PullBuffer, PullBufferError};
pub use relay::{BroadcastRelay, Subscription};
pub use supervisor::{ConnectionState, ConnectionSupervisor, PushConnector, PushEvent};
