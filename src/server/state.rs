use std::sync::Arc;

use chime_core::{BroadcastRelay, Ingestor, PullBuffer, SoundCatalogue};
use chime_types::ServerConfig;

/// Shared by every request handler
#[derive(Clone)]
pub struct ServerState {
    pub ingestor: Arc<Ingestor>,
    pub relay: Arc<BroadcastRelay>,
    pub pull: Arc<PullBuffer>,
    pub catalogue: Arc<SoundCatalogue>,
}

impl ServerState {
    pub fn new(config: &ServerConfig, catalogue: SoundCatalogue) -> Self {
        let relay = Arc::new(BroadcastRelay::new(config.relay_capacity));
        let pull = Arc::new(PullBuffer::new());
        let ingestor = Arc::new(Ingestor::new(Arc::clone(&relay), Arc::clone(&pull)));
        Self {
            ingestor,
            relay,
            pull,
            catalogue: Arc::new(catalogue),
        }
    }
}
