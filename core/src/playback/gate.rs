use std::sync::Arc;

use crate::audio::{AudioBackend, AudioInitError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Closed,
    Open,
}

/// User-consent barrier in front of the audio output.
///
/// Starts closed. Opens only through [`AudioGate::unlock`], which initializes
/// the backend; once open it stays open unless a later reinitialization fails.
pub struct AudioGate<B: AudioBackend> {
    backend: B,
    player: Option<Arc<B::Player>>,
}

impl<B: AudioBackend> AudioGate<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            player: None,
        }
    }

    pub fn state(&self) -> GateState {
        if self.player.is_some() {
            GateState::Open
        } else {
            GateState::Closed
        }
    }

    pub fn is_open(&self) -> bool {
        self.player.is_some()
    }

    /// Player for the open gate, `None` while closed
    pub fn player(&self) -> Option<Arc<B::Player>> {
        self.player.clone()
    }

    /// Open the gate. No-op when already open; on failure the gate stays
    /// closed and nothing is retried automatically.
    pub async fn unlock(&mut self) -> Result<(), AudioInitError> {
        if self.player.is_some() {
            return Ok(());
        }
        let player = self.backend.initialize().await?;
        self.player = Some(Arc::new(player));
        Ok(())
    }

    /// Replace a dead output. If initialization fails the gate closes.
    pub async fn reinitialize(&mut self) -> Result<(), AudioInitError> {
        match self.backend.initialize().await {
            Ok(player) => {
                self.player = Some(Arc::new(player));
                Ok(())
            }
            Err(e) => {
                self.player = None;
                Err(e)
            }
        }
    }
}
