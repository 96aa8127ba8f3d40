//! Serial token playback
//!
//! Each token goes Loading -> Playing -> Cooldown; the sequence ends in Done or
//! Aborted. Two suspension points per token (clip end, spacing delay) both
//! observe the cancel signal.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::watch;

use crate::audio::ClipPlayer;
use crate::catalogue::{AssetLoadError, SoundCatalogue};
use crate::token::SoundToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceState {
    Idle,
    Loading(SoundToken),
    Playing(SoundToken),
    Cooldown,
    Done,
    Aborted,
}

#[derive(Debug, Error)]
pub enum SequenceError {
    #[error("sequence aborted at token '{token}'")]
    Aborted {
        token: SoundToken,
        #[source]
        source: AssetLoadError,
    },

    #[error("sequence cancelled")]
    Cancelled,

    #[error("playback task failed: {reason}")]
    TaskFailed { reason: String },
}

impl SequenceError {
    /// True when the audio output itself went away
    pub fn is_player_gone(&self) -> bool {
        matches!(
            self,
            SequenceError::Aborted {
                source: AssetLoadError::PlayerGone,
                ..
            }
        )
    }
}

pub struct Sequencer<P: ClipPlayer> {
    player: Arc<P>,
    catalogue: Arc<SoundCatalogue>,
    spacing: Duration,
    state: Arc<watch::Sender<SequenceState>>,
    /// Every state sent, since the watch channel only keeps the latest
    #[cfg(test)]
    trace: Arc<std::sync::Mutex<Vec<SequenceState>>>,
}

impl<P: ClipPlayer> Clone for Sequencer<P> {
    fn clone(&self) -> Self {
        Self {
            player: Arc::clone(&self.player),
            catalogue: Arc::clone(&self.catalogue),
            spacing: self.spacing,
            state: Arc::clone(&self.state),
            #[cfg(test)]
            trace: Arc::clone(&self.trace),
        }
    }
}

impl<P: ClipPlayer> Sequencer<P> {
    pub fn new(
        player: Arc<P>,
        catalogue: Arc<SoundCatalogue>,
        spacing: Duration,
        state: Arc<watch::Sender<SequenceState>>,
    ) -> Self {
        Self {
            player,
            catalogue,
            spacing,
            state,
            #[cfg(test)]
            trace: Arc::default(),
        }
    }

    fn set(&self, state: SequenceState) {
        #[cfg(test)]
        self.trace.lock().unwrap().push(state);
        self.state.send_replace(state);
    }

    /// Play every token in order, pausing `spacing` after each.
    ///
    /// The first resolution or playback failure aborts the remaining tokens.
    pub async fn play(
        &self,
        tokens: &[SoundToken],
        cancel: &mut watch::Receiver<bool>,
    ) -> Result<(), SequenceError> {
        for &token in tokens {
            self.set(SequenceState::Loading(token));
            let clip = match self.catalogue.resolve(token) {
                Ok(clip) => clip,
                Err(source) => {
                    self.set(SequenceState::Aborted);
                    return Err(SequenceError::Aborted { token, source });
                }
            };

            self.set(SequenceState::Playing(token));
            tokio::select! {
                biased;
                _ = cancelled(cancel) => {
                    self.player.stop();
                    self.set(SequenceState::Aborted);
                    return Err(SequenceError::Cancelled);
                }
                result = self.player.play(&clip) => {
                    if let Err(source) = result {
                        self.set(SequenceState::Aborted);
                        return Err(SequenceError::Aborted { token, source });
                    }
                }
            }

            self.set(SequenceState::Cooldown);
            tokio::select! {
                biased;
                _ = cancelled(cancel) => {
                    self.set(SequenceState::Aborted);
                    return Err(SequenceError::Cancelled);
                }
                _ = tokio::time::sleep(self.spacing) => {}
            }
        }
        self.set(SequenceState::Done);
        Ok(())
    }

    /// Play one system sound outside of any sequence, no spacing
    pub async fn play_single(&self, token: SoundToken) -> Result<(), AssetLoadError> {
        let clip = self.catalogue.resolve(token)?;
        self.player.play(&clip).await
    }
}

/// Resolves once the cancel flag is raised; pends forever if the sender is gone
async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    loop {
        if *cancel.borrow_and_update() {
            return;
        }
        if cancel.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
