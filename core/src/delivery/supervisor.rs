//! Listener-side push connection supervision
//!
//! State machine: Disconnected -> Connecting -> Connected, back to
//! Disconnected on any drop. Retries on a fixed interval forever; the task is
//! stopped by aborting it.

use std::future::Future;
use std::time::Duration;

use chime_types::{Delivery, SessionStatus};
use tokio::sync::{mpsc, watch};

use super::error::TransportError;
use crate::playback::{PlaybackError, PlaybackHandle};
use crate::token::SoundToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Everything a push connection can report
#[derive(Debug, Clone, PartialEq)]
pub enum PushEvent {
    Connected,
    Disconnected { reason: String },
    Status(SessionStatus),
    TriggerSound(Delivery),
}

/// Opens one push session. The returned stream ends (or yields
/// `Disconnected`) when the session drops.
pub trait PushConnector: Send + Sync + 'static {
    fn connect(
        &self,
    ) -> impl Future<Output = Result<mpsc::Receiver<PushEvent>, TransportError>> + Send;
}

pub struct ConnectionSupervisor<C: PushConnector> {
    connector: C,
    playback: PlaybackHandle,
    retry: Duration,
    state: watch::Sender<ConnectionState>,
}

impl<C: PushConnector> ConnectionSupervisor<C> {
    pub fn new(connector: C, playback: PlaybackHandle, retry: Duration) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            connector,
            playback,
            retry,
            state,
        }
    }

    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Reconnect loop. Only returns if the playback service has stopped.
    pub async fn run(self) {
        loop {
            self.state.send_replace(ConnectionState::Connecting);
            let result = match self.connector.connect().await {
                Ok(events) => self.session(events).await,
                Err(e) => {
                    tracing::warn!(error = %e, retry_secs = self.retry.as_secs_f32(), "Push connection failed");
                    Ok(())
                }
            };
            self.state.send_replace(ConnectionState::Disconnected);

            if result.is_err() {
                tracing::info!("Playback service stopped, connection supervisor exiting");
                return;
            }
            tokio::time::sleep(self.retry).await;
        }
    }

    async fn session(&self, mut events: mpsc::Receiver<PushEvent>) -> Result<(), PlaybackError> {
        let mut connected = false;
        let mut reason = "stream ended".to_string();

        while let Some(event) = events.recv().await {
            match event {
                PushEvent::Connected => {
                    if !connected {
                        connected = true;
                        self.state.send_replace(ConnectionState::Connected);
                        tracing::info!("Connected to server");
                        self.playback.notice(SoundToken::NetworkConnected).await?;
                    }
                }
                PushEvent::Status(status) => {
                    tracing::debug!(session = %status.id, connected = status.connected, "Push session status");
                }
                PushEvent::TriggerSound(delivery) => {
                    tracing::debug!(amount = delivery.amount, id = %delivery.id, "Amount pushed");
                    self.playback.deliver(delivery).await?;
                }
                PushEvent::Disconnected { reason: r } => {
                    reason = r;
                    break;
                }
            }
        }

        if connected {
            tracing::warn!(%reason, "Disconnected from server");
            self.playback.notice(SoundToken::NetworkDisconnected).await?;
        }
        Ok(())
    }
}
