//! Playback service - single owner of the gate, pending queue and playback state
//!
//! Architecture:
//! - PlaybackHandle: cloneable sender used by the supervisor, poller and console
//! - PlaybackService: background task draining the queue one sequence at a time
//! - PlaybackEvent: broadcast notifications for observers (console, tests)

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use chime_types::{ChimeConfig, Delivery, DeliveryId};
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::{JoinError, JoinHandle};

use super::activity::ActivityLog;
use super::gate::{AudioGate, GateState};
use super::queue::{DedupeWindow, PendingQueue};
use super::sequencer::{SequenceError, SequenceState, Sequencer};
use crate::amount::Amount;
use crate::audio::{AudioBackend, AudioInitError};
use crate::catalogue::SoundCatalogue;
use crate::decompose::decompose_amount;
use crate::token::SoundToken;

// ─────────────────────────────────────────────────────────────────────────────
// Commands, events and state
// ─────────────────────────────────────────────────────────────────────────────

/// Messages sent to the playback service
pub enum PlaybackCommand {
    /// Amount delivered by the push or poll path
    Deliver(Delivery),
    /// Amount entered locally, not subject to dedupe
    Announce(Amount),
    /// Connection status sound
    Notice(SoundToken),
    /// User gesture: initialize audio and open the gate
    Unlock(oneshot::Sender<Result<(), AudioInitError>>),
    /// Abort the sequence currently rendering
    Cancel,
    Snapshot(oneshot::Sender<PlaybackSnapshot>),
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Playing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceOutcome {
    Completed,
    Aborted,
    Cancelled,
}

/// Notifications published by the service
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    GateOpened,
    GateFailed(String),
    Queued { amount: f64, pending: usize },
    Duplicate { id: DeliveryId },
    Rejected { amount: f64 },
    SequenceStarted { amount: f64 },
    SequenceFinished { amount: f64, outcome: SequenceOutcome },
    NoticePlayed(SoundToken),
    NoticeSuppressed(SoundToken),
}

/// Point-in-time view of the service
#[derive(Debug, Clone)]
pub struct PlaybackSnapshot {
    pub gate: GateState,
    pub state: PlaybackState,
    pub pending: Vec<f64>,
    pub activity: Vec<String>,
}

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("playback service is not running")]
    ServiceStopped,

    #[error(transparent)]
    AudioInit(#[from] AudioInitError),
}

/// Tunables taken from configuration
#[derive(Debug, Clone)]
pub struct PlaybackOptions {
    pub inter_token_delay: Duration,
    pub activity_log_len: usize,
    /// `None` disables dedupe
    pub dedupe_window: Option<usize>,
}

impl Default for PlaybackOptions {
    fn default() -> Self {
        Self {
            inter_token_delay: Duration::from_millis(300),
            activity_log_len: 50,
            dedupe_window: Some(256),
        }
    }
}

impl PlaybackOptions {
    pub fn from_config(config: &ChimeConfig) -> Self {
        Self {
            inter_token_delay: Duration::from_millis(config.audio.inter_token_delay_ms),
            activity_log_len: config.audio.activity_log_len,
            dedupe_window: config
                .listener
                .dedupe
                .then_some(config.listener.dedupe_window),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Playback Handle
// ─────────────────────────────────────────────────────────────────────────────

/// Handle to communicate with the playback service
#[derive(Clone)]
pub struct PlaybackHandle {
    cmd_tx: mpsc::Sender<PlaybackCommand>,
    events: broadcast::Sender<PlaybackEvent>,
    sequence_state: watch::Receiver<SequenceState>,
}

impl PlaybackHandle {
    async fn send(&self, cmd: PlaybackCommand) -> Result<(), PlaybackError> {
        self.cmd_tx
            .send(cmd)
            .await
            .map_err(|_| PlaybackError::ServiceStopped)
    }

    pub async fn deliver(&self, delivery: Delivery) -> Result<(), PlaybackError> {
        self.send(PlaybackCommand::Deliver(delivery)).await
    }

    pub async fn announce(&self, amount: Amount) -> Result<(), PlaybackError> {
        self.send(PlaybackCommand::Announce(amount)).await
    }

    pub async fn notice(&self, token: SoundToken) -> Result<(), PlaybackError> {
        self.send(PlaybackCommand::Notice(token)).await
    }

    /// Open the audio gate, returning the initialization error if it stays closed
    pub async fn unlock(&self) -> Result<(), PlaybackError> {
        let (reply, rx) = oneshot::channel();
        self.send(PlaybackCommand::Unlock(reply)).await?;
        rx.await.map_err(|_| PlaybackError::ServiceStopped)??;
        Ok(())
    }

    pub async fn cancel(&self) -> Result<(), PlaybackError> {
        self.send(PlaybackCommand::Cancel).await
    }

    pub async fn snapshot(&self) -> Result<PlaybackSnapshot, PlaybackError> {
        let (reply, rx) = oneshot::channel();
        self.send(PlaybackCommand::Snapshot(reply)).await?;
        rx.await.map_err(|_| PlaybackError::ServiceStopped)
    }

    pub async fn shutdown(&self) -> Result<(), PlaybackError> {
        self.send(PlaybackCommand::Shutdown).await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlaybackEvent> {
        self.events.subscribe()
    }

    pub fn sequence_state(&self) -> watch::Receiver<SequenceState> {
        self.sequence_state.clone()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Playback Service
// ─────────────────────────────────────────────────────────────────────────────

enum Job {
    Sequence(Amount),
    Notice(SoundToken),
}

struct InFlight {
    job: Job,
    cancel: watch::Sender<bool>,
    handle: JoinHandle<Result<(), SequenceError>>,
}

enum Wake {
    Finished(Result<Result<(), SequenceError>, JoinError>),
    Command(Option<PlaybackCommand>),
}

/// Background task that owns a listener's playback
pub struct PlaybackService<B: AudioBackend> {
    gate: AudioGate<B>,
    queue: PendingQueue,
    /// Status sounds deferred while a sequence renders
    notices: VecDeque<SoundToken>,
    dedupe: Option<DedupeWindow>,
    activity: ActivityLog,
    catalogue: Arc<SoundCatalogue>,
    spacing: Duration,
    state: PlaybackState,
    current: Option<InFlight>,
    cmd_rx: mpsc::Receiver<PlaybackCommand>,
    events: broadcast::Sender<PlaybackEvent>,
    sequence_state: Arc<watch::Sender<SequenceState>>,
}

impl<B: AudioBackend> PlaybackService<B> {
    /// Create a new playback service and return a handle to communicate with it
    pub fn new(
        backend: B,
        catalogue: SoundCatalogue,
        options: PlaybackOptions,
    ) -> (Self, PlaybackHandle) {
        let (cmd_tx, cmd_rx) = mpsc::channel(64);
        let (events, _) = broadcast::channel(256);
        let (state_tx, state_rx) = watch::channel(SequenceState::Idle);

        let service = Self {
            gate: AudioGate::new(backend),
            queue: PendingQueue::new(),
            notices: VecDeque::new(),
            dedupe: options.dedupe_window.map(DedupeWindow::new),
            activity: ActivityLog::new(options.activity_log_len),
            catalogue: Arc::new(catalogue),
            spacing: options.inter_token_delay,
            state: PlaybackState::Idle,
            current: None,
            cmd_rx,
            events: events.clone(),
            sequence_state: Arc::new(state_tx),
        };

        let handle = PlaybackHandle {
            cmd_tx,
            events,
            sequence_state: state_rx,
        };

        (service, handle)
    }

    /// Run the service event loop until shutdown or every handle is dropped
    pub async fn run(mut self) {
        loop {
            self.start_next();

            let wake = match self.current.as_mut() {
                Some(inflight) => tokio::select! {
                    joined = &mut inflight.handle => Wake::Finished(joined),
                    cmd = self.cmd_rx.recv() => Wake::Command(cmd),
                },
                None => Wake::Command(self.cmd_rx.recv().await),
            };

            match wake {
                Wake::Finished(joined) => self.finish(joined).await,
                Wake::Command(Some(PlaybackCommand::Shutdown)) | Wake::Command(None) => break,
                Wake::Command(Some(cmd)) => self.handle_command(cmd).await,
            }
        }

        if let Some(inflight) = self.current.take() {
            inflight.cancel.send_replace(true);
            let _ = inflight.handle.await;
        }
        tracing::info!(pending = self.queue.len(), "Playback service stopped");
    }

    fn emit(&self, event: PlaybackEvent) {
        let _ = self.events.send(event);
    }

    async fn handle_command(&mut self, cmd: PlaybackCommand) {
        match cmd {
            PlaybackCommand::Deliver(delivery) => self.deliver(delivery),
            PlaybackCommand::Announce(amount) => self.enqueue(amount),
            PlaybackCommand::Notice(token) => self.notice(token),
            PlaybackCommand::Unlock(reply) => {
                let result = self.unlock().await;
                let _ = reply.send(result);
            }
            PlaybackCommand::Cancel => {
                if let Some(inflight) = &self.current {
                    tracing::info!("Cancelling current sequence");
                    inflight.cancel.send_replace(true);
                }
            }
            PlaybackCommand::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }
            // Handled by the run loop
            PlaybackCommand::Shutdown => {}
        }
    }

    fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            gate: self.gate.state(),
            state: self.state,
            pending: self.queue.amounts(),
            activity: self.activity.entries(),
        }
    }

    async fn unlock(&mut self) -> Result<(), AudioInitError> {
        if self.gate.is_open() {
            return Ok(());
        }
        match self.gate.unlock().await {
            Ok(()) => {
                tracing::info!(pending = self.queue.len(), "Audio gate opened");
                self.activity.push("Audio system initialized");
                self.emit(PlaybackEvent::GateOpened);
                Ok(())
            }
            Err(e) => {
                tracing::error!(error = %e, "Audio initialization failed");
                self.activity
                    .push(format!("Error initializing audio: {}", e));
                self.emit(PlaybackEvent::GateFailed(e.to_string()));
                Err(e)
            }
        }
    }

    fn deliver(&mut self, delivery: Delivery) {
        if let Some(window) = self.dedupe.as_mut()
            && !window.insert(delivery.id)
        {
            tracing::debug!(id = %delivery.id, amount = delivery.amount, "Duplicate delivery dropped");
            self.emit(PlaybackEvent::Duplicate { id: delivery.id });
            return;
        }

        match Amount::new(delivery.amount) {
            Ok(amount) => self.enqueue(amount),
            Err(e) => {
                tracing::warn!(id = %delivery.id, error = %e, "Rejected delivered amount");
                self.activity
                    .push(format!("Rejected amount {}: {}", delivery.amount, e));
                self.emit(PlaybackEvent::Rejected {
                    amount: delivery.amount,
                });
            }
        }
    }

    fn enqueue(&mut self, amount: Amount) {
        self.queue.push(amount);
        let pending = self.queue.len();
        if self.gate.is_open() {
            tracing::debug!(amount = %amount, pending, "Queued amount");
        } else {
            tracing::info!(amount = %amount, pending, "Audio gate closed, holding amount");
        }
        self.emit(PlaybackEvent::Queued {
            amount: amount.value(),
            pending,
        });
    }

    fn notice(&mut self, token: SoundToken) {
        if !token.is_system() {
            tracing::warn!(token = %token, "Ignoring notice for a non-system sound");
            return;
        }
        if !self.gate.is_open() {
            tracing::debug!(token = %token, "Notice suppressed while audio gate closed");
            self.emit(PlaybackEvent::NoticeSuppressed(token));
            return;
        }
        if self.notices.back() != Some(&token) {
            self.notices.push_back(token);
        }
    }

    /// Start the next job if the gate is open and nothing is rendering.
    /// Deferred notices go before the next queued amount.
    fn start_next(&mut self) {
        if self.current.is_some() {
            return;
        }
        let Some(player) = self.gate.player() else {
            return;
        };
        let job = match self.notices.pop_front() {
            Some(token) => Job::Notice(token),
            None => match self.queue.pop() {
                Some(amount) => Job::Sequence(amount),
                None => return,
            },
        };

        let sequencer = Sequencer::new(
            player,
            Arc::clone(&self.catalogue),
            self.spacing,
            Arc::clone(&self.sequence_state),
        );
        let (cancel, mut cancel_rx) = watch::channel(false);

        let handle = match &job {
            Job::Sequence(amount) => {
                let amount = *amount;
                tracing::info!(amount = %amount, "Starting transaction sequence");
                self.activity
                    .push(format!("Starting transaction sequence for ₹{}", amount));
                self.emit(PlaybackEvent::SequenceStarted {
                    amount: amount.value(),
                });
                let tokens = decompose_amount(amount);
                tokio::spawn(async move {
                    let result = sequencer.play(&tokens, &mut cancel_rx).await;
                    if let Err(e @ SequenceError::Aborted { .. }) = &result {
                        tracing::error!(amount = %amount, error = %e, "Sequence aborted");
                        if let Err(err) = sequencer.play_single(SoundToken::Error).await {
                            tracing::error!(error = %err, "Failed to play error sound");
                        }
                    }
                    result
                })
            }
            Job::Notice(token) => {
                let token = *token;
                tokio::spawn(async move {
                    sequencer
                        .play_single(token)
                        .await
                        .map_err(|source| SequenceError::Aborted { token, source })
                })
            }
        };

        self.state = PlaybackState::Playing;
        self.current = Some(InFlight {
            job,
            cancel,
            handle,
        });
    }

    /// Return to Idle unconditionally, whatever the job's result
    async fn finish(&mut self, joined: Result<Result<(), SequenceError>, JoinError>) {
        self.state = PlaybackState::Idle;
        self.sequence_state.send_replace(SequenceState::Idle);
        let Some(inflight) = self.current.take() else {
            return;
        };

        let result = joined.unwrap_or_else(|e| {
            tracing::error!(error = %e, "Playback task failed");
            Err(SequenceError::TaskFailed {
                reason: e.to_string(),
            })
        });
        let player_gone = matches!(&result, Err(e) if e.is_player_gone());

        match inflight.job {
            Job::Sequence(amount) => {
                let outcome = match &result {
                    Ok(()) => {
                        self.activity.push("Transaction sequence completed");
                        SequenceOutcome::Completed
                    }
                    Err(SequenceError::Cancelled) => {
                        self.activity
                            .push(format!("Transaction sequence for ₹{} cancelled", amount));
                        SequenceOutcome::Cancelled
                    }
                    Err(e) => {
                        self.activity
                            .push(format!("Error in transaction sequence: {}", e));
                        SequenceOutcome::Aborted
                    }
                };
                self.emit(PlaybackEvent::SequenceFinished {
                    amount: amount.value(),
                    outcome,
                });
            }
            Job::Notice(token) => match &result {
                Ok(()) => {
                    self.activity
                        .push(format!("Playing system sound: {}", token));
                    self.emit(PlaybackEvent::NoticePlayed(token));
                }
                Err(e) => {
                    tracing::warn!(token = %token, error = %e, "System sound failed");
                    self.activity.push(format!("Error playing {}: {}", token, e));
                }
            },
        }

        if player_gone {
            self.recover_output().await;
        }
    }

    /// The output device went away; a failed reinitialization closes the gate
    async fn recover_output(&mut self) {
        match self.gate.reinitialize().await {
            Ok(()) => tracing::info!("Audio output reinitialized"),
            Err(e) => {
                tracing::error!(error = %e, "Audio output lost, gate closed");
                self.activity
                    .push(format!("Audio output lost: {}", e));
                self.emit(PlaybackEvent::GateFailed(e.to_string()));
            }
        }
    }
}
