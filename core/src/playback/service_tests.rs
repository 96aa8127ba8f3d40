//! Tests for PlaybackService queueing, gating and sequencing
//!
//! A fake backend records every clip played and tracks how many clips are
//! playing at once. Tokio time is paused so clip lengths and spacing elapse
//! instantly.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chime_types::{Delivery, DeliveryId};
use tokio::sync::broadcast;

use super::{
    GateState, PlaybackEvent, PlaybackHandle, PlaybackOptions, PlaybackService, PlaybackState,
    SequenceOutcome,
};
use crate::audio::{AudioBackend, AudioInitError, ClipPlayer};
use crate::catalogue::test_support::catalogue_dir;
use crate::catalogue::{AssetLoadError, Clip, SoundCatalogue};
use crate::token::SoundToken;

#[derive(Clone, Default)]
struct Recorder {
    played: Arc<Mutex<Vec<SoundToken>>>,
    active: Arc<AtomicUsize>,
    max_active: Arc<AtomicUsize>,
    inits: Arc<AtomicUsize>,
    stops: Arc<AtomicUsize>,
}

impl Recorder {
    fn played(&self) -> Vec<SoundToken> {
        self.played.lock().unwrap().clone()
    }
}

/// Decrements the active count even when a play is dropped mid-clip
struct Active(Arc<AtomicUsize>);

impl Drop for Active {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

struct FakePlayer {
    recorder: Recorder,
    clip_len: Duration,
    gone_on: Option<SoundToken>,
}

impl ClipPlayer for FakePlayer {
    async fn play(&self, clip: &Clip) -> Result<(), AssetLoadError> {
        let now = self.recorder.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.recorder.max_active.fetch_max(now, Ordering::SeqCst);
        let active = Active(self.recorder.active.clone());
        tokio::time::sleep(self.clip_len).await;
        drop(active);

        if self.gone_on == Some(clip.token) {
            return Err(AssetLoadError::PlayerGone);
        }
        self.recorder.played.lock().unwrap().push(clip.token);
        Ok(())
    }

    fn stop(&self) {
        self.recorder.stops.fetch_add(1, Ordering::SeqCst);
    }
}

struct FakeBackend {
    recorder: Recorder,
    clip_len: Duration,
    /// Number of successful initializations allowed
    max_inits: usize,
    gone_on: Option<SoundToken>,
    /// How long opening the output takes
    init_delay: Duration,
}

impl FakeBackend {
    fn new(recorder: &Recorder) -> Self {
        Self {
            recorder: recorder.clone(),
            clip_len: Duration::from_millis(100),
            max_inits: usize::MAX,
            gone_on: None,
            init_delay: Duration::ZERO,
        }
    }
}

impl AudioBackend for FakeBackend {
    type Player = FakePlayer;

    async fn initialize(&self) -> Result<FakePlayer, AudioInitError> {
        tokio::time::sleep(self.init_delay).await;
        let attempt = self.recorder.inits.fetch_add(1, Ordering::SeqCst);
        if attempt >= self.max_inits {
            return Err(AudioInitError::NoDevice {
                reason: "fake device unplugged".to_string(),
            });
        }
        Ok(FakePlayer {
            recorder: self.recorder.clone(),
            clip_len: self.clip_len,
            gone_on: self.gone_on,
        })
    }
}

fn start(backend: FakeBackend, skip: &[SoundToken], options: PlaybackOptions) -> PlaybackHandle {
    let catalogue = SoundCatalogue::new(catalogue_dir("playback", skip), "mp3");
    let (service, handle) = PlaybackService::new(backend, catalogue, options);
    tokio::spawn(service.run());
    handle
}

fn delivery(seq: u64, amount: f64) -> Delivery {
    Delivery {
        id: DeliveryId::new(1, seq),
        amount,
    }
}

/// Collect events until `finished` sequences have ended
async fn collect_until_finished(
    rx: &mut broadcast::Receiver<PlaybackEvent>,
    finished: usize,
) -> Vec<PlaybackEvent> {
    let collect = async {
        let mut events = Vec::new();
        let mut done = 0;
        while done < finished {
            let event = rx.recv().await.unwrap();
            if matches!(event, PlaybackEvent::SequenceFinished { .. }) {
                done += 1;
            }
            events.push(event);
        }
        events
    };
    tokio::time::timeout(Duration::from_secs(600), collect)
        .await
        .expect("timed out waiting for sequences")
}

async fn wait_for(
    rx: &mut broadcast::Receiver<PlaybackEvent>,
    pred: impl Fn(&PlaybackEvent) -> bool,
) -> PlaybackEvent {
    let wait = async {
        loop {
            let event = rx.recv().await.unwrap();
            if pred(&event) {
                return event;
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(600), wait)
        .await
        .expect("timed out waiting for event")
}

fn started(events: &[PlaybackEvent]) -> Vec<f64> {
    events
        .iter()
        .filter_map(|e| match e {
            PlaybackEvent::SequenceStarted { amount } => Some(*amount),
            _ => None,
        })
        .collect()
}

fn outcomes(events: &[PlaybackEvent]) -> Vec<SequenceOutcome> {
    events
        .iter()
        .filter_map(|e| match e {
            PlaybackEvent::SequenceFinished { outcome, .. } => Some(*outcome),
            _ => None,
        })
        .collect()
}

use SoundToken::{Amount as A, Number as N};

#[tokio::test(start_paused = true)]
async fn closed_gate_holds_amounts_then_plays_in_arrival_order() {
    let recorder = Recorder::default();
    let handle = start(FakeBackend::new(&recorder), &[], PlaybackOptions::default());
    let mut rx = handle.subscribe();

    handle.deliver(delivery(1, 5.0)).await.unwrap();
    handle.deliver(delivery(2, 13.0)).await.unwrap();
    handle.deliver(delivery(3, 7.0)).await.unwrap();

    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.gate, GateState::Closed);
    assert_eq!(snapshot.pending, vec![5.0, 13.0, 7.0]);
    assert!(recorder.played().is_empty());

    handle.unlock().await.unwrap();
    let events = collect_until_finished(&mut rx, 3).await;

    assert_eq!(started(&events), vec![5.0, 13.0, 7.0]);
    assert_eq!(recorder.played(), vec![A, N(5), A, N(13), A, N(7)]);
    assert_eq!(handle.snapshot().await.unwrap().state, PlaybackState::Idle);
}

#[tokio::test(start_paused = true)]
async fn arrivals_while_playing_never_overlap_the_current_sequence() {
    let recorder = Recorder::default();
    let handle = start(FakeBackend::new(&recorder), &[], PlaybackOptions::default());
    let mut rx = handle.subscribe();
    handle.unlock().await.unwrap();

    handle.deliver(delivery(1, 456.78)).await.unwrap();
    wait_for(&mut rx, |e| matches!(e, PlaybackEvent::SequenceStarted { .. })).await;
    // Concurrent arrivals from two producers
    let (a, b) = tokio::join!(
        handle.deliver(delivery(2, 5.67)),
        handle.deliver(delivery(3, 34567.89))
    );
    a.unwrap();
    b.unwrap();

    let events = collect_until_finished(&mut rx, 3).await;
    // Brackets strictly alternate: Started, Finished, Started, Finished, ...
    let brackets: Vec<bool> = events
        .iter()
        .filter_map(|e| match e {
            PlaybackEvent::SequenceStarted { .. } => Some(true),
            PlaybackEvent::SequenceFinished { .. } => Some(false),
            _ => None,
        })
        .collect();
    assert_eq!(brackets, vec![false, true, false, true, false]);
    assert_eq!(started(&events), vec![5.67, 34567.89]);
    assert_eq!(recorder.max_active.load(Ordering::SeqCst), 1);
    assert_eq!(recorder.played().len(), 8 + 5 + 11);
}

#[tokio::test(start_paused = true)]
async fn missing_clip_aborts_only_that_sequence() {
    let recorder = Recorder::default();
    let handle = start(
        FakeBackend::new(&recorder),
        &[SoundToken::Hundred],
        PlaybackOptions::default(),
    );
    let mut rx = handle.subscribe();
    handle.unlock().await.unwrap();

    handle.deliver(delivery(1, 456.78)).await.unwrap();
    handle.deliver(delivery(2, 5.67)).await.unwrap();

    let events = collect_until_finished(&mut rx, 2).await;
    assert_eq!(
        outcomes(&events),
        vec![SequenceOutcome::Aborted, SequenceOutcome::Completed]
    );
    assert_eq!(
        recorder.played(),
        vec![A, N(4), SoundToken::Error, A, N(5), SoundToken::Point, N(6), N(7)]
    );

    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.state, PlaybackState::Idle);
    assert!(snapshot.pending.is_empty());
    assert!(snapshot.activity.iter().any(|l| l.contains("Error in transaction sequence")));
}

#[tokio::test(start_paused = true)]
async fn crore_count_beyond_vocabulary_sounds_error() {
    let recorder = Recorder::default();
    let handle = start(FakeBackend::new(&recorder), &[], PlaybackOptions::default());
    let mut rx = handle.subscribe();
    handle.unlock().await.unwrap();

    handle.deliver(delivery(1, 1_200_000_000.0)).await.unwrap();
    let events = collect_until_finished(&mut rx, 1).await;

    assert_eq!(outcomes(&events), vec![SequenceOutcome::Aborted]);
    assert_eq!(recorder.played(), vec![A, SoundToken::Error]);
}

#[tokio::test(start_paused = true)]
async fn failed_initialization_keeps_gate_closed() {
    let recorder = Recorder::default();
    let backend = FakeBackend {
        max_inits: 0,
        ..FakeBackend::new(&recorder)
    };
    let handle = start(backend, &[], PlaybackOptions::default());
    let mut rx = handle.subscribe();

    let err = handle.unlock().await.unwrap_err();
    assert!(err.to_string().contains("fake device unplugged"));
    wait_for(&mut rx, |e| matches!(e, PlaybackEvent::GateFailed(_))).await;

    handle.deliver(delivery(1, 10.0)).await.unwrap();
    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.gate, GateState::Closed);
    assert_eq!(snapshot.pending, vec![10.0]);
    // No automatic retry
    assert_eq!(recorder.inits.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn unlock_is_idempotent() {
    let recorder = Recorder::default();
    let handle = start(FakeBackend::new(&recorder), &[], PlaybackOptions::default());

    handle.unlock().await.unwrap();
    handle.unlock().await.unwrap();
    assert_eq!(recorder.inits.load(Ordering::SeqCst), 1);
    assert_eq!(handle.snapshot().await.unwrap().gate, GateState::Open);
}

#[tokio::test(start_paused = true)]
async fn same_delivery_over_both_paths_plays_once() {
    let recorder = Recorder::default();
    let handle = start(FakeBackend::new(&recorder), &[], PlaybackOptions::default());
    let mut rx = handle.subscribe();
    handle.unlock().await.unwrap();

    handle.deliver(delivery(1, 7.0)).await.unwrap();
    handle.deliver(delivery(1, 7.0)).await.unwrap();
    handle.deliver(delivery(2, 7.0)).await.unwrap();

    wait_for(&mut rx, |e| matches!(e, PlaybackEvent::Duplicate { .. })).await;
    collect_until_finished(&mut rx, 2).await;
    assert_eq!(recorder.played(), vec![A, N(7), A, N(7)]);
}

#[tokio::test(start_paused = true)]
async fn dedupe_disabled_plays_every_delivery() {
    let recorder = Recorder::default();
    let options = PlaybackOptions {
        dedupe_window: None,
        ..PlaybackOptions::default()
    };
    let handle = start(FakeBackend::new(&recorder), &[], options);
    let mut rx = handle.subscribe();
    handle.unlock().await.unwrap();

    handle.deliver(delivery(1, 7.0)).await.unwrap();
    handle.deliver(delivery(1, 7.0)).await.unwrap();

    collect_until_finished(&mut rx, 2).await;
    assert_eq!(recorder.played(), vec![A, N(7), A, N(7)]);
}

#[tokio::test(start_paused = true)]
async fn notices_are_suppressed_while_closed_and_deferred_while_playing() {
    let recorder = Recorder::default();
    let handle = start(FakeBackend::new(&recorder), &[], PlaybackOptions::default());
    let mut rx = handle.subscribe();

    handle.notice(SoundToken::NetworkConnected).await.unwrap();
    let event = wait_for(&mut rx, |e| matches!(e, PlaybackEvent::NoticeSuppressed(_))).await;
    assert_eq!(event, PlaybackEvent::NoticeSuppressed(SoundToken::NetworkConnected));

    handle.unlock().await.unwrap();
    handle.deliver(delivery(1, 15.0)).await.unwrap();
    wait_for(&mut rx, |e| matches!(e, PlaybackEvent::SequenceStarted { .. })).await;
    handle.notice(SoundToken::NetworkDisconnected).await.unwrap();

    wait_for(&mut rx, |e| matches!(e, PlaybackEvent::NoticePlayed(_))).await;
    assert_eq!(
        recorder.played(),
        vec![A, N(15), SoundToken::NetworkDisconnected]
    );
    assert_eq!(recorder.max_active.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn cancel_stops_current_sequence_and_queue_continues() {
    let recorder = Recorder::default();
    let backend = FakeBackend {
        clip_len: Duration::from_secs(2),
        ..FakeBackend::new(&recorder)
    };
    let handle = start(backend, &[], PlaybackOptions::default());
    let mut rx = handle.subscribe();
    handle.unlock().await.unwrap();

    handle.deliver(delivery(1, 34567.89)).await.unwrap();
    handle.deliver(delivery(2, 3.0)).await.unwrap();
    wait_for(&mut rx, |e| matches!(e, PlaybackEvent::SequenceStarted { .. })).await;
    handle.cancel().await.unwrap();

    let events = collect_until_finished(&mut rx, 2).await;
    assert_eq!(
        outcomes(&events),
        vec![SequenceOutcome::Cancelled, SequenceOutcome::Completed]
    );
    let played = recorder.played();
    assert!(!played.contains(&SoundToken::Error));
    assert_eq!(&played[played.len() - 2..], &[A, N(3)]);
    assert_eq!(recorder.stops.load(Ordering::SeqCst), 1);
    assert_eq!(recorder.active.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn invalid_delivered_amount_is_rejected() {
    let recorder = Recorder::default();
    let handle = start(FakeBackend::new(&recorder), &[], PlaybackOptions::default());
    let mut rx = handle.subscribe();

    handle.deliver(delivery(1, -4.0)).await.unwrap();
    let event = wait_for(&mut rx, |e| matches!(e, PlaybackEvent::Rejected { .. })).await;
    assert_eq!(event, PlaybackEvent::Rejected { amount: -4.0 });
    assert!(handle.snapshot().await.unwrap().pending.is_empty());
}

#[tokio::test(start_paused = true)]
async fn lost_output_that_cannot_reinitialize_closes_gate() {
    let recorder = Recorder::default();
    let backend = FakeBackend {
        max_inits: 1,
        gone_on: Some(N(9)),
        ..FakeBackend::new(&recorder)
    };
    let handle = start(backend, &[], PlaybackOptions::default());
    let mut rx = handle.subscribe();
    handle.unlock().await.unwrap();

    handle.deliver(delivery(1, 9.0)).await.unwrap();
    let events = collect_until_finished(&mut rx, 1).await;
    assert_eq!(outcomes(&events), vec![SequenceOutcome::Aborted]);
    wait_for(&mut rx, |e| matches!(e, PlaybackEvent::GateFailed(_))).await;

    handle.deliver(delivery(2, 4.0)).await.unwrap();
    let snapshot = handle.snapshot().await.unwrap();
    assert_eq!(snapshot.gate, GateState::Closed);
    assert_eq!(snapshot.pending, vec![4.0]);
}

#[tokio::test(start_paused = true)]
async fn only_system_sounds_are_played_as_notices() {
    let recorder = Recorder::default();
    let handle = start(FakeBackend::new(&recorder), &[], PlaybackOptions::default());
    let mut rx = handle.subscribe();
    handle.unlock().await.unwrap();

    handle.notice(N(5)).await.unwrap();
    handle.deliver(delivery(1, 3.0)).await.unwrap();
    collect_until_finished(&mut rx, 1).await;

    assert_eq!(recorder.played(), vec![A, N(3)]);
}

#[tokio::test(flavor = "current_thread", start_paused = true)]
async fn slow_output_open_does_not_stall_the_runtime() {
    let recorder = Recorder::default();
    let backend = FakeBackend {
        init_delay: Duration::from_secs(3),
        ..FakeBackend::new(&recorder)
    };
    let handle = start(backend, &[], PlaybackOptions::default());

    let opened = tokio::time::Instant::now();
    let unlock = tokio::spawn({
        let handle = handle.clone();
        async move { handle.unlock().await }
    });
    let ticker = tokio::spawn(async {
        tokio::time::sleep(Duration::from_millis(500)).await;
        tokio::time::Instant::now()
    });

    let ticked = ticker.await.unwrap();
    assert!(ticked - opened < Duration::from_secs(3));
    assert!(!unlock.is_finished());

    unlock.await.unwrap().unwrap();
    assert!(opened.elapsed() >= Duration::from_secs(3));
    assert_eq!(handle.snapshot().await.unwrap().gate, GateState::Open);
}
