//! Poll fallback: fetch and drain the server's pull buffer on a fixed interval

use std::future::Future;
use std::time::Duration;

use chime_types::Delivery;
use tokio::time::MissedTickBehavior;

use super::error::TransportError;
use crate::playback::PlaybackHandle;

/// One drain of the remote pull buffer
pub trait PullSource: Send + Sync + 'static {
    fn fetch(&self) -> impl Future<Output = Result<Vec<Delivery>, TransportError>> + Send;
}

pub struct Poller<S: PullSource> {
    source: S,
    playback: PlaybackHandle,
    interval: Duration,
}

impl<S: PullSource> Poller<S> {
    pub fn new(source: S, playback: PlaybackHandle, interval: Duration) -> Self {
        Self {
            source,
            playback,
            interval,
        }
    }

    /// Poll until the playback service stops. Fetch failures are logged and
    /// retried on the next tick.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let deliveries = match self.source.fetch().await {
                Ok(deliveries) => deliveries,
                Err(e) => {
                    tracing::warn!(error = %e, "Poll failed");
                    continue;
                }
            };
            if !deliveries.is_empty() {
                tracing::debug!(count = deliveries.len(), "Polled amounts");
            }
            for delivery in deliveries {
                if self.playback.deliver(delivery).await.is_err() {
                    tracing::info!("Playback service stopped, poller exiting");
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use chime_types::DeliveryId;
    use tokio::time::Instant;

    use super::*;
    use crate::audio::{AudioBackend, AudioInitError, ClipPlayer};
    use crate::catalogue::{AssetLoadError, Clip, SoundCatalogue};
    use crate::playback::{PlaybackOptions, PlaybackService};

    struct Silent;

    impl ClipPlayer for Silent {
        async fn play(&self, _clip: &Clip) -> Result<(), AssetLoadError> {
            Ok(())
        }

        fn stop(&self) {}
    }

    struct NoAudio;

    impl AudioBackend for NoAudio {
        type Player = Silent;

        async fn initialize(&self) -> Result<Silent, AudioInitError> {
            Err(AudioInitError::NoDevice {
                reason: "test".to_string(),
            })
        }
    }

    #[derive(Clone, Default)]
    struct ScriptedSource {
        responses: Arc<Mutex<VecDeque<Result<Vec<Delivery>, TransportError>>>>,
        fetched_at: Arc<Mutex<Vec<Instant>>>,
    }

    impl PullSource for ScriptedSource {
        async fn fetch(&self) -> Result<Vec<Delivery>, TransportError> {
            self.fetched_at.lock().unwrap().push(Instant::now());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(Vec::new()))
        }
    }

    fn delivery(seq: u64, amount: f64) -> Delivery {
        Delivery {
            id: DeliveryId::new(1, seq),
            amount,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn polls_on_interval_and_survives_errors() {
        let source = ScriptedSource::default();
        source.responses.lock().unwrap().extend([
            Err(TransportError::Status {
                url: "http://test/api/check-amounts".to_string(),
                status: 502,
            }),
            Ok(vec![delivery(1, 456.78), delivery(2, 5.0)]),
            Ok(Vec::new()),
        ]);

        let catalogue = SoundCatalogue::new(std::env::temp_dir(), "mp3");
        let (service, handle) = PlaybackService::new(NoAudio, catalogue, PlaybackOptions::default());
        tokio::spawn(service.run());

        let start = Instant::now();
        let task = tokio::spawn(
            Poller::new(source.clone(), handle.clone(), Duration::from_secs(2)).run(),
        );
        tokio::time::sleep(Duration::from_millis(6_500)).await;
        task.abort();

        let offsets: Vec<u64> = source
            .fetched_at
            .lock()
            .unwrap()
            .iter()
            .map(|t| t.duration_since(start).as_secs())
            .collect();
        assert_eq!(offsets, vec![0, 2, 4, 6]);

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.pending, vec![456.78, 5.0]);
    }

    #[tokio::test(start_paused = true)]
    async fn stops_when_playback_is_gone() {
        let source = ScriptedSource::default();
        source
            .responses
            .lock()
            .unwrap()
            .push_back(Ok(vec![delivery(1, 10.0)]));

        let catalogue = SoundCatalogue::new(std::env::temp_dir(), "mp3");
        let (service, handle) = PlaybackService::new(NoAudio, catalogue, PlaybackOptions::default());
        drop(service);

        let poller = Poller::new(source, handle, Duration::from_secs(2));
        tokio::time::timeout(Duration::from_secs(10), poller.run())
            .await
            .expect("poller should exit");
    }
}
