//! Clip playback through rodio
//!
//! `rodio::OutputStream` is not `Send`, so a dedicated thread owns it and serves
//! play requests for the lifetime of the player.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::mpsc as std_mpsc;
use std::sync::{Arc, Mutex};

use rodio::{Decoder, OutputStream, Sink};
use tokio::sync::oneshot;

use super::backend::{AudioBackend, AudioInitError, ClipPlayer};
use crate::catalogue::{AssetLoadError, Clip};

struct PlayRequest {
    path: PathBuf,
    reply: oneshot::Sender<Result<(), AssetLoadError>>,
}

/// Sink of the clip being played, shared so `stop` can reach it from outside
/// the audio thread
type CurrentSink = Arc<Mutex<Option<Arc<Sink>>>>;

/// Opens the default output device when the gate is unlocked
#[derive(Debug, Clone)]
pub struct RodioBackend {
    /// 0-100
    volume: u8,
}

impl RodioBackend {
    pub fn new(volume: u8) -> Self {
        Self {
            volume: volume.min(100),
        }
    }
}

impl AudioBackend for RodioBackend {
    type Player = RodioPlayer;

    async fn initialize(&self) -> Result<RodioPlayer, AudioInitError> {
        let (request_tx, request_rx) = std_mpsc::channel::<PlayRequest>();
        let (ready_tx, ready_rx) = oneshot::channel::<Result<(), AudioInitError>>();
        let current: CurrentSink = Arc::default();
        let thread_current = Arc::clone(&current);
        let volume = self.volume as f32 / 100.0;

        std::thread::Builder::new()
            .name("chime-audio".to_string())
            .spawn(move || {
                let (_stream, handle) = match OutputStream::try_default() {
                    Ok(pair) => pair,
                    Err(e) => {
                        let _ = ready_tx.send(Err(AudioInitError::NoDevice {
                            reason: e.to_string(),
                        }));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));

                while let Ok(request) = request_rx.recv() {
                    let result = play_blocking(&handle, &request.path, volume, &thread_current);
                    let _ = request.reply.send(result);
                }
                tracing::debug!("Audio thread exiting");
            })
            .map_err(AudioInitError::Thread)?;

        match ready_rx.await {
            Ok(Ok(())) => {
                tracing::info!(volume = self.volume, "Audio output initialized");
                Ok(RodioPlayer {
                    request_tx,
                    current,
                })
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(AudioInitError::Stream {
                reason: "audio thread exited during initialization".to_string(),
            }),
        }
    }
}

fn play_blocking(
    handle: &rodio::OutputStreamHandle,
    path: &Path,
    volume: f32,
    current: &CurrentSink,
) -> Result<(), AssetLoadError> {
    let file = File::open(path).map_err(|source| AssetLoadError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let source = Decoder::new(BufReader::new(file)).map_err(|e| AssetLoadError::Decode {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let sink = Sink::try_new(handle).map_err(|e| AssetLoadError::Playback {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    sink.set_volume(volume);
    sink.append(source);
    let sink = Arc::new(sink);
    set_current(current, Some(Arc::clone(&sink)));
    sink.sleep_until_end();
    set_current(current, None);
    Ok(())
}

fn set_current(current: &CurrentSink, sink: Option<Arc<Sink>>) {
    if let Ok(mut slot) = current.lock() {
        *slot = sink;
    }
}

/// Handle to the audio thread. Dropping it stops the thread.
pub struct RodioPlayer {
    request_tx: std_mpsc::Sender<PlayRequest>,
    current: CurrentSink,
}

impl ClipPlayer for RodioPlayer {
    async fn play(&self, clip: &Clip) -> Result<(), AssetLoadError> {
        let (reply, done) = oneshot::channel();
        self.request_tx
            .send(PlayRequest {
                path: clip.path.clone(),
                reply,
            })
            .map_err(|_| AssetLoadError::PlayerGone)?;
        done.await.map_err(|_| AssetLoadError::PlayerGone)?
    }

    fn stop(&self) {
        // Ending the source wakes `sleep_until_end` on the audio thread
        if let Ok(slot) = self.current.lock()
            && let Some(sink) = slot.as_ref()
        {
            sink.stop();
        }
    }
}
