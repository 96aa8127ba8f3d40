//! Listener process: receives amounts over push and poll and plays them
//!
//! Task layout:
//! - playback service (owns gate, queue, sequencer)
//! - connection supervisor over the WebSocket connector
//! - poller over the HTTP pull client
//! - console on the current task

mod connector;
mod console;
mod pull_client;

use std::time::Duration;

use chime_core::{
    ConnectionSupervisor, PlaybackHandle, PlaybackOptions, PlaybackService, Poller, RodioBackend,
    SoundCatalogue,
};
use chime_types::ChimeConfig;
use tokio::task::JoinHandle;

pub use connector::{WsConnector, socket_url};
pub use console::ConsoleContext;
pub use pull_client::HttpPullClient;

/// Background tasks of one listener session
#[derive(Default)]
struct ListenerTasks {
    playback: Option<JoinHandle<()>>,
    supervisor: Option<JoinHandle<()>>,
    poller: Option<JoinHandle<()>>,
}

impl ListenerTasks {
    async fn shutdown(&mut self, playback: &PlaybackHandle) {
        for handle in [self.supervisor.take(), self.poller.take()]
            .into_iter()
            .flatten()
        {
            handle.abort();
            let _ = handle.await;
        }

        if playback.shutdown().await.is_err() {
            tracing::debug!("Playback service already stopped");
        }
        if let Some(handle) = self.playback.take() {
            let _ = handle.await;
        }
    }
}

pub async fn run(config: ChimeConfig) -> std::io::Result<()> {
    let catalogue = SoundCatalogue::from_settings(&config.audio);
    catalogue.validate();

    let (service, playback) = PlaybackService::new(
        RodioBackend::new(config.audio.volume),
        catalogue,
        PlaybackOptions::from_config(&config),
    );
    let mut tasks = ListenerTasks {
        playback: Some(tokio::spawn(service.run())),
        ..Default::default()
    };

    let listener = &config.listener;
    let mut connection = None;
    if listener.push_enabled {
        let connector = WsConnector::new(&listener.server_url);
        tracing::info!(url = connector.url(), "Starting push connection");
        let supervisor = ConnectionSupervisor::new(
            connector,
            playback.clone(),
            Duration::from_millis(listener.reconnect_interval_ms),
        );
        connection = Some(supervisor.state());
        tasks.supervisor = Some(tokio::spawn(supervisor.run()));
    }

    if listener.poll_enabled {
        let source = HttpPullClient::new(&listener.server_url);
        tracing::info!(url = source.url(), interval_ms = listener.poll_interval_ms, "Starting poll fallback");
        let poller = Poller::new(
            source,
            playback.clone(),
            Duration::from_millis(listener.poll_interval_ms),
        );
        tasks.poller = Some(tokio::spawn(poller.run()));
    }

    if listener.auto_unlock
        && let Err(e) = playback.unlock().await
    {
        tracing::warn!(error = %e, "Automatic audio unlock failed");
    }

    let ctx = ConsoleContext {
        playback: playback.clone(),
        connection,
    };
    let result = console::run(&ctx).await;

    tasks.shutdown(&playback).await;
    tracing::info!("Listener stopped");
    result
}
