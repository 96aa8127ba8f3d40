//! WebSocket push connector for the connection supervisor

use std::time::Duration;

use chime_core::{PushConnector, PushEvent, TransportError};
use chime_types::PushMessage;
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

/// Upper bound on the TCP connect plus WebSocket handshake
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Push channel URL for a server base URL (`http://host:3000` ->
/// `ws://host:3000/api/socket`)
pub fn socket_url(server_url: &str) -> String {
    let base = server_url.trim_end_matches('/');
    let base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        base.to_string()
    };
    format!("{base}/api/socket")
}

pub struct WsConnector {
    url: String,
    connect_timeout: Duration,
}

impl WsConnector {
    pub fn new(server_url: &str) -> Self {
        Self {
            url: socket_url(server_url),
            connect_timeout: CONNECT_TIMEOUT,
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl PushConnector for WsConnector {
    async fn connect(&self) -> Result<mpsc::Receiver<PushEvent>, TransportError> {
        let connect = tokio_tungstenite::connect_async(self.url.as_str());
        let (mut stream, _response) = tokio::time::timeout(self.connect_timeout, connect)
            .await
            .map_err(|_| TransportError::Connect {
                url: self.url.clone(),
                reason: "timed out".to_string(),
            })?
            .map_err(|e| TransportError::Connect {
                url: self.url.clone(),
                reason: e.to_string(),
            })?;

        let (tx, rx) = mpsc::channel(64);
        tokio::spawn(async move {
            if tx.send(PushEvent::Connected).await.is_err() {
                return;
            }

            let reason = loop {
                let frame = tokio::select! {
                    // Supervisor went away
                    _ = tx.closed() => return,
                    frame = stream.next() => frame,
                };
                match frame {
                    Some(Ok(Message::Text(text))) => match decode(&text) {
                        Ok(Some(event)) => {
                            if tx.send(event).await.is_err() {
                                return;
                            }
                        }
                        Ok(None) => {}
                        Err(e) => tracing::warn!(error = %e, "Dropping push frame"),
                    },
                    Some(Ok(Message::Close(frame))) => {
                        break frame
                            .map(|f| f.reason.to_string())
                            .filter(|r| !r.is_empty())
                            .unwrap_or_else(|| "closed by server".to_string());
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => break e.to_string(),
                    None => break "stream ended".to_string(),
                }
            };
            let _ = tx.send(PushEvent::Disconnected { reason }).await;
        });

        Ok(rx)
    }
}

/// Map one text frame to a supervisor event. Client-bound messages we do not
/// act on yield `None`.
fn decode(text: &str) -> Result<Option<PushEvent>, TransportError> {
    let message: PushMessage = serde_json::from_str(text).map_err(|e| TransportError::Decode {
        reason: e.to_string(),
    })?;
    Ok(match message {
        PushMessage::Status(status) => Some(PushEvent::Status(status)),
        PushMessage::TriggerSound(delivery) => Some(PushEvent::TriggerSound(delivery)),
        PushMessage::PlayAmount(_) => None,
    })
}
