//! Push channel endpoint
//!
//! Each connection attaches to the relay; relay messages go out as JSON text
//! frames. The only client message acted on is `play-amount`.

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use chime_types::PushMessage;
use futures_util::{SinkExt, StreamExt};

use super::state::ServerState;

pub async fn socket(ws: WebSocketUpgrade, State(state): State<ServerState>) -> Response {
    ws.on_upgrade(move |socket| session(socket, state))
}

async fn session(socket: WebSocket, state: ServerState) {
    let mut subscription = state.relay.attach();
    let session = subscription.id().to_string();
    let (mut sender, mut receiver) = socket.split();
    tracing::info!(%session, "Push client connected");

    loop {
        tokio::select! {
            outgoing = subscription.next() => {
                let Some(message) = outgoing else { break };
                let text = match serde_json::to_string(&message) {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to encode push message");
                        continue;
                    }
                };
                if sender.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Text(text))) => client_message(&state, &session, &text),
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    tracing::debug!(%session, error = %e, "Push socket error");
                    break;
                }
                Some(Ok(_)) => {}
            },
        }
    }

    tracing::info!(%session, "Push client disconnected");
}

fn client_message(state: &ServerState, session: &str, text: &str) {
    match serde_json::from_str::<PushMessage>(text) {
        Ok(PushMessage::PlayAmount(amount)) => {
            if let Err(e) = state.ingestor.accept_relay_only(amount) {
                tracing::info!(%session, amount, error = %e, "Rejected play-amount");
            }
        }
        Ok(other) => tracing::debug!(%session, message = ?other, "Ignoring client message"),
        Err(e) => tracing::debug!(%session, error = %e, "Unrecognized client message"),
    }
}
