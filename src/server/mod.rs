//! HTTP and WebSocket surface of the announcement server
//!
//! - `POST /api/trigger` (and legacy `POST /api/socket`): ingestion
//! - `GET /api/socket`: push channel (WebSocket upgrade)
//! - `GET /api/check-amounts`: drain the pull buffer
//! - `GET /api/check-sounds`: clip inventory report
//! - `GET /healthz`

mod handlers;
mod router;
mod state;
mod ws;

use std::net::SocketAddr;

use thiserror::Error;

pub use router::build_router;
pub use state::ServerState;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid bind address '{addr}'")]
    InvalidBind {
        addr: String,
        #[source]
        source: std::net::AddrParseError,
    },

    #[error("failed to bind {addr}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("server terminated")]
    Serve(#[source] std::io::Error),
}

/// Bind and serve until the process is stopped
pub async fn serve(bind: &str, state: ServerState) -> Result<(), ServerError> {
    let addr: SocketAddr = bind.parse().map_err(|source| ServerError::InvalidBind {
        addr: bind.to_string(),
        source,
    })?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;

    tracing::info!(%addr, boot = state.ingestor.boot(), "chime server listening");
    axum::serve(listener, build_router(state))
        .await
        .map_err(ServerError::Serve)
}
