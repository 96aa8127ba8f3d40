use axum::Router;
use axum::routing::{get, post};

use super::handlers::{check_amounts, check_sounds, healthz, method_not_allowed, trigger};
use super::state::ServerState;
use super::ws::socket;

pub fn build_router(state: ServerState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/trigger", post(trigger).fallback(method_not_allowed))
        .route(
            "/api/socket",
            get(socket).post(trigger).fallback(method_not_allowed),
        )
        .route(
            "/api/check-amounts",
            get(check_amounts).fallback(method_not_allowed),
        )
        .route(
            "/api/check-sounds",
            get(check_sounds).fallback(method_not_allowed),
        )
        .with_state(state)
}
