//! Axum router wiring.
//!
//! `/v1/hub` upgrades to the presence WebSocket; `/metrics` and `/healthz`
//! are plain HTTP.

use axum::{extract::State, routing::get, Router};

use crate::{app_state::AppState, transport};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/v1/hub", get(transport::ws::ws_upgrade))
        .route("/metrics", get(metrics))
        .route("/healthz", get(healthz))
        .with_state(state)
}

async fn metrics(State(app): State<AppState>) -> String {
    app.metrics().render(&app.presence_snapshot())
}

async fn healthz() -> &'static str {
    "ok"
}
