//! HTTP API
//!
//! Thin axum routers over the session manager: lifecycle commands, status
//! snapshots, strategy discovery, and kline data for charts.

pub mod health;
pub mod simulation;

use axum::Router;

use crate::AppState;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .nest("/api/simulation", simulation::router())
}
