//! Simulation control and status endpoints.
//!
//! The API layer never mutates portfolio or engine state directly; every
//! command goes through the session manager and every read is a snapshot.

use axum::{
    extract::{Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::services::bars::{BarRange, OhlcBar};
use crate::services::session::{SessionStatus, StartCommand};
use crate::services::strategies::{self, StrategyDescriptor};
use crate::AppState;

/// Response for lifecycle commands.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub message: String,
}

/// Query parameters for the klines endpoint.
#[derive(Debug, Deserialize)]
pub struct KlinesQuery {
    pub symbol: String,
    /// One of "1h", "1d", "1w". Defaults to "1h".
    pub range: Option<String>,
}

/// Create simulation API routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/status", get(get_status))
        .route("/strategies", get(get_strategies))
        .route("/start", post(start_simulation))
        .route("/stop", post(stop_simulation))
        .route("/resume", post(resume_simulation))
        .route("/klines", get(get_klines))
}

/// GET /api/simulation/status
async fn get_status(State(state): State<AppState>) -> Json<SessionStatus> {
    Json(state.sessions.status().await)
}

/// GET /api/simulation/strategies
async fn get_strategies() -> Json<Vec<StrategyDescriptor>> {
    Json(strategies::descriptors())
}

/// POST /api/simulation/start
async fn start_simulation(
    State(state): State<AppState>,
    Json(command): Json<StartCommand>,
) -> Result<Json<MessageResponse>, AppError> {
    let message = state.sessions.start(command).await?;
    Ok(Json(MessageResponse { message }))
}

/// POST /api/simulation/stop
async fn stop_simulation(
    State(state): State<AppState>,
) -> Result<Json<MessageResponse>, AppError> {
    let message = state.sessions.stop().await?;
    Ok(Json(MessageResponse { message }))
}

/// POST /api/simulation/resume
async fn resume_simulation(
    State(state): State<AppState>,
) -> Result<Json<MessageResponse>, AppError> {
    let message = state.sessions.resume().await?;
    Ok(Json(MessageResponse { message }))
}

/// GET /api/simulation/klines?symbol=SIM_A&range=1h
async fn get_klines(
    State(state): State<AppState>,
    Query(query): Query<KlinesQuery>,
) -> Result<Json<Vec<OhlcBar>>, AppError> {
    let range = match query.range.as_deref() {
        None => BarRange::OneHour,
        Some(raw) => BarRange::parse(raw).ok_or_else(|| {
            AppError::BadRequest(format!(
                "Unknown range '{}'; expected one of 1h, 1d, 1w",
                raw
            ))
        })?,
    };

    Ok(Json(state.bars.bars(&query.symbol, range)))
}
