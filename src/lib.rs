//! Papertrail - simulated live-trading server for quantitative strategy
//! research.
//!
//! The core loop wires a market data provider (simulated random walk or an
//! external quote poller) through a strategy into a mock trading engine
//! with pre- and post-trade risk checks, all owned by a single session
//! manager that handles start/stop/resume and periodic state persistence.

pub mod api;
pub mod config;
pub mod error;
pub mod providers;
pub mod services;
pub mod types;

use std::sync::Arc;

use config::Config;
use services::{BarStore, SessionManager};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub sessions: Arc<SessionManager>,
    pub bars: Arc<BarStore>,
}

// Re-export commonly used types
pub use error::{AppError, Result};
pub use types::*;
