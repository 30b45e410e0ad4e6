//! Market event types.
//!
//! A `DataTick` is a single price observation emitted by a data provider;
//! a `SignalEvent` is a strategy's directive derived from ticks.

use serde::{Deserialize, Serialize};

/// A single price observation for a symbol at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataTick {
    pub symbol: String,
    pub price: f64,
    /// Millisecond Unix timestamp.
    pub timestamp: i64,
}

impl DataTick {
    pub fn new(symbol: impl Into<String>, price: f64, timestamp: i64) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            timestamp,
        }
    }
}

/// A strategy directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    Buy,
    Sell,
    Hold,
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Signal::Buy => write!(f, "buy"),
            Signal::Sell => write!(f, "sell"),
            Signal::Hold => write!(f, "hold"),
        }
    }
}

/// A signal produced by a strategy in response to a tick.
///
/// Consumed exactly once by the trading engine; never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalEvent {
    pub symbol: String,
    pub signal: Signal,
    pub price: f64,
    pub timestamp: i64,
}

impl SignalEvent {
    pub fn new(symbol: impl Into<String>, signal: Signal, price: f64, timestamp: i64) -> Self {
        Self {
            symbol: symbol.into(),
            signal,
            price,
            timestamp,
        }
    }
}
