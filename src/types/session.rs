//! Session configuration types.
//!
//! A `SessionConfig` is the full recipe for one simulation session: it is
//! retained across stop/resume and persisted with every snapshot so the
//! strategy and data provider can be reconstructed after a restart.

use serde::{Deserialize, Serialize};

use super::risk::RiskLimits;

/// Per-symbol configuration for the simulated tick generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimSymbol {
    pub symbol: String,
    pub initial_price: f64,
    /// Maximum per-tick price change as a fraction (e.g. 0.01 = ±1%).
    pub volatility: f64,
    /// Tick generation interval in milliseconds.
    pub interval_ms: u64,
}

/// Data provider selection and configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Synthesizes random-walk ticks for the configured symbols.
    Simulated { symbols: Vec<SimSymbol> },
    /// Polls an external quote API for the configured symbols.
    Polling {
        symbols: Vec<String>,
        poll_interval_secs: u64,
    },
}

impl ProviderConfig {
    /// Symbols this provider will produce ticks for.
    pub fn symbols(&self) -> Vec<String> {
        match self {
            ProviderConfig::Simulated { symbols } => {
                symbols.iter().map(|s| s.symbol.clone()).collect()
            }
            ProviderConfig::Polling { symbols, .. } => symbols.clone(),
        }
    }
}

/// Name and parameters of the active strategy, as reported by the status
/// endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyInfo {
    pub name: String,
    pub parameters: serde_json::Value,
}

/// Everything needed to reconstruct a session's live components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub strategy_id: String,
    pub parameters: serde_json::Value,
    pub initial_capital: f64,
    pub risk_limits: RiskLimits,
    pub provider: ProviderConfig,
}
