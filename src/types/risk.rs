//! Risk alert and threshold types.

use serde::{Deserialize, Serialize};

/// Kind of risk alert raised by the risk engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskAlertKind {
    /// A position's unrealized loss breached the per-position stop-loss.
    StopLossPerPosition,
    /// A position's share of portfolio value drifted past the limit.
    MaxPositionSize,
    /// A proposed buy would push a position past the size limit (blocking).
    MaxPositionSizePreTrade,
    /// The account drew down too far from its high-water mark.
    MaxAccountDrawdown,
}

impl std::fmt::Display for RiskAlertKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RiskAlertKind::StopLossPerPosition => "STOP_LOSS_PER_POSITION",
            RiskAlertKind::MaxPositionSize => "MAX_POSITION_SIZE",
            RiskAlertKind::MaxPositionSizePreTrade => "MAX_POSITION_SIZE_PRE_TRADE",
            RiskAlertKind::MaxAccountDrawdown => "MAX_ACCOUNT_DRAWDOWN",
        };
        write!(f, "{}", s)
    }
}

/// An alert raised by a risk check.
///
/// `symbol` is absent for account-level alerts (drawdown).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAlert {
    pub kind: RiskAlertKind,
    pub symbol: Option<String>,
    pub message: String,
    /// Millisecond Unix timestamp.
    pub timestamp: i64,
}

/// Configured risk thresholds, all expressed as fractions in (0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskLimits {
    pub stop_loss_pct: f64,
    pub max_position_pct: f64,
    pub max_drawdown_pct: f64,
}

impl Default for RiskLimits {
    fn default() -> Self {
        Self {
            stop_loss_pct: 0.10,
            max_position_pct: 0.25,
            max_drawdown_pct: 0.15,
        }
    }
}

impl RiskLimits {
    /// Validate that every threshold lies in (0, 1].
    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("stop_loss_pct", self.stop_loss_pct),
            ("max_position_pct", self.max_position_pct),
            ("max_drawdown_pct", self.max_drawdown_pct),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(format!(
                    "risk parameter '{}' must be in (0, 1], got {}",
                    name, value
                ));
            }
        }
        Ok(())
    }
}
