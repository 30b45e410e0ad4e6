//! Risk checks
//!
//! Stateless evaluation of configured thresholds against a portfolio
//! snapshot. Pre-trade checks can block a proposed buy; post-trade checks
//! only surface alerts for the operator.

use crate::types::{PortfolioSnapshot, RiskAlert, RiskAlertKind, RiskLimits};

/// A trade the engine intends to execute, before any state changes.
#[derive(Debug, Clone)]
pub struct ProposedBuy {
    pub symbol: String,
    pub quantity: u64,
    pub price: f64,
    pub timestamp: i64,
}

/// Stateless risk evaluator over a set of configured limits.
#[derive(Debug, Clone)]
pub struct RiskEngine {
    limits: RiskLimits,
}

impl RiskEngine {
    pub fn new(limits: RiskLimits) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &RiskLimits {
        &self.limits
    }

    /// Evaluate a proposed buy against the current snapshot.
    ///
    /// The projected position value is the symbol's current market value
    /// plus the proposed notional; total value is unchanged because a buy
    /// swaps cash for position. Any returned alert blocks the trade.
    pub fn check_pre_trade(
        &self,
        proposed: &ProposedBuy,
        snapshot: &PortfolioSnapshot,
    ) -> Vec<RiskAlert> {
        let mut alerts = Vec::new();
        if snapshot.total_value <= 0.0 {
            return alerts;
        }

        let current_value = snapshot
            .holding(&proposed.symbol)
            .and_then(|h| h.market_value)
            .unwrap_or(0.0);
        let projected_value = current_value + proposed.quantity as f64 * proposed.price;
        let projected_pct = projected_value / snapshot.total_value;

        if projected_pct > self.limits.max_position_pct {
            alerts.push(RiskAlert {
                kind: RiskAlertKind::MaxPositionSizePreTrade,
                symbol: Some(proposed.symbol.clone()),
                message: format!(
                    "Proposed buy of {} {} @ {:.2} would put the position at {:.2}% of portfolio value (limit {:.2}%)",
                    proposed.quantity,
                    proposed.symbol,
                    proposed.price,
                    projected_pct * 100.0,
                    self.limits.max_position_pct * 100.0
                ),
                timestamp: proposed.timestamp,
            });
        }

        alerts
    }

    /// Monitoring checks over current state: per-position stop-loss,
    /// position-size drift, and account drawdown. Never blocks.
    pub fn check_post_trade(
        &self,
        snapshot: &PortfolioSnapshot,
        timestamp: i64,
    ) -> Vec<RiskAlert> {
        let mut alerts = Vec::new();

        for holding in &snapshot.holdings {
            let (Some(current_price), Some(market_value)) =
                (holding.current_price, holding.market_value)
            else {
                continue;
            };

            if holding.average_cost_price > 0.0 {
                let loss_pct =
                    (holding.average_cost_price - current_price) / holding.average_cost_price;
                if loss_pct >= self.limits.stop_loss_pct {
                    alerts.push(RiskAlert {
                        kind: RiskAlertKind::StopLossPerPosition,
                        symbol: Some(holding.symbol.clone()),
                        message: format!(
                            "Stop-loss on {}: down {:.2}% from average cost {:.2} (limit {:.2}%), current price {:.2}",
                            holding.symbol,
                            loss_pct * 100.0,
                            holding.average_cost_price,
                            self.limits.stop_loss_pct * 100.0,
                            current_price
                        ),
                        timestamp,
                    });
                }
            }

            if snapshot.total_value > 0.0 {
                let position_pct = market_value / snapshot.total_value;
                if position_pct > self.limits.max_position_pct {
                    alerts.push(RiskAlert {
                        kind: RiskAlertKind::MaxPositionSize,
                        symbol: Some(holding.symbol.clone()),
                        message: format!(
                            "Position {} is {:.2}% of portfolio value (limit {:.2}%), market value {:.2}",
                            holding.symbol,
                            position_pct * 100.0,
                            self.limits.max_position_pct * 100.0,
                            market_value
                        ),
                        timestamp,
                    });
                }
            }
        }

        if snapshot.high_water_mark > 0.0 {
            let drawdown =
                (snapshot.high_water_mark - snapshot.total_value) / snapshot.high_water_mark;
            if drawdown >= self.limits.max_drawdown_pct {
                alerts.push(RiskAlert {
                    kind: RiskAlertKind::MaxAccountDrawdown,
                    symbol: None,
                    message: format!(
                        "Account drawdown {:.2}% from peak {:.2} (limit {:.2}%), current value {:.2}",
                        drawdown * 100.0,
                        snapshot.high_water_mark,
                        self.limits.max_drawdown_pct * 100.0,
                        snapshot.total_value
                    ),
                    timestamp,
                });
            }
        }

        alerts
    }
}
