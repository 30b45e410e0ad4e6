//! Trading state types: holdings, trade records, and the derived
//! portfolio snapshot served to the API.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Direction of an executed trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl std::fmt::Display for TradeSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradeSide::Buy => write!(f, "buy"),
            TradeSide::Sell => write!(f, "sell"),
        }
    }
}

/// A position in a single symbol, owned exclusively by the portfolio.
///
/// Created on the first buy of a symbol; the average cost price is
/// quantity-weighted across subsequent buys and left untouched by sells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub symbol: String,
    pub quantity: u64,
    pub average_cost_price: f64,
    /// Last price observed via mark-to-market, if any.
    pub last_price: Option<f64>,
}

impl Holding {
    /// Market value at the last observed price, if one is known.
    pub fn market_value(&self) -> Option<f64> {
        self.last_price.map(|p| self.quantity as f64 * p)
    }

    /// Unrealized P&L at the last observed price, if one is known.
    pub fn unrealized_pnl(&self) -> Option<f64> {
        self.last_price
            .map(|p| self.quantity as f64 * (p - self.average_cost_price))
    }
}

/// An executed trade. Append-only and immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub trade_id: String,
    pub symbol: String,
    /// Millisecond Unix timestamp.
    pub timestamp: i64,
    pub side: TradeSide,
    pub quantity: u64,
    pub price: f64,
    /// Cost for buys, proceeds for sells.
    pub total_value: f64,
}

/// Per-holding view with market data attached.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldingStatus {
    pub symbol: String,
    pub quantity: u64,
    pub average_cost_price: f64,
    pub current_price: Option<f64>,
    pub market_value: Option<f64>,
    pub unrealized_pnl: Option<f64>,
}

/// Derived portfolio view. Computed on demand, never stored as its own
/// entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioSnapshot {
    pub cash: f64,
    pub holdings_value: f64,
    pub total_value: f64,
    pub realized_pnl: f64,
    pub unrealized_pnl: f64,
    pub total_pnl: f64,
    pub holdings: Vec<HoldingStatus>,
    /// Percentage of total value per symbol.
    pub asset_allocation: HashMap<String, f64>,
    pub high_water_mark: f64,
    pub is_running: bool,
}

impl PortfolioSnapshot {
    /// Status row for a symbol, if held.
    pub fn holding(&self, symbol: &str) -> Option<&HoldingStatus> {
        self.holdings.iter().find(|h| h.symbol == symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_holding_market_value() {
        let holding = Holding {
            symbol: "AAPL".to_string(),
            quantity: 10,
            average_cost_price: 150.0,
            last_price: Some(160.0),
        };

        assert_eq!(holding.market_value(), Some(1600.0));
        assert_eq!(holding.unrealized_pnl(), Some(100.0));
    }

    #[test]
    fn test_holding_unmarked() {
        let holding = Holding {
            symbol: "AAPL".to_string(),
            quantity: 10,
            average_cost_price: 150.0,
            last_price: None,
        };

        assert_eq!(holding.market_value(), None);
        assert_eq!(holding.unrealized_pnl(), None);
    }

    #[test]
    fn test_trade_side_serialization() {
        assert_eq!(serde_json::to_string(&TradeSide::Buy).unwrap(), "\"buy\"");
        assert_eq!(serde_json::to_string(&TradeSide::Sell).unwrap(), "\"sell\"");
    }
}
