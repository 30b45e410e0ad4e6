//! Portfolio ledger
//!
//! Ground truth for cash and holdings. The portfolio is the sole writer of
//! trade effects: buys and sells either apply fully or are rejected before
//! any mutation. It also owns the append-only trade log, cumulative
//! realized P&L, and the equity high-water mark used for drawdown checks.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use crate::types::{Holding, HoldingStatus, PortfolioSnapshot, TradeRecord, TradeSide};

/// Trade execution errors.
#[derive(Debug, Error)]
pub enum PortfolioError {
    #[error("Insufficient funds: need {needed:.2}, have {available:.2}")]
    InsufficientFunds { needed: f64, available: f64 },

    #[error("Insufficient holdings of {symbol}: selling {requested}, held {held}")]
    InsufficientHoldings {
        symbol: String,
        requested: u64,
        held: u64,
    },

    #[error("Invalid trade: {0}")]
    InvalidTrade(String),
}

/// A simulated portfolio: cash, holdings, realized P&L, trade log, and the
/// equity high-water mark.
///
/// Serializes in full; `deserialize(serialize(p))` reproduces an observably
/// identical portfolio.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Portfolio {
    cash: f64,
    holdings: HashMap<String, Holding>,
    realized_pnl: f64,
    high_water_mark: f64,
    trades: Vec<TradeRecord>,
    next_trade_seq: u64,
}

impl Portfolio {
    /// Create a portfolio with the given starting cash.
    pub fn new(initial_cash: f64) -> Result<Self, PortfolioError> {
        if initial_cash < 0.0 || !initial_cash.is_finite() {
            return Err(PortfolioError::InvalidTrade(format!(
                "initial cash must be non-negative, got {}",
                initial_cash
            )));
        }
        Ok(Self {
            cash: initial_cash,
            holdings: HashMap::new(),
            realized_pnl: 0.0,
            high_water_mark: initial_cash,
            trades: Vec::new(),
            next_trade_seq: 0,
        })
    }

    pub fn cash(&self) -> f64 {
        self.cash
    }

    pub fn realized_pnl(&self) -> f64 {
        self.realized_pnl
    }

    pub fn high_water_mark(&self) -> f64 {
        self.high_water_mark
    }

    pub fn holding(&self, symbol: &str) -> Option<&Holding> {
        self.holdings.get(symbol)
    }

    pub fn holdings(&self) -> impl Iterator<Item = &Holding> {
        self.holdings.values()
    }

    pub fn trades(&self) -> &[TradeRecord] {
        &self.trades
    }

    /// The most recent `limit` trades, oldest first.
    pub fn recent_trades(&self, limit: usize) -> Vec<TradeRecord> {
        let start = self.trades.len().saturating_sub(limit);
        self.trades[start..].to_vec()
    }

    fn next_trade_id(&mut self) -> String {
        self.next_trade_seq += 1;
        format!("TRD-{:05}", self.next_trade_seq)
    }

    /// Execute a trade against the ledger.
    ///
    /// Buys require sufficient cash; sells require sufficient held quantity.
    /// A rejected trade leaves cash and holdings untouched.
    pub fn execute_trade(
        &mut self,
        symbol: &str,
        side: TradeSide,
        quantity: u64,
        price: f64,
        timestamp: i64,
    ) -> Result<TradeRecord, PortfolioError> {
        if quantity == 0 {
            return Err(PortfolioError::InvalidTrade(format!(
                "quantity must be positive for {}",
                symbol
            )));
        }
        if price <= 0.0 || !price.is_finite() {
            return Err(PortfolioError::InvalidTrade(format!(
                "price must be positive for {}, got {}",
                symbol, price
            )));
        }

        let total_value = quantity as f64 * price;

        match side {
            TradeSide::Buy => {
                if self.cash < total_value {
                    return Err(PortfolioError::InsufficientFunds {
                        needed: total_value,
                        available: self.cash,
                    });
                }

                self.cash -= total_value;
                match self.holdings.get_mut(symbol) {
                    Some(holding) => {
                        let old_qty = holding.quantity as f64;
                        let new_qty = old_qty + quantity as f64;
                        holding.average_cost_price =
                            (holding.average_cost_price * old_qty + total_value) / new_qty;
                        holding.quantity += quantity;
                        holding.last_price = Some(price);
                    }
                    None => {
                        self.holdings.insert(
                            symbol.to_string(),
                            Holding {
                                symbol: symbol.to_string(),
                                quantity,
                                average_cost_price: price,
                                last_price: Some(price),
                            },
                        );
                    }
                }
            }
            TradeSide::Sell => match self.holdings.get_mut(symbol) {
                Some(holding) if holding.quantity >= quantity => {
                    self.cash += total_value;
                    self.realized_pnl +=
                        quantity as f64 * (price - holding.average_cost_price);
                    holding.quantity -= quantity;
                    holding.last_price = Some(price);
                    if holding.quantity == 0 {
                        self.holdings.remove(symbol);
                    }
                }
                other => {
                    let held = other.map(|h| h.quantity).unwrap_or(0);
                    return Err(PortfolioError::InsufficientHoldings {
                        symbol: symbol.to_string(),
                        requested: quantity,
                        held,
                    });
                }
            },
        }

        let record = TradeRecord {
            trade_id: self.next_trade_id(),
            symbol: symbol.to_string(),
            timestamp,
            side,
            quantity,
            price,
            total_value,
        };
        self.trades.push(record.clone());
        Ok(record)
    }

    /// Update per-holding marks from the given prices and raise the
    /// high-water mark if total value made a new peak.
    ///
    /// Never fails; symbols missing from `prices` keep their last-known
    /// mark.
    pub fn mark_to_market(&mut self, prices: &HashMap<String, f64>) {
        for holding in self.holdings.values_mut() {
            if let Some(price) = prices.get(&holding.symbol) {
                if *price > 0.0 {
                    holding.last_price = Some(*price);
                }
            }
        }

        let total = self.total_value();
        if total > self.high_water_mark {
            self.high_water_mark = total;
        }
    }

    /// Market value of all holdings at their last-known marks. Holdings
    /// never marked contribute nothing.
    pub fn holdings_value(&self) -> f64 {
        self.holdings
            .values()
            .filter_map(|h| h.market_value())
            .sum()
    }

    /// Cash plus the market value of all holdings.
    pub fn total_value(&self) -> f64 {
        self.cash + self.holdings_value()
    }

    /// Unrealized P&L across all holdings at their last-known marks.
    pub fn unrealized_pnl(&self) -> f64 {
        self.holdings
            .values()
            .filter_map(|h| h.unrealized_pnl())
            .sum()
    }

    /// Pure read projection of the current state.
    pub fn snapshot(&self, is_running: bool) -> PortfolioSnapshot {
        let mut holdings: Vec<HoldingStatus> = self
            .holdings
            .values()
            .map(|h| HoldingStatus {
                symbol: h.symbol.clone(),
                quantity: h.quantity,
                average_cost_price: h.average_cost_price,
                current_price: h.last_price,
                market_value: h.market_value(),
                unrealized_pnl: h.unrealized_pnl(),
            })
            .collect();
        holdings.sort_by(|a, b| a.symbol.cmp(&b.symbol));

        let total_value = self.total_value();
        let mut asset_allocation = HashMap::new();
        if total_value > 0.0 {
            for status in &holdings {
                if let Some(value) = status.market_value {
                    asset_allocation
                        .insert(status.symbol.clone(), value / total_value * 100.0);
                }
            }
        }

        let unrealized = self.unrealized_pnl();
        PortfolioSnapshot {
            cash: self.cash,
            holdings_value: self.holdings_value(),
            total_value,
            realized_pnl: self.realized_pnl,
            unrealized_pnl: unrealized,
            total_pnl: self.realized_pnl + unrealized,
            holdings,
            asset_allocation,
            high_water_mark: self.high_water_mark,
            is_running,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prices(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
        pairs.iter().map(|(s, p)| (s.to_string(), *p)).collect()
    }

    #[test]
    fn test_new_rejects_negative_cash() {
        assert!(Portfolio::new(-1.0).is_err());
        assert!(Portfolio::new(0.0).is_ok());
    }

    #[test]
    fn test_buy_updates_cash_and_holding() {
        let mut portfolio = Portfolio::new(10_000.0).unwrap();
        portfolio
            .execute_trade("AAPL", TradeSide::Buy, 10, 150.0, 1)
            .unwrap();

        assert_eq!(portfolio.cash(), 8_500.0);
        let holding = portfolio.holding("AAPL").unwrap();
        assert_eq!(holding.quantity, 10);
        assert_eq!(holding.average_cost_price, 150.0);
        assert_eq!(portfolio.trades().len(), 1);
    }

    #[test]
    fn test_weighted_average_cost() {
        let mut portfolio = Portfolio::new(10_000.0).unwrap();
        portfolio
            .execute_trade("AAPL", TradeSide::Buy, 10, 100.0, 1)
            .unwrap();
        portfolio
            .execute_trade("AAPL", TradeSide::Buy, 10, 200.0, 2)
            .unwrap();

        let holding = portfolio.holding("AAPL").unwrap();
        assert_eq!(holding.quantity, 20);
        assert_eq!(holding.average_cost_price, 150.0);
    }

    #[test]
    fn test_realized_pnl_on_sell() {
        let mut portfolio = Portfolio::new(10_000.0).unwrap();
        portfolio
            .execute_trade("AAPL", TradeSide::Buy, 10, 100.0, 1)
            .unwrap();
        portfolio
            .execute_trade("AAPL", TradeSide::Buy, 10, 200.0, 2)
            .unwrap();
        portfolio
            .execute_trade("AAPL", TradeSide::Sell, 10, 180.0, 3)
            .unwrap();

        assert_eq!(portfolio.realized_pnl(), 300.0);
        let holding = portfolio.holding("AAPL").unwrap();
        assert_eq!(holding.quantity, 10);
        assert_eq!(holding.average_cost_price, 150.0);
    }

    #[test]
    fn test_insufficient_funds_rejected_without_mutation() {
        let mut portfolio = Portfolio::new(1_000.0).unwrap();
        let err = portfolio
            .execute_trade("GOOG", TradeSide::Buy, 10, 500.0, 1)
            .unwrap_err();

        assert!(matches!(err, PortfolioError::InsufficientFunds { .. }));
        assert_eq!(portfolio.cash(), 1_000.0);
        assert!(portfolio.holding("GOOG").is_none());
        assert!(portfolio.trades().is_empty());
    }

    #[test]
    fn test_oversized_sell_rejected_without_mutation() {
        let mut portfolio = Portfolio::new(10_000.0).unwrap();
        portfolio
            .execute_trade("AAPL", TradeSide::Buy, 5, 100.0, 1)
            .unwrap();

        let err = portfolio
            .execute_trade("AAPL", TradeSide::Sell, 10, 110.0, 2)
            .unwrap_err();
        assert!(matches!(err, PortfolioError::InsufficientHoldings { .. }));
        assert_eq!(portfolio.holding("AAPL").unwrap().quantity, 5);
        assert_eq!(portfolio.cash(), 9_500.0);
    }

    #[test]
    fn test_holding_removed_when_fully_sold() {
        let mut portfolio = Portfolio::new(10_000.0).unwrap();
        portfolio
            .execute_trade("MSFT", TradeSide::Buy, 5, 280.0, 1)
            .unwrap();
        portfolio
            .execute_trade("MSFT", TradeSide::Sell, 5, 290.0, 2)
            .unwrap();

        assert!(portfolio.holding("MSFT").is_none());
        assert_eq!(portfolio.realized_pnl(), 50.0);
    }

    #[test]
    fn test_cash_conservation() {
        let mut portfolio = Portfolio::new(10_000.0).unwrap();
        portfolio
            .execute_trade("AAPL", TradeSide::Buy, 10, 100.0, 1)
            .unwrap();
        portfolio
            .execute_trade("AAPL", TradeSide::Sell, 4, 120.0, 2)
            .unwrap();

        // cash + cost basis of remaining holdings == initial + realized pnl
        let basis: f64 = portfolio
            .holdings()
            .map(|h| h.quantity as f64 * h.average_cost_price)
            .sum();
        let ledger = portfolio.cash() + basis;
        assert!((ledger - (10_000.0 + portfolio.realized_pnl())).abs() < 1e-9);
    }

    #[test]
    fn test_mark_to_market_and_high_water_mark() {
        let mut portfolio = Portfolio::new(10_000.0).unwrap();
        portfolio
            .execute_trade("AAPL", TradeSide::Buy, 10, 100.0, 1)
            .unwrap();
        assert_eq!(portfolio.high_water_mark(), 10_000.0);

        portfolio.mark_to_market(&prices(&[("AAPL", 150.0)]));
        assert_eq!(portfolio.total_value(), 10_500.0);
        assert_eq!(portfolio.high_water_mark(), 10_500.0);

        // A falling price never lowers the high-water mark.
        portfolio.mark_to_market(&prices(&[("AAPL", 90.0)]));
        assert_eq!(portfolio.total_value(), 9_900.0);
        assert_eq!(portfolio.high_water_mark(), 10_500.0);
    }

    #[test]
    fn test_mark_to_market_missing_price_keeps_last_mark() {
        let mut portfolio = Portfolio::new(10_000.0).unwrap();
        portfolio
            .execute_trade("AAPL", TradeSide::Buy, 10, 100.0, 1)
            .unwrap();
        portfolio.mark_to_market(&prices(&[("AAPL", 110.0)]));
        portfolio.mark_to_market(&prices(&[("MSFT", 300.0)]));

        assert_eq!(portfolio.holding("AAPL").unwrap().last_price, Some(110.0));
    }

    #[test]
    fn test_snapshot_allocation() {
        let mut portfolio = Portfolio::new(10_000.0).unwrap();
        portfolio
            .execute_trade("AAPL", TradeSide::Buy, 10, 100.0, 1)
            .unwrap();
        portfolio.mark_to_market(&prices(&[("AAPL", 100.0)]));

        let snapshot = portfolio.snapshot(true);
        assert_eq!(snapshot.total_value, 10_000.0);
        assert_eq!(snapshot.asset_allocation["AAPL"], 10.0);
        assert!(snapshot.is_running);
    }

    #[test]
    fn test_serde_roundtrip() {
        let mut portfolio = Portfolio::new(10_000.0).unwrap();
        portfolio
            .execute_trade("AAPL", TradeSide::Buy, 10, 100.0, 1)
            .unwrap();
        portfolio
            .execute_trade("AAPL", TradeSide::Sell, 3, 130.0, 2)
            .unwrap();
        portfolio.mark_to_market(&prices(&[("AAPL", 125.0)]));

        let json = serde_json::to_string(&portfolio).unwrap();
        let restored: Portfolio = serde_json::from_str(&json).unwrap();

        assert_eq!(restored.cash(), portfolio.cash());
        assert_eq!(restored.realized_pnl(), portfolio.realized_pnl());
        assert_eq!(restored.high_water_mark(), portfolio.high_water_mark());
        assert_eq!(restored.trades().len(), portfolio.trades().len());
        assert_eq!(
            restored.holding("AAPL").unwrap(),
            portfolio.holding("AAPL").unwrap()
        );

        // Trade ids keep counting from where the original left off.
        let mut restored = restored;
        let record = restored
            .execute_trade("AAPL", TradeSide::Buy, 1, 120.0, 3)
            .unwrap();
        assert_eq!(record.trade_id, "TRD-00003");
    }
}
