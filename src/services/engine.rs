//! Trading engine
//!
//! Orchestrates signal processing: sizes a proposed trade, runs the
//! pre-trade risk check (which may block), executes against the portfolio,
//! then runs post-trade monitoring. Execution failures (insufficient funds
//! or holdings) are recorded and skipped; they never stop the tick loop.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::providers::PriceSource;
use crate::services::portfolio::Portfolio;
use crate::services::risk::{ProposedBuy, RiskEngine};
use crate::types::{
    DataTick, PortfolioSnapshot, RiskAlert, RiskLimits, Signal, SignalEvent, TradeRecord,
    TradeSide,
};

/// How the engine sizes a trade from a signal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum SizingPolicy {
    /// Trade a fixed share count per signal.
    FixedQuantity { quantity: u64 },
    /// Buys spend a fraction of available cash; sells liquidate the holding.
    CashFraction { fraction: f64 },
}

/// A trade the portfolio refused to execute. Distinct from risk alerts:
/// these are execution errors, not risk-rule breaches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionFailure {
    pub symbol: String,
    pub side: TradeSide,
    pub quantity: u64,
    pub price: f64,
    pub reason: String,
    pub timestamp: i64,
}

/// Serializable engine state for the persistence protocol.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineRecord {
    pub portfolio: Portfolio,
    pub sizing: SizingPolicy,
    pub risk_limits: RiskLimits,
    pub alerts: Vec<RiskAlert>,
    pub failures: Vec<ExecutionFailure>,
    pub alert_capacity: usize,
}

/// Simulated trading engine. Sole consumer of signal events; sole caller of
/// portfolio mutations.
pub struct TradingEngine {
    portfolio: Portfolio,
    risk: RiskEngine,
    sizing: SizingPolicy,
    alerts: Vec<RiskAlert>,
    failures: Vec<ExecutionFailure>,
    alert_capacity: usize,
    /// Rewired on every start/resume; absent after a bare boot-restore.
    price_source: Option<Arc<dyn PriceSource>>,
}

impl TradingEngine {
    pub fn new(
        portfolio: Portfolio,
        risk_limits: RiskLimits,
        sizing: SizingPolicy,
        alert_capacity: usize,
    ) -> Self {
        Self {
            portfolio,
            risk: RiskEngine::new(risk_limits),
            sizing,
            alerts: Vec::new(),
            failures: Vec::new(),
            alert_capacity,
            price_source: None,
        }
    }

    /// Wire in the live price source used for mark-to-market lookups.
    pub fn set_price_source(&mut self, source: Arc<dyn PriceSource>) {
        self.price_source = Some(source);
    }

    /// Drop the price source (on stop); marks fall back to last-known.
    pub fn clear_price_source(&mut self) {
        self.price_source = None;
    }

    pub fn portfolio(&self) -> &Portfolio {
        &self.portfolio
    }

    pub fn alerts(&self) -> &[RiskAlert] {
        &self.alerts
    }

    pub fn failures(&self) -> &[ExecutionFailure] {
        &self.failures
    }

    pub fn snapshot(&self, is_running: bool) -> PortfolioSnapshot {
        self.portfolio.snapshot(is_running)
    }

    pub fn recent_trades(&self, limit: usize) -> Vec<TradeRecord> {
        self.portfolio.recent_trades(limit)
    }

    /// Current price for a symbol via the wired provider, if any.
    pub fn current_price(&self, symbol: &str) -> Option<f64> {
        self.price_source
            .as_ref()
            .and_then(|s| s.current_price(symbol))
    }

    /// Mark all holdings to market from the wired price source.
    fn refresh_marks(&mut self) {
        let Some(source) = self.price_source.clone() else {
            return;
        };
        let prices: HashMap<String, f64> = self
            .portfolio
            .holdings()
            .filter_map(|h| {
                source
                    .current_price(&h.symbol)
                    .map(|p| (h.symbol.clone(), p))
            })
            .collect();
        if !prices.is_empty() {
            self.portfolio.mark_to_market(&prices);
        }
    }

    /// Observe a tick between signals: update marks and run monitoring so
    /// drift from price movement surfaces without a trade.
    pub fn observe_tick(&mut self, tick: &DataTick) {
        let mut prices = HashMap::new();
        prices.insert(tick.symbol.clone(), tick.price);
        self.portfolio.mark_to_market(&prices);
        self.refresh_marks();
        self.monitor(tick.timestamp);
    }

    /// Process one signal event through the
    /// pre-trade -> execute -> post-trade cycle.
    pub fn process_signal(&mut self, event: &SignalEvent) {
        let side = match event.signal {
            Signal::Hold => {
                debug!("Hold signal for {}, no action", event.symbol);
                return;
            }
            Signal::Buy => TradeSide::Buy,
            Signal::Sell => TradeSide::Sell,
        };

        let quantity = self.size_trade(side, &event.symbol, event.price);
        if quantity == 0 {
            self.record_failure(ExecutionFailure {
                symbol: event.symbol.clone(),
                side,
                quantity: 0,
                price: event.price,
                reason: match side {
                    TradeSide::Buy => "sizing produced zero quantity (insufficient cash)".to_string(),
                    TradeSide::Sell => format!("no holdings of {} to sell", event.symbol),
                },
                timestamp: event.timestamp,
            });
            return;
        }

        if side == TradeSide::Buy {
            self.refresh_marks();
            let snapshot = self.portfolio.snapshot(true);
            let proposed = ProposedBuy {
                symbol: event.symbol.clone(),
                quantity,
                price: event.price,
                timestamp: event.timestamp,
            };
            let blocking = self.risk.check_pre_trade(&proposed, &snapshot);
            if !blocking.is_empty() {
                warn!(
                    "Blocked buy of {} {} @ {:.2} by pre-trade risk check",
                    quantity, event.symbol, event.price
                );
                for alert in blocking {
                    self.record_alert(alert);
                }
                return;
            }
        }

        match self.portfolio.execute_trade(
            &event.symbol,
            side,
            quantity,
            event.price,
            event.timestamp,
        ) {
            Ok(record) => {
                info!(
                    "Executed {} {} {} @ {:.2} ({})",
                    record.side, record.quantity, record.symbol, record.price, record.trade_id
                );
                self.refresh_marks();
                self.monitor(event.timestamp);
            }
            Err(e) => {
                warn!(
                    "Trade rejected: {} {} {} @ {:.2}: {}",
                    side, quantity, event.symbol, event.price, e
                );
                self.record_failure(ExecutionFailure {
                    symbol: event.symbol.clone(),
                    side,
                    quantity,
                    price: event.price,
                    reason: e.to_string(),
                    timestamp: event.timestamp,
                });
            }
        }
    }

    /// Run the post-trade monitoring checks and record any alerts.
    pub fn monitor(&mut self, timestamp: i64) {
        let snapshot = self.portfolio.snapshot(true);
        for alert in self.risk.check_post_trade(&snapshot, timestamp) {
            self.record_alert(alert);
        }
    }

    fn size_trade(&self, side: TradeSide, symbol: &str, price: f64) -> u64 {
        match (self.sizing, side) {
            (SizingPolicy::FixedQuantity { quantity }, _) => quantity,
            (SizingPolicy::CashFraction { fraction }, TradeSide::Buy) => {
                if price <= 0.0 {
                    0
                } else {
                    (self.portfolio.cash() * fraction / price).floor() as u64
                }
            }
            (SizingPolicy::CashFraction { .. }, TradeSide::Sell) => self
                .portfolio
                .holding(symbol)
                .map(|h| h.quantity)
                .unwrap_or(0),
        }
    }

    /// Alerts accumulate per session; a newer alert for the same
    /// (kind, symbol) supersedes the older entry, and the list is capped at
    /// the configured capacity (oldest evicted).
    fn record_alert(&mut self, alert: RiskAlert) {
        self.alerts
            .retain(|a| !(a.kind == alert.kind && a.symbol == alert.symbol));
        self.alerts.push(alert);
        while self.alerts.len() > self.alert_capacity {
            self.alerts.remove(0);
        }
    }

    fn record_failure(&mut self, failure: ExecutionFailure) {
        self.failures.push(failure);
        while self.failures.len() > self.alert_capacity {
            self.failures.remove(0);
        }
    }

    /// Serialize engine state for persistence.
    pub fn to_record(&self) -> EngineRecord {
        EngineRecord {
            portfolio: self.portfolio.clone(),
            sizing: self.sizing,
            risk_limits: *self.risk.limits(),
            alerts: self.alerts.clone(),
            failures: self.failures.clone(),
            alert_capacity: self.alert_capacity,
        }
    }

    /// Restore an engine from a persisted record. The price source is left
    /// unwired; resume rewires it.
    pub fn from_record(record: EngineRecord) -> Self {
        Self {
            portfolio: record.portfolio,
            risk: RiskEngine::new(record.risk_limits),
            sizing: record.sizing,
            alerts: record.alerts,
            failures: record.failures,
            alert_capacity: record.alert_capacity,
            price_source: None,
        }
    }
}
