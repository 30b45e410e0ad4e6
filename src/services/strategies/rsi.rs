//! RSI reversal strategy.
//!
//! Computes a simple-average RSI over a rolling window and trades the
//! threshold crosses: a buy when RSI climbs back out of the oversold zone,
//! a sell when it drops back out of the overbought zone.

use serde_json::{json, Value};
use std::collections::VecDeque;

use super::{param_f64, param_str, param_u64, ParameterKind, ParameterSpec, Strategy, StrategyDescriptor};
use crate::error::AppError;
use crate::types::{DataTick, Signal, SignalEvent};

pub const ID: &str = "rsi_reversal";

pub fn descriptor() -> StrategyDescriptor {
    StrategyDescriptor {
        id: ID,
        name: "RSI Reversal",
        description: "Buys when RSI crosses up out of the oversold zone, sells when it crosses down out of the overbought zone.",
        parameters: vec![
            ParameterSpec {
                name: "symbol",
                kind: ParameterKind::String,
                required: true,
                default: None,
                description: "Symbol to trade",
            },
            ParameterSpec {
                name: "period",
                kind: ParameterKind::Int,
                required: false,
                default: Some(json!(14)),
                description: "RSI lookback period",
            },
            ParameterSpec {
                name: "oversold",
                kind: ParameterKind::Float,
                required: false,
                default: Some(json!(30.0)),
                description: "Oversold threshold (0-100)",
            },
            ParameterSpec {
                name: "overbought",
                kind: ParameterKind::Float,
                required: false,
                default: Some(json!(70.0)),
                description: "Overbought threshold (0-100)",
            },
        ],
    }
}

#[derive(Debug)]
pub struct RsiStrategy {
    symbol: String,
    period: usize,
    oversold: f64,
    overbought: f64,
    closes: VecDeque<f64>,
    previous_rsi: Option<f64>,
}

impl RsiStrategy {
    pub fn new(
        symbol: impl Into<String>,
        period: usize,
        oversold: f64,
        overbought: f64,
    ) -> Result<Self, AppError> {
        if period < 2 {
            return Err(AppError::BadRequest(
                "RSI period must be at least 2".to_string(),
            ));
        }
        if !(0.0 < oversold && oversold < overbought && overbought < 100.0) {
            return Err(AppError::BadRequest(format!(
                "RSI thresholds must satisfy 0 < oversold ({}) < overbought ({}) < 100",
                oversold, overbought
            )));
        }
        Ok(Self {
            symbol: symbol.into(),
            period,
            oversold,
            overbought,
            closes: VecDeque::with_capacity(period + 1),
            previous_rsi: None,
        })
    }

    pub fn from_params(params: &Value) -> Result<Self, AppError> {
        let symbol = param_str(params, "symbol")?;
        let period = param_u64(params, "period", 14)? as usize;
        let oversold = param_f64(params, "oversold", 30.0)?;
        let overbought = param_f64(params, "overbought", 70.0)?;
        Self::new(symbol, period, oversold, overbought)
    }

    /// Simple-average RSI over the current window.
    fn rsi(&self) -> f64 {
        let mut gains = 0.0;
        let mut losses = 0.0;
        for pair in self.closes.iter().zip(self.closes.iter().skip(1)) {
            let delta = pair.1 - pair.0;
            if delta > 0.0 {
                gains += delta;
            } else {
                losses -= delta;
            }
        }
        if gains + losses == 0.0 {
            // Flat window.
            return 50.0;
        }
        100.0 * gains / (gains + losses)
    }
}

impl Strategy for RsiStrategy {
    fn name(&self) -> &'static str {
        "RSI Reversal"
    }

    fn symbol(&self) -> &str {
        &self.symbol
    }

    fn on_tick(&mut self, tick: &DataTick) -> Option<SignalEvent> {
        if tick.symbol != self.symbol {
            return None;
        }

        self.closes.push_back(tick.price);
        while self.closes.len() > self.period + 1 {
            self.closes.pop_front();
        }
        if self.closes.len() < self.period + 1 {
            return None;
        }

        let rsi = self.rsi();
        let previous = self.previous_rsi.replace(rsi);
        let prev = previous?;

        let signal = if prev <= self.oversold && rsi > self.oversold {
            Signal::Buy
        } else if prev >= self.overbought && rsi < self.overbought {
            Signal::Sell
        } else {
            return None;
        };

        Some(SignalEvent::new(
            self.symbol.clone(),
            signal,
            tick.price,
            tick.timestamp,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(strategy: &mut RsiStrategy, prices: &[f64]) -> Vec<SignalEvent> {
        prices
            .iter()
            .enumerate()
            .filter_map(|(i, p)| strategy.on_tick(&DataTick::new("SIM", *p, i as i64)))
            .collect()
    }

    #[test]
    fn test_rejects_bad_thresholds() {
        assert!(RsiStrategy::new("SIM", 14, 70.0, 30.0).is_err());
        assert!(RsiStrategy::new("SIM", 14, 0.0, 70.0).is_err());
        assert!(RsiStrategy::new("SIM", 1, 30.0, 70.0).is_err());
    }

    #[test]
    fn test_silent_during_warmup() {
        let mut strategy = RsiStrategy::new("SIM", 3, 30.0, 70.0).unwrap();
        let signals = feed(&mut strategy, &[100.0, 99.0, 98.0, 97.0]);
        assert!(signals.is_empty());
    }

    #[test]
    fn test_buy_and_sell_on_threshold_crosses() {
        let mut strategy = RsiStrategy::new("SIM", 3, 30.0, 70.0).unwrap();
        // Decline drives RSI to 0, the bounce crosses up through 30 (buy);
        // the rally then fades and RSI drops back through 70 (sell).
        let signals = feed(
            &mut strategy,
            &[100.0, 99.0, 98.0, 97.0, 96.0, 100.0, 104.0, 108.0, 107.0, 100.0],
        );

        assert_eq!(signals.len(), 2);
        assert_eq!(signals[0].signal, Signal::Buy);
        assert_eq!(signals[0].price, 100.0);
        assert_eq!(signals[1].signal, Signal::Sell);
        assert_eq!(signals[1].price, 100.0);
    }

    #[test]
    fn test_flat_series_stays_neutral() {
        let mut strategy = RsiStrategy::new("SIM", 3, 30.0, 70.0).unwrap();
        let signals = feed(&mut strategy, &[50.0; 20]);
        assert!(signals.is_empty());
    }

    #[test]
    fn test_ignores_other_symbols() {
        let mut strategy = RsiStrategy::new("SIM", 3, 30.0, 70.0).unwrap();
        for i in 0..10 {
            assert!(strategy
                .on_tick(&DataTick::new("OTHER", 100.0, i))
                .is_none());
        }
    }
}
