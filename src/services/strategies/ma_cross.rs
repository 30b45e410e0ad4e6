//! Dual moving-average crossover strategy.
//!
//! Tracks a short and a long simple moving average over incoming ticks.
//! A buy fires when the short MA crosses above the long MA, a sell when it
//! crosses back below. No signals are emitted until the long window is
//! full and a previous MA pair exists to detect the cross against.

use serde_json::{json, Value};
use std::collections::VecDeque;

use super::{param_str, param_u64, ParameterKind, ParameterSpec, Strategy, StrategyDescriptor};
use crate::error::AppError;
use crate::types::{DataTick, Signal, SignalEvent};

pub const ID: &str = "ma_cross";

pub fn descriptor() -> StrategyDescriptor {
    StrategyDescriptor {
        id: ID,
        name: "Dual MA Crossover",
        description: "Buys when the short moving average crosses above the long one, sells on the reverse cross.",
        parameters: vec![
            ParameterSpec {
                name: "symbol",
                kind: ParameterKind::String,
                required: true,
                default: None,
                description: "Symbol to trade",
            },
            ParameterSpec {
                name: "short_window",
                kind: ParameterKind::Int,
                required: false,
                default: Some(json!(5)),
                description: "Short moving-average window",
            },
            ParameterSpec {
                name: "long_window",
                kind: ParameterKind::Int,
                required: false,
                default: Some(json!(10)),
                description: "Long moving-average window",
            },
        ],
    }
}

#[derive(Debug)]
pub struct MaCrossStrategy {
    symbol: String,
    short_window: usize,
    long_window: usize,
    closes: VecDeque<f64>,
    previous: Option<(f64, f64)>,
}

impl MaCrossStrategy {
    pub fn new(
        symbol: impl Into<String>,
        short_window: usize,
        long_window: usize,
    ) -> Result<Self, AppError> {
        if short_window == 0 || long_window == 0 {
            return Err(AppError::BadRequest(
                "Moving-average windows must be positive".to_string(),
            ));
        }
        if short_window >= long_window {
            return Err(AppError::BadRequest(format!(
                "short_window ({}) must be smaller than long_window ({})",
                short_window, long_window
            )));
        }
        Ok(Self {
            symbol: symbol.into(),
            short_window,
            long_window,
            closes: VecDeque::with_capacity(long_window),
            previous: None,
        })
    }

    pub fn from_params(params: &Value) -> Result<Self, AppError> {
        let symbol = param_str(params, "symbol")?;
        let short_window = param_u64(params, "short_window", 5)? as usize;
        let long_window = param_u64(params, "long_window", 10)? as usize;
        Self::new(symbol, short_window, long_window)
    }

    fn sma(&self, window: usize) -> f64 {
        let start = self.closes.len() - window;
        self.closes.iter().skip(start).sum::<f64>() / window as f64
    }
}

impl Strategy for MaCrossStrategy {
    fn name(&self) -> &'static str {
        "Dual MA Crossover"
    }

    fn symbol(&self) -> &str {
        &self.symbol
    }

    fn on_tick(&mut self, tick: &DataTick) -> Option<SignalEvent> {
        if tick.symbol != self.symbol {
            return None;
        }

        self.closes.push_back(tick.price);
        while self.closes.len() > self.long_window {
            self.closes.pop_front();
        }
        if self.closes.len() < self.long_window {
            return None;
        }

        let short = self.sma(self.short_window);
        let long = self.sma(self.long_window);
        let previous = self.previous.replace((short, long));
        let (prev_short, prev_long) = previous?;

        let signal = if prev_short <= prev_long && short > long {
            Signal::Buy
        } else if prev_short >= prev_long && short < long {
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

    fn feed(strategy: &mut MaCrossStrategy, prices: &[f64]) -> Vec<SignalEvent> {
        prices
            .iter()
            .enumerate()
            .filter_map(|(i, p)| {
                strategy.on_tick(&DataTick::new("SIM", *p, i as i64))
            })
            .collect()
    }

    #[test]
    fn test_rejects_bad_windows() {
        assert!(MaCrossStrategy::new("SIM", 10, 5).is_err());
        assert!(MaCrossStrategy::new("SIM", 5, 5).is_err());
        assert!(MaCrossStrategy::new("SIM", 0, 5).is_err());
    }

    #[test]
    fn test_silent_during_warmup() {
        let mut strategy = MaCrossStrategy::new("SIM", 2, 4).unwrap();
        let signals = feed(&mut strategy, &[10.0, 10.0, 10.0]);
        assert!(signals.is_empty());
    }

    #[test]
    fn test_buy_on_upward_cross() {
        let mut strategy = MaCrossStrategy::new("SIM", 2, 4).unwrap();
        // Flat, then a rally pulls the short MA above the long MA.
        let signals = feed(&mut strategy, &[10.0, 10.0, 10.0, 10.0, 10.0, 12.0, 14.0]);

        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].signal, Signal::Buy);
        assert_eq!(signals[0].symbol, "SIM");
    }

    #[test]
    fn test_sell_on_downward_cross() {
        let mut strategy = MaCrossStrategy::new("SIM", 2, 4).unwrap();
        // Rally to get the short MA above, then a slide drags it below.
        let signals = feed(
            &mut strategy,
            &[10.0, 10.0, 10.0, 10.0, 12.0, 14.0, 11.0, 8.0, 6.0],
        );

        assert_eq!(signals.len(), 2);
        assert_eq!(signals[0].signal, Signal::Buy);
        assert_eq!(signals[1].signal, Signal::Sell);
    }

    #[test]
    fn test_ignores_other_symbols() {
        let mut strategy = MaCrossStrategy::new("SIM", 2, 4).unwrap();
        for i in 0..20 {
            assert!(strategy
                .on_tick(&DataTick::new("OTHER", 10.0 + i as f64, i))
                .is_none());
        }
    }
}
