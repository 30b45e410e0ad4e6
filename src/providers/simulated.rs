//! Simulated tick generator.
//!
//! Synthesizes a bounded random walk per configured symbol: each step moves
//! the price by a uniform fraction in ±volatility, floored at 0.01 so a
//! walk can never cross zero.

use dashmap::DashMap;
use rand::Rng;
use std::future::Future;
use std::pin::Pin;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval, Duration};
use tracing::{debug, info};

use super::{MarketDataProvider, PriceSource};
use crate::types::{DataTick, SimSymbol};

const PRICE_FLOOR: f64 = 0.01;

/// Generates synthetic ticks for a set of symbols.
pub struct SimulatedProvider {
    symbols: Vec<SimSymbol>,
    prices: DashMap<String, f64>,
}

impl SimulatedProvider {
    pub fn new(symbols: Vec<SimSymbol>) -> Self {
        let prices = DashMap::new();
        for spec in &symbols {
            prices.insert(spec.symbol.clone(), spec.initial_price);
        }
        Self { symbols, prices }
    }

    /// Advance one symbol's walk and return the new price.
    fn step_price(&self, spec: &SimSymbol) -> f64 {
        let change: f64 = if spec.volatility > 0.0 {
            rand::thread_rng().gen_range(-spec.volatility..=spec.volatility)
        } else {
            0.0
        };
        let mut entry = self
            .prices
            .entry(spec.symbol.clone())
            .or_insert(spec.initial_price);
        let new_price = (*entry * (1.0 + change)).max(PRICE_FLOOR);
        *entry = new_price;
        new_price
    }
}

impl PriceSource for SimulatedProvider {
    fn current_price(&self, symbol: &str) -> Option<f64> {
        self.prices.get(symbol).map(|p| *p)
    }
}

impl MarketDataProvider for SimulatedProvider {
    fn kind(&self) -> &'static str {
        "simulated"
    }

    fn run<'a>(
        &'a self,
        tx: mpsc::Sender<DataTick>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
            info!(
                "Simulated provider started for {} symbol(s)",
                self.symbols.len()
            );

            // One driving interval at the finest configured cadence; each
            // symbol emits when its own interval has elapsed.
            let base_ms = self
                .symbols
                .iter()
                .map(|s| s.interval_ms)
                .min()
                .unwrap_or(1000)
                .max(10);
            let mut ticker = interval(Duration::from_millis(base_ms));
            let mut last_emit: Vec<i64> = vec![0; self.symbols.len()];

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let now = chrono::Utc::now().timestamp_millis();
                        for (i, spec) in self.symbols.iter().enumerate() {
                            if now - last_emit[i] < spec.interval_ms as i64 {
                                continue;
                            }
                            last_emit[i] = now;
                            let price = self.step_price(spec);
                            let tick = DataTick::new(spec.symbol.clone(), price, now);
                            if tx.send(tick).await.is_err() {
                                debug!("Tick channel closed, stopping simulated provider");
                                return;
                            }
                        }
                    }
                    _ = shutdown.changed() => {
                        if *shutdown.borrow() {
                            info!("Simulated provider shutting down");
                            return;
                        }
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(symbol: &str, price: f64) -> SimSymbol {
        SimSymbol {
            symbol: symbol.to_string(),
            initial_price: price,
            volatility: 0.01,
            interval_ms: 10,
        }
    }

    #[test]
    fn test_initial_price_available_immediately() {
        let provider = SimulatedProvider::new(vec![spec("SIM_A", 100.0)]);
        assert_eq!(provider.current_price("SIM_A"), Some(100.0));
        assert_eq!(provider.current_price("OTHER"), None);
    }

    #[test]
    fn test_step_stays_within_volatility() {
        let provider = SimulatedProvider::new(vec![spec("SIM_A", 100.0)]);
        let spec = provider.symbols[0].clone();

        let mut price = 100.0;
        for _ in 0..1000 {
            let next = provider.step_price(&spec);
            assert!((next - price).abs() <= price * spec.volatility + 1e-9);
            assert!(next >= PRICE_FLOOR);
            price = next;
        }
    }

    #[tokio::test]
    async fn test_run_emits_ticks_and_stops_on_shutdown() {
        let provider = std::sync::Arc::new(SimulatedProvider::new(vec![spec("SIM_A", 100.0)]));
        let (tx, mut rx) = mpsc::channel(64);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = {
            let provider = provider.clone();
            tokio::spawn(async move { provider.run(tx, shutdown_rx).await })
        };

        let tick = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("tick within timeout")
            .expect("channel open");
        assert_eq!(tick.symbol, "SIM_A");
        assert!(tick.price > 0.0);

        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .expect("provider task joins after shutdown")
            .unwrap();

        // Drain anything in flight; after the join no more ticks arrive.
        while rx.try_recv().is_ok() {}
        assert!(rx.try_recv().is_err());
    }
}
