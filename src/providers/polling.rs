//! External quote poller.
//!
//! Polls a Finnhub-style quote endpoint (`/quote?symbol=X&token=K`) for each
//! configured symbol at a fixed interval, with a short delay between symbols
//! to stay inside rate limits. Transient failures are logged and retried on
//! the next cycle; they never end the session.

use dashmap::DashMap;
use reqwest::Client;
use serde::Deserialize;
use std::future::Future;
use std::pin::Pin;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval, sleep, Duration};
use tracing::{debug, info, warn};

use super::{MarketDataProvider, PriceSource};
use crate::types::DataTick;

/// Delay between per-symbol requests within one polling cycle.
const INTER_SYMBOL_DELAY_MS: u64 = 250;

/// Quote payload from the external API.
#[derive(Debug, Deserialize)]
struct Quote {
    /// Current price
    #[serde(rename = "c")]
    current: f64,
    /// Quote timestamp (seconds)
    #[serde(rename = "t")]
    timestamp: Option<i64>,
}

/// Polls an external quote API for the configured symbols.
pub struct PollingProvider {
    client: Client,
    base_url: String,
    api_key: String,
    symbols: Vec<String>,
    poll_interval: Duration,
    prices: DashMap<String, f64>,
}

impl PollingProvider {
    pub fn new(
        base_url: String,
        api_key: String,
        symbols: Vec<String>,
        poll_interval_secs: u64,
    ) -> Self {
        // Bounded request time keeps session teardown from waiting on a
        // stuck poll.
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url,
            api_key,
            symbols,
            poll_interval: Duration::from_secs(poll_interval_secs.max(1)),
            prices: DashMap::new(),
        }
    }

    /// Fetch the latest quote for one symbol.
    async fn fetch_quote(&self, symbol: &str) -> Result<Quote, String> {
        let url = format!(
            "{}/quote?symbol={}&token={}",
            self.base_url, symbol, self.api_key
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| format!("request failed: {}", e))?;

        if !response.status().is_success() {
            return Err(format!("API error: {}", response.status()));
        }

        response
            .json::<Quote>()
            .await
            .map_err(|e| format!("invalid quote payload: {}", e))
    }

    /// One full pass over the configured symbols.
    async fn poll_cycle(&self, tx: &mpsc::Sender<DataTick>) -> bool {
        for (i, symbol) in self.symbols.iter().enumerate() {
            if i > 0 {
                sleep(Duration::from_millis(INTER_SYMBOL_DELAY_MS)).await;
            }

            match self.fetch_quote(symbol).await {
                Ok(quote) if quote.current > 0.0 => {
                    self.prices.insert(symbol.clone(), quote.current);
                    let timestamp = quote
                        .timestamp
                        .map(|t| t * 1000)
                        .unwrap_or_else(|| chrono::Utc::now().timestamp_millis());
                    let tick = DataTick::new(symbol.clone(), quote.current, timestamp);
                    if tx.send(tick).await.is_err() {
                        debug!("Tick channel closed, stopping poller");
                        return false;
                    }
                }
                Ok(_) => {
                    debug!("No usable quote for {} this cycle", symbol);
                }
                Err(e) => {
                    warn!("Quote poll failed for {}: {}", symbol, e);
                }
            }
        }
        true
    }
}

impl PriceSource for PollingProvider {
    fn current_price(&self, symbol: &str) -> Option<f64> {
        self.prices.get(symbol).map(|p| *p)
    }
}

impl MarketDataProvider for PollingProvider {
    fn kind(&self) -> &'static str {
        "polling"
    }

    fn run<'a>(
        &'a self,
        tx: mpsc::Sender<DataTick>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(async move {
            info!(
                "Polling provider started for {:?} every {:?}",
                self.symbols, self.poll_interval
            );
            let mut ticker = interval(self.poll_interval);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if !self.poll_cycle(&tx).await {
                            return;
                        }
                    }
                    _ = shutdown.changed() => {
                        if *shutdown.borrow() {
                            info!("Polling provider shutting down");
                            return;
                        }
                    }
                }
            }
        })
    }
}
