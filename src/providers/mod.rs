//! Market data providers
//!
//! A provider produces a stream of `DataTick`s for its configured symbols,
//! pushing them onto an mpsc channel consumed by the session's single tick
//! loop. Delivery stops once the shutdown watch fires and the provider task
//! has been awaited; no callbacks outlive teardown.

pub mod polling;
pub mod simulated;

pub use polling::PollingProvider;
pub use simulated::SimulatedProvider;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

use crate::types::DataTick;

/// Read-only price lookup, served from a provider's internal cache.
pub trait PriceSource: Send + Sync {
    /// Last known price for a symbol, or None before the first observation.
    fn current_price(&self, symbol: &str) -> Option<f64>;
}

/// A live or simulated source of market ticks.
pub trait MarketDataProvider: PriceSource {
    /// Provider kind identifier (for logs and status).
    fn kind(&self) -> &'static str;

    /// Drive tick production onto `tx` until `shutdown` flips to true.
    ///
    /// The returned future is the provider's whole lifetime: when it
    /// resolves, no further ticks will be sent.
    fn run<'a>(
        &'a self,
        tx: mpsc::Sender<DataTick>,
        shutdown: watch::Receiver<bool>,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>>;
}

/// Convenience alias used by the session manager.
pub type SharedProvider = Arc<dyn MarketDataProvider + Send + Sync>;
