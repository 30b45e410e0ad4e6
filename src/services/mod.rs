//! Core services: the portfolio ledger, risk checks, the trading engine,
//! strategies, session lifecycle, and persistence.

pub mod bars;
pub mod engine;
pub mod portfolio;
pub mod risk;
pub mod session;
pub mod snapshots;
pub mod strategies;

pub use bars::{BarRange, BarStore, OhlcBar};
pub use engine::{EngineRecord, ExecutionFailure, SizingPolicy, TradingEngine};
pub use portfolio::{Portfolio, PortfolioError};
pub use risk::{ProposedBuy, RiskEngine};
pub use session::{RiskOverrides, SessionManager, SessionStatus, StartCommand};
pub use snapshots::{SessionSnapshot, SnapshotStore};
