//! Shared data types for market events, trading state, risk, and sessions.

pub mod market;
pub mod risk;
pub mod session;
pub mod trading;

pub use market::{DataTick, Signal, SignalEvent};
pub use risk::{RiskAlert, RiskAlertKind, RiskLimits};
pub use session::{ProviderConfig, SessionConfig, SimSymbol, StrategyInfo};
pub use trading::{
    Holding, HoldingStatus, PortfolioSnapshot, TradeRecord, TradeSide,
};
