//! Trading strategies
//!
//! A strategy consumes ticks for its symbol, maintains a rolling indicator
//! window, and emits at most one BUY/SELL signal per tick (silence while
//! warming up). Strategies are selected by id through a registry of
//! descriptors and built by a factory that validates parameters up front,
//! so a bad start request fails before any session state is touched.

mod ma_cross;
mod rsi;

pub use ma_cross::MaCrossStrategy;
pub use rsi::RsiStrategy;

use serde::Serialize;
use serde_json::Value;

use crate::error::AppError;
use crate::types::{DataTick, SignalEvent};

/// A live trading strategy bound to one symbol.
pub trait Strategy: Send + std::fmt::Debug {
    /// Human-readable strategy name.
    fn name(&self) -> &'static str;

    /// The symbol this strategy trades.
    fn symbol(&self) -> &str;

    /// Consume one tick; returns a signal when the indicator crosses.
    fn on_tick(&mut self, tick: &DataTick) -> Option<SignalEvent>;
}

/// Parameter value type, as reported to API clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterKind {
    Int,
    Float,
    String,
}

/// One configurable strategy parameter.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterSpec {
    pub name: &'static str,
    pub kind: ParameterKind,
    pub required: bool,
    pub default: Option<Value>,
    pub description: &'static str,
}

/// Metadata describing a registered strategy.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyDescriptor {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Vec<ParameterSpec>,
}

/// All strategies available for simulation.
pub fn descriptors() -> Vec<StrategyDescriptor> {
    vec![ma_cross::descriptor(), rsi::descriptor()]
}

/// Build a strategy from its id and request parameters.
///
/// Fails with NotFound for an unknown id and BadRequest for missing or
/// invalid parameters, before any session component is constructed.
pub fn build(strategy_id: &str, parameters: &Value) -> Result<Box<dyn Strategy>, AppError> {
    match strategy_id {
        ma_cross::ID => Ok(Box::new(MaCrossStrategy::from_params(parameters)?)),
        rsi::ID => Ok(Box::new(RsiStrategy::from_params(parameters)?)),
        other => Err(AppError::NotFound(format!(
            "Strategy not found: {}",
            other
        ))),
    }
}

/// Extract a required string parameter.
pub(crate) fn param_str(params: &Value, name: &str) -> Result<String, AppError> {
    params
        .get(name)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            AppError::BadRequest(format!("Missing required string parameter '{}'", name))
        })
}

/// Extract a positive integer parameter, falling back to a default.
pub(crate) fn param_u64(params: &Value, name: &str, default: u64) -> Result<u64, AppError> {
    match params.get(name) {
        None | Some(Value::Null) => Ok(default),
        Some(value) => value.as_u64().filter(|v| *v > 0).ok_or_else(|| {
            AppError::BadRequest(format!(
                "Parameter '{}' must be a positive integer, got {}",
                name, value
            ))
        }),
    }
}

/// Extract a finite float parameter, falling back to a default.
pub(crate) fn param_f64(params: &Value, name: &str, default: f64) -> Result<f64, AppError> {
    match params.get(name) {
        None | Some(Value::Null) => Ok(default),
        Some(value) => value.as_f64().filter(|v| v.is_finite()).ok_or_else(|| {
            AppError::BadRequest(format!(
                "Parameter '{}' must be a number, got {}",
                name, value
            ))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_registry_lists_both_strategies() {
        let descriptors = descriptors();
        let ids: Vec<_> = descriptors.iter().map(|d| d.id).collect();
        assert!(ids.contains(&"ma_cross"));
        assert!(ids.contains(&"rsi_reversal"));
    }

    #[test]
    fn test_build_unknown_strategy() {
        let err = build("momentum", &json!({"symbol": "AAPL"})).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn test_build_missing_symbol() {
        let err = build("ma_cross", &json!({})).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn test_build_applies_defaults() {
        let strategy = build("ma_cross", &json!({"symbol": "SIM_A"})).unwrap();
        assert_eq!(strategy.symbol(), "SIM_A");
        assert_eq!(strategy.name(), "Dual MA Crossover");
    }

    #[test]
    fn test_param_type_errors() {
        let err = build(
            "ma_cross",
            &json!({"symbol": "SIM_A", "short_window": "five"}),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));

        let err = build(
            "rsi_reversal",
            &json!({"symbol": "SIM_A", "period": -3}),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
