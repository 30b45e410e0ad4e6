use std::env;

/// Default risk thresholds applied when a start request omits them.
#[derive(Debug, Clone)]
pub struct RiskDefaults {
    /// Per-position unrealized loss tolerance (fraction of average cost).
    pub stop_loss_pct: f64,
    /// Maximum share of total portfolio value held in a single symbol.
    pub max_position_pct: f64,
    /// Maximum drawdown from the equity high-water mark.
    pub max_drawdown_pct: f64,
}

impl Default for RiskDefaults {
    fn default() -> Self {
        Self {
            stop_loss_pct: 0.10,
            max_position_pct: 0.25,
            max_drawdown_pct: 0.15,
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// SQLite database path for session snapshots.
    pub database_path: String,
    /// Interval between periodic session snapshots (seconds).
    pub persist_interval_secs: u64,
    /// Initial capital for new sessions unless overridden per request.
    pub initial_capital: f64,
    /// Fixed share count per trade signal.
    pub trade_quantity: u64,
    /// Optional cash-fraction sizing; when set, buys size as a fraction of
    /// available cash instead of a fixed share count.
    pub trade_cash_fraction: Option<f64>,
    /// Base URL of the external quote API used by the polling provider.
    pub quote_api_url: String,
    /// API key for the external quote API (polling provider only).
    pub quote_api_key: Option<String>,
    /// Default polling interval for the external provider (seconds).
    pub poll_interval_secs: u64,
    /// Maximum retained risk alerts per session.
    pub alert_capacity: usize,
    /// Risk thresholds applied when a start request omits them.
    pub risk_defaults: RiskDefaults,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port: u16 = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3001);

        Self {
            host,
            port,
            database_path: env::var("DATABASE_PATH")
                .unwrap_or_else(|_| "papertrail.db".to_string()),
            persist_interval_secs: env::var("PERSIST_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60),
            initial_capital: env::var("INITIAL_CAPITAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(100_000.0),
            trade_quantity: env::var("TRADE_QUANTITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(100),
            trade_cash_fraction: env::var("TRADE_CASH_FRACTION")
                .ok()
                .and_then(|v| v.parse().ok()),
            quote_api_url: env::var("QUOTE_API_URL")
                .unwrap_or_else(|_| "https://finnhub.io/api/v1".to_string()),
            quote_api_key: env::var("QUOTE_API_KEY").ok(),
            poll_interval_secs: env::var("POLL_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60),
            alert_capacity: env::var("ALERT_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(100),
            risk_defaults: RiskDefaults {
                stop_loss_pct: env::var("RISK_STOP_LOSS_PCT")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(0.10),
                max_position_pct: env::var("RISK_MAX_POSITION_PCT")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(0.25),
                max_drawdown_pct: env::var("RISK_MAX_DRAWDOWN_PCT")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(0.15),
            },
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
