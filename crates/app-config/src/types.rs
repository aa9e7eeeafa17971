// In crates/app-config/src/types.rs

use crate::{Error, Result};
use risk::types::RiskSettings;
use serde::Deserialize;
use std::time::Duration;

#[derive(Deserialize, Debug, Clone, Default)]
pub struct Settings {
    /// The application's general settings.
    #[serde(default)]
    pub app: AppSettings,
    /// Trade execution behaviour.
    #[serde(default)]
    pub trading: TradingSettings,
    /// Portfolio limits and exit thresholds.
    #[serde(default)]
    pub risk: RiskSettings,
    /// Order polling behaviour for live orders.
    #[serde(default)]
    pub monitor: MonitorSettings,
    /// Settings for the trading venue API.
    #[serde(default)]
    pub broker: BrokerSettings,
    /// Settings for the database connection.
    #[serde(default)]
    pub database: DatabaseSettings,
}

impl Settings {
    /// Rejects configurations the trading core cannot run safely with.
    pub fn validate(&self) -> Result<()> {
        self.risk.validate()?;

        let trading = &self.trading;
        if !(0.0..1.0).contains(&trading.max_slippage) || trading.max_slippage == 0.0 {
            return Err(Error::Invalid(format!(
                "trading.max_slippage must be in (0, 1), got {}",
                trading.max_slippage
            )));
        }
        if trading.default_slippage <= 0.0 || trading.default_slippage > trading.max_slippage {
            return Err(Error::Invalid(format!(
                "trading.default_slippage must be in (0, max_slippage], got {}",
                trading.default_slippage
            )));
        }
        if self.monitor.poll_interval_secs == 0 || self.monitor.order_timeout_secs == 0 {
            return Err(Error::Invalid(
                "monitor.poll_interval_secs and monitor.order_timeout_secs must be positive".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&trading.paper_slippage) {
            return Err(Error::Invalid(format!(
                "trading.paper_slippage must be in [0, 1), got {}",
                trading.paper_slippage
            )));
        }
        if !trading.paper_trading && self.broker.base_url.is_empty() {
            return Err(Error::Invalid("broker.base_url is required for live trading".to_string()));
        }

        Ok(())
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct AppSettings {
    /// The environment the application is running in (e.g., "development", "production").
    #[serde(default = "default_environment")]
    pub environment: String,
    /// The log level for the application.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            log_level: default_log_level(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct TradingSettings {
    /// Simulate fills instead of sending orders to the venue.
    #[serde(default = "default_true")]
    pub paper_trading: bool,
    #[serde(default = "default_slippage")]
    pub default_slippage: f64,
    #[serde(default = "default_max_slippage")]
    pub max_slippage: f64,
    /// Candidates scoring below this are never traded.
    #[serde(default)]
    pub min_filter_score: f64,
    #[serde(default = "default_fetch_interval")]
    pub fetch_interval_secs: u64,
    #[serde(default = "default_price_refresh")]
    pub price_refresh_secs: u64,
    /// Adverse slippage applied to simulated fills.
    #[serde(default)]
    pub paper_slippage: f64,
}

impl Default for TradingSettings {
    fn default() -> Self {
        Self {
            paper_trading: true,
            default_slippage: default_slippage(),
            max_slippage: default_max_slippage(),
            min_filter_score: 0.0,
            fetch_interval_secs: default_fetch_interval(),
            price_refresh_secs: default_price_refresh(),
            paper_slippage: 0.0,
        }
    }
}

impl TradingSettings {
    pub fn fetch_interval(&self) -> Duration {
        Duration::from_secs(self.fetch_interval_secs)
    }

    pub fn price_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.price_refresh_secs)
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct MonitorSettings {
    /// Delay between two status polls of the same order.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Delay after a failed poll before trying again.
    #[serde(default = "default_error_pause")]
    pub error_pause_secs: u64,
    /// How long a live order may stay open before it is cancelled.
    #[serde(default = "default_order_timeout")]
    pub order_timeout_secs: u64,
    /// Tracked orders older than this make the trader unhealthy.
    #[serde(default = "default_stuck_order")]
    pub stuck_order_secs: u64,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            error_pause_secs: default_error_pause(),
            order_timeout_secs: default_order_timeout(),
            stuck_order_secs: default_stuck_order(),
        }
    }
}

impl MonitorSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn error_pause(&self) -> Duration {
        Duration::from_secs(self.error_pause_secs)
    }

    pub fn order_timeout(&self) -> Duration {
        Duration::from_secs(self.order_timeout_secs)
    }

    pub fn stuck_order_threshold(&self) -> Duration {
        Duration::from_secs(self.stuck_order_secs)
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct BrokerSettings {
    /// The REST base URL of the trading venue.
    #[serde(default)]
    pub base_url: String,
    /// The bearer token for the venue API.
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for BrokerSettings {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: String::new(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct DatabaseSettings {
    /// The connection URL for the SQLite database.
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self { url: default_database_url() }
    }
}

/// Helper functions for serde defaults
fn default_environment() -> String { "development".to_string() }
fn default_log_level() -> String { "info".to_string() }
fn default_true() -> bool { true }
fn default_slippage() -> f64 { 0.02 }
fn default_max_slippage() -> f64 { 0.05 }
fn default_fetch_interval() -> u64 { 15 }
fn default_price_refresh() -> u64 { 30 }
fn default_poll_interval() -> u64 { 3 }
fn default_error_pause() -> u64 { 2 }
fn default_order_timeout() -> u64 { 120 }
fn default_stuck_order() -> u64 { 600 }
fn default_request_timeout() -> u64 { 30 }
fn default_database_url() -> String { "sqlite://dex_bot.db".to_string() }
