//! Configuration for the simulator.
//!
//! Provides configuration loading, validation, environment variable
//! interpolation, and the runtime [`Settings`] handle the engine and
//! worker re-read on every relevant operation.
//!
//! # Usage
//!
//! ```rust,ignore
//! use broker_sim::config::{Settings, load_config};
//!
//! // Load from default path (config.yaml)
//! let config = load_config(None)?;
//!
//! // Wrap for runtime access
//! let settings = Settings::new(config);
//! println!("precision: {}", settings.price_precision());
//! ```

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        /// Path to the config file.
        path: String,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Failed to parse YAML configuration.
    #[error("Failed to parse config YAML: {0}")]
    ParseError(#[from] serde_yaml_bw::Error),

    /// Configuration validation failed.
    #[error("Config validation failed: {0}")]
    ValidationError(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimulatorConfig {
    /// Lifecycle engine auto-processing switches.
    #[serde(default)]
    pub engine: EngineConfig,
    /// Pricing parameters.
    #[serde(default)]
    pub pricing: PricingConfig,
    /// Fulfillment worker parameters.
    #[serde(default)]
    pub worker: WorkerConfig,
    /// Activity log parameters.
    #[serde(default)]
    pub log: LogConfig,
    /// Outbound delivery identity.
    #[serde(default)]
    pub delivery: DeliveryConfig,
}

/// Auto-processing switches for inbound requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Acknowledge new orders on receipt when the worker is stopped.
    #[serde(default = "default_flag_off")]
    pub auto_acknowledge: bool,
    /// Report pending-cancel on cancel requests.
    #[serde(default = "default_flag_off")]
    pub auto_pending_cancel: bool,
    /// Cancel on cancel requests.
    #[serde(default = "default_flag_off")]
    pub auto_cancel: bool,
    /// Report pending-replace on replace requests.
    #[serde(default = "default_flag_off")]
    pub auto_pending_replace: bool,
    /// Accept replace requests.
    #[serde(default = "default_flag_off")]
    pub auto_replace: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            auto_acknowledge: default_flag_off(),
            auto_pending_cancel: default_flag_off(),
            auto_cancel: default_flag_off(),
            auto_pending_replace: default_flag_off(),
            auto_replace: default_flag_off(),
        }
    }
}

/// Pricing parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingConfig {
    /// Decimal places for every reported average price and for
    /// synthetic fill prices.
    #[serde(default = "default_price_precision")]
    pub price_precision: u32,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            price_precision: default_price_precision(),
        }
    }
}

/// Fulfillment worker parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Pacing delay between fill slices, in milliseconds.
    #[serde(default = "default_fill_delay_ms")]
    pub fill_delay_ms: u64,
    /// Number of slices an order is worked in.
    #[serde(default = "default_fill_partials")]
    pub fill_partials: u32,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            fill_delay_ms: default_fill_delay_ms(),
            fill_partials: default_fill_partials(),
        }
    }
}

/// Activity log parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Maximum retained entries; oldest evict first.
    #[serde(default = "default_log_capacity")]
    pub capacity: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            capacity: default_log_capacity(),
        }
    }
}

/// On-behalf-of delivery identity (FIX header tags 115/116).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// Attach `OnBehalfOfCompID` to outbound messages.
    #[serde(default = "default_flag_off")]
    pub send_on_behalf_of_comp_id: bool,
    /// Attach `OnBehalfOfSubID` to outbound messages.
    #[serde(default = "default_flag_off")]
    pub send_on_behalf_of_sub_id: bool,
    /// `OnBehalfOfCompID` value.
    #[serde(default)]
    pub on_behalf_of_comp_id: String,
    /// `OnBehalfOfSubID` value.
    #[serde(default)]
    pub on_behalf_of_sub_id: String,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            send_on_behalf_of_comp_id: default_flag_off(),
            send_on_behalf_of_sub_id: default_flag_off(),
            on_behalf_of_comp_id: String::new(),
            on_behalf_of_sub_id: String::new(),
        }
    }
}

const fn default_flag_off() -> bool {
    false
}

const fn default_price_precision() -> u32 {
    4
}

const fn default_fill_delay_ms() -> u64 {
    1000
}

const fn default_fill_partials() -> u32 {
    1
}

const fn default_log_capacity() -> usize {
    50
}

// ============================================
// Configuration Loading
// ============================================

/// Load configuration from a YAML file with environment variable
/// interpolation.
///
/// # Arguments
///
/// * `path` - Optional path to the config file. Defaults to "config.yaml".
///
/// # Errors
///
/// Returns a `ConfigError` if the file cannot be read, parsed, or validated.
pub fn load_config(path: Option<&str>) -> Result<SimulatorConfig, ConfigError> {
    let path = path.unwrap_or("config.yaml");

    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_string(),
        source: e,
    })?;

    load_config_from_string(&contents)
}

/// Load configuration from a YAML string (useful for testing).
///
/// # Errors
///
/// Returns a `ConfigError` if the YAML cannot be parsed or validated.
pub fn load_config_from_string(yaml: &str) -> Result<SimulatorConfig, ConfigError> {
    let interpolated = interpolate_env_vars(yaml);
    let config: SimulatorConfig = serde_yaml_bw::from_str(&interpolated)?;
    validate_config(&config)?;
    Ok(config)
}

/// Interpolate environment variables in a string.
///
/// Supports both `${VAR}` and `${VAR:-default}` syntax.
#[allow(clippy::expect_used)] // pattern is a compile-time constant
fn interpolate_env_vars(input: &str) -> String {
    use std::sync::OnceLock;

    static ENV_VAR_REGEX: OnceLock<regex::Regex> = OnceLock::new();

    let mut result = input.to_string();

    let re = ENV_VAR_REGEX.get_or_init(|| {
        regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
            .expect("env var regex is valid")
    });

    for cap in re.captures_iter(input) {
        let Some(full_match) = cap.get(0) else {
            continue;
        };
        let Some(var_match) = cap.get(1) else {
            continue;
        };
        let full_match = full_match.as_str();
        let var_name = var_match.as_str();
        let default_value = cap.get(2).map(|m| m.as_str());

        let value = match std::env::var(var_name) {
            Ok(v) if !v.is_empty() => v,
            _ => default_value.map_or_else(String::new, str::to_string),
        };

        result = result.replace(full_match, &value);
    }

    result
}

/// Validate configuration values.
fn validate_config(config: &SimulatorConfig) -> Result<(), ConfigError> {
    if config.pricing.price_precision > 8 {
        return Err(ConfigError::ValidationError(
            "pricing.price_precision must be at most 8".to_string(),
        ));
    }

    if config.worker.fill_partials == 0 {
        return Err(ConfigError::ValidationError(
            "worker.fill_partials must be at least 1".to_string(),
        ));
    }

    if config.log.capacity == 0 {
        return Err(ConfigError::ValidationError(
            "log.capacity must be at least 1".to_string(),
        ));
    }

    if config.delivery.send_on_behalf_of_comp_id && config.delivery.on_behalf_of_comp_id.is_empty()
    {
        return Err(ConfigError::ValidationError(
            "delivery.on_behalf_of_comp_id must be set when send_on_behalf_of_comp_id is enabled"
                .to_string(),
        ));
    }

    if config.delivery.send_on_behalf_of_sub_id && config.delivery.on_behalf_of_sub_id.is_empty() {
        return Err(ConfigError::ValidationError(
            "delivery.on_behalf_of_sub_id must be set when send_on_behalf_of_sub_id is enabled"
                .to_string(),
        ));
    }

    Ok(())
}

// ============================================
// Runtime Settings Handle
// ============================================

/// Shared, runtime-mutable view of the configuration.
///
/// Every getter re-reads the current value, so changes applied at
/// runtime take effect on the next operation that consults them.
#[derive(Debug, Clone)]
pub struct Settings {
    inner: Arc<RwLock<SimulatorConfig>>,
}

impl Settings {
    /// Wrap a validated configuration.
    #[must_use]
    pub fn new(config: SimulatorConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
        }
    }

    /// Clone the current configuration.
    #[must_use]
    pub fn snapshot(&self) -> SimulatorConfig {
        self.inner.read().clone()
    }

    /// Mutate the configuration in place.
    pub fn apply(&self, mutate: impl FnOnce(&mut SimulatorConfig)) {
        mutate(&mut self.inner.write());
    }

    /// Whether new orders are acknowledged on receipt while the worker
    /// is stopped.
    #[must_use]
    pub fn auto_acknowledge(&self) -> bool {
        self.inner.read().engine.auto_acknowledge
    }

    /// Whether cancel requests report pending-cancel automatically.
    #[must_use]
    pub fn auto_pending_cancel(&self) -> bool {
        self.inner.read().engine.auto_pending_cancel
    }

    /// Whether cancel requests cancel automatically.
    #[must_use]
    pub fn auto_cancel(&self) -> bool {
        self.inner.read().engine.auto_cancel
    }

    /// Whether replace requests report pending-replace automatically.
    #[must_use]
    pub fn auto_pending_replace(&self) -> bool {
        self.inner.read().engine.auto_pending_replace
    }

    /// Whether replace requests are accepted automatically.
    #[must_use]
    pub fn auto_replace(&self) -> bool {
        self.inner.read().engine.auto_replace
    }

    /// Decimal places for reported average prices and synthetic fills.
    #[must_use]
    pub fn price_precision(&self) -> u32 {
        self.inner.read().pricing.price_precision
    }

    /// Activity log capacity.
    #[must_use]
    pub fn log_capacity(&self) -> usize {
        self.inner.read().log.capacity
    }

    /// Pacing delay between fill slices.
    #[must_use]
    pub fn fill_delay(&self) -> Duration {
        Duration::from_millis(self.inner.read().worker.fill_delay_ms)
    }

    /// Number of slices an order is worked in.
    #[must_use]
    pub fn fill_partials(&self) -> u32 {
        self.inner.read().worker.fill_partials
    }

    /// `OnBehalfOfCompID` to attach outbound, when enabled.
    #[must_use]
    pub fn on_behalf_of_comp_id(&self) -> Option<String> {
        let config = self.inner.read();
        config
            .delivery
            .send_on_behalf_of_comp_id
            .then(|| config.delivery.on_behalf_of_comp_id.clone())
    }

    /// `OnBehalfOfSubID` to attach outbound, when enabled.
    #[must_use]
    pub fn on_behalf_of_sub_id(&self) -> Option<String> {
        let config = self.inner.read();
        config
            .delivery
            .send_on_behalf_of_sub_id
            .then(|| config.delivery.on_behalf_of_sub_id.clone())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::new(SimulatorConfig::default())
    }
}
