use config::{Config, Environment};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::info;
use validator::{Validate, ValidationError};

use crate::errors::ImportError;

/// Default values for configuration
const DEFAULT_CHUNK_SIZE: usize = 1000;
const DEFAULT_VAT_RATE: f64 = 0.20;
const DEFAULT_WIDTH_CM: i32 = 100;
const DEFAULT_DROP_CM: i32 = 160;
const DEFAULT_HEARTBEAT_TIMEOUT_SECS: u64 = 300;

/// Import pipeline configuration.
///
/// The legacy system disagreed with itself about the fallback drop
/// measurement (150 in one code path, 160 in another); the value is a single
/// explicit setting here with 160 as the canonical default.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ImportConfig {
    /// Number of rows processed per batch
    #[serde(default = "default_chunk_size")]
    #[validate(custom = "validate_chunk_size")]
    pub chunk_size: usize,

    /// VAT rate applied when deriving the exclusive-price breakdown
    #[serde(default = "default_vat_rate")]
    #[validate(custom = "validate_vat_rate")]
    pub vat_rate: f64,

    /// Fallback width (cm) when a variant supplies none
    #[serde(default = "default_width_cm")]
    pub default_width_cm: i32,

    /// Fallback drop (cm) when a variant supplies none
    #[serde(default = "default_drop_cm")]
    pub default_drop_cm: i32,

    /// Seconds without a heartbeat refresh before a run is cancelled
    #[serde(default = "default_heartbeat_timeout_secs")]
    pub heartbeat_timeout_secs: u64,
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_vat_rate() -> f64 {
    DEFAULT_VAT_RATE
}

fn default_width_cm() -> i32 {
    DEFAULT_WIDTH_CM
}

fn default_drop_cm() -> i32 {
    DEFAULT_DROP_CM
}

fn default_heartbeat_timeout_secs() -> u64 {
    DEFAULT_HEARTBEAT_TIMEOUT_SECS
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            vat_rate: DEFAULT_VAT_RATE,
            default_width_cm: DEFAULT_WIDTH_CM,
            default_drop_cm: DEFAULT_DROP_CM,
            heartbeat_timeout_secs: DEFAULT_HEARTBEAT_TIMEOUT_SECS,
        }
    }
}

impl ImportConfig {
    /// Loads configuration from the environment (`CATALOG_IMPORT__*`
    /// variables), falling back to the defaults above.
    pub fn load() -> Result<Self, ImportError> {
        let config = Config::builder()
            .add_source(Environment::with_prefix("CATALOG_IMPORT").separator("__"))
            .build()?;

        let import_config: ImportConfig = config.try_deserialize()?;
        import_config.validate()?;

        info!(
            chunk_size = import_config.chunk_size,
            vat_rate = import_config.vat_rate,
            "import configuration loaded"
        );
        Ok(import_config)
    }

    /// VAT rate as a `Decimal` for pricing math.
    pub fn vat_rate_decimal(&self) -> Decimal {
        Decimal::from_f64(self.vat_rate)
            .unwrap_or_else(|| Decimal::new(20, 2))
    }
}

fn validate_chunk_size(size: usize) -> Result<(), ValidationError> {
    if size == 0 {
        let mut err = ValidationError::new("chunk_size");
        err.message = Some("chunk_size must be greater than 0".into());
        return Err(err);
    }
    Ok(())
}

fn validate_vat_rate(rate: f64) -> Result<(), ValidationError> {
    if !rate.is_finite() || !(0.0..=1.0).contains(&rate) {
        let mut err = ValidationError::new("vat_rate");
        err.message = Some("vat_rate must be a finite value between 0.0 and 1.0".into());
        return Err(err);
    }
    Ok(())
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str) {
    use tracing_subscriber::EnvFilter;

    let default_directive = format!("catalog_import={}", level);
    let filter = std::env::var("RUST_LOG").unwrap_or(default_directive);

    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .try_init();
}
