//! Service configuration management

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use transfer_service::TransferServiceConfig;

/// Main service configuration
#[derive(Debug, Clone, Default)]
pub struct ServiceConfig {
    /// Engine configuration (database, roster policy, draft tuning)
    pub transfer: TransferServiceConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (json, pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: "pretty".to_string() }
    }
}

/// Settings a config file may override
#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    logging: Option<LoggingConfig>,
    history_limit: Option<u32>,
    pick_pool_size: Option<usize>,
}

/// Load configuration from the environment, an optional file, then env overrides
pub fn load_config(file: Option<&Path>) -> Result<ServiceConfig> {
    let transfer = TransferServiceConfig::from_env().context("Invalid engine configuration")?;
    let mut config = ServiceConfig { transfer, logging: LoggingConfig::default() };

    if let Some(path) = file {
        tracing::debug!("Loading configuration from file: {:?}", path);
        apply_file(&mut config, path)?;
    }

    load_from_env(&mut config);
    validate_config(&config)?;

    Ok(config)
}

/// Merge a TOML file into `config`
fn apply_file(config: &mut ServiceConfig, path: &Path) -> Result<()> {
    let settings: FileSettings = config::Config::builder()
        .add_source(config::File::from(path))
        .build()
        .and_then(|c| c.try_deserialize())
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    if let Some(logging) = settings.logging {
        config.logging = logging;
    }
    if let Some(limit) = settings.history_limit {
        config.transfer.history_limit = limit;
    }
    if let Some(size) = settings.pick_pool_size {
        config.transfer.draft.pick_pool_size = size;
    }
    Ok(())
}

/// Load overrides from environment variables
fn load_from_env(config: &mut ServiceConfig) {
    if let Ok(level) = std::env::var("SALARY_CAP_LOG_LEVEL") {
        config.logging.level = level;
    }

    if let Ok(format) = std::env::var("SALARY_CAP_LOG_FORMAT") {
        config.logging.format = format;
    }
}

/// Validate configuration
fn validate_config(config: &ServiceConfig) -> Result<()> {
    match config.logging.level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow::anyhow!("Invalid log level: {}", config.logging.level)),
    }

    match config.logging.format.as_str() {
        "json" | "pretty" => {}
        _ => return Err(anyhow::anyhow!("Invalid log format: {}", config.logging.format)),
    }

    if config.transfer.history_limit == 0 {
        return Err(anyhow::anyhow!("History limit must be positive"));
    }

    Ok(())
}
