//! Salary Cap Service - command line entry point for the transfer engine

pub mod commands;
pub mod config;
pub mod logging;

pub use commands::{run, Cli, Commands};
pub use config::{load_config, LoggingConfig, ServiceConfig};
pub use logging::initialize_logging_with_config;

use anyhow::Result;
use std::path::Path;

/// Load configuration from an optional file and the environment
pub fn load_configuration(file: Option<&Path>) -> Result<ServiceConfig> {
    config::load_config(file)
}
