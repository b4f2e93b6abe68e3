//! Configuration module
//!
//! Provides structured configuration for the ndrhunt report generator.
//! Configuration can be loaded from:
//! 1. Default values (hardcoded)
//! 2. ndrhunt.toml file (optional)
//! 3. Environment variables with NDRHUNT__ prefix
//!
//! Example environment variable override:
//! NDRHUNT__LOGGING__LEVEL=debug
//! NDRHUNT__LIMITS__FLOW_PAIRS=10

use crate::engine::DisplayLimits;
use crate::store::DEFAULT_EXTENSIONS;
use serde::Deserialize;
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Deserialize)]
pub struct AppConfig {
    pub logging: LogConfig,
    pub report: ReportConfig,
    pub source: SourceConfig,
    pub limits: DisplayLimits,
}

/// Operational logging configuration
#[derive(Debug, Deserialize)]
pub struct LogConfig {
    pub level: String,
    pub directory: PathBuf,
    pub filename: String,
    pub console_output: bool,
}

/// Where the analyst log is written
#[derive(Debug, Deserialize)]
pub struct ReportConfig {
    pub directory: PathBuf,
    /// File name prefix; a `-YY-MM-DD-HH-MM.md` stamp is appended
    pub filename_prefix: String,
}

/// Data source discovery
#[derive(Debug, Deserialize)]
pub struct SourceConfig {
    /// Log file extensions accepted when a directory is given
    pub extensions: Vec<String>,
}

impl AppConfig {
    /// Load configuration from defaults, ndrhunt.toml, and environment variables
    pub fn new() -> Result<Self, config::ConfigError> {
        let limits = DisplayLimits::default();
        let s = config::Config::builder()
            // --- Defaults ---
            // Logging
            .set_default("logging.level", "info")?
            .set_default("logging.directory", "logs")?
            .set_default("logging.filename", "ndrhunt.log")?
            .set_default("logging.console_output", true)?
            // Report
            .set_default("report.directory", ".")?
            .set_default("report.filename_prefix", "ndrhunt")?
            // Source
            .set_default(
                "source.extensions",
                DEFAULT_EXTENSIONS
                    .iter()
                    .map(|e| e.to_string())
                    .collect::<Vec<_>>(),
            )?
            // Limits
            .set_default("limits.list", limits.list as i64)?
            .set_default("limits.windows_group", limits.windows_group as i64)?
            .set_default("limits.flow_pairs", limits.flow_pairs as i64)?
            .set_default("limits.linux_evidence", limits.linux_evidence as i64)?
            // --- Sources ---
            .add_source(config::File::with_name("ndrhunt").required(false))
            .add_source(config::Environment::with_prefix("NDRHUNT").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            logging: LogConfig {
                level: "info".to_string(),
                directory: PathBuf::from("logs"),
                filename: "ndrhunt.log".to_string(),
                console_output: true,
            },
            report: ReportConfig {
                directory: PathBuf::from("."),
                filename_prefix: "ndrhunt".to_string(),
            },
            source: SourceConfig {
                extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            },
            limits: DisplayLimits::default(),
        }
    }
}
