//! Configuration management for PaperDesk
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default, config/{APP_ENV}, config/local)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// Chunk streaming configuration
    #[serde(default)]
    pub stream: StreamConfig,

    /// Ingestion simulator configuration
    #[serde(default)]
    pub ingestion: IngestionConfig,

    /// Entity store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StreamConfig {
    /// Delay before each token chunk and before the sources chunk
    #[serde(default = "default_token_latency")]
    pub token_latency_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IngestionConfig {
    /// Delay until the "processing" progress event
    #[serde(default = "default_processing_delay")]
    pub processing_delay_ms: u64,

    /// Delay until the paper is indexed, measured from the ingest call
    #[serde(default = "default_indexed_delay")]
    pub indexed_delay_ms: u64,

    /// Progress reported with the "processing" event
    #[serde(default = "default_processing_progress")]
    pub processing_progress: u8,

    /// Cancel pending transitions once the last subscriber of a paper leaves
    #[serde(default)]
    pub cancel_when_unobserved: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    /// Load the sample library on startup
    #[serde(default = "default_seed_fixtures")]
    pub seed_fixtures: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Service name for tracing
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

// Default value functions
fn default_token_latency() -> u64 { 350 }
fn default_processing_delay() -> u64 { 600 }
fn default_indexed_delay() -> u64 { 1600 }
fn default_processing_progress() -> u8 { 40 }
fn default_seed_fixtures() -> bool { true }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_service_name() -> String { "paperdesk".to_string() }

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            token_latency_ms: default_token_latency(),
        }
    }
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            processing_delay_ms: default_processing_delay(),
            indexed_delay_ms: default_indexed_delay(),
            processing_progress: default_processing_progress(),
            cancel_when_unobserved: false,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            seed_fixtures: default_seed_fixtures(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            service_name: default_service_name(),
        }
    }
}

impl StreamConfig {
    pub fn token_latency(&self) -> Duration {
        Duration::from_millis(self.token_latency_ms)
    }
}

impl IngestionConfig {
    pub fn processing_delay(&self) -> Duration {
        Duration::from_millis(self.processing_delay_ms)
    }

    pub fn indexed_delay(&self) -> Duration {
        Duration::from_millis(self.indexed_delay_ms)
    }
}

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))
            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            // Load local overrides
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables with APP__ prefix
            // e.g., APP__STREAM__TOKEN_LATENCY_MS=50
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Configuration with every delay set to zero, for fast scripted runs
    pub fn instant() -> Self {
        let mut config = Self::default();
        config.stream.token_latency_ms = 0;
        config.ingestion.processing_delay_ms = 0;
        config.ingestion.indexed_delay_ms = 0;
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.stream.token_latency(), Duration::from_millis(350));
        assert_eq!(config.ingestion.processing_delay(), Duration::from_millis(600));
        assert_eq!(config.ingestion.indexed_delay(), Duration::from_millis(1600));
        assert_eq!(config.ingestion.processing_progress, 40);
        assert!(config.store.seed_fixtures);
        assert!(!config.ingestion.cancel_when_unobserved);
    }

    #[test]
    fn test_partial_source_keeps_defaults() {
        let config: AppConfig = Config::builder()
            .add_source(File::from_str(
                "[stream]\ntoken_latency_ms = 10\n\n[store]\nseed_fixtures = false\n",
                FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.stream.token_latency_ms, 10);
        assert!(!config.store.seed_fixtures);
        assert_eq!(config.ingestion.indexed_delay_ms, 1600);
        assert_eq!(config.observability.service_name, "paperdesk");
    }

    #[test]
    fn test_instant_config() {
        let config = AppConfig::instant();
        assert_eq!(config.stream.token_latency(), Duration::ZERO);
        assert_eq!(config.ingestion.indexed_delay(), Duration::ZERO);
    }
}
