//! Layered configuration
//!
//! Values are resolved from built-in defaults, then an optional TOML file,
//! then `DATUM_PIPELINE_`-prefixed environment variables where `__` separates
//! nested keys (`DATUM_PIPELINE_PIPELINE__BATCH_SIZE=10`).

use std::path::Path;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{AppError, AppResult};
use crate::utils::RetryConfig;

pub mod defaults;
pub mod duration_serde;

use defaults::*;

/// Batch processing settings shared by both stages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Maximum entries received per batch
    pub batch_size: usize,
    /// Maximum entries of one batch processed at the same time
    pub max_concurrency: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }
}

/// Stream names
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Stream carrying records without a digest
    pub inbound_stream: String,
    /// Stream carrying records with their digest fixed
    pub outbound_stream: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            inbound_stream: DEFAULT_INBOUND_STREAM.to_string(),
            outbound_stream: DEFAULT_OUTBOUND_STREAM.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub table: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            table: DEFAULT_TABLE.to_string(),
        }
    }
}

/// Settings for the document generator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Records published per run
    pub count: usize,
    /// Length of each random document
    pub document_chars: usize,
    /// Digest iterations requested for each record
    pub iterations: u32,
    /// Records per put
    pub batch_size: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            count: DEFAULT_GENERATOR_COUNT,
            document_chars: DEFAULT_DOCUMENT_CHARS,
            iterations: DEFAULT_ITERATIONS,
            batch_size: DEFAULT_GENERATOR_BATCH_SIZE,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub pipeline: PipelineConfig,
    pub transport: TransportConfig,
    pub store: StoreConfig,
    pub generator: GeneratorConfig,
    pub retry: RetryConfig,
}

impl Config {
    /// Load from defaults, an optional TOML file, then the environment
    ///
    /// A missing file is not an error.
    pub fn load_from(config_file: Option<&Path>) -> AppResult<Self> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = config_file {
            debug!("Reading configuration file: {}", path.display());
            figment = figment.merge(Toml::file(path));
        }
        let config: Config = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;

        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> AppResult<()> {
        if self.pipeline.batch_size == 0 {
            return Err(AppError::validation("pipeline.batch_size must be at least 1"));
        }
        if self.pipeline.max_concurrency == 0 {
            return Err(AppError::validation(
                "pipeline.max_concurrency must be at least 1",
            ));
        }
        if self.generator.batch_size == 0 {
            return Err(AppError::validation("generator.batch_size must be at least 1"));
        }
        if self.transport.inbound_stream.is_empty() || self.transport.outbound_stream.is_empty() {
            return Err(AppError::validation("stream names must not be empty"));
        }
        if self.transport.inbound_stream == self.transport.outbound_stream {
            return Err(AppError::validation(format!(
                "inbound and outbound streams must differ, both are '{}'",
                self.transport.inbound_stream
            )));
        }
        if self.store.table.is_empty() {
            return Err(AppError::validation("store.table must not be empty"));
        }
        if self.retry.max_attempts == 0 {
            return Err(AppError::validation("retry.max_attempts must be at least 1"));
        }
        if self.retry.backoff_multiplier.is_nan() || self.retry.backoff_multiplier < 1.0 {
            return Err(AppError::validation(
                "retry.backoff_multiplier must be at least 1.0",
            ));
        }
        Ok(())
    }

    /// Render the effective configuration as TOML
    pub fn to_toml(&self) -> AppResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use rstest::rstest;
    use std::time::Duration;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.pipeline.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(config.transport.inbound_stream, "datum-a");
        assert_eq!(config.retry.initial_delay, Duration::from_millis(100));
    }

    #[test]
    fn test_file_then_env_overrides() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "pipeline.toml",
                r#"
                [pipeline]
                batch_size = 25

                [retry]
                initial_delay = "250ms"
                jitter = false

                [store]
                table = "records"
                "#,
            )?;
            jail.set_env("DATUM_PIPELINE_PIPELINE__MAX_CONCURRENCY", "3");
            jail.set_env("DATUM_PIPELINE_STORE__TABLE", "from-env");

            let config = Config::load_from(Some(Path::new("pipeline.toml")))
                .map_err(|e| e.to_string())?;

            assert_eq!(config.pipeline.batch_size, 25);
            assert_eq!(config.pipeline.max_concurrency, 3);
            assert_eq!(config.store.table, "from-env");
            assert_eq!(config.retry.initial_delay, Duration::from_millis(250));
            assert!(!config.retry.jitter);
            assert_eq!(config.generator, GeneratorConfig::default());
            Ok(())
        });
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        Jail::expect_with(|_jail| {
            let config = Config::load_from(Some(Path::new("absent.toml")))
                .map_err(|e| e.to_string())?;
            assert_eq!(config, Config::default());
            Ok(())
        });
    }

    #[rstest]
    #[case("[pipeline]\nbatch_size = 0", "batch_size")]
    #[case("[pipeline]\nmax_concurrency = 0", "max_concurrency")]
    #[case("[generator]\nbatch_size = 0", "generator.batch_size")]
    #[case("[transport]\noutbound_stream = \"datum-a\"", "must differ")]
    #[case("[retry]\nmax_attempts = 0", "max_attempts")]
    fn test_validation_rejects(#[case] contents: &str, #[case] expected: &str) {
        Jail::expect_with(|jail| {
            jail.create_file("bad.toml", contents)?;
            let err = Config::load_from(Some(Path::new("bad.toml"))).unwrap_err();
            assert!(matches!(err, AppError::Validation { .. }));
            assert!(err.to_string().contains(expected), "{err}");
            Ok(())
        });
    }

    #[test]
    fn test_to_toml_round_trips() {
        let config = Config::default();
        let rendered = config.to_toml().unwrap();
        assert!(rendered.contains("initial_delay = \"100ms\""));

        let parsed: Config = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed, config);
    }
}
