/// Configuration default values
///
/// This module contains all the default values for configuration options,
/// making them easily changeable in one central location.
// Environment
pub const DEFAULT_CONFIG_FILE: &str = "datum-pipeline.toml";
pub const ENV_PREFIX: &str = "DATUM_PIPELINE_";

// Pipeline defaults
pub const DEFAULT_BATCH_SIZE: usize = 100;
pub const DEFAULT_MAX_CONCURRENCY: usize = 8;

// Transport defaults
pub const DEFAULT_INBOUND_STREAM: &str = "datum-a";
pub const DEFAULT_OUTBOUND_STREAM: &str = "datum-b";

// Store defaults
pub const DEFAULT_TABLE: &str = "datum";

// Generator defaults
pub const DEFAULT_GENERATOR_COUNT: usize = 100;
pub const DEFAULT_DOCUMENT_CHARS: usize = 64;
pub const DEFAULT_ITERATIONS: u32 = 1000;
pub const DEFAULT_GENERATOR_BATCH_SIZE: usize = 50;

// Retry defaults
pub const DEFAULT_RETRY_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_RETRY_INITIAL_DELAY_MS: u64 = 100;
pub const DEFAULT_RETRY_MAX_DELAY_MS: u64 = 3000;
pub const DEFAULT_RETRY_BACKOFF_MULTIPLIER: f64 = 2.0;
