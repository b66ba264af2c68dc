use anyhow::Result;
use config::Config;
use serde::Deserialize;

use crate::constants::{
    DEFAULT_GEO_PRECISION, DEFAULT_MARKER_COLOUR, DEFAULT_MAX_OCCURRENCES, INTERNAL_PROVIDER_ID,
};

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub engine: EngineConfig,
    pub clustering: ClusteringConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub input: InputConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Provider id assigned to descriptors from the internal editor.
    pub internal_provider_id: String,
    /// Timezone applied to datetime tokens that carry no TZID.
    pub default_timezone: String,
    /// Upper bound on occurrences from one unbounded expansion.
    pub max_occurrences: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            internal_provider_id: INTERNAL_PROVIDER_ID.to_string(),
            default_timezone: "UTC".to_string(),
            max_occurrences: DEFAULT_MAX_OCCURRENCES,
        }
    }
}

/// How two geo-positions are compared when clustering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeoMetric {
    /// Latitude and longitude deltas are each compared to the precision (degrees).
    #[default]
    PerAxis,
    /// Great-circle distance is compared to the precision (metres).
    Haversine,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClusteringConfig {
    pub precision: f64,
    #[serde(default)]
    pub metric: GeoMetric,
    pub default_colour: String,
}

impl Default for ClusteringConfig {
    fn default() -> Self {
        Self {
            precision: DEFAULT_GEO_PRECISION,
            metric: GeoMetric::PerAxis,
            default_colour: DEFAULT_MARKER_COLOUR.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InputConfig {
    /// JSON snapshot of descriptors and registration references.
    pub snapshot_path: Option<String>,
}

impl Settings {
    /// ## Summary
    /// Loads configuration from `.env` file and environment variables into a `Settings`.
    /// Environment variables take precedence over `.env` file values.
    ///
    /// ## Errors
    /// Returns an error if building the configuration or deserializing it fails.
    pub fn load() -> Result<Self> {
        Ok(Config::builder()
            .set_default("engine.internal_provider_id", INTERNAL_PROVIDER_ID)?
            .set_default("engine.default_timezone", "UTC")?
            .set_default(
                "engine.max_occurrences",
                u64::try_from(DEFAULT_MAX_OCCURRENCES)?,
            )?
            .set_default("clustering.precision", DEFAULT_GEO_PRECISION)?
            .set_default("clustering.metric", "per_axis")?
            .set_default("clustering.default_colour", DEFAULT_MARKER_COLOUR)?
            .set_default("logging.level", "info")?
            .add_source(
                config::Environment::with_prefix("FIXIT")
                    .separator("__")
                    .ignore_empty(true)
                    .try_parsing(true),
            )
            .add_source(config::File::with_name("config.toml").required(false))
            .build()?
            .try_deserialize::<Settings>()?)
    }
}

/// ## Summary
/// Loads configuration from environment variables and `.env` file.
///
/// ## Errors
/// Returns an error if loading or deserializing the configuration fails.
pub fn load_config() -> Result<Settings> {
    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!(path = %path.display(), "Loaded .env file"),
        Err(err) => tracing::trace!(error = %err, "No .env file loaded"),
    }

    Settings::load()
}
