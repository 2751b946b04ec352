use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Configuration for the bridge resolver
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct ResolverConfiguration {
    /// Path search tolerances and ceilings
    pub search: SearchConfig,
    /// Bridge voting and quality checks
    pub bridge: BridgeConfig,
    /// Alignment record filtering
    pub alignment: AlignmentConfig,
    /// Population bin compatibility
    pub binning: BinningConfig,
    /// Streaming pipeline settings
    pub pipeline: StreamingConfig,
    /// Logging and monitoring configuration
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SearchConfig {
    /// Absolute distance tolerance in bases
    pub absolute_tolerance: i64,
    /// Relative distance tolerance, as a fraction of the measured distance
    pub relative_tolerance: f64,
    /// Distances above this are never searched
    pub distance_limit: i64,
    /// Number of candidate hits after which the search stops
    pub hit_limit: usize,
    /// Candidates kept after ranking
    pub keep_best: usize,
    /// Deepest walk tried by iterative deepening
    pub max_depth: usize,
    /// Default overlap, used for the truncation margin
    pub kmer_size: i64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            absolute_tolerance: 200,
            relative_tolerance: 0.3,
            distance_limit: 2105,
            hit_limit: 125,
            keep_best: 10,
            max_depth: 64,
            kmer_size: 127,
        }
    }
}

impl SearchConfig {
    /// Largest accepted deviation from a measured distance
    pub fn allowance(&self, distance: i64) -> i64 {
        let relative = (self.relative_tolerance * distance.abs() as f64) as i64;
        self.absolute_tolerance.max(relative)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BridgeConfig {
    /// A candidate path is dropped once its vote trails the best by more than this
    pub max_vote_diff: i32,
    /// Support a node-vector needs before it may delimit a segment
    pub good_support: u32,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            max_vote_diff: 1,
            good_support: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AlignmentConfig {
    /// Records below this mapping quality are not useful
    pub min_quality: u8,
    /// Mapping quality that counts as confident evidence
    pub good_quality: u8,
    /// A record is useful if it spans this fraction of its node...
    pub min_spanning_fraction: f64,
    /// ...or at least this many bases of it
    pub min_spanning_bases: i64,
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            min_quality: 1,
            good_quality: 60,
            min_spanning_fraction: 0.5,
            min_spanning_bases: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BinningConfig {
    /// Bins are compatible when their coverages differ by at most this fraction
    pub coverage_tolerance: f64,
}

impl Default for BinningConfig {
    fn default() -> Self {
        Self {
            coverage_tolerance: 0.25,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StreamingConfig {
    /// Capacity of the record channel between reader and resolver
    pub channel_capacity: usize,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Output format (pretty, compact, json)
    pub format: String,
    /// Daily-rolled log file; console when unset
    pub file_path: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file_path: None,
        }
    }
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },

    #[error("Input/Output error: {message}")]
    IOError { message: String },

    #[error("Validation error: {field} is invalid: {reason}")]
    ValidationError { field: String, reason: String },

    #[error("Malformed input at line {line}: {message}")]
    InputError { line: usize, message: String },
}

impl From<ConfigError> for PipelineError {
    fn from(err: ConfigError) -> Self {
        PipelineError::ConfigurationError {
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        PipelineError::IOError {
            message: err.to_string(),
        }
    }
}

/// Layered configuration: built-in defaults, an optional TOML file, then
/// `BRIDGE__SECTION__KEY` environment overrides.
pub struct ConfigurationManager {
    config: ResolverConfiguration,
    config_path: Option<PathBuf>,
}

impl ConfigurationManager {
    pub const ENV_PREFIX: &'static str = "BRIDGE";

    /// Built-in defaults with environment overrides
    pub fn new() -> Result<Self, PipelineError> {
        Self::load(None)
    }

    /// Defaults only; no file or environment lookups
    pub fn with_defaults() -> Self {
        Self {
            config: ResolverConfiguration::default(),
            config_path: None,
        }
    }

    pub fn from_file<P: AsRef<Path>>(config_path: P) -> Result<Self, PipelineError> {
        Self::load(Some(config_path.as_ref()))
    }

    fn load(path: Option<&Path>) -> Result<Self, PipelineError> {
        let defaults = toml::to_string(&ResolverConfiguration::default()).map_err(|e| {
            PipelineError::ConfigurationError {
                message: e.to_string(),
            }
        })?;

        let mut builder =
            Config::builder().add_source(File::from_str(&defaults, FileFormat::Toml));

        if let Some(path) = path {
            if !path.exists() {
                return Err(PipelineError::IOError {
                    message: format!("configuration file {} not found", path.display()),
                });
            }
            builder = builder.add_source(File::from(path).format(FileFormat::Toml));
        } else {
            info!("No configuration file given, using built-in defaults");
        }

        builder = builder.add_source(
            Environment::with_prefix(Self::ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config: ResolverConfiguration = builder.build()?.try_deserialize()?;
        let manager = Self {
            config,
            config_path: path.map(Path::to_path_buf),
        };
        manager.validate_configuration()?;
        Ok(manager)
    }

    pub fn config(&self) -> &ResolverConfiguration {
        &self.config
    }

    pub fn into_config(self) -> ResolverConfiguration {
        self.config
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    /// Write the current configuration as TOML
    pub fn write_template<P: AsRef<Path>>(&self, path: P) -> Result<(), PipelineError> {
        let text =
            toml::to_string_pretty(&self.config).map_err(|e| PipelineError::ConfigurationError {
                message: e.to_string(),
            })?;
        std::fs::write(path, text)?;
        Ok(())
    }

    fn validate_configuration(&self) -> Result<(), PipelineError> {
        validate(&self.config)
    }
}

/// Reject parameter combinations the resolver cannot work with
pub fn validate(config: &ResolverConfiguration) -> Result<(), PipelineError> {
    let search = &config.search;
    if search.absolute_tolerance < 0 {
        return Err(PipelineError::ValidationError {
            field: "search.absolute_tolerance".to_string(),
            reason: "must not be negative".to_string(),
        });
    }
    if !(0.0..=1.0).contains(&search.relative_tolerance) {
        return Err(PipelineError::ValidationError {
            field: "search.relative_tolerance".to_string(),
            reason: "must be within [0, 1]".to_string(),
        });
    }
    if search.distance_limit <= 0 {
        return Err(PipelineError::ValidationError {
            field: "search.distance_limit".to_string(),
            reason: "must be positive".to_string(),
        });
    }
    if search.keep_best == 0 || search.hit_limit == 0 || search.max_depth == 0 {
        return Err(PipelineError::ValidationError {
            field: "search".to_string(),
            reason: "keep_best, hit_limit and max_depth must be at least 1".to_string(),
        });
    }
    if config.bridge.max_vote_diff < 0 {
        return Err(PipelineError::ValidationError {
            field: "bridge.max_vote_diff".to_string(),
            reason: "must not be negative".to_string(),
        });
    }
    if !(0.0..1.0).contains(&config.binning.coverage_tolerance) {
        return Err(PipelineError::ValidationError {
            field: "binning.coverage_tolerance".to_string(),
            reason: "must be within [0, 1)".to_string(),
        });
    }
    if config.pipeline.channel_capacity == 0 {
        return Err(PipelineError::ValidationError {
            field: "pipeline.channel_capacity".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    if config.alignment.good_quality < config.alignment.min_quality {
        warn!(
            "alignment.good_quality ({}) is below alignment.min_quality ({})",
            config.alignment.good_quality, config.alignment.min_quality
        );
    }
    Ok(())
}

/// Install the global tracing subscriber. Returns the file writer guard when
/// logging to a file; it must be kept alive for the duration of the run.
pub fn setup_logging(
    logging: &LoggingConfig,
) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>, PipelineError> {
    use tracing_appender::rolling;
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if tracing::dispatcher::has_been_set() {
        return Ok(None);
    }

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let registry = tracing_subscriber::registry().with(env_filter);

    let (writer, guard) = match &logging.file_path {
        Some(file_path) => {
            let appender = rolling::daily(
                file_path.parent().unwrap_or(Path::new(".")),
                file_path
                    .file_name()
                    .unwrap_or(std::ffi::OsStr::new("bridge-forge.log")),
            );
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            (Some(non_blocking), Some(guard))
        }
        None => (None, None),
    };

    let installed = match (logging.format.as_str(), writer) {
        ("json", Some(w)) => registry
            .with(fmt::layer().json().with_writer(w))
            .try_init(),
        ("json", None) => registry.with(fmt::layer().json()).try_init(),
        ("compact", Some(w)) => registry
            .with(fmt::layer().compact().with_writer(w))
            .try_init(),
        ("compact", None) => registry.with(fmt::layer().compact()).try_init(),
        (_, Some(w)) => registry
            .with(fmt::layer().with_ansi(false).with_writer(w))
            .try_init(),
        (_, None) => registry
            .with(fmt::layer().without_time().with_target(false))
            .try_init(),
    };

    installed.map_err(|e| PipelineError::ConfigurationError {
        message: format!("logging setup failed: {e}"),
    })?;
    Ok(guard)
}

#[cfg(test)]
mod configuration_tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_allowance_uses_larger_tolerance() {
        let search = SearchConfig::default();
        assert_eq!(search.allowance(100), 200);
        assert_eq!(search.allowance(2000), 600);
        assert_eq!(search.allowance(-2000), 600);
    }

    #[test]
    fn test_defaults_validate() {
        assert!(validate(&ResolverConfiguration::default()).is_ok());
    }

    #[test]
    fn test_invalid_relative_tolerance_rejected() {
        let mut config = ResolverConfiguration::default();
        config.search.relative_tolerance = 1.5;
        let err = validate(&config).unwrap_err();
        assert!(matches!(err, PipelineError::ValidationError { ref field, .. } if field == "search.relative_tolerance"));
    }

    #[test]
    fn test_file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[search]\ndistance_limit = 5000\n\n[bridge]\nmax_vote_diff = 4").unwrap();

        let manager = ConfigurationManager::from_file(file.path()).unwrap();
        assert_eq!(manager.config().search.distance_limit, 5000);
        assert_eq!(manager.config().bridge.max_vote_diff, 4);
        assert_eq!(manager.config().search.absolute_tolerance, 200);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = ConfigurationManager::from_file("/nonexistent/bridge.toml");
        assert!(matches!(result, Err(PipelineError::IOError { .. })));
    }

    #[test]
    fn test_template_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("template.toml");
        ConfigurationManager::with_defaults()
            .write_template(&path)
            .unwrap();
        let reloaded = ConfigurationManager::from_file(&path).unwrap();
        assert_eq!(reloaded.config(), &ResolverConfiguration::default());
    }
}
