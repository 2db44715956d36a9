//! Configuration management for fsload
//!
//! A [`SimulationConfig`] is the fully resolved record a simulation runs with.
//! It is built from the historical defaults, optionally overridden by
//! environment variables, and finally by command-line flags.
//!
//! # Environment Variables
//!
//! - `FSLOAD_RUNTIME`: Total run duration in seconds - default: "3600"
//! - `FSLOAD_SLEEP_PERIOD`: Base sleep before every actor cycle, in seconds - default: "1.0"
//! - `FSLOAD_JITTER_MIN` / `FSLOAD_JITTER_MAX`: Sleep multiplier range - default: "1.0" / "1.0"
//! - `FSLOAD_CREATE_BYTES_MIN` / `FSLOAD_CREATE_BYTES_MAX`: Size of new files
//! - `FSLOAD_READ_BYTES_MIN` / `FSLOAD_READ_BYTES_MAX`: Bytes read per read cycle
//! - `FSLOAD_WRITE_BYTES_MIN` / `FSLOAD_WRITE_BYTES_MAX`: Bytes written per write cycle
//! - `FSLOAD_CREATORS`, `FSLOAD_DELETERS`, `FSLOAD_METADATA_MUTATORS`,
//!   `FSLOAD_READERS`, `FSLOAD_WRITERS`: Actor count per variant - default: "1"
//! - `FSLOAD_METADATA_RELEASE`: `always` or `if-exists` - default: "always"
//!
//! All byte ranges default to 4096..=5000000.
//!
//! # Example
//!
//! ```no_run
//! use fsload::SimulationConfig;
//! use std::time::Duration;
//!
//! let mut config = SimulationConfig::from_env("/tmp/watched");
//! config.runtime = Duration::from_secs(60);
//! config.validate().expect("Invalid configuration");
//! ```

use serde::{Serialize, Serializer};
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Default values for configuration
const DEFAULT_RUNTIME_SECS: u64 = 3600;
const DEFAULT_SLEEP_PERIOD_SECS: f64 = 1.0;
const DEFAULT_JITTER: (f64, f64) = (1.0, 1.0);
const DEFAULT_BYTES: (u64, u64) = (4096, 5_000_000);
const DEFAULT_ACTORS_PER_KIND: usize = 1;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No target directory was given
    #[error("Simulation directory not specified")]
    MissingDirectory,

    /// Configuration validation failed
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    /// Failed to parse configuration value
    #[error("Failed to parse {field}: {error}")]
    ParseError { field: String, error: String },
}

/// Inclusive range of byte counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ByteRange {
    pub min: u64,
    pub max: u64,
}

impl ByteRange {
    pub fn new(min: u64, max: u64) -> Self {
        Self { min, max }
    }

    /// A range that always yields `len`
    pub fn exactly(len: u64) -> Self {
        Self { min: len, max: len }
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.min, self.max)
    }
}

/// Inclusive range of multipliers applied to the base sleep period
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Jitter {
    pub min: f64,
    pub max: f64,
}

impl Jitter {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// No jitter: every delay equals the sleep period
    pub fn none() -> Self {
        Self { min: 1.0, max: 1.0 }
    }
}

impl fmt::Display for Jitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.min, self.max)
    }
}

/// Number of actors spawned per variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ActorCounts {
    pub creators: usize,
    pub deleters: usize,
    pub metadata_mutators: usize,
    pub readers: usize,
    pub writers: usize,
}

impl ActorCounts {
    /// The same count for every variant
    pub fn uniform(count: usize) -> Self {
        Self {
            creators: count,
            deleters: count,
            metadata_mutators: count,
            readers: count,
            writers: count,
        }
    }

    pub fn total(&self) -> usize {
        self.creators + self.deleters + self.metadata_mutators + self.readers + self.writers
    }
}

impl Default for ActorCounts {
    fn default() -> Self {
        Self::uniform(DEFAULT_ACTORS_PER_KIND)
    }
}

/// What a metadata mutator does with its claim once the chmod attempt is over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MetadataReleasePolicy {
    /// Release the name whether or not the chmod succeeded. A vanished file
    /// re-enters the registry and later claims on it fail.
    #[default]
    Always,
    /// Release only if the file still exists, otherwise retire the name
    IfExists,
}

impl FromStr for MetadataReleasePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "always" => Ok(Self::Always),
            "if-exists" | "if_exists" => Ok(Self::IfExists),
            other => Err(ConfigError::ParseError {
                field: "metadata_release".to_string(),
                error: format!("unknown policy '{}' (expected always or if-exists)", other),
            }),
        }
    }
}

impl fmt::Display for MetadataReleasePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Always => write!(f, "always"),
            Self::IfExists => write!(f, "if-exists"),
        }
    }
}

pub(crate) fn serialize_secs<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_f64(value.as_secs_f64())
}

/// Resolved configuration for one simulation run
///
/// Immutable once handed to a [`Simulation`](crate::Simulation); every actor
/// shares the same record.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationConfig {
    /// Directory the simulation populates and mutates
    pub directory: PathBuf,

    /// Total run duration
    #[serde(serialize_with = "serialize_secs")]
    pub runtime: Duration,

    /// Base sleep before each actor cycle
    #[serde(serialize_with = "serialize_secs")]
    pub sleep_period: Duration,

    /// Random multiplier range for the sleep period
    pub jitter: Jitter,

    /// Size range for newly created files
    pub create_bytes: ByteRange,

    /// Bytes read per read cycle
    pub read_bytes: ByteRange,

    /// Bytes written per write cycle
    pub write_bytes: ByteRange,

    /// Actor count per variant
    pub actors: ActorCounts,

    /// Release behaviour of metadata mutators
    pub metadata_release: MetadataReleasePolicy,

    /// Accept a target directory that already has entries. Every file in it
    /// is deleted at teardown.
    pub allow_non_empty: bool,

    /// Change the process working directory into the target directory on start
    pub change_dir: bool,
}

impl SimulationConfig {
    /// Creates a configuration with the default parameters for `directory`
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            runtime: Duration::from_secs(DEFAULT_RUNTIME_SECS),
            sleep_period: Duration::from_secs_f64(DEFAULT_SLEEP_PERIOD_SECS),
            jitter: Jitter::new(DEFAULT_JITTER.0, DEFAULT_JITTER.1),
            create_bytes: ByteRange::new(DEFAULT_BYTES.0, DEFAULT_BYTES.1),
            read_bytes: ByteRange::new(DEFAULT_BYTES.0, DEFAULT_BYTES.1),
            write_bytes: ByteRange::new(DEFAULT_BYTES.0, DEFAULT_BYTES.1),
            actors: ActorCounts::default(),
            metadata_release: MetadataReleasePolicy::default(),
            allow_non_empty: false,
            change_dir: true,
        }
    }

    /// Creates a configuration for `directory`, applying `FSLOAD_*` overrides
    ///
    /// Unparseable values are logged and the default is kept.
    pub fn from_env(directory: impl Into<PathBuf>) -> Self {
        let mut config = Self::new(directory);

        if let Some(secs) = env_parse::<u64>("FSLOAD_RUNTIME") {
            config.runtime = Duration::from_secs(secs);
        }
        if let Some(secs) = env_parse::<f64>("FSLOAD_SLEEP_PERIOD") {
            match Duration::try_from_secs_f64(secs) {
                Ok(period) => config.sleep_period = period,
                Err(e) => tracing::warn!("Ignoring FSLOAD_SLEEP_PERIOD={}: {}", secs, e),
            }
        }

        config.jitter.min = env_parse("FSLOAD_JITTER_MIN").unwrap_or(config.jitter.min);
        config.jitter.max = env_parse("FSLOAD_JITTER_MAX").unwrap_or(config.jitter.max);

        for (prefix, range) in [
            ("FSLOAD_CREATE_BYTES", &mut config.create_bytes),
            ("FSLOAD_READ_BYTES", &mut config.read_bytes),
            ("FSLOAD_WRITE_BYTES", &mut config.write_bytes),
        ] {
            range.min = env_parse(&format!("{}_MIN", prefix)).unwrap_or(range.min);
            range.max = env_parse(&format!("{}_MAX", prefix)).unwrap_or(range.max);
        }

        let actors = &mut config.actors;
        actors.creators = env_parse("FSLOAD_CREATORS").unwrap_or(actors.creators);
        actors.deleters = env_parse("FSLOAD_DELETERS").unwrap_or(actors.deleters);
        actors.metadata_mutators =
            env_parse("FSLOAD_METADATA_MUTATORS").unwrap_or(actors.metadata_mutators);
        actors.readers = env_parse("FSLOAD_READERS").unwrap_or(actors.readers);
        actors.writers = env_parse("FSLOAD_WRITERS").unwrap_or(actors.writers);

        if let Some(policy) = env_parse::<MetadataReleasePolicy>("FSLOAD_METADATA_RELEASE") {
            config.metadata_release = policy;
        }

        config
    }

    /// Validates the configuration
    ///
    /// Checks that:
    /// - A directory was given
    /// - Every range has `min <= max`
    /// - Jitter bounds are finite and non-negative
    /// - The longest jittered sleep fits in a `Duration`
    /// - The runtime is at least one millisecond
    ///
    /// Whether the directory exists is checked when the simulation starts.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if any validation fails
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.directory.as_os_str().is_empty() {
            return Err(ConfigError::MissingDirectory);
        }

        if !self.jitter.min.is_finite() || !self.jitter.max.is_finite() {
            return Err(ConfigError::ValidationFailed(
                "Jitter bounds must be finite".to_string(),
            ));
        }
        if self.jitter.min < 0.0 {
            return Err(ConfigError::ValidationFailed(
                "Jitter bounds cannot be negative".to_string(),
            ));
        }
        if self.jitter.min > self.jitter.max {
            return Err(ConfigError::ValidationFailed(format!(
                "Jitter minimum {} exceeds maximum {}",
                self.jitter.min, self.jitter.max
            )));
        }

        if Duration::try_from_secs_f64(self.sleep_period.as_secs_f64() * self.jitter.max).is_err()
        {
            return Err(ConfigError::ValidationFailed(format!(
                "Sleep period {}s scaled by jitter {} is too large",
                self.sleep_period.as_secs_f64(),
                self.jitter.max
            )));
        }

        for (field, range) in [
            ("create_bytes", self.create_bytes),
            ("read_bytes", self.read_bytes),
            ("write_bytes", self.write_bytes),
        ] {
            if range.min > range.max {
                return Err(ConfigError::ValidationFailed(format!(
                    "{} minimum {} exceeds maximum {}",
                    field, range.min, range.max
                )));
            }
        }

        if self.runtime < Duration::from_millis(1) {
            return Err(ConfigError::ValidationFailed(
                "Runtime must be at least 1 millisecond".to_string(),
            ));
        }

        Ok(())
    }

    /// Target directory
    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

fn env_parse<T>(key: &str) -> Option<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    let raw = env::var(key).ok()?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("Ignoring {}={:?}: {}", key, raw, e);
            None
        }
    }
}

impl fmt::Display for SimulationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Directory: {}", self.directory.display())?;
        writeln!(f, "Runtime (seconds): {}", self.runtime.as_secs_f64())?;
        writeln!(
            f,
            "Actor sleep period (seconds): {}",
            self.sleep_period.as_secs_f64()
        )?;
        writeln!(f, "Jitter factor: {}", self.jitter)?;
        writeln!(f, "Filesize range for new files (bytes): {}", self.create_bytes)?;
        writeln!(f, "Read range (bytes): {}", self.read_bytes)?;
        writeln!(f, "Write range (bytes): {}", self.write_bytes)?;
        writeln!(f, "Metadata release policy: {}", self.metadata_release)?;
        writeln!(f)?;
        writeln!(f, "Actors:")?;
        writeln!(f, "\tCreating: {}", self.actors.creators)?;
        writeln!(f, "\tDeleting: {}", self.actors.deleters)?;
        writeln!(f, "\tChanging metadata: {}", self.actors.metadata_mutators)?;
        writeln!(f, "\tReading: {}", self.actors.readers)?;
        writeln!(f, "\tWriting: {}", self.actors.writers)?;
        Ok(())
    }
}
