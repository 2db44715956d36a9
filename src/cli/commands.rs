use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

use crate::config::{ByteRange, ConfigError, Jitter, MetadataReleasePolicy, SimulationConfig};

/// Filesystem load generator
#[derive(Parser, Debug)]
#[command(
    name = "fsload",
    about = "Generate concurrent filesystem load in a scratch directory",
    version,
    author,
    long_about = "fsload runs a fixed population of concurrent actors against one directory. \
                  Actors create, delete, read, rewrite and chmod randomly named files for \
                  a configurable time, then every file the run produced is removed."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(
        short = 'v',
        long,
        global = true,
        help = "Increase verbosity (can be used multiple times)"
    )]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - suppress non-error output"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Run a load simulation",
        long_about = "Spawns the configured actors against DIR until the runtime elapses or \
                      Ctrl-C is pressed, then deletes every file left in DIR and prints a \
                      summary.\n\n\
                      Examples:\n  \
                      fsload run -d /mnt/scratch\n  \
                      fsload run -d /mnt/scratch --runtime 60 --sleep 0.1\n  \
                      fsload run -d /mnt/scratch --creators 4 --readers 8 --format json"
    )]
    Run(RunArgs),

    #[command(
        about = "Remove every file from a directory",
        long_about = "Deletes every file found directly inside DIR, the same sweep a run \
                      performs during teardown. Useful after a run was killed.\n\n\
                      Examples:\n  \
                      fsload sweep -d /mnt/scratch"
    )]
    Sweep(SweepArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    #[arg(short = 'd', long, value_name = "DIR", help = "Target directory")]
    pub directory: PathBuf,

    #[arg(
        long,
        value_name = "SECONDS",
        help = "How long to run the simulation [default: 3600]"
    )]
    pub runtime: Option<u64>,

    #[arg(
        long,
        value_name = "SECONDS",
        help = "Base sleep period between actor cycles [default: 1.0]"
    )]
    pub sleep: Option<f64>,

    #[arg(
        long,
        num_args = 2,
        value_names = ["MIN", "MAX"],
        help = "Jitter factor bounds applied to the sleep period [default: 1.0 1.0]"
    )]
    pub jitter: Option<Vec<f64>>,

    #[arg(
        long,
        num_args = 2,
        value_names = ["MIN", "MAX"],
        help = "Size range for new files in bytes [default: 4096 5000000]"
    )]
    pub create_bytes: Option<Vec<u64>>,

    #[arg(
        long,
        num_args = 2,
        value_names = ["MIN", "MAX"],
        help = "Size range for reads in bytes [default: 4096 5000000]"
    )]
    pub read_bytes: Option<Vec<u64>>,

    #[arg(
        long,
        num_args = 2,
        value_names = ["MIN", "MAX"],
        help = "Size range for rewrites in bytes [default: 4096 5000000]"
    )]
    pub write_bytes: Option<Vec<u64>>,

    #[arg(long, value_name = "N", help = "Number of creating actors [default: 1]")]
    pub creators: Option<usize>,

    #[arg(long, value_name = "N", help = "Number of deleting actors [default: 1]")]
    pub deleters: Option<usize>,

    #[arg(
        long,
        value_name = "N",
        help = "Number of metadata-changing actors [default: 1]"
    )]
    pub metadata_mutators: Option<usize>,

    #[arg(long, value_name = "N", help = "Number of reading actors [default: 1]")]
    pub readers: Option<usize>,

    #[arg(long, value_name = "N", help = "Number of writing actors [default: 1]")]
    pub writers: Option<usize>,

    #[arg(
        long,
        value_enum,
        help = "Whether a file is released after a failed chmod [default: always]"
    )]
    pub metadata_release: Option<MetadataReleaseArg>,

    #[arg(long, help = "Run even if the target directory is not empty")]
    pub force: bool,

    #[arg(long, help = "Do not change the working directory to the target")]
    pub no_chdir: bool,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

impl RunArgs {
    /// Builds the simulation configuration
    ///
    /// Starts from the `FSLOAD_*` environment and applies every flag that was
    /// given on the command line on top of it.
    pub fn to_config(&self) -> Result<SimulationConfig, ConfigError> {
        let mut config = SimulationConfig::from_env(self.directory.clone());

        if let Some(secs) = self.runtime {
            config.runtime = Duration::from_secs(secs);
        }
        if let Some(secs) = self.sleep {
            config.sleep_period =
                Duration::try_from_secs_f64(secs).map_err(|e| ConfigError::ParseError {
                    field: "sleep".to_string(),
                    error: e.to_string(),
                })?;
        }
        if let Some([min, max]) = self.jitter.as_deref().and_then(pair) {
            config.jitter = Jitter::new(min, max);
        }
        if let Some([min, max]) = self.create_bytes.as_deref().and_then(pair) {
            config.create_bytes = ByteRange::new(min, max);
        }
        if let Some([min, max]) = self.read_bytes.as_deref().and_then(pair) {
            config.read_bytes = ByteRange::new(min, max);
        }
        if let Some([min, max]) = self.write_bytes.as_deref().and_then(pair) {
            config.write_bytes = ByteRange::new(min, max);
        }

        let actors = &mut config.actors;
        actors.creators = self.creators.unwrap_or(actors.creators);
        actors.deleters = self.deleters.unwrap_or(actors.deleters);
        actors.metadata_mutators = self.metadata_mutators.unwrap_or(actors.metadata_mutators);
        actors.readers = self.readers.unwrap_or(actors.readers);
        actors.writers = self.writers.unwrap_or(actors.writers);

        if let Some(policy) = self.metadata_release {
            config.metadata_release = policy.into();
        }
        if self.force {
            config.allow_non_empty = true;
        }
        if self.no_chdir {
            config.change_dir = false;
        }

        Ok(config)
    }
}

fn pair<T: Copy>(values: &[T]) -> Option<[T; 2]> {
    <[T; 2]>::try_from(values).ok()
}

#[derive(Parser, Debug, Clone)]
pub struct SweepArgs {
    #[arg(short = 'd', long, value_name = "DIR", help = "Directory to empty")]
    pub directory: PathBuf,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataReleaseArg {
    Always,
    IfExists,
}

impl From<MetadataReleaseArg> for MetadataReleasePolicy {
    fn from(arg: MetadataReleaseArg) -> Self {
        match arg {
            MetadataReleaseArg::Always => MetadataReleasePolicy::Always,
            MetadataReleaseArg::IfExists => MetadataReleasePolicy::IfExists,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Json,
    Yaml,
    Human,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => super::output::OutputFormat::Json,
            OutputFormatArg::Yaml => super::output::OutputFormat::Yaml,
            OutputFormatArg::Human => super::output::OutputFormat::Human,
        }
    }
}
