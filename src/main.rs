use fsload::cli::commands::{CliArgs, Commands, RunArgs, SweepArgs};
use fsload::cli::output::{OutputFormat, OutputFormatter};
use fsload::util::logging::{init_logging, parse_level, LoggingConfig};
use fsload::{Simulation, TargetDir, VERSION};

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, Level};

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();
    init_logging_from_args(&args);

    debug!("fsload v{} starting", VERSION);
    debug!("Arguments: {:?}", args);

    let exit_code = match &args.command {
        Commands::Run(run_args) => handle_run(run_args, args.quiet).await,
        Commands::Sweep(sweep_args) => handle_sweep(sweep_args),
    };

    std::process::exit(exit_code);
}

fn init_logging_from_args(args: &CliArgs) {
    let mut config = LoggingConfig::from_env();

    if let Some(level_str) = &args.log_level {
        config.level = parse_level(level_str);
    } else if args.verbose {
        config.level = Level::DEBUG;
    } else if args.quiet {
        config.level = Level::ERROR;
    }

    init_logging(config);
}

async fn handle_run(args: &RunArgs, quiet: bool) -> i32 {
    let config = match args.to_config() {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {}", e);
            return 1;
        }
    };

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        eprintln!("\nPlease check your environment variables and command-line arguments.");
        return 1;
    }

    let format: OutputFormat = args.format.into();
    let formatter = OutputFormatter::new(format);

    // The JSON and YAML reports already embed the configuration
    if format == OutputFormat::Human && !quiet {
        match formatter.format_config(&config) {
            Ok(banner) => println!("{}", banner),
            Err(e) => error!("Failed to format configuration: {}", e),
        }
    }

    let shutdown = CancellationToken::new();
    let ctrl_c = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl-C, stopping simulation");
                ctrl_c.cancel();
            }
            Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
        }
    });

    let report = match Simulation::run(config, shutdown).await {
        Ok(report) => report,
        Err(e) => {
            error!("Simulation failed: {}", e);
            return 1;
        }
    };

    match formatter.format_report(&report) {
        Ok(output) => {
            println!("{}", output);
            0
        }
        Err(e) => {
            error!("Failed to format report: {}", e);
            1
        }
    }
}

fn handle_sweep(args: &SweepArgs) -> i32 {
    let dir = match TargetDir::open(&args.directory) {
        Ok(dir) => dir,
        Err(e) => {
            error!("{}", e);
            return 1;
        }
    };

    let removed = match dir.sweep() {
        Ok(removed) => removed,
        Err(e) => {
            error!("Sweep failed: {}", e);
            return 1;
        }
    };
    info!(removed, "Sweep complete");

    let formatter = OutputFormatter::new(args.format.into());
    match formatter.format_sweep(dir.path(), removed) {
        Ok(output) => {
            println!("{}", output);
            0
        }
        Err(e) => {
            error!("Failed to format sweep result: {}", e);
            1
        }
    }
}
