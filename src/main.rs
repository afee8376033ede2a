//! The main entry point for the `sweep` command-line application.
//!
//! Parses arguments, merges them over an optional configuration file and runs
//! the traversal engine from the `sweep` library.

use std::env;
use std::io;
use std::process;
use sweep::cli::{self, Args};
use sweep::config::{ConfigLoader, SweepConfig};
use sweep::errors::Result;
use sweep::{OutputFormat, OutputFormatter, traversal};
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

fn main() {
    let args = cli::parse_args();
    init_logging(&args);

    if let Err(e) = run(args) {
        error!("{e}");
        process::exit(1);
    }
}

/// Logs go to stderr so the report on stdout stays machine-readable.
fn init_logging(args: &Args) {
    let default_level = if args.verbose {
        "debug"
    } else if args.quiet {
        "warn"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run(args: Args) -> Result<()> {
    let working_dir = env::current_dir()?;

    let base = match &args.config {
        Some(path) => {
            let resolved = ConfigLoader::find_config(path, &working_dir)?;
            println!("Using config file: {}", resolved.display());
            ConfigLoader::load(&resolved)?
        }
        None => SweepConfig::default(),
    };
    let config = base.merge(args.overrides());

    if config.skip {
        warn!("Skipping execution of sweep.");
        return Ok(());
    }

    let prepared = config.prepare(&working_dir)?;
    let mut report = traversal::run(&prepared.base_dir, &prepared.traversal)?;
    let mut warnings = prepared.warnings;
    warnings.append(&mut report.warnings);
    report.warnings = warnings;

    let formatter = OutputFormatter::new(OutputFormat::from(args.format.as_str()), true);
    formatter.write_output(&mut io::stdout().lock(), &report)?;

    Ok(())
}
