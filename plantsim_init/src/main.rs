//! PlantSim state initializer CLI
//!
//! Builds the shared state store for a testbed run from its configuration
//! document: reset, populate, then dump the result.

use clap::Parser;
use plantsim_core::{Initializer, Inspector, LogLevel, StateError, TestbedConfig};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

/// Initialize the shared simulation state store
#[derive(Parser, Debug)]
#[command(name = "plantsim-init")]
#[command(about = "Set up the SQLite state store from an intermediate YAML file")]
#[command(long_about = None)]
#[command(version)]
struct Args {
    /// Intermediate YAML configuration file
    #[arg(value_name = "FILE", value_parser = existing_file)]
    config: PathBuf,

    /// Raise verbosity above the configured log level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Print the final state as JSON instead of tables
    #[arg(long)]
    json: bool,

    /// Skip dumping the store after population
    #[arg(long, conflicts_with = "json")]
    no_dump: bool,
}

fn existing_file(arg: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(arg);
    if path.exists() {
        Ok(path)
    } else {
        Err(format!("{} does not exist.", arg))
    }
}

/// Filter directive for the run: the configured level unless `-v` asks for more.
fn filter_directive(level: LogLevel, verbose: u8) -> &'static str {
    match verbose {
        0 => level.as_filter_directive(),
        1 => match level {
            LogLevel::Trace => "trace",
            _ => "debug",
        },
        _ => "trace",
    }
}

fn run(args: &Args, config: TestbedConfig) -> Result<(), StateError> {
    let db_path = config.db_path.clone();

    let mut initializer = Initializer::new(config)?;
    initializer.reset()?;
    let report = initializer.populate()?;
    info!(
        "State store ready at {} ({} devices, {} actors)",
        db_path.display(),
        report.devices,
        report.flags
    );

    if !args.no_dump {
        if let Err(e) = dump(&db_path, args.json) {
            // Diagnostics only; the store itself is complete.
            error!("Failed to dump state store: {}", e);
        }
    }

    Ok(())
}

fn dump(db_path: &Path, json: bool) -> Result<(), StateError> {
    let inspector = Inspector::new(db_path);

    if json {
        let snapshot = inspector.snapshot()?;
        match serde_json::to_string_pretty(&snapshot) {
            Ok(text) => println!("{}", text),
            Err(e) => error!("Failed to encode snapshot: {}", e),
        }
        return Ok(());
    }

    for table in inspector.dump()? {
        let table = table?;
        debug!("Dumped {} ({} rows)", table.table, table.rows.len());
        println!("{}\n", table);
    }
    Ok(())
}

fn main() {
    let args = Args::parse();

    let config = match TestbedConfig::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    // Scoped to this run; nothing is installed process-wide.
    let directive = filter_directive(config.log_level, args.verbose);
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive)),
        )
        .with_writer(std::io::stderr)
        .finish();

    let result = tracing::subscriber::with_default(subscriber, || {
        let result = run(&args, config);
        if let Err(e) = &result {
            error!("Initialization failed: {}", e);
        }
        result
    });

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
