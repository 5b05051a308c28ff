//! World-View journey simulator
//!
//! Drives simulated vehicles along routes on a fixed tick and prints their
//! progress, either as live progress bars or as JSON event lines.

use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::PathBuf;
use std::process::ExitCode;
use worldview_cli::Status;
use worldview_core::Error;
use worldview_core::config::Config;
use worldview_core::error::exit_codes;
use worldview_telemetry::TelemetryConfig;

mod commands;

use commands::run::RunArgs;

/// Journey simulation for the World-View dealership demo
#[derive(Parser)]
#[command(name = "worldview-sim")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file (defaults to worldview.toml in the current directory)
    #[arg(short, long, global = true, env = "WORLDVIEW_CONFIG")]
    config: Option<PathBuf>,

    /// Write machine-readable JSON to stdout
    #[arg(long, global = true)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the simulation until interrupted, timed out or finished
    Run(RunArgs),

    /// List the routes journeys can take
    Routes,

    /// Validate the configuration and routes file
    CheckConfig,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => return fail(&err, cli.json),
    };

    let telemetry = TelemetryConfig {
        log_level: if cli.verbose {
            "debug".to_string()
        } else {
            config.schema.logging.level.clone()
        },
        json: config.schema.logging.json,
        log_directory: config.schema.logging.directory.clone(),
        ..TelemetryConfig::default()
    };
    let _telemetry_guard = match worldview_telemetry::init_with_config(&telemetry) {
        Ok(guard) => guard,
        Err(err) => {
            Status::error(&format!("Failed to initialize logging: {err:#}"));
            return ExitCode::from(exit_codes::FAILURE as u8);
        }
    };

    let result = match cli.command {
        Commands::Run(args) => commands::run::run(&config, args, cli.json).await,
        Commands::Routes => commands::routes::run(&config, cli.json),
        Commands::CheckConfig => commands::check_config::run(&config, cli.json),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => fail(&err, cli.json),
    }
}

/// Report `err` and map it to the process exit code. With `--json` the
/// report is a single JSON line on stdout.
fn fail(err: &Error, json_output: bool) -> ExitCode {
    match json_output.then(|| error_line(err)) {
        Some(Ok(line)) => println!("{line}"),
        _ => Status::error(&err.to_string()),
    }
    ExitCode::from(u8::try_from(err.exit_code()).unwrap_or(exit_codes::FAILURE as u8))
}

fn error_line(err: &Error) -> serde_json::Result<String> {
    serde_json::to_string(&json!({
        "type": "error",
        "error": err.to_report(),
        "exit_code": err.exit_code(),
    }))
}
