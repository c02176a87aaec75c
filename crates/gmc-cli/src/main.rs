//! GMC CLI - Main entry point

use clap::Parser;
use gmc_cli::Cli;
use gmc_common::logging::{init_logging, LogConfig, LogLevel, LogOutput};
use std::process;
use tracing::error;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // Parse command-line arguments
    let cli = Cli::parse();

    // Verbose mode logs debug output, otherwise only warnings reach stderr
    let level = if cli.global.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Warn
    };
    let defaults = LogConfig::builder()
        .level(level)
        .output(LogOutput::Console)
        .log_file_prefix("gmc-cli")
        .build();

    // Environment variables take precedence over the defaults
    let log_config = defaults.clone().merge_env().unwrap_or(defaults);

    // The CLI works without logging
    let _ = init_logging(&log_config);

    if let Err(e) = gmc_cli::commands::run(cli).await {
        error!(error = %e, "Command failed");
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
