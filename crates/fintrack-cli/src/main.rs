//! Fintrack CLI - Transaction upload pipeline
//!
//! Usage:
//!   fintrack columns --file F        Show headers and detected column roles
//!   fintrack analyze --file F        Metrics and dashboard panels
//!   fintrack export --file F --csv OUT --report OUT
//!   fintrack serve --port 3000       Start web server

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use clap::Parser;
use fintrack_core::{Config, Pipeline, PipelineConfig, RunOptions};
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let config =
        Config::load_with_env(cli.config.as_deref()).context("Failed to load configuration")?;
    debug!(
        "Config loaded from {}",
        config
            .source
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "built-in defaults".to_string())
    );
    let pipeline = Pipeline::new(PipelineConfig::from(&config));

    match cli.command {
        Commands::Columns { file } => commands::cmd_columns(&pipeline, &file),
        Commands::Analyze {
            file,
            columns,
            top,
            policy,
            json,
        } => {
            let options = RunOptions { top_n: top, policy };
            commands::cmd_analyze(&pipeline, &file, &columns.selection(), &options, json)
        }
        Commands::Export {
            file,
            columns,
            policy,
            csv,
            report,
        } => commands::cmd_export(
            &pipeline,
            &file,
            &columns.selection(),
            policy,
            csv.as_deref(),
            report.as_deref(),
        ),
        Commands::Serve {
            port,
            host,
            static_dir,
        } => commands::cmd_serve(&config, &host, port, static_dir.as_deref()).await,
    }
}
