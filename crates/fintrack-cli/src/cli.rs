//! CLI argument definitions using clap
//!
//! This module contains the clap structs for parsing CLI arguments.
//! The command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use fintrack_core::{ColumnSelection, SignPolicy};

/// Fintrack - Load, clean and summarize transaction exports
#[derive(Parser)]
#[command(name = "fintrack")]
#[command(about = "Personal finance upload pipeline and dashboard", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Config file (defaults to the user data directory, then built-in defaults)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Column names for explicit mode
///
/// Auto-detection is used when neither `--date` nor `--amount` is given.
#[derive(Args, Debug, Default, Clone)]
pub struct ColumnArgs {
    /// Date column
    #[arg(long)]
    pub date: Option<String>,

    /// Amount column
    #[arg(long)]
    pub amount: Option<String>,

    /// Category column
    #[arg(long)]
    pub category: Option<String>,

    /// Income/expense type column
    #[arg(long = "type")]
    pub tx_type: Option<String>,

    /// Description column (keyword categorization source)
    #[arg(long)]
    pub description: Option<String>,
}

impl ColumnArgs {
    pub fn selection(&self) -> ColumnSelection {
        ColumnSelection::from_parts(
            self.date.clone(),
            self.amount.clone(),
            self.category.clone(),
            self.tx_type.clone(),
            self.description.clone(),
        )
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show headers, sample rows and detected column roles
    Columns {
        /// Transaction file (CSV, XLSX/XLS/ODS or PDF)
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Run the pipeline and print metrics and panels
    Analyze {
        /// Transaction file (CSV, XLSX/XLS/ODS or PDF)
        #[arg(short, long)]
        file: PathBuf,

        #[command(flatten)]
        columns: ColumnArgs,

        /// Number of categories in the top-categories view
        #[arg(long)]
        top: Option<usize>,

        /// Sign policy: type-keyed or sign-keyed (chosen from the columns if unset)
        #[arg(long)]
        policy: Option<SignPolicy>,

        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write the processed CSV and/or the summary workbook
    Export {
        /// Transaction file (CSV, XLSX/XLS/ODS or PDF)
        #[arg(short, long)]
        file: PathBuf,

        #[command(flatten)]
        columns: ColumnArgs,

        /// Sign policy: type-keyed or sign-keyed
        #[arg(long)]
        policy: Option<SignPolicy>,

        /// Output path for the processed CSV
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Output path for the XLSX summary report
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Start the web server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Directory of static files for the dashboard UI
        #[arg(long)]
        static_dir: Option<PathBuf>,
    },
}
