//! CLI command tests
//!
//! This module contains all tests for the CLI commands.

use std::io::Write;

use clap::Parser;
use fintrack_core::{ColumnSelection, Pipeline, RunOptions, SignPolicy};
use tempfile::{NamedTempFile, TempDir};

use crate::cli::{Cli, ColumnArgs, Commands};
use crate::commands::{self, truncate, InputFile};

const TYPED_CSV: &str = "Date,Description,Amount,Income/Expense\n\
    2024-01-03,Coffee,-50,Expense\n\
    2024-01-01,Salary,1000,Income\n\
    2024-01-04,Lunch,N/A,Expense\n";

fn write_csv(contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

// ========== Argument parsing ==========

#[test]
fn test_parse_analyze_explicit_columns() {
    let cli = Cli::try_parse_from([
        "fintrack",
        "analyze",
        "--file",
        "jan.csv",
        "--date",
        "Posted",
        "--amount",
        "Value",
        "--type",
        "Kind",
        "--policy",
        "type-keyed",
        "--top",
        "3",
    ])
    .unwrap();

    match cli.command {
        Commands::Analyze {
            columns,
            policy,
            top,
            json,
            ..
        } => {
            assert_eq!(policy, Some(SignPolicy::TypeKeyed));
            assert_eq!(top, Some(3));
            assert!(!json);
            match columns.selection() {
                ColumnSelection::Explicit(explicit) => {
                    assert_eq!(explicit.date, "Posted");
                    assert_eq!(explicit.amount, "Value");
                    assert_eq!(explicit.tx_type.as_deref(), Some("Kind"));
                    assert_eq!(explicit.category, None);
                }
                ColumnSelection::Auto => panic!("expected explicit selection"),
            }
        }
        _ => panic!("expected analyze command"),
    }
}

#[test]
fn test_parse_rejects_unknown_policy() {
    let result = Cli::try_parse_from([
        "fintrack", "analyze", "--file", "jan.csv", "--policy", "both",
    ]);
    assert!(result.is_err());
}

#[test]
fn test_parse_global_flags() {
    let cli = Cli::try_parse_from([
        "fintrack",
        "columns",
        "--file",
        "jan.csv",
        "--config",
        "custom.toml",
        "-v",
    ])
    .unwrap();
    assert!(cli.verbose);
    assert_eq!(cli.config.unwrap().to_str(), Some("custom.toml"));
}

#[test]
fn test_column_args_default_to_auto() {
    assert!(ColumnArgs::default().selection().is_auto());

    let only_category = ColumnArgs {
        category: Some("Bucket".into()),
        ..Default::default()
    };
    assert!(only_category.selection().is_auto());
}

// ========== Helpers ==========

#[test]
fn test_truncate() {
    assert_eq!(truncate("Groceries", 24), "Groceries");
    assert_eq!(truncate("Entertainment and more", 10), "Enterta...");
    assert_eq!(truncate("Café Crème Brûlée", 8), "Café ...");
}

#[test]
fn test_input_file_missing() {
    let dir = TempDir::new().unwrap();
    let result = InputFile::read(&dir.path().join("nope.csv"));
    assert!(result.is_err());
    assert!(result
        .err()
        .unwrap()
        .to_string()
        .contains("Failed to read file"));
}

#[test]
fn test_input_file_keeps_name() {
    let file = write_csv(TYPED_CSV);
    let input = InputFile::read(file.path()).unwrap();
    assert!(input.name.unwrap().ends_with(".csv"));
    assert_eq!(input.bytes, TYPED_CSV.as_bytes());
}

// ========== Commands ==========

#[test]
fn test_cmd_columns() {
    let file = write_csv(TYPED_CSV);
    let result = commands::cmd_columns(&Pipeline::default(), file.path());
    assert!(result.is_ok());
}

#[test]
fn test_cmd_analyze_summary_and_json() {
    let file = write_csv(TYPED_CSV);
    let pipeline = Pipeline::default();

    let summary = commands::cmd_analyze(
        &pipeline,
        file.path(),
        &ColumnSelection::Auto,
        &RunOptions::default(),
        false,
    );
    assert!(summary.is_ok());

    let json = commands::cmd_analyze(
        &pipeline,
        file.path(),
        &ColumnSelection::Auto,
        &RunOptions::default(),
        true,
    );
    assert!(json.is_ok());
}

#[test]
fn test_cmd_analyze_unknown_column() {
    let file = write_csv(TYPED_CSV);
    let columns = ColumnArgs {
        date: Some("When".into()),
        amount: Some("Amount".into()),
        ..Default::default()
    };

    let result = commands::cmd_analyze(
        &Pipeline::default(),
        file.path(),
        &columns.selection(),
        &RunOptions::default(),
        false,
    );

    let message = result.err().unwrap().to_string();
    assert!(message.contains("When"));
}

#[test]
fn test_cmd_analyze_forced_policy_without_type_column() {
    let file = write_csv("Date,Amount\n2024-01-01,5\n");
    let options = RunOptions {
        policy: Some(SignPolicy::TypeKeyed),
        ..Default::default()
    };

    let result = commands::cmd_analyze(
        &Pipeline::default(),
        file.path(),
        &ColumnSelection::Auto,
        &options,
        false,
    );
    assert!(result.is_err());
}

#[test]
fn test_cmd_export_writes_both_files() {
    let file = write_csv(TYPED_CSV);
    let dir = TempDir::new().unwrap();
    let csv_out = dir.path().join("processed.csv");
    let report_out = dir.path().join("summary.xlsx");

    commands::cmd_export(
        &Pipeline::default(),
        file.path(),
        &ColumnSelection::Auto,
        None,
        Some(&csv_out),
        Some(&report_out),
    )
    .unwrap();

    let csv = std::fs::read_to_string(&csv_out).unwrap();
    let mut lines = csv.lines();
    assert_eq!(lines.next(), Some("date,amount,category,type,description"));
    assert_eq!(lines.count(), 2);

    let report = std::fs::read(&report_out).unwrap();
    assert!(report.starts_with(b"PK\x03\x04"));
}

#[test]
fn test_cmd_export_requires_target() {
    let file = write_csv(TYPED_CSV);
    let result = commands::cmd_export(
        &Pipeline::default(),
        file.path(),
        &ColumnSelection::Auto,
        None,
        None,
        None,
    );
    assert!(result
        .err()
        .unwrap()
        .to_string()
        .contains("Nothing to export"));
}
