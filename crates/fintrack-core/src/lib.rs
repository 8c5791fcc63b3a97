//! Fintrack Core Library
//!
//! Ingestion and normalization pipeline for the Fintrack dashboard:
//! - File loading for CSV, spreadsheet and PDF-embedded tables
//! - Column role resolution (explicit or auto-detected)
//! - Date/amount coercion with per-cause drop counts
//! - Keyword categorization for uploads without a category column
//! - Category and calendar aggregates, dashboard panels
//! - Income/expense metrics under an explicit sign policy
//! - Processed CSV and XLSX summary exports
//! - Layered TOML configuration

pub mod aggregate;
pub mod categorize;
pub mod config;
pub mod error;
pub mod export;
pub mod import;
pub mod metrics;
pub mod models;
pub mod normalize;
mod pdf_layout;
pub mod pipeline;
pub mod resolve;

pub use aggregate::{Dashboard, DEFAULT_TOP_N};
pub use categorize::{KeywordMap, DEFAULT_CATEGORY};
pub use config::Config;
pub use error::{Error, LoadError, ResolutionError, Result};
pub use export::ExportFormat;
pub use models::{
    Cell, ColumnRef, ColumnRole, ColumnRoleMap, FileKind, MetricsRecord, NormalizedTable, Panel,
    RawTable, SignPolicy, Transaction,
};
pub use pipeline::{
    ColumnPreview, Pipeline, PipelineConfig, PipelineOutput, RunOptions, RunReport, Upload,
};
pub use resolve::{ColumnSelection, DetectedRoles, ExplicitColumns};
