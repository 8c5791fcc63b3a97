//! Error types for Fintrack
//!
//! `LoadError` and `ResolutionError` abort a pipeline run and carry a message
//! meant for the person who uploaded the file. Per-row coercion failures are
//! not errors; they are counted in [`crate::models::DropReport`].

use thiserror::Error;

use crate::models::{ColumnRole, SignPolicy};

/// The uploaded file could not be turned into a raw table
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("The uploaded file is empty")]
    Empty,

    #[error("The file has a header row but no data rows")]
    NoDataRows,

    #[error("Unsupported file type '{0}' (expected csv, xlsx, xls, ods or pdf)")]
    UnsupportedKind(String),

    #[error("Could not parse delimited text: {0}")]
    Delimited(#[from] csv::Error),

    #[error("Could not open spreadsheet: {0}")]
    Spreadsheet(String),

    #[error("The spreadsheet contains no worksheets")]
    NoSheet,

    #[error("Could not read PDF document: {0}")]
    Document(String),

    #[error("No table found in the document")]
    NoTableFound,
}

/// Column roles could not be mapped onto the raw table
#[derive(Error, Debug)]
pub enum ResolutionError {
    #[error(
        "Required {role} column missing: no column matched (available columns: {})",
        .available.join(", ")
    )]
    RequiredColumnMissing {
        role: ColumnRole,
        available: Vec<String>,
    },

    #[error(
        "Unknown column '{name}' selected for {role} (available columns: {})",
        .available.join(", ")
    )]
    UnknownColumn {
        role: ColumnRole,
        name: String,
        available: Vec<String>,
    },
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error("Table was normalized under the {table} policy but metrics were requested with {requested}")]
    PolicyMismatch {
        table: SignPolicy,
        requested: SignPolicy,
    },

    #[error("The {0} policy needs a resolved Type column")]
    PolicyUnavailable(SignPolicy),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Export error: {0}")]
    Export(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the error was caused by the uploaded input rather than by
    /// the system. Input errors are reported verbatim to the user.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::Load(_)
                | Self::Resolution(_)
                | Self::PolicyMismatch { .. }
                | Self::PolicyUnavailable(_)
        )
    }

    /// Short machine-readable error category
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Load(_) => "load",
            Self::Resolution(_) => "resolution",
            Self::PolicyMismatch { .. } | Self::PolicyUnavailable(_) => "policy",
            Self::Config(_) => "config",
            Self::Export(_) => "export",
            Self::Csv(_) | Self::Io(_) => "internal",
        }
    }
}

impl From<rust_xlsxwriter::XlsxError> for Error {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self {
        Self::Export(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
