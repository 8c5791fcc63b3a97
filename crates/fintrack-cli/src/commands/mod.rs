//! CLI command implementations
//!
//! Commands are organized by what they produce:
//! - `analyze` - Column preview and the full pipeline summary
//! - `export` - Processed CSV and summary report files
//! - `serve` - Web server command

pub mod analyze;
pub mod export;
pub mod serve;

// Re-export command functions for main.rs
pub use analyze::*;
pub use export::*;
pub use serve::*;

use std::path::Path;

use anyhow::{Context, Result};

/// A transaction file read from disk
pub struct InputFile {
    pub name: Option<String>,
    pub bytes: Vec<u8>,
}

impl InputFile {
    pub fn read(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("Failed to read file: {}", path.display()))?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string);
        Ok(Self { name, bytes })
    }

    pub fn upload(&self) -> fintrack_core::Upload<'_> {
        fintrack_core::Upload::new(self.name.as_deref(), &self.bytes)
    }
}

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
