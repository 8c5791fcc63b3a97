//! Export command implementation

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use fintrack_core::{ColumnSelection, ExportFormat, Pipeline, SignPolicy};

use super::InputFile;

pub fn cmd_export(
    pipeline: &Pipeline,
    file: &Path,
    selection: &ColumnSelection,
    policy: Option<SignPolicy>,
    csv_out: Option<&Path>,
    report_out: Option<&Path>,
) -> Result<()> {
    let targets: Vec<(ExportFormat, PathBuf)> = [
        (ExportFormat::Csv, csv_out),
        (ExportFormat::Report, report_out),
    ]
    .into_iter()
    .filter_map(|(format, path)| path.map(|p| (format, p.to_path_buf())))
    .collect();

    if targets.is_empty() {
        bail!("Nothing to export: pass --csv and/or --report with an output path");
    }

    let input = InputFile::read(file)?;

    println!("📤 Exporting {}...", file.display());
    for (format, path) in targets {
        let bytes = pipeline.export(input.upload(), selection, policy, format)?;
        std::fs::write(&path, &bytes)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        println!("   ✓ {} ({} bytes)", path.display(), bytes.len());
    }

    Ok(())
}
