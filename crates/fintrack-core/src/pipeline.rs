//! One upload, end to end
//!
//! A run is synchronous and self-contained: load → resolve → normalize
//! (with keyword categorization when needed) → aggregate → metrics. A
//! failed run returns an error and nothing else; no partial table escapes.

use serde::Serialize;
use tracing::{info, info_span};

use crate::aggregate::{Dashboard, DEFAULT_TOP_N};
use crate::categorize::KeywordMap;
use crate::config::Config;
use crate::error::Result;
use crate::export::ExportFormat;
use crate::import::{load_table, load_upload};
use crate::metrics::{compute_metrics, select_policy};
use crate::models::{ColumnRoleMap, DropReport, FileKind, MetricsRecord, NormalizedTable, RawTable, SignPolicy};
use crate::normalize::normalize;
use crate::resolve::{resolve, suggest_roles, ColumnSelection, RoleSuggestion};

/// Rows included in a column preview
pub const PREVIEW_ROWS: usize = 5;

/// An uploaded file
#[derive(Debug, Clone, Copy)]
pub struct Upload<'a> {
    /// Declared file name, used for kind detection
    pub file_name: Option<&'a str>,
    pub bytes: &'a [u8],
    /// Kind forced by the caller, skipping detection
    pub kind: Option<FileKind>,
}

impl<'a> Upload<'a> {
    pub fn new(file_name: Option<&'a str>, bytes: &'a [u8]) -> Self {
        Self {
            file_name,
            bytes,
            kind: None,
        }
    }

    pub fn with_kind(mut self, kind: FileKind) -> Self {
        self.kind = Some(kind);
        self
    }

    fn load(&self) -> Result<(FileKind, RawTable)> {
        let loaded = match self.kind {
            Some(kind) => (kind, load_table(self.bytes, kind)?),
            None => load_upload(self.file_name, self.bytes)?,
        };
        Ok(loaded)
    }
}

/// Per-run knobs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Size of the top-categories view; the configured value when unset
    pub top_n: Option<usize>,
    /// Forced sign policy; chosen from the resolved roles when unset
    pub policy: Option<SignPolicy>,
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub keywords: KeywordMap,
    pub top_n: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            keywords: KeywordMap::builtin(),
            top_n: DEFAULT_TOP_N,
        }
    }
}

impl From<&Config> for PipelineConfig {
    fn from(config: &Config) -> Self {
        Self {
            keywords: config.keywords.clone(),
            top_n: config.pipeline.top_n,
        }
    }
}

/// Counts describing what happened to the rows of one upload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub rows_loaded: usize,
    pub rows_kept: usize,
    pub drops: DropReport,
    /// Whether categories came from the keyword table
    pub keyword_categorized: bool,
}

/// Everything a presentation layer needs for one upload
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutput {
    pub file_kind: FileKind,
    pub roles: ColumnRoleMap,
    pub policy: SignPolicy,
    pub metrics: MetricsRecord,
    pub panels: Dashboard,
    pub table: NormalizedTable,
    pub report: RunReport,
}

/// Column picker data for an upload
#[derive(Debug, Clone, Serialize)]
pub struct ColumnPreview {
    pub file_kind: FileKind,
    #[serde(flatten)]
    pub suggestion: RoleSuggestion,
}

#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Load an upload and suggest column roles without normalizing
    pub fn preview(&self, upload: Upload<'_>) -> Result<ColumnPreview> {
        let (file_kind, raw) = upload.load()?;
        Ok(ColumnPreview {
            file_kind,
            suggestion: suggest_roles(&raw, PREVIEW_ROWS),
        })
    }

    /// Load, resolve and normalize, stopping before any aggregation
    pub fn normalize(
        &self,
        upload: Upload<'_>,
        selection: &ColumnSelection,
        policy: Option<SignPolicy>,
    ) -> Result<(FileKind, ColumnRoleMap, RawTable, NormalizedTable)> {
        let (file_kind, raw) = upload.load()?;
        let roles = resolve(raw.headers(), selection)?;
        let policy = select_policy(roles.tx_type.is_some(), policy)?;
        let table = normalize(&raw, &roles, policy, &self.config.keywords);
        Ok((file_kind, roles, raw, table))
    }

    /// Run the whole pipeline for one upload
    pub fn run(
        &self,
        upload: Upload<'_>,
        selection: &ColumnSelection,
        options: &RunOptions,
    ) -> Result<PipelineOutput> {
        let span = info_span!("pipeline_run", file = upload.file_name.unwrap_or("-"));
        let _guard = span.enter();

        let (file_kind, roles, raw, table) = self.normalize(upload, selection, options.policy)?;
        let policy = table.policy;
        info!(
            "Loaded {} rows from {} upload ({} mode)",
            raw.len(),
            file_kind,
            if selection.is_auto() { "auto" } else { "explicit" }
        );

        let top_n = options.top_n.unwrap_or(self.config.top_n);
        let metrics = compute_metrics(&table, policy)?;
        let panels = Dashboard::build(&table, top_n);

        let report = RunReport {
            rows_loaded: raw.len(),
            rows_kept: table.len(),
            drops: table.drops,
            keyword_categorized: roles.category.is_none(),
        };
        info!(
            "Kept {} of {} rows ({} dropped) under {} policy",
            report.rows_kept,
            report.rows_loaded,
            report.drops.total(),
            policy
        );

        Ok(PipelineOutput {
            file_kind,
            roles,
            policy,
            metrics,
            panels,
            table,
            report,
        })
    }

    /// Normalize an upload and render it as a download artifact
    pub fn export(
        &self,
        upload: Upload<'_>,
        selection: &ColumnSelection,
        policy: Option<SignPolicy>,
        format: ExportFormat,
    ) -> Result<Vec<u8>> {
        let (_, _, _, table) = self.normalize(upload, selection, policy)?;
        let bytes = format.render(&table)?;
        info!(
            "Exported {} rows as {} ({} bytes)",
            table.len(),
            format.file_name(),
            bytes.len()
        );
        Ok(bytes)
    }
}
