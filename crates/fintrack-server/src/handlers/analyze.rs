//! Column preview and analysis handlers

use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::Serialize;
use tracing::info;

use super::upload::read_upload_form;
use crate::{AppError, AppState};
use fintrack_core::{
    aggregate::Dashboard, ColumnPreview, ColumnRoleMap, FileKind, MetricsRecord, RunReport,
    SignPolicy, Transaction, Upload,
};

/// Run pipeline work on the blocking pool, mapping upload problems to 400
pub(crate) async fn run_blocking<T, F>(work: F) -> Result<T, AppError>
where
    F: FnOnce() -> fintrack_core::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await?
        .map_err(AppError::from_pipeline)
}

/// Analysis result for one upload
#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub file_kind: FileKind,
    pub roles: ColumnRoleMap,
    pub policy: SignPolicy,
    pub metrics: MetricsRecord,
    pub panels: Dashboard,
    pub transactions: Vec<Transaction>,
    pub report: RunReport,
}

/// POST /api/columns - Headers, sample rows and detected roles
///
/// Expects multipart form with:
/// - file: transaction file (required)
pub async fn preview_columns(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<ColumnPreview>, AppError> {
    let form = read_upload_form(multipart, state.config.max_upload_bytes).await?;
    let pipeline = state.pipeline.clone();

    let preview = run_blocking(move || {
        pipeline.preview(Upload::new(form.file_name.as_deref(), &form.bytes))
    })
    .await?;

    Ok(Json(preview))
}

/// POST /api/analyze - Run the full pipeline on an upload
///
/// Expects the multipart form described in [`super::upload::UploadForm`].
pub async fn analyze(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<AnalyzeResponse>, AppError> {
    let form = read_upload_form(multipart, state.config.max_upload_bytes).await?;
    let pipeline = state.pipeline.clone();

    let output = run_blocking(move || {
        pipeline.run(
            Upload::new(form.file_name.as_deref(), &form.bytes),
            &form.selection,
            &form.options,
        )
    })
    .await?;

    info!(
        "Analyzed {} upload: {} transactions, {} panels with data",
        output.file_kind,
        output.table.len(),
        output.panels.ready_count()
    );

    Ok(Json(AnalyzeResponse {
        file_kind: output.file_kind,
        roles: output.roles,
        policy: output.policy,
        metrics: output.metrics,
        panels: output.panels,
        report: output.report,
        transactions: output.table.transactions,
    }))
}
