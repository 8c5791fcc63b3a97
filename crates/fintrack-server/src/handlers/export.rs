//! Download handlers for the processed CSV and the summary workbook

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Multipart, State},
    http::{header, Response, StatusCode},
};
use tracing::info;

use super::analyze::run_blocking;
use super::upload::read_upload_form;
use crate::{AppError, AppState};
use fintrack_core::{ExportFormat, Upload};

async fn export_upload(
    state: Arc<AppState>,
    multipart: Multipart,
    format: ExportFormat,
) -> Result<Response<Body>, AppError> {
    let form = read_upload_form(multipart, state.config.max_upload_bytes).await?;
    let pipeline = state.pipeline.clone();

    let bytes = run_blocking(move || {
        pipeline.export(
            Upload::new(form.file_name.as_deref(), &form.bytes),
            &form.selection,
            form.options.policy,
            format,
        )
    })
    .await?;

    info!("Sending {} ({} bytes)", format.file_name(), bytes.len());

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, format.content_type())
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", format.file_name()),
        )
        .body(Body::from(bytes))
        .map_err(|e| AppError::internal(&e.to_string()))
}

/// POST /api/export/csv - Cleaned transactions as CSV
pub async fn export_csv(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Response<Body>, AppError> {
    export_upload(state, multipart, ExportFormat::Csv).await
}

/// POST /api/export/report - Summary workbook (XLSX)
pub async fn export_report(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Response<Body>, AppError> {
    export_upload(state, multipart, ExportFormat::Report).await
}
