//! Multipart upload form shared by the analyze and export endpoints

use axum::extract::Multipart;
use tracing::debug;

use crate::AppError;
use fintrack_core::{ColumnSelection, ExplicitColumns, RunOptions, SignPolicy};

/// A parsed upload form
///
/// Fields:
/// - file: the transaction file (required)
/// - mode: `auto` or `explicit` (optional; inferred from the column fields)
/// - date_column, amount_column, category_column, type_column,
///   description_column: column names for explicit mode
/// - top_n: size of the top-categories view
/// - policy: `type_keyed` or `sign_keyed`
#[derive(Debug)]
pub struct UploadForm {
    pub file_name: Option<String>,
    pub bytes: Vec<u8>,
    pub selection: ColumnSelection,
    pub options: RunOptions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Auto,
    Explicit,
}

async fn text_field(field: axum::extract::multipart::Field<'_>, name: &str) -> Result<String, AppError> {
    field
        .text()
        .await
        .map(|v| v.trim().to_string())
        .map_err(|_| AppError::bad_request(&format!("Failed to read {}", name)))
}

/// Read every field of the form, enforcing the file size limit
pub async fn read_upload_form(
    mut multipart: Multipart,
    max_bytes: usize,
) -> Result<UploadForm, AppError> {
    let mut file: Option<(Option<String>, Vec<u8>)> = None;
    let mut mode: Option<Mode> = None;
    let mut date = None;
    let mut amount = None;
    let mut category = None;
    let mut tx_type = None;
    let mut description = None;
    let mut options = RunOptions::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::bad_request(&format!("Failed to read form field: {}", e)))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|_| AppError::bad_request("Failed to read file data"))?;
                if bytes.len() > max_bytes {
                    return Err(AppError::payload_too_large(max_bytes));
                }
                file = Some((file_name, bytes.to_vec()));
            }
            "mode" => {
                let value = text_field(field, "mode").await?;
                mode = match value.to_lowercase().as_str() {
                    "" => None,
                    "auto" => Some(Mode::Auto),
                    "explicit" => Some(Mode::Explicit),
                    _ => {
                        return Err(AppError::bad_request(&format!(
                            "Invalid mode: {} (use 'auto' or 'explicit')",
                            value
                        )))
                    }
                };
            }
            "date_column" => date = Some(text_field(field, "date_column").await?),
            "amount_column" => amount = Some(text_field(field, "amount_column").await?),
            "category_column" => category = Some(text_field(field, "category_column").await?),
            "type_column" => tx_type = Some(text_field(field, "type_column").await?),
            "description_column" => {
                description = Some(text_field(field, "description_column").await?)
            }
            "top_n" => {
                let value = text_field(field, "top_n").await?;
                if !value.is_empty() {
                    let n: usize = value
                        .parse()
                        .ok()
                        .filter(|n| *n > 0)
                        .ok_or_else(|| {
                            AppError::bad_request(&format!("Invalid top_n: {}", value))
                        })?;
                    options.top_n = Some(n);
                }
            }
            "policy" => {
                let value = text_field(field, "policy").await?;
                if !value.is_empty() {
                    let policy: SignPolicy =
                        value.parse().map_err(|e: String| AppError::bad_request(&e))?;
                    options.policy = Some(policy);
                }
            }
            other => debug!("Ignoring unknown form field '{}'", other),
        }
    }

    let (file_name, bytes) = file.ok_or_else(|| AppError::bad_request("Missing file field"))?;

    let selection = match mode {
        Some(Mode::Auto) => ColumnSelection::Auto,
        Some(Mode::Explicit) => {
            let non_blank = |v: Option<String>| v.filter(|s| !s.is_empty());
            ColumnSelection::Explicit(ExplicitColumns {
                date: date.unwrap_or_default(),
                amount: amount.unwrap_or_default(),
                category: non_blank(category),
                tx_type: non_blank(tx_type),
                description: non_blank(description),
            })
        }
        None => ColumnSelection::from_parts(date, amount, category, tx_type, description),
    };

    Ok(UploadForm {
        file_name,
        bytes,
        selection,
        options,
    })
}
