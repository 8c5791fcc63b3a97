//! Download artifacts for a normalized table
//!
//! Supports:
//! - Processed-data CSV (one row per kept transaction)
//! - Summary workbook with the transactions and per-category totals

use chrono::Datelike;
use rust_decimal::prelude::ToPrimitive;
use rust_xlsxwriter::{ExcelDateTime, Format, Workbook, Worksheet};

use crate::aggregate::category_totals;
use crate::error::{Error, Result};
use crate::models::{NormalizedTable, Transaction};

pub const PROCESSED_CSV_FILE_NAME: &str = "processed_transactions.csv";
pub const SUMMARY_REPORT_FILE_NAME: &str = "finance_summary.xlsx";

pub const TRANSACTIONS_SHEET: &str = "Transactions";
pub const CATEGORY_TOTALS_SHEET: &str = "Category Totals";

const CSV_HEADER: [&str; 5] = ["date", "amount", "category", "type", "description"];

/// Export format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Cleaned transactions as CSV
    Csv,
    /// Multi-sheet XLSX summary
    Report,
}

impl ExportFormat {
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::Csv => PROCESSED_CSV_FILE_NAME,
            Self::Report => SUMMARY_REPORT_FILE_NAME,
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Csv => "text/csv; charset=utf-8",
            Self::Report => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        }
    }

    /// Render the table in this format
    pub fn render(&self, table: &NormalizedTable) -> Result<Vec<u8>> {
        match self {
            Self::Csv => write_processed_csv(table),
            Self::Report => write_summary_report(table),
        }
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "report" | "xlsx" => Ok(Self::Report),
            _ => Err(format!("Unknown export format: {} (valid: csv, report)", s)),
        }
    }
}

/// Processed transactions as UTF-8 CSV, dates in ISO form
pub fn write_processed_csv(table: &NormalizedTable) -> Result<Vec<u8>> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(CSV_HEADER)?;

    for tx in table.iter() {
        wtr.write_record([
            tx.date.format("%Y-%m-%d").to_string(),
            tx.amount.to_string(),
            tx.category.clone(),
            tx.tx_type.clone().unwrap_or_default(),
            tx.description.clone().unwrap_or_default(),
        ])?;
    }

    wtr.into_inner().map_err(|e| Error::Io(e.into_error()))
}

/// Excel serial date for a transaction, or `None` when the workbook date
/// system cannot hold it (years before 1900 or after 9999)
fn excel_date(tx: &Transaction) -> Option<ExcelDateTime> {
    let year = u16::try_from(tx.date.year()).ok()?;
    ExcelDateTime::from_ymd(year, tx.date.month() as u8, tx.date.day() as u8).ok()
}

fn write_transactions_sheet(sheet: &mut Worksheet, table: &NormalizedTable) -> Result<()> {
    let bold = Format::new().set_bold();
    let date_format = Format::new().set_num_format("yyyy-mm-dd");
    let money_format = Format::new().set_num_format("#,##0.00");

    sheet.set_name(TRANSACTIONS_SHEET)?;
    for (col, title) in CSV_HEADER.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *title, &bold)?;
    }
    sheet.set_column_width(0, 12)?;
    sheet.set_column_width(2, 20)?;
    sheet.set_column_width(4, 32)?;

    for (i, tx) in table.iter().enumerate() {
        let row = (i + 1) as u32;
        match excel_date(tx) {
            Some(date) => sheet.write_datetime_with_format(row, 0, &date, &date_format)?,
            None => sheet.write_string(row, 0, tx.date.format("%Y-%m-%d").to_string())?,
        };
        sheet.write_number_with_format(
            row,
            1,
            tx.amount.to_f64().unwrap_or_default(),
            &money_format,
        )?;
        sheet.write_string(row, 2, &tx.category)?;
        if let Some(tx_type) = &tx.tx_type {
            sheet.write_string(row, 3, tx_type)?;
        }
        if let Some(description) = &tx.description {
            sheet.write_string(row, 4, description)?;
        }
    }
    Ok(())
}

fn write_category_sheet(sheet: &mut Worksheet, table: &NormalizedTable) -> Result<()> {
    let bold = Format::new().set_bold();
    let money_format = Format::new().set_num_format("#,##0.00");

    sheet.set_name(CATEGORY_TOTALS_SHEET)?;
    sheet.write_string_with_format(0, 0, "category", &bold)?;
    sheet.write_string_with_format(0, 1, "total", &bold)?;
    sheet.set_column_width(0, 20)?;

    for (i, total) in category_totals(table).iter().enumerate() {
        let row = (i + 1) as u32;
        sheet.write_string(row, 0, &total.category)?;
        sheet.write_number_with_format(
            row,
            1,
            total.total.to_f64().unwrap_or_default(),
            &money_format,
        )?;
    }
    Ok(())
}

/// Summary workbook: the full table and its category totals
pub fn write_summary_report(table: &NormalizedTable) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    write_transactions_sheet(workbook.add_worksheet(), table)?;
    write_category_sheet(workbook.add_worksheet(), table)?;
    Ok(workbook.save_to_buffer()?)
}
