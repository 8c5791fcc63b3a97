//! File loading: delimited text, spreadsheets and PDF-embedded tables
//!
//! Every loader produces a [`RawTable`] whose first source row is the header.
//! Cells stay untyped here; coercion happens in [`crate::normalize`].

use std::io::Cursor;
use std::sync::OnceLock;

use calamine::{open_workbook_auto_from_rs, Data, DataType, Reader};
use chrono::Timelike;
use csv::ReaderBuilder;
use regex::Regex;
use tracing::debug;

use crate::error::LoadError;
use crate::models::{Cell, FileKind, RawTable};
use crate::pdf_layout::LayoutText;

/// Delimiters tried when sniffing delimited text, in preference order
const CANDIDATE_DELIMITERS: [u8; 4] = [b',', b';', b'\t', b'|'];

/// Minimum number of aligned lines that count as a table in a PDF page
const MIN_TABLE_ROWS: usize = 2;

/// Load an upload, detecting its kind from the file name or content
pub fn load_upload(
    file_name: Option<&str>,
    bytes: &[u8],
) -> std::result::Result<(FileKind, RawTable), LoadError> {
    let kind = FileKind::detect(file_name, bytes).ok_or_else(|| {
        let ext = file_name
            .and_then(|n| std::path::Path::new(n).extension())
            .and_then(|e| e.to_str())
            .unwrap_or("unknown");
        LoadError::UnsupportedKind(ext.to_string())
    })?;
    let table = load_table(bytes, kind)?;
    Ok((kind, table))
}

/// Parse raw bytes of a known kind into a raw table
pub fn load_table(bytes: &[u8], kind: FileKind) -> std::result::Result<RawTable, LoadError> {
    if bytes.iter().all(|b| b.is_ascii_whitespace()) {
        return Err(LoadError::Empty);
    }

    let table = match kind {
        FileKind::Delimited => parse_delimited(bytes)?,
        FileKind::Spreadsheet => parse_spreadsheet(bytes)?,
        FileKind::Document => parse_document(bytes)?,
    };

    if table.is_empty() {
        return Err(LoadError::NoDataRows);
    }

    debug!(
        "Loaded {} table: {} columns, {} rows",
        kind,
        table.width(),
        table.len()
    );
    Ok(table)
}

/// Pick the delimiter that occurs most often in the header line
fn sniff_delimiter(header_line: &str) -> u8 {
    let mut best = b',';
    let mut best_count = 0;
    for delim in CANDIDATE_DELIMITERS {
        let count = header_line.bytes().filter(|b| *b == delim).count();
        if count > best_count {
            best = delim;
            best_count = count;
        }
    }
    best
}

fn parse_delimited(bytes: &[u8]) -> std::result::Result<RawTable, LoadError> {
    let text = String::from_utf8_lossy(bytes);
    let text = text.trim_start_matches('\u{feff}');
    let delimiter = sniff_delimiter(text.lines().next().unwrap_or_default());

    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(text.as_bytes());

    let mut records = rdr.records();
    let headers: Vec<String> = match records.next() {
        Some(record) => record?.iter().map(|h| h.to_string()).collect(),
        None => return Err(LoadError::Empty),
    };

    let mut rows = Vec::new();
    for result in records {
        let record = result?;
        rows.push(record.iter().map(Cell::from_text).collect());
    }

    Ok(RawTable::new(headers, rows))
}

/// Convert a calamine cell, rendering dates as ISO text so the
/// normalizer sees the same thing it would in a CSV
fn spreadsheet_cell(cell: &Data) -> Cell {
    match cell {
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::String(s) => Cell::from_text(s),
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(_) | Data::DateTimeIso(_) => match cell.as_datetime() {
            Some(dt) if dt.num_seconds_from_midnight() == 0 => {
                Cell::Text(dt.format("%Y-%m-%d").to_string())
            }
            Some(dt) => Cell::Text(dt.format("%Y-%m-%d %H:%M:%S").to_string()),
            None => Cell::from_text(&cell.to_string()),
        },
        Data::DurationIso(s) => Cell::from_text(s),
    }
}

fn parse_spreadsheet(bytes: &[u8]) -> std::result::Result<RawTable, LoadError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| LoadError::Spreadsheet(e.to_string()))?;

    let first_sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or(LoadError::NoSheet)?;

    let range = workbook
        .worksheet_range(&first_sheet)
        .map_err(|e| LoadError::Spreadsheet(e.to_string()))?;

    // Leading blank rows are common above the header in exported workbooks
    let mut rows = range
        .rows()
        .map(|row| row.iter().map(spreadsheet_cell).collect::<Vec<_>>())
        .skip_while(|row| row.iter().all(Cell::is_empty));

    let headers: Vec<String> = rows
        .next()
        .ok_or(LoadError::Empty)?
        .iter()
        .map(|c| c.to_string())
        .collect();

    debug!("Reading sheet '{}' with {} columns", first_sheet, headers.len());
    Ok(RawTable::new(headers, rows.collect()))
}

fn layout_pages(bytes: &[u8]) -> std::result::Result<Vec<String>, String> {
    let mut doc = pdf_extract::Document::load_mem(bytes).map_err(|e| e.to_string())?;
    if doc.is_encrypted() {
        // Statements are often "encrypted" with an empty user password
        doc.decrypt("")
            .map_err(|_| "the document is password protected".to_string())?;
    }
    let mut output = LayoutText::default();
    pdf_extract::output_doc(&doc, &mut output).map_err(|e| e.to_string())?;
    Ok(output.into_pages())
}

/// Extract the text of every page, keeping column gaps as tabs
fn extract_pdf_pages(bytes: &[u8]) -> std::result::Result<Vec<String>, LoadError> {
    // pdf-extract panics on some malformed documents
    match std::panic::catch_unwind(|| layout_pages(bytes)) {
        Ok(Ok(pages)) => Ok(pages),
        Ok(Err(e)) => Err(LoadError::Document(e)),
        Err(_) => Err(LoadError::Document(
            "the document structure could not be parsed".to_string(),
        )),
    }
}

fn parse_document(bytes: &[u8]) -> std::result::Result<RawTable, LoadError> {
    let pages = extract_pdf_pages(bytes)?;
    debug!("Extracted {} PDF page(s)", pages.len());
    let pages: Vec<&str> = pages.iter().map(String::as_str).collect();
    table_from_pages(&pages)
}

fn cell_split_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\t+| {2,}").expect("invalid cell split regex"))
}

/// Split one line of extracted text into cells on tabs or runs of 2+ spaces
fn split_cells(line: &str) -> Vec<String> {
    cell_split_re()
        .split(line.trim())
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect()
}

/// Find the first rectangular block of text on a page: consecutive
/// non-blank lines that split into the same number (at least two) of cells
fn first_table_on_page(page: &str) -> Option<Vec<Vec<String>>> {
    let lines: Vec<Vec<String>> = page
        .lines()
        .map(split_cells)
        .filter(|cells| !cells.is_empty())
        .collect();

    let mut start = 0;
    while start < lines.len() {
        let width = lines[start].len();
        if width >= 2 {
            let end = lines[start..]
                .iter()
                .position(|cells| cells.len() != width)
                .map(|offset| start + offset)
                .unwrap_or(lines.len());
            if end - start >= MIN_TABLE_ROWS {
                return Some(lines[start..end].to_vec());
            }
            start = end;
        } else {
            start += 1;
        }
    }
    None
}

/// Concatenate the first table of every page. The first extracted row of
/// the whole document is the header; rows from every later page are data,
/// even when a page repeats the header.
pub(crate) fn table_from_pages(pages: &[&str]) -> std::result::Result<RawTable, LoadError> {
    let mut extracted: Vec<Vec<String>> = Vec::new();
    for (index, page) in pages.iter().enumerate() {
        if let Some(rows) = first_table_on_page(page) {
            debug!("Found table on page {} with {} rows", index + 1, rows.len());
            extracted.extend(rows);
        }
    }

    let mut rows = extracted.into_iter();
    let headers = rows.next().ok_or(LoadError::NoTableFound)?;
    let data = rows
        .map(|row| row.iter().map(|c| Cell::from_text(c)).collect())
        .collect();

    Ok(RawTable::new(headers, data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_delimited_basic() {
        let csv = "Date,Description,Amount\n2024-01-05,Coffee,-4.50\n2024-01-06,Salary,1000";
        let table = load_table(csv.as_bytes(), FileKind::Delimited).unwrap();
        assert_eq!(table.headers(), &["Date", "Description", "Amount"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.cell(0, 2), Some(&Cell::Text("-4.50".into())));
    }

    #[test]
    fn test_parse_delimited_ragged_rows() {
        let csv = "a,b,c\n1\n1,2,3,4,5\n";
        let table = load_table(csv.as_bytes(), FileKind::Delimited).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[0], vec![Cell::Text("1".into()), Cell::Empty, Cell::Empty]);
        assert_eq!(table.rows()[1].len(), 3);
    }

    #[test]
    fn test_parse_delimited_semicolon_and_bom() {
        let csv = "\u{feff}Datum;Betrag;Kategorie\n05.01.2024;-12,50;Food\n";
        let table = load_table(csv.as_bytes(), FileKind::Delimited).unwrap();
        assert_eq!(table.headers(), &["Datum", "Betrag", "Kategorie"]);
        assert_eq!(table.cell(0, 1), Some(&Cell::Text("-12,50".into())));
    }

    #[test]
    fn test_parse_delimited_duplicate_headers_kept() {
        let csv = "Amount,Amount\n1,2\n";
        let table = load_table(csv.as_bytes(), FileKind::Delimited).unwrap();
        assert_eq!(table.headers(), &["Amount", "Amount"]);
    }

    #[test]
    fn test_header_only_is_an_error() {
        let err = load_table(b"Date,Amount\n", FileKind::Delimited).unwrap_err();
        assert!(matches!(err, LoadError::NoDataRows));
    }

    #[test]
    fn test_empty_input_is_an_error() {
        let err = load_table(b"  \n", FileKind::Delimited).unwrap_err();
        assert!(matches!(err, LoadError::Empty));
    }

    #[test]
    fn test_unsupported_kind() {
        let err = load_upload(Some("notes.docx"), b"hello").unwrap_err();
        match err {
            LoadError::UnsupportedKind(ext) => assert_eq!(ext, "docx"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_corrupt_spreadsheet() {
        let err = load_table(b"PK\x03\x04 definitely not a zip", FileKind::Spreadsheet)
            .unwrap_err();
        assert!(matches!(err, LoadError::Spreadsheet(_)));
    }

    #[test]
    fn test_corrupt_document() {
        let err = load_table(b"%PDF-1.4 garbage", FileKind::Document).unwrap_err();
        assert!(matches!(err, LoadError::Document(_)));
    }

    #[test]
    fn test_split_cells() {
        assert_eq!(
            split_cells("  01/05/2024   Coffee Shop    -4.50 "),
            vec!["01/05/2024", "Coffee Shop", "-4.50"]
        );
        assert_eq!(split_cells("a\tb"), vec!["a", "b"]);
        assert!(split_cells("   ").is_empty());
    }

    #[test]
    fn test_first_table_on_page_skips_prose() {
        let page = "ACME BANK STATEMENT\n\
                    Account holder: J. Doe\n\
                    \n\
                    Date        Description      Amount\n\
                    01/05/2024  Coffee           -4.50\n\
                    \n\
                    01/06/2024  Salary           1000.00\n\
                    Page 1 of 2";
        let rows = first_table_on_page(page).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], vec!["Date", "Description", "Amount"]);
        assert_eq!(rows[2], vec!["01/06/2024", "Salary", "1000.00"]);
    }

    #[test]
    fn test_table_from_pages_header_once() {
        let page1 = "Date\tMemo\tAmount\n2024-01-01\tRent\t-900\n";
        let page2 = "Statement continued\n2024-01-15\tSalary\t2000\n2024-01-20\tFood\t-50\n";
        let table = table_from_pages(&[page1, page2]).unwrap();
        assert_eq!(table.headers(), &["Date", "Memo", "Amount"]);
        assert_eq!(table.len(), 3);
        assert_eq!(table.cell(2, 1), Some(&Cell::Text("Food".into())));
    }

    #[test]
    fn test_table_from_pages_keeps_repeated_header_as_data() {
        let page1 = "Date    Amount\n2024-01-01    -900\n";
        let page2 = "Date    Amount\n2024-02-01    -900\n";
        let table = table_from_pages(&[page1, page2]).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.cell(1, 0), Some(&Cell::Text("Date".into())));
    }

    #[test]
    fn test_table_from_pages_none_found() {
        let err = table_from_pages(&["Just a letter.\nNothing tabular here."]).unwrap_err();
        assert!(matches!(err, LoadError::NoTableFound));
    }
}
