//! Domain models for Fintrack

use std::path::Path;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single untyped cell of an uploaded table
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
}

impl Cell {
    /// Build a cell from text, treating whitespace-only text as empty
    pub fn from_text(s: &str) -> Self {
        if s.trim().is_empty() {
            Self::Empty
        } else {
            Self::Text(s.to_string())
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Trimmed textual form of the cell, `None` when empty
    pub fn as_text(&self) -> Option<String> {
        match self {
            Self::Empty => None,
            Self::Text(s) => {
                let s = s.trim();
                if s.is_empty() {
                    None
                } else {
                    Some(s.to_string())
                }
            }
            Self::Number(n) => Some(n.to_string()),
            Self::Bool(b) => Some(b.to_string()),
        }
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => Ok(()),
            Self::Text(s) => write!(f, "{}", s),
            Self::Number(n) => write!(f, "{}", n),
            Self::Bool(b) => write!(f, "{}", b),
        }
    }
}

/// Source format of an uploaded file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    /// CSV/TSV and other delimited text
    Delimited,
    /// xlsx, xls, xlsb or ods workbook
    Spreadsheet,
    /// PDF with an embedded table
    Document,
}

impl FileKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Delimited => "delimited",
            Self::Spreadsheet => "spreadsheet",
            Self::Document => "document",
        }
    }

    /// Map a file extension (without the dot) to a kind
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim().to_ascii_lowercase().as_str() {
            "csv" | "tsv" | "txt" => Some(Self::Delimited),
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Some(Self::Spreadsheet),
            "pdf" => Some(Self::Document),
            _ => None,
        }
    }

    /// Guess the kind from the leading bytes of the file
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        let start = bytes
            .iter()
            .position(|b| !b.is_ascii_whitespace())
            .unwrap_or(bytes.len());
        let head = &bytes[start..];

        if head.starts_with(b"%PDF") {
            return Some(Self::Document);
        }
        // ZIP container (xlsx/ods) or OLE compound file (xls)
        if head.starts_with(b"PK\x03\x04") || head.starts_with(&[0xD0, 0xCF, 0x11, 0xE0]) {
            return Some(Self::Spreadsheet);
        }
        None
    }

    /// Detect the kind from the declared file name, falling back to the
    /// file's magic bytes
    pub fn detect(file_name: Option<&str>, bytes: &[u8]) -> Option<Self> {
        file_name
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
            .or_else(|| Self::sniff(bytes))
    }
}

impl std::str::FromStr for FileKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "delimited" | "text" => Ok(Self::Delimited),
            "spreadsheet" | "excel" => Ok(Self::Spreadsheet),
            "document" | "pdf" => Ok(Self::Document),
            other => Self::from_extension(other).ok_or_else(|| format!("Unknown file kind: {}", s)),
        }
    }
}

impl std::fmt::Display for FileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Rows and columns as extracted from a source file, before any typing
///
/// Every row has exactly `headers.len()` cells. Header names are kept
/// verbatim and may repeat.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl RawTable {
    /// Build a table, padding short rows with empty cells and truncating
    /// long ones to the header width
    pub fn new(headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, Cell::Empty);
                row
            })
            .collect();
        Self { headers, rows }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn width(&self) -> usize {
        self.headers.len()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell at (row, column), if both are in range
    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.rows.get(row).and_then(|r| r.get(col))
    }

    /// First `n` rows, for previews
    pub fn sample(&self, n: usize) -> &[Vec<Cell>] {
        &self.rows[..n.min(self.rows.len())]
    }
}

/// Semantic role a source column can play
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnRole {
    Date,
    Amount,
    Category,
    Type,
    /// Free-text description used for keyword categorization
    Description,
}

impl ColumnRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Date => "date",
            Self::Amount => "amount",
            Self::Category => "category",
            Self::Type => "type",
            Self::Description => "description",
        }
    }
}

impl std::fmt::Display for ColumnRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A column in the raw table, identified by position and original name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnRef {
    pub index: usize,
    pub name: String,
}

/// Mapping from semantic role to source column
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnRoleMap {
    pub date: ColumnRef,
    pub amount: ColumnRef,
    pub category: Option<ColumnRef>,
    #[serde(rename = "type")]
    pub tx_type: Option<ColumnRef>,
    pub description: Option<ColumnRef>,
}

/// Direction of a transaction as read from its Type field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TxKind {
    Income,
    Expense,
    Unknown,
}

/// One row of the normalized table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    pub date: NaiveDate,
    pub amount: Decimal,
    pub category: String,
    /// Lower-cased Type cell, unvalidated
    #[serde(rename = "type")]
    pub tx_type: Option<String>,
    pub description: Option<String>,
}

impl Transaction {
    pub fn kind(&self) -> TxKind {
        match self.tx_type.as_deref().map(str::trim) {
            Some(t) if t.eq_ignore_ascii_case("income") => TxKind::Income,
            Some(t) if t.eq_ignore_ascii_case("expense") => TxKind::Expense,
            _ => TxKind::Unknown,
        }
    }
}

/// Rows excluded during coercion, by cause
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DropReport {
    /// Rows whose date did not parse
    pub bad_date: usize,
    /// Rows whose date parsed but whose amount did not
    pub bad_amount: usize,
}

impl DropReport {
    pub fn total(&self) -> usize {
        self.bad_date + self.bad_amount
    }
}

/// Rule for deriving income/expense direction from a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignPolicy {
    /// Direction comes from the Type column; amounts are magnitudes
    TypeKeyed,
    /// Direction comes from the sign of the amount
    SignKeyed,
}

impl SignPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TypeKeyed => "type_keyed",
            Self::SignKeyed => "sign_keyed",
        }
    }

    /// Policy implied by the resolved roles: a Type column selects
    /// `TypeKeyed`, otherwise amounts carry their own sign
    pub fn for_roles(roles: &ColumnRoleMap) -> Self {
        if roles.tx_type.is_some() {
            Self::TypeKeyed
        } else {
            Self::SignKeyed
        }
    }
}

impl std::str::FromStr for SignPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "type_keyed" | "type" => Ok(Self::TypeKeyed),
            "sign_keyed" | "sign" => Ok(Self::SignKeyed),
            _ => Err(format!(
                "Unknown sign policy: {} (valid: type-keyed, sign-keyed)",
                s
            )),
        }
    }
}

impl std::fmt::Display for SignPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Validated, typed transactions produced by one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedTable {
    pub transactions: Vec<Transaction>,
    pub policy: SignPolicy,
    pub has_type_column: bool,
    pub drops: DropReport,
}

impl NormalizedTable {
    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Transaction> {
        self.transactions.iter()
    }

    /// Sum of every amount in the table
    pub fn total_amount(&self) -> Decimal {
        self.transactions.iter().map(|t| t.amount).sum()
    }

    /// Copy of the table with rows in chronological order. The sort is
    /// stable, so same-day rows keep their source order.
    pub fn sorted_by_date(&self) -> Self {
        let mut sorted = self.clone();
        sorted.transactions.sort_by_key(|t| t.date);
        sorted
    }
}

/// Headline figures for one upload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsRecord {
    pub total_income: Decimal,
    /// Non-negative magnitude
    pub total_expenses: Decimal,
    pub net_savings: Decimal,
    /// Net savings as a percentage of income; `None` without income
    pub savings_rate: Option<Decimal>,
    pub policy: SignPolicy,
}

/// Summed amount for one category
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryTotal {
    pub category: String,
    pub total: Decimal,
}

/// Summed amount for one calendar period
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeriodTotal {
    /// `YYYY-MM` for months, `YYYY-MM-DD` for days
    pub period: String,
    /// First day of the period
    pub start: NaiveDate,
    pub total: Decimal,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IncomeExpenseTotals {
    pub income: Decimal,
    pub expense: Decimal,
}

impl IncomeExpenseTotals {
    pub fn is_empty(&self) -> bool {
        self.income.is_zero() && self.expense.is_zero()
    }
}

/// Running balance after one transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CumulativePoint {
    pub date: NaiveDate,
    pub amount: Decimal,
    pub balance: Decimal,
}

/// A presentation panel: either data to draw, or an explicit "no data"
/// marker when the underlying view is empty
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum Panel<T> {
    Ready(T),
    NoData,
}

impl<T> Panel<T> {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            Self::Ready(data) => Some(data),
            Self::NoData => None,
        }
    }
}

impl<T> Panel<Vec<T>> {
    /// Wrap a list view, substituting `NoData` when it is empty
    pub fn from_vec(items: Vec<T>) -> Self {
        if items.is_empty() {
            Self::NoData
        } else {
            Self::Ready(items)
        }
    }
}
