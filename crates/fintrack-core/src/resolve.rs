//! Column role resolution
//!
//! Maps raw header names onto the semantic roles the pipeline needs. Two
//! modes are supported: explicit names chosen by the user, and
//! auto-detection by name patterns. Detection never fails on its own; a
//! separate validation step reports missing required roles.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ResolutionError;
use crate::models::{Cell, ColumnRef, ColumnRole, ColumnRoleMap, RawTable};

const DATE_PATTERNS: &[&str] = &["date"];
const AMOUNT_PATTERNS: &[&str] = &["amount", "debit", "credit"];
const CATEGORY_PATTERNS: &[&str] = &["desc", "category"];
const TYPE_PATTERNS: &[&str] = &["income", "expense"];
const DESCRIPTION_PATTERNS: &[&str] = &[
    "memo",
    "payee",
    "narrative",
    "details",
    "merchant",
    "particulars",
];

/// Column names picked by the user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplicitColumns {
    pub date: String,
    pub amount: String,
    pub category: Option<String>,
    #[serde(rename = "type")]
    pub tx_type: Option<String>,
    pub description: Option<String>,
}

/// How column roles should be resolved for a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ColumnSelection {
    #[default]
    Auto,
    Explicit(ExplicitColumns),
}

impl ColumnSelection {
    /// Build a selection from optional user input: explicit when a date or
    /// amount column was named, auto-detect otherwise. A half-specified
    /// selection stays explicit so the missing name is reported.
    pub fn from_parts(
        date: Option<String>,
        amount: Option<String>,
        category: Option<String>,
        tx_type: Option<String>,
        description: Option<String>,
    ) -> Self {
        let non_blank = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        let date = non_blank(date);
        let amount = non_blank(amount);
        if date.is_none() && amount.is_none() {
            return Self::Auto;
        }
        Self::Explicit(ExplicitColumns {
            date: date.unwrap_or_default(),
            amount: amount.unwrap_or_default(),
            category: non_blank(category),
            tx_type: non_blank(tx_type),
            description: non_blank(description),
        })
    }

    pub fn is_auto(&self) -> bool {
        matches!(self, Self::Auto)
    }
}

/// Result of auto-detection: every role optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DetectedRoles {
    pub date: Option<ColumnRef>,
    pub amount: Option<ColumnRef>,
    pub category: Option<ColumnRef>,
    #[serde(rename = "type")]
    pub tx_type: Option<ColumnRef>,
    pub description: Option<ColumnRef>,
}

impl DetectedRoles {
    /// Require the date and amount roles, turning a miss into an error
    /// that lists the available columns
    pub fn validate(self, headers: &[String]) -> Result<ColumnRoleMap, ResolutionError> {
        let missing = |role| ResolutionError::RequiredColumnMissing {
            role,
            available: headers.to_vec(),
        };
        let date = self.date.ok_or_else(|| missing(ColumnRole::Date))?;
        let amount = self.amount.ok_or_else(|| missing(ColumnRole::Amount))?;
        Ok(ColumnRoleMap {
            date,
            amount,
            category: self.category,
            tx_type: self.tx_type,
            description: self.description,
        })
    }
}

/// First column whose normalized name contains any of the patterns
fn find_by_pattern(normalized: &[String], headers: &[String], patterns: &[&str]) -> Option<ColumnRef> {
    normalized
        .iter()
        .position(|name| patterns.iter().any(|p| name.contains(p)))
        .map(|index| ColumnRef {
            index,
            name: headers[index].clone(),
        })
}

/// Guess column roles from header names. Names are trimmed and
/// lower-cased for matching only; the returned refs keep the original
/// name and position.
pub fn detect_roles(headers: &[String]) -> DetectedRoles {
    let normalized: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();

    let category = find_by_pattern(&normalized, headers, CATEGORY_PATTERNS);
    // Free-text lookup source only matters when there is no category column
    let description = if category.is_none() {
        find_by_pattern(&normalized, headers, DESCRIPTION_PATTERNS)
    } else {
        None
    };

    DetectedRoles {
        date: find_by_pattern(&normalized, headers, DATE_PATTERNS),
        amount: find_by_pattern(&normalized, headers, AMOUNT_PATTERNS),
        category,
        tx_type: find_by_pattern(&normalized, headers, TYPE_PATTERNS),
        description,
    }
}

/// What a column picker needs to pre-fill its selectors
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoleSuggestion {
    pub headers: Vec<String>,
    pub sample: Vec<Vec<Cell>>,
    pub detected: DetectedRoles,
    /// Whether auto-detection alone can run the pipeline
    pub complete: bool,
}

/// Headers, the first `sample_rows` rows, and the auto-detected roles
pub fn suggest_roles(raw: &RawTable, sample_rows: usize) -> RoleSuggestion {
    let detected = detect_roles(raw.headers());
    RoleSuggestion {
        headers: raw.headers().to_vec(),
        sample: raw.sample(sample_rows).to_vec(),
        complete: detected.date.is_some() && detected.amount.is_some(),
        detected,
    }
}

/// Look up a user-chosen column name: exact match first, then a trimmed
/// case-insensitive match. The first matching column wins. A blank name
/// never matches, not even an unnamed header.
fn lookup_column(
    headers: &[String],
    role: ColumnRole,
    name: &str,
) -> Result<ColumnRef, ResolutionError> {
    if name.trim().is_empty() {
        return Err(ResolutionError::RequiredColumnMissing {
            role,
            available: headers.to_vec(),
        });
    }

    let index = headers
        .iter()
        .position(|h| h == name)
        .or_else(|| {
            let wanted = name.trim().to_lowercase();
            headers.iter().position(|h| h.trim().to_lowercase() == wanted)
        })
        .ok_or_else(|| ResolutionError::UnknownColumn {
            role,
            name: name.to_string(),
            available: headers.to_vec(),
        })?;

    Ok(ColumnRef {
        index,
        name: headers[index].clone(),
    })
}

pub fn resolve_explicit(
    headers: &[String],
    columns: &ExplicitColumns,
) -> Result<ColumnRoleMap, ResolutionError> {
    let optional = |role, name: &Option<String>| {
        name.as_deref()
            .filter(|n| !n.trim().is_empty())
            .map(|n| lookup_column(headers, role, n))
            .transpose()
    };

    Ok(ColumnRoleMap {
        date: lookup_column(headers, ColumnRole::Date, &columns.date)?,
        amount: lookup_column(headers, ColumnRole::Amount, &columns.amount)?,
        category: optional(ColumnRole::Category, &columns.category)?,
        tx_type: optional(ColumnRole::Type, &columns.tx_type)?,
        description: optional(ColumnRole::Description, &columns.description)?,
    })
}

/// Resolve roles for a run in either mode
pub fn resolve(
    headers: &[String],
    selection: &ColumnSelection,
) -> Result<ColumnRoleMap, ResolutionError> {
    let roles = match selection {
        ColumnSelection::Auto => detect_roles(headers).validate(headers)?,
        ColumnSelection::Explicit(columns) => resolve_explicit(headers, columns)?,
    };

    debug!(
        "Resolved columns: date='{}' amount='{}' category={:?} type={:?} description={:?}",
        roles.date.name,
        roles.amount.name,
        roles.category.as_ref().map(|c| &c.name),
        roles.tx_type.as_ref().map(|c| &c.name),
        roles.description.as_ref().map(|c| &c.name),
    );
    Ok(roles)
}
