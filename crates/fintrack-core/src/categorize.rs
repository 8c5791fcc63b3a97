//! Keyword categorization for tables without a category column
//!
//! Lookup is exact on the trimmed, lower-cased description text. There is
//! no partial or fuzzy matching: "starbucks" matches, "starbucks #1234"
//! does not.

use std::collections::HashMap;

use serde::Serialize;

/// Category assigned when no keyword matches
pub const DEFAULT_CATEGORY: &str = "Other";

/// Keywords shipped with the binary
const BUILTIN_KEYWORDS: &[(&str, &str)] = &[
    ("salary", "Income"),
    ("payroll", "Income"),
    ("paycheck", "Income"),
    ("interest", "Income"),
    ("dividend", "Income"),
    ("refund", "Income"),
    ("rent", "Housing"),
    ("mortgage", "Housing"),
    ("electricity", "Utilities"),
    ("water", "Utilities"),
    ("gas", "Utilities"),
    ("internet", "Utilities"),
    ("phone", "Utilities"),
    ("groceries", "Groceries"),
    ("supermarket", "Groceries"),
    ("walmart", "Groceries"),
    ("costco", "Groceries"),
    ("restaurant", "Dining"),
    ("coffee", "Dining"),
    ("starbucks", "Dining"),
    ("mcdonalds", "Dining"),
    ("uber", "Transport"),
    ("lyft", "Transport"),
    ("fuel", "Transport"),
    ("parking", "Transport"),
    ("netflix", "Entertainment"),
    ("spotify", "Entertainment"),
    ("cinema", "Entertainment"),
    ("amazon", "Shopping"),
    ("pharmacy", "Healthcare"),
    ("doctor", "Healthcare"),
    ("insurance", "Insurance"),
    ("gym", "Personal"),
    ("transfer", "Transfers"),
];

/// Keyword → category lookup table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct KeywordMap {
    entries: HashMap<String, String>,
}

impl KeywordMap {
    /// Empty map: every lookup yields the default category
    pub fn new() -> Self {
        Self::default()
    }

    /// Map preloaded with the built-in keywords
    pub fn builtin() -> Self {
        let mut map = Self::new();
        map.extend(
            BUILTIN_KEYWORDS
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string())),
        );
        map
    }

    fn key(text: &str) -> String {
        text.trim().to_lowercase()
    }

    /// Add or replace a keyword. Keywords are stored lower-cased.
    pub fn insert(&mut self, keyword: impl AsRef<str>, category: impl Into<String>) {
        let key = Self::key(keyword.as_ref());
        if !key.is_empty() {
            self.entries.insert(key, category.into());
        }
    }

    /// Merge entries over the existing ones; later entries win
    pub fn extend<I, K, V>(&mut self, entries: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        for (keyword, category) in entries {
            self.insert(keyword, category);
        }
    }

    pub fn get(&self, text: &str) -> Option<&str> {
        self.entries.get(&Self::key(text)).map(String::as_str)
    }

    /// Category for a description, falling back to [`DEFAULT_CATEGORY`]
    pub fn categorize(&self, text: Option<&str>) -> String {
        text.and_then(|t| self.get(t))
            .unwrap_or(DEFAULT_CATEGORY)
            .to_string()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_case_insensitive_lookup() {
        let map = KeywordMap::builtin();
        assert_eq!(map.categorize(Some("  Netflix ")), "Entertainment");
        assert_eq!(map.categorize(Some("SALARY")), "Income");
    }

    #[test]
    fn test_no_partial_matching() {
        let map = KeywordMap::builtin();
        assert_eq!(map.categorize(Some("Netflix subscription")), DEFAULT_CATEGORY);
        assert_eq!(map.categorize(Some("")), DEFAULT_CATEGORY);
        assert_eq!(map.categorize(None), DEFAULT_CATEGORY);
    }

    #[test]
    fn test_injected_entries_override() {
        let mut map = KeywordMap::builtin();
        map.insert("Netflix", "Subscriptions");
        map.extend([("Corner Bakery", "Dining")]);
        assert_eq!(map.categorize(Some("netflix")), "Subscriptions");
        assert_eq!(map.categorize(Some("corner bakery")), "Dining");
    }

    #[test]
    fn test_empty_map() {
        let mut map = KeywordMap::new();
        assert!(map.is_empty());
        map.insert("   ", "Ignored");
        assert!(map.is_empty());
        assert_eq!(map.categorize(Some("rent")), DEFAULT_CATEGORY);
    }
}
