//! Filter engine: narrow a row collection by named column criteria.
//!
//! Filters compose as a logical AND, applied in insertion order. Each filter
//! becomes one [`TableLocator::filter_by_cell`] step: "row whose cell at
//! column N satisfies C", evaluated per row by the host.

use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::engine::mapper::HeaderMap;
use crate::locator::{CellCondition, CellFilter, CellPredicate, LocatorRef, Selector, TableLocator};
use crate::result::TableResult;

/// Criterion for one column
#[derive(Clone)]
pub enum FilterValue {
    /// Cell text equals (exact) or contains (non-exact) this text
    Text(String),
    /// `cell -> locator`; the row matches when the returned locator matches
    /// at least one element
    Predicate(CellPredicate),
}

impl FilterValue {
    /// Build a predicate filter
    #[must_use]
    pub fn predicate<F>(func: F) -> Self
    where
        F: Fn(&LocatorRef) -> LocatorRef + Send + Sync + 'static,
    {
        Self::Predicate(Arc::new(func))
    }

    /// JSON form for diagnostics
    #[must_use]
    pub fn describe(&self) -> Value {
        match self {
            Self::Text(text) => Value::String(text.clone()),
            Self::Predicate(_) => Value::String("<predicate>".to_string()),
        }
    }
}

impl fmt::Debug for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

impl From<&str> for FilterValue {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<i64> for FilterValue {
    fn from(number: i64) -> Self {
        Self::Text(number.to_string())
    }
}

impl From<bool> for FilterValue {
    fn from(flag: bool) -> Self {
        Self::Text(flag.to_string())
    }
}

impl From<Value> for FilterValue {
    fn from(value: Value) -> Self {
        match value {
            Value::String(text) => Self::Text(text),
            other => Self::Text(other.to_string()),
        }
    }
}

/// Ordered set of column filters
#[derive(Debug, Clone, Default)]
pub struct Filters {
    entries: Vec<(String, FilterValue)>,
}

impl Filters {
    /// No filters (matches every row)
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a filter
    #[must_use]
    pub fn with(mut self, column: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.entries.push((column.into(), value.into()));
        self
    }

    /// Add a predicate filter
    #[must_use]
    pub fn with_predicate<F>(self, column: impl Into<String>, func: F) -> Self
    where
        F: Fn(&LocatorRef) -> LocatorRef + Send + Sync + 'static,
    {
        self.with(column, FilterValue::predicate(func))
    }

    /// Whether no filter is set
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of filters
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Filters in application order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FilterValue)> {
        self.entries.iter().map(|(column, value)| (column.as_str(), value))
    }

    /// JSON object form for error messages
    #[must_use]
    pub fn describe(&self) -> Value {
        let map: serde_json::Map<String, Value> = self
            .entries
            .iter()
            .map(|(column, value)| (column.clone(), value.describe()))
            .collect();
        Value::Object(map)
    }
}

impl<K: Into<String>, V: Into<FilterValue>> FromIterator<(K, V)> for Filters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// Narrow `rows` to those matching every filter.
///
/// Unknown column names fail with a "did you mean" error. No page is touched
/// here: the returned locator is lazy.
pub fn apply_filters(
    rows: &LocatorRef,
    filters: &Filters,
    header_map: &HeaderMap,
    cell_selector: &Selector,
    exact: bool,
) -> TableResult<LocatorRef> {
    let mut filtered = Arc::clone(rows);
    for (column, value) in filters.iter() {
        let column_index = header_map.index_of(column)?;
        let condition = match value {
            FilterValue::Text(text) => CellCondition::Text {
                text: text.clone(),
                exact,
            },
            FilterValue::Predicate(predicate) => CellCondition::Matches(Arc::clone(predicate)),
        };
        filtered = filtered.filter_by_cell(CellFilter {
            cell_selector: cell_selector.clone(),
            column_index,
            condition,
        });
    }
    Ok(filtered)
}
