//! Row search across pages.

use serde_json::Value;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{debug, warn};

use super::{advance_page, row_is_loading, wait_until_ready};
use crate::element_tracker::ElementTracker;
use crate::filter::{apply_filters, Filters};
use crate::locator::{LocatorRef, TableLocator};
use crate::result::{TableError, TableResult};
use crate::smart_row::SmartRow;
use crate::table::TableCore;

/// Rows sampled into an ambiguity error
pub const AMBIGUITY_SAMPLE_ROWS: usize = 3;

/// Options of a row search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    /// Exact cell-text match (default) or substring match
    pub exact: bool,
    /// Page budget; `None` uses the table's `max_pages`
    pub max_pages: Option<usize>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            exact: true,
            max_pages: None,
        }
    }
}

impl SearchOptions {
    /// Default options
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set exact matching
    #[must_use]
    pub const fn with_exact(mut self, exact: bool) -> Self {
        self.exact = exact;
        self
    }

    /// Override the page budget
    #[must_use]
    pub const fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = Some(max_pages);
        self
    }

    pub(crate) fn page_budget(&self, table: &TableCore) -> usize {
        self.max_pages.unwrap_or(table.config.max_pages).max(1)
    }
}

fn matching_rows(table: &TableCore, filters: &Filters, map: &super::HeaderMap, exact: bool) -> TableResult<LocatorRef> {
    let rows = table.rows();
    if filters.is_empty() {
        return Ok(rows);
    }
    apply_filters(&rows, filters, map, &table.config.cell_selector, exact)
}

async fn ambiguity(
    table: &Arc<TableCore>,
    matched: &LocatorRef,
    map: &Arc<super::HeaderMap>,
    filters: &Filters,
    count: usize,
) -> TableError {
    let page = table.current_page_index.load(Ordering::SeqCst);
    let mut samples = Vec::new();
    for index in 0..count.min(AMBIGUITY_SAMPLE_ROWS) {
        let row = SmartRow::new(table, matched.nth(index), Arc::clone(map), Some(index), Some(page));
        match row.to_json(None).await {
            Ok(data) => samples.push(Value::Object(data)),
            Err(err) => samples.push(Value::String(format!("<unreadable: {err}>"))),
        }
    }
    let message = format!(
        "Found {count} rows matching {} on page {page}, expected exactly one. \
         Add filters or use find_rows. Sample rows: {}",
        filters.describe(),
        Value::Array(samples)
    );
    warn!(count, page, "Ambiguous row match");
    TableError::AmbiguousRow { count, page, message }
}

/// Find the single row matching `filters`, paging forward while nothing
/// matches. `Ok(None)` when the budget or the pages run out.
pub(crate) async fn find_row(
    table: &Arc<TableCore>,
    filters: &Filters,
    options: &SearchOptions,
) -> TableResult<Option<SmartRow>> {
    let map = table.header_map().await?;
    let budget = options.page_budget(table);
    let mut pages_scanned = 1;

    loop {
        wait_until_ready(table).await?;
        let matched = matching_rows(table, filters, &map, options.exact)?;
        let count = matched.count().await?;
        if count > 1 {
            return Err(ambiguity(table, &matched, &map, filters, count).await);
        }
        if count == 1 {
            debug!(page = table.current_page_index.load(Ordering::SeqCst), "Row found");
            return Ok(Some(SmartRow::new(table, matched.first(), map, Some(0), None)));
        }

        if pages_scanned >= budget || !advance_page(table, true).await? {
            return Ok(None);
        }
        pages_scanned += 1;
    }
}

/// Collect every row matching `filters` across the page budget.
///
/// Rows are tagged with the page they were found on; placeholder rows
/// flagged by the row-loading predicate are skipped.
pub(crate) async fn find_rows(
    table: &Arc<TableCore>,
    filters: &Filters,
    options: &SearchOptions,
) -> TableResult<Vec<SmartRow>> {
    let map = table.header_map().await?;
    let budget = options.page_budget(table);
    let mut tracker = ElementTracker::new();
    let mut found = Vec::new();
    let mut pages_scanned = 1;

    loop {
        wait_until_ready(table).await?;
        let page = table.current_page_index.load(Ordering::SeqCst);
        let matched = matching_rows(table, filters, &map, options.exact)?;
        let mut skipped = 0usize;
        for index in tracker.new_indices(&matched).await? {
            let row = matched.nth(index);
            if row_is_loading(table, &row).await? {
                skipped += 1;
                continue;
            }
            let row_index = found.len();
            found.push(SmartRow::new(table, row, Arc::clone(&map), Some(row_index), Some(page)));
        }
        debug!(page, total = found.len(), skipped, "Scanned page");

        if pages_scanned >= budget || !advance_page(table, true).await? {
            return Ok(found);
        }
        pages_scanned += 1;
    }
}
