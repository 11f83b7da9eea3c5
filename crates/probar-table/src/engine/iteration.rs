//! Row iteration shared by `for_each`, `map` and `filter`.
//!
//! Each page is processed as one batch: new rows are detected with an
//! [`ElementTracker`], optionally deduplicated by a derived key, then handed
//! to the callback sequentially or concurrently. Pages are always advanced
//! one at a time, after the batch has finished.

use futures::future::join_all;
use std::collections::HashSet;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

use super::advance_page;
use crate::element_tracker::ElementTracker;
use crate::locator::TableLocator;
use crate::result::TableResult;
use crate::smart_row::{SmartRow, SmartRowArray};
use crate::table::TableCore;

/// Options of an iteration call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IterationOptions {
    /// Dispatch a page's rows concurrently; `None` uses the operation default
    pub parallel: Option<bool>,
    /// Page budget; `None` uses the table's `max_pages`
    pub max_pages: Option<usize>,
    /// Advance pages with the bulk primitive when available
    pub use_bulk: bool,
}

impl IterationOptions {
    /// Default options
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Force sequential (`false`) or concurrent (`true`) dispatch
    #[must_use]
    pub const fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = Some(parallel);
        self
    }

    /// Override the page budget
    #[must_use]
    pub const fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = Some(max_pages);
        self
    }

    /// Prefer bulk pagination between pages
    #[must_use]
    pub const fn with_bulk_pagination(mut self, use_bulk: bool) -> Self {
        self.use_bulk = use_bulk;
        self
    }
}

/// Cooperative cancellation flag handed to every callback
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    stopped: Arc<AtomicBool>,
}

impl StopHandle {
    /// Stop after the current row (sequential) or the current page (parallel)
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    /// Whether stop was requested
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

/// What a callback receives for each row
#[derive(Debug, Clone)]
pub struct RowContext {
    /// The row
    pub row: SmartRow,
    /// Running index across all pages of this call
    pub index: usize,
    stop: StopHandle,
}

impl RowContext {
    /// End the iteration early
    pub fn stop(&self) {
        self.stop.stop();
    }
}

/// Run `callback` over every new row of every page in the budget.
///
/// Returns `(row, result)` pairs in discovery order, without rows skipped by
/// dedupe.
async fn run<T, F, Fut>(
    table: &Arc<TableCore>,
    options: &IterationOptions,
    parallel: bool,
    callback: F,
) -> TableResult<Vec<(SmartRow, T)>>
where
    F: Fn(RowContext) -> Fut,
    Fut: Future<Output = TableResult<T>>,
{
    let map = table.header_map().await?;
    let budget = options.max_pages.unwrap_or(table.config.max_pages).max(1);
    let dedupe = table.config.strategies.dedupe.clone();
    let stop = StopHandle::default();
    let mut tracker = ElementTracker::new();
    let mut keys: HashSet<String> = HashSet::new();
    let mut out = Vec::new();
    let mut row_index = 0usize;
    let mut pages_scanned = 1usize;

    loop {
        let page = table.current_page_index.load(Ordering::SeqCst);
        let rows = table.rows();
        let fresh = tracker.new_indices(&rows).await?;

        // Dedupe keys are derived sequentially so first-seen order wins.
        let mut batch = Vec::with_capacity(fresh.len());
        for (offset, index) in fresh.iter().enumerate() {
            let row = SmartRow::new(table, rows.nth(*index), Arc::clone(&map), Some(row_index + offset), Some(page));
            if let Some(derive) = &dedupe {
                let key = derive(row.clone()).await?;
                if !keys.insert(key) {
                    trace!(row_index = row_index + offset, "Duplicate row key, skipping");
                    continue;
                }
            }
            batch.push(row);
        }
        row_index += fresh.len();

        let context = |row: &SmartRow| RowContext {
            row: row.clone(),
            index: row.row_index().unwrap_or_default(),
            stop: stop.clone(),
        };
        if parallel {
            // Every dispatched callback runs to completion before an error surfaces.
            let results = join_all(batch.iter().map(|row| callback(context(row))))
                .await
                .into_iter()
                .collect::<TableResult<Vec<_>>>()?;
            out.extend(batch.into_iter().zip(results));
        } else {
            for row in batch {
                if stop.is_stopped() {
                    break;
                }
                let result = callback(context(&row)).await?;
                out.push((row, result));
            }
        }
        debug!(page, new_rows = fresh.len(), processed = out.len(), "Iterated page");

        if stop.is_stopped() {
            debug!(page, "Iteration stopped by callback");
            break;
        }
        if pages_scanned >= budget || !advance_page(table, options.use_bulk).await? {
            break;
        }
        pages_scanned += 1;
    }

    Ok(out)
}

/// Call `callback` for every row; sequential unless `parallel` is set
pub(crate) async fn for_each<F, Fut>(table: &Arc<TableCore>, options: &IterationOptions, callback: F) -> TableResult<()>
where
    F: Fn(RowContext) -> Fut,
    Fut: Future<Output = TableResult<()>>,
{
    let parallel = options.parallel.unwrap_or(false);
    let _ = run(table, options, parallel, callback).await?;
    Ok(())
}

/// Collect `callback`'s result for every row; concurrent unless disabled
pub(crate) async fn map<T, F, Fut>(table: &Arc<TableCore>, options: &IterationOptions, callback: F) -> TableResult<Vec<T>>
where
    F: Fn(RowContext) -> Fut,
    Fut: Future<Output = TableResult<T>>,
{
    let parallel = options.parallel.unwrap_or(true);
    let results = run(table, options, parallel, callback).await?;
    Ok(results.into_iter().map(|(_, value)| value).collect())
}

/// Rows for which `predicate` holds; concurrent unless disabled
pub(crate) async fn filter<F, Fut>(
    table: &Arc<TableCore>,
    options: &IterationOptions,
    predicate: F,
) -> TableResult<SmartRowArray>
where
    F: Fn(RowContext) -> Fut,
    Fut: Future<Output = TableResult<bool>>,
{
    let parallel = options.parallel.unwrap_or(true);
    let results = run(table, options, parallel, predicate).await?;
    Ok(results
        .into_iter()
        .filter_map(|(row, keep)| keep.then_some(row))
        .collect::<Vec<_>>()
        .into())
}
