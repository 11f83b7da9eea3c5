//! The smart table facade.
//!
//! [`SmartTable`] binds one root locator to a [`TableConfig`] and exposes
//! column-aware lookup, search, iteration and navigation. It owns the lazily
//! built header map and the current page index; every [`SmartRow`] it hands
//! out refers back to the same state.
//!
//! # Example
//!
//! ```no_run
//! use probar_table::prelude::*;
//!
//! # async fn demo(root: LocatorRef) -> TableResult<()> {
//! let table = SmartTable::new(root, TableConfig::new().with_max_pages(5))?;
//! let row = table
//!     .find_row(&Filters::new().with("Email", "user3@example.com"), SearchOptions::new())
//!     .await?;
//! if row.was_found() {
//!     let data = row.to_json(None).await?;
//!     println!("{data:?}");
//! }
//! # Ok(())
//! # }
//! ```

use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

use crate::config::TableConfig;
use crate::engine::mapper::{HeaderMap, TableMapper};
use crate::engine::{finder, iteration, wait_until_ready, IterationOptions, RowContext, SearchOptions};
use crate::filter::Filters;
use crate::locator::{LocatorRef, TableLocator};
use crate::result::{TableError, TableResult};
use crate::smart_row::{SmartRow, SmartRowArray};
use crate::strategies::{LoadingContext, PaginationContext, PrimitiveKind, SortContext, SortDirection};

// =============================================================================
// SHARED STATE
// =============================================================================

/// State shared between a table and its rows
#[derive(Debug)]
pub(crate) struct TableCore {
    pub(crate) root: LocatorRef,
    pub(crate) config: Arc<TableConfig>,
    pub(crate) mapper: TableMapper,
    pub(crate) current_page_index: AtomicUsize,
}

impl TableCore {
    pub(crate) fn rows(&self) -> LocatorRef {
        self.config.row_selector.resolve(&self.root)
    }

    pub(crate) fn pagination_context(&self) -> PaginationContext {
        PaginationContext::new(
            Arc::clone(&self.root),
            self.config.row_selector.clone(),
            self.current_page_index.load(Ordering::SeqCst),
            self.config.timeouts,
        )
    }

    pub(crate) fn loading_context(&self) -> LoadingContext {
        LoadingContext {
            root: Arc::clone(&self.root),
            headers: self.mapper.headers(),
            rows: self.rows(),
            row: None,
        }
    }

    pub(crate) async fn header_map(&self) -> TableResult<Arc<HeaderMap>> {
        self.mapper.get_map(None).await
    }
}

// =============================================================================
// SMART TABLE
// =============================================================================

/// A table addressed by column names
pub struct SmartTable {
    core: Arc<TableCore>,
}

impl fmt::Debug for SmartTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmartTable")
            .field("root", &self.core.root.describe())
            .field("initialized", &self.is_initialized())
            .field("current_page_index", &self.current_page_index())
            .finish()
    }
}

/// Bind `root` to `config`; shorthand for [`SmartTable::new`]
pub fn use_table(root: LocatorRef, config: TableConfig) -> TableResult<SmartTable> {
    SmartTable::new(root, config)
}

impl SmartTable {
    /// Create a table handle. Nothing is read from the page yet.
    pub fn new(root: LocatorRef, config: TableConfig) -> TableResult<Self> {
        config.validate()?;
        let config = Arc::new(config);
        let mapper = TableMapper::new(Arc::clone(&root), Arc::clone(&config));
        Ok(Self {
            core: Arc::new(TableCore {
                root,
                config,
                mapper,
                current_page_index: AtomicUsize::new(0),
            }),
        })
    }

    /// Table root locator
    #[must_use]
    pub fn root(&self) -> LocatorRef {
        Arc::clone(&self.core.root)
    }

    /// Active configuration
    #[must_use]
    pub fn config(&self) -> &TableConfig {
        &self.core.config
    }

    /// Page the table believes it is on
    #[must_use]
    pub fn current_page_index(&self) -> usize {
        self.core.current_page_index.load(Ordering::SeqCst)
    }

    // ===== HEADERS =====

    /// Map headers now (optionally with a custom budget) instead of on first use
    pub async fn init(&self, timeout: Option<Duration>) -> TableResult<Arc<HeaderMap>> {
        if self.core.config.auto_scroll {
            if let Err(err) = self.core.root.scroll_into_view_if_needed().await {
                trace!(error = %err, "Auto-scroll failed");
            }
        }
        self.core.mapper.get_map(timeout).await
    }

    /// Whether the header map is built
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.core.mapper.is_initialized()
    }

    /// Column names in column order
    pub async fn headers(&self) -> TableResult<Vec<String>> {
        Ok(self.core.header_map().await?.names().to_vec())
    }

    /// Header element of `column`
    pub async fn header_cell(&self, column: &str) -> TableResult<LocatorRef> {
        let index = self.core.header_map().await?.index_of(column)?;
        Ok(self.core.mapper.headers().nth(index))
    }

    /// Scroll the header of `column` into view
    pub async fn scroll_to_column(&self, column: &str) -> TableResult<()> {
        self.header_cell(column).await?.scroll_into_view_if_needed().await
    }

    /// Rename the column at `index`; the new map replaces the old one at once
    pub async fn set_column_name<F>(&self, index: usize, rename: F) -> TableResult<Arc<HeaderMap>>
    where
        F: FnOnce(&str) -> String,
    {
        let map = self.core.header_map().await?;
        let renamed = map.renamed(index, rename)?;
        debug!(index, name = renamed.name_at(index).unwrap_or_default(), "Column renamed");
        Ok(self.core.mapper.replace(renamed))
    }

    /// Drop the header map and scan the headers again
    pub async fn remap_headers(&self) -> TableResult<Arc<HeaderMap>> {
        self.core.mapper.remap_headers().await
    }

    // ===== ROWS =====

    /// Unique row on the current page; the not-found row when nothing matches
    pub async fn get_row(&self, filters: &Filters, exact: bool) -> TableResult<SmartRow> {
        let options = SearchOptions::new().with_exact(exact).with_max_pages(1);
        self.find_row(filters, options).await
    }

    /// Row at `index` on the current page, optionally brought into view
    pub async fn get_row_by_index(&self, index: usize, bring_into_view: bool) -> TableResult<SmartRow> {
        let map = self.core.header_map().await?;
        let rows = self.core.rows();
        if index >= rows.count().await? {
            return Ok(SmartRow::sentinel(&self.core, map));
        }
        let row = SmartRow::new(&self.core, rows.nth(index), map, Some(index), Some(self.current_page_index()));
        if bring_into_view {
            row.bring_into_view().await?;
        }
        Ok(row)
    }

    /// Unique row matching `filters` within the page budget.
    ///
    /// More than one match on a page is an ambiguity error. No match yields
    /// a row whose [`SmartRow::was_found`] is `false`.
    pub async fn find_row(&self, filters: &Filters, options: SearchOptions) -> TableResult<SmartRow> {
        match finder::find_row(&self.core, filters, &options).await? {
            Some(row) => Ok(row),
            None => Ok(SmartRow::sentinel(&self.core, self.core.header_map().await?)),
        }
    }

    /// Every row matching `filters` within the page budget
    pub async fn find_rows(&self, filters: &Filters, options: SearchOptions) -> TableResult<SmartRowArray> {
        Ok(finder::find_rows(&self.core, filters, &options).await?.into())
    }

    // ===== ITERATION =====

    /// Run `callback` for every row (sequential by default)
    pub async fn for_each<F, Fut>(&self, options: IterationOptions, callback: F) -> TableResult<()>
    where
        F: Fn(RowContext) -> Fut,
        Fut: Future<Output = TableResult<()>>,
    {
        iteration::for_each(&self.core, &options, callback).await
    }

    /// Collect a value per row (concurrent within a page by default)
    pub async fn map<T, F, Fut>(&self, options: IterationOptions, callback: F) -> TableResult<Vec<T>>
    where
        F: Fn(RowContext) -> Fut,
        Fut: Future<Output = TableResult<T>>,
    {
        iteration::map(&self.core, &options, callback).await
    }

    /// Rows for which `predicate` holds (concurrent within a page by default)
    pub async fn filter<F, Fut>(&self, options: IterationOptions, predicate: F) -> TableResult<SmartRowArray>
    where
        F: Fn(RowContext) -> Fut,
        Fut: Future<Output = TableResult<bool>>,
    {
        iteration::filter(&self.core, &options, predicate).await
    }

    /// Values of `column` for every iterated row
    pub async fn get_column_values(&self, column: &str, options: IterationOptions) -> TableResult<Vec<Value>> {
        let _ = self.core.header_map().await?.index_of(column)?;
        self.map(options, |ctx| async move {
            let mut data = ctx.row.to_json(Some(&[column])).await?;
            Ok(data.remove(column).unwrap_or(Value::Null))
        })
        .await
    }

    // ===== STATE =====

    /// Forget the header map, return to the first page and reset the page index
    pub async fn reset(&self) -> TableResult<()> {
        self.core.mapper.clear();
        let pagination = &self.core.config.strategies.pagination;
        if pagination.has(PrimitiveKind::GoToFirst) && self.current_page_index() != 0 {
            let movement = pagination
                .step(PrimitiveKind::GoToFirst, self.core.pagination_context())
                .await?;
            trace!(%movement, "Reset to first page");
        }
        self.core.current_page_index.store(0, Ordering::SeqCst);
        debug!("Table reset");
        Ok(())
    }

    /// Wait for the table to settle and map its headers again; pagination is
    /// left alone
    pub async fn revalidate(&self) -> TableResult<Arc<HeaderMap>> {
        wait_until_ready(&self.core).await?;
        self.core.mapper.remap_headers().await
    }

    /// Sorting operations
    #[must_use]
    pub const fn sorting(&self) -> TableSorting<'_> {
        TableSorting { table: self }
    }
}

// =============================================================================
// SORTING
// =============================================================================

/// Sorting operations of a [`SmartTable`]
#[derive(Debug)]
pub struct TableSorting<'a> {
    table: &'a SmartTable,
}

impl TableSorting<'_> {
    async fn context(&self, column: &str) -> TableResult<SortContext> {
        let core = &self.table.core;
        let column_index = core.header_map().await?.index_of(column)?;
        Ok(SortContext {
            root: Arc::clone(&core.root),
            header_cell: core.mapper.headers().nth(column_index),
            column: column.to_string(),
            column_index,
        })
    }

    fn strategy(&self) -> TableResult<Arc<dyn crate::strategies::SortingStrategy>> {
        self.table
            .core
            .config
            .strategies
            .sorting
            .clone()
            .ok_or_else(|| TableError::InvalidState {
                message: "No sorting strategy configured".to_string(),
            })
    }

    /// Sort by `column` in `direction`
    pub async fn apply(&self, column: &str, direction: SortDirection) -> TableResult<()> {
        let strategy = self.strategy()?;
        let ctx = self.context(column).await?;
        strategy.apply(&ctx, direction).await?;
        debug!(column, %direction, "Sorted");
        Ok(())
    }

    /// Current sort order of `column`
    pub async fn state(&self, column: &str) -> TableResult<SortDirection> {
        let strategy = self.strategy()?;
        let ctx = self.context(column).await?;
        strategy.state(&ctx).await
    }
}
