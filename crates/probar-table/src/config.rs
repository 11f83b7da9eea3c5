//! Table configuration.
//!
//! [`TableConfig`] is the full, in-memory configuration including strategy
//! objects and hooks. [`TableSettings`] is the serialisable scalar subset that
//! can live in a YAML or JSON file next to the tests.

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::locator::{LocatorRef, Selector};
use crate::result::{TableError, TableResult};
use crate::smart_row::SmartRow;
use crate::strategies::{fill, header, FillStrategy, HeaderStrategy, LoadingStrategies};
use crate::strategies::{ActiveCellFn, NavigationPrimitives, PaginationPrimitives, SortingStrategy};
use crate::wait::PollOptions;

/// Default row selector
pub const DEFAULT_ROW_SELECTOR: &str = "tbody tr";

/// Default header selector
pub const DEFAULT_HEADER_SELECTOR: &str = "thead th";

/// Default cell selector
pub const DEFAULT_CELL_SELECTOR: &str = "td";

/// Default page budget for searches and iteration
pub const DEFAULT_MAX_PAGES: usize = 1;

// =============================================================================
// HOOK TYPES
// =============================================================================

/// Rewrites a header text: `(text, index, names so far) -> name`
pub type HeaderTransformer = Arc<dyn Fn(&str, usize, &[String]) -> String + Send + Sync>;

/// Reads a column's value from its cell
pub type ReadFn = Arc<dyn Fn(LocatorRef) -> BoxFuture<'static, TableResult<Value>> + Send + Sync>;

/// Writes a column's value into its cell
pub type WriteFn = Arc<dyn Fn(WriteContext) -> BoxFuture<'static, TableResult<()>> + Send + Sync>;

/// Argument of a [`WriteFn`]
#[derive(Debug, Clone)]
pub struct WriteContext {
    /// Target cell
    pub cell: LocatorRef,
    /// Value to write
    pub target_value: Value,
    /// Value read before writing (when the column also has a read override)
    pub current_value: Option<Value>,
    /// Owning row
    pub row: LocatorRef,
}

/// Per-column read/write override
#[derive(Clone, Default)]
pub struct ColumnOverride {
    /// Replaces trimmed-inner-text extraction
    pub read: Option<ReadFn>,
    /// Replaces the fill strategy
    pub write: Option<WriteFn>,
}

impl fmt::Debug for ColumnOverride {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnOverride")
            .field("read", &self.read.is_some())
            .field("write", &self.write.is_some())
            .finish()
    }
}

impl ColumnOverride {
    /// Empty override
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the read function
    #[must_use]
    pub fn with_read<F, Fut>(mut self, func: F) -> Self
    where
        F: Fn(LocatorRef) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = TableResult<Value>> + Send + 'static,
    {
        self.read = Some(Arc::new(move |cell| Box::pin(func(cell))));
        self
    }

    /// Set the write function
    #[must_use]
    pub fn with_write<F, Fut>(mut self, func: F) -> Self
    where
        F: Fn(WriteContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = TableResult<()>> + Send + 'static,
    {
        self.write = Some(Arc::new(move |ctx| Box::pin(func(ctx))));
        self
    }
}

/// Argument of a [`CellLocatorFn`]
#[derive(Debug, Clone)]
pub struct CellLocatorContext {
    /// Table root
    pub root: LocatorRef,
    /// Row element
    pub row: LocatorRef,
    /// Column name
    pub column: String,
    /// Column index
    pub column_index: usize,
    /// Row index within the scan, when known
    pub row_index: Option<usize>,
    /// Page the row was found on, when known
    pub page_index: Option<usize>,
}

/// Custom cell lookup replacing `cell_selector.nth(index)` inside the row
pub type CellLocatorFn = Arc<dyn Fn(&CellLocatorContext) -> LocatorRef + Send + Sync>;

/// Argument of a [`BeforeCellReadFn`]
#[derive(Debug, Clone)]
pub struct CellReadContext {
    /// Cell about to be read
    pub cell: LocatorRef,
    /// Owning row
    pub row: LocatorRef,
    /// Column name
    pub column: String,
    /// Column index
    pub column_index: usize,
    /// Row index within the scan, when known
    pub row_index: Option<usize>,
}

/// Hook run before every cell read
pub type BeforeCellReadFn =
    Arc<dyn Fn(CellReadContext) -> BoxFuture<'static, TableResult<()>> + Send + Sync>;

/// Derives a logical key for a row; iteration skips rows whose key was seen
pub type DedupeFn = Arc<dyn Fn(SmartRow) -> BoxFuture<'static, TableResult<String>> + Send + Sync>;

// =============================================================================
// STRATEGIES
// =============================================================================

/// Strategy bundle of a table
#[derive(Clone)]
pub struct Strategies {
    /// Header extraction (default: visible header texts)
    pub header: Arc<dyn HeaderStrategy>,
    /// Pagination primitives (default: none, single page)
    pub pagination: PaginationPrimitives,
    /// Loading predicates
    pub loading: LoadingStrategies,
    /// Cell fill (default: auto-detect control kind)
    pub fill: Arc<dyn FillStrategy>,
    /// Custom cell lookup
    pub get_cell_locator: Option<CellLocatorFn>,
    /// Focused-cell introspection for virtualised grids
    pub get_active_cell: Option<ActiveCellFn>,
    /// Directional navigation for virtualised grids
    pub navigation: NavigationPrimitives,
    /// Hook before each cell read
    pub before_cell_read: Option<BeforeCellReadFn>,
    /// Logical row key for iteration dedupe
    pub dedupe: Option<DedupeFn>,
    /// Sorting
    pub sorting: Option<Arc<dyn SortingStrategy>>,
}

impl Default for Strategies {
    fn default() -> Self {
        Self {
            header: header::visible(),
            pagination: PaginationPrimitives::default(),
            loading: LoadingStrategies::default(),
            fill: fill::auto(),
            get_cell_locator: None,
            get_active_cell: None,
            navigation: NavigationPrimitives::default(),
            before_cell_read: None,
            dedupe: None,
            sorting: None,
        }
    }
}

impl fmt::Debug for Strategies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Strategies")
            .field("header", &self.header)
            .field("pagination", &self.pagination)
            .field("loading", &self.loading)
            .field("fill", &self.fill)
            .field("get_cell_locator", &self.get_cell_locator.is_some())
            .field("get_active_cell", &self.get_active_cell.is_some())
            .field("navigation", &self.navigation)
            .field("before_cell_read", &self.before_cell_read.is_some())
            .field("dedupe", &self.dedupe.is_some())
            .field("sorting", &self.sorting)
            .finish()
    }
}

// =============================================================================
// TIMEOUTS
// =============================================================================

/// Deadlines and poll intervals for every bounded wait, in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableTimeouts {
    /// Header stabilization budget
    pub header_ms: u64,
    /// Best-effort "header visible" probe
    pub header_visible_probe_ms: u64,
    /// Sleep between header attempts
    pub header_retry_ms: u64,
    /// Budget for "table is loading" waits
    pub table_loading_ms: u64,
    /// Poll interval for "table is loading" waits
    pub table_loading_poll_ms: u64,
    /// Budget for stabilization strategies
    pub stabilization_ms: u64,
    /// Poll interval for stabilization strategies
    pub stabilization_poll_ms: u64,
    /// Budget for active-cell convergence after navigation
    pub active_cell_ms: u64,
    /// Poll interval for active-cell convergence
    pub active_cell_poll_ms: u64,
}

impl Default for TableTimeouts {
    fn default() -> Self {
        Self {
            header_ms: 3000,
            header_visible_probe_ms: 200,
            header_retry_ms: 100,
            table_loading_ms: 10_000,
            table_loading_poll_ms: 200,
            stabilization_ms: 3000,
            stabilization_poll_ms: 100,
            active_cell_ms: 50,
            active_cell_poll_ms: 10,
        }
    }
}

impl TableTimeouts {
    /// Defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the header stabilization budget
    #[must_use]
    pub const fn with_header(mut self, timeout_ms: u64) -> Self {
        self.header_ms = timeout_ms;
        self
    }

    /// Set the table-loading budget and poll interval
    #[must_use]
    pub const fn with_table_loading(mut self, timeout_ms: u64, poll_ms: u64) -> Self {
        self.table_loading_ms = timeout_ms;
        self.table_loading_poll_ms = poll_ms;
        self
    }

    /// Set the stabilization budget and poll interval
    #[must_use]
    pub const fn with_stabilization(mut self, timeout_ms: u64, poll_ms: u64) -> Self {
        self.stabilization_ms = timeout_ms;
        self.stabilization_poll_ms = poll_ms;
        self
    }

    /// Set the active-cell budget and poll interval
    #[must_use]
    pub const fn with_active_cell(mut self, timeout_ms: u64, poll_ms: u64) -> Self {
        self.active_cell_ms = timeout_ms;
        self.active_cell_poll_ms = poll_ms;
        self
    }

    /// Header stabilization budget as Duration
    #[must_use]
    pub const fn header(&self) -> Duration {
        Duration::from_millis(self.header_ms)
    }

    /// Header visibility probe as Duration
    #[must_use]
    pub const fn header_visible_probe(&self) -> Duration {
        Duration::from_millis(self.header_visible_probe_ms)
    }

    /// Header retry sleep as Duration
    #[must_use]
    pub const fn header_retry(&self) -> Duration {
        Duration::from_millis(self.header_retry_ms)
    }

    /// Poll options for "table is loading" waits
    #[must_use]
    pub const fn table_loading(&self) -> PollOptions {
        PollOptions::new(self.table_loading_ms, self.table_loading_poll_ms)
    }

    /// Poll options for stabilization strategies
    #[must_use]
    pub const fn stabilization(&self) -> PollOptions {
        PollOptions::new(self.stabilization_ms, self.stabilization_poll_ms)
    }

    /// Poll options for active-cell convergence
    #[must_use]
    pub const fn active_cell(&self) -> PollOptions {
        PollOptions::new(self.active_cell_ms, self.active_cell_poll_ms)
    }
}

// =============================================================================
// TABLE CONFIG
// =============================================================================

/// Full configuration of a smart table
#[derive(Clone)]
pub struct TableConfig {
    /// Rows, relative to the root
    pub row_selector: Selector,
    /// Header cells, relative to the root
    pub header_selector: Selector,
    /// Cells, relative to a row
    pub cell_selector: Selector,
    /// Page budget for searches and iteration
    pub max_pages: usize,
    /// Rewrites header texts before validation
    pub header_transformer: Option<HeaderTransformer>,
    /// Scroll the root into view on init
    pub auto_scroll: bool,
    /// Per-column read/write overrides
    pub column_overrides: HashMap<String, ColumnOverride>,
    /// Strategy bundle
    pub strategies: Strategies,
    /// Wait budgets
    pub timeouts: TableTimeouts,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            row_selector: Selector::query(DEFAULT_ROW_SELECTOR),
            header_selector: Selector::query(DEFAULT_HEADER_SELECTOR),
            cell_selector: Selector::query(DEFAULT_CELL_SELECTOR),
            max_pages: DEFAULT_MAX_PAGES,
            header_transformer: None,
            auto_scroll: true,
            column_overrides: HashMap::new(),
            strategies: Strategies::default(),
            timeouts: TableTimeouts::default(),
        }
    }
}

impl fmt::Debug for TableConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut overrides: Vec<&String> = self.column_overrides.keys().collect();
        overrides.sort();
        f.debug_struct("TableConfig")
            .field("row_selector", &self.row_selector)
            .field("header_selector", &self.header_selector)
            .field("cell_selector", &self.cell_selector)
            .field("max_pages", &self.max_pages)
            .field("header_transformer", &self.header_transformer.is_some())
            .field("auto_scroll", &self.auto_scroll)
            .field("column_overrides", &overrides)
            .field("strategies", &self.strategies)
            .field("timeouts", &self.timeouts)
            .finish()
    }
}

impl TableConfig {
    /// Defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the row selector
    #[must_use]
    pub fn with_row_selector(mut self, selector: impl Into<Selector>) -> Self {
        self.row_selector = selector.into();
        self
    }

    /// Set the header selector
    #[must_use]
    pub fn with_header_selector(mut self, selector: impl Into<Selector>) -> Self {
        self.header_selector = selector.into();
        self
    }

    /// Set the cell selector
    #[must_use]
    pub fn with_cell_selector(mut self, selector: impl Into<Selector>) -> Self {
        self.cell_selector = selector.into();
        self
    }

    /// Set the page budget
    #[must_use]
    pub const fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Set the header transformer
    #[must_use]
    pub fn with_header_transformer<F>(mut self, transformer: F) -> Self
    where
        F: Fn(&str, usize, &[String]) -> String + Send + Sync + 'static,
    {
        self.header_transformer = Some(Arc::new(transformer));
        self
    }

    /// Enable or disable scrolling the root into view on init
    #[must_use]
    pub const fn with_auto_scroll(mut self, auto_scroll: bool) -> Self {
        self.auto_scroll = auto_scroll;
        self
    }

    /// Register a column override
    #[must_use]
    pub fn with_column_override(mut self, column: impl Into<String>, column_override: ColumnOverride) -> Self {
        let _ = self.column_overrides.insert(column.into(), column_override);
        self
    }

    /// Replace the strategy bundle
    #[must_use]
    pub fn with_strategies(mut self, strategies: Strategies) -> Self {
        self.strategies = strategies;
        self
    }

    /// Set the pagination primitives
    #[must_use]
    pub fn with_pagination(mut self, pagination: PaginationPrimitives) -> Self {
        self.strategies.pagination = pagination;
        self
    }

    /// Set the loading predicates
    #[must_use]
    pub fn with_loading(mut self, loading: LoadingStrategies) -> Self {
        self.strategies.loading = loading;
        self
    }

    /// Set the header strategy
    #[must_use]
    pub fn with_header_strategy(mut self, strategy: Arc<dyn HeaderStrategy>) -> Self {
        self.strategies.header = strategy;
        self
    }

    /// Set the fill strategy
    #[must_use]
    pub fn with_fill_strategy(mut self, strategy: Arc<dyn FillStrategy>) -> Self {
        self.strategies.fill = strategy;
        self
    }

    /// Set the custom cell lookup
    #[must_use]
    pub fn with_cell_locator<F>(mut self, func: F) -> Self
    where
        F: Fn(&CellLocatorContext) -> LocatorRef + Send + Sync + 'static,
    {
        self.strategies.get_cell_locator = Some(Arc::new(func));
        self
    }

    /// Set active-cell introspection and directional navigation
    #[must_use]
    pub fn with_navigation(mut self, active_cell: Option<ActiveCellFn>, navigation: NavigationPrimitives) -> Self {
        self.strategies.get_active_cell = active_cell;
        self.strategies.navigation = navigation;
        self
    }

    /// Set the before-cell-read hook
    #[must_use]
    pub fn with_before_cell_read<F, Fut>(mut self, func: F) -> Self
    where
        F: Fn(CellReadContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = TableResult<()>> + Send + 'static,
    {
        self.strategies.before_cell_read = Some(Arc::new(move |ctx| Box::pin(func(ctx))));
        self
    }

    /// Set the dedupe key function
    #[must_use]
    pub fn with_dedupe<F, Fut>(mut self, func: F) -> Self
    where
        F: Fn(SmartRow) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = TableResult<String>> + Send + 'static,
    {
        self.strategies.dedupe = Some(Arc::new(move |row| Box::pin(func(row))));
        self
    }

    /// Set the sorting strategy
    #[must_use]
    pub fn with_sorting(mut self, strategy: Arc<dyn SortingStrategy>) -> Self {
        self.strategies.sorting = Some(strategy);
        self
    }

    /// Set the timeouts
    #[must_use]
    pub const fn with_timeouts(mut self, timeouts: TableTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Reject configurations no table can work with
    pub fn validate(&self) -> TableResult<()> {
        if self.max_pages == 0 {
            return Err(TableError::Config {
                message: "max_pages must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

// =============================================================================
// SETTINGS FILE
// =============================================================================

/// Serialisable subset of [`TableConfig`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableSettings {
    /// Row selector query
    pub row_selector: String,
    /// Header selector query
    pub header_selector: String,
    /// Cell selector query
    pub cell_selector: String,
    /// Page budget
    pub max_pages: usize,
    /// Scroll the root into view on init
    pub auto_scroll: bool,
    /// Wait budgets
    pub timeouts: TableTimeouts,
}

impl Default for TableSettings {
    fn default() -> Self {
        Self {
            row_selector: DEFAULT_ROW_SELECTOR.to_string(),
            header_selector: DEFAULT_HEADER_SELECTOR.to_string(),
            cell_selector: DEFAULT_CELL_SELECTOR.to_string(),
            max_pages: DEFAULT_MAX_PAGES,
            auto_scroll: true,
            timeouts: TableTimeouts::default(),
        }
    }
}

impl TableSettings {
    /// Parse from YAML
    pub fn from_yaml(yaml: &str) -> TableResult<Self> {
        let settings: Self = serde_yaml_ng::from_str(yaml)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Parse from JSON
    pub fn from_json(json: &str) -> TableResult<Self> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Serialize to YAML
    pub fn to_yaml(&self) -> TableResult<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }

    /// Check selectors and page budget
    pub fn validate(&self) -> TableResult<()> {
        for (name, value) in [
            ("row_selector", &self.row_selector),
            ("header_selector", &self.header_selector),
            ("cell_selector", &self.cell_selector),
        ] {
            if value.trim().is_empty() {
                return Err(TableError::Config {
                    message: format!("{name} must not be empty"),
                });
            }
        }
        if self.max_pages == 0 {
            return Err(TableError::Config {
                message: "max_pages must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Build a config with default strategies
    #[must_use]
    pub fn into_config(self) -> TableConfig {
        TableConfig::from(self)
    }
}

impl From<TableSettings> for TableConfig {
    fn from(settings: TableSettings) -> Self {
        Self {
            row_selector: Selector::Query(settings.row_selector),
            header_selector: Selector::Query(settings.header_selector),
            cell_selector: Selector::Query(settings.cell_selector),
            max_pages: settings.max_pages,
            auto_scroll: settings.auto_scroll,
            timeouts: settings.timeouts,
            ..Self::default()
        }
    }
}
