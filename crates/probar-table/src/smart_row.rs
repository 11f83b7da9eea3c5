//! Row handles.
//!
//! A [`SmartRow`] is a lazy row locator plus what the table knew when it found
//! the row: its position in the scan and the page it was on. Cell access goes
//! through the table's header map, so columns are addressed by name.
//!
//! Rows hold only a weak reference to their table. A row that outlives its
//! table still reads cells but can no longer navigate.

use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::ops::Deref;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;
use tracing::{debug, trace};

use crate::config::{CellLocatorContext, CellReadContext, TableConfig, WriteContext};
use crate::engine::mapper::HeaderMap;
use crate::locator::{LocatorRef, Selector, TableLocator, WaitState};
use crate::pagination_path;
use crate::result::{TableError, TableResult};
use crate::strategies::{ActiveCell, FillContext, NavigationContext, NavigationFn};
use crate::table::TableCore;
use crate::wait::poll_until;

/// Serialised row: column name to value, in column order
pub type RowData = serde_json::Map<String, Value>;

/// Per-call fill options
#[derive(Debug, Clone, Default)]
pub struct FillOptions {
    /// Where the real input lives inside a column's cell
    pub input_locators: HashMap<String, Selector>,
}

impl FillOptions {
    /// No overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Redirect filling of `column` to `selector` inside its cell
    #[must_use]
    pub fn with_input_locator(mut self, column: impl Into<String>, selector: impl Into<Selector>) -> Self {
        self.input_locators.insert(column.into(), selector.into());
        self
    }
}

// =============================================================================
// SMART ROW
// =============================================================================

/// A row of a smart table
#[derive(Clone)]
pub struct SmartRow {
    row: LocatorRef,
    root: LocatorRef,
    row_index: Option<usize>,
    table_page_index: Option<usize>,
    found: bool,
    config: Arc<TableConfig>,
    map: Arc<HeaderMap>,
    table: Weak<TableCore>,
}

impl fmt::Debug for SmartRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmartRow")
            .field("row", &self.row.describe())
            .field("row_index", &self.row_index)
            .field("table_page_index", &self.table_page_index)
            .field("found", &self.found)
            .finish()
    }
}

impl SmartRow {
    pub(crate) fn new(
        table: &Arc<TableCore>,
        row: LocatorRef,
        map: Arc<HeaderMap>,
        row_index: Option<usize>,
        table_page_index: Option<usize>,
    ) -> Self {
        Self {
            row,
            root: Arc::clone(&table.root),
            row_index,
            table_page_index,
            found: true,
            config: Arc::clone(&table.config),
            map,
            table: Arc::downgrade(table),
        }
    }

    /// The "not found" row: matches no element, serialises to an empty object
    pub(crate) fn sentinel(table: &Arc<TableCore>, map: Arc<HeaderMap>) -> Self {
        let marker = format!("probar-table-missing-row-{}", uuid::Uuid::new_v4());
        let row = table.rows().filter_has_text(&marker);
        debug!(row = %row.describe(), "Row not found, returning sentinel");
        Self {
            found: false,
            ..Self::new(table, row, map, None, None)
        }
    }

    /// Whether a real row was found
    #[must_use]
    pub const fn was_found(&self) -> bool {
        self.found
    }

    /// Position in the scan that produced this row
    #[must_use]
    pub const fn row_index(&self) -> Option<usize> {
        self.row_index
    }

    /// Page the row was discovered on
    #[must_use]
    pub const fn table_page_index(&self) -> Option<usize> {
        self.table_page_index
    }

    /// Underlying row locator
    #[must_use]
    pub fn locator(&self) -> LocatorRef {
        Arc::clone(&self.row)
    }

    /// Header map the row was created with
    #[must_use]
    pub fn header_map(&self) -> &HeaderMap {
        &self.map
    }

    /// Whether the row is rendered and visible
    pub async fn is_visible(&self) -> TableResult<bool> {
        self.row.is_visible().await
    }

    /// Rendered text of the whole row
    pub async fn inner_text(&self) -> TableResult<String> {
        self.row.inner_text().await
    }

    /// Scroll the row element into view without touching pagination
    pub async fn scroll_into_view(&self) -> TableResult<()> {
        self.row.scroll_into_view_if_needed().await
    }

    /// Wait for the row to reach `state`
    pub async fn wait_for(&self, state: WaitState, timeout: Duration) -> TableResult<()> {
        self.row.wait_for(state, timeout).await
    }

    fn table(&self) -> TableResult<Arc<TableCore>> {
        self.table.upgrade().ok_or_else(|| TableError::InvalidState {
            message: "The table this row belongs to was dropped".to_string(),
        })
    }

    fn cell_at(&self, column: &str, column_index: usize) -> LocatorRef {
        match &self.config.strategies.get_cell_locator {
            Some(locate) => locate(&CellLocatorContext {
                root: Arc::clone(&self.root),
                row: Arc::clone(&self.row),
                column: column.to_string(),
                column_index,
                row_index: self.row_index,
                page_index: self.table_page_index,
            }),
            None => self.config.cell_selector.resolve(&self.row).nth(column_index),
        }
    }

    /// Cell of `column`
    pub fn get_cell(&self, column: &str) -> TableResult<LocatorRef> {
        let column_index = self.map.index_of(column)?;
        Ok(self.cell_at(column, column_index))
    }

    // ===== SERIALISATION =====

    /// Read every mapped column (or only `columns`) into a [`RowData`].
    ///
    /// Cells that are not mounted are navigated into existence first. Column
    /// overrides replace the default trimmed inner text.
    pub async fn to_json(&self, columns: Option<&[&str]>) -> TableResult<RowData> {
        let mut data = RowData::new();
        if !self.found {
            return Ok(data);
        }

        let wanted: Option<Vec<usize>> = match columns {
            Some(names) => Some(
                names
                    .iter()
                    .map(|name| self.map.index_of(name))
                    .collect::<TableResult<_>>()?,
            ),
            None => None,
        };

        for (column, column_index) in self.map.iter() {
            if wanted.as_ref().is_some_and(|w| !w.contains(&column_index)) {
                continue;
            }
            let value = self.read_cell(column, column_index).await?;
            data.insert(column.to_string(), value);
        }
        Ok(data)
    }

    async fn read_cell(&self, column: &str, column_index: usize) -> TableResult<Value> {
        let mut cell = self.cell_at(column, column_index);
        if cell.count().await? == 0 {
            trace!(column, "Cell not mounted, navigating");
            if let Some(navigated) = self.navigate_to_cell(column_index).await? {
                cell = navigated;
            }
        }

        if let Some(hook) = &self.config.strategies.before_cell_read {
            hook(CellReadContext {
                cell: Arc::clone(&cell),
                row: Arc::clone(&self.row),
                column: column.to_string(),
                column_index,
                row_index: self.row_index,
            })
            .await?;
        }

        if let Some(read) = self
            .config
            .column_overrides
            .get(column)
            .and_then(|column_override| column_override.read.as_ref())
        {
            return read(cell).await;
        }

        if cell.count().await? == 0 {
            return Ok(Value::String(String::new()));
        }
        Ok(Value::String(cell.inner_text().await?.trim().to_string()))
    }

    // ===== FILL =====

    /// Write `data` into the row, column by column.
    ///
    /// `null` values are skipped. Columns with a write override use it (with
    /// the current value when a read override exists); everything else goes
    /// through the table's fill strategy.
    pub async fn smart_fill(&self, data: &RowData, options: &FillOptions) -> TableResult<()> {
        for (column, value) in data {
            if value.is_null() {
                continue;
            }
            let column_index = self.map.index_of(column)?;
            let mut cell = self.cell_at(column, column_index);
            if let Some(navigated) = self.navigate_to_cell(column_index).await? {
                cell = navigated;
            }

            let column_override = self.config.column_overrides.get(column.as_str());
            if let Some(write) = column_override.and_then(|o| o.write.as_ref()) {
                let current_value = match column_override.and_then(|o| o.read.as_ref()) {
                    Some(read) => Some(read(Arc::clone(&cell)).await?),
                    None => None,
                };
                write(WriteContext {
                    cell,
                    target_value: value.clone(),
                    current_value,
                    row: Arc::clone(&self.row),
                })
                .await?;
                continue;
            }

            let ctx = FillContext {
                cell,
                row: Arc::clone(&self.row),
                column: column.clone(),
                column_index,
                value: value.clone(),
                input_selector: options.input_locators.get(column.as_str()).cloned(),
            };
            self.config.strategies.fill.fill(&ctx).await?;
            trace!(column = column.as_str(), "Filled cell");
        }
        Ok(())
    }

    // ===== CELL NAVIGATION =====

    async fn active_cell(&self) -> TableResult<Option<ActiveCell>> {
        match &self.config.strategies.get_active_cell {
            Some(probe) => {
                probe(NavigationContext {
                    root: Arc::clone(&self.root),
                })
                .await
            }
            None => Ok(None),
        }
    }

    async fn press(&self, func: Option<&NavigationFn>, name: &str, times: usize) -> TableResult<()> {
        if times == 0 {
            return Ok(());
        }
        let func = func.ok_or_else(|| TableError::Navigation {
            message: format!("Cell navigation needs a {name} primitive, none is configured"),
        })?;
        for _ in 0..times {
            func(NavigationContext {
                root: Arc::clone(&self.root),
            })
            .await?;
        }
        Ok(())
    }

    /// Move grid focus to this row's cell at `column_index`.
    ///
    /// Returns the focused cell's locator once the active-cell probe reports
    /// the target, the last reported active cell when it never converges, or
    /// `None` when there is no probe or no known starting position.
    pub async fn navigate_to_cell(&self, column_index: usize) -> TableResult<Option<LocatorRef>> {
        let Some(row_index) = self.row_index else {
            return Ok(None);
        };
        let target = (row_index, column_index);

        let active = self.active_cell().await?;
        if let Some(cell) = &active {
            if (cell.row_index, cell.column_index) == target {
                trace!(row_index, column_index, "Active cell already on target");
                return Ok(Some(Arc::clone(&cell.locator)));
            }
        }

        let navigation = &self.config.strategies.navigation;
        if navigation.is_empty() {
            return Ok(None);
        }

        let (from_row, from_column) = match &active {
            Some(cell) => (cell.row_index, cell.column_index),
            None if navigation.go_home.is_some() => {
                self.press(navigation.go_home.as_ref(), "go_home", 1).await?;
                (0, 0)
            }
            None => return Ok(None),
        };

        if row_index > from_row {
            self.press(navigation.go_down.as_ref(), "go_down", row_index - from_row).await?;
        } else {
            self.press(navigation.go_up.as_ref(), "go_up", from_row - row_index).await?;
        }
        if column_index > from_column {
            self.press(navigation.go_right.as_ref(), "go_right", column_index - from_column)
                .await?;
        } else {
            self.press(navigation.go_left.as_ref(), "go_left", from_column - column_index)
                .await?;
        }
        debug!(from = ?(from_row, from_column), to = ?target, "Navigated to cell");

        if self.config.strategies.get_active_cell.is_none() {
            return Ok(None);
        }

        let last: Mutex<Option<ActiveCell>> = Mutex::new(None);
        let last_seen = &last;
        let this = self;
        let converged = poll_until(self.config.timeouts.active_cell(), move || async move {
            let cell = this.active_cell().await?;
            let hit = cell
                .as_ref()
                .is_some_and(|c| (c.row_index, c.column_index) == target);
            if cell.is_some() {
                *last_seen.lock().unwrap_or_else(PoisonError::into_inner) = cell;
            }
            Ok(hit)
        })
        .await?;
        if !converged {
            trace!(row_index, column_index, "Active cell did not converge, using last known");
        }
        let last = last.into_inner().unwrap_or_else(PoisonError::into_inner);
        Ok(last.map(|cell| cell.locator))
    }

    // ===== PAGINATION =====

    /// Navigate the table back to the page this row was found on, then
    /// scroll the row into view.
    pub async fn bring_into_view(&self) -> TableResult<()> {
        let Some(row_index) = self.row_index else {
            return Err(TableError::Navigation {
                message: "bring_into_view needs a row index; get the row from find_rows, \
                          iteration or get_row_by_index"
                    .to_string(),
            });
        };

        if let Some(page) = self.table_page_index {
            let table = self.table()?;
            let current = table.current_page_index.load(Ordering::SeqCst);
            if page != current {
                debug!(row_index, from = current, to = page, "Bringing row into view");
                pagination_path::navigate_to_page(
                    page,
                    &self.config.strategies.pagination,
                    &table.pagination_context(),
                    &table.current_page_index,
                )
                .await?;
            }
        }

        self.row.scroll_into_view_if_needed().await
    }
}

// =============================================================================
// SMART ROW ARRAY
// =============================================================================

/// Rows returned by `filter`, serialisable as a whole
#[derive(Debug, Clone, Default)]
pub struct SmartRowArray {
    rows: Vec<SmartRow>,
}

impl SmartRowArray {
    /// Wrap rows
    #[must_use]
    pub const fn new(rows: Vec<SmartRow>) -> Self {
        Self { rows }
    }

    /// Serialise every row, in order
    pub async fn to_json(&self, columns: Option<&[&str]>) -> TableResult<Vec<RowData>> {
        let mut out = Vec::with_capacity(self.rows.len());
        for row in &self.rows {
            out.push(row.to_json(columns).await?);
        }
        Ok(out)
    }

    /// Unwrap into the plain vector
    #[must_use]
    pub fn into_vec(self) -> Vec<SmartRow> {
        self.rows
    }
}

impl Deref for SmartRowArray {
    type Target = [SmartRow];

    fn deref(&self) -> &Self::Target {
        &self.rows
    }
}

impl From<Vec<SmartRow>> for SmartRowArray {
    fn from(rows: Vec<SmartRow>) -> Self {
        Self::new(rows)
    }
}

impl IntoIterator for SmartRowArray {
    type Item = SmartRow;
    type IntoIter = std::vec::IntoIter<SmartRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

impl<'a> IntoIterator for &'a SmartRowArray {
    type Item = &'a SmartRow;
    type IntoIter = std::slice::Iter<'a, SmartRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
