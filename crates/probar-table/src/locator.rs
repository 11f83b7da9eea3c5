//! Locator capability interface consumed by the table engine.
//!
//! The engine never talks to a browser directly. Everything it needs, from
//! counting rows to pressing arrow keys inside a canvas grid, goes through
//! [`TableLocator`], a lazy handle to a collection of elements scoped to a
//! parent. Host bindings (CDP, Playwright bridge, the in-memory [`crate::mock`]
//! page) implement the trait.
//!
//! # Design Philosophy
//!
//! - **Lazy**: a locator is a query, not a snapshot. It re-resolves on every
//!   action, so a locator taken before a page change sees the new page.
//! - **Explicit re-scoping**: "row contains cell N matching X" is a named
//!   operation ([`TableLocator::filter_by_cell`]) instead of relying on an
//!   absolutely indexed child selector being silently rebased per row.
//! - **Strict at the engine level**: uniqueness is enforced by the row finder,
//!   the locator itself happily matches many elements.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::result::{TableError, TableResult};

/// Polling interval for the default `wait_for` implementation (50ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

/// Shared handle to a host locator
pub type LocatorRef = Arc<dyn TableLocator>;

/// Function form of a selector: derive a locator from its parent
pub type SelectorFn = Arc<dyn Fn(&LocatorRef) -> LocatorRef + Send + Sync>;

/// Cell predicate: given a cell locator, return a locator that must match
/// at least one element inside that cell
pub type CellPredicate = Arc<dyn Fn(&LocatorRef) -> LocatorRef + Send + Sync>;

/// Well-known key names for [`TableLocator::press`]
pub mod keys {
    /// Arrow up
    pub const ARROW_UP: &str = "ArrowUp";
    /// Arrow down
    pub const ARROW_DOWN: &str = "ArrowDown";
    /// Arrow left
    pub const ARROW_LEFT: &str = "ArrowLeft";
    /// Arrow right
    pub const ARROW_RIGHT: &str = "ArrowRight";
    /// Jump to first cell of the grid
    pub const CONTROL_HOME: &str = "Control+Home";
}

/// How to find elements relative to a parent locator
#[derive(Clone)]
pub enum Selector {
    /// Query evaluated inside the parent (e.g. `"tbody tr"`)
    Query(String),
    /// Query evaluated against the whole page, ignoring the parent
    Page(String),
    /// Arbitrary derivation from the parent locator
    Resolver(SelectorFn),
}

impl Selector {
    /// Create a parent-scoped query selector
    #[must_use]
    pub fn query(query: impl Into<String>) -> Self {
        Self::Query(query.into())
    }

    /// Create a page-scoped query selector
    #[must_use]
    pub fn page(query: impl Into<String>) -> Self {
        Self::Page(query.into())
    }

    /// Create a selector from a derivation function
    #[must_use]
    pub fn resolver<F>(func: F) -> Self
    where
        F: Fn(&LocatorRef) -> LocatorRef + Send + Sync + 'static,
    {
        Self::Resolver(Arc::new(func))
    }

    /// Resolve this selector to a locator scoped to `parent`
    #[must_use]
    pub fn resolve(&self, parent: &LocatorRef) -> LocatorRef {
        match self {
            Self::Query(query) => parent.locator(query),
            Self::Page(query) => parent.page_root().locator(query),
            Self::Resolver(func) => func(parent),
        }
    }

    /// Human-readable form for error messages
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Query(query) => query.clone(),
            Self::Page(query) => format!("page >> {query}"),
            Self::Resolver(_) => "<resolver fn>".to_string(),
        }
    }
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Query(query) => f.debug_tuple("Query").field(query).finish(),
            Self::Page(query) => f.debug_tuple("Page").field(query).finish(),
            Self::Resolver(_) => f.write_str("Resolver(..)"),
        }
    }
}

impl From<&str> for Selector {
    fn from(query: &str) -> Self {
        Self::Query(query.to_string())
    }
}

impl From<String> for Selector {
    fn from(query: String) -> Self {
        Self::Query(query)
    }
}

/// Element states for [`TableLocator::wait_for`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WaitState {
    /// At least one element is attached
    Attached,
    /// No element is attached
    Detached,
    /// The first element is visible
    Visible,
    /// No element is visible
    Hidden,
}

impl fmt::Display for WaitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Attached => "attached",
            Self::Detached => "detached",
            Self::Visible => "visible",
            Self::Hidden => "hidden",
        };
        f.write_str(name)
    }
}

/// What a row's cell must satisfy for the row to be kept
#[derive(Clone)]
pub enum CellCondition {
    /// Cell contains text (exactly or as a case-insensitive substring)
    Text {
        /// Text to look for
        text: String,
        /// Require an exact match
        exact: bool,
    },
    /// Cell contains an element matched by the predicate's locator
    Matches(CellPredicate),
}

impl fmt::Debug for CellCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text { text, exact } => f
                .debug_struct("Text")
                .field("text", text)
                .field("exact", exact)
                .finish(),
            Self::Matches(_) => f.write_str("Matches(..)"),
        }
    }
}

/// "Row contains, at column N, a cell satisfying C."
///
/// The cell selector is a row-relative template: hosts evaluate
/// `cell_selector` inside each candidate row and pick the `column_index`-th
/// match, then test `condition` against that cell.
#[derive(Debug, Clone)]
pub struct CellFilter {
    /// Row-relative cell template
    pub cell_selector: Selector,
    /// Zero-based column index
    pub column_index: usize,
    /// Condition on the selected cell
    pub condition: CellCondition,
}

impl CellFilter {
    /// Create a text condition filter
    #[must_use]
    pub fn text(
        cell_selector: Selector,
        column_index: usize,
        text: impl Into<String>,
        exact: bool,
    ) -> Self {
        Self {
            cell_selector,
            column_index,
            condition: CellCondition::Text {
                text: text.into(),
                exact,
            },
        }
    }

    /// The cell this filter inspects, re-scoped to `row`
    #[must_use]
    pub fn cell_in(&self, row: &LocatorRef) -> LocatorRef {
        self.cell_selector.resolve(row).nth(self.column_index)
    }

    /// Evaluate the filter against a single row.
    ///
    /// Hosts without a native "has" filter can implement
    /// [`TableLocator::filter_by_cell`] on top of this.
    pub async fn matches_row(&self, row: &LocatorRef) -> TableResult<bool> {
        let cell = self.cell_in(row);
        if cell.count().await? == 0 {
            return Ok(false);
        }
        let probe = match &self.condition {
            CellCondition::Text { text, exact } => cell.get_by_text(text, *exact),
            CellCondition::Matches(predicate) => predicate(&cell),
        };
        Ok(probe.count().await? > 0)
    }
}

/// A lazy handle to zero or more elements, scoped to a parent.
///
/// Derivation methods (`locator`, `nth`, `filter_*`) are synchronous and never
/// touch the page; every `async` method resolves the chain at call time.
#[async_trait]
pub trait TableLocator: Send + Sync + fmt::Debug {
    /// Child query inside every element of this collection
    fn locator(&self, query: &str) -> LocatorRef;

    /// The document root of the page this locator lives on
    fn page_root(&self) -> LocatorRef;

    /// First element of the collection
    fn first(&self) -> LocatorRef {
        self.nth(0)
    }

    /// Element at `index` of the collection
    fn nth(&self, index: usize) -> LocatorRef;

    /// Innermost descendants whose text matches
    fn get_by_text(&self, text: &str, exact: bool) -> LocatorRef;

    /// Elements of this collection whose text contains `text`
    fn filter_has_text(&self, text: &str) -> LocatorRef;

    /// Elements of this collection (rows) whose cell satisfies `filter`
    fn filter_by_cell(&self, filter: CellFilter) -> LocatorRef;

    /// Short description for logs and error messages
    fn describe(&self) -> String;

    /// Number of matching elements
    async fn count(&self) -> TableResult<usize>;

    /// Materialize into one locator per element
    async fn all(&self) -> TableResult<Vec<LocatorRef>> {
        let count = self.count().await?;
        Ok((0..count).map(|index| self.nth(index)).collect())
    }

    /// Rendered text of the first element
    async fn inner_text(&self) -> TableResult<String>;

    /// Rendered text of every element
    async fn all_inner_texts(&self) -> TableResult<Vec<String>> {
        let mut texts = Vec::new();
        for element in self.all().await? {
            texts.push(element.inner_text().await?);
        }
        Ok(texts)
    }

    /// Raw text content of the first element
    async fn text_content(&self) -> TableResult<Option<String>>;

    /// Attribute of the first element
    async fn get_attribute(&self, name: &str) -> TableResult<Option<String>>;

    /// Current value of an input-like first element
    async fn input_value(&self) -> TableResult<String>;

    /// Lower-case tag name of the first element
    async fn tag_name(&self) -> TableResult<String>;

    /// Stable identity of the first element, if the host can provide one
    async fn element_key(&self) -> TableResult<Option<String>>;

    /// Whether the first element is visible
    async fn is_visible(&self) -> TableResult<bool>;

    /// Whether the first element is enabled
    async fn is_enabled(&self) -> TableResult<bool>;

    /// Whether the first element (checkbox/radio) is checked
    async fn is_checked(&self) -> TableResult<bool>;

    /// Click the first element
    async fn click(&self) -> TableResult<()>;

    /// Replace the value of the first element
    async fn fill(&self, value: &str) -> TableResult<()>;

    /// Select an option by value on the first element
    async fn select_option(&self, value: &str) -> TableResult<()>;

    /// Focus the first element and press a key
    async fn press(&self, key: &str) -> TableResult<()>;

    /// Scroll the first element into the viewport if it is not already
    async fn scroll_into_view_if_needed(&self) -> TableResult<()>;

    /// Dispatch a mouse-wheel gesture over the first element
    async fn wheel(&self, delta_x: f64, delta_y: f64) -> TableResult<()>;

    /// Vertical scroll offset of the first element
    async fn scroll_top(&self) -> TableResult<f64>;

    /// Write the vertical scroll offset of the first element
    async fn set_scroll_top(&self, offset: f64) -> TableResult<()>;

    /// Wait until the collection reaches `state`
    async fn wait_for(&self, state: WaitState, timeout: Duration) -> TableResult<()> {
        let start = Instant::now();
        let poll_interval = Duration::from_millis(DEFAULT_POLL_INTERVAL_MS);
        loop {
            let reached = match state {
                WaitState::Attached => self.count().await? > 0,
                WaitState::Detached => self.count().await? == 0,
                WaitState::Visible => self.count().await? > 0 && self.is_visible().await?,
                WaitState::Hidden => self.count().await? == 0 || !self.is_visible().await?,
            };
            if reached {
                return Ok(());
            }
            if start.elapsed() >= timeout {
                return Err(TableError::timeout(
                    format!("Waiting for {} to be {state}", self.describe()),
                    timeout.as_millis() as u64,
                ));
            }
            tokio::time::sleep(poll_interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{el, MockPage};

    fn sample_page() -> MockPage {
        let page = MockPage::new();
        page.mount(
            el("table").child(
                el("tbody")
                    .child(el("tr").child(el("td").text("Alice")).child(el("td").text("Admin")))
                    .child(el("tr").child(el("td").text("Bob")).child(el("td").text("User"))),
            ),
        );
        page
    }

    mod selector_tests {
        use super::*;

        #[test]
        fn test_selector_from_str_is_query() {
            let selector: Selector = "tbody tr".into();
            assert!(matches!(selector, Selector::Query(ref q) if q == "tbody tr"));
            assert_eq!(selector.describe(), "tbody tr");
        }

        #[test]
        fn test_selector_describe_variants() {
            assert_eq!(Selector::page(".pager").describe(), "page >> .pager");
            assert_eq!(
                Selector::resolver(|parent| parent.clone()).describe(),
                "<resolver fn>"
            );
        }

        #[tokio::test]
        async fn test_page_selector_ignores_parent() {
            let page = sample_page();
            let cell = page.locator("td").first();
            let rows = Selector::page("tr").resolve(&cell);
            assert_eq!(rows.count().await.unwrap(), 2);
        }

        #[tokio::test]
        async fn test_resolver_selector_derives_from_parent() {
            let page = sample_page();
            let table = page.locator("table");
            let selector = Selector::resolver(|parent| parent.locator("tr").nth(1));
            let row = selector.resolve(&table);
            assert_eq!(row.inner_text().await.unwrap(), "Bob\tUser");
        }
    }

    mod cell_filter_tests {
        use super::*;

        #[tokio::test]
        async fn test_cell_filter_rescopes_to_each_row() {
            let page = sample_page();
            let rows = page.locator("tbody tr");
            let filter = CellFilter::text(Selector::query("td"), 1, "User", true);
            let matched = rows.filter_by_cell(filter);
            assert_eq!(matched.count().await.unwrap(), 1);
            assert_eq!(matched.inner_text().await.unwrap(), "Bob\tUser");
        }

        #[tokio::test]
        async fn test_cell_filter_does_not_match_other_columns() {
            let page = sample_page();
            let rows = page.locator("tbody tr");
            let filter = CellFilter::text(Selector::query("td"), 0, "User", true);
            assert_eq!(rows.filter_by_cell(filter).count().await.unwrap(), 0);
        }

        #[tokio::test]
        async fn test_cell_filter_predicate_condition() {
            let page = sample_page();
            let rows = page.locator("tbody tr");
            let filter = CellFilter {
                cell_selector: Selector::query("td"),
                column_index: 0,
                condition: CellCondition::Matches(Arc::new(|cell: &LocatorRef| {
                    cell.get_by_text("ali", false)
                })),
            };
            assert_eq!(rows.filter_by_cell(filter).count().await.unwrap(), 1);
        }
    }

    mod wait_tests {
        use super::*;

        #[tokio::test]
        async fn test_wait_for_attached_succeeds_immediately() {
            let page = sample_page();
            page.locator("td")
                .wait_for(WaitState::Attached, Duration::from_millis(100))
                .await
                .unwrap();
        }

        #[tokio::test]
        async fn test_wait_for_missing_element_times_out() {
            let page = sample_page();
            let err = page
                .locator("th")
                .wait_for(WaitState::Visible, Duration::from_millis(60))
                .await
                .unwrap_err();
            assert!(err.is_timeout());
        }
    }
}
