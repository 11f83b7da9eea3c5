//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use probar_table::mock::{MockPage, PagedTable, PagedTableHandle};
use probar_table::prelude::*;
use tracing_subscriber::EnvFilter;

/// Route `tracing` output through the test harness (`RUST_LOG=probar_table=debug`)
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Short budgets so "nothing moved" cases finish quickly
pub fn fast_timeouts() -> TableTimeouts {
    TableTimeouts::new().with_header(500).with_stabilization(300, 5)
}

/// Pager buttons live next to the table, so they resolve against the page
pub fn pager(previous: bool, first: bool) -> ClickSelectors {
    let mut selectors = ClickSelectors::new().with_next(Selector::page("button.next"));
    if previous {
        selectors = selectors.with_previous(Selector::page("button.prev"));
    }
    if first {
        selectors = selectors.with_first(Selector::page("button.first"));
    }
    selectors
}

/// Mount `fixture` and wrap it in a table paginated by `selectors`
pub fn paged_table(
    page: &MockPage,
    fixture: PagedTable,
    selectors: ClickSelectors,
    max_pages: usize,
) -> (PagedTableHandle, SmartTable) {
    let handle = fixture.mount(page);
    let config = TableConfig::new()
        .with_pagination(click(selectors, ClickOptions::new()))
        .with_max_pages(max_pages)
        .with_timeouts(fast_timeouts());
    let table = use_table(handle.root(), config).unwrap();
    (handle, table)
}

/// Single-cell rows under the given headers
pub fn rows_of(cells: &[&[&str]]) -> Vec<Vec<String>> {
    cells
        .iter()
        .map(|row| row.iter().map(ToString::to_string).collect())
        .collect()
}
