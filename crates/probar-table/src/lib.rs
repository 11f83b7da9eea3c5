//! Probar Table: name-addressed rows and cells over table-like UIs
//!
//! A smart table wraps a root locator and turns "the third `td` of the row
//! whose second cell says Admin" into `find_row(Filters::new().with("Role",
//! "Admin"))` and `row.get_cell("Email")`. Pagination, infinite scroll,
//! virtualised grids and skeleton rows are handled by pluggable strategies.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    PROBAR TABLE Architecture                     │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐    ┌────────────┐    ┌────────────┐            │
//! │   │ SmartTable │    │ Engine     │    │ Strategies │            │
//! │   │ SmartRow   │───►│ mapper     │───►│ pagination │            │
//! │   │            │    │ finder     │    │ loading    │            │
//! │   │            │    │ iteration  │    │ fill, nav  │            │
//! │   └────────────┘    └────────────┘    └─────┬──────┘            │
//! │                                             ▼                   │
//! │                                     ┌──────────────┐            │
//! │                                     │ TableLocator │            │
//! │                                     │ (host/mock)  │            │
//! │                                     └──────────────┘            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The engine never clicks or scrolls directly: every page move is a
//! pagination primitive, every element access goes through [`TableLocator`].

#![warn(missing_docs)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

/// Locator capability interface consumed from the host automation layer
#[allow(clippy::missing_errors_doc)]
pub mod locator;

/// Configuration, hooks and serialisable settings
#[allow(clippy::missing_errors_doc, clippy::must_use_candidate)]
pub mod config;

/// Header mapping, row search and iteration
#[allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]
pub mod engine;

/// Recycled-row detection for virtualised lists
pub mod element_tracker;

/// Column filters
#[allow(clippy::missing_errors_doc)]
pub mod filter;

/// In-memory host implementing the locator interface
#[allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::missing_panics_doc,
    clippy::cast_possible_truncation
)]
pub mod mock;

/// Page navigation planner
#[allow(clippy::missing_errors_doc, clippy::cast_possible_truncation)]
pub mod pagination_path;

mod result;

/// Row handles
#[allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]
pub mod smart_row;

/// Pluggable strategies
#[allow(clippy::missing_errors_doc, clippy::module_name_repetitions)]
pub mod strategies;

/// Column name suggestions
pub mod suggest;

#[allow(clippy::missing_errors_doc)]
mod table;

/// Bounded polling
pub mod wait;

pub use config::{
    CellLocatorContext, CellReadContext, ColumnOverride, Strategies, TableConfig, TableSettings,
    TableTimeouts, WriteContext,
};
pub use element_tracker::ElementTracker;
pub use engine::{HeaderMap, IterationOptions, RowContext, SearchOptions, StopHandle, TableMapper};
pub use filter::{apply_filters, FilterValue, Filters};
pub use locator::{CellCondition, CellFilter, LocatorRef, Selector, TableLocator, WaitState};
pub use pagination_path::{
    execute_navigation_path, execute_navigation_with_go_to_page_retry, navigate_to_page,
    plan_navigation_path, PathStep,
};
pub use result::{TableError, TableResult};
pub use smart_row::{FillOptions, RowData, SmartRow, SmartRowArray};
pub use table::{use_table, SmartTable, TableSorting};
pub use wait::{poll_until, PollOptions};

/// Prelude for convenient imports
pub mod prelude {
    pub use super::config::*;
    pub use super::engine::{HeaderMap, IterationOptions, RowContext, SearchOptions, StopHandle};
    pub use super::filter::*;
    pub use super::locator::*;
    pub use super::result::*;
    pub use super::smart_row::*;
    pub use super::strategies::{
        click, infinite_scroll, ClickOptions, ClickSelectors, InfiniteScrollOptions,
        PaginationPrimitives, SortDirection, StepResult,
    };
    pub use super::table::*;
}
