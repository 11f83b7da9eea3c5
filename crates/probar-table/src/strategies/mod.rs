//! Pluggable strategies.
//!
//! Each concern a table needs from the host UI is a separate, explicitly
//! typed capability: header extraction, pagination primitives, stabilization,
//! loading predicates, fill, directional navigation and sorting. A table picks
//! the active implementation by presence in a fixed order, never by
//! inspecting what a user-supplied object happens to contain.
//!
//! ## Toyota Way Application
//!
//! - **Poka-Yoke**: Pagination results are normalized through one validator
//! - **Jidoka**: Stabilization stops a scan when a click changed nothing

pub mod fill;
pub mod header;
pub mod loading;
pub mod navigation;
pub mod pagination;
pub mod sorting;
pub mod stabilization;
pub mod validation;

pub use fill::{AutoFill, FillContext, FillStrategy};
pub use header::{HeaderContext, HeaderStrategy, ScrollRightHeaders, VisibleHeaders};
pub use loading::{LoadingCheck, LoadingContext, LoadingStrategies};
pub use navigation::{ActiveCell, ActiveCellFn, NavigationContext, NavigationFn, NavigationPrimitives};
pub use pagination::{
    click, infinite_scroll, primitive, ClickOptions, ClickSelectors, GoToPageFn, InfiniteScrollOptions,
    PaginationContext, PaginationFn, PaginationPrimitives, PrimitiveKind, ScrollAction,
};
pub use sorting::{AriaSort, SortContext, SortDirection, SortingStrategy};
pub use stabilization::{Stabilization, StabilizationAction};
pub use validation::{validate_pagination_result, PageMove, StepResult};
