//! Table engine: header mapping, row search and row iteration.
//!
//! The three parts share one [`TableCore`](crate::table::TableCore) and
//! compose against the pagination primitives only.
//!
//! ## Toyota Way Application
//!
//! - **Genchi Genbutsu**: Every read goes to the live row collection
//! - **Jidoka**: Ambiguous matches stop the search instead of guessing

pub mod finder;
pub mod iteration;
pub mod mapper;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::locator::LocatorRef;
use crate::result::{TableError, TableResult};
use crate::table::TableCore;
use crate::wait::poll_until;

pub use finder::SearchOptions;
pub use iteration::{IterationOptions, RowContext, StopHandle};
pub use mapper::{HeaderMap, TableMapper};

/// Wait while the table-loading predicate reports `true`
pub(crate) async fn wait_until_ready(table: &TableCore) -> TableResult<()> {
    let Some(check) = table.config.strategies.loading.is_table_loading.clone() else {
        return Ok(());
    };
    let ctx = table.loading_context();
    let options = table.config.timeouts.table_loading();
    let ready = poll_until(options, || {
        let check = Arc::clone(&check);
        let ctx = ctx.clone();
        async move { Ok(!check.is_loading(&ctx).await?) }
    })
    .await?;
    if ready {
        Ok(())
    } else {
        Err(TableError::timeout("Table loading", options.timeout_ms))
    }
}

/// Whether the row-loading predicate flags `row` as a placeholder
pub(crate) async fn row_is_loading(table: &TableCore, row: &LocatorRef) -> TableResult<bool> {
    match &table.config.strategies.loading.is_row_loading {
        Some(check) => {
            let ctx = table.loading_context().for_row(Arc::clone(row));
            check.is_loading(&ctx).await
        }
        None => Ok(false),
    }
}

/// One forward pagination call; `use_bulk` prefers the bulk primitive.
///
/// Returns `false` when no primitive is configured or the view did not move.
/// The shared page index grows by the reported displacement.
pub(crate) async fn advance_page(table: &TableCore, use_bulk: bool) -> TableResult<bool> {
    let pagination = &table.config.strategies.pagination;
    let Some(kind) = pagination.resolve_forward(use_bulk) else {
        trace!("No forward pagination primitive");
        return Ok(false);
    };
    let movement = pagination.step(kind, table.pagination_context()).await?;
    if !movement.moved {
        debug!(primitive = %kind, "Pagination reported no movement");
        return Ok(false);
    }
    let page = table
        .current_page_index
        .fetch_add(movement.pages as usize, Ordering::SeqCst)
        + movement.pages as usize;
    debug!(primitive = %kind, pages = movement.pages, page, "Advanced page");
    Ok(true)
}
