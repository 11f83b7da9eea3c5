//! Stabilization strategies: did an action cause an observable change?
//!
//! Each strategy fingerprints the table, runs the action, then polls (bounded
//! by the table's stabilization timeouts) until the fingerprint moves. A wait
//! that expires is reported as "no movement", never as an error; the caller
//! decides whether that ends the scan.

use async_trait::async_trait;
use futures::future::BoxFuture;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

use super::pagination::PaginationContext;
use crate::locator::Selector;
use crate::result::TableResult;
use crate::wait::poll_until;

/// The action a stabilization strategy wraps (usually a click or scroll)
pub type StabilizationAction = BoxFuture<'static, TableResult<()>>;

/// Wraps an action and confirms it changed the table
#[async_trait]
pub trait Stabilization: Send + Sync + fmt::Debug {
    /// Run `action` and report whether the table changed in time
    async fn stabilize(&self, ctx: &PaginationContext, action: StabilizationAction) -> TableResult<bool>;
}

/// The first row's rendered text changed
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentChanged;

#[async_trait]
impl Stabilization for ContentChanged {
    async fn stabilize(&self, ctx: &PaginationContext, action: StabilizationAction) -> TableResult<bool> {
        let first_row = ctx.rows().first();
        let before = first_row_text(&first_row).await?;
        action.await?;
        let changed = poll_until(ctx.timeouts.stabilization(), || {
            let first_row = Arc::clone(&first_row);
            let before = before.clone();
            async move { Ok(first_row_text(&first_row).await? != before) }
        })
        .await?;
        if !changed {
            debug!(before = %before, "First row text did not change");
        }
        Ok(changed)
    }
}

async fn first_row_text(first_row: &crate::locator::LocatorRef) -> TableResult<String> {
    if first_row.count().await? == 0 {
        return Ok(String::new());
    }
    first_row.inner_text().await
}

/// The total row count strictly increased
#[derive(Debug, Clone, Copy, Default)]
pub struct RowCountIncreased;

#[async_trait]
impl Stabilization for RowCountIncreased {
    async fn stabilize(&self, ctx: &PaginationContext, action: StabilizationAction) -> TableResult<bool> {
        let rows = ctx.rows();
        let before = rows.count().await?;
        action.await?;
        let increased = poll_until(ctx.timeouts.stabilization(), || {
            let rows = Arc::clone(&rows);
            async move { Ok(rows.count().await? > before) }
        })
        .await?;
        trace!(before, increased, "Row count stabilization finished");
        Ok(increased)
    }
}

/// A loading indicator detached after the action
#[derive(Debug, Clone)]
pub struct NetworkIdle {
    /// Indicator, resolved against the table root
    pub spinner: Selector,
}

#[async_trait]
impl Stabilization for NetworkIdle {
    async fn stabilize(&self, ctx: &PaginationContext, action: StabilizationAction) -> TableResult<bool> {
        let spinner = self.spinner.resolve(&ctx.root);
        action.await?;
        let idle = poll_until(ctx.timeouts.stabilization(), || {
            let spinner = Arc::clone(&spinner);
            async move { Ok(spinner.count().await? == 0) }
        })
        .await?;
        if !idle {
            debug!(spinner = %self.spinner.describe(), "Loading indicator still attached");
        }
        Ok(idle)
    }
}

/// Stabilize on first-row text change
#[must_use]
pub fn content_changed() -> Arc<dyn Stabilization> {
    Arc::new(ContentChanged)
}

/// Stabilize on row count growth
#[must_use]
pub fn row_count_increased() -> Arc<dyn Stabilization> {
    Arc::new(RowCountIncreased)
}

/// Stabilize once `spinner` is gone
#[must_use]
pub fn network_idle(spinner: impl Into<Selector>) -> Arc<dyn Stabilization> {
    Arc::new(NetworkIdle {
        spinner: spinner.into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TableTimeouts;
    use crate::locator::TableLocator;
    use crate::mock::{el, MockPage, PagedTable};
    use crate::result::TableError;

    fn context(root: crate::locator::LocatorRef) -> PaginationContext {
        PaginationContext::new(
            root,
            Selector::query("tbody tr"),
            0,
            TableTimeouts::default().with_stabilization(200, 5),
        )
    }

    #[tokio::test]
    async fn test_content_changed_detects_rerender() {
        let page = MockPage::new();
        let table = PagedTable::people(6).mount(&page);
        let button = page.locator("button.next");
        let moved = ContentChanged
            .stabilize(&context(table.root()), Box::pin(async move { button.click().await }))
            .await
            .unwrap();
        assert!(moved);
    }

    #[tokio::test]
    async fn test_content_changed_reports_no_movement_on_timeout() {
        let page = MockPage::new();
        let table = PagedTable::people(6).mount(&page);
        let moved = ContentChanged
            .stabilize(&context(table.root()), Box::pin(async { Ok::<_, TableError>(()) }))
            .await
            .unwrap();
        assert!(!moved);
    }

    #[tokio::test]
    async fn test_row_count_increased() {
        let page = MockPage::new();
        let _ = page.mount(el("table").child(el("tbody").child(el("tr").child(el("td").text("a")))));
        let tbody = {
            let dom = page.dom();
            dom.query(dom.root(), "tbody")[0]
        };
        let appender = page.clone();
        let moved = RowCountIncreased
            .stabilize(
                &context(page.locator("table")),
                Box::pin(async move {
                    let _ = appender.mount_into(tbody, el("tr").child(el("td").text("b")));
                    Ok::<_, TableError>(())
                }),
            )
            .await
            .unwrap();
        assert!(moved);
    }

    #[tokio::test]
    async fn test_network_idle_waits_for_spinner_detach() {
        let page = MockPage::new();
        let table_node = page.mount(el("table").child(el("div").class("spinner")));
        let spinner = page.dom().query(table_node, ".spinner")[0];
        let remover = page.clone();
        let moved = network_idle(".spinner")
            .stabilize(
                &context(page.locator("table")),
                Box::pin(async move {
                    remover.dom().detach(spinner);
                    Ok::<_, TableError>(())
                }),
            )
            .await
            .unwrap();
        assert!(moved);
    }
}
