//! Header extraction strategies.

use async_trait::async_trait;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::trace;

use crate::locator::{LocatorRef, Selector};
use crate::result::TableResult;

/// Default horizontal scroll step for [`ScrollRightHeaders`]
pub const DEFAULT_HEADER_SCROLL_STEP: f64 = 300.0;

/// Default scroll budget for [`ScrollRightHeaders`]
pub const DEFAULT_MAX_HEADER_SCROLLS: usize = 20;

/// What a header strategy reads from
#[derive(Debug, Clone)]
pub struct HeaderContext {
    /// Table root
    pub root: LocatorRef,
    /// Header cell collection (header selector resolved against the root)
    pub headers: LocatorRef,
}

/// Produces the raw header texts, in column order
#[async_trait]
pub trait HeaderStrategy: Send + Sync + fmt::Debug {
    /// Raw texts; trimming, defaulting and validation happen in the mapper
    async fn extract(&self, ctx: &HeaderContext) -> TableResult<Vec<String>>;
}

/// Rendered text of every header cell
#[derive(Debug, Clone, Copy, Default)]
pub struct VisibleHeaders;

#[async_trait]
impl HeaderStrategy for VisibleHeaders {
    async fn extract(&self, ctx: &HeaderContext) -> TableResult<Vec<String>> {
        ctx.headers.all_inner_texts().await
    }
}

/// For horizontally virtualised headers: scroll right and collect newly
/// mounted header cells until a scroll yields nothing new.
///
/// Cells are told apart by `aria-colindex` when the grid provides it, and by
/// element identity otherwise. Texts are kept as read, so blank or repeated
/// labels still reach the mapper as separate columns.
#[derive(Debug, Clone)]
pub struct ScrollRightHeaders {
    /// Scrolling container, resolved against the root (default: the root)
    pub container: Option<Selector>,
    /// Horizontal distance per scroll
    pub step: f64,
    /// Upper bound on scrolls
    pub max_scrolls: usize,
}

impl Default for ScrollRightHeaders {
    fn default() -> Self {
        Self {
            container: None,
            step: DEFAULT_HEADER_SCROLL_STEP,
            max_scrolls: DEFAULT_MAX_HEADER_SCROLLS,
        }
    }
}

#[async_trait]
impl HeaderStrategy for ScrollRightHeaders {
    async fn extract(&self, ctx: &HeaderContext) -> TableResult<Vec<String>> {
        let container = self
            .container
            .as_ref()
            .map_or_else(|| Arc::clone(&ctx.root), |selector| selector.resolve(&ctx.root).first());
        let mut seen: HashSet<String> = HashSet::new();
        let mut collected: Vec<String> = Vec::new();
        for scroll in 0..=self.max_scrolls {
            let before = collected.len();
            for cell in ctx.headers.all().await? {
                let Some(key) = cell_key(&cell).await? else {
                    continue;
                };
                if seen.insert(key) {
                    collected.push(cell.inner_text().await?);
                }
            }
            trace!(scroll, found = collected.len() - before, "Header scroll pass");
            if collected.len() == before && scroll > 0 {
                break;
            }
            if scroll < self.max_scrolls {
                container.wheel(self.step, 0.0).await?;
            }
        }
        Ok(collected)
    }
}

async fn cell_key(cell: &LocatorRef) -> TableResult<Option<String>> {
    if let Some(column) = cell.get_attribute("aria-colindex").await? {
        return Ok(Some(format!("col:{}", column.trim())));
    }
    Ok(cell.element_key().await?.map(|key| format!("el:{key}")))
}

/// Default strategy
#[must_use]
pub fn visible() -> Arc<dyn HeaderStrategy> {
    Arc::new(VisibleHeaders)
}

/// Scroll-right strategy over `container`
#[must_use]
pub fn scroll_right(container: Option<Selector>) -> Arc<dyn HeaderStrategy> {
    Arc::new(ScrollRightHeaders {
        container,
        ..ScrollRightHeaders::default()
    })
}
