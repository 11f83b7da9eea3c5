//! Directional cell navigation for grids without a DOM node per cell.

use futures::future::BoxFuture;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::locator::{keys, LocatorRef, Selector};
use crate::result::TableResult;

/// What a navigation primitive or active-cell probe gets
#[derive(Debug, Clone)]
pub struct NavigationContext {
    /// Table root
    pub root: LocatorRef,
}

/// One directional move (`go_up`, `go_home`, ...)
pub type NavigationFn =
    Arc<dyn Fn(NavigationContext) -> BoxFuture<'static, TableResult<()>> + Send + Sync>;

/// Wrap an async closure as a [`NavigationFn`]
pub fn navigation_fn<F, Fut>(func: F) -> NavigationFn
where
    F: Fn(NavigationContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = TableResult<()>> + Send + 'static,
{
    Arc::new(move |ctx| Box::pin(func(ctx)))
}

/// Where the grid's focus currently is
#[derive(Debug, Clone)]
pub struct ActiveCell {
    /// Zero-based row index
    pub row_index: usize,
    /// Zero-based column index
    pub column_index: usize,
    /// Locator of the focused cell
    pub locator: LocatorRef,
}

/// Introspects the focused cell, `None` when nothing is focused
pub type ActiveCellFn =
    Arc<dyn Fn(NavigationContext) -> BoxFuture<'static, TableResult<Option<ActiveCell>>> + Send + Sync>;

/// Wrap an async closure as an [`ActiveCellFn`]
pub fn active_cell_fn<F, Fut>(func: F) -> ActiveCellFn
where
    F: Fn(NavigationContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = TableResult<Option<ActiveCell>>> + Send + 'static,
{
    Arc::new(move |ctx| Box::pin(func(ctx)))
}

/// Optional directional primitives
#[derive(Clone, Default)]
pub struct NavigationPrimitives {
    /// One row up
    pub go_up: Option<NavigationFn>,
    /// One row down
    pub go_down: Option<NavigationFn>,
    /// One column left
    pub go_left: Option<NavigationFn>,
    /// One column right
    pub go_right: Option<NavigationFn>,
    /// Focus the first cell
    pub go_home: Option<NavigationFn>,
}

impl fmt::Debug for NavigationPrimitives {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NavigationPrimitives")
            .field("go_up", &self.go_up.is_some())
            .field("go_down", &self.go_down.is_some())
            .field("go_left", &self.go_left.is_some())
            .field("go_right", &self.go_right.is_some())
            .field("go_home", &self.go_home.is_some())
            .finish()
    }
}

impl NavigationPrimitives {
    /// No primitives
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether any directional move is available
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.go_up.is_none()
            && self.go_down.is_none()
            && self.go_left.is_none()
            && self.go_right.is_none()
            && self.go_home.is_none()
    }
}

/// Arrow-key primitives pressed on `target` (resolved against the root).
///
/// `go_home` presses `Control+Home`.
#[must_use]
pub fn keyboard(target: impl Into<Selector>) -> NavigationPrimitives {
    let target = target.into();
    let press = |key: &'static str| {
        let target = target.clone();
        navigation_fn(move |ctx: NavigationContext| {
            let element = target.resolve(&ctx.root).first();
            async move { element.press(key).await }
        })
    };
    NavigationPrimitives {
        go_up: Some(press(keys::ARROW_UP)),
        go_down: Some(press(keys::ARROW_DOWN)),
        go_left: Some(press(keys::ARROW_LEFT)),
        go_right: Some(press(keys::ARROW_RIGHT)),
        go_home: Some(press(keys::CONTROL_HOME)),
    }
}

/// Active cell from ARIA: the element matching `selector` (default
/// `[aria-selected="true"]`) with one-based `aria-rowindex`/`aria-colindex`.
#[must_use]
pub fn aria_active_cell(selector: Option<Selector>) -> ActiveCellFn {
    let selector = selector.unwrap_or_else(|| Selector::query("[aria-selected=\"true\"]"));
    active_cell_fn(move |ctx: NavigationContext| {
        let cell = selector.resolve(&ctx.root).first();
        async move {
            if cell.count().await? == 0 {
                return Ok(None);
            }
            let index = |value: Option<String>| {
                value
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .and_then(|v| v.checked_sub(1))
            };
            let row = index(cell.get_attribute("aria-rowindex").await?);
            let column = index(cell.get_attribute("aria-colindex").await?);
            Ok(match (row, column) {
                (Some(row_index), Some(column_index)) => Some(ActiveCell {
                    row_index,
                    column_index,
                    locator: cell,
                }),
                _ => None,
            })
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{el, MockPage};

    #[tokio::test]
    async fn test_keyboard_presses_on_target() {
        let page = MockPage::new();
        let _ = page.mount(el("div").class("grid").attr("tabindex", "0"));
        let nav = keyboard(".grid");
        let ctx = NavigationContext {
            root: page.root(),
        };
        let go_down = nav.go_down.clone().unwrap();
        go_down(ctx.clone()).await.unwrap();
        let go_home = nav.go_home.clone().unwrap();
        go_home(ctx).await.unwrap();
        assert_eq!(
            page.actions(),
            vec!["press[ArrowDown]:div.grid", "press[Control+Home]:div.grid"]
        );
    }

    #[tokio::test]
    async fn test_aria_active_cell_reads_one_based_indices() {
        let page = MockPage::new();
        let _ = page.mount(
            el("div").class("grid").child(
                el("div")
                    .attr("role", "gridcell")
                    .attr("aria-selected", "true")
                    .attr("aria-rowindex", "3")
                    .attr("aria-colindex", "2")
                    .text("cell"),
            ),
        );
        let probe = aria_active_cell(None);
        let active = probe(NavigationContext {
            root: page.locator(".grid"),
        })
        .await
        .unwrap()
        .unwrap();
        assert_eq!((active.row_index, active.column_index), (2, 1));
    }

    #[tokio::test]
    async fn test_aria_active_cell_none_without_focus() {
        let page = MockPage::new();
        let _ = page.mount(el("div").class("grid"));
        let probe = aria_active_cell(None);
        let active = probe(NavigationContext {
            root: page.locator(".grid"),
        })
        .await
        .unwrap();
        assert!(active.is_none());
        assert!(NavigationPrimitives::new().is_empty());
    }
}
