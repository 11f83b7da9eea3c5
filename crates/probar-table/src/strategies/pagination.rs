//! Pagination primitives and the built-in click / infinite-scroll strategies.
//!
//! Everything above this module (row finder, iteration, path planner,
//! `bring_into_view`) composes against [`PaginationPrimitives`] only. A
//! primitive is one atomic "move the view" operation that reports its
//! displacement as a [`StepResult`]; [`PaginationPrimitives::step`] validates
//! and normalizes it into a [`PageMove`].

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, trace};

use super::stabilization::{self, Stabilization};
use super::validation::{validate_pagination_result, PageMove, StepResult};
use crate::config::TableTimeouts;
use crate::locator::{LocatorRef, Selector};
use crate::result::{TableError, TableResult};

/// Default bulk jump size
pub const DEFAULT_BULK_PAGES: u32 = 10;

/// Default infinite-scroll distance in pixels
pub const DEFAULT_SCROLL_AMOUNT: f64 = 500.0;

// =============================================================================
// PRIMITIVES
// =============================================================================

/// What a primitive gets to work with
#[derive(Debug, Clone)]
pub struct PaginationContext {
    /// Table root
    pub root: LocatorRef,
    /// Row selector, relative to the root
    pub row_selector: Selector,
    /// Page the table believes it is on
    pub page_index: usize,
    /// Table timeouts (stabilization strategies read theirs from here)
    pub timeouts: TableTimeouts,
}

impl PaginationContext {
    /// Create a context
    #[must_use]
    pub const fn new(
        root: LocatorRef,
        row_selector: Selector,
        page_index: usize,
        timeouts: TableTimeouts,
    ) -> Self {
        Self {
            root,
            row_selector,
            page_index,
            timeouts,
        }
    }

    /// Same context, positioned at another page
    #[must_use]
    pub fn at_page(&self, page_index: usize) -> Self {
        Self {
            page_index,
            ..self.clone()
        }
    }

    /// Current row collection
    #[must_use]
    pub fn rows(&self) -> LocatorRef {
        self.row_selector.resolve(&self.root)
    }
}

/// A relative pagination primitive (`go_next`, `go_previous_bulk`, ...)
pub type PaginationFn =
    Arc<dyn Fn(PaginationContext) -> BoxFuture<'static, TableResult<StepResult>> + Send + Sync>;

/// An absolute jump to a zero-based page index
pub type GoToPageFn =
    Arc<dyn Fn(PaginationContext, usize) -> BoxFuture<'static, TableResult<StepResult>> + Send + Sync>;

/// Wrap an async closure as a [`PaginationFn`]
pub fn primitive<F, Fut>(func: F) -> PaginationFn
where
    F: Fn(PaginationContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = TableResult<StepResult>> + Send + 'static,
{
    Arc::new(move |ctx| Box::pin(func(ctx)))
}

/// Wrap an async closure as a [`GoToPageFn`]
pub fn go_to_page_primitive<F, Fut>(func: F) -> GoToPageFn
where
    F: Fn(PaginationContext, usize) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = TableResult<StepResult>> + Send + 'static,
{
    Arc::new(move |ctx, page| Box::pin(func(ctx, page)))
}

/// Names the primitives of a [`PaginationPrimitives`] bundle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimitiveKind {
    /// One page forward
    GoNext,
    /// One page back
    GoPrevious,
    /// Several pages forward
    GoNextBulk,
    /// Several pages back
    GoPreviousBulk,
    /// Back to the first page
    GoToFirst,
    /// Absolute jump
    GoToPage,
}

impl PrimitiveKind {
    /// Name used in logs and error messages
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::GoNext => "go_next",
            Self::GoPrevious => "go_previous",
            Self::GoNextBulk => "go_next_bulk",
            Self::GoPreviousBulk => "go_previous_bulk",
            Self::GoToFirst => "go_to_first",
            Self::GoToPage => "go_to_page",
        }
    }

    /// Whether the primitive moves towards higher page indices
    #[must_use]
    pub const fn is_forward(&self) -> bool {
        matches!(self, Self::GoNext | Self::GoNextBulk)
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Bundle of optional pagination primitives
#[derive(Clone)]
pub struct PaginationPrimitives {
    /// One page forward
    pub go_next: Option<PaginationFn>,
    /// One page back
    pub go_previous: Option<PaginationFn>,
    /// Bulk forward
    pub go_next_bulk: Option<PaginationFn>,
    /// Bulk back
    pub go_previous_bulk: Option<PaginationFn>,
    /// Back to the first page
    pub go_to_first: Option<PaginationFn>,
    /// Absolute jump (may be windowed)
    pub go_to_page: Option<GoToPageFn>,
    /// Pages a forward bulk call moves
    pub next_bulk_pages: u32,
    /// Pages a backward bulk call moves
    pub previous_bulk_pages: u32,
}

impl Default for PaginationPrimitives {
    fn default() -> Self {
        Self {
            go_next: None,
            go_previous: None,
            go_next_bulk: None,
            go_previous_bulk: None,
            go_to_first: None,
            go_to_page: None,
            next_bulk_pages: DEFAULT_BULK_PAGES,
            previous_bulk_pages: DEFAULT_BULK_PAGES,
        }
    }
}

impl fmt::Debug for PaginationPrimitives {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let available: Vec<&str> = [
            PrimitiveKind::GoNext,
            PrimitiveKind::GoPrevious,
            PrimitiveKind::GoNextBulk,
            PrimitiveKind::GoPreviousBulk,
            PrimitiveKind::GoToFirst,
            PrimitiveKind::GoToPage,
        ]
        .into_iter()
        .filter(|kind| self.has(*kind))
        .map(|kind| kind.name())
        .collect();
        f.debug_struct("PaginationPrimitives")
            .field("available", &available)
            .field("next_bulk_pages", &self.next_bulk_pages)
            .field("previous_bulk_pages", &self.previous_bulk_pages)
            .finish()
    }
}

impl PaginationPrimitives {
    /// Empty bundle
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the single-step forward primitive
    #[must_use]
    pub fn with_go_next(mut self, func: PaginationFn) -> Self {
        self.go_next = Some(func);
        self
    }

    /// Set the single-step backward primitive
    #[must_use]
    pub fn with_go_previous(mut self, func: PaginationFn) -> Self {
        self.go_previous = Some(func);
        self
    }

    /// Set the bulk forward primitive and its jump size
    #[must_use]
    pub fn with_go_next_bulk(mut self, func: PaginationFn, pages: u32) -> Self {
        self.go_next_bulk = Some(func);
        self.next_bulk_pages = pages;
        self
    }

    /// Set the bulk backward primitive and its jump size
    #[must_use]
    pub fn with_go_previous_bulk(mut self, func: PaginationFn, pages: u32) -> Self {
        self.go_previous_bulk = Some(func);
        self.previous_bulk_pages = pages;
        self
    }

    /// Set the go-to-first primitive
    #[must_use]
    pub fn with_go_to_first(mut self, func: PaginationFn) -> Self {
        self.go_to_first = Some(func);
        self
    }

    /// Set the absolute jump primitive
    #[must_use]
    pub fn with_go_to_page(mut self, func: GoToPageFn) -> Self {
        self.go_to_page = Some(func);
        self
    }

    fn relative(&self, kind: PrimitiveKind) -> Option<&PaginationFn> {
        match kind {
            PrimitiveKind::GoNext => self.go_next.as_ref(),
            PrimitiveKind::GoPrevious => self.go_previous.as_ref(),
            PrimitiveKind::GoNextBulk => self.go_next_bulk.as_ref(),
            PrimitiveKind::GoPreviousBulk => self.go_previous_bulk.as_ref(),
            PrimitiveKind::GoToFirst => self.go_to_first.as_ref(),
            PrimitiveKind::GoToPage => None,
        }
    }

    /// Whether `kind` is configured
    #[must_use]
    pub fn has(&self, kind: PrimitiveKind) -> bool {
        match kind {
            PrimitiveKind::GoToPage => self.go_to_page.is_some(),
            other => self.relative(other).is_some(),
        }
    }

    /// Whether any primitive is configured
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.go_next.is_none()
            && self.go_previous.is_none()
            && self.go_next_bulk.is_none()
            && self.go_previous_bulk.is_none()
            && self.go_to_first.is_none()
            && self.go_to_page.is_none()
    }

    /// Advertised displacement of one call of `kind`
    #[must_use]
    pub const fn nominal_pages(&self, kind: PrimitiveKind) -> u32 {
        match kind {
            PrimitiveKind::GoNextBulk => self.next_bulk_pages,
            PrimitiveKind::GoPreviousBulk => self.previous_bulk_pages,
            _ => 1,
        }
    }

    /// Primitive to move forward with: bulk first when `use_bulk`, else single
    #[must_use]
    pub fn resolve_forward(&self, use_bulk: bool) -> Option<PrimitiveKind> {
        if use_bulk && self.go_next_bulk.is_some() {
            Some(PrimitiveKind::GoNextBulk)
        } else if self.go_next.is_some() {
            Some(PrimitiveKind::GoNext)
        } else {
            None
        }
    }

    /// Primitive to move backward with: bulk first when `use_bulk`, else single
    #[must_use]
    pub fn resolve_backward(&self, use_bulk: bool) -> Option<PrimitiveKind> {
        if use_bulk && self.go_previous_bulk.is_some() {
            Some(PrimitiveKind::GoPreviousBulk)
        } else if self.go_previous.is_some() {
            Some(PrimitiveKind::GoPrevious)
        } else {
            None
        }
    }

    /// Invoke a relative primitive and normalize its result
    pub async fn step(&self, kind: PrimitiveKind, ctx: PaginationContext) -> TableResult<PageMove> {
        let func = self.relative(kind).ok_or_else(|| TableError::Pagination {
            message: format!("No {kind} primitive configured"),
        })?;
        let result = func(ctx).await?;
        let movement = validate_pagination_result(result, kind.name())?;
        trace!(primitive = %kind, %movement, "Pagination step");
        Ok(movement)
    }

    /// Invoke the absolute jump and normalize its result
    pub async fn go_to(&self, ctx: PaginationContext, target: usize) -> TableResult<PageMove> {
        let func = self.go_to_page.as_ref().ok_or_else(|| TableError::Pagination {
            message: "No go_to_page primitive configured".to_string(),
        })?;
        let result = func(ctx, target).await?;
        let movement = validate_pagination_result(result, PrimitiveKind::GoToPage.name())?;
        trace!(target, %movement, "Pagination jump");
        Ok(movement)
    }
}

// =============================================================================
// CLICK STRATEGY
// =============================================================================

/// Buttons for [`click`], resolved against the table root
#[derive(Debug, Clone, Default)]
pub struct ClickSelectors {
    /// Next-page button
    pub next: Option<Selector>,
    /// Previous-page button
    pub previous: Option<Selector>,
    /// Bulk-forward button
    pub next_bulk: Option<Selector>,
    /// Bulk-backward button
    pub previous_bulk: Option<Selector>,
    /// First-page button
    pub first: Option<Selector>,
}

impl ClickSelectors {
    /// No buttons
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the next button
    #[must_use]
    pub fn with_next(mut self, selector: impl Into<Selector>) -> Self {
        self.next = Some(selector.into());
        self
    }

    /// Set the previous button
    #[must_use]
    pub fn with_previous(mut self, selector: impl Into<Selector>) -> Self {
        self.previous = Some(selector.into());
        self
    }

    /// Set the bulk-forward button
    #[must_use]
    pub fn with_next_bulk(mut self, selector: impl Into<Selector>) -> Self {
        self.next_bulk = Some(selector.into());
        self
    }

    /// Set the bulk-backward button
    #[must_use]
    pub fn with_previous_bulk(mut self, selector: impl Into<Selector>) -> Self {
        self.previous_bulk = Some(selector.into());
        self
    }

    /// Set the first-page button
    #[must_use]
    pub fn with_first(mut self, selector: impl Into<Selector>) -> Self {
        self.first = Some(selector.into());
        self
    }
}

/// Options for [`click`]
#[derive(Debug, Clone)]
pub struct ClickOptions {
    /// Confirms a click changed the table (default: first row text changed)
    pub stabilization: Arc<dyn Stabilization>,
    /// Pages the bulk-forward button moves
    pub next_bulk_pages: u32,
    /// Pages the bulk-backward button moves
    pub previous_bulk_pages: u32,
}

impl Default for ClickOptions {
    fn default() -> Self {
        Self {
            stabilization: stabilization::content_changed(),
            next_bulk_pages: DEFAULT_BULK_PAGES,
            previous_bulk_pages: DEFAULT_BULK_PAGES,
        }
    }
}

impl ClickOptions {
    /// Default options
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the stabilization strategy
    #[must_use]
    pub fn with_stabilization(mut self, stabilization: Arc<dyn Stabilization>) -> Self {
        self.stabilization = stabilization;
        self
    }

    /// Set both bulk sizes
    #[must_use]
    pub const fn with_bulk_pages(mut self, next: u32, previous: u32) -> Self {
        self.next_bulk_pages = next;
        self.previous_bulk_pages = previous;
        self
    }
}

/// Primitives that click pager buttons.
///
/// A button that is missing, hidden or disabled reports no movement. Bulk
/// buttons report their configured page count.
#[must_use]
pub fn click(selectors: ClickSelectors, options: ClickOptions) -> PaginationPrimitives {
    let make = |selector: Option<Selector>, pages: u32| {
        selector.map(|selector| click_primitive(selector, Arc::clone(&options.stabilization), pages))
    };
    PaginationPrimitives {
        go_next: make(selectors.next, 1),
        go_previous: make(selectors.previous, 1),
        go_next_bulk: make(selectors.next_bulk, options.next_bulk_pages),
        go_previous_bulk: make(selectors.previous_bulk, options.previous_bulk_pages),
        go_to_first: make(selectors.first, 1),
        go_to_page: None,
        next_bulk_pages: options.next_bulk_pages,
        previous_bulk_pages: options.previous_bulk_pages,
    }
}

fn click_primitive(selector: Selector, stabilization: Arc<dyn Stabilization>, pages: u32) -> PaginationFn {
    primitive(move |ctx: PaginationContext| {
        let button = selector.resolve(&ctx.root).first();
        let stabilization = Arc::clone(&stabilization);
        let description = selector.describe();
        async move {
            if !button.is_visible().await? || !button.is_enabled().await? {
                debug!(button = %description, "Pager button unavailable");
                return Ok(StepResult::Moved(false));
            }
            let target = Arc::clone(&button);
            let moved = stabilization
                .stabilize(&ctx, Box::pin(async move { target.click().await }))
                .await?;
            Ok(match (moved, pages) {
                (false, _) => StepResult::Moved(false),
                (true, 1) => StepResult::Moved(true),
                (true, n) => StepResult::Pages(i64::from(n)),
            })
        }
    })
}

// =============================================================================
// INFINITE SCROLL STRATEGY
// =============================================================================

/// How [`infinite_scroll`] moves the container
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScrollAction {
    /// Dispatch a mouse-wheel gesture
    #[default]
    Wheel,
    /// Write the scroll offset directly
    ScrollTop,
}

/// Options for [`infinite_scroll`]
#[derive(Debug, Clone)]
pub struct InfiniteScrollOptions {
    /// Scrolling container, resolved against the root (default: the root)
    pub container: Option<Selector>,
    /// Distance per step in pixels
    pub amount: f64,
    /// Wheel or direct offset write
    pub action: ScrollAction,
    /// Confirms new content arrived (default: row count increased)
    pub stabilization: Arc<dyn Stabilization>,
}

impl Default for InfiniteScrollOptions {
    fn default() -> Self {
        Self {
            container: None,
            amount: DEFAULT_SCROLL_AMOUNT,
            action: ScrollAction::Wheel,
            stabilization: stabilization::row_count_increased(),
        }
    }
}

impl InfiniteScrollOptions {
    /// Default options
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the scrolling container
    #[must_use]
    pub fn with_container(mut self, selector: impl Into<Selector>) -> Self {
        self.container = Some(selector.into());
        self
    }

    /// Set the distance per step
    #[must_use]
    pub const fn with_amount(mut self, amount: f64) -> Self {
        self.amount = amount;
        self
    }

    /// Set the scroll action
    #[must_use]
    pub const fn with_action(mut self, action: ScrollAction) -> Self {
        self.action = action;
        self
    }

    /// Set the stabilization strategy
    #[must_use]
    pub fn with_stabilization(mut self, stabilization: Arc<dyn Stabilization>) -> Self {
        self.stabilization = stabilization;
        self
    }
}

/// Primitives that scroll a container: `go_next`, `go_previous`, `go_to_first`
#[must_use]
pub fn infinite_scroll(options: InfiniteScrollOptions) -> PaginationPrimitives {
    let options = Arc::new(options);
    let forward = Arc::clone(&options);
    let backward = Arc::clone(&options);
    let first = options;
    PaginationPrimitives::new()
        .with_go_next(primitive(move |ctx| scroll_step(Arc::clone(&forward), ctx, 1.0)))
        .with_go_previous(primitive(move |ctx| scroll_step(Arc::clone(&backward), ctx, -1.0)))
        .with_go_to_first(primitive(move |ctx| {
            let options = Arc::clone(&first);
            async move {
                let container = scroll_container(&options, &ctx);
                if container.scroll_top().await? <= 0.0 {
                    return Ok(StepResult::Moved(false));
                }
                container.set_scroll_top(0.0).await?;
                Ok(StepResult::Moved(true))
            }
        }))
}

fn scroll_container(options: &InfiniteScrollOptions, ctx: &PaginationContext) -> LocatorRef {
    options
        .container
        .as_ref()
        .map_or_else(|| Arc::clone(&ctx.root), |selector| selector.resolve(&ctx.root).first())
}

async fn scroll_step(
    options: Arc<InfiniteScrollOptions>,
    ctx: PaginationContext,
    direction: f64,
) -> TableResult<StepResult> {
    let container = scroll_container(&options, &ctx);
    let delta = options.amount * direction;
    let action = options.action;
    let target = Arc::clone(&container);
    let scroll: super::stabilization::StabilizationAction = Box::pin(async move {
        match action {
            ScrollAction::Wheel => target.wheel(0.0, delta).await,
            ScrollAction::ScrollTop => {
                let offset = target.scroll_top().await?;
                target.set_scroll_top(offset + delta).await
            }
        }
    });
    let moved = options.stabilization.stabilize(&ctx, scroll).await?;
    debug!(delta, moved, "Infinite scroll step");
    Ok(StepResult::Moved(moved))
}
