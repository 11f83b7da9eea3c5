//! Page navigation planner.
//!
//! Computes the cheapest sequence of pagination primitive calls that moves the
//! table from one absolute page index to another, and executes plans against
//! the shared page counter.
//!
//! ## Toyota Way Application
//!
//! - **Muda**: bulk jumps may overshoot and step back when that saves calls
//! - **Jidoka**: a step that reports no movement stops the plan immediately
//! - **Poka-Yoke**: every loop is bounded; windowed jumps give up after
//!   [`MAX_GO_TO_PAGE_ATTEMPTS`] iterations

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, trace, warn};

use crate::result::{TableError, TableResult};
use crate::strategies::pagination::{PaginationContext, PaginationPrimitives, PrimitiveKind};
use crate::strategies::validation::PageMove;

/// Iteration bound of the windowed `go_to_page` retry loop
pub const MAX_GO_TO_PAGE_ATTEMPTS: usize = 200;

/// One entry of a navigation plan: call `primitive` `count` times
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathStep {
    /// Primitive to call
    pub primitive: PrimitiveKind,
    /// Number of calls
    pub count: u32,
}

impl PathStep {
    /// Create a step
    #[must_use]
    pub const fn new(primitive: PrimitiveKind, count: u32) -> Self {
        Self { primitive, count }
    }
}

impl fmt::Display for PathStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} x{}", self.primitive, self.count)
    }
}

/// Total primitive calls of a plan
#[must_use]
pub fn plan_cost(path: &[PathStep]) -> u32 {
    path.iter().map(|step| step.count).sum()
}

// =============================================================================
// PLANNER
// =============================================================================

/// The primitives relevant for one direction of travel
struct Direction {
    single: Option<PrimitiveKind>,
    bulk: Option<(PrimitiveKind, u32)>,
    corrector: Option<PrimitiveKind>,
}

impl Direction {
    fn forward(primitives: &PaginationPrimitives) -> Self {
        Self {
            single: primitives.has(PrimitiveKind::GoNext).then_some(PrimitiveKind::GoNext),
            bulk: (primitives.has(PrimitiveKind::GoNextBulk) && primitives.next_bulk_pages > 0)
                .then_some((PrimitiveKind::GoNextBulk, primitives.next_bulk_pages)),
            corrector: primitives
                .has(PrimitiveKind::GoPrevious)
                .then_some(PrimitiveKind::GoPrevious),
        }
    }

    fn backward(primitives: &PaginationPrimitives) -> Self {
        Self {
            single: primitives
                .has(PrimitiveKind::GoPrevious)
                .then_some(PrimitiveKind::GoPrevious),
            bulk: (primitives.has(PrimitiveKind::GoPreviousBulk) && primitives.previous_bulk_pages > 0)
                .then_some((PrimitiveKind::GoPreviousBulk, primitives.previous_bulk_pages)),
            corrector: primitives.has(PrimitiveKind::GoNext).then_some(PrimitiveKind::GoNext),
        }
    }
}

fn push(path: &mut Vec<PathStep>, primitive: PrimitiveKind, count: u32) {
    if count > 0 {
        path.push(PathStep::new(primitive, count));
    }
}

/// Bulk calls rounded down, remainder with the single primitive
fn plan_undershoot(distance: u32, direction: &Direction, bulk: (PrimitiveKind, u32)) -> Option<Vec<PathStep>> {
    let (bulk_kind, size) = bulk;
    let remainder = distance % size;
    if remainder > 0 && direction.single.is_none() {
        return None;
    }
    let mut path = Vec::new();
    push(&mut path, bulk_kind, distance / size);
    if let Some(single) = direction.single {
        push(&mut path, single, remainder);
    }
    Some(path)
}

/// Bulk calls rounded up, overshoot corrected in the opposite direction
fn plan_overshoot(distance: u32, direction: &Direction, bulk: (PrimitiveKind, u32)) -> Option<Vec<PathStep>> {
    let (bulk_kind, size) = bulk;
    let corrector = direction.corrector?;
    let calls = distance.div_ceil(size);
    let overshoot = calls * size - distance;
    if overshoot == 0 {
        return None;
    }
    let mut path = Vec::new();
    push(&mut path, bulk_kind, calls);
    push(&mut path, corrector, overshoot);
    Some(path)
}

fn plan_direction(distance: u32, direction: &Direction) -> Vec<PathStep> {
    let Some(bulk) = direction.bulk else {
        let mut path = Vec::new();
        if let Some(single) = direction.single {
            push(&mut path, single, distance);
        }
        return path;
    };

    match (
        plan_undershoot(distance, direction, bulk),
        plan_overshoot(distance, direction, bulk),
    ) {
        (Some(a), Some(b)) if plan_cost(&b) < plan_cost(&a) => b,
        (Some(a), _) => a,
        (None, Some(b)) => b,
        (None, None) => Vec::new(),
    }
}

/// Plan the primitive calls that move the view from `current` to `target`.
///
/// - equal pages: empty plan
/// - `go_to_page` configured: one direct jump
/// - otherwise bulk-then-single in the travel direction, or bulk overshoot
///   plus single steps back when that is strictly cheaper and a corrector
///   primitive exists
///
/// An empty plan for distinct pages means no primitive combination reaches
/// the target; callers fall back to `go_to_first` and forward steps.
#[must_use]
pub fn plan_navigation_path(current: usize, target: usize, primitives: &PaginationPrimitives) -> Vec<PathStep> {
    if current == target {
        return Vec::new();
    }
    if primitives.has(PrimitiveKind::GoToPage) {
        return vec![PathStep::new(PrimitiveKind::GoToPage, 1)];
    }

    let distance = u32::try_from(current.abs_diff(target)).unwrap_or(u32::MAX);
    let direction = if target > current {
        Direction::forward(primitives)
    } else {
        Direction::backward(primitives)
    };
    let path = plan_direction(distance, &direction);
    trace!(current, target, cost = plan_cost(&path), "Planned navigation path");
    path
}

// =============================================================================
// EXECUTION
// =============================================================================

fn apply_move(page: &AtomicUsize, kind: PrimitiveKind, target: usize, movement: PageMove) -> usize {
    let current = page.load(Ordering::SeqCst);
    let next = match kind {
        PrimitiveKind::GoToPage => target,
        PrimitiveKind::GoToFirst => 0,
        PrimitiveKind::GoNext | PrimitiveKind::GoNextBulk => current + movement.pages as usize,
        PrimitiveKind::GoPrevious | PrimitiveKind::GoPreviousBulk => {
            current.saturating_sub(movement.pages as usize)
        }
    };
    page.store(next, Ordering::SeqCst);
    next
}

async fn call(
    primitives: &PaginationPrimitives,
    kind: PrimitiveKind,
    ctx: &PaginationContext,
    page: &AtomicUsize,
    target: usize,
) -> TableResult<PageMove> {
    let at = ctx.at_page(page.load(Ordering::SeqCst));
    let movement = match kind {
        PrimitiveKind::GoToPage => primitives.go_to(at, target).await?,
        other => primitives.step(other, at).await?,
    };
    if movement.moved {
        let now = apply_move(page, kind, target, movement);
        trace!(primitive = %kind, %movement, page = now, "Navigation step");
    }
    Ok(movement)
}

/// Run a plan, updating `page` after every call with the reported displacement.
///
/// A call that reports no movement aborts the plan with a navigation error;
/// `page` then reflects the partial position reached.
pub async fn execute_navigation_path(
    path: &[PathStep],
    primitives: &PaginationPrimitives,
    ctx: &PaginationContext,
    page: &AtomicUsize,
    target: usize,
) -> TableResult<()> {
    for step in path {
        for attempt in 0..step.count {
            let movement = call(primitives, step.primitive, ctx, page, target).await?;
            if !movement.moved {
                return Err(TableError::Navigation {
                    message: format!(
                        "{} reported no movement at page {} (call {} of {}) while navigating to page {target}",
                        step.primitive,
                        page.load(Ordering::SeqCst),
                        attempt + 1,
                        step.count
                    ),
                });
            }
        }
    }
    Ok(())
}

/// Next relative primitive to try when a windowed jump misses
fn retry_step(current: usize, target: usize, primitives: &PaginationPrimitives) -> Option<PrimitiveKind> {
    let distance = current.abs_diff(target);
    let (bulk, size, single, corrector) = if target > current {
        (
            PrimitiveKind::GoNextBulk,
            primitives.next_bulk_pages as usize,
            PrimitiveKind::GoNext,
            PrimitiveKind::GoPrevious,
        )
    } else {
        (
            PrimitiveKind::GoPreviousBulk,
            primitives.previous_bulk_pages as usize,
            PrimitiveKind::GoPrevious,
            PrimitiveKind::GoNext,
        )
    };

    // Overshooting is only worth it when it lands strictly closer and can be
    // corrected; this keeps the loop from oscillating.
    let bulk_fits = size > 0 && size <= distance;
    let bulk_corrects = size > 0 && size - distance.min(size) < distance && primitives.has(corrector);
    if primitives.has(bulk) && (bulk_fits || bulk_corrects) {
        Some(bulk)
    } else if primitives.has(single) {
        Some(single)
    } else if primitives.has(bulk) && size > 0 {
        Some(bulk)
    } else {
        None
    }
}

/// Reach `target` through a `go_to_page` primitive that may only accept
/// pages inside a visible window.
///
/// Each iteration tries the jump; on a miss it takes one relative step
/// towards the target and tries again.
pub async fn execute_navigation_with_go_to_page_retry(
    target: usize,
    primitives: &PaginationPrimitives,
    ctx: &PaginationContext,
    page: &AtomicUsize,
) -> TableResult<()> {
    for iteration in 0..MAX_GO_TO_PAGE_ATTEMPTS {
        let current = page.load(Ordering::SeqCst);
        if current == target {
            return Ok(());
        }

        let jump = call(primitives, PrimitiveKind::GoToPage, ctx, page, target).await?;
        if jump.moved {
            debug!(target, iteration, "go_to_page reached target");
            return Ok(());
        }

        let Some(kind) = retry_step(current, target, primitives) else {
            return Err(TableError::Navigation {
                message: format!(
                    "go_to_page could not reach page {target} from page {current} \
                     and no primitive can step towards it"
                ),
            });
        };
        let movement = call(primitives, kind, ctx, page, target).await?;
        if !movement.moved {
            return Err(TableError::Navigation {
                message: format!(
                    "go_to_page could not reach page {target}; {kind} reported no movement at page {current}"
                ),
            });
        }
    }

    Err(TableError::Navigation {
        message: format!(
            "go_to_page did not reach page {target} within {MAX_GO_TO_PAGE_ATTEMPTS} attempts (stopped at page {})",
            page.load(Ordering::SeqCst)
        ),
    })
}

/// Move the view to `target` with whatever the primitives allow.
///
/// Order: windowed `go_to_page` retry, then a planned relative path, then
/// `go_to_first` followed by forward steps.
pub async fn navigate_to_page(
    target: usize,
    primitives: &PaginationPrimitives,
    ctx: &PaginationContext,
    page: &AtomicUsize,
) -> TableResult<()> {
    let current = page.load(Ordering::SeqCst);
    if current == target {
        return Ok(());
    }

    if primitives.has(PrimitiveKind::GoToPage) {
        return execute_navigation_with_go_to_page_retry(target, primitives, ctx, page).await;
    }

    let path = plan_navigation_path(current, target, primitives);
    if !path.is_empty() {
        debug!(current, target, steps = path.len(), cost = plan_cost(&path), "Navigating by plan");
        return execute_navigation_path(&path, primitives, ctx, page, target).await;
    }

    let forward = plan_navigation_path(0, target, primitives);
    if !primitives.has(PrimitiveKind::GoToFirst) || (target > 0 && forward.is_empty()) {
        return Err(TableError::Navigation {
            message: format!(
                "Cannot navigate from page {current} to page {target}: no go_to_page, no usable \
                 path, and no go_to_first with forward primitives to fall back on"
            ),
        });
    }

    warn!(current, target, "Falling back to go_to_first");
    let reset = call(primitives, PrimitiveKind::GoToFirst, ctx, page, 0).await?;
    if !reset.moved && current != 0 {
        return Err(TableError::Navigation {
            message: format!("go_to_first reported no movement from page {current}"),
        });
    }
    page.store(0, Ordering::SeqCst);
    execute_navigation_path(&forward, primitives, ctx, page, target).await
}
