//! Column sorting.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::locator::LocatorRef;
use crate::result::{TableError, TableResult};

/// Sort order of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Ascending
    Ascending,
    /// Descending
    Descending,
    /// Unsorted
    #[default]
    None,
}

impl SortDirection {
    /// Parse an `aria-sort` value; unknown values mean unsorted
    #[must_use]
    pub fn from_aria(value: &str) -> Self {
        match value.trim() {
            "ascending" => Self::Ascending,
            "descending" => Self::Descending,
            _ => Self::None,
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ascending => "ascending",
            Self::Descending => "descending",
            Self::None => "none",
        };
        f.write_str(name)
    }
}

/// The column a sorting call targets
#[derive(Debug, Clone)]
pub struct SortContext {
    /// Table root
    pub root: LocatorRef,
    /// Header cell of the column
    pub header_cell: LocatorRef,
    /// Column name
    pub column: String,
    /// Column index
    pub column_index: usize,
}

/// Reads and changes the sort order of a column
#[async_trait]
pub trait SortingStrategy: Send + Sync + fmt::Debug {
    /// Bring the column into `direction`
    async fn apply(&self, ctx: &SortContext, direction: SortDirection) -> TableResult<()>;

    /// Current order of the column
    async fn state(&self, ctx: &SortContext) -> TableResult<SortDirection>;
}

/// `aria-sort` on the header cell; clicking the header cycles the order
#[derive(Debug, Clone, Copy)]
pub struct AriaSort {
    /// Upper bound on header clicks per `apply`
    pub max_clicks: usize,
}

impl Default for AriaSort {
    fn default() -> Self {
        Self { max_clicks: 3 }
    }
}

#[async_trait]
impl SortingStrategy for AriaSort {
    async fn apply(&self, ctx: &SortContext, direction: SortDirection) -> TableResult<()> {
        for clicks in 0..=self.max_clicks {
            let current = self.state(ctx).await?;
            if current == direction {
                debug!(column = %ctx.column, %direction, clicks, "Column sorted");
                return Ok(());
            }
            if clicks < self.max_clicks {
                ctx.header_cell.click().await?;
            }
        }
        Err(TableError::InvalidState {
            message: format!(
                "Column \"{}\" did not reach sort order {direction} after {} header clicks",
                ctx.column, self.max_clicks
            ),
        })
    }

    async fn state(&self, ctx: &SortContext) -> TableResult<SortDirection> {
        let value = ctx.header_cell.get_attribute("aria-sort").await?;
        Ok(value.map_or(SortDirection::None, |v| SortDirection::from_aria(&v)))
    }
}

/// Default `aria-sort` strategy
#[must_use]
pub fn aria_sort() -> Arc<dyn SortingStrategy> {
    Arc::new(AriaSort::default())
}
