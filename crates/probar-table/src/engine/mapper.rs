//! Header discovery: the column-name to column-index map.
//!
//! ## State machine
//!
//! ```text
//! get_map ─► cached? ──yes──► return
//!               │no
//!               ▼
//!        probe header visible (best effort)
//!               ▼
//!        header loading? ──yes──► sleep, retry
//!               ▼no
//!        extract + build ──err──► record, sleep, retry
//!               ▼ok
//!             cache
//! ```
//!
//! The deadline turns the last recorded error (or a timeout) into a failure.
//! Duplicate names are reported at once: re-reading the same header texts
//! cannot fix them.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

use crate::config::{HeaderTransformer, TableConfig};
use crate::locator::{LocatorRef, WaitState};
use crate::result::{TableError, TableResult};
use crate::strategies::{HeaderContext, LoadingContext};
use crate::suggest;

/// Prefix for generated names of empty header cells
pub const GENERATED_COLUMN_PREFIX: &str = "__col_";

// =============================================================================
// HEADER MAP
// =============================================================================

/// Ordered column names; a name's position is its column index
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HeaderMap {
    names: Vec<String>,
}

impl HeaderMap {
    /// Build from final names, validating them
    pub fn from_names(names: Vec<String>) -> TableResult<Self> {
        if names.is_empty() {
            return Err(TableError::Initialization {
                message: "No columns found".to_string(),
            });
        }
        let mut seen = HashSet::new();
        let mut duplicates: Vec<String> = Vec::new();
        for name in &names {
            if !seen.insert(name) && !duplicates.contains(name) {
                duplicates.push(name.clone());
            }
        }
        if !duplicates.is_empty() {
            let listed = duplicates
                .iter()
                .map(|name| format!("\"{name}\""))
                .collect::<Vec<_>>()
                .join(", ");
            return Err(TableError::DuplicateColumns {
                message: format!(
                    "Duplicate column names found: {listed}. \
                     Use a header transformer to make column names unique."
                ),
                columns: duplicates,
            });
        }
        Ok(Self { names })
    }

    /// Post-process raw header texts: trim, name empty cells `__col_<index>`,
    /// apply the transformer (which sees the names accepted so far), validate.
    pub fn build(
        raw: &[String],
        transformer: Option<&HeaderTransformer>,
        selector: &str,
    ) -> TableResult<Self> {
        if raw.is_empty() {
            return Err(TableError::Initialization {
                message: format!(
                    "No columns found using header selector \"{selector}\". \
                     Check that it matches the header cells of the table."
                ),
            });
        }
        let mut names: Vec<String> = Vec::with_capacity(raw.len());
        for (index, text) in raw.iter().enumerate() {
            let trimmed = text.trim();
            let base = if trimmed.is_empty() {
                format!("{GENERATED_COLUMN_PREFIX}{index}")
            } else {
                trimmed.to_string()
            };
            let name = match transformer {
                Some(transform) => transform(&base, index, &names),
                None => base,
            };
            names.push(name);
        }
        Self::from_names(names)
    }

    /// Index of `name`, or a resolution error with suggestions
    pub fn index_of(&self, name: &str) -> TableResult<usize> {
        self.get(name)
            .ok_or_else(|| suggest::column_not_found(name, &self.names))
    }

    /// Index of `name`
    #[must_use]
    pub fn get(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Name of the column at `index`
    #[must_use]
    pub fn name_at(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    /// Column names in index order
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// `(name, index)` pairs in index order
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.names.iter().enumerate().map(|(index, name)| (name.as_str(), index))
    }

    /// Number of columns
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Always false for a validated map
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Copy with the column at `index` renamed by `rename(current_name)`
    pub fn renamed<F>(&self, index: usize, rename: F) -> TableResult<Self>
    where
        F: FnOnce(&str) -> String,
    {
        let current = self.name_at(index).ok_or_else(|| TableError::InvalidState {
            message: format!("Column index {index} out of range (table has {} columns)", self.len()),
        })?;
        let mut names = self.names.clone();
        names[index] = rename(current);
        Self::from_names(names)
    }
}

// =============================================================================
// TABLE MAPPER
// =============================================================================

/// Owns and caches the header map of one table
#[derive(Debug)]
pub struct TableMapper {
    root: LocatorRef,
    config: Arc<TableConfig>,
    cache: Mutex<Option<Arc<HeaderMap>>>,
}

impl TableMapper {
    /// Create a mapper; nothing is read until [`TableMapper::get_map`]
    #[must_use]
    pub fn new(root: LocatorRef, config: Arc<TableConfig>) -> Self {
        Self {
            root,
            config,
            cache: Mutex::new(None),
        }
    }

    /// Cached map, if any
    #[must_use]
    pub fn cached(&self) -> Option<Arc<HeaderMap>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Whether a map is cached
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.cached().is_some()
    }

    /// Drop the cached map
    pub fn clear(&self) {
        *self.cache.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Swap in a new map in one step
    pub fn replace(&self, map: HeaderMap) -> Arc<HeaderMap> {
        let map = Arc::new(map);
        *self.cache.lock().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&map));
        map
    }

    /// Header cell collection
    #[must_use]
    pub fn headers(&self) -> LocatorRef {
        self.config.header_selector.resolve(&self.root)
    }

    /// Return the cached map, or discover it within `timeout`
    /// (default: the configured header budget).
    pub async fn get_map(&self, timeout: Option<Duration>) -> TableResult<Arc<HeaderMap>> {
        if let Some(map) = self.cached() {
            return Ok(map);
        }

        let timeouts = self.config.timeouts;
        let budget = timeout.unwrap_or_else(|| timeouts.header());
        let start = Instant::now();
        let headers = self.headers();
        let mut last_error: Option<TableError> = None;
        let mut attempt = 0usize;

        loop {
            attempt += 1;
            if let Err(err) = headers
                .first()
                .wait_for(WaitState::Visible, timeouts.header_visible_probe())
                .await
            {
                trace!(attempt, error = %err, "Header not visible yet");
            }

            match self.try_build(&headers).await {
                Ok(Some(map)) => {
                    debug!(attempt, columns = map.len(), "Header map built");
                    return Ok(self.replace(map));
                }
                Ok(None) => trace!(attempt, "Header still loading"),
                Err(err) if err.is_duplicate_columns() => return Err(err),
                Err(err) => {
                    debug!(attempt, error = %err, "Header mapping attempt failed");
                    last_error = Some(err);
                }
            }

            if start.elapsed() >= budget {
                break;
            }
            tokio::time::sleep(timeouts.header_retry()).await;
        }

        let err = last_error.unwrap_or_else(|| {
            TableError::timeout("Header stabilization", budget.as_millis() as u64)
        });
        warn!(error = %err, "Header mapping gave up");
        Err(err)
    }

    /// Force a fresh scan
    pub async fn remap_headers(&self) -> TableResult<Arc<HeaderMap>> {
        self.clear();
        self.get_map(None).await
    }

    async fn try_build(&self, headers: &LocatorRef) -> TableResult<Option<HeaderMap>> {
        let strategies = &self.config.strategies;
        if let Some(check) = &strategies.loading.is_header_loading {
            let ctx = LoadingContext {
                root: Arc::clone(&self.root),
                headers: Arc::clone(headers),
                rows: self.config.row_selector.resolve(&self.root),
                row: None,
            };
            if check.is_loading(&ctx).await? {
                return Ok(None);
            }
        }
        let ctx = HeaderContext {
            root: Arc::clone(&self.root),
            headers: Arc::clone(headers),
        };
        let raw = strategies.header.extract(&ctx).await?;
        HeaderMap::build(
            &raw,
            self.config.header_transformer.as_ref(),
            &self.config.header_selector.describe(),
        )
        .map(Some)
    }
}
