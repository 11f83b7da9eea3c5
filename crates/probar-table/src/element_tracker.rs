//! Recycled-row detection for virtualised lists.
//!
//! A tracker remembers, per element identity, the content signature it had
//! when last processed. A row is "new" when its element was never seen or
//! when a recycled element now shows different content. One tracker lives
//! for exactly one iteration call and is released when dropped, whichever
//! way the call exits.

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::locator::LocatorRef;
use crate::result::TableResult;

/// Per-call arena of element identity to content signature
#[derive(Debug)]
pub struct ElementTracker {
    session: Uuid,
    seen: HashMap<String, String>,
}

impl Default for ElementTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ElementTracker {
    /// Start a fresh tracking session
    #[must_use]
    pub fn new() -> Self {
        let session = Uuid::new_v4();
        trace!(%session, "Element tracker started");
        Self {
            session,
            seen: HashMap::new(),
        }
    }

    /// Session identifier (appears in traces)
    #[must_use]
    pub const fn session(&self) -> Uuid {
        self.session
    }

    /// Number of tracked elements
    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    /// Whether nothing was tracked yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Indices of `rows` that were not processed before, recording them
    pub async fn new_indices(&mut self, rows: &LocatorRef) -> TableResult<Vec<usize>> {
        let count = rows.count().await?;
        let mut fresh = Vec::new();
        for index in 0..count {
            let row = rows.nth(index);
            let text = row.inner_text().await?;
            let signature = signature(&text);
            let key = match row.element_key().await? {
                Some(key) => key,
                None => format!("content:{signature}"),
            };
            let previous = self.seen.insert(key, signature.clone());
            if previous.as_deref() != Some(signature.as_str()) {
                fresh.push(index);
            }
        }
        trace!(session = %self.session, total = count, fresh = fresh.len(), "Tracked rows");
        Ok(fresh)
    }
}

impl Drop for ElementTracker {
    fn drop(&mut self) {
        debug!(session = %self.session, tracked = self.seen.len(), "Element tracker released");
        self.seen.clear();
    }
}

/// Hex SHA-256 of a row's rendered text
#[must_use]
pub fn signature(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let result = hasher.finalize();
    format!("{result:x}")
}
