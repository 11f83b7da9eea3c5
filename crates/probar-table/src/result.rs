//! Result and error types for probar-table.

use thiserror::Error;

/// Result type for smart-table operations
pub type TableResult<T> = Result<T, TableError>;

/// Errors that can occur while mapping, searching or paging a table
#[derive(Debug, Error)]
pub enum TableError {
    /// Header mapping produced an unusable map (no columns)
    #[error("Initialization error: {message}")]
    Initialization {
        /// Error message
        message: String,
    },

    /// Two or more header cells resolved to the same column name
    #[error("Initialization error: {message}")]
    DuplicateColumns {
        /// Each repeated name, once, in first-seen order
        columns: Vec<String>,
        /// Error message
        message: String,
    },

    /// A column name was referenced that the header map does not contain
    #[error("{message}")]
    ColumnNotFound {
        /// The requested column
        column: String,
        /// Full message including suggestions
        message: String,
    },

    /// More than one row matched a lookup that requires exactly one
    #[error("Ambiguous row match: {message}")]
    AmbiguousRow {
        /// Number of rows matched
        count: usize,
        /// Page index the matches were found on
        page: usize,
        /// Error message with sampled rows
        message: String,
    },

    /// A pagination primitive broke its contract or a required primitive is missing
    #[error("Pagination error: {message}")]
    Pagination {
        /// Error message
        message: String,
    },

    /// Re-navigating to a row or cell failed
    #[error("Navigation error: {message}")]
    Navigation {
        /// Error message
        message: String,
    },

    /// A bounded wait expired
    #[error("{operation} timed out after {ms}ms")]
    Timeout {
        /// What was being waited for
        operation: String,
        /// Timeout in milliseconds
        ms: u64,
    },

    /// The host automation layer failed to perform an action
    #[error("Locator error: {message}")]
    Locator {
        /// Error message
        message: String,
    },

    /// Operation called in a state where it cannot run
    #[error("Invalid state: {message}")]
    InvalidState {
        /// Error message
        message: String,
    },

    /// Invalid configuration
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl TableError {
    /// Build a host-side locator error
    pub fn locator(message: impl Into<String>) -> Self {
        Self::Locator {
            message: message.into(),
        }
    }

    /// Build a timeout error
    pub fn timeout(operation: impl Into<String>, ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            ms,
        }
    }

    /// Whether this error came from an expired wait
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    /// Whether this error reports an ambiguous row lookup
    #[must_use]
    pub const fn is_ambiguous(&self) -> bool {
        matches!(self, Self::AmbiguousRow { .. })
    }

    /// Whether header mapping failed on repeated column names
    #[must_use]
    pub const fn is_duplicate_columns(&self) -> bool {
        matches!(self, Self::DuplicateColumns { .. })
    }

    /// Whether this error reports an unknown column
    #[must_use]
    pub const fn is_column_not_found(&self) -> bool {
        matches!(self, Self::ColumnNotFound { .. })
    }
}
