//! Normalization of pagination step results.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::result::{TableError, TableResult};

/// What a pagination primitive reported after one call
#[derive(Debug, Clone, PartialEq)]
pub enum StepResult {
    /// `false`: no movement, `true`: moved one page
    Moved(bool),
    /// Number of pages jumped; zero or negative means no movement
    Pages(i64),
    /// Untyped value from a scripted host; must be a boolean or a number
    Raw(serde_json::Value),
}

impl From<bool> for StepResult {
    fn from(moved: bool) -> Self {
        Self::Moved(moved)
    }
}

impl From<u32> for StepResult {
    fn from(pages: u32) -> Self {
        Self::Pages(i64::from(pages))
    }
}

impl From<i64> for StepResult {
    fn from(pages: i64) -> Self {
        Self::Pages(pages)
    }
}

impl From<serde_json::Value> for StepResult {
    fn from(value: serde_json::Value) -> Self {
        Self::Raw(value)
    }
}

/// Normalized displacement of one pagination call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PageMove {
    /// Whether the view moved at all
    pub moved: bool,
    /// Pages advanced (0 when not moved)
    pub pages: u32,
}

impl PageMove {
    /// No movement
    pub const NONE: Self = Self {
        moved: false,
        pages: 0,
    };

    /// Moved by `pages` (zero means not moved)
    #[must_use]
    pub const fn by(pages: u32) -> Self {
        Self {
            moved: pages > 0,
            pages,
        }
    }
}

impl fmt::Display for PageMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.moved {
            write!(f, "moved {} page(s)", self.pages)
        } else {
            f.write_str("no movement")
        }
    }
}

/// Normalize a step result into a [`PageMove`].
///
/// Numbers count as movement only when positive and keep their magnitude.
/// A raw value that is neither a boolean nor a number is a contract violation
/// of the primitive named `strategy_name`.
pub fn validate_pagination_result(result: StepResult, strategy_name: &str) -> TableResult<PageMove> {
    match result {
        StepResult::Moved(moved) => Ok(if moved { PageMove::by(1) } else { PageMove::NONE }),
        StepResult::Pages(pages) => Ok(pages_to_move(pages)),
        StepResult::Raw(serde_json::Value::Bool(moved)) => {
            validate_pagination_result(StepResult::Moved(moved), strategy_name)
        }
        StepResult::Raw(serde_json::Value::Number(number)) => {
            let pages = number
                .as_i64()
                .or_else(|| number.as_f64().map(|f| f.trunc() as i64))
                .unwrap_or(0);
            Ok(pages_to_move(pages))
        }
        StepResult::Raw(other) => Err(TableError::Pagination {
            message: format!(
                "Pagination strategy '{strategy_name}' returned an invalid result: {other}. \
                 Expected a boolean (moved or not) or a number (pages moved)."
            ),
        }),
    }
}

fn pages_to_move(pages: i64) -> PageMove {
    if pages > 0 {
        PageMove::by(u32::try_from(pages).unwrap_or(u32::MAX))
    } else {
        PageMove::NONE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bool_results() {
        assert_eq!(
            validate_pagination_result(true.into(), "go_next").unwrap(),
            PageMove { moved: true, pages: 1 }
        );
        assert_eq!(
            validate_pagination_result(false.into(), "go_next").unwrap(),
            PageMove::NONE
        );
    }

    #[test]
    fn test_numeric_results_keep_magnitude() {
        let bulk = validate_pagination_result(StepResult::Pages(10), "go_next_bulk").unwrap();
        assert!(bulk.moved);
        assert_eq!(bulk.pages, 10);
        assert_eq!(
            validate_pagination_result(StepResult::Pages(0), "go_next_bulk").unwrap(),
            PageMove::NONE
        );
        assert_eq!(
            validate_pagination_result(StepResult::Pages(-3), "go_next_bulk").unwrap(),
            PageMove::NONE
        );
    }

    #[test]
    fn test_raw_json_results() {
        assert_eq!(
            validate_pagination_result(json!(3).into(), "go_to_page").unwrap(),
            PageMove::by(3)
        );
        assert_eq!(
            validate_pagination_result(json!(true).into(), "go_to_page").unwrap(),
            PageMove::by(1)
        );
    }

    #[test]
    fn test_invalid_raw_result_names_strategy() {
        let err = validate_pagination_result(json!("next").into(), "go_next").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("'go_next'"));
        assert!(message.contains("\"next\""));
        assert!(matches!(err, TableError::Pagination { .. }));
    }
}
