//! Cell fill strategies.

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::locator::{LocatorRef, Selector};
use crate::result::TableResult;

/// Selector for form controls inside a cell, in detection order
pub const INPUT_QUERY: &str = "input, select, textarea, [contenteditable]";

/// Everything a fill strategy needs for one cell
#[derive(Debug, Clone)]
pub struct FillContext {
    /// The cell to write into
    pub cell: LocatorRef,
    /// Owning row
    pub row: LocatorRef,
    /// Column name
    pub column: String,
    /// Column index
    pub column_index: usize,
    /// Desired value
    pub value: Value,
    /// Where the real input lives inside the cell, if not auto-detected
    pub input_selector: Option<Selector>,
}

/// Writes a value into a cell
#[async_trait]
pub trait FillStrategy: Send + Sync + fmt::Debug {
    /// Apply `ctx.value` to `ctx.cell`
    async fn fill(&self, ctx: &FillContext) -> TableResult<()>;
}

/// Detects the control kind and applies the matching interaction:
/// checkbox/radio toggle, `<select>` option, or text fill.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoFill;

impl AutoFill {
    async fn target(ctx: &FillContext) -> TableResult<LocatorRef> {
        if let Some(selector) = &ctx.input_selector {
            return Ok(selector.resolve(&ctx.cell).first());
        }
        let tag = ctx.cell.tag_name().await?;
        if matches!(tag.as_str(), "input" | "select" | "textarea") {
            return Ok(Arc::clone(&ctx.cell));
        }
        let nested = ctx.cell.locator(INPUT_QUERY).first();
        if nested.count().await? > 0 {
            Ok(nested)
        } else {
            Ok(Arc::clone(&ctx.cell))
        }
    }
}

#[async_trait]
impl FillStrategy for AutoFill {
    async fn fill(&self, ctx: &FillContext) -> TableResult<()> {
        let target = Self::target(ctx).await?;
        let tag = target.tag_name().await?;
        let input_type = target.get_attribute("type").await?.unwrap_or_default();
        match (tag.as_str(), input_type.as_str()) {
            ("input", "checkbox" | "radio") => {
                let desired = value_as_bool(&ctx.value);
                if target.is_checked().await? != desired {
                    target.click().await?;
                } else {
                    debug!(column = %ctx.column, desired, "Checkbox already in desired state");
                }
                Ok(())
            }
            ("select", _) => target.select_option(&value_as_text(&ctx.value)).await,
            _ => target.fill(&value_as_text(&ctx.value)).await,
        }
    }
}

/// Default strategy
#[must_use]
pub fn auto() -> Arc<dyn FillStrategy> {
    Arc::new(AutoFill)
}

/// String form of a value for text inputs and selects
#[must_use]
pub fn value_as_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Truthiness of a value for checkboxes
#[must_use]
pub fn value_as_bool(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::String(text) => matches!(text.trim().to_ascii_lowercase().as_str(), "true" | "yes" | "on" | "1"),
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::Null => false,
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::TableLocator;
    use crate::mock::{el, MockPage};
    use serde_json::json;

    fn row_page() -> MockPage {
        let page = MockPage::new();
        let _ = page.mount(
            el("table").child(
                el("tr")
                    .child(el("td").child(el("input").attr("type", "text").value("old")))
                    .child(el("td").child(el("input").attr("type", "checkbox").checked(true)))
                    .child(el("td").child(el("select")))
                    .child(el("td").child(el("div").attr("contenteditable", "true")))
                    .child(el("td").child(el("span").text("label")).child(el("input").class("real"))),
            ),
        );
        page
    }

    fn context(page: &MockPage, column_index: usize, value: Value) -> FillContext {
        let row = page.locator("tr");
        FillContext {
            cell: row.locator("td").nth(column_index),
            row,
            column: format!("c{column_index}"),
            column_index,
            value,
            input_selector: None,
        }
    }

    #[tokio::test]
    async fn test_text_input() {
        let page = row_page();
        AutoFill.fill(&context(&page, 0, json!("new"))).await.unwrap();
        assert_eq!(page.locator("input[type=text]").input_value().await.unwrap(), "new");
    }

    #[tokio::test]
    async fn test_checkbox_only_clicked_when_state_differs() {
        let page = row_page();
        AutoFill.fill(&context(&page, 1, json!(true))).await.unwrap();
        assert_eq!(page.action_count("click"), 0);
        AutoFill.fill(&context(&page, 1, json!(false))).await.unwrap();
        assert_eq!(page.action_count("click"), 1);
        assert!(!page.locator("input[type=checkbox]").is_checked().await.unwrap());
    }

    #[tokio::test]
    async fn test_select_and_contenteditable() {
        let page = row_page();
        AutoFill.fill(&context(&page, 2, json!("admin"))).await.unwrap();
        AutoFill.fill(&context(&page, 3, json!(42))).await.unwrap();
        assert_eq!(page.locator("select").input_value().await.unwrap(), "admin");
        assert_eq!(page.locator("[contenteditable]").inner_text().await.unwrap(), "42");
    }

    #[tokio::test]
    async fn test_input_selector_override() {
        let page = row_page();
        let mut ctx = context(&page, 4, json!("x"));
        ctx.input_selector = Some(Selector::query("input.real"));
        AutoFill.fill(&ctx).await.unwrap();
        assert_eq!(page.locator("input.real").input_value().await.unwrap(), "x");
    }

    #[test]
    fn test_value_coercions() {
        assert!(value_as_bool(&json!("yes")));
        assert!(!value_as_bool(&json!(0)));
        assert_eq!(value_as_text(&json!(1.5)), "1.5");
        assert_eq!(value_as_text(&json!("a")), "a");
    }
}
