//! Loading predicates: is the header, the table or a single row still busy?

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use crate::locator::{LocatorRef, Selector};
use crate::result::TableResult;

/// What a loading check can look at
#[derive(Debug, Clone)]
pub struct LoadingContext {
    /// Table root
    pub root: LocatorRef,
    /// Header cell collection
    pub headers: LocatorRef,
    /// Row collection
    pub rows: LocatorRef,
    /// The row under test (row checks only)
    pub row: Option<LocatorRef>,
}

impl LoadingContext {
    /// Context for a specific row
    #[must_use]
    pub fn for_row(&self, row: LocatorRef) -> Self {
        Self {
            row: Some(row),
            ..self.clone()
        }
    }
}

/// A single loading predicate
#[async_trait]
pub trait LoadingCheck: Send + Sync + fmt::Debug {
    /// `true` while the target is still loading
    async fn is_loading(&self, ctx: &LoadingContext) -> TableResult<bool>;
}

/// The three optional loading predicates a table consults
#[derive(Debug, Clone, Default)]
pub struct LoadingStrategies {
    /// Header is not yet stable; the mapper retries while true
    pub is_header_loading: Option<Arc<dyn LoadingCheck>>,
    /// Whole table is loading; the row finder waits while true
    pub is_table_loading: Option<Arc<dyn LoadingCheck>>,
    /// A row is a skeleton placeholder; scans skip it
    pub is_row_loading: Option<Arc<dyn LoadingCheck>>,
}

impl LoadingStrategies {
    /// No predicates
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the header predicate
    #[must_use]
    pub fn with_header_loading(mut self, check: Arc<dyn LoadingCheck>) -> Self {
        self.is_header_loading = Some(check);
        self
    }

    /// Set the table predicate
    #[must_use]
    pub fn with_table_loading(mut self, check: Arc<dyn LoadingCheck>) -> Self {
        self.is_table_loading = Some(check);
        self
    }

    /// Set the row predicate
    #[must_use]
    pub fn with_row_loading(mut self, check: Arc<dyn LoadingCheck>) -> Self {
        self.is_row_loading = Some(check);
        self
    }
}

/// A spinner matched by `selector` (relative to the root) is visible
#[derive(Debug, Clone)]
pub struct HasSpinner {
    /// Spinner selector
    pub selector: Selector,
}

#[async_trait]
impl LoadingCheck for HasSpinner {
    async fn is_loading(&self, ctx: &LoadingContext) -> TableResult<bool> {
        let spinner = self.selector.resolve(&ctx.root);
        Ok(spinner.count().await? > 0 && spinner.is_visible().await?)
    }
}

/// Some header text contains `marker` (e.g. "Loading...")
#[derive(Debug, Clone)]
pub struct HeaderHasText {
    /// Marker text
    pub marker: String,
}

#[async_trait]
impl LoadingCheck for HeaderHasText {
    async fn is_loading(&self, ctx: &LoadingContext) -> TableResult<bool> {
        let texts = ctx.headers.all_inner_texts().await?;
        Ok(texts.iter().any(|text| text.contains(&self.marker)))
    }
}

/// The row carries `class` (e.g. "skeleton")
#[derive(Debug, Clone)]
pub struct RowHasClass {
    /// Class name
    pub class: String,
}

#[async_trait]
impl LoadingCheck for RowHasClass {
    async fn is_loading(&self, ctx: &LoadingContext) -> TableResult<bool> {
        let Some(row) = &ctx.row else {
            return Ok(false);
        };
        let classes = row.get_attribute("class").await?.unwrap_or_default();
        Ok(classes.split_whitespace().any(|class| class == self.class))
    }
}

/// The row's text contains `marker`
#[derive(Debug, Clone)]
pub struct RowHasText {
    /// Marker text
    pub marker: String,
}

#[async_trait]
impl LoadingCheck for RowHasText {
    async fn is_loading(&self, ctx: &LoadingContext) -> TableResult<bool> {
        let Some(row) = &ctx.row else {
            return Ok(false);
        };
        Ok(row.inner_text().await?.contains(&self.marker))
    }
}

/// Loading while a spinner is visible
#[must_use]
pub fn has_spinner(selector: impl Into<Selector>) -> Arc<dyn LoadingCheck> {
    Arc::new(HasSpinner {
        selector: selector.into(),
    })
}

/// Loading while a header contains `marker`
#[must_use]
pub fn header_has_text(marker: impl Into<String>) -> Arc<dyn LoadingCheck> {
    Arc::new(HeaderHasText {
        marker: marker.into(),
    })
}

/// Loading while the row has `class`
#[must_use]
pub fn row_has_class(class: impl Into<String>) -> Arc<dyn LoadingCheck> {
    Arc::new(RowHasClass {
        class: class.into(),
    })
}

/// Loading while the row text contains `marker`
#[must_use]
pub fn row_has_text(marker: impl Into<String>) -> Arc<dyn LoadingCheck> {
    Arc::new(RowHasText {
        marker: marker.into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::TableLocator;
    use crate::mock::{el, MockPage};

    fn context(page: &MockPage) -> LoadingContext {
        let root = page.locator("table");
        LoadingContext {
            headers: root.locator("th"),
            rows: root.locator("tbody tr"),
            root,
            row: None,
        }
    }

    fn table(page: &MockPage) {
        let _ = page.mount(
            el("table")
                .child(el("div").class("spinner").hidden())
                .child(el("thead").child(el("tr").child(el("th").text("Loading..."))))
                .child(
                    el("tbody")
                        .child(el("tr").class("skeleton").child(el("td").text("...")))
                        .child(el("tr").child(el("td").text("Alice"))),
                ),
        );
    }

    #[tokio::test]
    async fn test_hidden_spinner_is_not_loading() {
        let page = MockPage::new();
        table(&page);
        assert!(!has_spinner(".spinner").is_loading(&context(&page)).await.unwrap());
    }

    #[tokio::test]
    async fn test_header_marker() {
        let page = MockPage::new();
        table(&page);
        assert!(header_has_text("Loading").is_loading(&context(&page)).await.unwrap());
        assert!(!header_has_text("Busy").is_loading(&context(&page)).await.unwrap());
    }

    #[tokio::test]
    async fn test_row_class_and_text() {
        let page = MockPage::new();
        table(&page);
        let ctx = context(&page);
        let skeleton = ctx.for_row(ctx.rows.nth(0));
        let real = ctx.for_row(ctx.rows.nth(1));
        assert!(row_has_class("skeleton").is_loading(&skeleton).await.unwrap());
        assert!(!row_has_class("skeleton").is_loading(&real).await.unwrap());
        assert!(row_has_text("...").is_loading(&skeleton).await.unwrap());
        assert!(!row_has_text("...").is_loading(&ctx).await.unwrap());
    }
}
