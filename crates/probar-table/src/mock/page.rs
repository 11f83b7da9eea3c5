//! `MockPage` and its lazy `MockLocator`.

use async_trait::async_trait;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::dom::{ClickHandler, KeyHandler, MockDom, MockElement, NodeId, ScrollHandler};
use crate::locator::{CellFilter, LocatorRef, TableLocator};
use crate::result::{TableError, TableResult};

/// A page backed by an in-memory element arena
#[derive(Clone, Default)]
pub struct MockPage {
    dom: Arc<Mutex<MockDom>>,
}

impl fmt::Debug for MockPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MockPage").field("dom", &*self.dom()).finish()
    }
}

impl MockPage {
    /// Create an empty page
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the arena
    pub fn dom(&self) -> MutexGuard<'_, MockDom> {
        self.dom.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Mount an element tree under the document
    pub fn mount(&self, element: MockElement) -> NodeId {
        let mut dom = self.dom();
        let root = dom.root();
        dom.mount(root, element)
    }

    /// Mount an element tree under a given node
    pub fn mount_into(&self, parent: NodeId, element: MockElement) -> NodeId {
        self.dom().mount(parent, element)
    }

    /// Locator for a query against the whole page
    #[must_use]
    pub fn locator(&self, query: &str) -> LocatorRef {
        self.root().locator(query)
    }

    /// Locator for the document itself
    #[must_use]
    pub fn root(&self) -> LocatorRef {
        Arc::new(MockLocator {
            page: self.clone(),
            steps: Vec::new(),
        })
    }

    /// Register a click handler
    pub fn on_click<F>(&self, node: NodeId, handler: F)
    where
        F: Fn(&mut MockDom, NodeId) + Send + Sync + 'static,
    {
        let handler: ClickHandler = Arc::new(handler);
        self.dom().on_click(node, handler);
    }

    /// Register a key handler
    pub fn on_key<F>(&self, node: NodeId, handler: F)
    where
        F: Fn(&mut MockDom, NodeId, &str) + Send + Sync + 'static,
    {
        let handler: KeyHandler = Arc::new(handler);
        self.dom().on_key(node, handler);
    }

    /// Register a scroll handler
    pub fn on_scroll<F>(&self, node: NodeId, handler: F)
    where
        F: Fn(&mut MockDom, NodeId) + Send + Sync + 'static,
    {
        let handler: ScrollHandler = Arc::new(handler);
        self.dom().on_scroll(node, handler);
    }

    /// Actions performed through locators so far
    #[must_use]
    pub fn actions(&self) -> Vec<String> {
        self.dom().actions().to_vec()
    }

    /// Count recorded actions starting with `prefix`
    #[must_use]
    pub fn action_count(&self, prefix: &str) -> usize {
        self.dom()
            .actions()
            .iter()
            .filter(|a| a.starts_with(prefix))
            .count()
    }
}

#[derive(Debug, Clone)]
enum Step {
    Query(String),
    Nth(usize),
    Text { text: String, exact: bool },
    HasText(String),
    Cell(CellFilter),
    Node(NodeId),
}

/// Lazy locator over a [`MockPage`]; resolves its step chain on every call
#[derive(Clone)]
pub struct MockLocator {
    page: MockPage,
    steps: Vec<Step>,
}

impl fmt::Debug for MockLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("MockLocator").field(&self.describe()).finish()
    }
}

impl MockLocator {
    fn with_step(&self, step: Step) -> LocatorRef {
        let mut steps = self.steps.clone();
        steps.push(step);
        Arc::new(Self {
            page: self.page.clone(),
            steps,
        })
    }

    fn pinned(&self, node: NodeId) -> LocatorRef {
        Arc::new(Self {
            page: self.page.clone(),
            steps: vec![Step::Node(node)],
        })
    }

    async fn resolve(&self) -> TableResult<Vec<NodeId>> {
        let mut current = vec![self.page.dom().root()];
        for step in &self.steps {
            current = match step {
                Step::Query(query) => {
                    let dom = self.page.dom();
                    let mut out: Vec<NodeId> = Vec::new();
                    for &scope in &current {
                        for id in dom.query(scope, query) {
                            if !out.contains(&id) {
                                out.push(id);
                            }
                        }
                    }
                    out
                }
                Step::Nth(index) => current.get(*index).copied().into_iter().collect(),
                Step::Text { text, exact } => {
                    let dom = self.page.dom();
                    let mut out: Vec<NodeId> = Vec::new();
                    for &scope in &current {
                        for id in dom.by_text(scope, text, *exact) {
                            if !out.contains(&id) {
                                out.push(id);
                            }
                        }
                    }
                    out
                }
                Step::HasText(text) => {
                    let dom = self.page.dom();
                    let needle = text.to_lowercase();
                    current
                        .into_iter()
                        .filter(|&id| dom.text_content(id).to_lowercase().contains(&needle))
                        .collect()
                }
                Step::Node(node) => {
                    let attached = self.page.dom().is_attached(*node);
                    if attached {
                        vec![*node]
                    } else {
                        Vec::new()
                    }
                }
                Step::Cell(filter) => {
                    let mut kept = Vec::new();
                    for id in current {
                        let row = self.pinned(id);
                        if filter.matches_row(&row).await? {
                            kept.push(id);
                        }
                    }
                    kept
                }
            };
        }
        Ok(current)
    }

    async fn first_node(&self) -> TableResult<Option<NodeId>> {
        Ok(self.resolve().await?.first().copied())
    }

    async fn require_node(&self) -> TableResult<NodeId> {
        self.first_node()
            .await?
            .ok_or_else(|| TableError::locator(format!("No element matches {}", self.describe())))
    }

    async fn require_actionable(&self, action: &str) -> TableResult<NodeId> {
        let node = self.require_node().await?;
        let dom = self.page.dom();
        if !dom.is_visible(node) {
            return Err(TableError::locator(format!(
                "Cannot {action} {}: element is not visible",
                self.describe()
            )));
        }
        if !dom.node(node).enabled {
            return Err(TableError::locator(format!(
                "Cannot {action} {}: element is disabled",
                self.describe()
            )));
        }
        Ok(node)
    }

    fn label(&self, node: NodeId) -> String {
        let dom = self.page.dom();
        let element = dom.node(node);
        match (element.attrs.get("id"), element.classes.first()) {
            (Some(id), _) => format!("{}#{id}", element.tag),
            (None, Some(class)) => format!("{}.{class}", element.tag),
            (None, None) => element.tag.clone(),
        }
    }

    fn record(&self, action: &str, node: NodeId) {
        let label = self.label(node);
        self.page.dom().record(format!("{action}:{label}"));
    }
}

#[async_trait]
impl TableLocator for MockLocator {
    fn locator(&self, query: &str) -> LocatorRef {
        self.with_step(Step::Query(query.to_string()))
    }

    fn page_root(&self) -> LocatorRef {
        self.page.root()
    }

    fn nth(&self, index: usize) -> LocatorRef {
        self.with_step(Step::Nth(index))
    }

    fn get_by_text(&self, text: &str, exact: bool) -> LocatorRef {
        self.with_step(Step::Text {
            text: text.to_string(),
            exact,
        })
    }

    fn filter_has_text(&self, text: &str) -> LocatorRef {
        self.with_step(Step::HasText(text.to_string()))
    }

    fn filter_by_cell(&self, filter: CellFilter) -> LocatorRef {
        self.with_step(Step::Cell(filter))
    }

    fn describe(&self) -> String {
        if self.steps.is_empty() {
            return "page".to_string();
        }
        self.steps
            .iter()
            .map(|step| match step {
                Step::Query(query) => query.clone(),
                Step::Nth(index) => format!("nth={index}"),
                Step::Text { text, exact } => format!("text={text:?}{}", if *exact { "s" } else { "i" }),
                Step::HasText(text) => format!("has-text={text:?}"),
                Step::Cell(filter) => format!("has-cell[{}]", filter.column_index),
                Step::Node(node) => format!("node={node}"),
            })
            .collect::<Vec<_>>()
            .join(" >> ")
    }

    async fn count(&self) -> TableResult<usize> {
        Ok(self.resolve().await?.len())
    }

    async fn inner_text(&self) -> TableResult<String> {
        let node = self.require_node().await?;
        Ok(self.page.dom().inner_text(node))
    }

    async fn text_content(&self) -> TableResult<Option<String>> {
        let node = self.first_node().await?;
        Ok(node.map(|id| self.page.dom().text_content(id)))
    }

    async fn get_attribute(&self, name: &str) -> TableResult<Option<String>> {
        let node = self.require_node().await?;
        Ok(self.page.dom().node(node).attribute(name))
    }

    async fn input_value(&self) -> TableResult<String> {
        let node = self.require_node().await?;
        Ok(self.page.dom().node(node).value.clone())
    }

    async fn tag_name(&self) -> TableResult<String> {
        let node = self.require_node().await?;
        Ok(self.page.dom().node(node).tag.clone())
    }

    async fn element_key(&self) -> TableResult<Option<String>> {
        Ok(self.first_node().await?.map(|id| format!("node-{id}")))
    }

    async fn is_visible(&self) -> TableResult<bool> {
        Ok(match self.first_node().await? {
            Some(node) => self.page.dom().is_visible(node),
            None => false,
        })
    }

    async fn is_enabled(&self) -> TableResult<bool> {
        Ok(match self.first_node().await? {
            Some(node) => self.page.dom().node(node).enabled,
            None => false,
        })
    }

    async fn is_checked(&self) -> TableResult<bool> {
        let node = self.require_node().await?;
        Ok(self.page.dom().node(node).checked)
    }

    async fn click(&self) -> TableResult<()> {
        let node = self.require_actionable("click").await?;
        self.record("click", node);
        self.page.dom().click(node);
        Ok(())
    }

    async fn fill(&self, value: &str) -> TableResult<()> {
        let node = self.require_actionable("fill").await?;
        self.record("fill", node);
        let mut dom = self.page.dom();
        let element = dom.node_mut(node);
        let editable = element.attrs.contains_key("contenteditable");
        match element.tag.as_str() {
            "input" | "textarea" => element.value = value.to_string(),
            _ if editable => element.text = value.to_string(),
            other => {
                return Err(TableError::locator(format!(
                    "Cannot fill <{other}>: not an input, textarea or contenteditable"
                )))
            }
        }
        Ok(())
    }

    async fn select_option(&self, value: &str) -> TableResult<()> {
        let node = self.require_actionable("select").await?;
        self.record("select", node);
        let mut dom = self.page.dom();
        let element = dom.node_mut(node);
        if element.tag != "select" {
            return Err(TableError::locator(format!(
                "Cannot select option on <{}>",
                element.tag
            )));
        }
        element.value = value.to_string();
        Ok(())
    }

    async fn press(&self, key: &str) -> TableResult<()> {
        let node = self.require_node().await?;
        self.record(&format!("press[{key}]"), node);
        self.page.dom().press(node, key);
        Ok(())
    }

    async fn scroll_into_view_if_needed(&self) -> TableResult<()> {
        let node = self.require_node().await?;
        self.record("scroll-into-view", node);
        Ok(())
    }

    async fn wheel(&self, delta_x: f64, delta_y: f64) -> TableResult<()> {
        let node = self.require_node().await?;
        self.record("wheel", node);
        self.page.dom().scroll_by(node, delta_x, delta_y);
        Ok(())
    }

    async fn scroll_top(&self) -> TableResult<f64> {
        let node = self.require_node().await?;
        Ok(self.page.dom().node(node).scroll_top)
    }

    async fn set_scroll_top(&self, offset: f64) -> TableResult<()> {
        let node = self.require_node().await?;
        self.record("scroll", node);
        self.page.dom().scroll_to(node, offset);
        Ok(())
    }
}
