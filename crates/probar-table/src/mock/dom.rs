//! In-memory element arena with a small CSS subset.
//!
//! Nodes are never freed: re-rendering detaches old children and mounts new
//! ones, so a detached node keeps its id. That mirrors how a recycled DOM node
//! keeps its identity while a replaced one does not.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Index of a node in the arena
pub type NodeId = usize;

/// Called when a node (or a descendant) is clicked
pub type ClickHandler = Arc<dyn Fn(&mut MockDom, NodeId) + Send + Sync>;

/// Called when a key is pressed on a node (or a descendant)
pub type KeyHandler = Arc<dyn Fn(&mut MockDom, NodeId, &str) + Send + Sync>;

/// Called after a node's scroll offset changed
pub type ScrollHandler = Arc<dyn Fn(&mut MockDom, NodeId) + Send + Sync>;

/// A single element in the arena
#[derive(Debug, Clone)]
pub struct MockNode {
    /// Lower-case tag name
    pub tag: String,
    /// Class list
    pub classes: Vec<String>,
    /// Attributes other than `class`
    pub attrs: BTreeMap<String, String>,
    /// Own text (not including children)
    pub text: String,
    /// Child node ids in order
    pub children: Vec<NodeId>,
    /// Parent node id (`None` once detached)
    pub parent: Option<NodeId>,
    /// Rendered visibility flag
    pub visible: bool,
    /// Enabled flag (form controls)
    pub enabled: bool,
    /// Checked flag (checkbox/radio)
    pub checked: bool,
    /// Input value
    pub value: String,
    /// Vertical scroll offset
    pub scroll_top: f64,
    /// Horizontal scroll offset
    pub scroll_left: f64,
}

impl MockNode {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            classes: Vec::new(),
            attrs: BTreeMap::new(),
            text: String::new(),
            children: Vec::new(),
            parent: None,
            visible: true,
            enabled: true,
            checked: false,
            value: String::new(),
            scroll_top: 0.0,
            scroll_left: 0.0,
        }
    }

    /// Attribute lookup, including `class`
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<String> {
        if name == "class" {
            return if self.classes.is_empty() {
                None
            } else {
                Some(self.classes.join(" "))
            };
        }
        self.attrs.get(name).cloned()
    }

    /// Whether the node carries a class
    #[must_use]
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }
}

/// Declarative element description mounted with [`MockDom::mount`]
#[derive(Debug, Clone)]
pub struct MockElement {
    tag: String,
    classes: Vec<String>,
    attrs: BTreeMap<String, String>,
    text: String,
    children: Vec<MockElement>,
    visible: bool,
    enabled: bool,
    checked: bool,
    value: String,
}

/// Start describing an element
#[must_use]
pub fn el(tag: &str) -> MockElement {
    MockElement {
        tag: tag.to_ascii_lowercase(),
        classes: Vec::new(),
        attrs: BTreeMap::new(),
        text: String::new(),
        children: Vec::new(),
        visible: true,
        enabled: true,
        checked: false,
        value: String::new(),
    }
}

impl MockElement {
    /// Add a class
    #[must_use]
    pub fn class(mut self, class: &str) -> Self {
        self.classes.push(class.to_string());
        self
    }

    /// Set the `id` attribute
    #[must_use]
    pub fn id(self, id: &str) -> Self {
        self.attr("id", id)
    }

    /// Set an attribute
    #[must_use]
    pub fn attr(mut self, name: &str, value: &str) -> Self {
        if name == "class" {
            self.classes
                .extend(value.split_whitespace().map(str::to_string));
        } else {
            let _ = self.attrs.insert(name.to_string(), value.to_string());
        }
        self
    }

    /// Set own text
    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Append a child
    #[must_use]
    pub fn child(mut self, child: MockElement) -> Self {
        self.children.push(child);
        self
    }

    /// Append several children
    #[must_use]
    pub fn children(mut self, children: impl IntoIterator<Item = MockElement>) -> Self {
        self.children.extend(children);
        self
    }

    /// Render the element invisible
    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Render the element disabled
    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Set the checked flag
    #[must_use]
    pub fn checked(mut self, checked: bool) -> Self {
        self.checked = checked;
        self
    }

    /// Set the input value
    #[must_use]
    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, Default)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<(String, Option<String>)>,
}

impl Compound {
    fn parse(token: &str) -> Self {
        let mut compound = Self::default();
        let chars: Vec<char> = token.chars().collect();
        let mut i = 0;

        let read_name = |i: &mut usize| {
            let start = *i;
            while *i < chars.len() && !matches!(chars[*i], '.' | '#' | '[') {
                *i += 1;
            }
            chars[start..*i].iter().collect::<String>()
        };

        let tag = read_name(&mut i);
        if !tag.is_empty() && tag != "*" {
            compound.tag = Some(tag.to_ascii_lowercase());
        }

        while i < chars.len() {
            match chars[i] {
                '.' => {
                    i += 1;
                    compound.classes.push(read_name(&mut i));
                }
                '#' => {
                    i += 1;
                    compound.id = Some(read_name(&mut i));
                }
                '[' => {
                    i += 1;
                    let start = i;
                    while i < chars.len() && chars[i] != ']' {
                        i += 1;
                    }
                    let body: String = chars[start..i].iter().collect();
                    i += 1;
                    match body.split_once('=') {
                        Some((name, value)) => {
                            let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
                            compound
                                .attrs
                                .push((name.trim().to_string(), Some(value.to_string())));
                        }
                        None => compound.attrs.push((body.trim().to_string(), None)),
                    }
                }
                _ => i += 1,
            }
        }
        compound
    }

    fn matches(&self, node: &MockNode) -> bool {
        if node.tag.starts_with('#') {
            return false;
        }
        if let Some(tag) = &self.tag {
            if &node.tag != tag {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if node.attrs.get("id") != Some(id) {
                return false;
            }
        }
        if !self.classes.iter().all(|c| node.has_class(c)) {
            return false;
        }
        self.attrs.iter().all(|(name, expected)| {
            match (node.attribute(name), expected) {
                (Some(actual), Some(expected)) => &actual == expected,
                (Some(_), None) => true,
                (None, _) => false,
            }
        })
    }
}

/// One comma-separated alternative of a selector list
type SelectorGroup = Vec<(Combinator, Compound)>;

fn parse_selector(selector: &str) -> Vec<SelectorGroup> {
    selector
        .split(',')
        .map(|group| {
            let spaced = group.replace('>', " > ");
            let mut parts = Vec::new();
            let mut combinator = Combinator::Descendant;
            for token in spaced.split_whitespace() {
                if token == ">" {
                    combinator = Combinator::Child;
                    continue;
                }
                parts.push((combinator, Compound::parse(token)));
                combinator = Combinator::Descendant;
            }
            parts
        })
        .filter(|group| !group.is_empty())
        .collect()
}

/// The element arena plus event handlers
pub struct MockDom {
    nodes: Vec<MockNode>,
    root: NodeId,
    click_handlers: HashMap<NodeId, ClickHandler>,
    key_handlers: HashMap<NodeId, KeyHandler>,
    scroll_handlers: HashMap<NodeId, ScrollHandler>,
    focused: Option<NodeId>,
    actions: Vec<String>,
}

impl std::fmt::Debug for MockDom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockDom")
            .field("nodes", &self.nodes.len())
            .field("focused", &self.focused)
            .field("actions", &self.actions.len())
            .finish_non_exhaustive()
    }
}

impl Default for MockDom {
    fn default() -> Self {
        Self::new()
    }
}

impl MockDom {
    /// Create an empty document
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![MockNode::new("#document")],
            root: 0,
            click_handlers: HashMap::new(),
            key_handlers: HashMap::new(),
            scroll_handlers: HashMap::new(),
            focused: None,
            actions: Vec::new(),
        }
    }

    /// The document node
    #[must_use]
    pub const fn root(&self) -> NodeId {
        self.root
    }

    /// Borrow a node
    #[must_use]
    pub fn node(&self, id: NodeId) -> &MockNode {
        &self.nodes[id]
    }

    /// Mutably borrow a node
    pub fn node_mut(&mut self, id: NodeId) -> &mut MockNode {
        &mut self.nodes[id]
    }

    /// Mount an element tree as the last child of `parent`
    pub fn mount(&mut self, parent: NodeId, element: MockElement) -> NodeId {
        let id = self.nodes.len();
        let mut node = MockNode::new(&element.tag);
        node.classes = element.classes;
        node.attrs = element.attrs;
        node.text = element.text;
        node.visible = element.visible;
        node.enabled = element.enabled;
        node.checked = element.checked;
        node.value = element.value;
        node.parent = Some(parent);
        self.nodes.push(node);
        self.nodes[parent].children.push(id);
        for child in element.children {
            let _ = self.mount(id, child);
        }
        id
    }

    /// Detach every child of `parent`
    pub fn clear_children(&mut self, parent: NodeId) {
        let children = std::mem::take(&mut self.nodes[parent].children);
        for child in children {
            self.nodes[child].parent = None;
        }
    }

    /// Detach a node from its parent
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id].parent.take() {
            self.nodes[parent].children.retain(|&c| c != id);
        }
    }

    /// Whether the node is still connected to the document
    #[must_use]
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            if current == self.root {
                return true;
            }
            match self.nodes[current].parent {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// Attached, and neither the node nor any ancestor is hidden
    #[must_use]
    pub fn is_visible(&self, id: NodeId) -> bool {
        if !self.is_attached(id) {
            return false;
        }
        let mut current = Some(id);
        while let Some(node) = current {
            if !self.nodes[node].visible {
                return false;
            }
            current = self.nodes[node].parent;
        }
        true
    }

    /// Descendants of `scope` in document order
    #[must_use]
    pub fn descendants(&self, scope: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.nodes[scope].children.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.nodes[id].children.iter().rev().copied());
        }
        out
    }

    /// Descendants of `scope` matching a CSS selector list
    #[must_use]
    pub fn query(&self, scope: NodeId, selector: &str) -> Vec<NodeId> {
        let groups = parse_selector(selector);
        self.descendants(scope)
            .into_iter()
            .filter(|&id| {
                groups
                    .iter()
                    .any(|group| self.matches_group(id, group, group.len() - 1))
            })
            .collect()
    }

    fn matches_group(&self, id: NodeId, group: &SelectorGroup, index: usize) -> bool {
        let (combinator, compound) = &group[index];
        if !compound.matches(&self.nodes[id]) {
            return false;
        }
        if index == 0 {
            return true;
        }
        match combinator {
            Combinator::Child => self.nodes[id]
                .parent
                .is_some_and(|parent| self.matches_group(parent, group, index - 1)),
            Combinator::Descendant => {
                let mut current = self.nodes[id].parent;
                while let Some(ancestor) = current {
                    if self.matches_group(ancestor, group, index - 1) {
                        return true;
                    }
                    current = self.nodes[ancestor].parent;
                }
                false
            }
        }
    }

    /// Rendered text: hidden subtrees excluded, cells tab-separated
    #[must_use]
    pub fn inner_text(&self, id: NodeId) -> String {
        let node = &self.nodes[id];
        if !node.visible {
            return String::new();
        }
        let mut parts: Vec<String> = Vec::new();
        if !node.text.is_empty() {
            parts.push(node.text.clone());
        }
        for &child in &node.children {
            let text = self.inner_text(child);
            if !text.is_empty() {
                parts.push(text);
            }
        }
        let separator = match node.tag.as_str() {
            "tr" => "\t",
            "table" | "thead" | "tbody" | "div" | "ul" | "ol" | "#document" => "\n",
            _ => " ",
        };
        parts.join(separator)
    }

    /// Raw text of the whole subtree
    #[must_use]
    pub fn text_content(&self, id: NodeId) -> String {
        let node = &self.nodes[id];
        let mut text = node.text.clone();
        for &child in &node.children {
            text.push_str(&self.text_content(child));
        }
        text
    }

    /// Innermost elements in `scope` (itself included) whose text matches
    #[must_use]
    pub fn by_text(&self, scope: NodeId, text: &str, exact: bool) -> Vec<NodeId> {
        let needle = normalize(text);
        let lowered = needle.to_lowercase();
        let candidates: Vec<NodeId> = std::iter::once(scope)
            .chain(self.descendants(scope))
            .filter(|&id| {
                let content = normalize(&self.text_content(id));
                if exact {
                    content == needle
                } else {
                    content.to_lowercase().contains(&lowered)
                }
            })
            .collect();
        candidates
            .iter()
            .copied()
            .filter(|&id| {
                !candidates
                    .iter()
                    .any(|&other| other != id && self.is_ancestor(id, other))
            })
            .collect()
    }

    fn is_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = self.nodes[id].parent;
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.nodes[node].parent;
        }
        false
    }

    /// First attached node whose `id` attribute equals `dom_id`
    #[must_use]
    pub fn by_id(&self, dom_id: &str) -> Option<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .find(|&id| self.nodes[id].attrs.get("id").map(String::as_str) == Some(dom_id))
    }

    /// Register a click handler on a node
    pub fn on_click(&mut self, id: NodeId, handler: ClickHandler) {
        let _ = self.click_handlers.insert(id, handler);
    }

    /// Register a key handler on a node
    pub fn on_key(&mut self, id: NodeId, handler: KeyHandler) {
        let _ = self.key_handlers.insert(id, handler);
    }

    /// Register a scroll handler on a node
    pub fn on_scroll(&mut self, id: NodeId, handler: ScrollHandler) {
        let _ = self.scroll_handlers.insert(id, handler);
    }

    /// Currently focused node
    #[must_use]
    pub const fn focused(&self) -> Option<NodeId> {
        self.focused
    }

    /// Record a performed action
    pub fn record(&mut self, action: impl Into<String>) {
        self.actions.push(action.into());
    }

    /// Actions performed so far
    #[must_use]
    pub fn actions(&self) -> &[String] {
        &self.actions
    }

    /// Click a node: toggle form state, focus it, bubble to handlers
    pub fn click(&mut self, id: NodeId) {
        let node = &mut self.nodes[id];
        if node.tag == "input" {
            match node.attrs.get("type").map(String::as_str) {
                Some("checkbox") => node.checked = !node.checked,
                Some("radio") => node.checked = true,
                _ => {}
            }
        }
        self.focused = Some(id);
        if let Some((target, handler)) = self.bubble(id, |dom, n| dom.click_handlers.get(&n).cloned()) {
            handler(self, target);
        }
    }

    /// Press a key on a node, bubbling to handlers
    pub fn press(&mut self, id: NodeId, key: &str) {
        self.focused = Some(id);
        if let Some((target, handler)) = self.bubble(id, |dom, n| dom.key_handlers.get(&n).cloned()) {
            handler(self, target, key);
        }
    }

    /// Set a scroll offset and notify handlers
    pub fn scroll_to(&mut self, id: NodeId, offset: f64) {
        self.nodes[id].scroll_top = offset.max(0.0);
        if let Some((target, handler)) =
            self.bubble(id, |dom, n| dom.scroll_handlers.get(&n).cloned())
        {
            handler(self, target);
        }
    }

    /// Scroll by a wheel delta and notify handlers
    pub fn scroll_by(&mut self, id: NodeId, delta_x: f64, delta_y: f64) {
        self.nodes[id].scroll_left = (self.nodes[id].scroll_left + delta_x).max(0.0);
        let offset = self.nodes[id].scroll_top + delta_y;
        self.scroll_to(id, offset);
    }

    fn bubble<H>(&self, id: NodeId, lookup: impl Fn(&Self, NodeId) -> Option<H>) -> Option<(NodeId, H)> {
        let mut current = Some(id);
        while let Some(node) = current {
            if let Some(handler) = lookup(self, node) {
                return Some((node, handler));
            }
            current = self.nodes[node].parent;
        }
        None
    }
}

fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
