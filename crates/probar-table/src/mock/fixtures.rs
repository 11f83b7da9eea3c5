//! Ready-made table fixtures for the mock page.

use std::sync::{Arc, Mutex, PoisonError};

use super::dom::{el, MockDom, MockElement, NodeId};
use super::page::MockPage;
use crate::locator::LocatorRef;

/// A paginated HTML table with first/previous/next and bulk buttons.
///
/// ```text
/// div.table-wrapper
///   table#grid (thead > tr > th*, tbody > tr > td*)
///   div.pager  button.first button.prev-bulk button.prev button.next button.next-bulk
/// ```
///
/// Clicking a button re-renders `tbody` with fresh nodes. Bulk buttons are
/// disabled when a full jump would leave the page range, so every click moves
/// by exactly the advertised amount.
#[derive(Debug, Clone)]
pub struct PagedTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    rows_per_page: usize,
    bulk_pages: usize,
}

impl PagedTable {
    /// Create a fixture from header texts and row cell texts
    #[must_use]
    pub fn new(headers: &[&str], rows: Vec<Vec<String>>) -> Self {
        Self {
            headers: headers.iter().map(ToString::to_string).collect(),
            rows,
            rows_per_page: 2,
            bulk_pages: 10,
        }
    }

    /// `count` people rows under `Name`, `Email`, `Role`
    #[must_use]
    pub fn people(count: usize) -> Self {
        let rows = (0..count)
            .map(|i| {
                vec![
                    format!("User {i}"),
                    format!("user{i}@example.com"),
                    if i % 2 == 0 { "Admin" } else { "Member" }.to_string(),
                ]
            })
            .collect();
        Self::new(&["Name", "Email", "Role"], rows)
    }

    /// Set rows per page
    #[must_use]
    pub const fn with_rows_per_page(mut self, rows_per_page: usize) -> Self {
        self.rows_per_page = rows_per_page;
        self
    }

    /// Set how many pages the bulk buttons jump
    #[must_use]
    pub const fn with_bulk_pages(mut self, bulk_pages: usize) -> Self {
        self.bulk_pages = bulk_pages;
        self
    }

    /// Mount onto a page and wire up the pager buttons
    pub fn mount(self, page: &MockPage) -> PagedTableHandle {
        let page_count = self.rows.len().div_ceil(self.rows_per_page.max(1)).max(1);
        let header_row = el("tr").children(self.headers.iter().map(|h| el("th").text(h.clone())));
        let wrapper = page.mount(
            el("div")
                .class("table-wrapper")
                .child(
                    el("table")
                        .id("grid")
                        .child(el("thead").child(header_row))
                        .child(el("tbody")),
                )
                .child(
                    el("div")
                        .class("pager")
                        .child(el("button").class("first").text("First"))
                        .child(el("button").class("prev-bulk").text("-10"))
                        .child(el("button").class("prev").text("Prev"))
                        .child(el("button").class("next").text("Next"))
                        .child(el("button").class("next-bulk").text("+10")),
                ),
        );

        let (tbody, buttons) = {
            let dom = page.dom();
            let tbody = dom.query(wrapper, "tbody")[0];
            let button = |class: &str| dom.query(wrapper, &format!("button.{class}"))[0];
            let buttons = PagerButtons {
                first: button("first"),
                prev_bulk: button("prev-bulk"),
                prev: button("prev"),
                next: button("next"),
                next_bulk: button("next-bulk"),
            };
            (tbody, buttons)
        };

        let model = Arc::new(PagerModel {
            rows: self.rows,
            rows_per_page: self.rows_per_page.max(1),
            bulk_pages: self.bulk_pages,
            page_count,
            tbody,
            buttons,
            current: Mutex::new(0),
        });
        model.render(&mut page.dom(), 0);

        let bulk = model.bulk_pages as isize;
        let wire = |node: NodeId, step: fn(usize, isize) -> isize, amount: isize| {
            let model = Arc::clone(&model);
            page.on_click(node, move |dom, _| {
                let current = model.current();
                let target = step(current, amount);
                if target >= 0 && (target as usize) < model.page_count {
                    model.render(dom, target as usize);
                }
            });
        };
        wire(buttons.first, |_, _| 0, 0);
        wire(buttons.prev, |c, a| c as isize - a, 1);
        wire(buttons.next, |c, a| c as isize + a, 1);
        wire(buttons.prev_bulk, |c, a| c as isize - a, bulk);
        wire(buttons.next_bulk, |c, a| c as isize + a, bulk);

        PagedTableHandle {
            page: page.clone(),
            model,
            root: page.locator("#grid"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct PagerButtons {
    first: NodeId,
    prev_bulk: NodeId,
    prev: NodeId,
    next: NodeId,
    next_bulk: NodeId,
}

#[derive(Debug)]
struct PagerModel {
    rows: Vec<Vec<String>>,
    rows_per_page: usize,
    bulk_pages: usize,
    page_count: usize,
    tbody: NodeId,
    buttons: PagerButtons,
    current: Mutex<usize>,
}

impl PagerModel {
    fn current(&self) -> usize {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn render(&self, dom: &mut MockDom, page: usize) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = page;
        dom.clear_children(self.tbody);
        let start = page * self.rows_per_page;
        for row in self.rows.iter().skip(start).take(self.rows_per_page) {
            let tr: MockElement = el("tr").children(row.iter().map(|cell| el("td").text(cell.clone())));
            let _ = dom.mount(self.tbody, tr);
        }
        let last = self.page_count - 1;
        dom.node_mut(self.buttons.first).enabled = page > 0;
        dom.node_mut(self.buttons.prev).enabled = page > 0;
        dom.node_mut(self.buttons.next).enabled = page < last;
        dom.node_mut(self.buttons.prev_bulk).enabled = page >= self.bulk_pages;
        dom.node_mut(self.buttons.next_bulk).enabled = page + self.bulk_pages <= last;
    }
}

/// Live handle to a mounted [`PagedTable`]
#[derive(Debug, Clone)]
pub struct PagedTableHandle {
    page: MockPage,
    model: Arc<PagerModel>,
    root: LocatorRef,
}

impl PagedTableHandle {
    /// Locator of the `table#grid` element
    #[must_use]
    pub fn root(&self) -> LocatorRef {
        Arc::clone(&self.root)
    }

    /// Page currently rendered
    #[must_use]
    pub fn current_page(&self) -> usize {
        self.model.current()
    }

    /// Total number of pages
    #[must_use]
    pub fn page_count(&self) -> usize {
        self.model.page_count
    }

    /// Render a page directly, bypassing the buttons
    pub fn goto(&self, page: usize) {
        let page = page.min(self.model.page_count - 1);
        self.model.render(&mut self.page.dom(), page);
    }

    /// Number of clicks recorded on the button with `class`
    #[must_use]
    pub fn clicks(&self, class: &str) -> usize {
        let needle = format!("click:button.{class}");
        self.page.actions().iter().filter(|a| **a == needle).count()
    }
}
