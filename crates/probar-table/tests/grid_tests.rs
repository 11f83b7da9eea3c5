//! Tests for grids that are not plain HTML tables: keyboard-driven canvas
//! grids, recycled virtual lists and editable rows.

mod common;

use common::{fast_timeouts, init_tracing};
use probar_table::mock::{el, MockDom, MockPage, NodeId};
use probar_table::prelude::*;
use probar_table::strategies::navigation::{aria_active_cell, keyboard};
use probar_table::strategies::stabilization::content_changed;
use probar_table::ElementTracker;
use serde_json::json;

// ============================================================================
// Keyboard-driven canvas grid
// ============================================================================

/// Arrow keys move a focus marker that carries one-based ARIA coordinates
/// and renders the cell it sits on as `r{row}c{column}`.
fn move_focus(dom: &mut MockDom, focus: NodeId, key: &str) {
    let read = |dom: &MockDom, name: &str| {
        dom.node(focus)
            .attribute(name)
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(1)
            - 1
    };
    let (mut row, mut column) = (read(dom, "aria-rowindex"), read(dom, "aria-colindex"));
    match key {
        "ArrowDown" => row += 1,
        "ArrowUp" => row = row.saturating_sub(1),
        "ArrowRight" => column += 1,
        "ArrowLeft" => column = column.saturating_sub(1),
        "Control+Home" => (row, column) = (0, 0),
        _ => {}
    }
    let node = dom.node_mut(focus);
    let _ = node.attrs.insert("aria-rowindex".to_string(), (row + 1).to_string());
    let _ = node.attrs.insert("aria-colindex".to_string(), (column + 1).to_string());
    node.text = format!("r{row}c{column}");
}

fn canvas_grid(page: &MockPage) -> SmartTable {
    let root = page.mount(
        el("div")
            .id("canvas")
            .child(
                el("div")
                    .class("headers")
                    .child(el("span").text("Name"))
                    .child(el("span").text("Email"))
                    .child(el("span").text("Role")),
            )
            .child(
                el("div")
                    .class("rows")
                    .child(el("div").class("row"))
                    .child(el("div").class("row")),
            )
            .child(
                el("div")
                    .class("focus")
                    .attr("aria-rowindex", "1")
                    .attr("aria-colindex", "1")
                    .text("r0c0"),
            ),
    );
    let focus = page.dom().query(root, ".focus")[0];
    page.on_key(focus, move_focus);

    let config = TableConfig::new()
        .with_header_selector(".headers span")
        .with_row_selector(".rows .row")
        .with_timeouts(fast_timeouts())
        .with_navigation(
            Some(aria_active_cell(Some(Selector::query(".focus")))),
            keyboard(Selector::query(".focus")),
        );
    use_table(page.locator("#canvas"), config).unwrap()
}

#[tokio::test]
async fn canvas_cells_are_read_by_moving_focus() {
    init_tracing();
    let page = MockPage::new();
    let table = canvas_grid(&page);

    let row = table.get_row_by_index(1, false).await.unwrap();
    let data = row.to_json(None).await.unwrap();

    assert_eq!(
        serde_json::Value::Object(data),
        json!({"Name": "r1c0", "Email": "r1c1", "Role": "r1c2"})
    );
    assert_eq!(page.action_count("press[ArrowDown]"), 1);
    assert_eq!(page.action_count("press[ArrowRight]"), 2);
    assert_eq!(page.action_count("press[ArrowUp]"), 0);
}

#[tokio::test]
async fn canvas_navigation_is_skipped_when_already_on_target() {
    init_tracing();
    let page = MockPage::new();
    let table = canvas_grid(&page);

    let row = table.get_row_by_index(0, false).await.unwrap();
    let cell = row.navigate_to_cell(0).await.unwrap().unwrap();

    assert_eq!(cell.inner_text().await.unwrap(), "r0c0");
    assert_eq!(page.action_count("press["), 0);
}

#[tokio::test]
async fn canvas_navigation_moves_back_up_and_left() {
    init_tracing();
    let page = MockPage::new();
    let table = canvas_grid(&page);

    let lower = table.get_row_by_index(1, false).await.unwrap();
    let _ = lower.navigate_to_cell(2).await.unwrap();
    let upper = table.get_row_by_index(0, false).await.unwrap();
    let cell = upper.navigate_to_cell(1).await.unwrap().unwrap();

    assert_eq!(cell.inner_text().await.unwrap(), "r0c1");
    assert_eq!(page.action_count("press[ArrowUp]"), 1);
    assert_eq!(page.action_count("press[ArrowLeft]"), 1);
}

#[tokio::test]
async fn rows_without_index_do_not_navigate() {
    init_tracing();
    let page = MockPage::new();
    let table = canvas_grid(&page);

    let row = table
        .find_row(&Filters::new().with("Name", "nobody"), SearchOptions::new())
        .await
        .unwrap();
    assert!(row.navigate_to_cell(1).await.unwrap().is_none());
    assert_eq!(page.action_count("press["), 0);
}

// ============================================================================
// Virtualised list with recycled rows
// ============================================================================

/// Three recycled `tr` nodes over seven items; each 500px of scroll shifts
/// the window by two items.
fn virtual_feed(page: &MockPage) -> NodeId {
    let items: Vec<String> = (0..7).map(|i| format!("Item {i}")).collect();
    let root = page.mount(
        el("div").id("feed").child(
            el("table")
                .child(el("thead").child(el("tr").child(el("th").text("Item"))))
                .child(el("tbody").children(
                    items[..3]
                        .iter()
                        .map(|item| el("tr").child(el("td").text(item.clone()))),
                )),
        ),
    );
    page.on_scroll(root, move |dom, node| {
        let window = (dom.node(node).scroll_top / 500.0) as usize * 2;
        for (slot, cell) in dom.query(node, "td").into_iter().enumerate() {
            let index = (window + slot).min(items.len() - 1);
            dom.node_mut(cell).text = items[index].clone();
        }
    });
    root
}

fn feed_table(page: &MockPage, dedupe: bool) -> SmartTable {
    let pagination = infinite_scroll(
        InfiniteScrollOptions::new()
            .with_amount(500.0)
            .with_stabilization(content_changed()),
    );
    let mut config = TableConfig::new()
        .with_pagination(pagination)
        .with_max_pages(3)
        .with_timeouts(fast_timeouts());
    if dedupe {
        config = config.with_dedupe(|row: SmartRow| async move { row.inner_text().await });
    }
    use_table(page.locator("#feed"), config).unwrap()
}

async fn items(table: &SmartTable) -> Vec<serde_json::Value> {
    table
        .map(IterationOptions::new(), |ctx| async move {
            let mut data = ctx.row.to_json(Some(&["Item"])).await?;
            Ok(data.remove("Item").unwrap_or_default())
        })
        .await
        .unwrap()
}

#[tokio::test]
async fn recycled_rows_are_revisited_when_content_changes() {
    init_tracing();
    let page = MockPage::new();
    let _ = virtual_feed(&page);
    let table = feed_table(&page, false);

    let seen = items(&table).await;

    assert_eq!(
        seen,
        vec![
            "Item 0", "Item 1", "Item 2", "Item 2", "Item 3", "Item 4", "Item 4", "Item 5", "Item 6"
        ]
    );
    assert_eq!(table.current_page_index(), 2);
}

#[tokio::test]
async fn dedupe_key_drops_repeated_items() {
    init_tracing();
    let page = MockPage::new();
    let _ = virtual_feed(&page);
    let table = feed_table(&page, true);

    let seen = items(&table).await;

    let expected: Vec<_> = (0..7).map(|i| format!("Item {i}")).collect();
    assert_eq!(seen, expected);
}

#[tokio::test]
async fn tracker_ignores_identical_rerender() {
    init_tracing();
    let page = MockPage::new();
    let feed = virtual_feed(&page);
    let rows = page.locator("#feed tbody tr");

    let mut tracker = ElementTracker::new();
    assert_eq!(tracker.new_indices(&rows).await.unwrap(), vec![0, 1, 2]);

    page.dom().scroll_to(feed, 0.0);
    assert!(tracker.new_indices(&rows).await.unwrap().is_empty());

    page.dom().scroll_to(feed, 500.0);
    assert_eq!(tracker.new_indices(&rows).await.unwrap(), vec![0, 1, 2]);
    assert_eq!(tracker.len(), 3);
}

// ============================================================================
// Editing rows
// ============================================================================

fn editable_table(page: &MockPage) -> LocatorRef {
    let _ = page.mount(
        el("table")
            .id("users")
            .child(
                el("thead").child(
                    el("tr")
                        .child(el("th").text("Name"))
                        .child(el("th").text("Active"))
                        .child(el("th").text("Role"))
                        .child(el("th").text("Notes"))
                        .child(el("th").text("Tag")),
                ),
            )
            .child(
                el("tbody").child(
                    el("tr")
                        .child(el("td").child(el("input").attr("type", "text").value("Ada")))
                        .child(el("td").child(el("input").attr("type", "checkbox")))
                        .child(
                            el("td").child(
                                el("select")
                                    .value("member")
                                    .child(el("option").attr("value", "member").text("Member"))
                                    .child(el("option").attr("value", "admin").text("Admin")),
                            ),
                        )
                        .child(el("td").child(el("div").attr("contenteditable", "true").text("old")))
                        .child(
                            el("td")
                                .child(el("span").class("label").text("keep"))
                                .child(el("input").class("real").attr("type", "text").value("x")),
                        ),
                ),
            ),
    );
    page.locator("#users")
}

#[tokio::test]
async fn smart_fill_drives_each_control_kind() {
    init_tracing();
    let page = MockPage::new();
    let root = editable_table(&page);
    let table = use_table(root, TableConfig::new().with_timeouts(fast_timeouts())).unwrap();
    let row = table.get_row_by_index(0, false).await.unwrap();

    let data: RowData = json!({
        "Name": "Grace",
        "Active": true,
        "Role": "admin",
        "Notes": "new note",
        "Tag": null,
    })
    .as_object()
    .cloned()
    .unwrap();
    row.smart_fill(&data, &FillOptions::new()).await.unwrap();

    let cells = |column: &str| row.get_cell(column).unwrap();
    assert_eq!(cells("Name").locator("input").input_value().await.unwrap(), "Grace");
    assert!(cells("Active").locator("input").is_checked().await.unwrap());
    assert_eq!(cells("Role").locator("select").input_value().await.unwrap(), "admin");
    assert_eq!(cells("Notes").inner_text().await.unwrap(), "new note");
    assert_eq!(cells("Tag").locator("input.real").input_value().await.unwrap(), "x");
    assert_eq!(page.action_count("click"), 1);
}

#[tokio::test]
async fn smart_fill_leaves_checked_box_alone() {
    init_tracing();
    let page = MockPage::new();
    let root = editable_table(&page);
    let table = use_table(root, TableConfig::new().with_timeouts(fast_timeouts())).unwrap();
    let row = table.get_row_by_index(0, false).await.unwrap();

    let mut data = RowData::new();
    let _ = data.insert("Active".to_string(), json!(false));
    row.smart_fill(&data, &FillOptions::new()).await.unwrap();

    assert!(!row.get_cell("Active").unwrap().locator("input").is_checked().await.unwrap());
    assert_eq!(page.action_count("click"), 0);
}

#[tokio::test]
async fn smart_fill_uses_input_locator_hint() {
    init_tracing();
    let page = MockPage::new();
    let root = editable_table(&page);
    let table = use_table(root, TableConfig::new().with_timeouts(fast_timeouts())).unwrap();
    let row = table.get_row_by_index(0, false).await.unwrap();

    let mut data = RowData::new();
    let _ = data.insert("Tag".to_string(), json!("urgent"));
    let options = FillOptions::new().with_input_locator("Tag", "input.real");
    row.smart_fill(&data, &options).await.unwrap();

    let tag = row.get_cell("Tag").unwrap();
    assert_eq!(tag.locator("input.real").input_value().await.unwrap(), "urgent");
    assert_eq!(tag.inner_text().await.unwrap(), "keep");
}

#[tokio::test]
async fn write_override_receives_current_value() {
    init_tracing();
    let page = MockPage::new();
    let root = editable_table(&page);
    let config = TableConfig::new().with_timeouts(fast_timeouts()).with_column_override(
        "Notes",
        ColumnOverride::new()
            .with_read(|cell| async move { Ok(json!(cell.inner_text().await?)) })
            .with_write(|ctx: WriteContext| async move {
                let current = ctx.current_value.unwrap_or_default();
                let combined = format!(
                    "{} + {}",
                    current.as_str().unwrap_or_default(),
                    ctx.target_value.as_str().unwrap_or_default()
                );
                ctx.cell.locator("[contenteditable]").fill(&combined).await
            }),
    );
    let table = use_table(root, config).unwrap();
    let row = table.get_row_by_index(0, false).await.unwrap();

    let mut data = RowData::new();
    let _ = data.insert("Notes".to_string(), json!("more"));
    row.smart_fill(&data, &FillOptions::new()).await.unwrap();

    assert_eq!(row.to_json(Some(&["Notes"])).await.unwrap()["Notes"], "old + more");
}

#[tokio::test]
async fn smart_fill_rejects_unknown_column() {
    init_tracing();
    let page = MockPage::new();
    let root = editable_table(&page);
    let table = use_table(root, TableConfig::new().with_timeouts(fast_timeouts())).unwrap();
    let row = table.get_row_by_index(0, false).await.unwrap();

    let mut data = RowData::new();
    let _ = data.insert("Nmae".to_string(), json!("Grace"));
    let err = row.smart_fill(&data, &FillOptions::new()).await.unwrap_err();
    assert!(err.is_column_not_found());
}
