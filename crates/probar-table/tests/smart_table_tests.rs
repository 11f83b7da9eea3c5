//! End-to-end tests of the table facade against the in-memory page.
//!
//! Every test mounts a fixture on a `MockPage`, drives it only through
//! `SmartTable`/`SmartRow`, then checks both the returned data and what was
//! clicked on the page.

mod common;

use common::{fast_timeouts, init_tracing, paged_table, pager, rows_of};
use probar_table::mock::{el, MockPage, PagedTable};
use probar_table::prelude::*;
use probar_table::strategies::loading::{has_spinner, row_has_class};
use probar_table::strategies::LoadingStrategies;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ============================================================================
// Header mapping
// ============================================================================

#[tokio::test]
async fn blank_header_gets_placeholder_and_can_be_renamed() {
    init_tracing();
    let page = MockPage::new();
    let rows = rows_of(&[&["Ada", "ada@example.com", "Edit"]]);
    let (_handle, table) = paged_table(
        &page,
        PagedTable::new(&["Name", "Email", ""], rows),
        pager(false, false),
        1,
    );

    let headers = table.headers().await.unwrap();
    assert_eq!(headers, vec!["Name", "Email", "__col_2"]);

    let _ = table.set_column_name(2, |_| "Actions".to_string()).await.unwrap();
    let headers = table.headers().await.unwrap();
    assert!(headers.contains(&"Actions".to_string()));
    assert!(!headers.contains(&"__col_2".to_string()));

    let row = table.get_row_by_index(0, false).await.unwrap();
    let data = row.to_json(None).await.unwrap();
    assert_eq!(data["Actions"], "Edit");
}

#[tokio::test]
async fn duplicate_headers_fail_initialization() {
    init_tracing();
    let page = MockPage::new();
    let rows = rows_of(&[&["Ada", "ada@example.com", "Ada L."]]);
    let (_handle, table) = paged_table(
        &page,
        PagedTable::new(&["Name", "Email", "Name"], rows),
        pager(false, false),
        1,
    );

    let err = table.init(None).await.unwrap_err();
    assert!(err.to_string().contains("Duplicate column names found: \"Name\""));
    assert!(!table.is_initialized());
}

#[tokio::test]
async fn header_transformer_resolves_duplicates() {
    init_tracing();
    let page = MockPage::new();
    let handle = PagedTable::new(
        &["Name", "Email", "Name"],
        rows_of(&[&["Ada", "ada@example.com", "Ada L."]]),
    )
    .mount(&page);
    let config = TableConfig::new()
        .with_timeouts(fast_timeouts())
        .with_header_transformer(|text: &str, index: usize, seen: &[String]| {
            if seen.iter().any(|s| s == text) {
                format!("{text}_{index}")
            } else {
                text.to_string()
            }
        });
    let table = use_table(handle.root(), config).unwrap();

    assert_eq!(table.headers().await.unwrap(), vec!["Name", "Email", "Name_2"]);
    let row = table.get_row_by_index(0, false).await.unwrap();
    assert_eq!(row.to_json(Some(&["Name_2"])).await.unwrap()["Name_2"], "Ada L.");
}

#[tokio::test]
async fn unknown_column_suggests_close_names() {
    init_tracing();
    let page = MockPage::new();
    let (_handle, table) = paged_table(&page, PagedTable::people(2), pager(false, false), 1);

    let err = table
        .find_row(&Filters::new().with("Emial", "user0@example.com"), SearchOptions::new())
        .await
        .unwrap_err();
    assert!(err.is_column_not_found());
    assert!(err.to_string().contains("Email"));
}

// ============================================================================
// Row search
// ============================================================================

#[tokio::test]
async fn find_rows_collects_every_page_in_budget() {
    init_tracing();
    let page = MockPage::new();
    let (handle, table) = paged_table(&page, PagedTable::people(6), pager(false, false), 3);

    let rows = table.find_rows(&Filters::new(), SearchOptions::new()).await.unwrap();

    assert_eq!(rows.len(), 6);
    assert_eq!(table.current_page_index(), 2);
    assert_eq!(handle.current_page(), 2);
    let pages: Vec<_> = rows.iter().map(SmartRow::table_page_index).collect();
    assert_eq!(pages, vec![Some(0), Some(0), Some(1), Some(1), Some(2), Some(2)]);
    let indices: Vec<_> = rows.iter().map(SmartRow::row_index).collect();
    assert_eq!(indices, (0..6).map(Some).collect::<Vec<_>>());
}

#[tokio::test]
async fn find_rows_respects_smaller_budget() {
    init_tracing();
    let page = MockPage::new();
    let (handle, table) = paged_table(&page, PagedTable::people(10), pager(false, false), 5);

    let rows = table
        .find_rows(&Filters::new(), SearchOptions::new().with_max_pages(2))
        .await
        .unwrap();

    assert_eq!(rows.len(), 4);
    assert_eq!(handle.clicks("next"), 1);
}

#[tokio::test]
async fn find_rows_stops_on_last_page() {
    init_tracing();
    let page = MockPage::new();
    let (handle, table) = paged_table(&page, PagedTable::people(5), pager(false, false), 10);

    let admins = table
        .find_rows(&Filters::new().with("Role", "Admin"), SearchOptions::new())
        .await
        .unwrap();

    let names: Vec<_> = admins
        .to_json(Some(&["Name"]))
        .await
        .unwrap()
        .into_iter()
        .map(|data| data["Name"].clone())
        .collect();
    assert_eq!(names, vec!["User 0", "User 2", "User 4"]);
    assert_eq!(handle.current_page(), 2);
    assert_eq!(table.current_page_index(), 2);
}

#[tokio::test]
async fn find_row_pages_forward_until_match() {
    init_tracing();
    let page = MockPage::new();
    let (_handle, table) = paged_table(&page, PagedTable::people(6), pager(false, false), 3);

    let row = table
        .find_row(&Filters::new().with("Name", "User 5"), SearchOptions::new())
        .await
        .unwrap();

    assert!(row.was_found());
    assert_eq!(row.row_index(), Some(0));
    assert_eq!(row.table_page_index(), None);
    assert_eq!(table.current_page_index(), 2);
    let data = row.to_json(None).await.unwrap();
    assert_eq!(data["Email"], "user5@example.com");
    assert_eq!(data["Role"], "Member");
}

#[tokio::test]
async fn find_row_substring_match() {
    init_tracing();
    let page = MockPage::new();
    let (_handle, table) = paged_table(&page, PagedTable::people(6), pager(false, false), 3);

    let row = table
        .find_row(
            &Filters::new().with("Email", "user3@"),
            SearchOptions::new().with_exact(false),
        )
        .await
        .unwrap();

    assert!(row.was_found());
    assert_eq!(row.to_json(Some(&["Name"])).await.unwrap()["Name"], "User 3");
}

#[tokio::test]
async fn find_row_reports_ambiguity_with_samples() {
    init_tracing();
    let page = MockPage::new();
    let (_handle, table) = paged_table(
        &page,
        PagedTable::people(8).with_rows_per_page(4),
        pager(false, false),
        2,
    );

    let err = table
        .find_row(&Filters::new().with("Role", "Admin"), SearchOptions::new())
        .await
        .unwrap_err();

    assert!(err.is_ambiguous());
    match &err {
        TableError::AmbiguousRow { count, page, message } => {
            assert_eq!(*count, 2);
            assert_eq!(*page, 0);
            assert!(message.contains("Found 2 rows"));
            assert!(message.contains("\"Role\":\"Admin\""));
            assert!(message.contains("Sample rows"));
            assert!(message.contains("User 0"));
            assert!(message.contains("User 2"));
        }
        other => panic!("expected an ambiguity error, got {other:?}"),
    }
    assert_eq!(table.current_page_index(), 0);
}

#[tokio::test]
async fn missing_row_is_a_safe_sentinel() {
    init_tracing();
    let page = MockPage::new();
    let (handle, table) = paged_table(&page, PagedTable::people(6), pager(false, false), 3);

    let row = table
        .find_row(&Filters::new().with("Name", "Nobody"), SearchOptions::new())
        .await
        .unwrap();

    assert!(!row.was_found());
    assert!(!row.is_visible().await.unwrap());
    assert!(row.to_json(None).await.unwrap().is_empty());
    assert_eq!(row.get_cell("Name").unwrap().count().await.unwrap(), 0);
    assert_eq!(handle.current_page(), 2);
}

#[tokio::test]
async fn get_row_stays_on_current_page() {
    init_tracing();
    let page = MockPage::new();
    let (handle, table) = paged_table(&page, PagedTable::people(6), pager(false, false), 3);

    let row = table
        .get_row(&Filters::new().with("Name", "User 3"), true)
        .await
        .unwrap();

    assert!(!row.was_found());
    assert_eq!(handle.clicks("next"), 0);
}

#[tokio::test]
async fn find_rows_skips_loading_placeholders() {
    init_tracing();
    let page = MockPage::new();
    let _ = page.mount(
        el("table")
            .id("jobs")
            .child(el("thead").child(el("tr").child(el("th").text("Job"))))
            .child(
                el("tbody")
                    .child(el("tr").child(el("td").text("build")))
                    .child(el("tr").class("skeleton").child(el("td").text("...")))
                    .child(el("tr").child(el("td").text("deploy"))),
            ),
    );
    let config = TableConfig::new()
        .with_timeouts(fast_timeouts())
        .with_loading(LoadingStrategies::new().with_row_loading(row_has_class("skeleton")));
    let table = use_table(page.locator("#jobs"), config).unwrap();

    let rows = table.find_rows(&Filters::new(), SearchOptions::new()).await.unwrap();

    let jobs: Vec<_> = rows
        .to_json(None)
        .await
        .unwrap()
        .into_iter()
        .map(|data| data["Job"].clone())
        .collect();
    assert_eq!(jobs, vec!["build", "deploy"]);
    assert_eq!(rows[1].row_index(), Some(1));
}

#[tokio::test]
async fn table_loading_that_never_ends_times_out() {
    init_tracing();
    let page = MockPage::new();
    let _ = page.mount(
        el("div")
            .id("busy")
            .child(el("div").class("spinner"))
            .child(
                el("table")
                    .child(el("thead").child(el("tr").child(el("th").text("Job"))))
                    .child(el("tbody").child(el("tr").child(el("td").text("build")))),
            ),
    );
    let config = TableConfig::new()
        .with_timeouts(fast_timeouts().with_table_loading(60, 10))
        .with_loading(LoadingStrategies::new().with_table_loading(has_spinner(".spinner")));
    let table = use_table(page.locator("#busy"), config).unwrap();

    let err = table
        .find_rows(&Filters::new(), SearchOptions::new())
        .await
        .unwrap_err();
    assert!(err.is_timeout());
}

// ============================================================================
// Page restoration
// ============================================================================

#[tokio::test]
async fn bring_into_view_walks_back_to_row_page() {
    init_tracing();
    let page = MockPage::new();
    let (handle, table) = paged_table(&page, PagedTable::people(6), pager(true, false), 3);

    let rows = table.find_rows(&Filters::new(), SearchOptions::new()).await.unwrap();
    assert_eq!(table.current_page_index(), 2);

    let first = &rows[0];
    first.bring_into_view().await.unwrap();

    assert_eq!(handle.clicks("prev"), 2);
    assert_eq!(table.current_page_index(), 0);
    assert_eq!(handle.current_page(), 0);
    assert_eq!(first.to_json(Some(&["Name"])).await.unwrap()["Name"], "User 0");
}

#[tokio::test]
async fn bring_into_view_prefers_first_then_forward() {
    init_tracing();
    let page = MockPage::new();
    let (handle, table) = paged_table(&page, PagedTable::people(8), pager(false, true), 4);

    let rows = table.find_rows(&Filters::new(), SearchOptions::new()).await.unwrap();
    assert_eq!(table.current_page_index(), 3);

    rows[2].bring_into_view().await.unwrap();

    assert_eq!(handle.clicks("first"), 1);
    assert_eq!(table.current_page_index(), 1);
    assert_eq!(handle.current_page(), 1);
}

#[tokio::test]
async fn bring_into_view_without_backward_primitive_fails() {
    init_tracing();
    let page = MockPage::new();
    let (_handle, table) = paged_table(&page, PagedTable::people(4), pager(false, false), 2);

    let rows = table.find_rows(&Filters::new(), SearchOptions::new()).await.unwrap();
    let err = rows[0].bring_into_view().await.unwrap_err();
    assert!(matches!(err, TableError::Navigation { .. }));
}

#[tokio::test]
async fn bring_into_view_needs_row_index() {
    init_tracing();
    let page = MockPage::new();
    let (_handle, table) = paged_table(&page, PagedTable::people(2), pager(false, false), 1);

    let row = table
        .find_row(&Filters::new().with("Name", "Nobody"), SearchOptions::new())
        .await
        .unwrap();
    assert!(row.bring_into_view().await.is_err());
}

#[tokio::test]
async fn reset_then_search_starts_from_first_page() {
    init_tracing();
    let page = MockPage::new();
    let (handle, table) = paged_table(&page, PagedTable::people(6), pager(true, true), 3);

    let _ = table.find_rows(&Filters::new(), SearchOptions::new()).await.unwrap();
    table.reset().await.unwrap();

    assert_eq!(handle.current_page(), 0);
    assert_eq!(table.current_page_index(), 0);
    let row = table
        .find_row(&Filters::new().with("Name", "User 2"), SearchOptions::new())
        .await
        .unwrap();
    assert!(row.was_found());
    assert_eq!(table.current_page_index(), 1);
}

// ============================================================================
// Iteration
// ============================================================================

#[tokio::test]
async fn map_keeps_row_order_across_pages() {
    init_tracing();
    let page = MockPage::new();
    let (_handle, table) = paged_table(&page, PagedTable::people(6), pager(false, false), 3);

    let names = table
        .map(IterationOptions::new(), |ctx| async move {
            let data = ctx.row.to_json(Some(&["Name"])).await?;
            Ok((ctx.index, data["Name"].clone()))
        })
        .await
        .unwrap();

    let expected: Vec<_> = (0..6)
        .map(|i| (i, serde_json::Value::String(format!("User {i}"))))
        .collect();
    assert_eq!(names, expected);
}

#[tokio::test]
async fn for_each_stops_when_asked() {
    init_tracing();
    let page = MockPage::new();
    let (handle, table) = paged_table(&page, PagedTable::people(6), pager(false, false), 3);

    let visited = Mutex::new(Vec::new());
    let visited_ref = &visited;
    table
        .for_each(IterationOptions::new(), move |ctx| async move {
            visited_ref.lock().unwrap().push(ctx.index);
            if ctx.index == 2 {
                ctx.stop();
            }
            Ok(())
        })
        .await
        .unwrap();

    assert_eq!(visited.into_inner().unwrap(), vec![0, 1, 2]);
    assert_eq!(handle.current_page(), 1);
    assert_eq!(table.current_page_index(), 1);
}

#[tokio::test]
async fn filter_collects_matching_rows_from_all_pages() {
    init_tracing();
    let page = MockPage::new();
    let (_handle, table) = paged_table(&page, PagedTable::people(6), pager(false, false), 3);

    let admins = table
        .filter(IterationOptions::new(), |ctx| async move {
            let data = ctx.row.to_json(Some(&["Role"])).await?;
            Ok(data["Role"] == "Admin")
        })
        .await
        .unwrap();

    let pages: Vec<_> = admins.iter().map(SmartRow::table_page_index).collect();
    assert_eq!(pages, vec![Some(0), Some(1), Some(2)]);
}

#[tokio::test]
async fn callback_error_aborts_iteration() {
    init_tracing();
    let page = MockPage::new();
    let (handle, table) = paged_table(&page, PagedTable::people(6), pager(false, false), 3);

    let calls = AtomicUsize::new(0);
    let calls_ref = &calls;
    let result = table
        .map(IterationOptions::new().with_parallel(false), move |ctx| async move {
            calls_ref.fetch_add(1, Ordering::SeqCst);
            if ctx.index == 1 {
                return Err(TableError::InvalidState {
                    message: "row rejected".to_string(),
                });
            }
            Ok(ctx.index)
        })
        .await;

    assert!(result.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(handle.clicks("next"), 0);
}

#[tokio::test]
async fn parallel_callback_error_lets_siblings_finish() {
    init_tracing();
    let page = MockPage::new();
    let (handle, table) = paged_table(&page, PagedTable::people(2), pager(false, false), 1);

    let completed = AtomicUsize::new(0);
    let completed_ref = &completed;
    let result = table
        .for_each(IterationOptions::new().with_parallel(true), move |ctx| async move {
            if ctx.index == 0 {
                return Err(TableError::InvalidState {
                    message: "row rejected".to_string(),
                });
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
            completed_ref.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .await;

    assert!(result.is_err());
    assert_eq!(completed.load(Ordering::SeqCst), 1);
    assert_eq!(handle.clicks("next"), 0);
}

#[tokio::test]
async fn column_values_use_read_override() {
    init_tracing();
    let page = MockPage::new();
    let handle = PagedTable::people(4).mount(&page);
    let reads = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&reads);
    let config = TableConfig::new()
        .with_timeouts(fast_timeouts())
        .with_pagination(click(pager(false, false), ClickOptions::new()))
        .with_max_pages(2)
        .with_column_override(
            "Role",
            ColumnOverride::new().with_read(|cell| async move {
                Ok(serde_json::Value::Bool(cell.inner_text().await?.trim() == "Admin"))
            }),
        )
        .with_before_cell_read(move |_ctx| {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });
    let table = use_table(handle.root(), config).unwrap();

    let values = table
        .get_column_values("Role", IterationOptions::new())
        .await
        .unwrap();

    assert_eq!(values, vec![true, false, true, false]);
    assert_eq!(reads.load(Ordering::SeqCst), 4);
}
