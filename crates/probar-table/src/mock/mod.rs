//! In-memory host for the locator capability interface.
//!
//! Used by the crate's own tests and handy for exercising custom strategies
//! without a browser. The page is an element arena plus click, key and scroll
//! handlers; [`MockLocator`] resolves its step chain lazily on every call, so a
//! locator created before a re-render sees the new elements.
//!
//! ```
//! use probar_table::mock::{el, MockPage};
//! use probar_table::TableLocator;
//!
//! # tokio_test();
//! # fn tokio_test() {
//! # let rt = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
//! # rt.block_on(async {
//! let page = MockPage::new();
//! page.mount(el("ul").child(el("li").text("one")).child(el("li").text("two")));
//! assert_eq!(page.locator("li").count().await.unwrap(), 2);
//! # });
//! # }
//! ```

mod dom;
mod fixtures;
mod page;

pub use dom::{el, ClickHandler, KeyHandler, MockDom, MockElement, MockNode, NodeId, ScrollHandler};
pub use fixtures::{PagedTable, PagedTableHandle};
pub use page::{MockLocator, MockPage};
