//! Paged list projection.

use crate::domain::snapshot::WindowSnapshot;

/// What a paginated list view renders.
#[derive(Debug, Clone, PartialEq)]
pub struct PagedListView<T> {
    pub items: Vec<T>,
    pub total_count: u64,
    pub page_index: u32,
    pub page_count: u32,
}

impl<T> PagedListView<T> {
    pub fn has_next(&self) -> bool {
        self.page_index + 1 < self.page_count
    }

    pub fn has_previous(&self) -> bool {
        self.page_index > 0
    }
}

/// Projects a window into a paged list view.
pub fn project_page<T: Clone>(window: &WindowSnapshot<T>) -> PagedListView<T> {
    let page_count = if window.page_size == 0 {
        0
    } else {
        let pages = window.total_count.div_ceil(window.page_size as u64);
        u32::try_from(pages).unwrap_or(u32::MAX)
    };
    PagedListView {
        items: window.items.clone(),
        total_count: window.total_count,
        page_index: window.page_index,
        page_count,
    }
}
