//! Page-number pagination.

use serde::Serialize;

/// Resolved position within a paginated listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pager {
    /// Current page, 1-based and clamped to `1..=total_pages`.
    pub page: u32,
    pub per_page: u32,
    pub total_items: u64,
    /// Never less than 1, so an empty listing still has a page to show.
    pub total_pages: u32,
    pub has_next: bool,
    pub has_prev: bool,
}

impl Pager {
    /// Resolve a requested page against a total item count.
    pub fn new(requested: u32, per_page: u32, total_items: u64) -> Self {
        let per_page = per_page.max(1);
        let total_pages = total_items
            .div_ceil(u64::from(per_page))
            .clamp(1, u64::from(u32::MAX)) as u32;
        let page = requested.clamp(1, total_pages);

        Self {
            page,
            per_page,
            total_items,
            total_pages,
            has_next: page < total_pages,
            has_prev: page > 1,
        }
    }

    /// Row offset of the first item on the current page.
    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.per_page)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.per_page)
    }
}
