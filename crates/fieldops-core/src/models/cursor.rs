/// Server-reported paging metadata for one fetched page.
///
/// Replaced wholesale on every successful fetch, never mutated in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCursor {
    pub current_page: u32,
    pub total_pages: u32,
    pub total_items: u64,
    pub page_size: u32,
    pub has_next: bool,
    pub has_previous: bool,
}

impl PageCursor {
    /// Build a cursor from server counts. The availability flags are
    /// derived here so they can never disagree with the counts.
    pub fn new(current_page: u32, total_pages: u32, total_items: u64, page_size: u32) -> Self {
        Self {
            current_page,
            total_pages,
            total_items,
            page_size,
            has_next: current_page < total_pages,
            has_previous: current_page > 1,
        }
    }
}
