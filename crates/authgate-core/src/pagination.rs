//! Page window policy shared by every listing operation
//!
//! Pages are zero-based and fixed-size. A page whose first index lies at or
//! beyond the record count is an error, even when the count is zero. A page
//! that starts in range but runs past the end returns the partial remainder.

use std::ops::Range;

/// Records per page
pub const PAGE_SIZE: u64 = 20;

/// Index range of `page` over `total` records, or `None` when the page
/// starts beyond the last record
pub fn page_window(total: usize, page: u64, page_size: u64) -> Option<Range<usize>> {
    let start = page.checked_mul(page_size)?;
    let start = usize::try_from(start).ok()?;
    if start >= total {
        return None;
    }
    let end = start.saturating_add(page_size as usize).min(total);
    Some(start..end)
}

/// Clone one page out of an insertion-ordered slice
pub fn paginate<T: Clone>(items: &[T], page: u64) -> Option<Vec<T>> {
    page_window(items.len(), page, PAGE_SIZE).map(|range| items[range].to_vec())
}
