use serde::Serialize;

/// Largest page size a caller may request.
pub const MAX_PAGE_SIZE: u32 = 100;

/// 1-based page window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
}

impl PageRequest {
    pub fn new(page: u32, size: u32) -> Self {
        Self { page, size }
    }

    /// Rows skipped before this page starts: `(page-1)*size`.
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit())
    }

    pub fn limit(&self) -> u32 {
        self.size.min(MAX_PAGE_SIZE)
    }
}

#[derive(Debug, Serialize)]
pub struct Paginated<T: Serialize> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub size: u32,
    pub total_pages: u64,
    pub has_next: bool,
    pub has_previous: bool,
}

impl<T: Serialize> Paginated<T> {
    pub fn new(items: Vec<T>, total: u64, request: &PageRequest) -> Self {
        let size = u64::from(request.limit());
        let total_pages = if total == 0 || size == 0 { 0 } else { total.div_ceil(size) };
        Self {
            items,
            total,
            page: request.page,
            size: request.limit(),
            total_pages,
            has_next: u64::from(request.page) < total_pages,
            has_previous: request.page > 1,
        }
    }
}

// ─── Tests ───

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_is_page_minus_one_times_size() {
        assert_eq!(PageRequest::new(1, 10).offset(), 0);
        assert_eq!(PageRequest::new(2, 10).offset(), 10);
        assert_eq!(PageRequest::new(0, 10).offset(), 0);
    }

    #[test]
    fn size_is_capped() {
        assert_eq!(PageRequest::new(1, 500).limit(), MAX_PAGE_SIZE);
    }

    #[test]
    fn metadata_for_middle_page() {
        let page: Paginated<u32> = Paginated::new((11..=20).collect(), 25, &PageRequest::new(2, 10));
        assert_eq!(page.total, 25);
        assert_eq!(page.total_pages, 3);
        assert!(page.has_next);
        assert!(page.has_previous);
    }

    #[test]
    fn empty_result_has_no_pages() {
        let page: Paginated<u32> = Paginated::new(vec![], 0, &PageRequest::new(1, 10));
        assert_eq!(page.total_pages, 0);
        assert!(!page.has_next);
    }
}
