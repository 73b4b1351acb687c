use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based.
    pub page: u32,
    pub per_page: u32,
}

impl PageRequest {
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.per_page)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageMeta {
    pub current_page: u32,
    pub last_page: u32,
    pub per_page: u32,
    pub total: u64,
}

impl PageMeta {
    pub fn new(request: PageRequest, total: u64) -> Self {
        let per_page = u64::from(request.per_page.max(1));
        let last_page = total.div_ceil(per_page).max(1);
        Self {
            current_page: request.page,
            last_page: u32::try_from(last_page).unwrap_or(u32::MAX),
            per_page: request.per_page,
            total,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub meta: PageMeta,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, request: PageRequest, total: u64) -> Self {
        Self {
            items,
            meta: PageMeta::new(request, total),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_page_is_at_least_one() {
        let meta = PageMeta::new(PageRequest { page: 1, per_page: 15 }, 0);
        assert_eq!(meta.last_page, 1);
        assert_eq!(meta.total, 0);
    }

    #[test]
    fn last_page_rounds_up() {
        let request = PageRequest { page: 3, per_page: 15 };
        assert_eq!(PageMeta::new(request, 31).last_page, 3);
        assert_eq!(PageMeta::new(request, 30).last_page, 2);
        assert_eq!(request.offset(), 30);
    }
}
