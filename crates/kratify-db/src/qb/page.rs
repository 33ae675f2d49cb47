use serde::Serialize;

/// One page of results plus the totals needed to render pagination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
    pub total_pages: i64,
    pub data: Vec<T>,
}

impl<T> Page<T> {
    pub fn new(page: i64, per_page: i64, total: i64, data: Vec<T>) -> Self {
        let total_pages = if per_page > 0 {
            total / per_page + i64::from(total % per_page > 0)
        } else {
            0
        };
        Self {
            page,
            per_page,
            total,
            total_pages,
            data,
        }
    }

    /// Map the rows, keeping the totals.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            page: self.page,
            per_page: self.per_page,
            total: self.total,
            total_pages: self.total_pages,
            data: self.data.into_iter().map(f).collect(),
        }
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_pages_rounds_up() {
        let page = Page::new(1, 10, 21, vec![1, 2, 3]);
        assert_eq!(page.total_pages, 3);
        assert!(page.has_next());
    }

    #[test]
    fn empty_result_has_no_pages() {
        let page: Page<i32> = Page::new(1, 10, 0, vec![]);
        assert_eq!(page.total_pages, 0);
        assert!(!page.has_next());
    }

    #[test]
    fn huge_per_page_does_not_overflow() {
        let page: Page<i32> = Page::new(1, i64::MAX, 5, vec![]);
        assert_eq!(page.total_pages, 1);

        let page: Page<i32> = Page::new(1, 10, i64::MAX, vec![]);
        assert_eq!(page.total_pages, i64::MAX / 10 + 1);
    }

    #[test]
    fn serializes_with_field_names() {
        let page = Page::new(2, 5, 6, vec!["x"]);
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "page": 2,
                "per_page": 5,
                "total": 6,
                "total_pages": 2,
                "data": ["x"],
            })
        );
    }
}
