use crate::error::{Error, Result};

/// 单页最大条数
pub const MAX_PAGE_SIZE: u32 = 100;

/// 分页请求，页码从 1 开始
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    page_size: u32,
}

impl PageRequest {
    /// 校验并创建分页请求
    ///
    /// `page` 必须 ≥ 1，`page_size` 必须在 `1..=100` 之间。
    pub fn new(page: u32, page_size: u32) -> Result<Self> {
        if page < 1 {
            return Err(Error::Validation("page must be at least 1".into()));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
            return Err(Error::Validation(format!(
                "page_size must be between 1 and {MAX_PAGE_SIZE}"
            )));
        }
        Ok(Self { page, page_size })
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// SQL `OFFSET`
    pub fn offset(&self) -> i64 {
        (i64::from(self.page) - 1) * i64::from(self.page_size)
    }

    /// SQL `LIMIT`
    pub fn limit(&self) -> i64 {
        i64::from(self.page_size)
    }

    /// `ceil(total / page_size)`
    pub fn total_pages(&self, total: i64) -> i64 {
        let size = i64::from(self.page_size);
        (total.max(0) + size - 1) / size
    }
}

/// 一页数据及总条数
#[derive(Debug)]
pub struct Paged<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: PageRequest,
}

impl<T> Paged<T> {
    pub fn total_pages(&self) -> i64 {
        self.page.total_pages(self.total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_pages_rounds_up() {
        let page = PageRequest::new(1, 10).unwrap();
        assert_eq!(page.total_pages(25), 3);
        assert_eq!(page.total_pages(20), 2);
        assert_eq!(page.total_pages(1), 1);
        assert_eq!(page.total_pages(0), 0);
    }

    #[test]
    fn test_offset() {
        assert_eq!(PageRequest::new(1, 10).unwrap().offset(), 0);
        assert_eq!(PageRequest::new(3, 10).unwrap().offset(), 20);
        assert_eq!(PageRequest::new(2, 100).unwrap().limit(), 100);
    }

    #[test]
    fn test_rejects_out_of_range() {
        assert!(matches!(PageRequest::new(0, 10), Err(Error::Validation(_))));
        assert!(matches!(PageRequest::new(1, 0), Err(Error::Validation(_))));
        assert!(matches!(
            PageRequest::new(1, MAX_PAGE_SIZE + 1),
            Err(Error::Validation(_))
        ));
        assert!(PageRequest::new(1, MAX_PAGE_SIZE).is_ok());
    }
}
