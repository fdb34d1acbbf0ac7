pub mod academic;
pub mod report;
pub mod role;

pub use academic::*;
pub use report::*;
pub use role::*;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// 分页参数
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 20,
        }
    }
}

impl Pagination {
    pub fn offset(&self) -> i64 {
        (self.page.saturating_sub(1) as i64) * self.page_size as i64
    }
}

/// 分页结果
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PagedResult<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
}

impl<T> PagedResult<T> {
    pub fn new(items: Vec<T>, total: i64, pagination: Pagination) -> Self {
        let total_pages = if total == 0 {
            0
        } else {
            ((total as f64) / (pagination.page_size as f64)).ceil() as u32
        };

        Self {
            items,
            total,
            page: pagination.page,
            page_size: pagination.page_size,
            total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paged_result_pages() {
        let pagination = Pagination {
            page: 2,
            page_size: 20,
        };
        let result = PagedResult::new(vec![1, 2, 3], 41, pagination);
        assert_eq!(result.total_pages, 3);
        assert_eq!(pagination.offset(), 20);

        let empty: PagedResult<i32> = PagedResult::new(vec![], 0, Pagination::default());
        assert_eq!(empty.total_pages, 0);
    }
}
