use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PaginationParams {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl PaginationParams {
    pub fn new(page: Option<u32>, page_size: Option<u32>) -> Self {
        Self { page, page_size }
    }

    pub fn get_offset(&self) -> u64 {
        let page = self.page.unwrap_or(1).max(1);
        let size = self.get_limit();
        u64::from(page - 1) * size
    }

    pub fn get_limit(&self) -> u64 {
        u64::from(self.page_size.unwrap_or(20).clamp(1, 100))
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub page: u32,
    pub page_size: u32,
    pub total: i64,
    pub total_pages: i64,
}

impl<T> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, page: u32, page_size: u32, total: i64) -> Self {
        let total_pages = if page_size == 0 {
            0
        } else {
            (total + i64::from(page_size) - 1) / i64::from(page_size)
        };
        Self {
            data,
            page,
            page_size,
            total,
            total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_and_limit() {
        let p = PaginationParams::new(Some(3), Some(20));
        assert_eq!(p.get_offset(), 40);
        assert_eq!(p.get_limit(), 20);

        let p = PaginationParams::new(None, None);
        assert_eq!(p.get_offset(), 0);
        assert_eq!(p.get_limit(), 20);
    }

    #[test]
    fn test_total_pages_rounds_up() {
        let page: PaginatedResponse<u8> = PaginatedResponse::new(vec![], 1, 20, 41);
        assert_eq!(page.total_pages, 3);
    }
}
