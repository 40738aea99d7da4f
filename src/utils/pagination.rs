use serde::Serialize;

use crate::utils::AppError;

pub const DEFAULT_LIMIT: u64 = 10;
pub const MAX_LIMIT: u64 = 100;

/// Validated page request (1-based page, bounded limit).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub limit: u64,
}

impl PageRequest {
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Result<Self, AppError> {
        let page = page.unwrap_or(1);
        if page < 1 {
            return Err(AppError::Validation {
                message: "Page must be a positive integer".to_string(),
                fields: vec!["page".to_string()],
            });
        }

        let limit = limit.unwrap_or(DEFAULT_LIMIT as i64);
        if limit < 1 || limit > MAX_LIMIT as i64 {
            return Err(AppError::Validation {
                message: format!("Limit must be between 1 and {}", MAX_LIMIT),
                fields: vec!["limit".to_string()],
            });
        }

        // Stores take the skip as a signed 64-bit count.
        if (page - 1).checked_mul(limit).is_none() {
            return Err(AppError::Validation {
                message: "Page is out of range".to_string(),
                fields: vec!["page".to_string()],
            });
        }

        Ok(Self { page: page as u64, limit: limit as u64 })
    }

    pub fn skip(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self { page: 1, limit: DEFAULT_LIMIT }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: u64,
    pub total_pages: u64,
    pub total_items: u64,
    pub items_per_page: u64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl Pagination {
    pub fn new(request: PageRequest, total_items: u64) -> Self {
        let total_pages = total_items.div_ceil(request.limit);
        Self {
            current_page: request.page,
            total_pages,
            total_items,
            items_per_page: request.limit,
            has_next_page: request.page < total_pages,
            has_prev_page: request.page > 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn parse(value: Option<&str>) -> Result<Self, AppError> {
        match value {
            None | Some("desc") => Ok(SortOrder::Desc),
            Some("asc") => Ok(SortOrder::Asc),
            Some(_) => Err(AppError::Validation {
                message: "Sort order must be either asc or desc".to_string(),
                fields: vec!["sortOrder".to_string()],
            }),
        }
    }

    pub fn as_mongo(&self) -> i32 {
        match self {
            SortOrder::Asc => 1,
            SortOrder::Desc => -1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_bounds() {
        assert!(PageRequest::new(Some(0), None).is_err());
        assert!(PageRequest::new(None, Some(0)).is_err());
        assert!(PageRequest::new(None, Some(101)).is_err());
        assert_eq!(PageRequest::new(None, None).unwrap(), PageRequest::default());
        assert_eq!(PageRequest::new(Some(3), Some(20)).unwrap().skip(), 40);
    }

    #[test]
    fn test_huge_page_is_rejected_not_overflowed() {
        let err = PageRequest::new(Some(i64::MAX), Some(10)).unwrap_err();
        match err {
            AppError::Validation { fields, .. } => assert_eq!(fields, vec!["page".to_string()]),
            other => panic!("unexpected error: {:?}", other),
        }

        let far = PageRequest::new(Some(i64::MAX / 100), Some(100)).unwrap();
        assert_eq!(far.skip(), (i64::MAX as u64 / 100 - 1) * 100);
        assert_eq!(PageRequest { page: u64::MAX, limit: 100 }.skip(), u64::MAX);
    }

    #[test]
    fn test_pagination_math() {
        let p = Pagination::new(PageRequest { page: 1, limit: 10 }, 25);
        assert_eq!(p.total_pages, 3);
        assert!(p.has_next_page);
        assert!(!p.has_prev_page);

        let last = Pagination::new(PageRequest { page: 3, limit: 10 }, 25);
        assert!(!last.has_next_page);
        assert!(last.has_prev_page);

        let exact = Pagination::new(PageRequest { page: 2, limit: 5 }, 10);
        assert_eq!(exact.total_pages, 2);
        assert!(!exact.has_next_page);

        let empty = Pagination::new(PageRequest::default(), 0);
        assert_eq!(empty.total_pages, 0);
        assert!(!empty.has_next_page);
    }

    #[test]
    fn test_sort_order() {
        assert_eq!(SortOrder::parse(None).unwrap(), SortOrder::Desc);
        assert_eq!(SortOrder::parse(Some("asc")).unwrap().as_mongo(), 1);
        assert!(SortOrder::parse(Some("up")).is_err());
    }
}
