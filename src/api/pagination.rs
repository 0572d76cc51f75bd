//! Page-number pagination for list endpoints.

use serde::Deserialize;

use super::error::ApiError;
use super::types::Page;

pub const PAGE_SIZE: i64 = 10;

/// `?page=N` (1-based). Missing means the first page.
#[derive(Debug, Clone, Copy)]
pub struct PageRequest {
    pub page: i64,
}

impl PageRequest {
    /// Parse the raw `page` query value. Garbage and zero are 404s.
    pub fn parse(raw: Option<&str>) -> Result<Self, ApiError> {
        let page = match raw {
            None | Some("") => 1,
            Some(raw) => raw.parse::<i64>().map_err(|_| invalid_page())?,
        };
        if page < 1 {
            return Err(invalid_page());
        }
        Ok(Self { page })
    }

    pub fn limit(&self) -> i64 {
        PAGE_SIZE
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * PAGE_SIZE
    }

    /// Reject pages past the end. Page 1 of an empty list is fine.
    pub fn check(&self, count: i64) -> Result<(), ApiError> {
        if self.page > 1 && self.offset() >= count {
            return Err(invalid_page());
        }
        Ok(())
    }

    pub fn into_page<T>(self, count: i64, results: Vec<T>) -> Page<T> {
        Page {
            count,
            next: (self.page * PAGE_SIZE < count).then_some(self.page + 1),
            previous: (self.page > 1).then_some(self.page - 1),
            results,
        }
    }
}

/// Query parameters shared by every list endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

fn invalid_page() -> ApiError {
    ApiError::NotFound("Invalid page.".into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!(PageRequest::parse(None).unwrap().page, 1);
        assert_eq!(PageRequest::parse(Some("3")).unwrap().page, 3);
        assert!(PageRequest::parse(Some("0")).is_err());
        assert!(PageRequest::parse(Some("abc")).is_err());
    }

    #[test]
    fn test_bounds() {
        let first = PageRequest::parse(None).unwrap();
        assert!(first.check(0).is_ok());

        let second = PageRequest::parse(Some("2")).unwrap();
        assert!(second.check(10).is_err());
        assert!(second.check(11).is_ok());
        assert_eq!(second.offset(), 10);
    }

    #[test]
    fn test_links() {
        let page = PageRequest::parse(Some("2")).unwrap().into_page(25, vec![(); 10]);
        assert_eq!(page.next, Some(3));
        assert_eq!(page.previous, Some(1));

        let last = PageRequest::parse(Some("3")).unwrap().into_page(25, vec![(); 5]);
        assert_eq!(last.next, None);

        let only = PageRequest::parse(None).unwrap().into_page(10, vec![(); 10]);
        assert_eq!(only.next, None);
        assert_eq!(only.previous, None);
    }
}
