//! Pagination helpers for collection reads
//!
//! Vendor collections come back in a HAL envelope:
//! `{ "_embedded": { "items": [...] }, "page": { "number", "size", "totalPages", "totalElements" } }`.
//! Pages are 0-indexed.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Default page size. The vendor accepts large pages, so collections usually
/// arrive in a single request.
pub const DEFAULT_PAGE_SIZE: usize = 2000;

/// Query parameters for one page request.
#[derive(Debug, Clone, PartialEq)]
pub struct PageParams {
    /// Page number (0-indexed)
    pub page: usize,
    /// Items per page
    pub size: usize,
    /// Vendor filter expression, sent as `filter`
    pub filter: Option<String>,
}

impl Default for PageParams {
    fn default() -> Self {
        Self {
            page: 0,
            size: DEFAULT_PAGE_SIZE,
            filter: None,
        }
    }
}

impl PageParams {
    pub fn new(size: usize) -> Self {
        Self {
            size: size.max(1),
            ..Default::default()
        }
    }

    /// Set the filter expression.
    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Same parameters for the following page.
    pub fn next(&self) -> Self {
        Self {
            page: self.page + 1,
            ..self.clone()
        }
    }

    /// Convert to query string parameters.
    pub fn to_query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("page", self.page.to_string()),
            ("size", self.size.to_string()),
        ];
        if let Some(ref filter) = self.filter {
            params.push(("filter", filter.clone()));
        }
        params
    }
}

/// Page block of a collection response
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    #[serde(default)]
    pub number: usize,
    #[serde(default)]
    pub size: usize,
    #[serde(default)]
    pub total_pages: usize,
    #[serde(default)]
    pub total_elements: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Embedded {
    #[serde(default)]
    items: Vec<Value>,
}

/// One page of a collection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Page {
    #[serde(rename = "_embedded", default)]
    embedded: Embedded,

    /// Absent when the collection is not paginated
    #[serde(default)]
    pub page: Option<PageMeta>,
}

impl Page {
    pub fn new(items: Vec<Value>, page: Option<PageMeta>) -> Self {
        Self {
            embedded: Embedded { items },
            page,
        }
    }

    pub fn items(&self) -> &[Value] {
        &self.embedded.items
    }

    pub fn into_items(self) -> Vec<Value> {
        self.embedded.items
    }

    /// Whether another page follows this one.
    ///
    /// The page count reported by the server is trusted as-is; a missing
    /// page block means there is nothing more to fetch.
    pub fn has_next_page(&self) -> bool {
        match &self.page {
            Some(meta) => meta.number + 1 < meta.total_pages,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_params() {
        let params = PageParams::new(500).next();
        assert_eq!(
            params.to_query_params(),
            vec![("page", "1".to_string()), ("size", "500".to_string())]
        );
    }

    #[test]
    fn test_query_params_with_filter() {
        let params = PageParams::default().filter("'eventType'='LOGIN'");
        let query = params.to_query_params();
        assert_eq!(query.len(), 3);
        assert_eq!(query[2], ("filter", "'eventType'='LOGIN'".to_string()));
    }

    #[test]
    fn test_zero_size_is_clamped() {
        assert_eq!(PageParams::new(0).size, 1);
    }

    #[test]
    fn test_parse_envelope() {
        let body = json!({
            "_embedded": { "items": [{"id": "a"}, {"id": "b"}] },
            "page": { "number": 0, "size": 2, "totalPages": 3, "totalElements": 5 }
        });
        let page: Page = serde_json::from_value(body).unwrap();
        assert_eq!(page.items().len(), 2);
        assert!(page.has_next_page());
        assert_eq!(page.page.as_ref().unwrap().total_elements, 5);
    }

    #[test]
    fn test_last_page() {
        let page = Page::new(
            vec![],
            Some(PageMeta {
                number: 2,
                size: 2,
                total_pages: 3,
                total_elements: 5,
            }),
        );
        assert!(!page.has_next_page());
    }

    #[test]
    fn test_empty_collection_without_embedded() {
        let page: Page = serde_json::from_value(json!({
            "page": { "number": 0, "size": 2000, "totalPages": 0, "totalElements": 0 }
        }))
        .unwrap();
        assert!(page.items().is_empty());
        assert!(!page.has_next_page());
    }

    #[test]
    fn test_missing_page_block_is_single_page() {
        let page: Page = serde_json::from_value(json!({
            "_embedded": { "items": [{"id": "a"}] }
        }))
        .unwrap();
        assert!(!page.has_next_page());
        assert_eq!(page.into_items().len(), 1);
    }
}
