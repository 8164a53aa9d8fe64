//! Paginated listing abstraction.
//!
//! A [`PagedSource`] knows how to fetch one bounded slice of a remote
//! collection. Aggregation across pages is the caller's concern; a source
//! performs exactly one request per `fetch_page` call and never retries.

use async_trait::async_trait;

use crate::error::Result;

/// One bounded slice of a remote paginated collection.
#[derive(Debug, Clone)]
pub struct Page<T> {
    /// Items returned for this page, in server order
    pub items: Vec<T>,
    /// Total number of items in the collection
    pub total: u32,
    /// 1-based index of the first item on this page
    pub start: u32,
    /// Number of items actually returned
    pub count: u32,
}

impl<T> Page<T> {
    /// Whether this page alone already covers the whole collection.
    pub fn covers_total(&self) -> bool {
        self.count >= self.total
    }
}

/// A remote collection that can be read one page at a time.
///
/// `start` is 1-based, matching the remote API convention. A page with zero
/// items is a valid result and is distinct from an error. Errors are reported
/// to the caller; retry, if any, is the caller's responsibility.
#[async_trait]
pub trait PagedSource: Send + Sync {
    type Item: Send + 'static;

    async fn fetch_page(&self, start: u32, count: u32) -> Result<Page<Self::Item>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_covers_total() {
        let page = Page {
            items: vec![1u32],
            total: 1,
            start: 1,
            count: 1,
        };
        assert!(page.covers_total());

        let page = Page {
            items: vec![1u32],
            total: 250,
            start: 1,
            count: 1,
        };
        assert!(!page.covers_total());
    }
}
