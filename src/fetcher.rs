//! Page-level access to the search endpoint.
//!
//! [`PageFetcher`] is the seam between the pagination logic in
//! [`crate::stream`] and the network. [`crate::client::SearchClient`] is the
//! HTTP implementation; tests substitute in-memory fakes.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::Record;

/// Page size observed on the DOJ search endpoint.
pub const DEFAULT_PAGE_SIZE: u64 = 10;

/// One page of search results.
#[derive(Debug, Clone, Default)]
pub struct Page {
    /// Records in the order upstream returned them.
    pub records: Vec<Record>,
    /// Total hits for the query across all pages.
    pub total: u64,
}

impl Page {
    /// True when no page after `page` should be requested.
    ///
    /// Stops when `(page + 1) * page_size >= total` or when this page was empty.
    pub fn is_last(&self, page: u64, page_size: u64) -> bool {
        self.records.is_empty() || (page + 1).saturating_mul(page_size) >= self.total
    }
}

/// Issues one page request against the search endpoint.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch page `page` (zero-based) for `query`.
    ///
    /// Fails with [`crate::Error::Upstream`] on any non-success response or
    /// unreadable body. No retries.
    async fn fetch(&self, query: &str, page: u64) -> Result<Page>;

    /// Records per page, used by the termination rule.
    fn page_size(&self) -> u64 {
        DEFAULT_PAGE_SIZE
    }
}

/// Total number of hits for a single query (one request, page 0).
pub async fn count(fetcher: &dyn PageFetcher, query: &str) -> Result<u64> {
    Ok(fetcher.fetch(query, 0).await?.total)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page_of(n: usize, total: u64) -> Page {
        Page {
            records: (0..n)
                .map(|i| Record::new(format!("d{i}"), "f.pdf", "http://x/f.pdf"))
                .collect(),
            total,
        }
    }

    #[test]
    fn last_page_by_total() {
        assert!(!page_of(10, 25).is_last(0, 10));
        assert!(!page_of(10, 25).is_last(1, 10));
        assert!(page_of(5, 25).is_last(2, 10));
        assert!(page_of(10, 20).is_last(1, 10));
    }

    #[test]
    fn empty_page_is_last_even_when_total_claims_more() {
        assert!(page_of(0, 500).is_last(3, 10));
    }

    #[test]
    fn zero_total_stops_after_first_page() {
        assert!(page_of(0, 0).is_last(0, 10));
        assert!(page_of(3, 0).is_last(0, 10));
    }
}
