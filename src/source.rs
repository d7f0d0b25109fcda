//! The page source seam: anything that can hand over page `n` of a listing.

use async_trait::async_trait;

use crate::record::RawRecord;
use crate::Result;

/// One fetched page.
///
/// An empty `records` means the source is exhausted, whatever `continuation` says.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    pub records: Vec<RawRecord>,
    pub continuation: bool,
}

impl Page {
    pub fn new(records: Vec<RawRecord>, continuation: bool) -> Self {
        Self {
            records,
            continuation,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetches page `page` (1-based). Must accept any positive page number.
    async fn fetch_page(&self, page: usize) -> Result<Page>;
}

const SAMPLE_ADDRESSES: [&str; 6] = [
    "431 18th Street NW, Washington, DC 20006",
    "789 Pine Rd, Chicago, IL 60601",
    "55 Water St, New York, NY 10041",
    "12 Ocean Ave, Santa Monica, California",
    "900 Congress Ave, Austin, Texas",
    "123 Main St, City, Nowhere",
];

/// Deterministic generator of `pages * per_page` organizations.
#[derive(Debug, Clone)]
pub struct SyntheticSource {
    pages: usize,
    per_page: usize,
}

impl SyntheticSource {
    pub fn new(pages: usize, per_page: usize) -> Self {
        Self { pages, per_page }
    }

    fn record(n: usize) -> RawRecord {
        RawRecord::new(
            format!("Organization {n:05}"),
            SAMPLE_ADDRESSES[n % SAMPLE_ADDRESSES.len()],
            format!("https://www.org{n}.example.org"),
        )
    }
}

#[async_trait]
impl PageSource for SyntheticSource {
    async fn fetch_page(&self, page: usize) -> Result<Page> {
        if page == 0 || page > self.pages {
            return Ok(Page::default());
        }
        let first = (page - 1) * self.per_page;
        let records = (first..first + self.per_page).map(Self::record).collect();
        Ok(Page::new(records, page < self.pages))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn synthetic_pages_are_deterministic() {
        let source = SyntheticSource::new(3, 4);
        let first = source.fetch_page(2).await.unwrap();
        let again = source.fetch_page(2).await.unwrap();
        assert_eq!(first, again);
        assert_eq!(first.records.len(), 4);
        assert_eq!(first.records[0].name, "Organization 00004");
        assert!(first.continuation);
    }

    #[tokio::test]
    async fn synthetic_source_runs_dry() {
        let source = SyntheticSource::new(3, 4);
        assert!(!source.fetch_page(3).await.unwrap().continuation);
        assert!(source.fetch_page(4).await.unwrap().is_empty());
        assert!(source.fetch_page(0).await.unwrap().is_empty());
    }
}
