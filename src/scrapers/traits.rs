use crate::api::ListingDetail;
use crate::error::ScoutError;
use crate::models::PageExtract;
use anyhow::Result;
use async_trait::async_trait;

/// Renders one search-results page and extracts its listings.
/// Abstracted so the headless browser can be swapped for a fake in tests.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch and extract a single page. A rendered page with no listings
    /// (or a selector-wait timeout) comes back with `no_results` set; an
    /// `Err` means the fetch failed catastrophically and the run should end.
    async fn fetch_page(&self, url: &str) -> Result<PageExtract>;
}

/// Per-article detail lookup, one attempt per call.
#[async_trait]
pub trait ListingDetails: Send + Sync {
    async fn listing_detail(&self, article_id: &str) -> Result<ListingDetail, ScoutError>;
}
