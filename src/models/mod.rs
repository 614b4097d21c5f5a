use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One marketplace listing flowing through the pipeline.
///
/// Ids are assigned 1-based in discovery order once the crawl finishes and
/// are never reassigned afterwards; later stages may drop a listing but may
/// not renumber the survivors.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Listing {
    pub id: u32,
    pub title: String,
    /// Raw price text as scraped, e.g. "1.234,50 KM" or "Na upit"
    pub raw_price: String,
    /// Numeric price, filled in by the cleaner; absent until then and for
    /// listings whose price text never parsed
    pub price: Option<f64>,
    pub url: String,
}

/// Everything extracted from a single rendered search page.
///
/// Ephemeral; consumed by the pagination driver and never persisted past
/// the page it came from.
#[derive(Debug, Clone, Default)]
pub struct PageExtract {
    /// Marketplace ids pulled from the detail links, in page order
    pub article_ids: Vec<String>,
    pub titles: Vec<String>,
    pub prices: Vec<String>,
    pub urls: Vec<String>,
    /// Set when the page rendered but contained no listings (or the price
    /// selector never appeared); signals the driver to stop
    pub no_results: bool,
}

/// Audit record for one enrichment attempt. Diagnostics only.
#[derive(Debug, Clone)]
pub struct CallLogEntry {
    pub article_id: String,
    pub status: Option<u16>,
    pub latency_ms: u128,
    pub success: bool,
    pub error: Option<String>,
    pub at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn removing_a_listing_does_not_renumber_the_rest() {
        let mut listings: Vec<Listing> = (1..=5)
            .map(|id| Listing {
                id,
                title: format!("item {id}"),
                raw_price: "10 KM".into(),
                price: Some(10.0),
                url: format!("https://olx.ba/artikal/{id}"),
            })
            .collect();

        listings.retain(|l| l.id != 3);

        let ids: Vec<u32> = listings.iter().map(|l| l.id).collect();
        assert_eq!(ids, vec![1, 2, 4, 5]);
    }
}
