use std::time::Instant;

use chrono::Utc;
use tracing::{debug, warn};

use crate::error::ScoutError;
use crate::models::CallLogEntry;
use crate::scrapers::traits::ListingDetails;

/// Placeholder row emitted when a detail call fails, so title/price/url
/// sequences stay positionally aligned across the page.
pub const SENTINEL_TITLE: &str = "NO TITLE error 404";
pub const SENTINEL_PRICE: &str = "0";

/// Titles and prices for one page's article ids, plus the audit log of
/// every detail call made to produce them.
#[derive(Debug, Default)]
pub struct EnrichedPage {
    pub titles: Vec<String>,
    pub prices: Vec<String>,
    pub call_log: Vec<CallLogEntry>,
}

/// Fetch details for each article id on a page, one attempt per id.
///
/// Failures never propagate: a failed call contributes a sentinel row and a
/// logged diagnostic, and the loop moves on. Output rows are index-aligned
/// with `article_ids`.
pub async fn enrich_page(api: &dyn ListingDetails, article_ids: &[String]) -> EnrichedPage {
    let mut enriched = EnrichedPage::default();

    for article_id in article_ids {
        let started = Instant::now();
        let outcome = api.listing_detail(article_id).await;
        let latency_ms = started.elapsed().as_millis();

        match outcome {
            Ok(detail) => {
                debug!(
                    "Article {}: '{}' at {} ({} ms)",
                    article_id, detail.title, detail.display_price, latency_ms
                );
                enriched.call_log.push(CallLogEntry {
                    article_id: article_id.clone(),
                    status: Some(200),
                    latency_ms,
                    success: true,
                    error: None,
                    at: Utc::now(),
                });
                enriched.titles.push(detail.title);
                enriched.prices.push(detail.display_price);
            }
            Err(err) => {
                let status = match &err {
                    ScoutError::Api { status, .. } => Some(*status),
                    _ => None,
                };
                warn!(
                    "Article {}: detail call failed ({}), using placeholder",
                    article_id, err
                );
                enriched.call_log.push(CallLogEntry {
                    article_id: article_id.clone(),
                    status,
                    latency_ms,
                    success: false,
                    error: Some(err.to_string()),
                    at: Utc::now(),
                });
                enriched.titles.push(SENTINEL_TITLE.to_string());
                enriched.prices.push(SENTINEL_PRICE.to_string());
            }
        }
    }

    enriched
}

/// Dump failed attempts from a page's call log at debug level.
pub fn log_failures(call_log: &[CallLogEntry]) {
    for entry in call_log.iter().filter(|e| !e.success) {
        debug!(
            "Article {}: status {:?} after {} ms at {}: {}",
            entry.article_id,
            entry.status,
            entry.latency_ms,
            entry.at,
            entry.error.as_deref().unwrap_or("unknown error")
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ListingDetail;
    use async_trait::async_trait;

    /// Fake detail API: ids listed in `failing` return a 404.
    struct FakeDetails {
        failing: Vec<String>,
    }

    #[async_trait]
    impl ListingDetails for FakeDetails {
        async fn listing_detail(&self, article_id: &str) -> Result<ListingDetail, ScoutError> {
            if self.failing.iter().any(|id| id == article_id) {
                return Err(ScoutError::Api {
                    status: 404,
                    body: "not found".into(),
                });
            }
            Ok(ListingDetail {
                title: format!("title-{article_id}"),
                display_price: format!("{article_id} KM"),
            })
        }
    }

    #[tokio::test]
    async fn failed_calls_emit_sentinel_rows_in_position() {
        let api = FakeDetails {
            failing: vec!["2".into()],
        };
        let ids = vec!["1".to_string(), "2".to_string(), "3".to_string()];

        let enriched = enrich_page(&api, &ids).await;

        assert_eq!(enriched.titles, vec!["title-1", SENTINEL_TITLE, "title-3"]);
        assert_eq!(enriched.prices, vec!["1 KM", SENTINEL_PRICE, "3 KM"]);
        assert_eq!(enriched.call_log.len(), 3);
        assert!(enriched.call_log[0].success);
        assert!(!enriched.call_log[1].success);
        assert_eq!(enriched.call_log[1].status, Some(404));
        assert!(enriched.call_log[2].success);
    }

    #[tokio::test]
    async fn empty_page_enriches_to_nothing() {
        let api = FakeDetails { failing: vec![] };
        let enriched = enrich_page(&api, &[]).await;
        assert!(enriched.titles.is_empty());
        assert!(enriched.call_log.is_empty());
    }
}
