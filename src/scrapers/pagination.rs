use anyhow::Result;
use tracing::{debug, info};

use crate::enrich::enrich_page;
use crate::models::Listing;
use crate::scrapers::traits::{ListingDetails, PageFetcher};

/// Walks search pages in order, enriching every listing it finds, until a
/// page comes back empty or the page cap is hit.
pub struct PaginationDriver<'a> {
    fetcher: &'a dyn PageFetcher,
    details: &'a dyn ListingDetails,
}

impl<'a> PaginationDriver<'a> {
    pub fn new(fetcher: &'a dyn PageFetcher, details: &'a dyn ListingDetails) -> Self {
        Self { fetcher, details }
    }

    /// Crawl pages 1..=max_pages of `base_url`, accumulating listings in
    /// discovery order.
    ///
    /// A page reporting no results ends the crawl and contributes nothing,
    /// not even partial rows. A fetch error is fatal and aborts the whole
    /// run. Ids are assigned 1..N only after the crawl finishes, by zipping
    /// the accumulated title/price/url sequences by position.
    pub async fn crawl(&self, base_url: &str, max_pages: u32) -> Result<Vec<Listing>> {
        let mut all_titles: Vec<String> = Vec::new();
        let mut all_prices: Vec<String> = Vec::new();
        let mut all_urls: Vec<String> = Vec::new();

        let mut page = 1;
        while page <= max_pages {
            let url = format!("{}&page={}", base_url, page);
            info!("Scraping page {}...", page);

            let extract = self.fetcher.fetch_page(&url).await?;

            if extract.no_results {
                info!("No more results found.");
                break;
            }

            debug!(
                "Page {}: {} raw titles, {} raw prices, {} article links",
                page,
                extract.titles.len(),
                extract.prices.len(),
                extract.article_ids.len()
            );

            let enriched = enrich_page(self.details, &extract.article_ids).await;
            let failed = enriched.call_log.iter().filter(|e| !e.success).count();
            if failed > 0 {
                info!(
                    "Page {}: {} of {} detail calls failed",
                    page,
                    failed,
                    enriched.call_log.len()
                );
                crate::enrich::log_failures(&enriched.call_log);
            }

            all_titles.extend(enriched.titles);
            all_prices.extend(enriched.prices);
            all_urls.extend(extract.urls);

            if page == max_pages {
                info!("Reached maximum page limit: {}", max_pages);
                break;
            }

            page += 1;
        }

        let listings = all_titles
            .into_iter()
            .zip(all_prices)
            .zip(all_urls)
            .enumerate()
            .map(|(idx, ((title, raw_price), url))| Listing {
                id: idx as u32 + 1,
                title,
                raw_price,
                price: None,
                url,
            })
            .collect();

        Ok(listings)
    }
}
