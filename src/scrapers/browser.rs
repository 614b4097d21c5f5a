use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use scraper::{Html, Selector};
use tracing::{debug, info, warn};

use crate::error::ScoutError;
use crate::models::PageExtract;
use crate::scrapers::traits::PageFetcher;

/// Page render budget; navigation past this is a catastrophic fetch failure.
const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);
/// How long to wait for the first price element before declaring the page empty.
const RESULTS_TIMEOUT: Duration = Duration::from_secs(10);

const PRICE_SELECTOR: &str = ".price-wrap .smaller";
const TITLE_SELECTOR: &str = ".main-heading";
const CARD_SELECTOR: &str = "article";
const LINK_SELECTOR: &str = r#"a[href*="/artikal/"]"#;

/// Browser-based fetcher for OLX search pages using headless Chrome.
pub struct OlxBrowserFetcher {
    browser: Browser,
}

impl OlxBrowserFetcher {
    /// Launch headless Chrome.
    pub fn new() -> Result<Self> {
        info!("Launching headless Chrome...");

        let options = LaunchOptions::default_builder()
            .headless(true)
            .build()
            .context("Failed to build launch options")?;

        let browser =
            Browser::new(options).map_err(|e| ScoutError::Browser(e.to_string()))?;

        Ok(Self { browser })
    }

    fn fetch_page_blocking(&self, url: &str) -> Result<PageExtract> {
        let tab = self.browser.new_tab()?;
        tab.set_default_timeout(NAVIGATION_TIMEOUT);

        // The tab must not leak across pages, whatever extraction does.
        let result = self.extract_from_tab(&tab, url);
        let _ = tab.close(true);
        result
    }

    fn extract_from_tab(&self, tab: &Tab, url: &str) -> Result<PageExtract> {
        debug!("Navigating to {}", url);
        tab.navigate_to(url)?;
        tab.wait_until_navigated()?;

        if tab
            .wait_for_element_with_custom_timeout(PRICE_SELECTOR, RESULTS_TIMEOUT)
            .is_err()
        {
            debug!("No price elements appeared within {:?}", RESULTS_TIMEOUT);
            return Ok(PageExtract {
                no_results: true,
                ..Default::default()
            });
        }

        let html = tab.get_content()?;
        if html.is_empty() {
            warn!("Rendered page came back empty");
            return Ok(PageExtract {
                no_results: true,
                ..Default::default()
            });
        }

        Ok(extract_listings(&html))
    }
}

#[async_trait]
impl PageFetcher for OlxBrowserFetcher {
    async fn fetch_page(&self, url: &str) -> Result<PageExtract> {
        self.fetch_page_blocking(url)
    }
}

/// Pull titles, prices and detail links out of a rendered search page.
/// Rows stay positionally aligned: one card contributes either a full row
/// or nothing.
fn extract_listings(html: &str) -> PageExtract {
    let document = Html::parse_document(html);
    let card_selector = Selector::parse(CARD_SELECTOR).unwrap();
    let title_selector = Selector::parse(TITLE_SELECTOR).unwrap();
    let price_selector = Selector::parse(PRICE_SELECTOR).unwrap();
    let link_selector = Selector::parse(LINK_SELECTOR).unwrap();

    let mut extract = PageExtract::default();

    for (idx, card) in document.select(&card_selector).enumerate() {
        let title = card
            .select(&title_selector)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string());
        let price = card
            .select(&price_selector)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string());
        let href = card
            .select(&link_selector)
            .next()
            .and_then(|el| el.value().attr("href"))
            .map(str::to_string);

        match (title, price, href) {
            (Some(title), Some(price), Some(href)) => {
                let article_id = match article_id_from_href(&href) {
                    Some(id) => id,
                    None => {
                        debug!("Card {}: no article id in href '{}'", idx, href);
                        continue;
                    }
                };
                extract.article_ids.push(article_id);
                extract.titles.push(title);
                extract.prices.push(price);
                extract.urls.push(absolute_url(&href));
            }
            (title, price, href) => {
                debug!(
                    "Skipped card {}: title={}, price={}, link={}",
                    idx,
                    title.is_some(),
                    price.is_some(),
                    href.is_some()
                );
            }
        }
    }

    extract.no_results = extract.article_ids.is_empty();
    info!("Found {} listing cards on page", extract.article_ids.len());
    extract
}

/// The marketplace id is the path segment right after `artikal` in the
/// detail link, e.g. `/artikal/54613829/iphone-13-pro` -> `54613829`.
fn article_id_from_href(href: &str) -> Option<String> {
    let mut segments = href.split('/').skip_while(|segment| *segment != "artikal");
    segments.next()?;
    segments
        .next()
        .filter(|id| !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()))
        .map(str::to_string)
}

fn absolute_url(href: &str) -> String {
    if href.starts_with("http") {
        href.to_string()
    } else {
        format!("https://olx.ba{}", href)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
          <article>
            <h1 class="main-heading">iPhone 13 Pro 128GB</h1>
            <div class="price-wrap"><span class="smaller">1.250 KM</span></div>
            <a href="/artikal/54613829/iphone-13-pro-128gb">detalji</a>
          </article>
          <article>
            <h1 class="main-heading">Samsung Galaxy S22</h1>
            <div class="price-wrap"><span class="smaller">Na upit</span></div>
            <a href="https://olx.ba/artikal/54613900/samsung-galaxy-s22">detalji</a>
          </article>
          <article>
            <h1 class="main-heading">Oglas bez cijene</h1>
            <a href="/artikal/54613999/bez-cijene">detalji</a>
          </article>
        </body></html>
    "#;

    #[test]
    fn extracts_aligned_rows_from_cards() {
        let extract = extract_listings(PAGE);

        assert!(!extract.no_results);
        assert_eq!(extract.article_ids, vec!["54613829", "54613900"]);
        assert_eq!(
            extract.titles,
            vec!["iPhone 13 Pro 128GB", "Samsung Galaxy S22"]
        );
        assert_eq!(extract.prices, vec!["1.250 KM", "Na upit"]);
        assert_eq!(
            extract.urls,
            vec![
                "https://olx.ba/artikal/54613829/iphone-13-pro-128gb",
                "https://olx.ba/artikal/54613900/samsung-galaxy-s22"
            ]
        );
    }

    #[test]
    fn page_without_cards_reports_no_results() {
        let extract = extract_listings("<html><body><p>Nema rezultata</p></body></html>");
        assert!(extract.no_results);
        assert!(extract.article_ids.is_empty());
    }

    #[test]
    fn article_id_comes_from_the_segment_after_artikal() {
        assert_eq!(
            article_id_from_href("/artikal/54613829/iphone-13-pro").as_deref(),
            Some("54613829")
        );
        assert_eq!(
            article_id_from_href("https://olx.ba/artikal/99/x").as_deref(),
            Some("99")
        );
        assert_eq!(article_id_from_href("/kategorija/28"), None);
        assert_eq!(article_id_from_href("/artikal/not-a-number/x"), None);
    }
}
