use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ScoutError;

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Per-listing detail request budget.
pub const DETAIL_TIMEOUT: Duration = Duration::from_secs(10);

/// One marketplace category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct CategoryResponse {
    #[serde(default)]
    data: Vec<Category>,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
}

/// Detail payload for a single listing.
#[derive(Debug, Clone, Deserialize)]
pub struct ListingDetail {
    pub title: String,
    pub display_price: String,
}

/// Client for the OLX REST API: login, category tree, listing details.
pub struct OlxApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl OlxApiClient {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: "https://api.olx.ba".to_string(),
            token: None,
        })
    }

    fn token(&self) -> &str {
        self.token.as_deref().unwrap_or("")
    }

    /// Exchange credentials for a bearer token. A 403 is an authentication
    /// failure and fatal to the run.
    pub async fn login(
        &mut self,
        username: &str,
        password: &str,
        device_name: &str,
    ) -> Result<(), ScoutError> {
        let response = self
            .client
            .post(format!("{}/auth/login", self.base_url))
            .json(&serde_json::json!({
                "username": username,
                "password": password,
                "device_name": device_name,
            }))
            .send()
            .await?;

        if response.status() == StatusCode::FORBIDDEN {
            return Err(ScoutError::Auth(
                "access forbidden, check your credentials".to_string(),
            ));
        }
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ScoutError::Api { status, body });
        }

        let login: LoginResponse = response.json().await?;
        self.token = Some(login.token);
        debug!("Logged in to OLX API");
        Ok(())
    }

    /// Top-level category tree.
    pub async fn categories(&self) -> Result<Vec<Category>, ScoutError> {
        self.fetch_categories(format!("{}/categories", self.base_url))
            .await
    }

    /// Children of one category.
    pub async fn subcategories(&self, category_id: u64) -> Result<Vec<Category>, ScoutError> {
        self.fetch_categories(format!("{}/categories/{}", self.base_url, category_id))
            .await
    }

    async fn fetch_categories(&self, url: String) -> Result<Vec<Category>, ScoutError> {
        let response = self
            .client
            .get(url)
            .bearer_auth(self.token())
            .send()
            .await?;

        if response.status() == StatusCode::FORBIDDEN {
            let body = response.text().await.unwrap_or_default();
            warn!("Authorization failed fetching categories: {}", body);
            return Err(ScoutError::Auth(body));
        }
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ScoutError::Api { status, body });
        }

        let categories: CategoryResponse = response.json().await?;
        Ok(categories.data)
    }

    /// One detail request for an article id. Any non-200 status is returned
    /// as an `Api` error for the enricher to absorb; this method never
    /// retries.
    pub async fn listing_detail(&self, article_id: &str) -> Result<ListingDetail, ScoutError> {
        let response = self
            .client
            .get(format!("{}/listings/{}", self.base_url, article_id))
            .bearer_auth(self.token())
            .timeout(DETAIL_TIMEOUT)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ScoutError::Api { status, body });
        }

        Ok(response.json().await?)
    }
}

#[async_trait::async_trait]
impl crate::scrapers::traits::ListingDetails for OlxApiClient {
    async fn listing_detail(&self, article_id: &str) -> Result<ListingDetail, ScoutError> {
        OlxApiClient::listing_detail(self, article_id).await
    }
}
