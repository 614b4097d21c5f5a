use serde::{Deserialize, Serialize};

/// Run configuration, resolved once at startup by the CLI layer.
///
/// The pipeline never prompts or reads environment variables itself; it
/// only receives this struct.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// OLX account email
    pub username: String,
    /// OLX account password
    pub password: String,
    /// Device name sent with the login request
    pub device_name: String,
    /// API key for the classifier collaborator
    pub classifier_api_key: String,
    /// Free-text search query
    pub search_term: String,
    /// Category to search in
    pub category_id: u64,
    /// Human-readable category name, used in classifier prompts
    pub category_name: String,
    /// Page cap for the crawl (inclusive)
    pub max_pages: u32,
    /// Z-score cutoff for the second outlier filter
    pub z_threshold: f64,
    /// Records per classifier batch
    pub batch_size: usize,
    /// Destination CSV path
    pub output: String,
}

impl Config {
    /// Search URL for page 1; the pagination driver appends `&page=N`.
    pub fn search_url(&self) -> String {
        let query = self.search_term.replace(' ', "+");
        format!(
            "https://olx.ba/pretraga?attr=&attr_encoded=1&q={}&category_id={}",
            query, self.category_id
        )
    }
}
