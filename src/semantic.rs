use std::collections::HashSet;
use std::fmt::Write as _;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::ScoutError;
use crate::models::Listing;

/// Records per classifier request, bounding payload size.
pub const DEFAULT_BATCH_SIZE: usize = 50;
/// Courtesy pause between classifier calls; not a retry/backoff mechanism.
const BATCH_PACING: Duration = Duration::from_secs(1);
/// Explicit bound on a classifier call.
const CLASSIFIER_TIMEOUT: Duration = Duration::from_secs(30);

/// What the user was actually searching for; gives the classifier enough
/// context to tell the target item from its accessories.
#[derive(Debug, Clone)]
pub struct FilterContext {
    pub category_name: String,
    pub search_term: String,
}

/// Narrow seam to the classifier collaborator: a batch of listings in, the
/// ids it wants excluded out. Implementations own their prompting and
/// response parsing.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn flag_listings(
        &self,
        context: &FilterContext,
        batch: &[Listing],
    ) -> Result<Vec<u32>, ScoutError>;
}

/// Remove listings the classifier flags as context mismatches.
///
/// Batches are sent sequentially with a pacing sleep in between. Flagged
/// ids are accumulated across all batches and removed in a single pass at
/// the end, so batch ordering cannot affect the result. A failed classifier
/// call is logged and contributes no flags; it never aborts the run.
pub async fn filter_listings(
    classifier: &dyn Classifier,
    context: &FilterContext,
    listings: Vec<Listing>,
    batch_size: usize,
) -> Vec<Listing> {
    if listings.is_empty() {
        return listings;
    }

    let mut flagged: HashSet<u32> = HashSet::new();
    let batches: Vec<&[Listing]> = listings.chunks(batch_size.max(1)).collect();
    let total = batches.len();

    for (idx, batch) in batches.into_iter().enumerate() {
        debug!("Classifying batch {} of {} ({} listings)", idx + 1, total, batch.len());
        match classifier.flag_listings(context, batch).await {
            Ok(ids) => flagged.extend(ids),
            Err(err) => {
                warn!(
                    "Classifier failed on batch {} of {}; flagging nothing from it: {}",
                    idx + 1,
                    total,
                    err
                );
            }
        }

        if idx + 1 < total {
            tokio::time::sleep(BATCH_PACING).await;
        }
    }

    let before = listings.len();
    let kept: Vec<Listing> = listings
        .into_iter()
        .filter(|l| !flagged.contains(&l.id))
        .collect();
    info!(
        "Semantic filter removed {} of {} listings",
        before - kept.len(),
        before
    );
    kept
}

/// Build the review prompt for one batch: search context, the id -> title
/// map, and instructions for what counts as a mismatch.
pub fn build_prompt(context: &FilterContext, batch: &[Listing]) -> String {
    let mut prompt = format!(
        "You are reviewing marketplace search results.\n\
         Category: {}\n\
         Search term: {}\n\n\
         Below is a numbered list of listing titles. Identify the listings that do NOT \
         match the search target itself, such as accessories, spare parts, cases, \
         chargers or repair services sold under the same search term.\n\
         For example, when the search term is \"iphone 13\", a listing titled \
         \"Maska za iPhone 13\" (a phone case) or \"iPhone 13 staklo\" (screen glass) \
         should be flagged, while \"iPhone 13 128GB\" should not.\n\n\
         Listings:\n",
        context.category_name, context.search_term
    );

    for listing in batch {
        let _ = writeln!(prompt, "{}: {}", listing.id, listing.title);
    }

    prompt.push_str(
        "\nRespond with only the ids to exclude, comma-separated, e.g. \"3, 17, 42\". \
         Respond with an empty line if nothing should be excluded.",
    );
    prompt
}

/// Pull listing ids out of a classifier reply. Forgiving by design: any
/// token that does not parse as an integer is dropped without complaint.
pub fn parse_flagged_ids(response: &str) -> Vec<u32> {
    response
        .split(',')
        .filter_map(|token| token.trim().parse::<u32>().ok())
        .collect()
}

// ---------------------------------------------------------------------------
// OpenAI-backed implementation
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

/// Classifier backed by the OpenAI chat-completions API.
pub struct OpenAiClassifier {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiClassifier {
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(CLASSIFIER_TIMEOUT)
            .build()
            .context("Failed to create classifier HTTP client")?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            model: "gpt-4o-mini".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
        })
    }

    /// Override the chat model (default: gpt-4o-mini).
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

#[async_trait]
impl Classifier for OpenAiClassifier {
    async fn flag_listings(
        &self,
        context: &FilterContext,
        batch: &[Listing],
    ) -> Result<Vec<u32>, ScoutError> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user",
                content: build_prompt(context, batch),
            }],
            temperature: 0.0,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| ScoutError::Classifier(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ScoutError::Classifier(format!(
                "status {}: {}",
                status, body
            )));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| ScoutError::Classifier(e.to_string()))?;
        let content = chat
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .unwrap_or("");

        Ok(parse_flagged_ids(content))
    }
}
