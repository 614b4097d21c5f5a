use thiserror::Error;

/// Failure taxonomy for a scrape run.
///
/// `Auth` is fatal and aborts the run. `Api` and `Classifier` failures are
/// absorbed by the stage that encounters them (enrichment emits a sentinel
/// row, the semantic filter flags nothing for the failed batch). `Browser`
/// covers catastrophic fetch failures, which end the whole run.
#[derive(Debug, Error)]
pub enum ScoutError {
    /// Bad credentials or a 403 from the API
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Non-success status from the listings API
    #[error("API request failed with status {status}: {body}")]
    Api { status: u16, body: String },

    /// Browser session could not be driven
    #[error("browser error: {0}")]
    Browser(String),

    /// Classifier collaborator failed for a batch
    #[error("classifier error: {0}")]
    Classifier(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}
