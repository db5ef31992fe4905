use thiserror::Error;

use crate::client::ListingKind;

#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("reddit account not found or inaccessible: {username}")]
    NotFound { username: String },

    #[error("rate limited by reddit (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("reddit authentication failed: {0}")]
    Auth(String),
}

/// Pagination stopped early. Whatever was gathered before the failure is
/// still returned alongside this error.
#[derive(Debug, Error)]
#[error("{listing} pagination interrupted after {collected} items: {cause}")]
pub struct PartialDataError {
    pub listing: ListingKind,
    pub collected: usize,
    #[source]
    pub cause: CollectorError,
}
