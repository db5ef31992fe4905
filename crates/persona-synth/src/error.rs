use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider call timed out after {0:?}")]
    Timeout(Duration),

    #[error("rate limited by provider (retry after {retry_after_secs:?}s)")]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("HTTP error: {0}")]
    Http(#[source] reqwest::Error),

    #[error("unexpected HTTP status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("provider returned no content")]
    EmptyResponse,
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        // Provider URLs can carry credentials.
        Self::Http(e.without_url())
    }
}

impl ProviderError {
    /// Transient failures worth another attempt against the same provider.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::RateLimited { .. } => true,
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            Self::UnexpectedStatus { status, .. } => *status >= 500,
            Self::Deserialize { .. } | Self::EmptyResponse => false,
        }
    }
}

/// Provider output that could not be turned into a persona record.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("no JSON object found in provider output")]
    NoJsonPayload,

    #[error("provider output is JSON but not an object")]
    NotAnObject,

    #[error("field `{field}` is invalid: {reason}")]
    InvalidField { field: String, reason: String },

    #[error("provider output contains no persona fields")]
    NoPersonaFields,
}

impl SchemaError {
    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}
