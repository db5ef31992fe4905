use std::future::Future;
use std::pin::Pin;

use crate::error::ProviderError;

/// What a provider handed back before schema normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum RawProviderOutput {
    Text(String),
    Json(serde_json::Value),
}

impl RawProviderOutput {
    /// Text form used for attempt audit records.
    #[must_use]
    pub fn as_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Json(value) => value.to_string(),
        }
    }
}

pub type ProviderFuture<'a> =
    Pin<Box<dyn Future<Output = Result<RawProviderOutput, ProviderError>> + Send + 'a>>;

/// A text-generation backend that turns a prompt into raw persona output.
pub trait PersonaProvider: Send + Sync {
    /// Stable id recorded as the persona source and on attempt records.
    fn id(&self) -> &str;

    fn model(&self) -> Option<&str> {
        None
    }

    fn generate<'a>(&'a self, prompt: &'a str) -> ProviderFuture<'a>;
}
