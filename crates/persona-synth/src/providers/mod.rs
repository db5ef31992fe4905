//! HTTP-backed [`PersonaProvider`] implementations.

pub mod chat_completions;
pub mod gemini;

use std::sync::Arc;
use std::time::Duration;

use persona_core::{ProviderConfig, ProviderKind};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::ProviderError;
use crate::provider::PersonaProvider;

pub use chat_completions::ChatCompletionsProvider;
pub use gemini::GeminiProvider;

const USER_AGENT: &str = concat!("persona-forge/", env!("CARGO_PKG_VERSION"));
/// Longest error body kept on [`ProviderError::UnexpectedStatus`].
const MAX_ERROR_BODY_CHARS: usize = 500;

/// Builds the provider for `config`, or `None` when it has no API key.
///
/// # Errors
///
/// Returns [`ProviderError::Http`] if the `reqwest::Client` cannot be built.
pub fn build_provider(
    config: &ProviderConfig,
) -> Result<Option<Arc<dyn PersonaProvider>>, ProviderError> {
    let Some(api_key) = config.api_key.as_deref() else {
        return Ok(None);
    };
    let timeout = Duration::from_secs(config.timeout_secs);
    let provider: Arc<dyn PersonaProvider> = match config.kind {
        ProviderKind::OpenaiCompatible => Arc::new(ChatCompletionsProvider::new(
            &config.id,
            &config.base_url,
            &config.model,
            api_key,
            timeout,
        )?),
        ProviderKind::Gemini => Arc::new(GeminiProvider::new(
            &config.id,
            &config.base_url,
            &config.model,
            api_key,
            timeout,
        )?),
    };
    Ok(Some(provider))
}

pub(crate) fn http_client(timeout: Duration) -> Result<Client, ProviderError> {
    Ok(Client::builder()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .user_agent(USER_AGENT)
        .build()?)
}

/// Sends `body` and decodes a successful JSON response, mapping 429 and
/// non-2xx statuses to [`ProviderError`].
pub(crate) async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
    request: reqwest::RequestBuilder,
    body: &B,
    context: &str,
) -> Result<T, ProviderError> {
    let response = request.json(body).send().await?;
    let status = response.status();

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after_secs = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<u64>().ok());
        return Err(ProviderError::RateLimited { retry_after_secs });
    }

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ProviderError::UnexpectedStatus {
            status: status.as_u16(),
            body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
        });
    }

    let text = response.text().await?;
    serde_json::from_str::<T>(&text).map_err(|e| ProviderError::Deserialize {
        context: context.to_string(),
        source: e,
    })
}
