//! Google Gemini `generateContent` provider.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{http_client, post_json};
use crate::error::ProviderError;
use crate::provider::{PersonaProvider, ProviderFuture, RawProviderOutput};

/// Keeps the key out of the request URL, which `reqwest` errors echo.
const API_KEY_HEADER: &str = "x-goog-api-key";

pub struct GeminiProvider {
    id: String,
    model: String,
    api_key: String,
    url: String,
    client: Client,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
    top_p: f32,
    top_k: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

impl GeminiProvider {
    /// # Errors
    ///
    /// Returns [`ProviderError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(
        id: &str,
        base_url: &str,
        model: &str,
        api_key: &str,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        Ok(Self {
            id: id.to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
            url: format!(
                "{}/v1beta/models/{model}:generateContent",
                base_url.trim_end_matches('/')
            ),
            client: http_client(timeout)?,
        })
    }

    async fn complete(&self, prompt: &str) -> Result<RawProviderOutput, ProviderError> {
        let body = GenerateRequest {
            contents: [Content {
                parts: [Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.5,
                max_output_tokens: 3_000,
                top_p: 0.8,
                top_k: 40,
            },
        };
        let request = self
            .client
            .post(&self.url)
            .header(API_KEY_HEADER, self.api_key.as_str());
        let response: GenerateResponse =
            post_json(request, &body, &format!("{} generateContent", self.id)).await?;

        let text: String = response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(ProviderError::EmptyResponse);
        }
        Ok(RawProviderOutput::Text(text))
    }
}

impl PersonaProvider for GeminiProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn model(&self) -> Option<&str> {
        Some(&self.model)
    }

    fn generate<'a>(&'a self, prompt: &'a str) -> ProviderFuture<'a> {
        Box::pin(self.complete(prompt))
    }
}
