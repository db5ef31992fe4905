//! OpenAI-compatible `/chat/completions` provider (Groq by default).

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{http_client, post_json};
use crate::error::ProviderError;
use crate::provider::{PersonaProvider, ProviderFuture, RawProviderOutput};

const TEMPERATURE: f32 = 0.5;
const MAX_TOKENS: u32 = 3_000;

pub struct ChatCompletionsProvider {
    id: String,
    model: String,
    api_key: String,
    url: String,
    client: Client,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

impl ChatCompletionsProvider {
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
            url: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            client: http_client(timeout)?,
        })
    }

    async fn complete(&self, prompt: &str) -> Result<RawProviderOutput, ProviderError> {
        let body = ChatRequest {
            model: &self.model,
            messages: [ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };
        let request = self.client.post(&self.url).bearer_auth(&self.api_key);
        let response: ChatResponse =
            post_json(request, &body, &format!("{} chat completion", self.id)).await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .map(RawProviderOutput::Text)
            .ok_or(ProviderError::EmptyResponse)
    }
}

impl PersonaProvider for ChatCompletionsProvider {
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
