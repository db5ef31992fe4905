//! HTTP client for Reddit's user endpoints.

use std::time::Duration;

use chrono::{DateTime, Utc};
use persona_core::{ActivityItem, PipelineConfig};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::OnceCell;

use crate::error::CollectorError;
use crate::normalize::{normalize_thing, timestamp};
use crate::retry::retry_with_backoff;
use crate::types::{About, Listing, TokenResponse};

/// Which of a user's listings to page through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingKind {
    Submitted,
    Comments,
}

impl ListingKind {
    fn path_segment(self) -> &'static str {
        match self {
            ListingKind::Submitted => "submitted",
            ListingKind::Comments => "comments",
        }
    }
}

impl std::fmt::Display for ListingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path_segment())
    }
}

/// Public account summary from `/user/{name}/about`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountInfo {
    pub name: String,
    pub link_karma: i64,
    pub comment_karma: i64,
    pub created_at: Option<DateTime<Utc>>,
}

/// One page of normalized items plus the cursor for the next page.
#[derive(Debug)]
pub struct ListingPage {
    pub items: Vec<ActivityItem>,
    /// Raw children on the page, including ones dropped during normalization.
    pub raw_count: usize,
    pub after: Option<String>,
}

/// Reddit API client.
///
/// Uses the client-credentials OAuth flow when credentials are configured
/// (the token is fetched once, on first use) and the public JSON endpoints
/// otherwise. Transient failures are retried with jittered exponential
/// backoff.
pub struct RedditClient {
    client: Client,
    base_url: String,
    token_url: String,
    credentials: Option<(String, String)>,
    token: OnceCell<String>,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl RedditClient {
    /// Builds a client from the pipeline configuration.
    ///
    /// # Errors
    ///
    /// Returns [`CollectorError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(config: &PipelineConfig) -> Result<Self, CollectorError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.collector_timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(config.reddit_user_agent.as_str())
            .build()?;
        Ok(Self {
            client,
            base_url: config.reddit_base_url.trim_end_matches('/').to_string(),
            token_url: config.reddit_token_url.clone(),
            credentials: config
                .reddit_credentials()
                .map(|(id, secret)| (id.to_string(), secret.to_string())),
            token: OnceCell::new(),
            max_retries: config.collector_max_retries,
            backoff_base_ms: config.collector_backoff_base_ms,
        })
    }

    /// Builds an anonymous client against a custom base URL.
    ///
    /// Intended for tests against a mock server.
    ///
    /// # Errors
    ///
    /// Returns [`CollectorError::Http`] if the `reqwest::Client` cannot be built.
    pub fn with_base_url(
        base_url: &str,
        max_retries: u32,
        backoff_base_ms: u64,
    ) -> Result<Self, CollectorError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(5))
            .user_agent("persona-forge-test/0.1")
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token_url: format!("{}/api/v1/access_token", base_url.trim_end_matches('/')),
            credentials: None,
            token: OnceCell::new(),
            max_retries,
            backoff_base_ms,
        })
    }

    /// Enables OAuth with the given credentials and token endpoint.
    #[must_use]
    pub fn with_credentials(mut self, client_id: &str, client_secret: &str, token_url: &str) -> Self {
        self.credentials = Some((client_id.to_string(), client_secret.to_string()));
        self.token_url = token_url.to_string();
        self
    }

    /// Fetches the account summary.
    ///
    /// # Errors
    ///
    /// - [`CollectorError::NotFound`]: 404, 403, or a suspended account.
    /// - [`CollectorError::RateLimited`]: 429 after all retries.
    /// - [`CollectorError::Http`] / [`CollectorError::UnexpectedStatus`]: transport failures.
    pub async fn fetch_about(&self, username: &str) -> Result<AccountInfo, CollectorError> {
        let url = format!("{}/user/{username}/about.json", self.base_url);
        let about: About = self
            .get_json(username, &url, &[("raw_json", "1".to_string())])
            .await?;

        if about.data.is_suspended {
            return Err(CollectorError::NotFound {
                username: username.to_string(),
            });
        }

        Ok(AccountInfo {
            name: about.data.name,
            link_karma: about.data.link_karma,
            comment_karma: about.data.comment_karma,
            created_at: about.data.created_utc.and_then(timestamp),
        })
    }

    /// Fetches one page of a user listing, newest first.
    ///
    /// # Errors
    ///
    /// Same as [`RedditClient::fetch_about`], plus [`CollectorError::Deserialize`]
    /// for malformed listing bodies.
    pub async fn fetch_listing_page(
        &self,
        username: &str,
        listing: ListingKind,
        after: Option<&str>,
        limit: usize,
    ) -> Result<ListingPage, CollectorError> {
        let url = format!(
            "{}/user/{username}/{}.json",
            self.base_url,
            listing.path_segment()
        );
        let mut params = vec![
            ("limit", limit.to_string()),
            ("sort", "new".to_string()),
            ("raw_json", "1".to_string()),
        ];
        if let Some(cursor) = after {
            params.push(("after", cursor.to_string()));
        }

        let page: Listing = self.get_json(username, &url, &params).await?;
        let raw_count = page.data.children.len();
        let items = page
            .data
            .children
            .iter()
            .filter_map(normalize_thing)
            .collect();

        Ok(ListingPage {
            items,
            raw_count,
            after: page.data.after.filter(|a| !a.is_empty()),
        })
    }

    async fn bearer_token(&self) -> Result<Option<&str>, CollectorError> {
        let Some((client_id, client_secret)) = &self.credentials else {
            return Ok(None);
        };
        let token = self
            .token
            .get_or_try_init(|| self.fetch_token(client_id, client_secret))
            .await?;
        Ok(Some(token.as_str()))
    }

    async fn fetch_token(
        &self,
        client_id: &str,
        client_secret: &str,
    ) -> Result<String, CollectorError> {
        let response = self
            .client
            .post(&self.token_url)
            .basic_auth(client_id, Some(client_secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(CollectorError::Auth(format!(
                "token exchange failed with status {}",
                response.status()
            )));
        }

        let body = response.text().await?;
        let token: TokenResponse =
            serde_json::from_str(&body).map_err(|e| CollectorError::Deserialize {
                context: "oauth token response".to_string(),
                source: e,
            })?;
        tracing::debug!("obtained reddit oauth token");
        Ok(token.access_token)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        username: &str,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<T, CollectorError> {
        let token = self.bearer_token().await?;

        retry_with_backoff(self.max_retries, self.backoff_base_ms, || async move {
            let mut request = self
                .client
                .get(url)
                .header(reqwest::header::ACCEPT, "application/json")
                .query(params);
            if let Some(token) = token {
                request = request.bearer_auth(token);
            }

            let response = request.send().await?;
            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS {
                let retry_after_secs = response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.parse::<u64>().ok())
                    .unwrap_or(60);
                return Err(CollectorError::RateLimited { retry_after_secs });
            }

            if status == StatusCode::NOT_FOUND || status == StatusCode::FORBIDDEN {
                return Err(CollectorError::NotFound {
                    username: username.to_string(),
                });
            }

            if !status.is_success() {
                return Err(CollectorError::UnexpectedStatus {
                    status: status.as_u16(),
                    url: url.to_string(),
                });
            }

            let body = response.text().await?;
            serde_json::from_str::<T>(&body).map_err(|e| CollectorError::Deserialize {
                context: format!("response from {url}"),
                source: e,
            })
        })
        .await
    }
}
