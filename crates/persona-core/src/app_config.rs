use std::net::SocketAddr;
use std::path::PathBuf;

use crate::providers::ProviderConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Settings consumed by the collector, extractor, and provider chain.
///
/// Built once at startup and passed by reference; nothing below the server
/// reads the environment directly.
#[derive(Clone)]
pub struct PipelineConfig {
    pub reddit_client_id: Option<String>,
    pub reddit_client_secret: Option<String>,
    pub reddit_user_agent: String,
    pub reddit_base_url: String,
    pub reddit_token_url: String,
    pub collector_timeout_secs: u64,
    pub collector_max_retries: u32,
    pub collector_backoff_base_ms: u64,
    pub collector_inter_request_delay_ms: u64,
    /// Providers in priority order. The template fallback is implicit.
    pub providers: Vec<ProviderConfig>,
    pub sentiment_positive_threshold: f64,
    pub sentiment_negative_threshold: f64,
    pub confidence_full_coverage_items: usize,
}

impl PipelineConfig {
    /// Client-credentials pair, when both halves are configured.
    #[must_use]
    pub fn reddit_credentials(&self) -> Option<(&str, &str)> {
        match (&self.reddit_client_id, &self.reddit_client_secret) {
            (Some(id), Some(secret)) => Some((id.as_str(), secret.as_str())),
            _ => None,
        }
    }
}

impl std::fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("reddit_client_id", &self.reddit_client_id)
            .field(
                "reddit_client_secret",
                &self.reddit_client_secret.as_ref().map(|_| "[redacted]"),
            )
            .field("reddit_user_agent", &self.reddit_user_agent)
            .field("reddit_base_url", &self.reddit_base_url)
            .field("reddit_token_url", &self.reddit_token_url)
            .field("collector_timeout_secs", &self.collector_timeout_secs)
            .field("collector_max_retries", &self.collector_max_retries)
            .field("collector_backoff_base_ms", &self.collector_backoff_base_ms)
            .field(
                "collector_inter_request_delay_ms",
                &self.collector_inter_request_delay_ms,
            )
            .field("providers", &self.providers)
            .field(
                "sentiment_positive_threshold",
                &self.sentiment_positive_threshold,
            )
            .field(
                "sentiment_negative_threshold",
                &self.sentiment_negative_threshold,
            )
            .field(
                "confidence_full_coverage_items",
                &self.confidence_full_coverage_items,
            )
            .finish()
    }
}

/// Fixed-window request budget for the persona routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub max_requests: usize,
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 120,
            window_secs: 60,
        }
    }
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub output_dir: PathBuf,
    pub max_concurrent_syntheses: usize,
    pub rate_limit: RateLimitConfig,
    pub pipeline: PipelineConfig,
}
