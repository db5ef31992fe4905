//! Ordered provider fallback with per-provider retry policy and a
//! deterministic template as the terminal stage.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use persona_core::{
    ActivityItem, AttemptOutcome, BackoffKind, FeatureProfile, PersonaMetadata, PersonaRecord,
    PipelineConfig, ProviderAttempt, ProviderConfig,
};

use crate::error::ProviderError;
use crate::normalize::{normalize, resolve_citations};
use crate::prompt::build_prompt;
use crate::provider::PersonaProvider;
use crate::providers::build_provider;
use crate::template::TemplateGenerator;

/// Upper bound on how far a provider's `Retry-After` can stretch a backoff.
const MAX_RETRY_AFTER: Duration = Duration::from_secs(10);
/// Upper bound on a single exponential backoff step.
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Retry settings for one chain stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderPolicy {
    pub max_attempts: u32,
    pub backoff: BackoffKind,
    pub backoff_base: Duration,
    pub timeout: Duration,
}

impl ProviderPolicy {
    #[must_use]
    pub fn from_config(config: &ProviderConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            backoff: config.backoff,
            backoff_base: Duration::from_millis(config.backoff_ms),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// Delay before retry number `attempt + 1`. A provider-supplied
    /// `Retry-After` can lengthen it up to [`MAX_RETRY_AFTER`].
    fn delay(&self, attempt: u32, retry_after_secs: Option<u64>) -> Duration {
        let base = match self.backoff {
            BackoffKind::Fixed => self.backoff_base,
            BackoffKind::Exponential => self
                .backoff_base
                .saturating_mul(2_u32.saturating_pow(attempt.saturating_sub(1)))
                .min(MAX_BACKOFF),
        };
        match retry_after_secs {
            Some(secs) => base.max(Duration::from_secs(secs).min(MAX_RETRY_AFTER)),
            None => base,
        }
    }
}

/// Confidence assigned to a synthesized record.
///
/// The first provider stage scores `first_stage`, each later stage
/// `stage_penalty` less (never below `floor`), and the template `template`.
/// The stage score is scaled by `0.5 + 0.5 * coverage`, where coverage is
/// `items / full_coverage_items` capped at 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidencePolicy {
    pub first_stage: f64,
    pub stage_penalty: f64,
    pub floor: f64,
    pub template: f64,
    pub full_coverage_items: usize,
}

impl Default for ConfidencePolicy {
    fn default() -> Self {
        Self {
            first_stage: 0.9,
            stage_penalty: 0.2,
            floor: 0.1,
            template: 0.3,
            full_coverage_items: 50,
        }
    }
}

impl ConfidencePolicy {
    /// `stage` is the zero-based provider index, or `None` for the template.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn score(&self, stage: Option<usize>, items: usize) -> f64 {
        let base = match stage {
            Some(idx) => (self.first_stage - self.stage_penalty * idx as f64).max(self.floor),
            None => self.template,
        };
        let coverage = if self.full_coverage_items == 0 {
            1.0
        } else {
            (items as f64 / self.full_coverage_items as f64).min(1.0)
        };
        (base * (0.5 + 0.5 * coverage)).clamp(0.0, 1.0)
    }
}

/// Result of a chain run: the record plus every attempt made for it.
#[derive(Debug, Clone)]
pub struct Synthesis {
    pub record: PersonaRecord,
    pub attempts: Vec<ProviderAttempt>,
}

struct Stage {
    provider: Arc<dyn PersonaProvider>,
    policy: ProviderPolicy,
}

pub struct ProviderChain {
    stages: Vec<Stage>,
    template: TemplateGenerator,
    confidence: ConfidencePolicy,
}

impl std::fmt::Debug for ProviderChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderChain")
            .field("providers", &self.provider_ids())
            .field("confidence", &self.confidence)
            .finish_non_exhaustive()
    }
}

impl ProviderChain {
    /// A chain with no provider stages; every call falls back to the template.
    #[must_use]
    pub fn new(confidence: ConfidencePolicy) -> Self {
        Self {
            stages: Vec::new(),
            template: TemplateGenerator,
            confidence,
        }
    }

    /// Appends a provider stage after the existing ones.
    #[must_use]
    pub fn with_stage(mut self, provider: Arc<dyn PersonaProvider>, policy: ProviderPolicy) -> Self {
        self.stages.push(Stage { provider, policy });
        self
    }

    /// Builds the chain from the configured provider table, skipping any
    /// provider without an API key.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::Http`] if an HTTP client cannot be built.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, ProviderError> {
        let mut chain = Self::new(ConfidencePolicy {
            full_coverage_items: config.confidence_full_coverage_items,
            ..ConfidencePolicy::default()
        });
        for provider_config in &config.providers {
            match build_provider(provider_config)? {
                Some(provider) => {
                    chain = chain.with_stage(provider, ProviderPolicy::from_config(provider_config));
                }
                None => tracing::warn!(
                    provider = %provider_config.id,
                    "skipping provider without an API key"
                ),
            }
        }
        Ok(chain)
    }

    #[must_use]
    pub fn provider_ids(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.provider.id()).collect()
    }

    /// Runs the stages in order and falls back to the template. Never fails.
    pub async fn synthesize(
        &self,
        username: &str,
        profile: &FeatureProfile,
        samples: &[ActivityItem],
    ) -> Synthesis {
        let prompt = build_prompt(username, profile, samples);
        let mut attempts = Vec::new();

        for (idx, stage) in self.stages.iter().enumerate() {
            if let Some(mut record) = run_stage(stage, username, &prompt, &mut attempts).await {
                resolve_citations(&mut record, samples);
                record.metadata = self.metadata(
                    stage.provider.id(),
                    stage.provider.model(),
                    Some(idx),
                    profile,
                );
                tracing::info!(
                    username,
                    provider = stage.provider.id(),
                    attempts = attempts.len(),
                    "persona synthesized"
                );
                return Synthesis { record, attempts };
            }
        }

        let started_at = Utc::now();
        let clock = Instant::now();
        let mut record = self.template.generate(username, profile, samples);
        record.metadata = self.metadata(PersonaMetadata::TEMPLATE_SOURCE, None, None, profile);
        attempts.push(ProviderAttempt::new(
            PersonaMetadata::TEMPLATE_SOURCE,
            1,
            started_at,
            clock.elapsed(),
            AttemptOutcome::Success,
        ));
        tracing::info!(
            username,
            attempts = attempts.len(),
            "all providers exhausted, persona built from template"
        );
        Synthesis { record, attempts }
    }

    fn metadata(
        &self,
        source: &str,
        model: Option<&str>,
        stage: Option<usize>,
        profile: &FeatureProfile,
    ) -> PersonaMetadata {
        let mut metadata = PersonaMetadata::new(source);
        metadata.model = model.map(str::to_string);
        metadata.posts_analyzed = profile.post_count;
        metadata.comments_analyzed = profile.comment_count;
        metadata.set_confidence(self.confidence.score(stage, profile.item_count));
        metadata
    }
}

fn outcome_for(err: &ProviderError) -> AttemptOutcome {
    match err {
        ProviderError::Timeout(_) => AttemptOutcome::Timeout,
        ProviderError::Http(e) if e.is_timeout() => AttemptOutcome::Timeout,
        ProviderError::RateLimited { .. } => AttemptOutcome::RateLimited,
        _ => AttemptOutcome::Error,
    }
}

/// Drives one provider through its retry policy. Returns the normalized
/// record on success; `None` advances the chain.
async fn run_stage(
    stage: &Stage,
    username: &str,
    prompt: &str,
    attempts: &mut Vec<ProviderAttempt>,
) -> Option<PersonaRecord> {
    let provider_id = stage.provider.id();
    let policy = &stage.policy;

    for attempt in 1..=policy.max_attempts {
        let started_at = Utc::now();
        let clock = Instant::now();
        let result = tokio::time::timeout(policy.timeout, stage.provider.generate(prompt))
            .await
            .unwrap_or_else(|_| Err(ProviderError::Timeout(policy.timeout)));
        let elapsed = clock.elapsed();

        let err = match result {
            Ok(raw) => {
                let raw_text = raw.as_text();
                return match normalize(&raw, username) {
                    Ok(record) => {
                        attempts.push(ProviderAttempt::new(
                            provider_id,
                            attempt,
                            started_at,
                            elapsed,
                            AttemptOutcome::Success,
                        ));
                        Some(record)
                    }
                    Err(schema_err) => {
                        tracing::warn!(
                            provider = provider_id,
                            attempt,
                            error = %schema_err,
                            "provider output failed schema normalization"
                        );
                        attempts.push(
                            ProviderAttempt::new(
                                provider_id,
                                attempt,
                                started_at,
                                elapsed,
                                AttemptOutcome::InvalidOutput,
                            )
                            .with_raw_output(&raw_text)
                            .with_detail(schema_err.to_string()),
                        );
                        None
                    }
                };
            }
            Err(err) => err,
        };

        tracing::warn!(
            provider = provider_id,
            attempt,
            max_attempts = policy.max_attempts,
            error = %err,
            "provider attempt failed"
        );
        attempts.push(
            ProviderAttempt::new(provider_id, attempt, started_at, elapsed, outcome_for(&err))
                .with_detail(err.to_string()),
        );

        if !err.is_retriable() {
            return None;
        }
        if attempt < policy.max_attempts {
            let retry_after = match err {
                ProviderError::RateLimited { retry_after_secs } => retry_after_secs,
                _ => None,
            };
            tokio::time::sleep(policy.delay(attempt, retry_after)).await;
        }
    }

    None
}

#[cfg(test)]
#[path = "chain_test.rs"]
mod tests;
