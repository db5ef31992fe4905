//! End-to-end persona synthesis for one username: collect, extract,
//! synthesize, chart. The cache persists each committed result.

use std::sync::Arc;

use persona_analysis::{ChartAggregateBuilder, FeatureExtractor};
use persona_collector::{ActivityCollector, CollectorError};
use persona_core::{extract_username, normalize_username, AppConfig};
use persona_store::{CacheEntry, CacheError, PersonaCache, RecordStore};
use persona_synth::{select_samples, ProviderChain};
use thiserror::Error;
use tokio::sync::Semaphore;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("not a valid reddit username: {0}")]
    InvalidUsername(String),

    #[error(transparent)]
    Collection(#[from] CollectorError),

    #[error("synthesis capacity is no longer available")]
    Closed,
}

pub type SynthesisError = CacheError<Arc<PipelineError>>;

/// Per-request collection limits. `None` collects until pagination ends.
#[derive(Debug, Clone, Copy, Default)]
pub struct Limits {
    pub max_posts: Option<usize>,
    pub max_comments: Option<usize>,
}

pub struct PersonaService {
    collector: ActivityCollector,
    extractor: FeatureExtractor,
    chain: ProviderChain,
    charts: ChartAggregateBuilder,
    cache: PersonaCache<Arc<PipelineError>>,
    store: RecordStore,
    permits: Semaphore,
}

impl PersonaService {
    #[must_use]
    pub fn new(
        collector: ActivityCollector,
        extractor: FeatureExtractor,
        chain: ProviderChain,
        store: RecordStore,
        max_concurrent_syntheses: usize,
    ) -> Self {
        Self {
            collector,
            extractor,
            chain,
            charts: ChartAggregateBuilder::default(),
            cache: PersonaCache::with_store(store.clone()),
            store,
            permits: Semaphore::new(max_concurrent_syntheses.max(1)),
        }
    }

    /// Wires every stage from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the Reddit or provider HTTP clients cannot be built.
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let chain = ProviderChain::from_config(&config.pipeline)?;
        if chain.provider_ids().is_empty() {
            tracing::warn!("no LLM providers configured; personas will come from the template");
        }
        Ok(Self::new(
            ActivityCollector::new(&config.pipeline)?,
            FeatureExtractor::from_config(&config.pipeline),
            chain,
            RecordStore::new(&config.output_dir),
            config.max_concurrent_syntheses,
        ))
    }

    #[must_use]
    pub fn provider_ids(&self) -> Vec<String> {
        self.chain
            .provider_ids()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    #[must_use]
    pub fn cache(&self) -> &PersonaCache<Arc<PipelineError>> {
        &self.cache
    }

    #[must_use]
    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    /// Accepts a bare name, `u/name`, `@name`, or profile URL and returns the
    /// normalized username.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidUsername`] if no valid name is found.
    pub fn resolve_username(input: &str) -> Result<String, PipelineError> {
        extract_username(input)
            .map(|name| normalize_username(&name))
            .ok_or_else(|| PipelineError::InvalidUsername(input.trim().to_string()))
    }

    /// Returns the cached persona for `username` or synthesizes it. With
    /// `refresh`, any cached entry is dropped first.
    ///
    /// # Errors
    ///
    /// Returns the collection failure that aborted synthesis. Provider
    /// failures never surface here; the chain falls back to its template.
    pub async fn persona(
        self: &Arc<Self>,
        username: &str,
        limits: Limits,
        refresh: bool,
    ) -> Result<Arc<CacheEntry>, SynthesisError> {
        if refresh {
            self.cache.invalidate(username).await;
        }
        let service = Arc::clone(self);
        self.cache
            .get_or_synthesize(username, move |key| async move {
                service.synthesize(key, limits).await.map_err(Arc::new)
            })
            .await
    }

    async fn synthesize(&self, username: String, limits: Limits) -> Result<CacheEntry, PipelineError> {
        let _permit = self.permits.acquire().await.map_err(|_| PipelineError::Closed)?;
        tracing::info!(username = %username, "synthesizing persona");

        let collection = self
            .collector
            .collect(&username, limits.max_posts, limits.max_comments)
            .await?;
        for warning in &collection.partial {
            tracing::warn!(username = %username, error = %warning, "continuing with partial activity");
        }

        let profile = self.extractor.extract(&collection.items);
        let samples = select_samples(&collection.items);
        let synthesis = self.chain.synthesize(&username, &profile, &samples).await;
        let charts = self.charts.build(&synthesis.record, &profile);
        Ok(CacheEntry::new(
            username,
            synthesis.record,
            profile,
            charts,
            synthesis.attempts,
        ))
    }
}
