//! Single-flight, in-memory persona cache keyed by normalized username.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use persona_core::{
    normalize_username, ChartAggregate, FeatureProfile, PersonaRecord, ProviderAttempt,
};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::records::RecordStore;

/// A synthesized persona together with everything derived alongside it.
#[derive(Debug, Clone, Serialize)]
pub struct CacheEntry {
    pub key: String,
    pub record: PersonaRecord,
    pub created_at: DateTime<Utc>,
    pub profile: FeatureProfile,
    pub charts: Vec<ChartAggregate>,
    pub attempts: Vec<ProviderAttempt>,
}

impl CacheEntry {
    #[must_use]
    pub fn new(
        key: impl Into<String>,
        record: PersonaRecord,
        profile: FeatureProfile,
        charts: Vec<ChartAggregate>,
        attempts: Vec<ProviderAttempt>,
    ) -> Self {
        Self {
            key: key.into(),
            record,
            created_at: Utc::now(),
            profile,
            charts,
            attempts,
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum CacheError<E> {
    #[error(transparent)]
    Synthesis(E),

    #[error("synthesis task aborted: {0}")]
    Aborted(String),
}

type SharedSynthesis<E> = Shared<BoxFuture<'static, Result<Arc<CacheEntry>, CacheError<E>>>>;

enum Slot<E> {
    Ready(Arc<CacheEntry>),
    InFlight {
        generation: u64,
        /// Set by an invalidation while the synthesis runs. A stale result is
        /// neither cached nor persisted, and the next caller waits for it to
        /// finish before starting a fresh synthesis.
        stale: bool,
        synthesis: SharedSynthesis<E>,
    },
}

struct Slots<E> {
    entries: HashMap<String, Slot<E>>,
    next_generation: u64,
}

impl<E> Slots<E> {
    /// `Some(stale)` while `generation` still owns the slot for `key`.
    fn flight_state(&self, key: &str, generation: u64) -> Option<bool> {
        match self.entries.get(key) {
            Some(Slot::InFlight {
                generation: g,
                stale,
                ..
            }) if *g == generation => Some(*stale),
            _ => None,
        }
    }
}

/// Caches one [`CacheEntry`] per username and guarantees at most one
/// concurrent synthesis per key.
///
/// Synthesis runs on its own task, so a caller that goes away does not
/// cancel it; the result still lands in the cache. Failures are handed to
/// every waiter and are not cached. An [`invalidate`](Self::invalidate) that
/// races an in-flight synthesis keeps that result out of the cache and out of
/// the [`RecordStore`], and the following synthesis starts only once the
/// stale one has finished.
pub struct PersonaCache<E> {
    slots: Arc<Mutex<Slots<E>>>,
    store: Option<RecordStore>,
}

impl<E> Clone for PersonaCache<E> {
    fn clone(&self) -> Self {
        Self {
            slots: Arc::clone(&self.slots),
            store: self.store.clone(),
        }
    }
}

impl<E> Default for PersonaCache<E> {
    fn default() -> Self {
        Self {
            slots: Arc::new(Mutex::new(Slots {
                entries: HashMap::new(),
                next_generation: 0,
            })),
            store: None,
        }
    }
}

impl<E> PersonaCache<E>
where
    E: Clone + Send + Sync + 'static,
{
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A cache that also writes every committed entry to `store`.
    ///
    /// The write happens before waiters are released, so documents on disk
    /// follow the same one-at-a-time order as the syntheses themselves.
    #[must_use]
    pub fn with_store(store: RecordStore) -> Self {
        Self {
            store: Some(store),
            ..Self::default()
        }
    }

    /// Returns the cached entry for `username`, joining an in-flight
    /// synthesis or starting one with `synthesize` (called with the
    /// normalized key) when there is neither.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Synthesis`] with the synthesis error, or
    /// [`CacheError::Aborted`] if the synthesis task panicked.
    pub async fn get_or_synthesize<F, Fut>(
        &self,
        username: &str,
        synthesize: F,
    ) -> Result<Arc<CacheEntry>, CacheError<E>>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<CacheEntry, E>> + Send + 'static,
    {
        let key = normalize_username(username);

        let mut slots = loop {
            let slots = self.slots.lock().await;
            let stale = match slots.entries.get(&key) {
                Some(Slot::InFlight {
                    stale: true,
                    synthesis,
                    ..
                }) => Some(synthesis.clone()),
                _ => None,
            };
            let Some(stale) = stale else { break slots };
            drop(slots);
            tracing::debug!(key = %key, "waiting for invalidated synthesis to finish");
            // Its outcome belongs to the callers that started it.
            let _ = stale.await;
        };

        let synthesis = match slots.entries.get(&key) {
            Some(Slot::Ready(entry)) => return Ok(Arc::clone(entry)),
            Some(Slot::InFlight { synthesis, .. }) => {
                tracing::debug!(key = %key, "joining in-flight synthesis");
                synthesis.clone()
            }
            None => {
                slots.next_generation += 1;
                let generation = slots.next_generation;
                let synthesis = self.spawn(key.clone(), generation, synthesize(key.clone()));
                slots.entries.insert(
                    key.clone(),
                    Slot::InFlight {
                        generation,
                        stale: false,
                        synthesis: synthesis.clone(),
                    },
                );
                synthesis
            }
        };
        drop(slots);
        synthesis.await
    }

    fn spawn<Fut>(&self, key: String, generation: u64, work: Fut) -> SharedSynthesis<E>
    where
        Fut: Future<Output = Result<CacheEntry, E>> + Send + 'static,
    {
        let slots = Arc::clone(&self.slots);
        let store = self.store.clone();
        let handle = tokio::spawn(async move {
            let result = work.await.map(Arc::new);

            if let (Ok(entry), Some(store)) = (&result, &store) {
                let live = slots.lock().await.flight_state(&key, generation) == Some(false);
                if live {
                    if let Err(e) = store.write(entry).await {
                        tracing::warn!(key = %key, error = %e, "failed to persist persona");
                    }
                }
            }

            let mut slots = slots.lock().await;
            if let Some(stale) = slots.flight_state(&key, generation) {
                match &result {
                    Ok(entry) if !stale => {
                        slots.entries.insert(key, Slot::Ready(Arc::clone(entry)));
                    }
                    _ => {
                        if stale {
                            tracing::debug!(key = %key, "discarding synthesis result invalidated in flight");
                        }
                        slots.entries.remove(&key);
                    }
                }
            }
            result
        });

        async move {
            match handle.await {
                Ok(result) => result.map_err(CacheError::Synthesis),
                Err(e) => Err(CacheError::Aborted(e.to_string())),
            }
        }
        .boxed()
        .shared()
    }

    /// The completed entry for `username`, if any.
    pub async fn get(&self, username: &str) -> Option<Arc<CacheEntry>> {
        let key = normalize_username(username);
        match self.slots.lock().await.entries.get(&key) {
            Some(Slot::Ready(entry)) => Some(Arc::clone(entry)),
            _ => None,
        }
    }

    /// Drops the completed entry for `username`, or marks its in-flight
    /// synthesis stale. Returns whether there was anything to invalidate.
    pub async fn invalidate(&self, username: &str) -> bool {
        let key = normalize_username(username);
        let mut slots = self.slots.lock().await;
        let invalidated = match slots.entries.get_mut(&key) {
            Some(Slot::InFlight { stale, .. }) => {
                *stale = true;
                true
            }
            Some(Slot::Ready(_)) => {
                slots.entries.remove(&key);
                true
            }
            None => false,
        };
        if invalidated {
            tracing::debug!(key = %key, "invalidated cache entry");
        }
        invalidated
    }

    /// Drops every completed entry and marks every in-flight synthesis stale.
    pub async fn clear(&self) {
        let mut slots = self.slots.lock().await;
        slots.entries.retain(|_, slot| match slot {
            Slot::Ready(_) => false,
            Slot::InFlight { stale, .. } => {
                *stale = true;
                true
            }
        });
    }

    /// Number of completed entries.
    pub async fn len(&self) -> usize {
        self.slots
            .lock()
            .await
            .entries
            .values()
            .filter(|slot| matches!(slot, Slot::Ready(_)))
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
