//! Capped, paginated collection of a user's posts and comments.

use std::time::Duration;

use persona_core::{ActivityItem, ActivityKind, PipelineConfig};

use crate::client::{AccountInfo, ListingKind, RedditClient};
use crate::error::{CollectorError, PartialDataError};

/// Reddit serves at most this many items per listing; also the effective cap
/// when the caller passes `None`.
pub const HARD_ITEM_CEILING: usize = 1_000;

/// Largest page Reddit will return.
const PAGE_LIMIT: usize = 100;

/// Maximum number of pages per listing. Guards against cursors that never end.
const MAX_PAGES: usize = 50;

/// Everything gathered for one user.
#[derive(Debug)]
pub struct Collection {
    pub account: AccountInfo,
    pub items: Vec<ActivityItem>,
    /// Listings whose pagination stopped early. Items gathered before the
    /// interruption are still in `items`.
    pub partial: Vec<PartialDataError>,
}

impl Collection {
    #[must_use]
    pub fn post_count(&self) -> usize {
        self.items.iter().filter(|i| i.kind == ActivityKind::Post).count()
    }

    #[must_use]
    pub fn comment_count(&self) -> usize {
        self.items
            .iter()
            .filter(|i| i.kind == ActivityKind::Comment)
            .count()
    }

    #[must_use]
    pub fn is_partial(&self) -> bool {
        !self.partial.is_empty()
    }
}

pub struct ActivityCollector {
    client: RedditClient,
    inter_request_delay: Duration,
}

impl ActivityCollector {
    /// # Errors
    ///
    /// Returns [`CollectorError::Http`] if the HTTP client cannot be built.
    pub fn new(config: &PipelineConfig) -> Result<Self, CollectorError> {
        Ok(Self {
            client: RedditClient::new(config)?,
            inter_request_delay: Duration::from_millis(config.collector_inter_request_delay_ms),
        })
    }

    #[must_use]
    pub fn with_client(client: RedditClient, inter_request_delay: Duration) -> Self {
        Self {
            client,
            inter_request_delay,
        }
    }

    /// Collects up to `max_posts` submissions and `max_comments` comments,
    /// newest first. `None` means "until the listing ends", bounded by
    /// [`HARD_ITEM_CEILING`].
    ///
    /// # Errors
    ///
    /// - [`CollectorError::NotFound`] if the account does not exist, is
    ///   suspended, or is private. Never retried.
    /// - [`CollectorError::RateLimited`] or another transport error if the very
    ///   first requests fail and nothing was gathered. Failures after some
    ///   items were gathered are reported in [`Collection::partial`] instead.
    pub async fn collect(
        &self,
        username: &str,
        max_posts: Option<usize>,
        max_comments: Option<usize>,
    ) -> Result<Collection, CollectorError> {
        let account = self.client.fetch_about(username).await?;

        let (mut items, post_err) = self
            .collect_listing(username, ListingKind::Submitted, max_posts)
            .await;
        let (comments, comment_err) = self
            .collect_listing(username, ListingKind::Comments, max_comments)
            .await;
        items.extend(comments);

        let mut partial = Vec::new();
        for err in [post_err, comment_err].into_iter().flatten() {
            if matches!(err.cause, CollectorError::NotFound { .. }) {
                return Err(err.cause);
            }
            partial.push(err);
        }

        if items.is_empty() && !partial.is_empty() {
            return Err(partial.swap_remove(0).cause);
        }

        for err in &partial {
            tracing::warn!(
                username,
                listing = %err.listing,
                collected = err.collected,
                error = %err.cause,
                "partial reddit data"
            );
        }

        tracing::info!(
            username,
            items = items.len(),
            partial = !partial.is_empty(),
            "collected reddit activity"
        );

        Ok(Collection {
            account,
            items,
            partial,
        })
    }

    async fn collect_listing(
        &self,
        username: &str,
        listing: ListingKind,
        cap: Option<usize>,
    ) -> (Vec<ActivityItem>, Option<PartialDataError>) {
        let cap = cap.unwrap_or(HARD_ITEM_CEILING).min(HARD_ITEM_CEILING);
        let mut items: Vec<ActivityItem> = Vec::new();
        let mut after: Option<String> = None;

        for page_index in 0..MAX_PAGES {
            let remaining = cap.saturating_sub(items.len());
            if remaining == 0 {
                break;
            }
            if page_index > 0 && !self.inter_request_delay.is_zero() {
                tokio::time::sleep(self.inter_request_delay).await;
            }

            let page = match self
                .client
                .fetch_listing_page(
                    username,
                    listing,
                    after.as_deref(),
                    remaining.min(PAGE_LIMIT),
                )
                .await
            {
                Ok(page) => page,
                Err(cause) => {
                    let collected = items.len();
                    return (
                        items,
                        Some(PartialDataError {
                            listing,
                            collected,
                            cause,
                        }),
                    );
                }
            };

            items.extend(page.items.into_iter().take(remaining));

            match page.after {
                Some(next) if page.raw_count > 0 && after.as_deref() != Some(next.as_str()) => {
                    after = Some(next);
                }
                _ => break,
            }
        }

        tracing::debug!(username, %listing, items = items.len(), "listing collected");
        (items, None)
    }
}
