//! Reddit activity collection: fetches a user's submissions and comments and
//! normalizes them into [`persona_core::ActivityItem`]s.

pub mod client;
pub mod collector;
pub mod error;
pub(crate) mod normalize;
pub(crate) mod retry;
pub(crate) mod types;

pub use client::{AccountInfo, ListingKind, ListingPage, RedditClient};
pub use collector::{ActivityCollector, Collection, HARD_ITEM_CEILING};
pub use error::{CollectorError, PartialDataError};
