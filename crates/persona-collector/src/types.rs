//! Wire types for the Reddit JSON API.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub(crate) access_token: String,
}

/// `/user/{name}/about` response.
#[derive(Debug, Deserialize)]
pub(crate) struct About {
    pub(crate) data: AboutData,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AboutData {
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) link_karma: i64,
    #[serde(default)]
    pub(crate) comment_karma: i64,
    #[serde(default)]
    pub(crate) created_utc: Option<f64>,
    #[serde(default)]
    pub(crate) is_suspended: bool,
}

/// Listing wrapper shared by `/submitted` and `/comments`.
#[derive(Debug, Deserialize)]
pub(crate) struct Listing {
    pub(crate) data: ListingData,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListingData {
    #[serde(default)]
    pub(crate) children: Vec<Thing>,
    pub(crate) after: Option<String>,
}

/// A `t3` (submission) or `t1` (comment) listing child.
#[derive(Debug, Deserialize)]
pub(crate) struct Thing {
    pub(crate) kind: String,
    pub(crate) data: ThingData,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ThingData {
    pub(crate) id: Option<String>,
    pub(crate) name: Option<String>,
    pub(crate) subreddit: Option<String>,
    pub(crate) title: Option<String>,
    pub(crate) selftext: Option<String>,
    pub(crate) body: Option<String>,
    #[serde(default)]
    pub(crate) score: i64,
    pub(crate) created_utc: Option<f64>,
    pub(crate) permalink: Option<String>,
}
