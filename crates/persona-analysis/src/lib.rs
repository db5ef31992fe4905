//! Pure, network-free analysis of collected activity: feature extraction and
//! chart-ready aggregates.

pub mod charts;
pub mod extractor;
pub(crate) mod indicators;
pub mod lexicon;
pub mod text;

pub use charts::ChartAggregateBuilder;
pub use extractor::{FeatureExtractor, SentimentThresholds};
pub use lexicon::lexicon_score;
