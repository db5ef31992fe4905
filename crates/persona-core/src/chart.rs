use serde::{Deserialize, Serialize};

/// Whether a series holds bounded percentages or raw counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeriesKind {
    Percentage,
    Count,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub label: String,
    pub value: f64,
}

/// A named, presentation-only series derived from a persona and its profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartAggregate {
    pub name: String,
    pub kind: SeriesKind,
    pub points: Vec<ChartPoint>,
}
