use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Longest raw provider output kept on an attempt record.
pub const MAX_RAW_OUTPUT_CHARS: usize = 2_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    Success,
    Timeout,
    RateLimited,
    InvalidOutput,
    Error,
}

impl std::fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttemptOutcome::Success => write!(f, "success"),
            AttemptOutcome::Timeout => write!(f, "timeout"),
            AttemptOutcome::RateLimited => write!(f, "rate_limited"),
            AttemptOutcome::InvalidOutput => write!(f, "invalid_output"),
            AttemptOutcome::Error => write!(f, "error"),
        }
    }
}

/// Audit record for a single provider call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderAttempt {
    pub provider_id: String,
    /// 1-based attempt number within this provider.
    pub attempt: u32,
    pub started_at: DateTime<Utc>,
    #[serde(rename = "duration_ms", with = "duration_ms")]
    pub duration: Duration,
    pub outcome: AttemptOutcome,
    #[serde(default)]
    pub raw_output: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
}

impl ProviderAttempt {
    #[must_use]
    pub fn new(
        provider_id: impl Into<String>,
        attempt: u32,
        started_at: DateTime<Utc>,
        duration: Duration,
        outcome: AttemptOutcome,
    ) -> Self {
        Self {
            provider_id: provider_id.into(),
            attempt,
            started_at,
            duration,
            outcome,
            raw_output: None,
            detail: None,
        }
    }

    /// Attaches raw output, truncated to [`MAX_RAW_OUTPUT_CHARS`].
    #[must_use]
    pub fn with_raw_output(mut self, raw: &str) -> Self {
        self.raw_output = Some(raw.chars().take(MAX_RAW_OUTPUT_CHARS).collect());
        self
    }

    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub(super) fn serialize<S: Serializer>(value: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_output_is_truncated() {
        let raw = "x".repeat(MAX_RAW_OUTPUT_CHARS + 50);
        let attempt = ProviderAttempt::new(
            "groq",
            1,
            Utc::now(),
            Duration::from_millis(5),
            AttemptOutcome::InvalidOutput,
        )
        .with_raw_output(&raw);
        assert_eq!(
            attempt.raw_output.map(|r| r.chars().count()),
            Some(MAX_RAW_OUTPUT_CHARS)
        );
    }

    #[test]
    fn duration_serializes_as_millis() {
        let attempt = ProviderAttempt::new(
            "gemini",
            2,
            Utc::now(),
            Duration::from_millis(1_250),
            AttemptOutcome::Timeout,
        );
        let value = serde_json::to_value(&attempt).unwrap();
        assert_eq!(value["duration_ms"], 1_250);
        assert_eq!(value["outcome"], "timeout");
    }
}
