pub mod activity;
pub mod app_config;
pub mod attempt;
pub mod chart;
pub mod config;
pub mod persona;
pub mod profile;
pub mod providers;
pub mod score_map;
pub mod username;

pub use activity::{ActivityItem, ActivityKind};
pub use app_config::{AppConfig, Environment, PipelineConfig, RateLimitConfig};
pub use attempt::{AttemptOutcome, ProviderAttempt};
pub use chart::{ChartAggregate, ChartPoint, SeriesKind};
pub use config::{load_app_config, load_app_config_from_env, load_app_config_with};
pub use persona::{Citation, Demographics, PersonaMetadata, PersonaRecord};
pub use profile::{
    ActivityCadence, DayPattern, Engagement, EngagementLevel, FeatureProfile,
    SentimentDistribution, WeightedLabel, WritingStyle,
};
pub use providers::{
    load_providers, BackoffKind, ProviderConfig, ProviderKind, ProviderPolicyDefaults,
};
pub use score_map::ScoreMap;
pub use username::{extract_username, is_valid_username, normalize_username};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for environment variable {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read providers file at {path}: {source}")]
    ProvidersFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse providers file: {0}")]
    ProvidersFileParse(#[from] serde_yaml::Error),

    #[error("providers validation error: {0}")]
    Validation(String),
}
