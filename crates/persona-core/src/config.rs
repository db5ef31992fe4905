use crate::app_config::{AppConfig, Environment, PipelineConfig, RateLimitConfig};
use crate::providers::{
    load_providers, resolve_entry, ProviderConfig, ProviderEntry, ProviderKind,
    ProviderPolicyDefaults,
};
use crate::ConfigError;

const DEFAULT_USER_AGENT: &str = "persona-forge/0.1 (persona-synthesis)";
const PUBLIC_REDDIT_BASE_URL: &str = "https://www.reddit.com";
const OAUTH_REDDIT_BASE_URL: &str = "https://oauth.reddit.com";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if values are invalid or the providers file is unusable.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if values are invalid or the providers file is unusable.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Load application configuration through an arbitrary env-var lookup.
///
/// # Errors
///
/// Returns `ConfigError` if values are invalid or the providers file is unusable.
pub fn load_app_config_with<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    build_app_config(lookup)
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so tests can use a `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let optional = |var: &str| -> Option<String> {
        lookup(var).ok().filter(|v| !v.trim().is_empty())
    };

    let or_default = |var: &str, default: &str| -> String {
        optional(var).unwrap_or_else(|| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_f64 = |var: &str, default: &str| -> Result<f64, ConfigError> {
        let value = or_default(var, default)
            .parse::<f64>()
            .map_err(|e| invalid(var, e.to_string()))?;
        if value.is_finite() {
            Ok(value)
        } else {
            Err(invalid(var, "must be a finite number".to_string()))
        }
    };

    let env = parse_environment(&or_default("PERSONA_ENV", "development"))?;

    let bind_addr = or_default("PERSONA_BIND_ADDR", "0.0.0.0:8000")
        .parse::<SocketAddr>()
        .map_err(|e| invalid("PERSONA_BIND_ADDR", e.to_string()))?;
    let log_level = or_default("PERSONA_LOG_LEVEL", "info");
    let output_dir = PathBuf::from(or_default("PERSONA_OUTPUT_DIR", "./personas"));

    let max_concurrent_syntheses = parse_usize("PERSONA_MAX_CONCURRENT_SYNTHESES", "4")?;
    if max_concurrent_syntheses == 0 {
        return Err(invalid(
            "PERSONA_MAX_CONCURRENT_SYNTHESES",
            "must be at least 1".to_string(),
        ));
    }

    let rate_limit = RateLimitConfig {
        max_requests: parse_usize("PERSONA_RATE_LIMIT_MAX_REQUESTS", "120")?,
        window_secs: parse_u64("PERSONA_RATE_LIMIT_WINDOW_SECS", "60")?,
    };
    if rate_limit.max_requests == 0 {
        return Err(invalid(
            "PERSONA_RATE_LIMIT_MAX_REQUESTS",
            "must be at least 1".to_string(),
        ));
    }
    if rate_limit.window_secs == 0 {
        return Err(invalid(
            "PERSONA_RATE_LIMIT_WINDOW_SECS",
            "must be at least 1".to_string(),
        ));
    }

    let reddit_client_id = optional("REDDIT_CLIENT_ID");
    let reddit_client_secret = optional("REDDIT_CLIENT_SECRET");
    let default_base_url = if reddit_client_id.is_some() && reddit_client_secret.is_some() {
        OAUTH_REDDIT_BASE_URL
    } else {
        PUBLIC_REDDIT_BASE_URL
    };
    let reddit_base_url = or_default("REDDIT_API_BASE_URL", default_base_url)
        .trim_end_matches('/')
        .to_string();
    let reddit_token_url = or_default(
        "REDDIT_TOKEN_URL",
        "https://www.reddit.com/api/v1/access_token",
    );
    let reddit_user_agent = or_default("REDDIT_USER_AGENT", DEFAULT_USER_AGENT);

    let collector_timeout_secs = parse_u64("PERSONA_COLLECTOR_TIMEOUT_SECS", "30")?;
    let collector_max_retries = parse_u32("PERSONA_COLLECTOR_MAX_RETRIES", "3")?;
    let collector_backoff_base_ms = parse_u64("PERSONA_COLLECTOR_BACKOFF_BASE_MS", "500")?;
    let collector_inter_request_delay_ms =
        parse_u64("PERSONA_COLLECTOR_INTER_REQUEST_DELAY_MS", "100")?;

    let defaults = ProviderPolicyDefaults {
        max_attempts: parse_u32("PERSONA_PROVIDER_MAX_ATTEMPTS", "2")?,
        timeout_secs: parse_u64("PERSONA_PROVIDER_TIMEOUT_SECS", "30")?,
        backoff_ms: parse_u64("PERSONA_PROVIDER_BACKOFF_MS", "500")?,
    };
    if defaults.max_attempts == 0 {
        return Err(invalid(
            "PERSONA_PROVIDER_MAX_ATTEMPTS",
            "must be at least 1".to_string(),
        ));
    }

    let providers = match optional("PERSONA_PROVIDERS_PATH") {
        Some(path) => load_providers(std::path::Path::new(&path), defaults, &lookup)?,
        None => env_providers(defaults, &lookup),
    };

    let sentiment_positive_threshold = parse_f64("PERSONA_SENTIMENT_POSITIVE_THRESHOLD", "0.1")?;
    let sentiment_negative_threshold =
        parse_f64("PERSONA_SENTIMENT_NEGATIVE_THRESHOLD", "-0.1")?;
    if sentiment_negative_threshold > sentiment_positive_threshold {
        return Err(invalid(
            "PERSONA_SENTIMENT_NEGATIVE_THRESHOLD",
            format!(
                "must not exceed PERSONA_SENTIMENT_POSITIVE_THRESHOLD ({sentiment_positive_threshold})"
            ),
        ));
    }

    let confidence_full_coverage_items =
        parse_usize("PERSONA_CONFIDENCE_FULL_COVERAGE_ITEMS", "50")?.max(1);

    Ok(AppConfig {
        env,
        bind_addr,
        log_level,
        output_dir,
        max_concurrent_syntheses,
        rate_limit,
        pipeline: PipelineConfig {
            reddit_client_id,
            reddit_client_secret,
            reddit_user_agent,
            reddit_base_url,
            reddit_token_url,
            collector_timeout_secs,
            collector_max_retries,
            collector_backoff_base_ms,
            collector_inter_request_delay_ms,
            providers,
            sentiment_positive_threshold,
            sentiment_negative_threshold,
            confidence_full_coverage_items,
        },
    })
}

/// Groq first, Gemini second, each configured from its own env vars.
fn env_providers<F>(defaults: ProviderPolicyDefaults, lookup: &F) -> Vec<ProviderConfig>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let entry = |id: &str, kind: ProviderKind, prefix: &str, default_model: &str| ProviderEntry {
        id: id.to_string(),
        kind,
        model: lookup(&format!("{prefix}_MODEL")).unwrap_or_else(|_| default_model.to_string()),
        base_url: lookup(&format!("{prefix}_BASE_URL")).ok(),
        api_key_env: format!("{prefix}_API_KEY"),
        max_attempts: None,
        timeout_secs: None,
        backoff_ms: None,
        backoff: None,
    };

    vec![
        resolve_entry(
            entry("groq", ProviderKind::OpenaiCompatible, "GROQ", "llama3-70b-8192"),
            defaults,
            lookup,
        ),
        resolve_entry(
            entry("gemini", ProviderKind::Gemini, "GEMINI", "gemini-1.5-pro"),
            defaults,
            lookup,
        ),
    ]
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "PERSONA_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
