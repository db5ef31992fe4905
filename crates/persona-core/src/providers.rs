//! Provider table: which LLM backends the chain tries, in which order, and
//! under which retry policy.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Any backend speaking the `/chat/completions` protocol (Groq, `OpenAI`, ...).
    OpenaiCompatible,
    Gemini,
}

impl ProviderKind {
    #[must_use]
    pub fn default_base_url(self) -> &'static str {
        match self {
            ProviderKind::OpenaiCompatible => "https://api.groq.com/openai/v1",
            ProviderKind::Gemini => "https://generativelanguage.googleapis.com",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::OpenaiCompatible => write!(f, "openai_compatible"),
            ProviderKind::Gemini => write!(f, "gemini"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackoffKind {
    Fixed,
    #[default]
    Exponential,
}

/// Policy values applied to providers that do not set their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderPolicyDefaults {
    pub max_attempts: u32,
    pub timeout_secs: u64,
    pub backoff_ms: u64,
}

/// One resolved entry of the provider table.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub id: String,
    pub kind: ProviderKind,
    pub model: String,
    pub base_url: String,
    /// `None` when the configured key variable is unset; such providers are skipped.
    pub api_key: Option<String>,
    pub max_attempts: u32,
    pub timeout_secs: u64,
    pub backoff_ms: u64,
    pub backoff: BackoffKind,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[redacted]"))
            .field("max_attempts", &self.max_attempts)
            .field("timeout_secs", &self.timeout_secs)
            .field("backoff_ms", &self.backoff_ms)
            .field("backoff", &self.backoff)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderEntry {
    pub id: String,
    pub kind: ProviderKind,
    pub model: String,
    pub base_url: Option<String>,
    pub api_key_env: String,
    pub max_attempts: Option<u32>,
    pub timeout_secs: Option<u64>,
    pub backoff_ms: Option<u64>,
    pub backoff: Option<BackoffKind>,
}

#[derive(Debug, Deserialize)]
pub struct ProvidersFile {
    pub providers: Vec<ProviderEntry>,
}

/// Load, validate, and resolve the provider table from a YAML file.
///
/// API keys are read through `lookup` using each entry's `api_key_env`.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_providers<F>(
    path: &Path,
    defaults: ProviderPolicyDefaults,
    lookup: F,
) -> Result<Vec<ProviderConfig>, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ProvidersFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let file: ProvidersFile = serde_yaml::from_str(&content)?;
    validate_providers(&file)?;

    Ok(file
        .providers
        .into_iter()
        .map(|entry| resolve_entry(entry, defaults, &lookup))
        .collect())
}

pub(crate) fn resolve_entry<F>(
    entry: ProviderEntry,
    defaults: ProviderPolicyDefaults,
    lookup: &F,
) -> ProviderConfig
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let api_key = lookup(&entry.api_key_env)
        .ok()
        .filter(|k| !k.trim().is_empty());
    ProviderConfig {
        base_url: entry
            .base_url
            .unwrap_or_else(|| entry.kind.default_base_url().to_string()),
        api_key,
        max_attempts: entry.max_attempts.unwrap_or(defaults.max_attempts),
        timeout_secs: entry.timeout_secs.unwrap_or(defaults.timeout_secs),
        backoff_ms: entry.backoff_ms.unwrap_or(defaults.backoff_ms),
        backoff: entry.backoff.unwrap_or_default(),
        id: entry.id,
        kind: entry.kind,
        model: entry.model,
    }
}

fn validate_providers(file: &ProvidersFile) -> Result<(), ConfigError> {
    if file.providers.is_empty() {
        return Err(ConfigError::Validation(
            "providers list must not be empty".to_string(),
        ));
    }

    let mut seen_ids = HashSet::new();
    for entry in &file.providers {
        if entry.id.trim().is_empty() {
            return Err(ConfigError::Validation(
                "provider id must be non-empty".to_string(),
            ));
        }
        if entry.id == "template" {
            return Err(ConfigError::Validation(
                "provider id 'template' is reserved for the built-in fallback".to_string(),
            ));
        }
        if entry.model.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "provider '{}' must name a model",
                entry.id
            )));
        }
        if entry.max_attempts == Some(0) {
            return Err(ConfigError::Validation(format!(
                "provider '{}' has max_attempts 0; must be at least 1",
                entry.id
            )));
        }
        if entry.timeout_secs == Some(0) {
            return Err(ConfigError::Validation(format!(
                "provider '{}' has timeout_secs 0; must be at least 1",
                entry.id
            )));
        }
        if !seen_ids.insert(entry.id.to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate provider id: '{}'",
                entry.id
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::env::VarError;
    use std::io::Write;

    use super::*;

    const DEFAULTS: ProviderPolicyDefaults = ProviderPolicyDefaults {
        max_attempts: 2,
        timeout_secs: 30,
        backoff_ms: 500,
    };

    fn entry(id: &str) -> ProviderEntry {
        ProviderEntry {
            id: id.to_string(),
            kind: ProviderKind::OpenaiCompatible,
            model: "llama3-70b-8192".to_string(),
            base_url: None,
            api_key_env: "GROQ_API_KEY".to_string(),
            max_attempts: None,
            timeout_secs: None,
            backoff_ms: None,
            backoff: None,
        }
    }

    fn keys<'a>(
        map: &'a HashMap<&'a str, &'a str>,
    ) -> impl Fn(&str) -> Result<String, VarError> + 'a {
        move |key| {
            map.get(key)
                .map(|v| (*v).to_string())
                .ok_or(VarError::NotPresent)
        }
    }

    #[test]
    fn validate_rejects_empty_list() {
        let err = validate_providers(&ProvidersFile { providers: vec![] }).unwrap_err();
        assert!(err.to_string().contains("must not be empty"));
    }

    #[test]
    fn validate_rejects_duplicate_ids() {
        let file = ProvidersFile {
            providers: vec![entry("groq"), entry("GROQ")],
        };
        let err = validate_providers(&file).unwrap_err();
        assert!(err.to_string().contains("duplicate provider id"));
    }

    #[test]
    fn validate_rejects_zero_attempts() {
        let mut bad = entry("groq");
        bad.max_attempts = Some(0);
        let err = validate_providers(&ProvidersFile {
            providers: vec![bad],
        })
        .unwrap_err();
        assert!(err.to_string().contains("max_attempts 0"));
    }

    #[test]
    fn validate_rejects_reserved_template_id() {
        let err = validate_providers(&ProvidersFile {
            providers: vec![entry("template")],
        })
        .unwrap_err();
        assert!(err.to_string().contains("reserved"));
    }

    #[test]
    fn resolve_applies_defaults_and_key() {
        let map = HashMap::from([("GROQ_API_KEY", "gsk_test")]);
        let cfg = resolve_entry(entry("groq"), DEFAULTS, &keys(&map));
        assert_eq!(cfg.api_key.as_deref(), Some("gsk_test"));
        assert_eq!(cfg.max_attempts, 2);
        assert_eq!(cfg.base_url, "https://api.groq.com/openai/v1");
        assert_eq!(cfg.backoff, BackoffKind::Exponential);
    }

    #[test]
    fn resolve_leaves_missing_key_unset() {
        let map = HashMap::new();
        let cfg = resolve_entry(entry("groq"), DEFAULTS, &keys(&map));
        assert!(cfg.api_key.is_none());
    }

    #[test]
    fn debug_redacts_api_key() {
        let map = HashMap::from([("GROQ_API_KEY", "gsk_secret")]);
        let cfg = resolve_entry(entry("groq"), DEFAULTS, &keys(&map));
        let rendered = format!("{cfg:?}");
        assert!(!rendered.contains("gsk_secret"));
        assert!(rendered.contains("[redacted]"));
    }

    #[test]
    fn load_providers_reads_yaml_in_order() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "providers:\n  - id: gemini\n    kind: gemini\n    model: gemini-1.5-pro\n    api_key_env: GEMINI_API_KEY\n    max_attempts: 3\n    backoff: fixed\n  - id: groq\n    kind: openai_compatible\n    model: llama3-70b-8192\n    api_key_env: GROQ_API_KEY"
        )
        .unwrap();

        let map = HashMap::from([("GEMINI_API_KEY", "g-key")]);
        let providers = load_providers(file.path(), DEFAULTS, keys(&map)).unwrap();
        assert_eq!(providers.len(), 2);
        assert_eq!(providers[0].id, "gemini");
        assert_eq!(providers[0].max_attempts, 3);
        assert_eq!(providers[0].backoff, BackoffKind::Fixed);
        assert_eq!(providers[1].id, "groq");
        assert!(providers[1].api_key.is_none());
    }

    #[test]
    fn load_providers_reports_missing_file() {
        let map = HashMap::new();
        let err = load_providers(Path::new("/nonexistent/providers.yaml"), DEFAULTS, keys(&map))
            .unwrap_err();
        assert!(matches!(err, ConfigError::ProvidersFileIo { .. }));
    }
}
