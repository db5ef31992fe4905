//! Persona synthesis: prompt construction, LLM providers, the fallback chain,
//! and schema normalization of provider output.

pub mod chain;
pub mod error;
pub mod normalize;
pub mod prompt;
pub mod provider;
pub mod providers;
pub mod template;

pub use chain::{ConfidencePolicy, ProviderChain, ProviderPolicy, Synthesis};
pub use error::{ProviderError, SchemaError};
pub use normalize::{normalize, resolve_citations};
pub use prompt::{build_prompt, select_samples};
pub use provider::{PersonaProvider, ProviderFuture, RawProviderOutput};
pub use providers::{build_provider, ChatCompletionsProvider, GeminiProvider};
pub use template::TemplateGenerator;
