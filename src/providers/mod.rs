//! LLM provider integrations behind a single capability interface.
//!
//! Every provider implements [`Provider`]: it receives one fully-shaped
//! [`ProviderRequest`] and returns the model's raw text. Request *shaping*
//! (which of the three request kinds to build) is decided once in
//! [`crate::pipeline::dispatch`]; providers only translate the chosen shape
//! into their own wire format.
//!
//! | Provider | Inline image | Native PDF | OCR |
//! |----------|--------------|------------|-----|
//! | [`GeminiProvider`]  | ✓ | ✓ (inline_data) | no |
//! | [`OpenAiProvider`]  | ✓ | no | no |
//! | [`MistralProvider`] | ✓ | ✓ (document_url) | ✓ |
//!
//! Providers are selected through [`ProviderRegistry`], a lookup table from
//! [`ProviderId`] to implementation.

mod gemini;
mod mistral;
mod openai;

pub use gemini::GeminiProvider;
pub use mistral::MistralProvider;
pub use openai::OpenAiProvider;

use crate::config::Config;
use crate::error::ExtractError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// The fixed set of supported providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProviderId {
    Gemini,
    OpenAi,
    Mistral,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::Gemini => "gemini",
            ProviderId::OpenAi => "openai",
            ProviderId::Mistral => "mistral",
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = ExtractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" | "google" => Ok(ProviderId::Gemini),
            "openai" => Ok(ProviderId::OpenAi),
            "mistral" => Ok(ProviderId::Mistral),
            other => Err(ExtractError::InvalidInput(format!(
                "unknown provider '{other}'"
            ))),
        }
    }
}

/// One request to a provider. Exactly one shape is built per document.
#[derive(Clone, PartialEq)]
pub enum ProviderRequest {
    /// Prompt with the document text already appended.
    Text { prompt: String },

    /// Prompt plus a base64-encoded image sent inline.
    InlineImage {
        prompt: String,
        mime_type: String,
        data_base64: String,
    },

    /// Prompt plus the raw document for providers that read PDFs natively.
    Document {
        prompt: String,
        mime_type: String,
        file_name: String,
        bytes: Vec<u8>,
    },
}

impl ProviderRequest {
    pub fn prompt(&self) -> &str {
        match self {
            ProviderRequest::Text { prompt }
            | ProviderRequest::InlineImage { prompt, .. }
            | ProviderRequest::Document { prompt, .. } => prompt,
        }
    }

    /// Short name of the request shape, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderRequest::Text { .. } => "text",
            ProviderRequest::InlineImage { .. } => "inline-image",
            ProviderRequest::Document { .. } => "document",
        }
    }
}

// Payloads can be megabytes of base64; keep them out of Debug output.
impl fmt::Debug for ProviderRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderRequest::Text { prompt } => f
                .debug_struct("Text")
                .field("prompt_len", &prompt.len())
                .finish(),
            ProviderRequest::InlineImage {
                mime_type,
                data_base64,
                ..
            } => f
                .debug_struct("InlineImage")
                .field("mime_type", mime_type)
                .field("data_len", &data_base64.len())
                .finish(),
            ProviderRequest::Document {
                mime_type,
                file_name,
                bytes,
                ..
            } => f
                .debug_struct("Document")
                .field("mime_type", mime_type)
                .field("file_name", file_name)
                .field("bytes", &bytes.len())
                .finish(),
        }
    }
}

/// Document/text/image-to-text capability of an LLM provider.
#[async_trait]
pub trait Provider: Send + Sync {
    fn id(&self) -> ProviderId;

    /// Whether raw PDF bytes can be submitted instead of extracted text.
    fn supports_native_pdf(&self) -> bool;

    /// Send one request and return the model's raw text output.
    async fn complete(&self, request: &ProviderRequest) -> Result<String, ExtractError>;
}

/// OCR capability used when a PDF carries no extractable text.
#[async_trait]
pub trait OcrProvider: Send + Sync {
    async fn ocr(&self, bytes: &[u8], file_name: &str) -> Result<String, ExtractError>;
}

/// Lookup table from provider id to implementation.
#[derive(Clone)]
pub struct ProviderRegistry {
    providers: HashMap<ProviderId, Arc<dyn Provider>>,
    default: ProviderId,
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<_> = self.providers.keys().collect();
        ids.sort();
        f.debug_struct("ProviderRegistry")
            .field("providers", &ids)
            .field("default", &self.default)
            .finish()
    }
}

impl ProviderRegistry {
    /// Empty registry; `default` must be registered before use.
    pub fn new(default: ProviderId) -> Self {
        Self {
            providers: HashMap::new(),
            default,
        }
    }

    /// Build every provider that has credentials in `config`.
    pub fn from_config(config: &Config) -> Result<Self, ExtractError> {
        let client = http_client(config.api.api_timeout_secs)?;
        let mut registry = Self::new(config.default_provider());

        // Only providers listed in api.providers, plus the default.
        let mut ids = config.enabled_providers();
        if !ids.contains(&registry.default) {
            ids.push(registry.default);
        }
        for id in ids {
            let Some(settings) = config.provider_settings(id) else {
                continue;
            };
            let provider: Arc<dyn Provider> = match id {
                ProviderId::Gemini => Arc::new(GeminiProvider::new(client.clone(), settings)),
                ProviderId::OpenAi => Arc::new(OpenAiProvider::new(client.clone(), settings)),
                ProviderId::Mistral => Arc::new(MistralProvider::new(client.clone(), settings)),
            };
            registry.register(provider);
        }

        if !registry.providers.contains_key(&registry.default) {
            return Err(ExtractError::ProviderNotConfigured {
                provider: registry.default.to_string(),
                hint: format!("Add a [{}] section with an api_key.", registry.default),
            });
        }
        Ok(registry)
    }

    pub fn register(&mut self, provider: Arc<dyn Provider>) {
        self.providers.insert(provider.id(), provider);
    }

    pub fn default_id(&self) -> ProviderId {
        self.default
    }

    /// Resolve a caller-supplied provider name.
    ///
    /// `None`, an empty string, `"Default"`, an unknown name or a known but
    /// unconfigured provider all resolve to the default provider.
    pub fn resolve(&self, name: Option<&str>) -> Result<Arc<dyn Provider>, ExtractError> {
        let requested = name
            .map(str::trim)
            .filter(|n| !n.is_empty() && !n.eq_ignore_ascii_case("default"))
            .and_then(|n| n.parse::<ProviderId>().ok())
            .filter(|id| self.providers.contains_key(id));

        let id = requested.unwrap_or(self.default);
        debug!("Resolved provider {:?} → {}", name, id);

        self.providers
            .get(&id)
            .cloned()
            .ok_or_else(|| ExtractError::ProviderNotConfigured {
                provider: id.to_string(),
                hint: "No implementation registered for the default provider.".into(),
            })
    }
}

/// Shared HTTP client for provider calls.
pub(crate) fn http_client(timeout_secs: u64) -> Result<reqwest::Client, ExtractError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| ExtractError::Internal(format!("Failed to build HTTP client: {e}")))
}

/// Turn a non-success HTTP response into a provider error carrying the body.
pub(crate) async fn check_status(
    provider: ProviderId,
    response: reqwest::Response,
) -> Result<reqwest::Response, ExtractError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ExtractError::provider(
        provider.as_str(),
        format!("HTTP {status}: {}", body.trim()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(ProviderId);

    #[async_trait]
    impl Provider for Fixed {
        fn id(&self) -> ProviderId {
            self.0
        }
        fn supports_native_pdf(&self) -> bool {
            false
        }
        async fn complete(&self, _request: &ProviderRequest) -> Result<String, ExtractError> {
            Ok(self.0.to_string())
        }
    }

    fn registry() -> ProviderRegistry {
        let mut r = ProviderRegistry::new(ProviderId::Gemini);
        r.register(Arc::new(Fixed(ProviderId::Gemini)));
        r.register(Arc::new(Fixed(ProviderId::OpenAi)));
        r
    }

    #[test]
    fn parse_provider_ids() {
        assert_eq!("Gemini".parse::<ProviderId>().unwrap(), ProviderId::Gemini);
        assert_eq!(" openai ".parse::<ProviderId>().unwrap(), ProviderId::OpenAi);
        assert_eq!("MISTRAL".parse::<ProviderId>().unwrap(), ProviderId::Mistral);
        assert!("claude".parse::<ProviderId>().is_err());
    }

    #[test]
    fn resolve_named_provider() {
        let p = registry().resolve(Some("openai")).unwrap();
        assert_eq!(p.id(), ProviderId::OpenAi);
    }

    #[test]
    fn resolve_falls_back_to_default() {
        let r = registry();
        for name in [None, Some(""), Some("Default"), Some("claude"), Some("mistral")] {
            assert_eq!(r.resolve(name).unwrap().id(), ProviderId::Gemini, "{name:?}");
        }
    }

    #[test]
    fn unlisted_providers_are_not_registered() {
        let toml = r#"
[api]
providers = ["gemini"]
default_provider = "gemini"

[gemini]
api_key = "g"

[openai]
api_key = "o"
"#;
        let config = Config::from_toml_str(toml).unwrap();
        let r = ProviderRegistry::from_config(&config).unwrap();
        assert_eq!(r.resolve(Some("openai")).unwrap().id(), ProviderId::Gemini);
        assert_eq!(r.resolve(Some("gemini")).unwrap().id(), ProviderId::Gemini);
    }

    #[test]
    fn listed_providers_are_registered() {
        let toml = "[gemini]\napi_key = \"g\"\n[openai]\napi_key = \"o\"\n";
        let config = Config::from_toml_str(toml).unwrap();
        let r = ProviderRegistry::from_config(&config).unwrap();
        assert_eq!(r.resolve(Some("openai")).unwrap().id(), ProviderId::OpenAi);
    }

    #[test]
    fn request_debug_hides_payload() {
        let req = ProviderRequest::InlineImage {
            prompt: "p".into(),
            mime_type: "image/png".into(),
            data_base64: "QUJD".repeat(100),
        };
        let dbg = format!("{req:?}");
        assert!(!dbg.contains("QUJD"));
        assert!(dbg.contains("400"));
        assert_eq!(req.kind(), "inline-image");
    }
}
