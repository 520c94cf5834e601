//! Configuration for the extraction service.
//!
//! All behaviour is controlled through one [`Config`] value that is loaded
//! once at process start (from TOML) and never mutated afterwards. The
//! [`crate::extract::Extractor`] takes it by value at construction time and
//! shares it read-only across concurrent requests.
//!
//! ```toml
//! [server]
//! bind = "0.0.0.0:8000"
//!
//! [api]
//! providers = ["gemini", "openai", "mistral"]
//! default_provider = "gemini"
//!
//! [gemini]
//! api_key = "…"
//! model = "gemini-2.0-flash"
//!
//! [prompts.ocr]
//! name = "OCR to CSV"
//! provider = "gemini"
//! file_ext = "csv"
//! prompt = "Extract every table …"
//! ```
//!
//! Secrets can live in a second file merged over the first, see
//! [`Config::load_with_secrets`].

use crate::error::ExtractError;
use crate::providers::ProviderId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Complete service configuration.
///
/// Built via [`Config::load`], [`Config::from_toml_str`] or
/// [`Config::builder()`].
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerSettings,

    /// Front-end defaults (default prompt, output directory).
    #[serde(default)]
    pub ui: UiSettings,

    /// Provider selection and transport settings.
    #[serde(default)]
    pub api: ApiSettings,

    /// Google Gemini credentials.
    #[serde(default)]
    pub gemini: Option<ProviderSettings>,

    /// OpenAI credentials.
    #[serde(default)]
    pub openai: Option<ProviderSettings>,

    /// Mistral credentials. Also used for the OCR fallback.
    #[serde(default)]
    pub mistral: Option<ProviderSettings>,

    /// Scraping API used by the summary path.
    #[serde(default)]
    pub scraper: Option<ScraperSettings>,

    /// Named prompt templates keyed by template id.
    #[serde(default)]
    pub prompts: BTreeMap<String, PromptTemplate>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Socket address the HTTP server binds to. Default: `0.0.0.0:8000`.
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8000".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiSettings {
    /// Display name of the prompt template pre-selected in front ends.
    #[serde(default)]
    pub default_prompt: Option<String>,

    /// Directory where processed output files are written.
    #[serde(default = "default_processed_dir")]
    pub processed_dir: PathBuf,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            default_prompt: None,
            processed_dir: default_processed_dir(),
        }
    }
}

fn default_processed_dir() -> PathBuf {
    PathBuf::from("data/processed")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSettings {
    /// Provider names offered to callers besides "Default".
    #[serde(default = "default_enabled_providers")]
    pub providers: Vec<String>,

    /// Provider used when the caller names none or an unknown one.
    #[serde(default = "default_provider_name")]
    pub default_provider: String,

    /// Per-request timeout for provider calls in seconds. Default: 120.
    #[serde(default = "default_api_timeout_secs")]
    pub api_timeout_secs: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            providers: default_enabled_providers(),
            default_provider: default_provider_name(),
            api_timeout_secs: default_api_timeout_secs(),
        }
    }
}

fn default_enabled_providers() -> Vec<String> {
    vec!["gemini".into(), "openai".into(), "mistral".into()]
}

fn default_provider_name() -> String {
    "gemini".to_string()
}

fn default_api_timeout_secs() -> u64 {
    120
}

/// Credentials and model for one LLM provider.
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    pub api_key: String,

    /// Model id. Each provider has its own default when unset.
    #[serde(default)]
    pub model: Option<String>,

    /// Override the API base URL (proxies, test servers).
    #[serde(default)]
    pub base_url: Option<String>,

    /// Sampling temperature; only OpenAI honours it. Default: 0.1.
    #[serde(default)]
    pub temperature: Option<f32>,

    /// OCR model (Mistral only). Default: `mistral-ocr-latest`.
    #[serde(default)]
    pub ocr_model: Option<String>,
}

impl ProviderSettings {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: None,
            base_url: None,
            temperature: None,
            ocr_model: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }
}

// API keys never reach the logs.
impl fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("temperature", &self.temperature)
            .field("ocr_model", &self.ocr_model)
            .finish()
    }
}

/// Scraping API used to turn a URL into page text.
#[derive(Clone, Serialize, Deserialize)]
pub struct ScraperSettings {
    pub api_key: String,

    /// Request URL template with `{api_key}` and `{target_url}` placeholders.
    pub api_url: String,

    /// Directory holding cached page text. Default: `data/crawl`.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Cached pages younger than this are served without a network call.
    #[serde(default = "default_freshness_days")]
    pub freshness_days: u64,
}

impl fmt::Debug for ScraperSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScraperSettings")
            .field("api_key", &"<redacted>")
            .field("api_url", &self.api_url)
            .field("cache_dir", &self.cache_dir)
            .field("freshness_days", &self.freshness_days)
            .finish()
    }
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from("data/crawl")
}

fn default_freshness_days() -> u64 {
    7
}

/// One `[prompts.<id>]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptTemplate {
    /// Display name shown in front ends.
    pub name: String,
    /// Default provider for this template.
    pub provider: String,
    /// Output file extension (`csv`, `md`, `txt`).
    pub file_ext: String,
    /// Prompt body sent to the provider.
    pub prompt: String,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("server", &self.server)
            .field("ui", &self.ui)
            .field("api", &self.api)
            .field("gemini", &self.gemini)
            .field("openai", &self.openai)
            .field("mistral", &self.mistral)
            .field("scraper", &self.scraper)
            .field("prompts", &self.prompts.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Config {
    /// Create a new builder for `Config`.
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder {
            config: Self::default(),
        }
    }

    /// Load and validate a TOML configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Config, ExtractError> {
        Self::load_with_secrets(path, None::<&Path>)
    }

    /// Load a configuration file and merge an optional secrets file over it.
    ///
    /// Tables are merged key by key, so the secrets file only needs the
    /// fields it overrides (typically `api_key`). A missing secrets file is
    /// not an error.
    pub fn load_with_secrets(
        path: impl AsRef<Path>,
        secrets: Option<impl AsRef<Path>>,
    ) -> Result<Config, ExtractError> {
        let mut table = read_table(path.as_ref())?;

        if let Some(secrets) = secrets {
            let secrets = secrets.as_ref();
            if secrets.exists() {
                merge_tables(&mut table, read_table(secrets)?);
            }
        }

        let config = toml::Value::Table(table)
            .try_into::<Config>()
            .map_err(|e| ExtractError::ConfigRead {
                path: path.as_ref().to_path_buf(),
                reason: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Config, ExtractError> {
        let config: Config = toml::from_str(s).map_err(|e| ExtractError::ConfigRead {
            path: PathBuf::from("<string>"),
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// The configured default provider.
    ///
    /// Only valid after [`Config::validate`] succeeded; falls back to Gemini
    /// otherwise.
    pub fn default_provider(&self) -> ProviderId {
        self.api
            .default_provider
            .parse()
            .unwrap_or(ProviderId::Gemini)
    }

    /// Enabled providers that also have credentials.
    pub fn enabled_providers(&self) -> Vec<ProviderId> {
        self.api
            .providers
            .iter()
            .filter_map(|name| name.parse::<ProviderId>().ok())
            .filter(|id| self.provider_settings(*id).is_some())
            .collect()
    }

    /// Credentials for the given provider, if configured.
    pub fn provider_settings(&self, id: ProviderId) -> Option<&ProviderSettings> {
        match id {
            ProviderId::Gemini => self.gemini.as_ref(),
            ProviderId::OpenAi => self.openai.as_ref(),
            ProviderId::Mistral => self.mistral.as_ref(),
        }
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<(), ExtractError> {
        for name in &self.api.providers {
            name.parse::<ProviderId>().map_err(|_| {
                ExtractError::InvalidConfig(format!("unknown provider '{name}' in api.providers"))
            })?;
        }

        let default: ProviderId = self.api.default_provider.parse().map_err(|_| {
            ExtractError::InvalidConfig(format!(
                "api.default_provider '{}' is not one of gemini, openai, mistral",
                self.api.default_provider
            ))
        })?;

        if self.provider_settings(default).is_none() {
            return Err(ExtractError::InvalidConfig(format!(
                "default provider '{default}' has no [{default}] section"
            )));
        }

        if self.api.api_timeout_secs == 0 {
            return Err(ExtractError::InvalidConfig(
                "api.api_timeout_secs must be ≥ 1".into(),
            ));
        }

        for (id, template) in &self.prompts {
            if template.file_ext.trim().is_empty() {
                return Err(ExtractError::InvalidConfig(format!(
                    "prompts.{id}.file_ext must not be empty"
                )));
            }
        }

        if let Some(ref scraper) = self.scraper {
            if !scraper.api_url.contains("{target_url}") {
                return Err(ExtractError::InvalidConfig(
                    "scraper.api_url must contain a {target_url} placeholder".into(),
                ));
            }
        }

        Ok(())
    }
}

fn read_table(path: &Path) -> Result<toml::Table, ExtractError> {
    let content = std::fs::read_to_string(path).map_err(|e| ExtractError::ConfigRead {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    content
        .parse::<toml::Table>()
        .map_err(|e| ExtractError::ConfigRead {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

/// Recursively merge `overlay` into `base`; scalar values in `overlay` win.
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

/// Builder for [`Config`].
#[derive(Debug)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn bind(mut self, addr: impl Into<String>) -> Self {
        self.config.server.bind = addr.into();
        self
    }

    pub fn default_provider(mut self, id: ProviderId) -> Self {
        self.config.api.default_provider = id.to_string();
        self
    }

    pub fn provider(mut self, id: ProviderId, settings: ProviderSettings) -> Self {
        match id {
            ProviderId::Gemini => self.config.gemini = Some(settings),
            ProviderId::OpenAi => self.config.openai = Some(settings),
            ProviderId::Mistral => self.config.mistral = Some(settings),
        }
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api.api_timeout_secs = secs;
        self
    }

    pub fn scraper(mut self, settings: ScraperSettings) -> Self {
        self.config.scraper = Some(settings);
        self
    }

    pub fn prompt(mut self, id: impl Into<String>, template: PromptTemplate) -> Self {
        self.config.prompts.insert(id.into(), template);
        self
    }

    pub fn default_prompt(mut self, name: impl Into<String>) -> Self {
        self.config.ui.default_prompt = Some(name.into());
        self
    }

    pub fn processed_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.ui.processed_dir = dir.into();
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<Config, ExtractError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[api]
providers = ["gemini", "openai"]
default_provider = "openai"

[openai]
api_key = "sk-test"
model = "gpt-4o-mini"

[gemini]
api_key = "g-test"

[prompts.ocr]
name = "OCR to CSV"
provider = "gemini"
file_ext = "csv"
prompt = "Extract the tables"
"#;

    #[test]
    fn parses_sample_with_defaults() {
        let config = Config::from_toml_str(SAMPLE).expect("valid config");
        assert_eq!(config.server.bind, "0.0.0.0:8000");
        assert_eq!(config.api.api_timeout_secs, 120);
        assert_eq!(config.default_provider(), ProviderId::OpenAi);
        assert_eq!(
            config.enabled_providers(),
            vec![ProviderId::Gemini, ProviderId::OpenAi]
        );
        assert_eq!(config.prompts["ocr"].file_ext, "csv");
        assert!(config.scraper.is_none());
    }

    #[test]
    fn default_provider_must_be_configured() {
        let err = Config::from_toml_str("[api]\ndefault_provider = \"mistral\"\n").unwrap_err();
        assert!(matches!(err, ExtractError::InvalidConfig(_)), "got: {err}");
    }

    #[test]
    fn unknown_provider_rejected() {
        let toml = "[api]\nproviders = [\"claude\"]\n[gemini]\napi_key = \"k\"\n";
        let err = Config::from_toml_str(toml).unwrap_err();
        assert!(err.to_string().contains("claude"));
    }

    #[test]
    fn scraper_template_needs_placeholder() {
        let toml = "[gemini]\napi_key = \"k\"\n[scraper]\napi_key = \"s\"\napi_url = \"https://scrape.example\"\n";
        let err = Config::from_toml_str(toml).unwrap_err();
        assert!(err.to_string().contains("target_url"));
    }

    #[test]
    fn secrets_file_overrides_keys() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("config.toml");
        let secrets = dir.path().join("config.secrets.toml");
        std::fs::write(&base, "[gemini]\napi_key = \"placeholder\"\nmodel = \"gemini-2.0-flash\"\n").unwrap();
        std::fs::write(&secrets, "[gemini]\napi_key = \"real-key\"\n").unwrap();

        let config = Config::load_with_secrets(&base, Some(&secrets)).unwrap();
        let gemini = config.gemini.unwrap();
        assert_eq!(gemini.api_key, "real-key");
        assert_eq!(gemini.model.as_deref(), Some("gemini-2.0-flash"));
    }

    #[test]
    fn missing_secrets_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("config.toml");
        std::fs::write(&base, "[gemini]\napi_key = \"k\"\n").unwrap();
        let config = Config::load_with_secrets(&base, Some(dir.path().join("nope.toml"))).unwrap();
        assert_eq!(config.gemini.unwrap().api_key, "k");
    }

    #[test]
    fn builder_validates() {
        assert!(Config::builder().build().is_err());
        let config = Config::builder()
            .provider(ProviderId::Gemini, ProviderSettings::new("k"))
            .build()
            .unwrap();
        assert_eq!(config.default_provider(), ProviderId::Gemini);
    }

    #[test]
    fn debug_redacts_api_keys() {
        let settings = ProviderSettings::new("sk-secret");
        let dbg = format!("{settings:?}");
        assert!(!dbg.contains("sk-secret"));
    }

    #[test]
    fn example_config_is_valid() {
        let config = Config::from_toml_str(include_str!("../config.example.toml")).unwrap();
        assert_eq!(config.enabled_providers().len(), 3);
        assert_eq!(config.prompts.len(), 3);
        assert_eq!(config.scraper.unwrap().freshness_days, 7);
    }
}
