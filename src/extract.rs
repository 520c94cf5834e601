//! Extraction entry points: one document or one URL in, sanitised text out.
//!
//! An [`Extractor`] is built once from an immutable [`Config`] and shared
//! (behind an `Arc`) by every request. It owns the provider registry, the
//! OCR fallback and the scraper; nothing in it is mutated after
//! construction, so concurrent requests never coordinate.

use crate::config::Config;
use crate::error::ExtractError;
use crate::output::SanitizedOutput;
use crate::pipeline::dispatch::{Dispatched, Dispatcher};
use crate::pipeline::sanitize::sanitize;
use crate::progress::{NoopProgressCallback, ProgressCallback};
use crate::prompts::{PromptCatalog, PromptSpec};
use crate::providers::{self, MistralProvider, OcrProvider, ProviderRegistry};
use crate::scrape::{safe_key, Scraper};
use crate::source::SourceContent;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Per-request parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractRequest {
    /// Prompt sent to the provider. Must not be empty.
    pub prompt_text: String,
    /// Output extension; empty means `txt`.
    pub file_ext: String,
    /// Provider name; `None`, empty or `Default` selects the default.
    pub provider: Option<String>,
}

impl ExtractRequest {
    pub fn new(prompt_text: impl Into<String>) -> Self {
        Self {
            prompt_text: prompt_text.into(),
            ..Self::default()
        }
    }

    pub fn with_file_ext(mut self, ext: impl Into<String>) -> Self {
        self.file_ext = ext.into();
        self
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Fill every field left empty from a prompt template.
    pub fn or_template(mut self, spec: &PromptSpec) -> Self {
        if self.prompt_text.trim().is_empty() {
            self.prompt_text = spec.prompt.clone();
        }
        if self.file_ext.trim().is_empty() {
            self.file_ext = spec.file_ext.clone();
        }
        let unset = self
            .provider
            .as_deref()
            .map(|p| p.trim().is_empty() || p.eq_ignore_ascii_case("default"))
            .unwrap_or(true);
        if unset {
            self.provider = Some(spec.provider.clone());
        }
        self
    }

    fn validate(&self) -> Result<(), ExtractError> {
        if self.prompt_text.trim().is_empty() {
            return Err(ExtractError::InvalidInput(
                "prompt_text must not be empty".into(),
            ));
        }
        Ok(())
    }
}

pub struct Extractor {
    config: Config,
    dispatcher: Dispatcher,
    scraper: Option<Scraper>,
    prompts: PromptCatalog,
    progress: ProgressCallback,
}

impl Extractor {
    /// Build every configured provider, the OCR fallback and the scraper.
    pub fn new(config: Config) -> Result<Self, ExtractError> {
        let registry = ProviderRegistry::from_config(&config)?;
        let client = providers::http_client(config.api.api_timeout_secs)?;

        let ocr = config.mistral.as_ref().map(|settings| {
            Arc::new(MistralProvider::new(client.clone(), settings)) as Arc<dyn OcrProvider>
        });
        let scraper = config
            .scraper
            .clone()
            .map(|settings| Scraper::new(client, settings));

        info!(
            "Extractor ready: default provider {}, OCR {}, scraper {}",
            registry.default_id(),
            if ocr.is_some() { "on" } else { "off" },
            if scraper.is_some() { "on" } else { "off" },
        );
        Ok(Self::from_parts(config, registry, ocr, scraper))
    }

    /// Assemble an extractor from pre-built parts (tests, embedding).
    pub fn from_parts(
        config: Config,
        registry: ProviderRegistry,
        ocr: Option<Arc<dyn OcrProvider>>,
        scraper: Option<Scraper>,
    ) -> Self {
        Self {
            prompts: PromptCatalog::from_config(&config),
            dispatcher: Dispatcher::new(registry, ocr),
            scraper,
            config,
            progress: Arc::new(NoopProgressCallback),
        }
    }

    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.dispatcher = self.dispatcher.with_progress(progress.clone());
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn prompts(&self) -> &PromptCatalog {
        &self.prompts
    }

    /// Complete a request from a named template, or from the default
    /// template when neither a template nor a prompt was given.
    ///
    /// An unknown template name is a client error.
    pub fn resolve_request(
        &self,
        request: ExtractRequest,
        template: Option<&str>,
    ) -> Result<ExtractRequest, ExtractError> {
        match template.map(str::trim).filter(|t| !t.is_empty()) {
            Some(name) => {
                let spec = self.prompts.lookup(name).ok_or_else(|| {
                    ExtractError::InvalidInput(format!("unknown prompt template '{name}'"))
                })?;
                Ok(request.or_template(spec))
            }
            None if request.prompt_text.trim().is_empty() => {
                Ok(match self.prompts.default_prompt() {
                    Some(spec) => request.or_template(spec),
                    None => request,
                })
            }
            None => Ok(request),
        }
    }

    /// Extract from an uploaded document.
    pub async fn process_document(
        &self,
        source: &SourceContent,
        request: &ExtractRequest,
    ) -> Result<SanitizedOutput, ExtractError> {
        request.validate()?;
        if source.name.trim().is_empty() {
            return Err(ExtractError::InvalidInput("file name must not be empty".into()));
        }

        let start = Instant::now();
        info!("Processing document '{}'", source.name);
        let dispatched = self
            .dispatcher
            .dispatch(source, &request.prompt_text, request.provider.as_deref())
            .await?;

        let output = self.finish(dispatched, source.stem(), &request.file_ext);
        info!(
            "Processed '{}' → {} ({} chars) in {}ms",
            source.name,
            output.download_name,
            output.text.len(),
            start.elapsed().as_millis()
        );
        Ok(output)
    }

    /// Scrape `url` and extract from its text.
    ///
    /// A scrape failure aborts before any provider is called.
    pub async fn process_url(
        &self,
        url: &str,
        request: &ExtractRequest,
    ) -> Result<SanitizedOutput, ExtractError> {
        request.validate()?;
        if url.trim().is_empty() {
            return Err(ExtractError::MissingField("url"));
        }
        let scraper = self
            .scraper
            .as_ref()
            .ok_or_else(|| ExtractError::ProviderNotConfigured {
                provider: "scraper".into(),
                hint: "Add a [scraper] section with api_key and api_url.".into(),
            })?;

        let start = Instant::now();
        let page = scraper.fetch(url).await?;
        self.progress
            .on_classified(&page.key, "text", page.text.len());

        let dispatched = self
            .dispatcher
            .dispatch_text(&page.text, &request.prompt_text, request.provider.as_deref())
            .await?;

        let output = self.finish(dispatched, &safe_key(&page.key), &request.file_ext);
        info!(
            "Processed {} (cache {}) → {} in {}ms",
            page.key,
            if page.from_cache { "hit" } else { "miss" },
            output.download_name,
            start.elapsed().as_millis()
        );
        Ok(output)
    }

    /// Write `output` to `ui.processed_dir` and return the path.
    pub async fn save(&self, output: &SanitizedOutput) -> Result<PathBuf, ExtractError> {
        let dir = &self.config.ui.processed_dir;
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| ExtractError::Io {
                path: dir.clone(),
                source: e,
            })?;
        let path = dir.join(&output.download_name);
        tokio::fs::write(&path, &output.text)
            .await
            .map_err(|e| ExtractError::Io {
                path: path.clone(),
                source: e,
            })?;
        Ok(path)
    }

    fn finish(&self, dispatched: Dispatched, stem: &str, file_ext: &str) -> SanitizedOutput {
        let text = sanitize(&dispatched.text);
        self.progress.on_complete(text.len());
        SanitizedOutput::new(
            text,
            stem,
            file_ext,
            dispatched.provider.map(|p| p.to_string()),
        )
    }
}
