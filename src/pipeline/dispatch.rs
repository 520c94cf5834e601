//! Provider dispatch: pick exactly one request shape per document.
//!
//! ```text
//!            ┌─ Image ───────────────────────────▶ InlineImage
//! classify ──┼─ Pdf + native-PDF provider ───────▶ Document
//!            └─ everything else ─▶ normalize ─┬─ Text ─────▶ Text
//!                                             ├─ NeedsOcr ─▶ OCR ─▶ Text
//!                                             └─ Empty ────▶ NOT_FOUND_TEXT
//! ```
//!
//! OCR runs at most once per document; its output always takes the text
//! path and never re-enters OCR.

use super::classify::{self, ContentCategory};
use super::encode;
use super::normalize::{self, NormalizedPayload, NOT_FOUND_TEXT};
use crate::error::ExtractError;
use crate::progress::{NoopProgressCallback, ProgressCallback};
use crate::providers::{OcrProvider, Provider, ProviderId, ProviderRegistry, ProviderRequest};
use crate::source::SourceContent;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Raw model output and the provider that produced it.
///
/// `provider` is `None` when nothing was extracted and no call was made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatched {
    pub text: String,
    pub provider: Option<ProviderId>,
}

impl Dispatched {
    fn not_found() -> Self {
        Self {
            text: NOT_FOUND_TEXT.to_string(),
            provider: None,
        }
    }
}

/// Routes a document to one provider in one of three shapes.
pub struct Dispatcher {
    registry: ProviderRegistry,
    ocr: Option<Arc<dyn OcrProvider>>,
    progress: ProgressCallback,
}

impl Dispatcher {
    pub fn new(registry: ProviderRegistry, ocr: Option<Arc<dyn OcrProvider>>) -> Self {
        Self {
            registry,
            ocr,
            progress: Arc::new(NoopProgressCallback),
        }
    }

    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = progress;
        self
    }

    /// Send `source` to the provider named `provider` (or the default) and
    /// return the raw model output.
    ///
    /// Yields [`NOT_FOUND_TEXT`] without any provider call when nothing
    /// could be extracted.
    pub async fn dispatch(
        &self,
        source: &SourceContent,
        prompt: &str,
        provider: Option<&str>,
    ) -> Result<Dispatched, ExtractError> {
        let category = classify::classify(&source.name);
        info!(
            "Classified '{}' as {} ({} bytes)",
            source.name,
            category,
            source.bytes.len()
        );
        self.progress
            .on_classified(&source.name, &category.to_string(), source.bytes.len());

        let provider = self.registry.resolve(provider)?;

        let request = match category {
            ContentCategory::Image => {
                let subtype = classify::image_subtype(&source.name);
                encode::inline_image(prompt, &subtype, &source.bytes)
            }
            ContentCategory::Pdf if provider.supports_native_pdf() => {
                debug!("{} reads PDFs natively, skipping extraction", provider.id());
                ProviderRequest::Document {
                    prompt: prompt.to_string(),
                    mime_type: "application/pdf".to_string(),
                    file_name: source.name.clone(),
                    bytes: source.bytes.clone(),
                }
            }
            _ => match self.extract_text(source, category).await? {
                Some(text) => text_request(prompt, &text),
                None => {
                    info!("No text found in '{}'", source.name);
                    return Ok(Dispatched::not_found());
                }
            },
        };

        self.send(provider.as_ref(), &request).await
    }

    /// Send already-extracted text (e.g. a scraped page) through the text path.
    pub async fn dispatch_text(
        &self,
        text: &str,
        prompt: &str,
        provider: Option<&str>,
    ) -> Result<Dispatched, ExtractError> {
        let provider = self.registry.resolve(provider)?;
        self.send(provider.as_ref(), &text_request(prompt, text)).await
    }

    async fn send(
        &self,
        provider: &dyn Provider,
        request: &ProviderRequest,
    ) -> Result<Dispatched, ExtractError> {
        info!("Sending {} request to {}", request.kind(), provider.id());
        debug!("Prompt is {} chars", request.prompt().len());
        self.progress
            .on_provider_call(provider.id().as_str(), request.kind());
        let raw = provider.complete(request).await?;
        debug!("{} returned {} chars", provider.id(), raw.len());
        Ok(Dispatched {
            text: raw,
            provider: Some(provider.id()),
        })
    }

    /// Normalise and, if needed, OCR the document. `None` means nothing usable.
    async fn extract_text(
        &self,
        source: &SourceContent,
        category: ContentCategory,
    ) -> Result<Option<String>, ExtractError> {
        match normalize_blocking(source.bytes.clone(), category).await? {
            NormalizedPayload::Text(text) => Ok(Some(text)),
            NormalizedPayload::Empty => Ok(None),
            NormalizedPayload::NeedsOcr => {
                warn!("'{}' has no text layer, running OCR", source.name);
                self.progress.on_ocr_fallback(&source.name);
                let text = self.run_ocr(source).await?;
                if text.trim().is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(text))
                }
            }
            NormalizedPayload::Image => Err(ExtractError::Internal(format!(
                "'{}' normalised to an image outside the image path",
                source.name
            ))),
        }
    }

    async fn run_ocr(&self, source: &SourceContent) -> Result<String, ExtractError> {
        let ocr = self
            .ocr
            .as_ref()
            .ok_or_else(|| ExtractError::ProviderNotConfigured {
                provider: "mistral".into(),
                hint: "Scanned PDFs need OCR; add a [mistral] section with an api_key.".into(),
            })?;
        let text = ocr.ocr(&source.bytes, &source.name).await?;
        info!("OCR returned {} chars for '{}'", text.len(), source.name);
        Ok(text)
    }
}

/// Prompt with the document text appended.
pub fn text_request(prompt: &str, text: &str) -> ProviderRequest {
    ProviderRequest::Text {
        prompt: format!("{prompt}\n\nDocument content:\n{text}"),
    }
}

/// PDF and workbook parsing is CPU-bound; keep it off the async workers.
async fn normalize_blocking(
    bytes: Vec<u8>,
    category: ContentCategory,
) -> Result<NormalizedPayload, ExtractError> {
    tokio::task::spawn_blocking(move || normalize::normalize(&bytes, category))
        .await
        .map_err(|e| ExtractError::Internal(format!("normalize task failed: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_request_layout() {
        match text_request("Extract totals", "a,b") {
            ProviderRequest::Text { prompt } => {
                assert_eq!(prompt, "Extract totals\n\nDocument content:\na,b");
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
