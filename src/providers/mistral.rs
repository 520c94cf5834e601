//! Mistral chat completions and the Mistral OCR endpoint.
//!
//! Documents are not inlined: they are uploaded to the Files API with
//! purpose `batch`, a short-lived signed URL is requested, and that URL is
//! passed as a `document_url` part. The OCR fallback uses the same upload
//! dance with purpose `ocr` and returns the markdown of every page.

use super::{check_status, OcrProvider, Provider, ProviderId, ProviderRequest};
use crate::config::ProviderSettings;
use crate::error::ExtractError;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

const DEFAULT_BASE_URL: &str = "https://api.mistral.ai";
const DEFAULT_MODEL: &str = "mistral-small-latest";
const DEFAULT_OCR_MODEL: &str = "mistral-ocr-latest";

pub struct MistralProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    ocr_model: String,
    base_url: String,
}

#[derive(Deserialize)]
struct UploadedFile {
    id: String,
}

#[derive(Deserialize)]
struct SignedUrl {
    url: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct OcrResponse {
    #[serde(default)]
    pages: Vec<OcrPage>,
}

#[derive(Deserialize)]
struct OcrPage {
    #[serde(default)]
    markdown: String,
}

impl MistralProvider {
    pub fn new(client: reqwest::Client, settings: &ProviderSettings) -> Self {
        Self {
            client,
            api_key: settings.api_key.clone(),
            model: settings.model.clone().unwrap_or_else(|| DEFAULT_MODEL.into()),
            ocr_model: settings
                .ocr_model
                .clone()
                .unwrap_or_else(|| DEFAULT_OCR_MODEL.into()),
            base_url: settings
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.into())
                .trim_end_matches('/')
                .to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Upload a file and return a signed URL the model can read it from.
    async fn upload_signed(
        &self,
        bytes: &[u8],
        file_name: &str,
        purpose: &str,
    ) -> Result<String, ExtractError> {
        let part = reqwest::multipart::Part::bytes(bytes.to_vec()).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new()
            .text("purpose", purpose.to_string())
            .part("file", part);

        let response = self
            .client
            .post(self.url("/v1/files"))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ExtractError::provider("mistral", e.without_url()))?;
        let uploaded: UploadedFile = check_status(ProviderId::Mistral, response)
            .await?
            .json()
            .await
            .map_err(|e| {
                ExtractError::provider(
                    "mistral",
                    format!("malformed upload response: {}", e.without_url()),
                )
            })?;
        debug!("Mistral upload {} → file {}", file_name, uploaded.id);

        let response = self
            .client
            .get(self.url(&format!("/v1/files/{}/url", uploaded.id)))
            .query(&[("expiry", "1")])
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| ExtractError::provider("mistral", e.without_url()))?;
        let signed: SignedUrl = check_status(ProviderId::Mistral, response)
            .await?
            .json()
            .await
            .map_err(|e| {
                ExtractError::provider(
                    "mistral",
                    format!("malformed signed-url response: {}", e.without_url()),
                )
            })?;

        Ok(signed.url)
    }

    async fn build_message(&self, request: &ProviderRequest) -> Result<Value, ExtractError> {
        Ok(match request {
            ProviderRequest::Text { prompt } => json!({ "role": "user", "content": prompt }),
            ProviderRequest::InlineImage {
                prompt,
                mime_type,
                data_base64,
            } => json!({
                "role": "user",
                "content": [
                    { "type": "text", "text": prompt },
                    { "type": "image_url", "image_url": format!("data:{mime_type};base64,{data_base64}") }
                ]
            }),
            ProviderRequest::Document {
                prompt,
                file_name,
                bytes,
                ..
            } => {
                let url = self.upload_signed(bytes, file_name, "batch").await?;
                json!({
                    "role": "user",
                    "content": [
                        { "type": "text", "text": prompt },
                        { "type": "document_url", "document_url": url }
                    ]
                })
            }
        })
    }
}

#[async_trait]
impl Provider for MistralProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Mistral
    }

    fn supports_native_pdf(&self) -> bool {
        true
    }

    async fn complete(&self, request: &ProviderRequest) -> Result<String, ExtractError> {
        debug!("Mistral {} request: {:?}", self.model, request);

        let body = json!({
            "model": self.model,
            "messages": [self.build_message(request).await?],
        });

        let response = self
            .client
            .post(self.url("/v1/chat/completions"))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ExtractError::provider("mistral", e.without_url()))?;

        let parsed: ChatResponse = check_status(ProviderId::Mistral, response)
            .await?
            .json()
            .await
            .map_err(|e| {
                ExtractError::provider(
                    "mistral",
                    format!("malformed response: {}", e.without_url()),
                )
            })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ExtractError::provider("mistral", "response has no choices"))
    }
}

#[async_trait]
impl OcrProvider for MistralProvider {
    async fn ocr(&self, bytes: &[u8], file_name: &str) -> Result<String, ExtractError> {
        info!("Running Mistral OCR on {} ({} bytes)", file_name, bytes.len());
        let url = self.upload_signed(bytes, file_name, "ocr").await?;

        let body = json!({
            "model": self.ocr_model,
            "document": { "type": "document_url", "document_url": url },
        });

        let response = self
            .client
            .post(self.url("/v1/ocr"))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ExtractError::provider("mistral-ocr", e.without_url()))?;

        let parsed: OcrResponse = check_status(ProviderId::Mistral, response)
            .await?
            .json()
            .await
            .map_err(|e| {
                ExtractError::provider(
                    "mistral-ocr",
                    format!("malformed response: {}", e.without_url()),
                )
            })?;

        Ok(parsed
            .pages
            .into_iter()
            .map(|p| p.markdown)
            .collect::<Vec<_>>()
            .join("\n\n"))
    }
}
