//! Google Gemini via the `generateContent` REST endpoint.
//!
//! Gemini accepts images *and* PDFs as `inline_data` parts, so a PDF never
//! goes through local text extraction when Gemini is the target.

use super::{check_status, Provider, ProviderId, ProviderRequest};
use crate::config::ProviderSettings;
use crate::error::ExtractError;
use crate::pipeline::encode;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_MODEL: &str = "gemini-2.0-flash";

pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiProvider {
    pub fn new(client: reqwest::Client, settings: &ProviderSettings) -> Self {
        Self {
            client,
            api_key: settings.api_key.clone(),
            model: settings.model.clone().unwrap_or_else(|| DEFAULT_MODEL.into()),
            base_url: settings
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.into())
                .trim_end_matches('/')
                .to_string(),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }
}

/// Build the `contents` body for one request.
fn build_body(request: &ProviderRequest) -> Value {
    let parts = match request {
        ProviderRequest::Text { prompt } => vec![json!({ "text": prompt })],
        ProviderRequest::InlineImage {
            prompt,
            mime_type,
            data_base64,
        } => vec![
            json!({ "text": prompt }),
            json!({ "inline_data": { "mime_type": mime_type, "data": data_base64 } }),
        ],
        ProviderRequest::Document {
            prompt,
            mime_type,
            bytes,
            ..
        } => vec![
            json!({ "text": prompt }),
            json!({ "inline_data": { "mime_type": mime_type, "data": encode::to_base64(bytes) } }),
        ],
    };
    json!({ "contents": [{ "role": "user", "parts": parts }] })
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    text: Option<String>,
}

#[async_trait]
impl Provider for GeminiProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Gemini
    }

    fn supports_native_pdf(&self) -> bool {
        true
    }

    async fn complete(&self, request: &ProviderRequest) -> Result<String, ExtractError> {
        debug!("Gemini {} request: {:?}", self.model, request);

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&build_body(request))
            .send()
            .await
            .map_err(|e| ExtractError::provider("gemini", e.without_url()))?;

        let response = check_status(ProviderId::Gemini, response).await?;
        let parsed: GenerateResponse = response
            .json()
            .await
            .map_err(|e| {
                ExtractError::provider(
                    "gemini",
                    format!("malformed response: {}", e.without_url()),
                )
            })?;

        let candidate = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .ok_or_else(|| ExtractError::provider("gemini", "response has no candidates"))?;

        Ok(candidate
            .parts
            .into_iter()
            .filter_map(|p| p.text)
            .collect::<Vec<_>>()
            .join(""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_body_has_single_part() {
        let body = build_body(&ProviderRequest::Text {
            prompt: "hello".into(),
        });
        let parts = &body["contents"][0]["parts"];
        assert_eq!(parts.as_array().unwrap().len(), 1);
        assert_eq!(parts[0]["text"], "hello");
    }

    #[test]
    fn document_body_inlines_base64_pdf() {
        let body = build_body(&ProviderRequest::Document {
            prompt: "p".into(),
            mime_type: "application/pdf".into(),
            file_name: "a.pdf".into(),
            bytes: b"%PDF".to_vec(),
        });
        let inline = &body["contents"][0]["parts"][1]["inline_data"];
        assert_eq!(inline["mime_type"], "application/pdf");
        assert_eq!(inline["data"], "JVBERg==");
    }

    #[test]
    fn defaults_apply() {
        let p = GeminiProvider::new(reqwest::Client::new(), &ProviderSettings::new("k"));
        assert_eq!(
            p.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }
}
