//! OpenAI chat completions.
//!
//! OpenAI has no native PDF ingestion on this endpoint, so PDFs always reach
//! it as extracted (or OCR'd) text.

use super::{check_status, Provider, ProviderId, ProviderRequest};
use crate::config::ProviderSettings;
use crate::error::ExtractError;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_TEMPERATURE: f32 = 0.1;

pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    temperature: f32,
}

impl OpenAiProvider {
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
            temperature: settings
                .temperature
                .unwrap_or(DEFAULT_TEMPERATURE)
                .clamp(0.0, 2.0),
        }
    }
}

/// Build the user message for one request.
fn build_message(request: &ProviderRequest) -> Value {
    match request {
        ProviderRequest::Text { prompt } => json!({ "role": "user", "content": prompt }),
        ProviderRequest::InlineImage {
            prompt,
            mime_type,
            data_base64,
        } => json!({
            "role": "user",
            "content": [
                { "type": "text", "text": prompt },
                {
                    "type": "image_url",
                    "image_url": { "url": format!("data:{mime_type};base64,{data_base64}") }
                }
            ]
        }),
        // The dispatcher never builds this for OpenAI; degrade to the prompt.
        ProviderRequest::Document { prompt, .. } => {
            warn!("OpenAI does not ingest documents natively; sending prompt only");
            json!({ "role": "user", "content": prompt })
        }
    }
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

#[async_trait]
impl Provider for OpenAiProvider {
    fn id(&self) -> ProviderId {
        ProviderId::OpenAi
    }

    fn supports_native_pdf(&self) -> bool {
        false
    }

    async fn complete(&self, request: &ProviderRequest) -> Result<String, ExtractError> {
        debug!("OpenAI {} request: {:?}", self.model, request);

        let body = json!({
            "model": self.model,
            "messages": [build_message(request)],
            "temperature": self.temperature,
        });

        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ExtractError::provider("openai", e.without_url()))?;

        let response = check_status(ProviderId::OpenAi, response).await?;
        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| {
                ExtractError::provider(
                    "openai",
                    format!("malformed response: {}", e.without_url()),
                )
            })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ExtractError::provider("openai", "response has no choices"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_message_uses_data_uri() {
        let msg = build_message(&ProviderRequest::InlineImage {
            prompt: "read this".into(),
            mime_type: "image/jpeg".into(),
            data_base64: "AAAA".into(),
        });
        assert_eq!(msg["content"][0]["text"], "read this");
        assert_eq!(
            msg["content"][1]["image_url"]["url"],
            "data:image/jpeg;base64,AAAA"
        );
    }

    #[test]
    fn text_message_is_plain_string() {
        let msg = build_message(&ProviderRequest::Text {
            prompt: "hello".into(),
        });
        assert_eq!(msg["content"], "hello");
    }

    #[test]
    fn temperature_is_clamped() {
        let mut settings = ProviderSettings::new("k");
        settings.temperature = Some(7.0);
        let p = OpenAiProvider::new(reqwest::Client::new(), &settings);
        assert_eq!(p.temperature, 2.0);
        assert!(!p.supports_native_pdf());
    }
}
