//! Error types for the edgequake-extract library.
//!
//! A single error type, [`ExtractError`], covers every fatal failure of a
//! request. Variants fall into three groups that map onto the HTTP surface:
//!
//! * **Input errors**: missing file, URL or prompt. Reported as `400` and
//!   never retried; the caller has to fix the request.
//! * **Upstream errors**: a provider, the OCR endpoint or the scraping API
//!   failed. Reported as `500` with the upstream message preserved.
//! * **Startup errors**: the configuration could not be read or validated.
//!
//! "No text found" is not an error: an empty PDF or workbook
//! produces the [`crate::pipeline::normalize::NOT_FOUND_TEXT`] literal so the
//! caller still gets a downloadable artefact.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-extract library.
#[derive(Debug, Error)]
pub enum ExtractError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The request itself is malformed (empty prompt, empty file name, …).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A required request field was not supplied.
    #[error("Missing required field '{0}'")]
    MissingField(&'static str),

    /// Input file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    // ── Upstream errors ───────────────────────────────────────────────────
    /// The selected provider has no API key or model configured.
    #[error("Provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// Transport failure, API error or malformed response from a provider.
    #[error("Provider '{provider}' failed: {message}")]
    Provider { provider: String, message: String },

    /// The scraping API answered with a non-200 status.
    #[error("Failed to scrape '{url}': HTTP {status}")]
    ScrapeFailed { url: String, status: u16 },

    /// The scraping API could not be reached at all.
    #[error("Failed to scrape '{url}': {reason}")]
    ScrapeTransport { url: String, reason: String },

    /// The workbook could not be opened or a sheet could not be read.
    #[error("Spreadsheet could not be read: {0}")]
    Spreadsheet(String),

    // ── Config errors ─────────────────────────────────────────────────────
    /// The configuration file could not be read or parsed.
    #[error("Failed to read config '{path}': {reason}")]
    ConfigRead { path: PathBuf, reason: String },

    /// Validation of the loaded configuration failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Reading or writing a local file (cache, output) failed.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ExtractError {
    /// Build a [`ExtractError::Provider`] from anything displayable.
    pub fn provider(provider: impl Into<String>, message: impl std::fmt::Display) -> Self {
        ExtractError::Provider {
            provider: provider.into(),
            message: message.to_string(),
        }
    }

    /// `true` when the error was caused by the request rather than by an
    /// upstream service. Drives the 400 / 500 split of the HTTP surface.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            ExtractError::InvalidInput(_)
                | ExtractError::MissingField(_)
                | ExtractError::FileNotFound { .. }
                | ExtractError::PermissionDenied { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_preserves_message() {
        let e = ExtractError::provider("openai", "401 invalid api key");
        let msg = e.to_string();
        assert!(msg.contains("openai"), "got: {msg}");
        assert!(msg.contains("401 invalid api key"), "got: {msg}");
    }

    #[test]
    fn scrape_failed_display() {
        let e = ExtractError::ScrapeFailed {
            url: "https://example.org".into(),
            status: 403,
        };
        assert!(e.to_string().contains("HTTP 403"));
    }

    #[test]
    fn missing_field_is_client_error() {
        assert!(ExtractError::MissingField("file").is_client_error());
        assert!(ExtractError::InvalidInput("empty prompt".into()).is_client_error());
    }

    #[test]
    fn upstream_errors_are_not_client_errors() {
        assert!(!ExtractError::provider("gemini", "timeout").is_client_error());
        assert!(!ExtractError::ScrapeFailed {
            url: "x".into(),
            status: 500
        }
        .is_client_error());
        assert!(!ExtractError::Internal("boom".into()).is_client_error());
    }
}
