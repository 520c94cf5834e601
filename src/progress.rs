//! Progress-callback trait for per-request extraction events.
//!
//! Inject an [`Arc<dyn ExtractionProgressCallback>`] via
//! [`crate::extract::Extractor::with_progress`] to receive stage events as a
//! document moves through the pipeline. The CLI uses it to drive a spinner;
//! a server could forward the events to a job table or a WebSocket.
//!
//! # Example
//!
//! ```rust
//! use edgequake_extract::ExtractionProgressCallback;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! struct CountingCallback {
//!     calls: AtomicUsize,
//! }
//!
//! impl ExtractionProgressCallback for CountingCallback {
//!     fn on_provider_call(&self, provider: &str, request_kind: &str) {
//!         self.calls.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("calling {provider} with a {request_kind} request");
//!     }
//! }
//! ```

use std::sync::Arc;

/// Called by the extraction pipeline at each stage of one request.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Requests may run concurrently on a shared
/// extractor, so implementations must be `Send + Sync`.
pub trait ExtractionProgressCallback: Send + Sync {
    /// The source has been classified.
    ///
    /// # Arguments
    /// * `name`: file name or URL of the source
    /// * `category`: content category (`pdf`, `image`, …)
    /// * `bytes`: size of the raw content
    fn on_classified(&self, name: &str, category: &str, bytes: usize) {
        let _ = (name, category, bytes);
    }

    /// The PDF had no usable text layer; OCR is about to run.
    fn on_ocr_fallback(&self, name: &str) {
        let _ = name;
    }

    /// A provider request is about to be sent.
    ///
    /// # Arguments
    /// * `provider`: provider id (`gemini`, `openai`, `mistral`)
    /// * `request_kind`: `text`, `inline-image` or `document`
    fn on_provider_call(&self, provider: &str, request_kind: &str) {
        let _ = (provider, request_kind);
    }

    /// The request finished with `output_len` bytes of sanitised output.
    fn on_complete(&self, output_len: usize) {
        let _ = output_len;
    }
}

/// A no-op implementation; the default when no callback is configured.
pub struct NoopProgressCallback;

impl ExtractionProgressCallback for NoopProgressCallback {}

/// Convenience alias for the stored callback type.
pub type ProgressCallback = Arc<dyn ExtractionProgressCallback>;
