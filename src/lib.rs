//! # edgequake-extract
//!
//! Turn PDFs, spreadsheets, images and web pages into CSV, Markdown or plain
//! text by routing them through an LLM provider (Gemini, OpenAI or Mistral).
//!
//! ## Pipeline Overview
//!
//! ```text
//! upload / URL
//!  │
//!  ├─ 1. Classify   file name → text / pdf / spreadsheet / image / unknown
//!  ├─ 2. Normalize  PDF pages or workbook sheets → text (spawn_blocking)
//!  │                scanned PDF → Mistral OCR (once)
//!  ├─ 3. Dispatch   exactly one request shape: text, inline image or raw PDF
//!  ├─ 4. Sanitize   strip code fences, swap the ^^ delimiter for commas
//!  └─ 5. Output     text + content type + download name
//! ```
//!
//! Web pages take the same route from step 3 on; their text comes from a
//! scraping API through a file cache ([`scrape`]).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_extract::{Config, ExtractRequest, Extractor, SourceContent};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("config.toml")?;
//!     let extractor = Extractor::new(config)?;
//!
//!     let source = SourceContent::from_path("invoice.pdf").await?;
//!     let request = ExtractRequest::new("Extract the line items").with_file_ext("csv");
//!     let output = extractor.process_document(&source, &request).await?;
//!
//!     println!("{}", output.text);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `extract` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! edgequake-extract = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod extract;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod providers;
pub mod scrape;
pub mod server;
pub mod source;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{Config, ConfigBuilder, PromptTemplate, ProviderSettings, ScraperSettings};
pub use error::ExtractError;
pub use extract::{ExtractRequest, Extractor};
pub use output::SanitizedOutput;
pub use pipeline::classify::ContentCategory;
pub use pipeline::normalize::{NormalizedPayload, NOT_FOUND_TEXT};
pub use progress::{ExtractionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use prompts::{PromptCatalog, PromptSpec, DEFAULT_CSV_PROMPT};
pub use providers::{OcrProvider, Provider, ProviderId, ProviderRegistry, ProviderRequest};
pub use source::SourceContent;
