//! Pipeline stages for document extraction.
//!
//! Each submodule implements exactly one transformation step, so each can
//! be tested on its own.
//!
//! ## Data Flow
//!
//! ```text
//! classify ──▶ normalize ──▶ dispatch ──▶ sanitize ──▶ (tables, preview only)
//! (by name)   (text/OCR)    (provider)   (fences, ^^)
//! ```
//!
//! 1. [`classify`]: map a file name to a [`classify::ContentCategory`]
//! 2. [`normalize`]: extract PDF pages or workbook sheets; runs in
//!    `spawn_blocking` because both parsers are CPU-bound
//! 3. [`encode`]: base64-wrap images for inline submission
//! 4. [`dispatch`]: choose the single request shape and call the provider;
//!    the only stage with network I/O
//! 5. [`sanitize`]: strip code fences and swap the `^^` delimiter
//! 6. [`tables`]: repair markdown tables for previews

pub mod classify;
pub mod dispatch;
pub mod encode;
pub mod normalize;
pub mod sanitize;
pub mod tables;
