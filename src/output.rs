//! The result of one extraction: sanitised text plus download metadata.

use crate::pipeline::tables::fix_tables;
use serde::Serialize;

/// Sanitised provider output, ready to serve or save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SanitizedOutput {
    /// Sanitised text body.
    pub text: String,
    /// Requested output extension (`csv`, `md`, `txt`, …), without the dot.
    pub file_ext: String,
    /// Suggested file name: source stem (or cache key) plus extension.
    pub download_name: String,
    /// Provider that produced the text; `None` when no call was made.
    pub provider: Option<String>,
}

impl SanitizedOutput {
    pub fn new(text: String, stem: &str, file_ext: &str, provider: Option<String>) -> Self {
        let file_ext = normalize_ext(file_ext);
        Self {
            download_name: format!("{stem}.{file_ext}"),
            text,
            file_ext,
            provider,
        }
    }

    /// MIME type for the download, by extension.
    pub fn content_type(&self) -> &'static str {
        match self.file_ext.as_str() {
            "csv" => "text/csv",
            "md" => "text/markdown",
            _ => "text/plain",
        }
    }

    /// Text for display; markdown tables get their separator rows repaired.
    pub fn preview(&self) -> String {
        if self.file_ext == "md" {
            fix_tables(&self.text)
        } else {
            self.text.clone()
        }
    }
}

/// Lower-case, strip a leading dot, default to `txt`.
pub fn normalize_ext(ext: &str) -> String {
    let ext = ext.trim().trim_start_matches('.').to_ascii_lowercase();
    if ext.is_empty() {
        "txt".to_string()
    } else {
        ext
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_types() {
        let csv = SanitizedOutput::new("a,b".into(), "report", "csv", None);
        assert_eq!(csv.content_type(), "text/csv");
        assert_eq!(csv.download_name, "report.csv");

        let md = SanitizedOutput::new("# x".into(), "report", ".MD", None);
        assert_eq!(md.content_type(), "text/markdown");
        assert_eq!(md.download_name, "report.md");

        let json = SanitizedOutput::new("{}".into(), "report", "json", None);
        assert_eq!(json.content_type(), "text/plain");
    }

    #[test]
    fn empty_ext_defaults_to_txt() {
        let out = SanitizedOutput::new("x".into(), "notes", "  ", None);
        assert_eq!(out.download_name, "notes.txt");
        assert_eq!(out.content_type(), "text/plain");
    }

    #[test]
    fn preview_repairs_markdown_tables_only() {
        let table = "| a | b |\n| 1 | 2 |".to_string();
        let md = SanitizedOutput::new(table.clone(), "t", "md", None);
        assert!(md.preview().contains("|---|---|"));

        let txt = SanitizedOutput::new(table.clone(), "t", "txt", None);
        assert_eq!(txt.preview(), table);
    }
}
