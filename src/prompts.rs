//! Prompt templates: named prompt/provider/extension presets.
//!
//! Templates come from the `[prompts.<id>]` tables of the configuration. A
//! front end lists them by display name; requests may refer to one by id or
//! by name to fill in whatever fields they did not supply themselves.
//!
//! When the configuration defines no templates at all, the catalog falls
//! back to a single built-in `ocr` template using [`DEFAULT_CSV_PROMPT`].

use crate::config::Config;
use std::collections::BTreeMap;

/// Template id whose prompt runs against a scraped URL instead of a file.
pub const SUMMARY_PROMPT_ID: &str = "summary";

/// Built-in table-extraction prompt.
///
/// Fields are separated by `^^` rather than commas so that commas inside
/// values (amounts, names) survive; the sanitiser turns `^^` back into `,`.
pub const DEFAULT_CSV_PROMPT: &str = r#"Extract every table in this document as CSV.

Rules:
- Use ^^ (two carets) as the field separator, never a comma
- The first row is the header row
- One output row per table row; do not merge or split rows
- Keep numbers exactly as printed, including thousands separators
- If the document contains several tables, output them one after another separated by a blank line
- Output ONLY the CSV inside a single ```csv code block, no commentary"#;

/// One prompt template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptSpec {
    pub id: String,
    pub name: String,
    pub provider: String,
    pub file_ext: String,
    pub prompt: String,
}

impl PromptSpec {
    /// Whether this template runs on a URL (the summary path).
    pub fn requires_url(&self) -> bool {
        self.id == SUMMARY_PROMPT_ID
    }
}

/// All templates, indexed by id, plus the configured default.
#[derive(Debug, Clone, Default)]
pub struct PromptCatalog {
    by_id: BTreeMap<String, PromptSpec>,
    default_name: Option<String>,
}

impl PromptCatalog {
    pub fn from_config(config: &Config) -> Self {
        let mut by_id: BTreeMap<String, PromptSpec> = config
            .prompts
            .iter()
            .map(|(id, t)| {
                let spec = PromptSpec {
                    id: id.clone(),
                    name: t.name.clone(),
                    provider: t.provider.clone(),
                    file_ext: t.file_ext.clone(),
                    prompt: t.prompt.clone(),
                };
                (id.clone(), spec)
            })
            .collect();

        if by_id.is_empty() {
            by_id.insert(
                "ocr".into(),
                PromptSpec {
                    id: "ocr".into(),
                    name: "OCR to CSV".into(),
                    provider: config.default_provider().to_string(),
                    file_ext: "csv".into(),
                    prompt: DEFAULT_CSV_PROMPT.into(),
                },
            );
        }

        Self {
            by_id,
            default_name: config.ui.default_prompt.clone(),
        }
    }

    /// Display names in sorted order.
    pub fn sorted_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.by_id.values().map(|p| p.name.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn by_id(&self, id: &str) -> Option<&PromptSpec> {
        self.by_id.get(id)
    }

    pub fn by_name(&self, name: &str) -> Option<&PromptSpec> {
        self.by_id.values().find(|p| p.name == name)
    }

    /// Look a template up by id first, then by display name.
    pub fn lookup(&self, key: &str) -> Option<&PromptSpec> {
        let key = key.trim();
        self.by_id(key).or_else(|| self.by_name(key))
    }

    /// The template named by `ui.default_prompt`, if it exists.
    pub fn default_prompt(&self) -> Option<&PromptSpec> {
        self.default_name.as_deref().and_then(|n| self.by_name(n))
    }
}
