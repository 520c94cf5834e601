//! Output sanitisation: strip code fences and apply the `^^` delimiter swap.
//!
//! Models are asked to separate CSV fields with `^^` so that commas inside
//! values never break a row. When the sentinel shows up in the output, every
//! literal comma is dropped and each `^^` becomes the real delimiter.

use once_cell::sync::Lazy;
use regex::Regex;

/// Sentinel field delimiter the prompts ask for.
pub const SENTINEL: &str = "^^";

static RE_CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```(?:csv)?\s*([\s\S]*?)\s*```").unwrap());

/// Clean raw model output. Pure and infallible.
pub fn sanitize(raw: &str) -> String {
    let text = strip_code_fence(raw);
    if text.contains(SENTINEL) {
        text.replace(',', "").replace(SENTINEL, ",")
    } else {
        text.to_string()
    }
}

/// Interior of the first fenced block, or the input unchanged.
fn strip_code_fence(raw: &str) -> &str {
    RE_CODE_FENCE
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .unwrap_or(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_fence_with_sentinel() {
        let raw = "```csv\nName^^Amount\nAcme, Inc.^^1,200\n```";
        assert_eq!(sanitize(raw), "Name,Amount\nAcme Inc.,1200");
    }

    #[test]
    fn thousands_separator_is_dropped() {
        let raw = "```csv\nName^^Age\nJohn^^30,000\n```";
        assert_eq!(sanitize(raw), "Name,Age\nJohn,30000");
    }

    #[test]
    fn bare_fence_is_stripped() {
        assert_eq!(sanitize("```\nhello\n```"), "hello");
    }

    #[test]
    fn only_first_fence_is_kept() {
        let raw = "intro\n```csv\na^^b\n```\nmiddle\n```\nsecond\n```";
        assert_eq!(sanitize(raw), "a,b");
    }

    #[test]
    fn plain_text_is_untouched() {
        let raw = "Total: 1,200 units, shipped.";
        assert_eq!(sanitize(raw), raw);
    }

    #[test]
    fn sentinel_without_fence() {
        assert_eq!(sanitize("x^^y,z"), "x,yz");
    }

    #[test]
    fn sanitize_is_idempotent_on_clean_output() {
        let once = sanitize("```csv\na^^b\n1^^2\n```");
        assert_eq!(sanitize(&once), once);
    }

    #[test]
    fn empty_input() {
        assert_eq!(sanitize(""), "");
    }
}
