//! Content classification by file name.
//!
//! The category is derived once per request from the name alone; the bytes
//! are never inspected here. MIME guessing runs first, the fixed extension
//! table only applies when no MIME type resolves.

use serde::Serialize;
use std::fmt;

/// Coarse content category that decides how a document is normalised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentCategory {
    Text,
    Pdf,
    Spreadsheet,
    Image,
    Unknown,
}

impl fmt::Display for ContentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ContentCategory::Text => "text",
            ContentCategory::Pdf => "pdf",
            ContentCategory::Spreadsheet => "spreadsheet",
            ContentCategory::Image => "image",
            ContentCategory::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

const IMAGE_SUBTYPES: [&str; 5] = ["png", "jpeg", "jpg", "webp", "gif"];

/// Classify a file by its name.
pub fn classify(file_name: &str) -> ContentCategory {
    match mime_guess::from_path(file_name).first_raw() {
        Some(mime) => classify_mime(mime),
        None => classify_extension(&extension(file_name)),
    }
}

fn classify_mime(mime: &str) -> ContentCategory {
    if mime.contains("text") {
        ContentCategory::Text
    } else if mime.contains("pdf") {
        ContentCategory::Pdf
    } else if mime.contains("excel") || mime.contains("spreadsheetml") {
        ContentCategory::Spreadsheet
    } else if IMAGE_SUBTYPES.iter().any(|t| mime.contains(t)) {
        ContentCategory::Image
    } else {
        ContentCategory::Unknown
    }
}

fn classify_extension(ext: &str) -> ContentCategory {
    match ext {
        "txt" | "csv" | "json" | "md" => ContentCategory::Text,
        "pdf" => ContentCategory::Pdf,
        "xls" | "xlsx" => ContentCategory::Spreadsheet,
        "png" | "jpeg" | "jpg" | "webp" | "gif" => ContentCategory::Image,
        _ => ContentCategory::Unknown,
    }
}

/// Lower-cased extension after the last `.`, or empty.
pub fn extension(file_name: &str) -> String {
    match file_name.rsplit_once('.') {
        Some((_, ext)) => ext.to_ascii_lowercase(),
        None => String::new(),
    }
}

/// Image MIME subtype for an image file name (`jpg` is reported as `jpeg`).
pub fn image_subtype(file_name: &str) -> String {
    match extension(file_name).as_str() {
        "jpg" | "jpeg" => "jpeg".to_string(),
        "" => "png".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_extensions() {
        assert_eq!(classify("notes.txt"), ContentCategory::Text);
        assert_eq!(classify("data.csv"), ContentCategory::Text);
        assert_eq!(classify("README.md"), ContentCategory::Text);
        assert_eq!(classify("report.PDF"), ContentCategory::Pdf);
        assert_eq!(classify("book.xlsx"), ContentCategory::Spreadsheet);
        assert_eq!(classify("legacy.xls"), ContentCategory::Spreadsheet);
        assert_eq!(classify("scan.png"), ContentCategory::Image);
        assert_eq!(classify("photo.JPG"), ContentCategory::Image);
        assert_eq!(classify("anim.gif"), ContentCategory::Image);
        assert_eq!(classify("pic.webp"), ContentCategory::Image);
    }

    #[test]
    fn unknown_when_nothing_matches() {
        assert_eq!(classify("blob.bin"), ContentCategory::Unknown);
        assert_eq!(classify("no_extension"), ContentCategory::Unknown);
        assert_eq!(classify("archive.zip"), ContentCategory::Unknown);
    }

    #[test]
    fn fallback_table_without_mime() {
        assert_eq!(classify_extension("json"), ContentCategory::Text);
        assert_eq!(classify_extension("xlsx"), ContentCategory::Spreadsheet);
        assert_eq!(classify_extension("exe"), ContentCategory::Unknown);
    }

    #[test]
    fn subtype_from_extension() {
        assert_eq!(image_subtype("a.jpg"), "jpeg");
        assert_eq!(image_subtype("a.JPEG"), "jpeg");
        assert_eq!(image_subtype("a.webp"), "webp");
        assert_eq!(image_subtype("a.png"), "png");
    }

    #[test]
    fn extension_of_dotted_name() {
        assert_eq!(extension("q1.report.XLSX"), "xlsx");
        assert_eq!(extension("plain"), "");
    }
}
