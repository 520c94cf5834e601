//! Source content: a named blob of bytes as uploaded or read from disk.
//!
//! The name is all the pipeline looks at to decide how to treat the bytes,
//! so it is kept exactly as supplied (no path components).

use crate::error::ExtractError;
use std::path::Path;
use tracing::debug;

/// One uploaded document. The bytes are never mutated, only re-encoded.
#[derive(Clone, PartialEq, Eq)]
pub struct SourceContent {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for SourceContent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceContent")
            .field("name", &self.name)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

impl SourceContent {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a local file, keeping only its file name.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, ExtractError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ExtractError::FileNotFound {
                path: path.to_path_buf(),
            },
            std::io::ErrorKind::PermissionDenied => ExtractError::PermissionDenied {
                path: path.to_path_buf(),
            },
            _ => ExtractError::Io {
                path: path.to_path_buf(),
                source: e,
            },
        })?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        debug!("Read {} ({} bytes)", path.display(), bytes.len());
        Ok(Self { name, bytes })
    }

    /// File name without its last extension.
    pub fn stem(&self) -> &str {
        match self.name.rsplit_once('.') {
            Some((stem, _)) if !stem.is_empty() => stem,
            _ => &self.name,
        }
    }
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    let lower = input.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/doc.pdf"));
        assert!(is_url("HTTP://example.com"));
        assert!(!is_url("/tmp/doc.pdf"));
        assert!(!is_url("example.com"));
        assert!(!is_url(""));
    }

    #[test]
    fn stem_strips_last_extension() {
        assert_eq!(SourceContent::new("report.v2.pdf", vec![]).stem(), "report.v2");
        assert_eq!(SourceContent::new("README", vec![]).stem(), "README");
        assert_eq!(SourceContent::new(".env", vec![]).stem(), ".env");
    }

    #[test]
    fn debug_hides_bytes() {
        let src = SourceContent::new("a.png", vec![7u8; 1000]);
        let dbg = format!("{src:?}");
        assert!(dbg.contains("1000"));
        assert!(!dbg.contains("7, 7"));
    }

    #[tokio::test]
    async fn from_path_reads_file_name_and_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        std::fs::write(&path, "a,b\n").unwrap();

        let src = SourceContent::from_path(&path).await.unwrap();
        assert_eq!(src.name, "data.csv");
        assert_eq!(src.bytes, b"a,b\n");
    }

    #[tokio::test]
    async fn from_path_missing_file() {
        let err = SourceContent::from_path("/definitely/not/here.pdf")
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::FileNotFound { .. }));
        assert!(err.is_client_error());
    }
}
