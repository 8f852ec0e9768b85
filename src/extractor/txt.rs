use crate::extractor::r#trait::TextExtractor;
use crate::utils;
use anyhow::{Context, Result};
use std::path::Path;

/// Plain text extractor; invalid UTF-8 is dropped rather than rejected
pub struct TxtExtractor;

impl TxtExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TxtExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl TextExtractor for TxtExtractor {
    async fn extract(&self, path: &Path) -> Result<String> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read text file: {}", path.display()))?;
        Ok(utils::decode_utf8_dropping_invalid(&bytes))
    }

    fn supports_extension(&self, ext: &str) -> bool {
        matches!(ext.to_lowercase().as_str(), "txt")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_txt_extract_lenient() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"engine \xC0oil\n").unwrap();

        let text = TxtExtractor::new().extract(&path).await.unwrap();
        assert_eq!(text, "engine oil\n");
    }

    #[tokio::test]
    async fn test_txt_missing_file_is_error() {
        let dir = TempDir::new().unwrap();
        let result = TxtExtractor::new().extract(&dir.path().join("gone.txt")).await;
        assert!(result.is_err());
    }
}
