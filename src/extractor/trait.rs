use anyhow::Result;
use std::path::Path;

/// Trait for text extractors that can extract text content from various file formats
#[async_trait::async_trait]
pub trait TextExtractor: Send + Sync {
    /// Extract text content from a file
    async fn extract(&self, path: &Path) -> Result<String>;

    /// Check if this extractor supports the given file extension
    fn supports_extension(&self, ext: &str) -> bool;
}
