use crate::extractor::{DocxExtractor, PdfExtractor, TextExtractor, TxtExtractor};
use crate::models::SkipReason;
use crate::utils;
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

/// Registry mapping file extensions to text extractors
pub struct ExtractorRegistry {
    extractors: Vec<Arc<dyn TextExtractor>>,
}

impl ExtractorRegistry {
    /// Create a new registry with the PDF, DOCX and plain text extractors
    pub fn new() -> Self {
        let mut registry = Self {
            extractors: Vec::new(),
        };

        registry.register(Arc::new(PdfExtractor::new()));
        registry.register(Arc::new(DocxExtractor::new()));
        registry.register(Arc::new(TxtExtractor::new()));

        registry
    }

    /// Register a new extractor; earlier registrations win on overlap
    pub fn register(&mut self, extractor: Arc<dyn TextExtractor>) {
        self.extractors.push(extractor);
    }

    /// Find the extractor that handles the given extension
    pub fn get_extractor(&self, ext: &str) -> Option<Arc<dyn TextExtractor>> {
        self.extractors
            .iter()
            .find(|e| e.supports_extension(ext))
            .cloned()
    }

    /// Extract text, treating unsupported formats as empty content.
    ///
    /// This is the per-file failure boundary: a corrupt or unreadable file
    /// is logged and reported as [`SkipReason::ExtractionFailed`] so the
    /// rest of the batch keeps going.
    pub async fn extract_or_skip(&self, path: &Path) -> Result<String, SkipReason> {
        let extractor = match utils::get_extension(path).and_then(|ext| self.get_extractor(&ext)) {
            Some(extractor) => extractor,
            None => return Ok(String::new()),
        };

        match extractor.extract(path).await {
            Ok(text) => Ok(text),
            Err(e) => {
                warn!(path = %path.display(), error = %format!("{:#}", e), "text extraction failed");
                Err(SkipReason::ExtractionFailed(format!("{:#}", e)))
            }
        }
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::new()
    }
}
