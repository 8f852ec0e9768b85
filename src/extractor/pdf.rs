use crate::extractor::r#trait::TextExtractor;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

/// PDF text extractor
///
/// Text is pulled page by page with lopdf and joined with newlines. Pages
/// that fail to decode contribute nothing. When no page yields any text the
/// whole document is handed to pdf-extract as a second opinion.
pub struct PdfExtractor;

impl PdfExtractor {
    pub fn new() -> Self {
        Self
    }

    fn extract_blocking(path: &Path) -> Result<String> {
        let doc = lopdf::Document::load(path)
            .with_context(|| format!("Failed to load PDF: {}", path.display()))?;

        let pages: Vec<String> = doc
            .get_pages()
            .keys()
            .map(|page_num| match doc.extract_text(&[*page_num]) {
                Ok(text) => text.trim_end().to_string(),
                Err(e) => {
                    debug!(path = %path.display(), page = *page_num, error = %e, "page yielded no text");
                    String::new()
                }
            })
            .collect();

        let text = pages.join("\n");
        if !text.trim().is_empty() {
            return Ok(text);
        }

        // lopdf found nothing; some encodings only pdf-extract understands.
        // pdf-extract panics on some malformed documents.
        match std::panic::catch_unwind(|| pdf_extract::extract_text(path)) {
            Ok(Ok(text)) => Ok(text.trim().to_string()),
            Ok(Err(e)) => {
                debug!(path = %path.display(), error = %e, "pdf-extract fallback failed");
                Ok(String::new())
            }
            Err(_) => {
                debug!(path = %path.display(), "pdf-extract fallback panicked");
                Ok(String::new())
            }
        }
    }
}

impl Default for PdfExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl TextExtractor for PdfExtractor {
    async fn extract(&self, path: &Path) -> Result<String> {
        let path: PathBuf = path.to_path_buf();
        tokio::task::spawn_blocking(move || Self::extract_blocking(&path))
            .await
            .context("PDF extraction task panicked")?
    }

    fn supports_extension(&self, ext: &str) -> bool {
        matches!(ext.to_lowercase().as_str(), "pdf")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};
    use tempfile::TempDir;

    /// Write a PDF with one page per entry; `None` pages have no content stream
    fn write_pdf(path: &Path, pages: &[Option<&str>]) {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::new();
        for page in pages {
            let mut page_dict = dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Resources" => resources_id,
            };
            if let Some(text) = page {
                let content = Content {
                    operations: vec![
                        Operation::new("BT", vec![]),
                        Operation::new("Tf", vec!["F1".into(), 12.into()]),
                        Operation::new("Td", vec![72.into(), 720.into()]),
                        Operation::new("Tj", vec![Object::string_literal(*text)]),
                        Operation::new("ET", vec![]),
                    ],
                };
                let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
                page_dict.set("Contents", content_id);
            }
            kids.push(doc.add_object(page_dict).into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.save(path).unwrap();
    }

    #[test]
    fn test_pdf_extractor_supports_pdf() {
        let extractor = PdfExtractor::new();
        assert!(extractor.supports_extension("pdf"));
        assert!(extractor.supports_extension("PDF"));
        assert!(!extractor.supports_extension("txt"));
    }

    #[tokio::test]
    async fn test_pdf_extractor_corrupt_file_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.pdf");
        std::fs::write(&path, b"this is not a pdf").unwrap();

        let extractor = PdfExtractor::new();
        assert!(extractor.extract(&path).await.is_err());
    }

    #[tokio::test]
    async fn test_pdf_pages_joined_in_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("menu.pdf");
        write_pdf(&path, &[Some("Starters"), None, Some("Desserts")]);

        let text = PdfExtractor::new().extract(&path).await.unwrap();
        assert_eq!(text, "Starters\n\nDesserts");
    }

    #[tokio::test]
    async fn test_pdf_without_text_is_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scan.pdf");
        write_pdf(&path, &[None]);

        let text = PdfExtractor::new().extract(&path).await.unwrap();
        assert_eq!(text, "");
    }
}
