use crate::constants::MAX_DOCX_XML_BYTES;
use crate::extractor::r#trait::TextExtractor;
use anyhow::{Context, Result};
use quick_xml::events::Event;
use std::io::Read;
use std::path::{Path, PathBuf};

const DOCUMENT_XML: &str = "word/document.xml";

/// DOCX (Office Open XML) text extractor
pub struct DocxExtractor;

impl DocxExtractor {
    pub fn new() -> Self {
        Self
    }

    fn extract_blocking(path: &Path) -> Result<String> {
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open DOCX file: {}", path.display()))?;
        let mut archive = zip::ZipArchive::new(file)
            .with_context(|| format!("Failed to read DOCX archive: {}", path.display()))?;

        let entry = archive
            .by_name(DOCUMENT_XML)
            .with_context(|| format!("{} not found in {}", DOCUMENT_XML, path.display()))?;

        let mut xml = Vec::new();
        entry
            .take(MAX_DOCX_XML_BYTES)
            .read_to_end(&mut xml)
            .with_context(|| format!("Failed to read {}", DOCUMENT_XML))?;
        if xml.len() as u64 >= MAX_DOCX_XML_BYTES {
            anyhow::bail!("{} exceeds size limit ({} bytes)", DOCUMENT_XML, MAX_DOCX_XML_BYTES);
        }

        paragraphs_from_xml(&xml).map(|paragraphs| paragraphs.join("\n"))
    }
}

impl Default for DocxExtractor {
    fn default() -> Self {
        Self::new()
    }
}

/// Collect the text of every `<w:p>` paragraph
///
/// Paragraphs can nest (text boxes live inside a run of the enclosing
/// paragraph), so each open `<w:p>` gets its own buffer. A paragraph is
/// emitted when it closes, which puts nested ones before their parent.
fn paragraphs_from_xml(xml: &[u8]) -> Result<Vec<String>> {
    let mut reader = quick_xml::Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut paragraphs = Vec::new();
    let mut open: Vec<String> = Vec::new();
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"p" => open.push(String::new()),
                b"t" => in_text = true,
                _ => {}
            },
            Ok(Event::Empty(e)) => match (e.local_name().as_ref(), open.last_mut()) {
                (b"tab", Some(current)) => current.push('\t'),
                (b"br" | b"cr", Some(current)) => current.push('\n'),
                // self-closing paragraph
                (b"p", _) => paragraphs.push(String::new()),
                _ => {}
            },
            Ok(Event::Text(te)) if in_text => {
                let text = te.unescape().context("Invalid text in document.xml")?;
                if let Some(current) = open.last_mut() {
                    current.push_str(&text);
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => {
                    if let Some(done) = open.pop() {
                        paragraphs.push(done);
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => anyhow::bail!("Malformed document.xml at {}: {}", reader.buffer_position(), e),
            _ => {}
        }
        buf.clear();
    }

    Ok(paragraphs)
}

#[async_trait::async_trait]
impl TextExtractor for DocxExtractor {
    async fn extract(&self, path: &Path) -> Result<String> {
        let path: PathBuf = path.to_path_buf();
        tokio::task::spawn_blocking(move || Self::extract_blocking(&path))
            .await
            .context("DOCX extraction task panicked")?
    }

    fn supports_extension(&self, ext: &str) -> bool {
        matches!(ext.to_lowercase().as_str(), "docx")
    }
}
