pub mod docx;
pub mod pdf;
pub mod registry;
pub mod r#trait;
pub mod txt;

pub use docx::DocxExtractor;
pub use pdf::PdfExtractor;
pub use r#trait::TextExtractor;
pub use registry::ExtractorRegistry;
pub use txt::TxtExtractor;
