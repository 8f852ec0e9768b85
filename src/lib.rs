pub mod config;
pub mod constants;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod logging;
pub mod models;
pub mod organizer;
pub mod pipeline;
pub mod server;
pub mod utils;

pub use config::Config;
pub use embeddings::EmbeddingProvider;
pub use error::GroupingError;
pub use extractor::{ExtractorRegistry, TextExtractor};
pub use models::{FileRecord, GroupingOutcome, GroupingSummary};
pub use pipeline::{group_files_by_content, GroupingRequest};
