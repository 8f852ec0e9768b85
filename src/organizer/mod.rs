pub mod kmeans;
pub mod mover;
pub mod preview;

pub use kmeans::{cosine_similarity, KMeans, KMeansOptions, KPolicy};
pub use mover::{CollisionPolicy, FileMover, MoveReport};
pub use preview::PreviewTree;

use std::path::Path;

/// Directory a file with the given cluster label is moved into
pub fn cluster_dir(base: &Path, prefix: &str, label: usize) -> std::path::PathBuf {
    base.join(format!("{}{}", prefix, label))
}
