use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A discovered file as it travels through the pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct FileRecord {
    /// Full path to the file in the source directory
    pub path: PathBuf,
    /// Plain text extracted from the file (possibly empty)
    pub extracted_text: String,
    /// Vector returned by the embedding provider
    pub embedding: Option<Vec<f32>>,
    /// Label assigned by the clusterer, only meaningful within one run
    pub cluster_label: Option<usize>,
}

impl FileRecord {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            extracted_text: String::new(),
            embedding: None,
            cluster_label: None,
        }
    }

    /// True when the record can take part in clustering
    pub fn is_clusterable(&self) -> bool {
        !self.extracted_text.trim().is_empty() && self.embedding.is_some()
    }
}

/// Labels for a whole batch, produced at once by the clusterer
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterAssignment {
    /// `labels[i]` belongs to the i-th input vector, each in `[0, k)`
    pub labels: Vec<usize>,
    /// Number of clusters actually used
    pub k: usize,
    /// Sum of squared distances to the assigned centroids
    pub inertia: f32,
    pub centroids: Vec<Vec<f32>>,
}

impl ClusterAssignment {
    /// Number of members per label
    pub fn sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.k];
        for &label in &self.labels {
            sizes[label] += 1;
        }
        sizes
    }
}

/// Why a discovered file was left in place
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum SkipReason {
    /// Unsupported format or no extractable text
    EmptyContent,
    ExtractionFailed(String),
    EmbeddingFailed(String),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::EmptyContent => write!(f, "no extractable text"),
            SkipReason::ExtractionFailed(e) => write!(f, "extraction failed: {}", e),
            SkipReason::EmbeddingFailed(e) => write!(f, "embedding failed: {}", e),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovedFile {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub cluster: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveFailure {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub error: String,
}

/// Result of a run that reached the clustering stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupingSummary {
    pub source_dir: PathBuf,
    /// Files found in the source directory with a supported extension
    pub discovered: usize,
    /// Files that were clustered and moved (or would be, on a dry run)
    pub grouped: usize,
    /// Effective cluster count
    pub clusters: usize,
    pub requested_clusters: usize,
    pub dry_run: bool,
    pub moved: Vec<MovedFile>,
    pub skipped: Vec<SkippedFile>,
    pub failed_moves: Vec<MoveFailure>,
}

impl GroupingSummary {
    /// True when every clustered file landed in its cluster directory
    pub fn is_complete(&self) -> bool {
        self.failed_moves.is_empty()
    }

    pub fn message(&self) -> String {
        let verb = if self.dry_run { "Would group" } else { "Grouped" };
        let mut msg = format!(
            "{} {} files into {} folders.",
            verb, self.grouped, self.clusters
        );
        if !self.skipped.is_empty() {
            msg.push_str(&format!(" Skipped {} files.", self.skipped.len()));
        }
        if !self.failed_moves.is_empty() {
            msg.push_str(&format!(" {} moves failed.", self.failed_moves.len()));
        }
        msg
    }
}

/// Outcome of a grouping run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GroupingOutcome {
    Grouped(GroupingSummary),
    /// Fewer valid files than needed; nothing was moved
    NotEnoughData {
        discovered: usize,
        valid: usize,
        skipped: Vec<SkippedFile>,
    },
}

impl GroupingOutcome {
    pub fn summary(&self) -> Option<&GroupingSummary> {
        match self {
            GroupingOutcome::Grouped(summary) => Some(summary),
            GroupingOutcome::NotEnoughData { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_record_clusterable() {
        let mut record = FileRecord::new(PathBuf::from("/test/a.txt"));
        assert!(!record.is_clusterable());

        record.extracted_text = "   \n".to_string();
        record.embedding = Some(vec![1.0, 0.0]);
        assert!(!record.is_clusterable());

        record.extracted_text = "pasta".to_string();
        assert!(record.is_clusterable());
    }

    #[test]
    fn test_assignment_sizes() {
        let assignment = ClusterAssignment {
            labels: vec![0, 1, 0, 0],
            k: 2,
            inertia: 0.0,
            centroids: vec![vec![0.0], vec![1.0]],
        };
        assert_eq!(assignment.sizes(), vec![3, 1]);
    }

    #[test]
    fn test_summary_message_mentions_skips() {
        let summary = GroupingSummary {
            source_dir: PathBuf::from("/docs"),
            discovered: 4,
            grouped: 3,
            clusters: 2,
            requested_clusters: 2,
            dry_run: false,
            moved: vec![],
            skipped: vec![SkippedFile {
                path: PathBuf::from("/docs/empty.txt"),
                reason: SkipReason::EmptyContent,
            }],
            failed_moves: vec![],
        };
        assert_eq!(
            summary.message(),
            "Grouped 3 files into 2 folders. Skipped 1 files."
        );
        assert!(summary.is_complete());
    }

    #[test]
    fn test_outcome_serialization() {
        let outcome = GroupingOutcome::NotEnoughData {
            discovered: 1,
            valid: 1,
            skipped: vec![],
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "not_enough_data");
        assert_eq!(json["valid"], 1);

        let reason = serde_json::to_value(SkipReason::EmbeddingFailed("429".into())).unwrap();
        assert_eq!(reason["kind"], "embedding_failed");
        assert_eq!(reason["detail"], "429");
    }
}
