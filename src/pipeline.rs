//! Content grouping pipeline: discover → extract → embed → cluster → move.
//!
//! Files are processed one at a time in file-name order. Per-file failures
//! (unreadable document, failed embedding) drop that file from the batch
//! and are listed in the summary; nothing is moved unless at least
//! `min_files` files survive to the clustering stage.

use crate::config::Config;
use crate::embeddings::EmbeddingProvider;
use crate::error::GroupingError;
use crate::extractor::ExtractorRegistry;
use crate::models::{
    ClusterAssignment, FileRecord, GroupingOutcome, GroupingSummary, SkipReason, SkippedFile,
};
use crate::organizer::{cluster_dir, kmeans, FileMover, KMeans, KMeansOptions, PreviewTree};
use crate::utils;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Parameters of one grouping run
#[derive(Debug, Clone)]
pub struct GroupingRequest {
    pub source_dir: PathBuf,
    pub clusters: usize,
    pub dry_run: bool,
}

/// Receives per-file progress events
pub trait ProgressSink: Send + Sync {
    fn discovered(&self, _total: usize) {}
    fn file_started(&self, _path: &Path) {}
    fn file_finished(&self, _path: &Path, _skipped: Option<&SkipReason>) {}
}

/// Progress sink that ignores every event
pub struct NoProgress;

impl ProgressSink for NoProgress {}

/// A batch that is ready to be moved
#[derive(Debug, Clone)]
pub struct GroupingPlan {
    pub source_dir: PathBuf,
    pub discovered: usize,
    pub requested_clusters: usize,
    /// Clustered records, labels attached, in batch order
    pub records: Vec<FileRecord>,
    pub assignment: ClusterAssignment,
    pub skipped: Vec<SkippedFile>,
    pub preview: PreviewTree,
}

/// Result of the analysis stages
#[derive(Debug, Clone)]
pub enum Prepared {
    Ready(GroupingPlan),
    NotEnoughData {
        discovered: usize,
        valid: usize,
        skipped: Vec<SkippedFile>,
    },
}

/// List the top-level files of `dir` whose extension is in `extensions`, sorted by name
pub fn discover_files(dir: &Path, extensions: &[String]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!(error = %e, "error accessing entry");
                continue;
            }
        };

        // follows symlinks, so linked documents are grouped too
        if !entry.path().is_file() {
            continue;
        }

        let matches = utils::get_extension(entry.path())
            .map(|ext| extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(&ext)))
            .unwrap_or(false);
        if matches {
            files.push(entry.into_path());
        }
    }

    Ok(files)
}

/// Run extraction and embedding over `files`, in order
///
/// Returns the records that can be clustered plus every file that was left out.
pub async fn collect_records(
    files: &[PathBuf],
    config: &Config,
    extractors: &ExtractorRegistry,
    embedder: &dyn EmbeddingProvider,
    progress: &dyn ProgressSink,
) -> (Vec<FileRecord>, Vec<SkippedFile>) {
    let mut records = Vec::new();
    let mut skipped = Vec::new();
    let mut batch_dim: Option<usize> = None;

    for path in files {
        progress.file_started(path);
        let mut record = FileRecord::new(path.clone());

        let outcome = process_file(&mut record, config, extractors, embedder, &mut batch_dim).await;
        match outcome {
            Ok(()) => {
                debug!(path = %path.display(), "file embedded");
                progress.file_finished(path, None);
                records.push(record);
            }
            Err(reason) => {
                info!(path = %path.display(), reason = %reason, "skipping file");
                progress.file_finished(path, Some(&reason));
                skipped.push(SkippedFile {
                    path: path.clone(),
                    reason,
                });
            }
        }
    }

    (records, skipped)
}

async fn process_file(
    record: &mut FileRecord,
    config: &Config,
    extractors: &ExtractorRegistry,
    embedder: &dyn EmbeddingProvider,
    batch_dim: &mut Option<usize>,
) -> Result<(), SkipReason> {
    record.extracted_text = extractors.extract_or_skip(&record.path).await?;
    if record.extracted_text.trim().is_empty() {
        return Err(SkipReason::EmptyContent);
    }

    let embedding = embedder
        .compute_truncated_embedding(&record.extracted_text, config.embedding.max_input_chars)
        .await
        .map_err(|e| {
            warn!(path = %record.path.display(), error = %format!("{:#}", e), "embedding failed");
            SkipReason::EmbeddingFailed(format!("{:#}", e))
        })?;

    match *batch_dim {
        Some(dim) if dim != embedding.len() => {
            return Err(SkipReason::EmbeddingFailed(
                GroupingError::DimensionMismatch {
                    expected: dim,
                    actual: embedding.len(),
                }
                .to_string(),
            ));
        }
        Some(_) => {}
        None => *batch_dim = Some(embedding.len()),
    }

    record.embedding = Some(embedding);
    Ok(())
}

/// Cluster the clusterable records and attach their labels
///
/// Records without text or embedding keep `cluster_label = None`.
pub fn cluster_records(
    records: &mut [FileRecord],
    clusters: usize,
    options: KMeansOptions,
) -> Result<ClusterAssignment, GroupingError> {
    let vectors: Vec<Vec<f32>> = records
        .iter()
        .filter(|r| r.is_clusterable())
        .filter_map(|r| r.embedding.clone())
        .collect();

    let assignment = KMeans::new(options).fit(&vectors, clusters)?;
    debug!(
        mean_similarity = kmeans::mean_similarity_to_centroid(&vectors, &assignment),
        inertia = assignment.inertia,
        "clustering quality"
    );

    let clusterable = records.iter_mut().filter(|r| r.is_clusterable());
    for (record, &label) in clusterable.zip(assignment.labels.iter()) {
        record.cluster_label = Some(label);
    }

    Ok(assignment)
}

/// Turn labelled records into directory creations and moves under `base`
pub fn plan_organization(records: &[FileRecord], base: &Path, prefix: &str) -> Result<PreviewTree> {
    let mut preview = PreviewTree::new();

    for record in records {
        let label = record
            .cluster_label
            .with_context(|| format!("No cluster label for {}", record.path.display()))?;
        let dir = cluster_dir(base, prefix, label);
        let file_name = record
            .path
            .file_name()
            .with_context(|| format!("No file name in {}", record.path.display()))?;

        preview.add_directory(dir.clone());
        preview.add_move(record.path.clone(), dir.join(file_name), label);
    }

    Ok(preview)
}

/// Run every stage up to (but not including) the moves
pub async fn prepare(
    request: &GroupingRequest,
    config: &Config,
    embedder: &dyn EmbeddingProvider,
    progress: &dyn ProgressSink,
) -> Result<Prepared> {
    if !request.source_dir.is_dir() {
        return Err(GroupingError::SourceNotDirectory(request.source_dir.clone()).into());
    }
    if request.clusters == 0 {
        return Err(GroupingError::InvalidClusterCount {
            requested: 0,
            reason: "must be at least 1".to_string(),
        }
        .into());
    }

    let source_dir = request
        .source_dir
        .canonicalize()
        .with_context(|| format!("Failed to resolve {}", request.source_dir.display()))?;

    let files = discover_files(&source_dir, &config.organizer.extensions)?;
    let discovered = files.len();
    info!(dir = %source_dir.display(), discovered, "discovered files");
    progress.discovered(discovered);

    let extractors = ExtractorRegistry::new();
    let (mut records, skipped) =
        collect_records(&files, config, &extractors, embedder, progress).await;
    info!(
        embedded = records.len(),
        skipped = skipped.len(),
        model = embedder.model_name(),
        dimension = embedder.dimension(),
        "embedding finished"
    );

    if records.len() < config.organizer.min_files {
        warn!(
            valid = records.len(),
            required = config.organizer.min_files,
            "not enough valid files to cluster"
        );
        return Ok(Prepared::NotEnoughData {
            discovered,
            valid: records.len(),
            skipped,
        });
    }

    let assignment = cluster_records(
        &mut records,
        request.clusters,
        KMeansOptions::from_config(&config.clustering),
    )?;
    info!(
        files = records.len(),
        clusters = assignment.k,
        sizes = ?assignment.sizes(),
        "clustered files"
    );

    let preview = plan_organization(&records, &source_dir, &config.organizer.folder_prefix)?;

    Ok(Prepared::Ready(GroupingPlan {
        source_dir,
        discovered,
        requested_clusters: request.clusters,
        records,
        assignment,
        skipped,
        preview,
    }))
}

/// Perform (or simulate) the moves of a prepared plan
pub async fn apply(plan: GroupingPlan, config: &Config, dry_run: bool) -> Result<GroupingSummary> {
    let mover = FileMover::new(&plan.source_dir, config.organizer.collision)?;
    let report = mover.execute(&plan.preview, dry_run).await?;

    let summary = GroupingSummary {
        source_dir: plan.source_dir,
        discovered: plan.discovered,
        grouped: report.moved.len(),
        clusters: plan.assignment.k,
        requested_clusters: plan.requested_clusters,
        dry_run,
        moved: report.moved,
        skipped: plan.skipped,
        failed_moves: report.failed,
    };
    info!(
        grouped = summary.grouped,
        clusters = summary.clusters,
        skipped = summary.skipped.len(),
        failed_moves = summary.failed_moves.len(),
        dry_run,
        "grouping finished"
    );

    Ok(summary)
}

/// Group the files of a directory by content, end to end
pub async fn group_files_by_content(
    request: &GroupingRequest,
    config: &Config,
    embedder: &dyn EmbeddingProvider,
    progress: &dyn ProgressSink,
) -> Result<GroupingOutcome> {
    match prepare(request, config, embedder, progress).await? {
        Prepared::Ready(plan) => Ok(GroupingOutcome::Grouped(
            apply(plan, config, request.dry_run).await?,
        )),
        Prepared::NotEnoughData {
            discovered,
            valid,
            skipped,
        } => Ok(GroupingOutcome::NotEnoughData {
            discovered,
            valid,
            skipped,
        }),
    }
}
