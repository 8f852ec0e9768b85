use anyhow::Result;
use cognigroup::config::Config;
use cognigroup::embeddings::EmbeddingProvider;
use cognigroup::models::{GroupingOutcome, SkipReason};
use cognigroup::pipeline::{group_files_by_content, GroupingRequest, NoProgress};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

const COOKING: &[&str] = &["pasta", "sauce", "oven", "recipe", "soup", "bake"];
const CARS: &[&str] = &["engine", "tire", "brake", "fuel", "car", "gearbox"];

/// Embeds text as the normalised share of cooking vs car vocabulary
struct TopicEmbedder {
    calls: AtomicUsize,
}

impl TopicEmbedder {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for TopicEmbedder {
    async fn compute_embedding(&self, content: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if content.contains("RATE_LIMITED") {
            anyhow::bail!("Embedding API error 429 Too Many Requests");
        }
        let lower = content.to_lowercase();
        let score = |words: &[&str]| words.iter().map(|w| lower.matches(w).count()).sum::<usize>() as f32;
        let (cooking, cars) = (score(COOKING), score(CARS));
        let norm = (cooking * cooking + cars * cars).sqrt().max(1.0);
        Ok(vec![cooking / norm, cars / norm])
    }

    fn dimension(&self) -> usize {
        2
    }

    fn model_name(&self) -> &str {
        "topic"
    }
}

fn write_corpus(dir: &Path) {
    fs::write(dir.join("bolognese.txt"), "Simmer the sauce, then toss the pasta. A classic recipe.").unwrap();
    fs::write(dir.join("bread.txt"), "Bake the dough in a hot oven. This recipe needs patience.").unwrap();
    fs::write(dir.join("minestrone.txt"), "A vegetable soup recipe with pasta and a tomato sauce base.").unwrap();
    fs::write(dir.join("lasagna.txt"), "Layer pasta and sauce, bake in the oven for forty minutes.").unwrap();
    fs::write(dir.join("brakes.txt"), "Replace the brake pads and check each tire on the car.").unwrap();
    fs::write(dir.join("service.txt"), "The engine needs fuel filters and a gearbox oil change.").unwrap();
}

fn files_in(dir: &Path) -> BTreeSet<String> {
    fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file())
        .map(|e| e.file_name().to_string_lossy().to_string())
        .collect()
}

fn request(dir: &Path, clusters: usize) -> GroupingRequest {
    GroupingRequest {
        source_dir: dir.to_path_buf(),
        clusters,
        dry_run: false,
    }
}

fn set(names: &[&str]) -> BTreeSet<String> {
    names.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn test_groups_cooking_and_cars() {
    let dir = TempDir::new().unwrap();
    write_corpus(dir.path());

    let outcome = group_files_by_content(&request(dir.path(), 2), &Config::default(), &TopicEmbedder::new(), &NoProgress)
        .await
        .unwrap();
    let summary = outcome.summary().expect("grouped");

    assert_eq!(summary.discovered, 6);
    assert_eq!(summary.grouped, 6);
    assert_eq!(summary.clusters, 2);
    assert!(summary.skipped.is_empty());
    assert!(summary.failed_moves.is_empty());

    let cooking = set(&["bolognese.txt", "bread.txt", "lasagna.txt", "minestrone.txt"]);
    let cars = set(&["brakes.txt", "service.txt"]);
    let first = files_in(&dir.path().join("cluster_0"));
    let second = files_in(&dir.path().join("cluster_1"));
    assert!(
        (first == cooking && second == cars) || (first == cars && second == cooking),
        "unexpected grouping: {:?} / {:?}",
        first,
        second
    );
    assert!(files_in(dir.path()).is_empty());
}

#[tokio::test]
async fn test_every_file_lands_in_exactly_one_cluster() {
    let dir = TempDir::new().unwrap();
    write_corpus(dir.path());
    let original = files_in(dir.path());

    let outcome = group_files_by_content(&request(dir.path(), 3), &Config::default(), &TopicEmbedder::new(), &NoProgress)
        .await
        .unwrap();
    let summary = outcome.summary().expect("grouped");

    let mut seen = Vec::new();
    for label in 0..summary.clusters {
        seen.extend(files_in(&dir.path().join(format!("cluster_{}", label))));
    }
    let unique: BTreeSet<String> = seen.iter().cloned().collect();
    assert_eq!(seen.len(), unique.len());
    assert_eq!(unique, original);
}

#[tokio::test]
async fn test_failed_and_empty_files_stay_in_place() {
    let dir = TempDir::new().unwrap();
    write_corpus(dir.path());
    fs::write(dir.path().join("empty.txt"), "").unwrap();
    fs::write(dir.path().join("throttled.txt"), "RATE_LIMITED soup").unwrap();
    fs::write(dir.path().join("corrupt.pdf"), "%PDF-garbage").unwrap();
    fs::write(dir.path().join("photo.jpg"), "not a document").unwrap();

    let embedder = TopicEmbedder::new();
    let outcome = group_files_by_content(&request(dir.path(), 2), &Config::default(), &embedder, &NoProgress)
        .await
        .unwrap();
    let summary = outcome.summary().expect("grouped");

    assert_eq!(summary.discovered, 9);
    assert_eq!(summary.grouped, 6);
    assert_eq!(summary.skipped.len(), 3);
    // empty and unreadable files never reach the embedder
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 7);

    let reasons: Vec<&SkipReason> = summary.skipped.iter().map(|s| &s.reason).collect();
    assert!(matches!(reasons[0], SkipReason::ExtractionFailed(_)));
    assert_eq!(reasons[1], &SkipReason::EmptyContent);
    assert!(matches!(reasons[2], SkipReason::EmbeddingFailed(_)));

    assert_eq!(
        files_in(dir.path()),
        set(&["corrupt.pdf", "empty.txt", "photo.jpg", "throttled.txt"])
    );
}

#[tokio::test]
async fn test_same_input_same_grouping() {
    let first_dir = TempDir::new().unwrap();
    let second_dir = TempDir::new().unwrap();
    write_corpus(first_dir.path());
    write_corpus(second_dir.path());

    let config = Config::default();
    let a = group_files_by_content(&request(first_dir.path(), 3), &config, &TopicEmbedder::new(), &NoProgress)
        .await
        .unwrap();
    let b = group_files_by_content(&request(second_dir.path(), 3), &config, &TopicEmbedder::new(), &NoProgress)
        .await
        .unwrap();

    let labels = |outcome: &GroupingOutcome| -> Vec<(String, usize)> {
        outcome
            .summary()
            .expect("grouped")
            .moved
            .iter()
            .map(|m| (m.source.file_name().unwrap().to_string_lossy().to_string(), m.cluster))
            .collect()
    };
    assert_eq!(labels(&a), labels(&b));
}

#[tokio::test]
async fn test_dry_run_moves_nothing() {
    let dir = TempDir::new().unwrap();
    write_corpus(dir.path());

    let mut req = request(dir.path(), 2);
    req.dry_run = true;
    let outcome = group_files_by_content(&req, &Config::default(), &TopicEmbedder::new(), &NoProgress)
        .await
        .unwrap();
    let summary = outcome.summary().expect("grouped");

    assert!(summary.dry_run);
    assert_eq!(summary.grouped, 6);
    assert_eq!(files_in(dir.path()).len(), 6);
    assert!(!dir.path().join("cluster_0").exists());
}

#[tokio::test]
async fn test_second_run_only_sees_remaining_files() {
    let dir = TempDir::new().unwrap();
    write_corpus(dir.path());
    let config = Config::default();

    group_files_by_content(&request(dir.path(), 2), &config, &TopicEmbedder::new(), &NoProgress)
        .await
        .unwrap();

    let outcome = group_files_by_content(&request(dir.path(), 2), &config, &TopicEmbedder::new(), &NoProgress)
        .await
        .unwrap();
    assert!(matches!(
        outcome,
        GroupingOutcome::NotEnoughData { discovered: 0, valid: 0, .. }
    ));
}

#[tokio::test]
async fn test_clusters_clamped_to_file_count() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("a.txt"), "pasta sauce").unwrap();
    fs::write(dir.path().join("b.txt"), "engine fuel").unwrap();

    let outcome = group_files_by_content(&request(dir.path(), 5), &Config::default(), &TopicEmbedder::new(), &NoProgress)
        .await
        .unwrap();
    let summary = outcome.summary().expect("grouped");
    assert_eq!(summary.requested_clusters, 5);
    assert_eq!(summary.clusters, 2);
    assert!(dir.path().join("cluster_0/a.txt").exists());
    assert!(dir.path().join("cluster_1/b.txt").exists());
}

#[tokio::test]
async fn test_reject_policy_refuses_large_k() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("a.txt"), "pasta sauce").unwrap();
    fs::write(dir.path().join("b.txt"), "engine fuel").unwrap();

    let mut config = Config::default();
    config.clustering.k_policy = cognigroup::organizer::KPolicy::Reject;

    let result = group_files_by_content(&request(dir.path(), 5), &config, &TopicEmbedder::new(), &NoProgress).await;
    assert!(result.is_err());
    assert!(dir.path().join("a.txt").exists());
}
