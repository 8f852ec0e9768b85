use crate::config::ClusteringConfig;
use crate::error::GroupingError;
use crate::models::ClusterAssignment;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// What to do when more clusters are requested than there are vectors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KPolicy {
    /// Reduce k to the number of vectors
    #[default]
    Clamp,
    /// Refuse to cluster
    Reject,
}

#[derive(Debug, Clone)]
pub struct KMeansOptions {
    pub seed: u64,
    pub max_iterations: usize,
    /// Independent restarts; the run with the lowest inertia is kept
    pub n_init: usize,
    pub tolerance: f32,
    pub k_policy: KPolicy,
}

impl KMeansOptions {
    pub fn from_config(config: &ClusteringConfig) -> Self {
        Self {
            seed: config.seed,
            max_iterations: config.max_iterations,
            n_init: config.n_init,
            tolerance: config.tolerance,
            k_policy: config.k_policy,
        }
    }
}

impl Default for KMeansOptions {
    fn default() -> Self {
        Self::from_config(&ClusteringConfig::default())
    }
}

/// Seeded k-means (k-means++ initialisation, Lloyd iterations)
///
/// The same vectors, k and seed always produce the same labels. Labels are
/// numbered by first appearance, so the first vector is always in cluster 0.
pub struct KMeans {
    options: KMeansOptions,
}

impl KMeans {
    pub fn new(options: KMeansOptions) -> Self {
        Self { options }
    }

    /// Apply the k policy to a request for `requested` clusters over `n` vectors
    pub fn effective_k(&self, requested: usize, n: usize) -> Result<usize, GroupingError> {
        if requested == 0 {
            return Err(GroupingError::InvalidClusterCount {
                requested,
                reason: "must be at least 1".to_string(),
            });
        }
        if requested <= n {
            return Ok(requested);
        }
        match self.options.k_policy {
            KPolicy::Clamp => {
                warn!(requested, files = n, "more clusters requested than files, clamping");
                Ok(n)
            }
            KPolicy::Reject => Err(GroupingError::InvalidClusterCount {
                requested,
                reason: format!("only {} files can be clustered", n),
            }),
        }
    }

    /// Cluster `data` into (at most) `k` groups
    pub fn fit(&self, data: &[Vec<f32>], k: usize) -> Result<ClusterAssignment, GroupingError> {
        if data.is_empty() {
            return Err(GroupingError::InvalidClusterCount {
                requested: k,
                reason: "no vectors to cluster".to_string(),
            });
        }

        let dim = data[0].len();
        if let Some(bad) = data.iter().find(|v| v.len() != dim) {
            return Err(GroupingError::DimensionMismatch {
                expected: dim,
                actual: bad.len(),
            });
        }

        let k = self.effective_k(k, data.len())?;
        let mut rng = StdRng::seed_from_u64(self.options.seed);

        let (mut labels, mut centroids, mut inertia) = self.run_once(data, k, &mut rng);
        for run in 1..self.options.n_init {
            let candidate = self.run_once(data, k, &mut rng);
            debug!(run, inertia = candidate.2, "k-means restart finished");
            if candidate.2 < inertia {
                (labels, centroids, inertia) = candidate;
            }
        }

        let (labels, centroids) = relabel_by_first_appearance(&labels, centroids);
        let used = centroids.len();
        if used < k {
            warn!(requested = k, used, "some clusters ended up empty");
        }

        Ok(ClusterAssignment {
            labels,
            k: used,
            inertia,
            centroids,
        })
    }

    fn run_once(&self, data: &[Vec<f32>], k: usize, rng: &mut StdRng) -> (Vec<usize>, Vec<Vec<f32>>, f32) {
        let dim = data[0].len();
        let mut centroids = init_plus_plus(data, k, rng);
        let mut labels = vec![usize::MAX; data.len()];

        for _ in 0..self.options.max_iterations {
            let changed = assign(data, &centroids, &mut labels);

            let mut sums = vec![vec![0.0f32; dim]; k];
            let mut counts = vec![0usize; k];
            for (point, &label) in data.iter().zip(labels.iter()) {
                for (acc, value) in sums[label].iter_mut().zip(point) {
                    *acc += value;
                }
                counts[label] += 1;
            }

            let mut next: Vec<Vec<f32>> = sums
                .into_iter()
                .zip(counts.iter())
                .zip(centroids.iter())
                .map(|((sum, &count), old)| {
                    if count == 0 {
                        old.clone()
                    } else {
                        sum.into_iter().map(|s| s / count as f32).collect()
                    }
                })
                .collect();

            // Empty clusters take over the point worst served by its centroid
            let mut taken = Vec::new();
            for cluster in 0..k {
                if counts[cluster] > 0 {
                    continue;
                }
                let farthest = (0..data.len())
                    .filter(|i| !taken.contains(i))
                    .map(|i| (i, distance_sq(&data[i], &next[labels[i]])))
                    .fold(None, |acc: Option<(usize, f32)>, (i, d)| match acc {
                        Some((_, best)) if best >= d => acc,
                        _ => Some((i, d)),
                    });
                if let Some((i, _)) = farthest {
                    next[cluster] = data[i].clone();
                    labels[i] = cluster;
                    taken.push(i);
                }
            }

            let shift: f32 = centroids
                .iter()
                .zip(next.iter())
                .map(|(a, b)| distance_sq(a, b))
                .sum();
            centroids = next;

            if (!changed && taken.is_empty()) || shift <= self.options.tolerance {
                break;
            }
        }

        assign(data, &centroids, &mut labels);
        let inertia = data
            .iter()
            .zip(labels.iter())
            .map(|(point, &label)| distance_sq(point, &centroids[label]))
            .sum();

        (labels, centroids, inertia)
    }
}

/// k-means++: each new centre is drawn with probability proportional to
/// its squared distance from the closest centre chosen so far
fn init_plus_plus(data: &[Vec<f32>], k: usize, rng: &mut StdRng) -> Vec<Vec<f32>> {
    let mut centroids = Vec::with_capacity(k);
    centroids.push(data[rng.gen_range(0..data.len())].clone());

    let mut closest: Vec<f64> = data
        .iter()
        .map(|p| distance_sq(p, &centroids[0]) as f64)
        .collect();

    while centroids.len() < k {
        let total: f64 = closest.iter().sum();
        let index = if total <= 0.0 {
            rng.gen_range(0..data.len())
        } else {
            let mut target = rng.gen::<f64>() * total;
            let mut chosen = data.len() - 1;
            for (i, d) in closest.iter().enumerate() {
                if target < *d {
                    chosen = i;
                    break;
                }
                target -= d;
            }
            chosen
        };

        let centre = data[index].clone();
        for (d, p) in closest.iter_mut().zip(data) {
            *d = d.min(distance_sq(p, &centre) as f64);
        }
        centroids.push(centre);
    }

    centroids
}

/// Assign every point to its nearest centroid; returns whether any label changed
fn assign(data: &[Vec<f32>], centroids: &[Vec<f32>], labels: &mut [usize]) -> bool {
    let mut changed = false;
    for (point, label) in data.iter().zip(labels.iter_mut()) {
        let mut best = 0;
        let mut best_dist = f32::MAX;
        for (j, centroid) in centroids.iter().enumerate() {
            let dist = distance_sq(point, centroid);
            if dist < best_dist {
                best_dist = dist;
                best = j;
            }
        }
        if *label != best {
            *label = best;
            changed = true;
        }
    }
    changed
}

fn relabel_by_first_appearance(labels: &[usize], centroids: Vec<Vec<f32>>) -> (Vec<usize>, Vec<Vec<f32>>) {
    let mut mapping = vec![usize::MAX; centroids.len()];
    let mut order = Vec::new();
    for &label in labels {
        if mapping[label] == usize::MAX {
            mapping[label] = order.len();
            order.push(label);
        }
    }

    let relabeled = labels.iter().map(|&l| mapping[l]).collect();
    let reordered = order.iter().map(|&old| centroids[old].clone()).collect();
    (relabeled, reordered)
}

fn distance_sq(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
}

/// Compute cosine similarity between two vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Mean cosine similarity of each member to its cluster centroid
pub fn mean_similarity_to_centroid(data: &[Vec<f32>], assignment: &ClusterAssignment) -> f32 {
    if data.is_empty() {
        return 0.0;
    }
    let total: f32 = data
        .iter()
        .zip(assignment.labels.iter())
        .map(|(point, &label)| cosine_similarity(point, &assignment.centroids[label]))
        .sum();
    total / data.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blobs() -> Vec<Vec<f32>> {
        vec![
            vec![1.0, 0.1, 0.0],
            vec![0.9, 0.0, 0.1],
            vec![0.0, 1.0, 0.9],
            vec![1.1, 0.05, 0.0],
            vec![0.1, 0.9, 1.0],
            vec![0.95, 0.1, 0.05],
        ]
    }

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.001);

        let b = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &b).abs() < 0.001);
        assert_eq!(cosine_similarity(&a, &[0.0, 0.0]), 0.0);
    }

    #[test]
    fn test_kmeans_separates_blobs() {
        let kmeans = KMeans::new(KMeansOptions::default());
        let assignment = kmeans.fit(&blobs(), 2).unwrap();

        assert_eq!(assignment.k, 2);
        assert_eq!(assignment.labels, vec![0, 0, 1, 0, 1, 0]);
        assert_eq!(assignment.sizes(), vec![4, 2]);
        assert!(mean_similarity_to_centroid(&blobs(), &assignment) > 0.9);
    }

    #[test]
    fn test_kmeans_is_deterministic() {
        let data: Vec<Vec<f32>> = (0..40)
            .map(|i| {
                let x = i as f32;
                vec![(x * 0.37).sin(), (x * 0.11).cos(), (x % 7.0) / 7.0]
            })
            .collect();

        let kmeans = KMeans::new(KMeansOptions::default());
        let first = kmeans.fit(&data, 4).unwrap();
        let second = kmeans.fit(&data, 4).unwrap();
        assert_eq!(first.labels, second.labels);
        assert_eq!(first.inertia, second.inertia);
        assert!(first.labels.iter().all(|&l| l < first.k));
    }

    #[test]
    fn test_kmeans_clamps_k_to_n() {
        let kmeans = KMeans::new(KMeansOptions::default());
        let data = vec![vec![0.0, 0.0], vec![5.0, 5.0], vec![10.0, 0.0]];
        let assignment = kmeans.fit(&data, 5).unwrap();
        assert_eq!(assignment.k, 3);
        assert_eq!(assignment.labels, vec![0, 1, 2]);
    }

    #[test]
    fn test_kmeans_rejects_k_over_n() {
        let options = KMeansOptions {
            k_policy: KPolicy::Reject,
            ..KMeansOptions::default()
        };
        let kmeans = KMeans::new(options);
        let data = vec![vec![0.0], vec![1.0]];
        assert!(matches!(
            kmeans.fit(&data, 3),
            Err(GroupingError::InvalidClusterCount { requested: 3, .. })
        ));
    }

    #[test]
    fn test_kmeans_rejects_zero_k() {
        let kmeans = KMeans::new(KMeansOptions::default());
        assert!(kmeans.fit(&[vec![0.0], vec![1.0]], 0).is_err());
    }

    #[test]
    fn test_kmeans_dimension_mismatch() {
        let kmeans = KMeans::new(KMeansOptions::default());
        let data = vec![vec![0.0, 1.0], vec![1.0]];
        assert!(matches!(
            kmeans.fit(&data, 1),
            Err(GroupingError::DimensionMismatch { expected: 2, actual: 1 })
        ));
    }

    #[test]
    fn test_kmeans_identical_points_use_one_cluster() {
        let kmeans = KMeans::new(KMeansOptions::default());
        let data = vec![vec![1.0, 1.0]; 4];
        let assignment = kmeans.fit(&data, 2).unwrap();
        assert_eq!(assignment.labels, vec![0, 0, 0, 0]);
        assert_eq!(assignment.k, 1);
        assert_eq!(assignment.inertia, 0.0);
    }

    #[test]
    fn test_relabel_by_first_appearance() {
        let centroids = vec![vec![0.0], vec![1.0], vec![2.0]];
        let (labels, centroids) = relabel_by_first_appearance(&[2, 2, 0, 1, 0], centroids);
        assert_eq!(labels, vec![0, 0, 1, 2, 1]);
        assert_eq!(centroids, vec![vec![2.0], vec![0.0], vec![1.0]]);
    }
}
