//! K-means clustering with seeded k-means++ initialisation
//!
//! Lloyd iterations run until the total centroid shift drops below the
//! tolerance. A cluster that loses all of its members is relocated onto the
//! point farthest from its current centroid, so every run ends with `k`
//! centroids.

use crate::{matrix_width, MathError, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// K-means configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KMeansConfig {
    /// Number of clusters
    pub k: usize,
    /// Maximum Lloyd iterations per run
    pub max_iter: usize,
    /// Convergence tolerance on the summed squared centroid shift
    pub tolerance: f64,
    /// Number of independent initialisations, the lowest inertia wins
    pub n_init: usize,
    /// Seed for the initialisation
    pub seed: u64,
}

impl Default for KMeansConfig {
    fn default() -> Self {
        Self {
            k: 3,
            max_iter: 300,
            tolerance: 1e-4,
            n_init: 1,
            seed: 42,
        }
    }
}

impl KMeansConfig {
    /// Set number of clusters
    pub fn k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    /// Set maximum iterations
    pub fn max_iter(mut self, max_iter: usize) -> Self {
        self.max_iter = max_iter;
        self
    }

    /// Set number of initialisations
    pub fn n_init(mut self, n_init: usize) -> Self {
        self.n_init = n_init;
        self
    }

    /// Set random seed
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Result of a k-means fit
#[derive(Debug, Clone, PartialEq)]
pub struct KMeansFit {
    /// Cluster assignment of every point (0-indexed)
    pub labels: Vec<usize>,
    /// Final centroids
    pub centroids: Vec<Vec<f64>>,
    /// Sum of squared distances to the assigned centroid
    pub inertia: f64,
    /// Iterations used by the winning run
    pub n_iter: usize,
}

impl KMeansFit {
    /// Indices of the points assigned to `cluster`
    pub fn cluster_members(&self, cluster: usize) -> Vec<usize> {
        self.labels
            .iter()
            .enumerate()
            .filter(|(_, &l)| l == cluster)
            .map(|(i, _)| i)
            .collect()
    }

    /// Number of points in each cluster
    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.centroids.len()];
        for &label in &self.labels {
            sizes[label] += 1;
        }
        sizes
    }
}

/// K-means clustering model
#[derive(Debug, Clone)]
pub struct KMeans {
    config: KMeansConfig,
}

impl KMeans {
    /// Create a new k-means model
    pub fn new(config: KMeansConfig) -> Result<Self> {
        if config.k == 0 {
            return Err(MathError::InvalidInput(
                "Number of clusters must be positive".to_string(),
            ));
        }
        if config.max_iter == 0 || config.n_init == 0 {
            return Err(MathError::InvalidInput(
                "max_iter and n_init must be positive".to_string(),
            ));
        }
        if !(config.tolerance >= 0.0) {
            return Err(MathError::InvalidInput(
                "Tolerance must be non-negative".to_string(),
            ));
        }

        Ok(Self { config })
    }

    /// Configuration in use
    pub fn config(&self) -> &KMeansConfig {
        &self.config
    }

    /// Cluster the rows of `points`
    pub fn fit(&self, points: &[Vec<f64>]) -> Result<KMeansFit> {
        matrix_width(points)?;
        if points.len() < self.config.k {
            return Err(MathError::InsufficientData(format!(
                "Need at least {} points for {} clusters, got {}",
                self.config.k,
                self.config.k,
                points.len()
            )));
        }
        if points.iter().flatten().any(|v| !v.is_finite()) {
            return Err(MathError::InvalidInput(
                "Points contain non-finite values".to_string(),
            ));
        }

        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let mut best: Option<KMeansFit> = None;

        for _ in 0..self.config.n_init {
            let centroids = self.init_centroids(points, &mut rng);
            let fit = self.lloyd(points, centroids);
            let better = best
                .as_ref()
                .map_or(true, |current| fit.inertia < current.inertia);
            if better {
                best = Some(fit);
            }
        }

        best.ok_or_else(|| MathError::CalculationError("k-means produced no runs".to_string()))
    }

    /// k-means++ seeding: each new centroid is drawn with probability
    /// proportional to its squared distance from the nearest chosen one
    fn init_centroids(&self, points: &[Vec<f64>], rng: &mut StdRng) -> Vec<Vec<f64>> {
        let n = points.len();
        let mut centroids = Vec::with_capacity(self.config.k);
        centroids.push(points[rng.gen_range(0..n)].clone());

        while centroids.len() < self.config.k {
            let distances: Vec<f64> = points
                .iter()
                .map(|p| nearest_centroid(p, &centroids).1)
                .collect();
            let total: f64 = distances.iter().sum();

            let selected = if total > 0.0 {
                let target = rng.gen::<f64>() * total;
                let mut cumulative = 0.0;
                let mut chosen = None;
                for (i, &d) in distances.iter().enumerate() {
                    cumulative += d;
                    if d > 0.0 && cumulative > target {
                        chosen = Some(i);
                        break;
                    }
                }
                // float round-off can leave the target just past the last sum
                chosen.unwrap_or_else(|| {
                    distances
                        .iter()
                        .rposition(|&d| d > 0.0)
                        .unwrap_or(n - 1)
                })
            } else {
                rng.gen_range(0..n)
            };

            centroids.push(points[selected].clone());
        }

        centroids
    }

    fn lloyd(&self, points: &[Vec<f64>], mut centroids: Vec<Vec<f64>>) -> KMeansFit {
        let k = centroids.len();
        let width = points[0].len();
        let mut labels = assign(points, &centroids);
        let mut n_iter = 0;

        for iter in 0..self.config.max_iter {
            n_iter = iter + 1;

            let mut sums = vec![vec![0.0; width]; k];
            let mut counts = vec![0usize; k];
            for (point, &label) in points.iter().zip(labels.iter()) {
                counts[label] += 1;
                for (s, v) in sums[label].iter_mut().zip(point.iter()) {
                    *s += v;
                }
            }

            let mut updated: Vec<Vec<f64>> = sums
                .into_iter()
                .zip(counts.iter())
                .zip(centroids.iter())
                .map(|((sum, &count), old)| {
                    if count == 0 {
                        old.clone()
                    } else {
                        sum.into_iter().map(|s| s / count as f64).collect()
                    }
                })
                .collect();

            relocate_empty(points, &labels, &counts, &mut updated);

            let shift: f64 = centroids
                .iter()
                .zip(updated.iter())
                .map(|(a, b)| squared_distance(a, b))
                .sum();

            centroids = updated;
            labels = assign(points, &centroids);

            if shift <= self.config.tolerance {
                break;
            }
        }

        let inertia = points
            .iter()
            .zip(labels.iter())
            .map(|(p, &l)| squared_distance(p, &centroids[l]))
            .sum();

        KMeansFit {
            labels,
            centroids,
            inertia,
            n_iter,
        }
    }
}

/// Move every empty cluster onto the point farthest from its own centroid
fn relocate_empty(
    points: &[Vec<f64>],
    labels: &[usize],
    counts: &[usize],
    centroids: &mut [Vec<f64>],
) {
    let empty: Vec<usize> = (0..counts.len()).filter(|&c| counts[c] == 0).collect();
    if empty.is_empty() {
        return;
    }

    let mut by_distance: Vec<(usize, f64)> = points
        .iter()
        .zip(labels.iter())
        .enumerate()
        .map(|(i, (p, &l))| (i, squared_distance(p, &centroids[l])))
        .collect();
    // farthest first, lower index on ties
    by_distance.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

    for (cluster, (idx, _)) in empty.into_iter().zip(by_distance) {
        centroids[cluster] = points[idx].clone();
    }
}

fn assign(points: &[Vec<f64>], centroids: &[Vec<f64>]) -> Vec<usize> {
    points
        .iter()
        .map(|p| nearest_centroid(p, centroids).0)
        .collect()
}

/// Index of and squared distance to the nearest centroid; ties go to the lower index
fn nearest_centroid(point: &[f64], centroids: &[Vec<f64>]) -> (usize, f64) {
    let mut nearest = 0;
    let mut min_dist = f64::INFINITY;
    for (i, c) in centroids.iter().enumerate() {
        let dist = squared_distance(point, c);
        if dist < min_dist {
            min_dist = dist;
            nearest = i;
        }
    }
    (nearest, min_dist)
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_blobs() -> Vec<Vec<f64>> {
        vec![
            vec![0.0, 0.0],
            vec![0.1, 0.1],
            vec![0.2, 0.0],
            vec![5.0, 5.0],
            vec![5.1, 5.2],
            vec![5.2, 5.1],
            vec![10.0, 0.0],
            vec![10.1, 0.2],
            vec![9.9, 0.1],
        ]
    }

    #[test]
    fn test_kmeans_separates_blobs() {
        let fit = KMeans::new(KMeansConfig::default())
            .unwrap()
            .fit(&three_blobs())
            .unwrap();

        assert_eq!(fit.labels.len(), 9);
        assert_eq!(fit.cluster_sizes(), vec![3, 3, 3]);

        for blob in fit.labels.chunks(3) {
            assert!(blob.iter().all(|&l| l == blob[0]));
        }
        assert!(fit.inertia < 1.0);
    }

    #[test]
    fn test_kmeans_is_deterministic_for_seed() {
        let model = KMeans::new(KMeansConfig::default().seed(7).n_init(3)).unwrap();
        let first = model.fit(&three_blobs()).unwrap();
        let second = model.fit(&three_blobs()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_kmeans_identical_points_keeps_k_centroids() {
        let points = vec![vec![1.0, 1.0]; 4];
        let fit = KMeans::new(KMeansConfig::default()).unwrap().fit(&points).unwrap();
        assert_eq!(fit.centroids.len(), 3);
        assert_eq!(fit.inertia, 0.0);
        assert!(fit.labels.iter().all(|&l| l < 3));
    }

    #[test]
    fn test_kmeans_rejects_bad_input() {
        assert!(KMeans::new(KMeansConfig::default().k(0)).is_err());

        let model = KMeans::new(KMeansConfig::default()).unwrap();
        assert!(matches!(
            model.fit(&[vec![1.0], vec![2.0]]),
            Err(MathError::InsufficientData(_))
        ));
        assert!(matches!(
            model.fit(&[vec![1.0], vec![f64::NAN], vec![2.0]]),
            Err(MathError::InvalidInput(_))
        ));
    }
}
