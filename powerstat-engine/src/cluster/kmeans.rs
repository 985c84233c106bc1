use ndarray::{Array2, ArrayView1, ArrayView2};
use rand::rngs::StdRng;
use rand::{RngExt, SeedableRng};

use crate::config::ClusterConfig;
use crate::error::{EngineError, Result};

#[derive(Debug, Clone)]
pub struct KMeansFit {
    pub labels: Vec<usize>,
    pub centroids: Array2<f64>,
    /// Sum of squared distances to the assigned centroid.
    pub inertia: f64,
    pub iterations: usize,
}

/// Lloyd's k-means with k-means++ seeding. Restart `i` is seeded with
/// `seed + i`, so a fit depends only on the data and the config.
#[derive(Debug, Clone)]
pub struct KMeans {
    k: usize,
    n_init: usize,
    max_iter: usize,
    tolerance: f64,
    seed: u64,
}

impl KMeans {
    pub fn new(k: usize, config: &ClusterConfig) -> Self {
        Self {
            k,
            n_init: config.n_init.max(1),
            max_iter: config.max_iter.max(1),
            tolerance: config.tolerance,
            seed: config.seed,
        }
    }

    /// Best of `n_init` restarts by inertia; earlier restarts win ties.
    pub fn fit(&self, x: ArrayView2<f64>) -> Result<KMeansFit> {
        let n = x.nrows();
        if self.k == 0 {
            return Err(EngineError::InvalidConfig("k must be at least 1".into()));
        }
        if n < self.k {
            return Err(EngineError::InsufficientData {
                needed: self.k,
                got: n,
            });
        }

        let mut best: Option<KMeansFit> = None;
        for init in 0..self.n_init {
            let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(init as u64));
            let fit = self.fit_single(x, &mut rng);
            if best.as_ref().is_none_or(|b| fit.inertia < b.inertia) {
                best = Some(fit);
            }
        }
        best.ok_or_else(|| EngineError::InvalidConfig("n_init must be at least 1".into()))
    }

    fn fit_single(&self, x: ArrayView2<f64>, rng: &mut StdRng) -> KMeansFit {
        let (n, dims) = x.dim();
        let mut centroids = kmeans_plus_plus(x, self.k, rng);
        let mut labels = vec![0usize; n];
        let mut iterations = 0;

        for iter in 0..self.max_iter {
            iterations = iter + 1;

            for (i, row) in x.rows().into_iter().enumerate() {
                labels[i] = nearest(row, &centroids).0;
            }

            let mut sums = Array2::<f64>::zeros((self.k, dims));
            let mut counts = vec![0usize; self.k];
            for (row, &c) in x.rows().into_iter().zip(labels.iter()) {
                counts[c] += 1;
                let mut target = sums.row_mut(c);
                target += &row;
            }

            let mut new_centroids = centroids.clone();
            for c in 0..self.k {
                if counts[c] > 0 {
                    let mean = sums.row(c).mapv(|v| v / counts[c] as f64);
                    new_centroids.row_mut(c).assign(&mean);
                }
            }

            fill_empty_clusters(x, &mut labels, &mut new_centroids);

            let shift: f64 = (0..self.k)
                .map(|c| squared_distance(centroids.row(c), new_centroids.row(c)))
                .sum();
            centroids = new_centroids;
            if shift <= self.tolerance {
                break;
            }
        }

        for (i, row) in x.rows().into_iter().enumerate() {
            labels[i] = nearest(row, &centroids).0;
        }
        fill_empty_clusters(x, &mut labels, &mut centroids);
        let inertia = x
            .rows()
            .into_iter()
            .zip(labels.iter())
            .map(|(row, &c)| squared_distance(row, centroids.row(c)))
            .sum();

        KMeansFit {
            labels,
            centroids,
            inertia,
            iterations,
        }
    }
}

/// An empty cluster takes the point farthest from its own centroid, among
/// clusters with more than one member, and is centred on it.
fn fill_empty_clusters(x: ArrayView2<f64>, labels: &mut [usize], centroids: &mut Array2<f64>) {
    let k = centroids.nrows();
    let mut counts = vec![0usize; k];
    for &c in labels.iter() {
        counts[c] += 1;
    }

    for c in 0..k {
        if counts[c] > 0 {
            continue;
        }
        let farthest = x
            .rows()
            .into_iter()
            .enumerate()
            .filter(|&(i, _)| counts[labels[i]] > 1)
            .map(|(i, row)| (i, squared_distance(row, centroids.row(labels[i]))))
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(i, _)| i);
        let Some(i) = farthest else {
            return;
        };
        counts[labels[i]] -= 1;
        labels[i] = c;
        counts[c] = 1;
        centroids.row_mut(c).assign(&x.row(i));
    }
}

/// First centroid uniform, the rest with probability proportional to the
/// squared distance to the nearest centroid chosen so far.
fn kmeans_plus_plus(x: ArrayView2<f64>, k: usize, rng: &mut StdRng) -> Array2<f64> {
    let (n, dims) = x.dim();
    let mut centroids = Array2::<f64>::zeros((k, dims));
    centroids.row_mut(0).assign(&x.row(rng.random_range(0..n)));

    let mut min_dist: Vec<f64> = x
        .rows()
        .into_iter()
        .map(|row| squared_distance(row, centroids.row(0)))
        .collect();

    for c in 1..k {
        let total: f64 = min_dist.iter().sum();
        let chosen = if total <= 0.0 {
            rng.random_range(0..n)
        } else {
            let threshold = rng.random::<f64>() * total;
            let mut cumsum = 0.0;
            let mut selected = n - 1;
            for (i, &d) in min_dist.iter().enumerate() {
                cumsum += d;
                if cumsum >= threshold && d > 0.0 {
                    selected = i;
                    break;
                }
            }
            selected
        };
        centroids.row_mut(c).assign(&x.row(chosen));

        for (i, row) in x.rows().into_iter().enumerate() {
            let d = squared_distance(row, centroids.row(c));
            if d < min_dist[i] {
                min_dist[i] = d;
            }
        }
    }

    centroids
}

/// Index of the nearest centroid and the squared distance to it. Lower
/// index wins ties.
fn nearest(row: ArrayView1<f64>, centroids: &Array2<f64>) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (c, centroid) in centroids.rows().into_iter().enumerate() {
        let d = squared_distance(row, centroid);
        if d < best.1 {
            best = (c, d);
        }
    }
    best
}

pub fn squared_distance(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}
