pub mod kmeans;
pub mod silhouette;

use log::{debug, info};
use ndarray::{Array1, Array2, Axis};
use powerstat_db::models::Draw;
use rayon::prelude::*;

use crate::config::{ClusterConfig, MAX_K};
use crate::error::{EngineError, Result};
use crate::features::{self, CLUSTER_FEATURE_NAMES, FeatureVector};
use kmeans::KMeans;
use silhouette::silhouette_score;

pub const MIN_DRAWS: usize = 4;
/// Raw feature values are clipped to ±CLIP before standardizing.
pub const CLIP: f64 = 1e6;

#[derive(Debug, Clone, PartialEq)]
pub struct KScore {
    pub k: usize,
    pub silhouette: f64,
    pub inertia: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClusterProfile {
    pub cluster: usize,
    pub size: usize,
    pub mean_sum: f64,
    pub mean_even: f64,
    pub mean_consecutive: f64,
    pub mean_prime: f64,
}

#[derive(Debug, Clone)]
pub struct ClusterReport {
    pub k: usize,
    pub scores: Vec<KScore>,
    /// One label in `0..k` per draw, in input order.
    pub labels: Vec<usize>,
    /// Standardized matrix the labels were fitted on, one row per draw.
    pub standardized: Array2<f64>,
    pub profiles: Vec<ClusterProfile>,
}

impl ClusterReport {
    pub fn score(&self, k: usize) -> Option<&KScore> {
        self.scores.iter().find(|s| s.k == k)
    }
}

/// Sweeps k over the configured range and keeps the partition with the best
/// silhouette.
#[derive(Debug, Clone, Default)]
pub struct ClusterSelector {
    config: ClusterConfig,
}

impl ClusterSelector {
    pub fn new(config: ClusterConfig) -> Self {
        Self { config }
    }

    pub fn select(&self, features: &[FeatureVector]) -> Result<ClusterReport> {
        let n = features.len();
        if n < MIN_DRAWS {
            return Err(EngineError::InsufficientData {
                needed: MIN_DRAWS,
                got: n,
            });
        }

        let k_min = self.config.k_min;
        let k_max = self.config.k_max.min(MAX_K).min(n - 1);
        if k_min > k_max {
            return Err(EngineError::InsufficientData {
                needed: k_min + 1,
                got: n,
            });
        }

        let standardized = standardize(&feature_matrix(features));

        let mut fits: Vec<(KScore, Vec<usize>)> = (k_min..=k_max)
            .into_par_iter()
            .map(|k| -> Result<(KScore, Vec<usize>)> {
                let fit = KMeans::new(k, &self.config).fit(standardized.view())?;
                let silhouette = silhouette_score(standardized.view(), &fit.labels);
                debug!(
                    "k={k}: silhouette={silhouette:.4} inertia={:.2} iterations={}",
                    fit.inertia, fit.iterations
                );
                Ok((
                    KScore {
                        k,
                        silhouette,
                        inertia: fit.inertia,
                    },
                    fit.labels,
                ))
            })
            .collect::<Result<Vec<_>>>()?;

        // first k with a strictly greater silhouette wins
        let mut best = 0;
        for (i, (score, _)) in fits.iter().enumerate() {
            if score.silhouette > fits[best].0.silhouette {
                best = i;
            }
        }
        let (chosen, labels) = fits.swap_remove(best);
        let mut scores: Vec<KScore> = fits.into_iter().map(|(s, _)| s).collect();
        scores.push(chosen.clone());
        scores.sort_by_key(|s| s.k);

        info!("chose k={} (silhouette {:.4}) over {n} draws", chosen.k, chosen.silhouette);

        let profiles = profiles(features, &labels, chosen.k);
        Ok(ClusterReport {
            k: chosen.k,
            scores,
            labels,
            standardized,
            profiles,
        })
    }
}

/// Extracts features from `draws` (date ascending) and clusters them.
pub fn cluster_draws(draws: &[Draw], config: &ClusterConfig) -> Result<ClusterReport> {
    let features = features::extract_all(draws)?;
    ClusterSelector::new(config.clone()).select(&features)
}

/// Clustering columns, non-finite values zeroed and everything clipped to ±CLIP.
pub fn feature_matrix(features: &[FeatureVector]) -> Array2<f64> {
    let mut x = Array2::<f64>::zeros((features.len(), CLUSTER_FEATURE_NAMES.len()));
    for (i, fv) in features.iter().enumerate() {
        for (j, v) in fv.cluster_features().into_iter().enumerate() {
            x[[i, j]] = if v.is_finite() { v.clamp(-CLIP, CLIP) } else { 0.0 };
        }
    }
    x
}

/// Zero mean and unit population variance per column. Constant columns are
/// only centered.
pub fn standardize(x: &Array2<f64>) -> Array2<f64> {
    let n_cols = x.ncols();
    let Some(means) = x.mean_axis(Axis(0)) else {
        return x.clone();
    };
    let stds: Array1<f64> = x.std_axis(Axis(0), 0.0);

    let mut out = x - &means;
    for j in 0..n_cols {
        let s = stds[j];
        if s > 1e-12 {
            out.column_mut(j).mapv_inplace(|v| v / s);
        }
    }
    out
}

fn profiles(features: &[FeatureVector], labels: &[usize], k: usize) -> Vec<ClusterProfile> {
    let mut profiles: Vec<ClusterProfile> = (0..k)
        .map(|cluster| ClusterProfile {
            cluster,
            size: 0,
            mean_sum: 0.0,
            mean_even: 0.0,
            mean_consecutive: 0.0,
            mean_prime: 0.0,
        })
        .collect();

    for (fv, &label) in features.iter().zip(labels) {
        let p = &mut profiles[label];
        p.size += 1;
        p.mean_sum += fv.sum as f64;
        p.mean_even += fv.even_count as f64;
        p.mean_consecutive += fv.consecutive_pairs as f64;
        p.mean_prime += fv.prime_count as f64;
    }
    for p in profiles.iter_mut().filter(|p| p.size > 0) {
        let n = p.size as f64;
        p.mean_sum /= n;
        p.mean_even /= n;
        p.mean_consecutive /= n;
        p.mean_prime /= n;
    }
    profiles
}
