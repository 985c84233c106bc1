use ndarray::ArrayView2;

use super::kmeans::squared_distance;

/// Mean silhouette over all points with Euclidean distance. A point alone in
/// its cluster scores 0, as does any labelling with fewer than two clusters.
pub fn silhouette_score(x: ArrayView2<f64>, labels: &[usize]) -> f64 {
    let n = x.nrows();
    if n == 0 || labels.len() != n {
        return 0.0;
    }
    let k = labels.iter().max().copied().unwrap_or(0) + 1;
    let mut sizes = vec![0usize; k];
    for &l in labels {
        sizes[l] += 1;
    }
    if sizes.iter().filter(|&&s| s > 0).count() < 2 {
        return 0.0;
    }

    let mut total = 0.0;
    let mut dist_sums = vec![0.0f64; k];
    for i in 0..n {
        let own = labels[i];
        if sizes[own] <= 1 {
            continue;
        }

        dist_sums.iter_mut().for_each(|d| *d = 0.0);
        for j in 0..n {
            if i != j {
                dist_sums[labels[j]] += squared_distance(x.row(i), x.row(j)).sqrt();
            }
        }

        let a = dist_sums[own] / (sizes[own] - 1) as f64;
        let b = (0..k)
            .filter(|&c| c != own && sizes[c] > 0)
            .map(|c| dist_sums[c] / sizes[c] as f64)
            .fold(f64::INFINITY, f64::min);

        let denom = a.max(b);
        if denom > 0.0 {
            total += (b - a) / denom;
        }
    }

    total / n as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_well_separated() {
        let x = array![[0.0], [0.1], [10.0], [10.1]];
        let s = silhouette_score(x.view(), &[0, 0, 1, 1]);
        assert!(s > 0.98, "silhouette {s}");
    }

    #[test]
    fn test_singleton_scores_zero() {
        let x = array![[0.0], [1.0], [10.0]];
        let s = silhouette_score(x.view(), &[0, 0, 1]);
        // point 0: a=1, b=10; point 1: a=1, b=9; point 2 alone
        let expected = (0.9 + 8.0 / 9.0) / 3.0;
        assert!((s - expected).abs() < 1e-12, "{s} vs {expected}");
    }

    #[test]
    fn test_single_cluster() {
        let x = array![[0.0], [1.0], [2.0]];
        assert_eq!(silhouette_score(x.view(), &[0, 0, 0]), 0.0);
        assert_eq!(silhouette_score(x.view(), &[1, 1, 1]), 0.0);
    }

    #[test]
    fn test_bad_labelling_negative() {
        let x = array![[0.0], [10.0], [0.1], [10.1]];
        let s = silhouette_score(x.view(), &[0, 0, 1, 1]);
        assert!(s < 0.0);
        assert!(s >= -1.0);
    }
}
