use chrono::{Datelike, NaiveDate, Weekday};
use powerstat_db::models::{Draw, WHITE_PICK};

use crate::error::Result;

pub const PRIMES: [u8; 19] = [2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67];
pub const FIBONACCI: [u8; 9] = [1, 2, 3, 5, 8, 13, 21, 34, 55];

/// Numbers up to this value count as "low", above it as "high".
pub const LOW_MAX: u8 = 34;
/// low/high ratio reported when a draw has no high number.
pub const LOW_HIGH_CAP: f64 = 5.0;

pub const SHORT_WINDOW: usize = 10;
pub const LONG_WINDOW: usize = 50;

/// Columns fed to the cluster selector, in matrix order.
pub const CLUSTER_FEATURE_NAMES: &[&str] = &[
    "sum",
    "mean",
    "std",
    "range",
    "even_count",
    "consecutive_pairs",
    "gap_variance",
    "low_high_ratio",
    "prime_count",
];

#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    pub date: NaiveDate,
    pub sum: u32,
    pub mean: f64,
    pub std: f64,
    pub range: u8,
    pub even_count: u8,
    pub odd_count: u8,
    pub consecutive_pairs: u8,
    pub gap_variance: f64,
    pub low_high_ratio: f64,
    pub prime_count: u8,
    pub fibonacci_count: u8,
    pub day_of_week: Weekday,
    pub month: u32,
    pub year: i32,
    pub days_since_last: i64,
    pub rolling: RollingStats,
}

/// Moving statistics of the white-ball sum over the window ending at the
/// current draw. `None` until the window is full.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RollingStats {
    pub sum_ma_10: Option<f64>,
    pub sum_ma_50: Option<f64>,
    pub sum_std_10: Option<f64>,
    pub sum_std_50: Option<f64>,
}

impl FeatureVector {
    pub fn cluster_features(&self) -> [f64; 9] {
        [
            self.sum as f64,
            self.mean,
            self.std,
            self.range as f64,
            self.even_count as f64,
            self.consecutive_pairs as f64,
            self.gap_variance,
            self.low_high_ratio,
            self.prime_count as f64,
        ]
    }
}

/// Extracts the features of `draw`. `preceding` holds the draws before it,
/// oldest first; only its tail is read, and it is never re-sorted.
pub fn extract_features(draw: &Draw, preceding: &[Draw]) -> Result<FeatureVector> {
    draw.validate()?;

    let sorted = draw.sorted_white_balls();
    let values: Vec<f64> = sorted.iter().map(|&n| n as f64).collect();

    let sum: u32 = sorted.iter().map(|&n| n as u32).sum();
    let mean = sum as f64 / WHITE_PICK as f64;
    let std = population_variance(&values).sqrt();
    let range = sorted[WHITE_PICK - 1] - sorted[0];

    let even_count = sorted.iter().filter(|&&n| n % 2 == 0).count() as u8;
    let odd_count = WHITE_PICK as u8 - even_count;

    let gaps: Vec<f64> = sorted.windows(2).map(|w| (w[1] - w[0]) as f64).collect();
    let consecutive_pairs = gaps.iter().filter(|&&g| g == 1.0).count() as u8;
    let gap_variance = population_variance(&gaps);

    let low_count = sorted.iter().filter(|&&n| n <= LOW_MAX).count();
    let high_count = WHITE_PICK - low_count;
    let low_high_ratio = if high_count == 0 {
        LOW_HIGH_CAP
    } else {
        low_count as f64 / high_count as f64
    };

    let prime_count = sorted.iter().filter(|n| PRIMES.contains(n)).count() as u8;
    let fibonacci_count = sorted.iter().filter(|n| FIBONACCI.contains(n)).count() as u8;

    let days_since_last = preceding
        .last()
        .map(|prev| (draw.date - prev.date).num_days())
        .unwrap_or(0);

    Ok(FeatureVector {
        date: draw.date,
        sum,
        mean,
        std,
        range,
        even_count,
        odd_count,
        consecutive_pairs,
        gap_variance,
        low_high_ratio,
        prime_count,
        fibonacci_count,
        day_of_week: draw.date.weekday(),
        month: draw.date.month(),
        year: draw.date.year(),
        days_since_last,
        rolling: rolling_stats(sum, preceding),
    })
}

/// One feature vector per draw. `draws` must already be sorted by date ascending.
pub fn extract_all(draws: &[Draw]) -> Result<Vec<FeatureVector>> {
    draws
        .iter()
        .enumerate()
        .map(|(i, draw)| extract_features(draw, &draws[..i]))
        .collect()
}

fn rolling_stats(current_sum: u32, preceding: &[Draw]) -> RollingStats {
    let (ma_10, std_10) = window_stats(current_sum, preceding, SHORT_WINDOW);
    let (ma_50, std_50) = window_stats(current_sum, preceding, LONG_WINDOW);
    RollingStats {
        sum_ma_10: ma_10,
        sum_ma_50: ma_50,
        sum_std_10: std_10,
        sum_std_50: std_50,
    }
}

/// Mean and sample standard deviation of the last `window` sums, current draw included.
fn window_stats(current_sum: u32, preceding: &[Draw], window: usize) -> (Option<f64>, Option<f64>) {
    if window < 2 || preceding.len() + 1 < window {
        return (None, None);
    }
    let sums: Vec<f64> = preceding[preceding.len() + 1 - window..]
        .iter()
        .map(|d| d.white_balls.iter().map(|&n| n as f64).sum::<f64>())
        .chain(std::iter::once(current_sum as f64))
        .collect();

    let n = sums.len() as f64;
    let mean = sums.iter().sum::<f64>() / n;
    let variance = sums.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / (n - 1.0);
    (Some(mean), Some(variance.sqrt()))
}

/// Population variance; 0 for an empty slice.
pub fn population_variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n
}
