use std::collections::BTreeMap;

use chrono::Weekday;
use ndarray::{Array2, Axis};
use powerstat_db::models::{Domain, Draw, WHITE_PICK};

use crate::error::{EngineError, Result};
use crate::features::{self, CLUSTER_FEATURE_NAMES, FeatureVector};
use crate::sampler::PositionPreferences;

/// Preferred values kept per position for historical position preferences.
pub const POSITION_TOP_N: usize = 5;
pub const DEFAULT_RECENT_WINDOW: usize = 50;

#[derive(Debug, Clone)]
pub struct PatternReport {
    pub draw_count: usize,
    pub gap_frequency: BTreeMap<u8, u32>,
    pub run_lengths: BTreeMap<u8, u32>,
    pub positions: PositionFrequency,
    pub temporal: TemporalProfile,
    pub correlation: CorrelationMatrix,
    pub sum_bands: SumBandCounts,
    pub even_odd: Vec<(String, u32)>,
    pub recent_white: RecentFrequency,
    pub recent_powerball: RecentFrequency,
}

/// Runs every pattern analysis over `draws` (date ascending).
pub fn analyze(draws: &[Draw], recent_window: usize) -> Result<PatternReport> {
    if draws.is_empty() {
        return Err(EngineError::EmptyDataset);
    }
    let features = features::extract_all(draws)?;

    Ok(PatternReport {
        draw_count: draws.len(),
        gap_frequency: gap_frequency(draws),
        run_lengths: run_length_counts(draws),
        positions: PositionFrequency::compute(draws),
        temporal: TemporalProfile::compute(&features),
        correlation: CorrelationMatrix::compute(draws, &features),
        sum_bands: SumBandCounts::compute(&features),
        even_odd: even_odd_patterns(&features),
        recent_white: RecentFrequency::compute(draws, Domain::WhiteBalls, recent_window),
        recent_powerball: RecentFrequency::compute(draws, Domain::Powerball, recent_window),
    })
}

// ════════════════════════════════════════════════════════════════
// Gaps and runs
// ════════════════════════════════════════════════════════════════

/// Gap between sorted neighbours → occurrences across all draws.
pub fn gap_frequency(draws: &[Draw]) -> BTreeMap<u8, u32> {
    let mut freq = BTreeMap::new();
    for draw in draws {
        let sorted = draw.sorted_white_balls();
        for w in sorted.windows(2) {
            *freq.entry(w[1] - w[0]).or_insert(0) += 1;
        }
    }
    freq
}

/// Length of the longest run of consecutive values (1 when none are adjacent).
pub fn longest_run(sorted: &[u8]) -> u8 {
    let mut longest = if sorted.is_empty() { 0 } else { 1 };
    let mut current = longest;
    for w in sorted.windows(2) {
        if w[1] == w[0] + 1 {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 1;
        }
    }
    longest
}

/// Longest run length → number of draws.
pub fn run_length_counts(draws: &[Draw]) -> BTreeMap<u8, u32> {
    let mut counts = BTreeMap::new();
    for draw in draws {
        *counts.entry(longest_run(&draw.sorted_white_balls())).or_insert(0) += 1;
    }
    counts
}

// ════════════════════════════════════════════════════════════════
// Position frequency
// ════════════════════════════════════════════════════════════════

/// Per sorted position, how often each number landed there.
#[derive(Debug, Clone, Default)]
pub struct PositionFrequency {
    counts: [BTreeMap<u8, u32>; WHITE_PICK],
}

impl PositionFrequency {
    pub fn compute(draws: &[Draw]) -> Self {
        let mut freq = Self::default();
        for draw in draws {
            for (pos, n) in draw.sorted_white_balls().into_iter().enumerate() {
                *freq.counts[pos].entry(n).or_insert(0) += 1;
            }
        }
        freq
    }

    /// Most frequent numbers at `position`, count descending then number ascending.
    pub fn top(&self, position: usize, n: usize) -> Vec<(u8, u32)> {
        let mut entries: Vec<(u8, u32)> = self.counts[position].iter().map(|(&k, &v)| (k, v)).collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        entries.truncate(n);
        entries
    }

    pub fn preferences(&self, n: usize) -> PositionPreferences {
        PositionPreferences::from_lists(std::array::from_fn(|pos| {
            self.top(pos, n).into_iter().map(|(num, _)| num).collect()
        }))
    }
}

// ════════════════════════════════════════════════════════════════
// Temporal profile
// ════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GroupProfile {
    pub draws: usize,
    pub mean_sum: f64,
    pub mean_even: f64,
    pub mean_consecutive: f64,
}

impl GroupProfile {
    fn of<'a>(group: impl Iterator<Item = &'a FeatureVector>) -> Self {
        let mut profile = GroupProfile::default();
        for fv in group {
            profile.draws += 1;
            profile.mean_sum += fv.sum as f64;
            profile.mean_even += fv.even_count as f64;
            profile.mean_consecutive += fv.consecutive_pairs as f64;
        }
        if profile.draws > 0 {
            let n = profile.draws as f64;
            profile.mean_sum /= n;
            profile.mean_even /= n;
            profile.mean_consecutive /= n;
        }
        profile
    }
}

#[derive(Debug, Clone, Default)]
pub struct TemporalProfile {
    /// Monday first; weekdays without draws are omitted.
    pub by_weekday: Vec<(Weekday, GroupProfile)>,
    pub by_month: BTreeMap<u32, GroupProfile>,
    pub by_year: BTreeMap<i32, GroupProfile>,
}

impl TemporalProfile {
    pub fn compute(features: &[FeatureVector]) -> Self {
        let mut weekday = Weekday::Mon;
        let mut by_weekday = Vec::new();
        for _ in 0..7 {
            let profile = GroupProfile::of(features.iter().filter(|f| f.day_of_week == weekday));
            if profile.draws > 0 {
                by_weekday.push((weekday, profile));
            }
            weekday = weekday.succ();
        }

        let mut months: BTreeMap<u32, Vec<&FeatureVector>> = BTreeMap::new();
        let mut years: BTreeMap<i32, Vec<&FeatureVector>> = BTreeMap::new();
        for fv in features {
            months.entry(fv.month).or_default().push(fv);
            years.entry(fv.year).or_default().push(fv);
        }

        Self {
            by_weekday,
            by_month: months
                .into_iter()
                .map(|(m, group)| (m, GroupProfile::of(group.into_iter())))
                .collect(),
            by_year: years
                .into_iter()
                .map(|(y, group)| (y, GroupProfile::of(group.into_iter())))
                .collect(),
        }
    }
}

// ════════════════════════════════════════════════════════════════
// Correlation
// ════════════════════════════════════════════════════════════════

/// Pearson correlation between the clustering columns and the powerball.
/// Pairs involving a constant column read 0.
#[derive(Debug, Clone)]
pub struct CorrelationMatrix {
    pub names: Vec<&'static str>,
    pub values: Array2<f64>,
}

impl CorrelationMatrix {
    pub fn compute(draws: &[Draw], features: &[FeatureVector]) -> Self {
        let mut names: Vec<&'static str> = CLUSTER_FEATURE_NAMES.to_vec();
        names.push("powerball");
        let n_cols = names.len();
        let n_rows = features.len().min(draws.len());

        let mut x = Array2::<f64>::zeros((n_rows, n_cols));
        for (i, (fv, draw)) in features.iter().zip(draws).enumerate() {
            for (j, v) in fv.cluster_features().into_iter().enumerate() {
                x[[i, j]] = v;
            }
            x[[i, n_cols - 1]] = draw.powerball as f64;
        }

        let mut values = Array2::<f64>::eye(n_cols);
        if n_rows < 2 {
            return Self { names, values };
        }

        let means = x.mean_axis(Axis(0)).unwrap_or_else(|| ndarray::Array1::zeros(n_cols));
        let centered = &x - &means;
        let cov = centered.t().dot(&centered);

        for a in 0..n_cols {
            for b in 0..n_cols {
                if a == b {
                    continue;
                }
                let denom = (cov[[a, a]] * cov[[b, b]]).sqrt();
                values[[a, b]] = if denom > 1e-12 { cov[[a, b]] / denom } else { 0.0 };
            }
        }

        Self { names, values }
    }

    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.names.iter().position(|&n| n == a)?;
        let j = self.names.iter().position(|&n| n == b)?;
        Some(self.values[[i, j]])
    }

    /// Strongest correlations with `name` by absolute value, itself excluded.
    pub fn strongest_with(&self, name: &str, n: usize) -> Vec<(&'static str, f64)> {
        let Some(i) = self.names.iter().position(|&x| x == name) else {
            return Vec::new();
        };
        let mut row: Vec<(&'static str, f64)> = self
            .names
            .iter()
            .enumerate()
            .filter(|&(j, _)| j != i)
            .map(|(j, &other)| (other, self.values[[i, j]]))
            .collect();
        row.sort_by(|a, b| b.1.abs().partial_cmp(&a.1.abs()).unwrap_or(std::cmp::Ordering::Equal));
        row.truncate(n);
        row
    }
}

// ════════════════════════════════════════════════════════════════
// Sum bands and even/odd mix
// ════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SumBand {
    Low,
    MediumLow,
    Medium,
    MediumHigh,
    High,
}

impl SumBand {
    pub const ALL: [SumBand; 5] = [
        SumBand::Low,
        SumBand::MediumLow,
        SumBand::Medium,
        SumBand::MediumHigh,
        SumBand::High,
    ];

    pub fn bounds(&self) -> (u32, u32) {
        match self {
            SumBand::Low => (50, 99),
            SumBand::MediumLow => (100, 149),
            SumBand::Medium => (150, 199),
            SumBand::MediumHigh => (200, 249),
            SumBand::High => (250, 299),
        }
    }

    pub fn of(sum: u32) -> Option<SumBand> {
        Self::ALL.into_iter().find(|band| {
            let (lo, hi) = band.bounds();
            (lo..=hi).contains(&sum)
        })
    }
}

impl std::fmt::Display for SumBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (lo, hi) = self.bounds();
        let label = match self {
            SumBand::Low => "Low",
            SumBand::MediumLow => "Medium-Low",
            SumBand::Medium => "Medium",
            SumBand::MediumHigh => "Medium-High",
            SumBand::High => "High",
        };
        write!(f, "{label} ({lo}-{hi})")
    }
}

#[derive(Debug, Clone, Default)]
pub struct SumBandCounts {
    pub bands: Vec<(SumBand, u32)>,
    /// Sums below 50 or above 299.
    pub outside: u32,
}

impl SumBandCounts {
    pub fn compute(features: &[FeatureVector]) -> Self {
        let mut counts: BTreeMap<SumBand, u32> = SumBand::ALL.into_iter().map(|b| (b, 0)).collect();
        let mut outside = 0;
        for fv in features {
            match SumBand::of(fv.sum) {
                Some(band) => *counts.entry(band).or_insert(0) += 1,
                None => outside += 1,
            }
        }
        Self {
            bands: counts.into_iter().collect(),
            outside,
        }
    }
}

pub fn even_odd_label(even_count: u8) -> String {
    format!("{}E-{}O", even_count, WHITE_PICK as u8 - even_count)
}

/// Even/odd mix label ("2E-3O") → draws, most common first.
pub fn even_odd_patterns(features: &[FeatureVector]) -> Vec<(String, u32)> {
    let mut counts: BTreeMap<u8, u32> = BTreeMap::new();
    for fv in features {
        *counts.entry(fv.even_count).or_insert(0) += 1;
    }
    let mut patterns: Vec<(u8, u32)> = counts.into_iter().collect();
    patterns.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    patterns
        .into_iter()
        .map(|(even, count)| (even_odd_label(even), count))
        .collect()
}

// ════════════════════════════════════════════════════════════════
// Recent frequency
// ════════════════════════════════════════════════════════════════

/// Frequency over the last `window` draws only.
#[derive(Debug, Clone)]
pub struct RecentFrequency {
    pub domain: Domain,
    pub window: usize,
    /// Count per number, most frequent first, ties by ascending number.
    pub ranked: Vec<(u8, u32)>,
}

impl RecentFrequency {
    pub fn compute(draws: &[Draw], domain: Domain, window: usize) -> Self {
        let start = draws.len().saturating_sub(window);
        let recent = &draws[start..];

        let mut counts = vec![0u32; domain.size()];
        for draw in recent {
            for &n in domain.numbers_from(draw) {
                if domain.contains(n) {
                    counts[(n - 1) as usize] += 1;
                }
            }
        }

        let mut ranked: Vec<(u8, u32)> = domain.numbers().zip(counts).collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

        Self {
            domain,
            window: recent.len(),
            ranked,
        }
    }

    pub fn hottest(&self, n: usize) -> &[(u8, u32)] {
        &self.ranked[..n.min(self.ranked.len())]
    }

    /// Least frequent first.
    pub fn coldest(&self, n: usize) -> Vec<(u8, u32)> {
        self.ranked.iter().rev().take(n).copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use powerstat_db::models::make_test_draws;

    fn draw(date: &str, white_balls: [u8; 5], powerball: u8) -> Draw {
        Draw {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            white_balls,
            powerball,
            multiplier: None,
        }
    }

    #[test]
    fn test_longest_run() {
        assert_eq!(longest_run(&[1, 2, 3, 4, 5]), 5);
        assert_eq!(longest_run(&[1, 3, 5, 7, 9]), 1);
        assert_eq!(longest_run(&[1, 2, 10, 11, 12]), 3);
        assert_eq!(longest_run(&[]), 0);
    }

    #[test]
    fn test_gap_frequency_totals() {
        let draws = make_test_draws(40);
        let gaps = gap_frequency(&draws);
        assert_eq!(gaps.values().sum::<u32>(), 4 * 40);
        assert!(!gaps.contains_key(&0));
    }

    #[test]
    fn test_gap_frequency_values() {
        let draws = vec![draw("2024-01-03", [1, 2, 4, 7, 11], 1)];
        let gaps = gap_frequency(&draws);
        assert_eq!(gaps.get(&1), Some(&1));
        assert_eq!(gaps.get(&2), Some(&1));
        assert_eq!(gaps.get(&3), Some(&1));
        assert_eq!(gaps.get(&4), Some(&1));
    }

    #[test]
    fn test_run_length_counts() {
        let draws = vec![
            draw("2024-01-03", [1, 2, 3, 20, 40], 1),
            draw("2024-01-06", [5, 15, 25, 35, 45], 2),
            draw("2024-01-10", [8, 9, 30, 31, 60], 3),
        ];
        let runs = run_length_counts(&draws);
        assert_eq!(runs.get(&3), Some(&1));
        assert_eq!(runs.get(&1), Some(&1));
        assert_eq!(runs.get(&2), Some(&1));
    }

    #[test]
    fn test_position_frequency_top() {
        let draws = vec![
            draw("2024-01-03", [5, 1, 20, 40, 60], 1),
            draw("2024-01-06", [1, 10, 20, 30, 69], 2),
            draw("2024-01-10", [2, 10, 21, 30, 69], 3),
        ];
        let freq = PositionFrequency::compute(&draws);
        assert_eq!(freq.top(0, 2), vec![(1, 2), (2, 1)]);
        assert_eq!(freq.top(4, 1), vec![(69, 2)]);

        let prefs = freq.preferences(1);
        assert_eq!(prefs.position(0), &[1]);
        assert_eq!(prefs.position(3), &[30]);
    }

    #[test]
    fn test_temporal_profile_groups() {
        let draws = make_test_draws(20);
        let features = features::extract_all(&draws).unwrap();
        let profile = TemporalProfile::compute(&features);

        let days: Vec<Weekday> = profile.by_weekday.iter().map(|(d, _)| *d).collect();
        assert_eq!(days, vec![Weekday::Wed, Weekday::Sat]);
        assert_eq!(profile.by_weekday.iter().map(|(_, p)| p.draws).sum::<usize>(), 20);
        assert_eq!(profile.by_month.values().map(|p| p.draws).sum::<usize>(), 20);
        assert_eq!(profile.by_year.keys().copied().collect::<Vec<_>>(), vec![2020]);
    }

    #[test]
    fn test_correlation_matrix() {
        let draws = make_test_draws(100);
        let features = features::extract_all(&draws).unwrap();
        let corr = CorrelationMatrix::compute(&draws, &features);

        assert_eq!(corr.values.dim(), (10, 10));
        for i in 0..10 {
            assert_eq!(corr.values[[i, i]], 1.0);
            for j in 0..10 {
                let r = corr.values[[i, j]];
                assert!((-1.0 - 1e-9..=1.0 + 1e-9).contains(&r));
                assert!((r - corr.values[[j, i]]).abs() < 1e-12);
            }
        }
        // mean is sum / 5
        assert!((corr.get("sum", "mean").unwrap() - 1.0).abs() < 1e-9);

        let top = corr.strongest_with("sum", 1);
        assert_eq!(top[0].0, "mean");
    }

    #[test]
    fn test_sum_bands() {
        assert_eq!(SumBand::of(15), None);
        assert_eq!(SumBand::of(50), Some(SumBand::Low));
        assert_eq!(SumBand::of(149), Some(SumBand::MediumLow));
        assert_eq!(SumBand::of(175), Some(SumBand::Medium));
        assert_eq!(SumBand::of(299), Some(SumBand::High));
        assert_eq!(SumBand::of(300), None);

        let draws = make_test_draws(60);
        let features = features::extract_all(&draws).unwrap();
        let bands = SumBandCounts::compute(&features);
        assert_eq!(bands.bands.len(), 5);
        let total: u32 = bands.bands.iter().map(|(_, c)| c).sum::<u32>() + bands.outside;
        assert_eq!(total, 60);
    }

    #[test]
    fn test_even_odd_patterns() {
        assert_eq!(even_odd_label(2), "2E-3O");
        let draws = vec![
            draw("2024-01-03", [2, 4, 5, 7, 9], 1),
            draw("2024-01-06", [2, 4, 5, 7, 9], 1),
            draw("2024-01-10", [2, 4, 6, 7, 9], 1),
        ];
        let features = features::extract_all(&draws).unwrap();
        let patterns = even_odd_patterns(&features);
        assert_eq!(patterns, vec![("2E-3O".to_string(), 2), ("3E-2O".to_string(), 1)]);
    }

    #[test]
    fn test_recent_frequency_window() {
        let mut draws = make_test_draws(30);
        for d in draws.iter_mut().skip(20) {
            d.powerball = 9;
        }
        let recent = RecentFrequency::compute(&draws, Domain::Powerball, 10);
        assert_eq!(recent.window, 10);
        assert_eq!(recent.hottest(1), &[(9, 10)]);
        assert_eq!(recent.coldest(1)[0].1, 0);

        let all = RecentFrequency::compute(&draws, Domain::WhiteBalls, 1000);
        assert_eq!(all.window, 30);
        assert_eq!(all.ranked.iter().map(|(_, c)| c).sum::<u32>(), 150);
    }

    #[test]
    fn test_analyze_empty() {
        assert!(matches!(analyze(&[], 10), Err(EngineError::EmptyDataset)));
    }

    #[test]
    fn test_analyze_report() {
        let draws = make_test_draws(80);
        let report = analyze(&draws, DEFAULT_RECENT_WINDOW).unwrap();
        assert_eq!(report.draw_count, 80);
        assert_eq!(report.run_lengths.values().sum::<u32>(), 80);
        assert_eq!(report.even_odd.iter().map(|(_, c)| c).sum::<u32>(), 80);
        assert_eq!(report.recent_white.window, 50);
    }
}
