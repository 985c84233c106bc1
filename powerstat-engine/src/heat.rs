use powerstat_db::models::{Domain, Draw};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ChiSquared, ContinuousCDF};

use crate::error::{EngineError, Result};

/// Heat index points per unit of z-score.
pub const HEAT_SCALE: f64 = 16.67;
pub const DEFAULT_HOT_THRESHOLD: f64 = 70.0;
pub const DEFAULT_COLD_THRESHOLD: f64 = 30.0;
pub const SIGNIFICANCE_LEVEL: f64 = 0.05;
/// |z| a white ball must exceed to join the hot or cold sampling class.
pub const WHITE_HOT_Z: f64 = 2.0;
pub const POWERBALL_HOT_Z: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HeatCategory {
    Freezing,
    Cold,
    Cool,
    Neutral,
    Warm,
    Hot,
    BlazingHot,
}

/// Lower z-score bound of each category, highest first. Anything below the
/// last bound is `Freezing`.
const CATEGORY_BOUNDS: [(f64, HeatCategory); 6] = [
    (2.0, HeatCategory::BlazingHot),
    (1.0, HeatCategory::Hot),
    (0.5, HeatCategory::Warm),
    (-0.5, HeatCategory::Neutral),
    (-1.0, HeatCategory::Cool),
    (-2.0, HeatCategory::Cold),
];

impl HeatCategory {
    /// Hottest first.
    pub const ALL: [HeatCategory; 7] = [
        HeatCategory::BlazingHot,
        HeatCategory::Hot,
        HeatCategory::Warm,
        HeatCategory::Neutral,
        HeatCategory::Cool,
        HeatCategory::Cold,
        HeatCategory::Freezing,
    ];

    pub fn from_z_score(z: f64) -> Self {
        CATEGORY_BOUNDS
            .iter()
            .find(|(lower, _)| z >= *lower)
            .map(|&(_, category)| category)
            .unwrap_or(HeatCategory::Freezing)
    }
}

impl std::fmt::Display for HeatCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            HeatCategory::BlazingHot => "Blazing Hot",
            HeatCategory::Hot => "Hot",
            HeatCategory::Warm => "Warm",
            HeatCategory::Neutral => "Neutral",
            HeatCategory::Cool => "Cool",
            HeatCategory::Cold => "Cold",
            HeatCategory::Freezing => "Freezing",
        };
        write!(f, "{label}")
    }
}

/// Coarse three-way class used to build sampling pools. Hot above
/// `+threshold`, cold below `-threshold`, both strict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Temperature {
    Hot,
    Neutral,
    Cold,
}

impl Temperature {
    pub fn from_z_score(z: f64, threshold: f64) -> Self {
        if z > threshold {
            Temperature::Hot
        } else if z < -threshold {
            Temperature::Cold
        } else {
            Temperature::Neutral
        }
    }
}

/// Per-domain z thresholds of the hot/cold sampling classes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HotThresholds {
    pub white: f64,
    pub powerball: f64,
}

impl Default for HotThresholds {
    fn default() -> Self {
        Self {
            white: WHITE_HOT_Z,
            powerball: POWERBALL_HOT_Z,
        }
    }
}

impl HotThresholds {
    pub fn for_domain(&self, domain: Domain) -> f64 {
        match domain {
            Domain::WhiteBalls => self.white,
            Domain::Powerball => self.powerball,
        }
    }
}

impl std::fmt::Display for Temperature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Temperature::Hot => write!(f, "hot"),
            Temperature::Neutral => write!(f, "neutral"),
            Temperature::Cold => write!(f, "cold"),
        }
    }
}

pub fn heat_index(z_score: f64) -> f64 {
    (50.0 + z_score * HEAT_SCALE).clamp(0.0, 100.0)
}

#[derive(Debug, Clone, PartialEq)]
pub struct NumberStatistic {
    pub number: u8,
    pub observed: u32,
    pub expected: f64,
    pub deviation: f64,
    pub percentage: f64,
    pub z_score: f64,
    pub heat_index: f64,
    pub category: HeatCategory,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChiSquareTest {
    pub statistic: f64,
    pub degrees_of_freedom: usize,
    pub p_value: f64,
    pub significant: bool,
}

/// Per-number statistics of one domain, ranked by descending heat index,
/// ties by ascending number.
#[derive(Debug, Clone)]
pub struct HeatTable {
    pub domain: Domain,
    pub draw_count: usize,
    pub total_observations: u32,
    stats: Vec<NumberStatistic>,
    hot_z: f64,
}

impl HeatTable {
    pub fn compute(draws: &[Draw], domain: Domain) -> Result<Self> {
        if draws.is_empty() {
            return Err(EngineError::EmptyDataset);
        }

        let mut counts = vec![0u32; domain.size()];
        for draw in draws {
            draw.validate()?;
            for &n in domain.numbers_from(draw) {
                counts[(n - 1) as usize] += 1;
            }
        }

        let total: u32 = counts.iter().sum();
        let expected = total as f64 / domain.size() as f64;

        let mut stats: Vec<NumberStatistic> = domain
            .numbers()
            .zip(counts.iter())
            .map(|(number, &observed)| {
                let deviation = observed as f64 - expected;
                let z_score = deviation / expected.sqrt();
                NumberStatistic {
                    number,
                    observed,
                    expected,
                    deviation,
                    percentage: observed as f64 / total as f64 * 100.0,
                    z_score,
                    heat_index: heat_index(z_score),
                    category: HeatCategory::from_z_score(z_score),
                }
            })
            .collect();

        stats.sort_by(|a, b| {
            b.heat_index
                .partial_cmp(&a.heat_index)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.number.cmp(&b.number))
        });

        Ok(Self {
            domain,
            draw_count: draws.len(),
            total_observations: total,
            stats,
            hot_z: HotThresholds::default().for_domain(domain),
        })
    }

    /// Same statistics with a different hot/cold z threshold.
    pub fn with_hot_z(mut self, hot_z: f64) -> Self {
        self.hot_z = hot_z;
        self
    }

    pub fn hot_z(&self) -> f64 {
        self.hot_z
    }

    pub fn classify(&self, stat: &NumberStatistic) -> Temperature {
        Temperature::from_z_score(stat.z_score, self.hot_z)
    }

    pub fn stats(&self) -> &[NumberStatistic] {
        &self.stats
    }

    pub fn get(&self, number: u8) -> Option<&NumberStatistic> {
        self.stats.iter().find(|s| s.number == number)
    }

    pub fn hottest(&self, threshold: f64) -> Vec<&NumberStatistic> {
        self.stats.iter().filter(|s| s.heat_index > threshold).collect()
    }

    /// Coldest first.
    pub fn coldest(&self, threshold: f64) -> Vec<&NumberStatistic> {
        self.stats
            .iter()
            .rev()
            .filter(|s| s.heat_index < threshold)
            .collect()
    }

    pub fn category_counts(&self) -> Vec<(HeatCategory, usize)> {
        HeatCategory::ALL
            .iter()
            .map(|&cat| (cat, self.stats.iter().filter(|s| s.category == cat).count()))
            .collect()
    }

    /// Unknown numbers read as neutral.
    pub fn temperature(&self, number: u8) -> Temperature {
        self.get(number)
            .map(|s| self.classify(s))
            .unwrap_or(Temperature::Neutral)
    }

    /// Numbers of the given class, ascending.
    pub fn numbers_with(&self, temperature: Temperature) -> Vec<u8> {
        let mut numbers: Vec<u8> = self
            .stats
            .iter()
            .filter(|s| self.classify(s) == temperature)
            .map(|s| s.number)
            .collect();
        numbers.sort_unstable();
        numbers
    }

    /// Observed count per number, indexed by `number - 1`.
    pub fn observed_counts(&self) -> Vec<u32> {
        let mut counts = vec![0u32; self.domain.size()];
        for s in &self.stats {
            counts[(s.number - 1) as usize] = s.observed;
        }
        counts
    }

    /// Pearson chi-square goodness of fit against the uniform distribution.
    pub fn chi_square(&self) -> ChiSquareTest {
        let statistic: f64 = self
            .stats
            .iter()
            .map(|s| s.deviation * s.deviation / s.expected)
            .sum();
        let df = self.domain.size() - 1;
        let p_value = ChiSquared::new(df as f64)
            .map(|dist| dist.sf(statistic))
            .unwrap_or(f64::NAN);

        ChiSquareTest {
            statistic,
            degrees_of_freedom: df,
            p_value,
            significant: p_value < SIGNIFICANCE_LEVEL,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HeatReport {
    pub white: HeatTable,
    pub powerball: HeatTable,
}

impl HeatReport {
    pub fn with_thresholds(self, thresholds: &HotThresholds) -> Self {
        Self {
            white: self.white.with_hot_z(thresholds.white),
            powerball: self.powerball.with_hot_z(thresholds.powerball),
        }
    }

    pub fn table(&self, domain: Domain) -> &HeatTable {
        match domain {
            Domain::WhiteBalls => &self.white,
            Domain::Powerball => &self.powerball,
        }
    }
}

pub fn compute_heat(draws: &[Draw]) -> Result<HeatReport> {
    Ok(HeatReport {
        white: HeatTable::compute(draws, Domain::WhiteBalls)?,
        powerball: HeatTable::compute(draws, Domain::Powerball)?,
    })
}
