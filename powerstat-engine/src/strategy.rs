use std::str::FromStr;

use log::debug;
use powerstat_db::models::{Domain, Draw, WHITE_PICK};
use rand::{Rng, RngExt};
use serde::{Deserialize, Serialize};

use crate::config::{EngineConfig, PositionSource};
use crate::error::{EngineError, Result};
use crate::heat::{self, HeatReport, Temperature};
use crate::patterns::{POSITION_TOP_N, PositionFrequency};
use crate::sampler::{CategoryWeights, PositionPreferences, WeightedPool, WeightedSampler};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    HotBiased,
    ColdBiased,
    Balanced,
    FrequencyWeighted,
    PositionBased,
    Random,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 6] = [
        StrategyKind::HotBiased,
        StrategyKind::ColdBiased,
        StrategyKind::Balanced,
        StrategyKind::FrequencyWeighted,
        StrategyKind::PositionBased,
        StrategyKind::Random,
    ];

    /// Short name used on the command line.
    pub fn name(&self) -> &'static str {
        match self {
            StrategyKind::HotBiased => "hot",
            StrategyKind::ColdBiased => "cold",
            StrategyKind::Balanced => "balanced",
            StrategyKind::FrequencyWeighted => "frequency",
            StrategyKind::PositionBased => "position",
            StrategyKind::Random => "random",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            StrategyKind::HotBiased => "favours numbers drawn more often than expected",
            StrategyKind::ColdBiased => "favours numbers drawn less often than expected",
            StrategyKind::Balanced => "mixes hot and cold numbers",
            StrategyKind::FrequencyWeighted => "weights every number by its draw count",
            StrategyKind::PositionBased => "picks per sorted position from preferred values",
            StrategyKind::Random => "uniform over the whole domain",
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hot" | "hot_biased" => Ok(StrategyKind::HotBiased),
            "cold" | "cold_biased" => Ok(StrategyKind::ColdBiased),
            "balanced" => Ok(StrategyKind::Balanced),
            "frequency" | "frequency_weighted" => Ok(StrategyKind::FrequencyWeighted),
            "position" | "position_based" => Ok(StrategyKind::PositionBased),
            "random" => Ok(StrategyKind::Random),
            other => {
                let names: Vec<&str> = StrategyKind::ALL.iter().map(|k| k.name()).collect();
                Err(format!("unknown strategy '{other}' (expected one of: {})", names.join(", ")))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WhiteBias {
    Uniform,
    Category(CategoryWeights),
    Frequency { divisor: u32 },
    Position { hot_probability: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PowerballBias {
    Uniform,
    Category(CategoryWeights),
    Frequency { divisor: u32 },
}

/// Everything the sampler needs to run one named strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyProfile {
    pub kind: StrategyKind,
    pub white: WhiteBias,
    pub powerball: PowerballBias,
    /// Chance that a category powerball pool keeps its own weights rather
    /// than the mirrored ones. `None` always keeps them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub powerball_hot_ratio: Option<f64>,
}

impl StrategyProfile {
    pub fn default_for(kind: StrategyKind) -> Self {
        let (white, powerball, powerball_hot_ratio) = match kind {
            StrategyKind::HotBiased => (
                WhiteBias::Category(CategoryWeights::new(70, 4, 1)),
                PowerballBias::Category(CategoryWeights::new(40, 10, 0)),
                None,
            ),
            StrategyKind::ColdBiased => (
                WhiteBias::Category(CategoryWeights::new(1, 4, 70)),
                PowerballBias::Category(CategoryWeights::new(0, 10, 40)),
                None,
            ),
            StrategyKind::Balanced => (
                WhiteBias::Category(CategoryWeights::new(35, 4, 35)),
                PowerballBias::Category(CategoryWeights::new(40, 10, 0)),
                Some(0.6),
            ),
            StrategyKind::FrequencyWeighted => (
                WhiteBias::Frequency { divisor: 10 },
                PowerballBias::Frequency { divisor: 5 },
                None,
            ),
            StrategyKind::PositionBased => (
                WhiteBias::Position { hot_probability: 0.8 },
                PowerballBias::Frequency { divisor: 5 },
                None,
            ),
            StrategyKind::Random => (WhiteBias::Uniform, PowerballBias::Uniform, None),
        };
        Self {
            kind,
            white,
            powerball,
            powerball_hot_ratio,
        }
    }

    pub fn defaults() -> Vec<Self> {
        StrategyKind::ALL.into_iter().map(Self::default_for).collect()
    }

    pub fn validate(&self) -> Result<()> {
        let bad = |msg: String| -> Result<()> {
            Err(EngineError::InvalidConfig(format!("strategy {}: {msg}", self.kind)))
        };

        if let Some(r) = self.powerball_hot_ratio
            && !(0.0..=1.0).contains(&r)
        {
            return bad(format!("powerball_hot_ratio must be in [0, 1], got {r}"));
        }
        match self.white {
            WhiteBias::Frequency { divisor: 0 } => return bad("white frequency divisor must be >= 1".into()),
            WhiteBias::Position { hot_probability } if !(0.0..=1.0).contains(&hot_probability) => {
                return bad(format!("hot_probability must be in [0, 1], got {hot_probability}"));
            }
            _ => {}
        }
        if let PowerballBias::Frequency { divisor: 0 } = self.powerball {
            return bad("powerball frequency divisor must be >= 1".into());
        }
        Ok(())
    }
}

/// A candidate draw produced by one strategy. Whites are ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedSet {
    pub strategy: StrategyKind,
    pub white_balls: [u8; WHITE_PICK],
    pub powerball: u8,
}

/// Composition of a generated set against the heat tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetSummary {
    pub sum: u32,
    pub even_count: u8,
    pub hot: u8,
    pub neutral: u8,
    pub cold: u8,
    pub powerball_temperature: Temperature,
}

impl SetSummary {
    pub fn of(set: &GeneratedSet, heat: &HeatReport) -> Self {
        let mut summary = SetSummary {
            sum: set.white_balls.iter().map(|&n| n as u32).sum(),
            even_count: set.white_balls.iter().filter(|&&n| n % 2 == 0).count() as u8,
            hot: 0,
            neutral: 0,
            cold: 0,
            powerball_temperature: heat.powerball.temperature(set.powerball),
        };
        for &n in &set.white_balls {
            match heat.white.temperature(n) {
                Temperature::Hot => summary.hot += 1,
                Temperature::Neutral => summary.neutral += 1,
                Temperature::Cold => summary.cold += 1,
            }
        }
        summary
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub set: GeneratedSet,
    pub summary: SetSummary,
}

/// Runs named strategies over one history. Holds no state between calls;
/// all randomness comes from the generator passed in.
#[derive(Debug, Clone)]
pub struct StrategyOrchestrator {
    heat: HeatReport,
    profiles: Vec<StrategyProfile>,
    sampler: WeightedSampler,
    positions: PositionPreferences,
}

impl StrategyOrchestrator {
    pub fn new(
        heat: HeatReport,
        profiles: Vec<StrategyProfile>,
        sampler: WeightedSampler,
        positions: PositionPreferences,
    ) -> Self {
        Self {
            heat,
            profiles,
            sampler,
            positions,
        }
    }

    /// Heat tables and position preferences from `draws`, everything else from `config`.
    pub fn from_draws(draws: &[Draw], config: &EngineConfig) -> Result<Self> {
        config.validate()?;
        let heat = heat::compute_heat(draws)?.with_thresholds(&config.sampler.hot_z);
        let positions = match config.position {
            PositionSource::Fixed => PositionPreferences::fixed(),
            PositionSource::Historical => PositionFrequency::compute(draws).preferences(POSITION_TOP_N),
        };
        Ok(Self::new(
            heat,
            config.strategies.clone(),
            WeightedSampler::from_config(&config.sampler),
            positions,
        ))
    }

    pub fn heat(&self) -> &HeatReport {
        &self.heat
    }

    pub fn profiles(&self) -> &[StrategyProfile] {
        &self.profiles
    }

    /// Configured profile for `kind`, or its default.
    pub fn profile(&self, kind: StrategyKind) -> StrategyProfile {
        self.profiles
            .iter()
            .find(|p| p.kind == kind)
            .cloned()
            .unwrap_or_else(|| StrategyProfile::default_for(kind))
    }

    /// `count` candidates cycling through the configured profiles in order.
    pub fn generate(&self, count: usize, rng: &mut impl Rng) -> Result<Vec<Candidate>> {
        if self.profiles.is_empty() {
            return Err(EngineError::InvalidConfig("no strategies configured".into()));
        }
        (0..count)
            .map(|i| self.candidate(&self.profiles[i % self.profiles.len()], rng))
            .collect()
    }

    pub fn generate_with(&self, kind: StrategyKind, count: usize, rng: &mut impl Rng) -> Result<Vec<Candidate>> {
        let profile = self.profile(kind);
        profile.validate()?;
        (0..count).map(|_| self.candidate(&profile, rng)).collect()
    }

    pub fn generate_one(&self, profile: &StrategyProfile, rng: &mut impl Rng) -> Result<GeneratedSet> {
        let white_balls = match profile.white {
            WhiteBias::Uniform => self
                .sampler
                .draw_white(&WeightedPool::uniform(Domain::WhiteBalls), rng)?,
            WhiteBias::Category(weights) => self
                .sampler
                .draw_white(&WeightedPool::by_category(&self.heat.white, weights), rng)?,
            WhiteBias::Frequency { divisor } => self
                .sampler
                .draw_white(&WeightedPool::by_frequency(&self.heat.white, divisor), rng)?,
            WhiteBias::Position { hot_probability } => {
                let hot = self.heat.white.numbers_with(Temperature::Hot);
                self.sampler
                    .draw_positional(&self.positions, &hot, hot_probability, rng)?
            }
        };

        let powerball_pool = match profile.powerball {
            PowerballBias::Uniform => WeightedPool::uniform(Domain::Powerball),
            PowerballBias::Category(weights) => {
                let weights = match profile.powerball_hot_ratio {
                    Some(ratio) if rng.random::<f64>() >= ratio => weights.mirrored(),
                    _ => weights,
                };
                WeightedPool::by_category(&self.heat.powerball, weights)
            }
            PowerballBias::Frequency { divisor } => WeightedPool::by_frequency(&self.heat.powerball, divisor),
        };
        let powerball = self.sampler.draw_one(&powerball_pool, rng)?;

        debug!("{}: {:?} + {}", profile.kind, white_balls, powerball);
        Ok(GeneratedSet {
            strategy: profile.kind,
            white_balls,
            powerball,
        })
    }

    fn candidate(&self, profile: &StrategyProfile, rng: &mut impl Rng) -> Result<Candidate> {
        let set = self.generate_one(profile, rng)?;
        let summary = SetSummary::of(&set, &self.heat);
        Ok(Candidate { set, summary })
    }
}
