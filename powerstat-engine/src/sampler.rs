use log::warn;
use powerstat_db::models::{Domain, WHITE_PICK};
use rand::distr::weighted::WeightedIndex;
use rand::prelude::Distribution;
use rand::{Rng, RngExt};
use serde::{Deserialize, Serialize};

use crate::config::SamplerConfig;
use crate::error::{EngineError, Result};
use crate::heat::{HeatTable, Temperature};

/// Preferred values per sorted position, lowest position first.
pub const FIXED_POSITION_TABLE: [[u8; 5]; WHITE_PICK] = [
    [1, 2, 3, 5, 4],
    [12, 21, 28, 16, 15],
    [37, 33, 35, 34, 32],
    [52, 53, 45, 47, 39],
    [69, 59, 58, 67, 68],
];

/// Repetition weight given to each temperature class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryWeights {
    pub hot: u32,
    pub neutral: u32,
    pub cold: u32,
}

impl CategoryWeights {
    pub const fn new(hot: u32, neutral: u32, cold: u32) -> Self {
        Self { hot, neutral, cold }
    }

    /// Same weights with hot and cold swapped.
    pub fn mirrored(self) -> Self {
        Self {
            hot: self.cold,
            neutral: self.neutral,
            cold: self.hot,
        }
    }

    pub fn weight(&self, temperature: Temperature) -> u32 {
        match temperature {
            Temperature::Hot => self.hot,
            Temperature::Neutral => self.neutral,
            Temperature::Cold => self.cold,
        }
    }
}

/// Numbers of one domain with positive integer weights. Selection
/// probability is proportional to weight.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedPool {
    domain: Domain,
    entries: Vec<(u8, u32)>,
}

impl WeightedPool {
    pub fn uniform(domain: Domain) -> Self {
        Self {
            domain,
            entries: domain.numbers().map(|n| (n, 1)).collect(),
        }
    }

    /// Repeated numbers have their weights summed; out-of-domain numbers and
    /// zero weights are dropped.
    pub fn from_entries(domain: Domain, entries: impl IntoIterator<Item = (u8, u32)>) -> Self {
        let mut weights = vec![0u32; domain.size()];
        for (number, weight) in entries {
            if domain.contains(number) {
                let slot = &mut weights[(number - 1) as usize];
                *slot = slot.saturating_add(weight);
            }
        }
        Self {
            domain,
            entries: domain
                .numbers()
                .zip(weights)
                .filter(|&(_, w)| w > 0)
                .collect(),
        }
    }

    pub fn by_category(table: &HeatTable, weights: CategoryWeights) -> Self {
        Self::from_entries(
            table.domain,
            table
                .stats()
                .iter()
                .map(|s| (s.number, weights.weight(table.classify(s)))),
        )
    }

    /// Weight `max(1, observed / divisor)`, integer division.
    pub fn by_frequency(table: &HeatTable, divisor: u32) -> Self {
        let divisor = divisor.max(1);
        Self::from_entries(
            table.domain,
            table
                .stats()
                .iter()
                .map(|s| (s.number, (s.observed / divisor).max(1))),
        )
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    /// Distinct numbers with positive weight.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn weight_of(&self, number: u8) -> u32 {
        self.entries
            .iter()
            .find(|&&(n, _)| n == number)
            .map(|&(_, w)| w)
            .unwrap_or(0)
    }

    pub fn total_weight(&self) -> u64 {
        self.entries.iter().map(|&(_, w)| w as u64).sum()
    }
}

/// Preferred white-ball values for each ascending rank position.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionPreferences {
    positions: [Vec<u8>; WHITE_PICK],
}

impl PositionPreferences {
    pub fn fixed() -> Self {
        Self {
            positions: FIXED_POSITION_TABLE.map(|row| row.to_vec()),
        }
    }

    pub fn from_lists(positions: [Vec<u8>; WHITE_PICK]) -> Self {
        Self { positions }
    }

    pub fn position(&self, index: usize) -> &[u8] {
        &self.positions[index]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeightedSampler {
    max_attempts: usize,
}

impl Default for WeightedSampler {
    fn default() -> Self {
        Self::from_config(&SamplerConfig::default())
    }
}

impl WeightedSampler {
    pub fn new(max_attempts: usize) -> Self {
        Self { max_attempts }
    }

    pub fn from_config(config: &SamplerConfig) -> Self {
        Self::new(config.max_attempts)
    }

    /// `count` distinct values, ascending. Draws from the pool until enough
    /// distinct values are accepted or the attempt budget runs out, then
    /// completes uniformly from the unused part of the domain.
    pub fn draw_distinct(&self, pool: &WeightedPool, count: usize, rng: &mut impl Rng) -> Result<Vec<u8>> {
        let domain = pool.domain();
        if count > domain.size() {
            return Err(EngineError::ExhaustedPool {
                domain,
                requested: count,
                available: domain.size(),
            });
        }

        let mut chosen: Vec<u8> = Vec::with_capacity(count);
        let reachable = count.min(pool.len());

        if reachable > 0 {
            let weights: Vec<u32> = pool.entries.iter().map(|&(_, w)| w).collect();
            match WeightedIndex::new(&weights) {
                Ok(dist) => {
                    let mut attempts = 0;
                    while chosen.len() < reachable && attempts < self.max_attempts {
                        let number = pool.entries[dist.sample(rng)].0;
                        if !chosen.contains(&number) {
                            chosen.push(number);
                        }
                        attempts += 1;
                    }
                }
                Err(e) => warn!("{domain} pool rejected ({e}), sampling uniformly"),
            }
        }

        if chosen.len() < count {
            if pool.len() >= count {
                warn!(
                    "{domain} pool: {} of {count} values after {} attempts, completing uniformly",
                    chosen.len(),
                    self.max_attempts
                );
            } else {
                warn!(
                    "{domain} pool holds {} values, completing {} uniformly",
                    pool.len(),
                    count - chosen.len()
                );
            }
            fill_uniform(domain, &mut chosen, count, rng);
        }

        chosen.sort_unstable();
        Ok(chosen)
    }

    pub fn draw_one(&self, pool: &WeightedPool, rng: &mut impl Rng) -> Result<u8> {
        let drawn = self.draw_distinct(pool, 1, rng)?;
        Ok(drawn[0])
    }

    pub fn draw_white(&self, pool: &WeightedPool, rng: &mut impl Rng) -> Result<[u8; WHITE_PICK]> {
        let drawn = self.draw_distinct(pool, WHITE_PICK, rng)?;
        Ok(to_white_array(&drawn))
    }

    /// One value per rank position: a hot preferred value with probability
    /// `hot_probability` when the position has one, otherwise any preferred
    /// value. Duplicates are replaced uniformly from the unused domain.
    pub fn draw_positional(
        &self,
        preferences: &PositionPreferences,
        hot_numbers: &[u8],
        hot_probability: f64,
        rng: &mut impl Rng,
    ) -> Result<[u8; WHITE_PICK]> {
        if !(0.0..=1.0).contains(&hot_probability) {
            return Err(EngineError::InvalidConfig(format!(
                "hot_probability must be in [0, 1], got {hot_probability}"
            )));
        }

        let domain = Domain::WhiteBalls;
        let mut chosen: Vec<u8> = Vec::with_capacity(WHITE_PICK);

        for pos in 0..WHITE_PICK {
            let preferred: Vec<u8> = preferences
                .position(pos)
                .iter()
                .copied()
                .filter(|&n| domain.contains(n))
                .collect();
            if preferred.is_empty() {
                continue;
            }
            let hot: Vec<u8> = preferred
                .iter()
                .copied()
                .filter(|n| hot_numbers.contains(n))
                .collect();

            let pick = if !hot.is_empty() && rng.random::<f64>() < hot_probability {
                hot[rng.random_range(0..hot.len())]
            } else {
                preferred[rng.random_range(0..preferred.len())]
            };
            if !chosen.contains(&pick) {
                chosen.push(pick);
            }
        }

        fill_uniform(domain, &mut chosen, WHITE_PICK, rng);
        chosen.sort_unstable();
        Ok(to_white_array(&chosen))
    }
}

/// Tops `chosen` up to `count` with distinct values drawn uniformly from the
/// rest of the domain.
fn fill_uniform(domain: Domain, chosen: &mut Vec<u8>, count: usize, rng: &mut impl Rng) {
    let mut unused: Vec<u8> = domain.numbers().filter(|n| !chosen.contains(n)).collect();
    while chosen.len() < count && !unused.is_empty() {
        let idx = rng.random_range(0..unused.len());
        chosen.push(unused.swap_remove(idx));
    }
}

fn to_white_array(values: &[u8]) -> [u8; WHITE_PICK] {
    let mut balls = [0u8; WHITE_PICK];
    balls.copy_from_slice(&values[..WHITE_PICK]);
    balls
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Days, NaiveDate};
    use powerstat_db::models::{Draw, make_test_draws, validate_draw};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn assert_valid_white(balls: &[u8; WHITE_PICK]) {
        assert!(validate_draw(balls, 1).is_ok(), "invalid whites {:?}", balls);
        assert!(balls.windows(2).all(|w| w[0] < w[1]), "not ascending {:?}", balls);
    }

    #[test]
    fn test_uniform_draw_valid() {
        let sampler = WeightedSampler::default();
        let pool = WeightedPool::uniform(Domain::WhiteBalls);
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..200 {
            let balls = sampler.draw_white(&pool, &mut rng).unwrap();
            assert_valid_white(&balls);
        }
    }

    #[test]
    fn test_powerball_in_range() {
        let sampler = WeightedSampler::default();
        let pool = WeightedPool::uniform(Domain::Powerball);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let pb = sampler.draw_one(&pool, &mut rng).unwrap();
            assert!((1..=26).contains(&pb));
        }
    }

    #[test]
    fn test_seed_reproducible() {
        let sampler = WeightedSampler::default();
        let table = HeatTable::compute(&make_test_draws(100), Domain::WhiteBalls).unwrap();
        let pool = WeightedPool::by_frequency(&table, 10);

        let mut a = StdRng::seed_from_u64(99);
        let mut b = StdRng::seed_from_u64(99);
        for _ in 0..20 {
            assert_eq!(
                sampler.draw_white(&pool, &mut a).unwrap(),
                sampler.draw_white(&pool, &mut b).unwrap()
            );
        }
    }

    #[test]
    fn test_small_pool_completed_from_domain() {
        let sampler = WeightedSampler::default();
        let pool = WeightedPool::from_entries(Domain::WhiteBalls, [(10, 70), (20, 70)]);
        assert_eq!(pool.len(), 2);

        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..50 {
            let balls = sampler.draw_white(&pool, &mut rng).unwrap();
            assert_valid_white(&balls);
            assert!(balls.contains(&10));
            assert!(balls.contains(&20));
        }
    }

    #[test]
    fn test_empty_pool_falls_back_to_uniform() {
        let sampler = WeightedSampler::new(10);
        let pool = WeightedPool::from_entries(Domain::WhiteBalls, [(5, 0), (70, 3)]);
        assert!(pool.is_empty());

        let mut rng = StdRng::seed_from_u64(11);
        let balls = sampler.draw_white(&pool, &mut rng).unwrap();
        assert_valid_white(&balls);
    }

    #[test]
    fn test_exhausted_only_when_domain_too_small() {
        let sampler = WeightedSampler::default();
        let pool = WeightedPool::uniform(Domain::Powerball);
        let mut rng = StdRng::seed_from_u64(1);

        let all = sampler.draw_distinct(&pool, 26, &mut rng).unwrap();
        assert_eq!(all, (1..=26).collect::<Vec<u8>>());

        let err = sampler.draw_distinct(&pool, 27, &mut rng).unwrap_err();
        assert!(matches!(
            err,
            EngineError::ExhaustedPool { domain: Domain::Powerball, requested: 27, available: 26 }
        ));
    }

    #[test]
    fn test_heavy_weight_dominates() {
        let sampler = WeightedSampler::default();
        let pool = WeightedPool::from_entries(
            Domain::WhiteBalls,
            Domain::WhiteBalls.numbers().map(|n| (n, if n == 7 { 1000 } else { 1 })),
        );
        let mut rng = StdRng::seed_from_u64(5);
        let hits = (0..100)
            .filter(|_| sampler.draw_white(&pool, &mut rng).unwrap().contains(&7))
            .count();
        assert!(hits >= 95, "number 7 only drawn {hits} times");
    }

    #[test]
    fn test_frequency_weights() {
        let draws = make_test_draws(120);
        let table = HeatTable::compute(&draws, Domain::Powerball).unwrap();
        let pool = WeightedPool::by_frequency(&table, 5);
        assert_eq!(pool.len(), 26);
        for s in table.stats() {
            assert_eq!(pool.weight_of(s.number), (s.observed / 5).max(1));
        }
    }

    #[test]
    fn test_white_hot_pool_uses_white_threshold() {
        // every white ball 5 times, then 7 gains 4 draws: z = 4 / sqrt(5) ≈ 1.79
        let start = NaiveDate::from_ymd_opt(2021, 1, 2).unwrap();
        let mut draws: Vec<Draw> = (0..69u8)
            .map(|i| Draw {
                date: start + Days::new(i as u64 * 3),
                white_balls: std::array::from_fn(|j| (i + j as u8) % 69 + 1),
                powerball: i % 26 + 1,
                multiplier: None,
            })
            .collect();
        for i in [10, 20, 30, 40] {
            draws[i].white_balls[0] = 7;
        }
        let table = HeatTable::compute(&draws, Domain::WhiteBalls).unwrap();
        let z = table.get(7).unwrap().z_score;
        assert!(z > 1.5 && z < 2.0, "z = {z}");

        let weights = CategoryWeights::new(40, 10, 0);
        let hot_pool = WeightedPool::by_category(&table, weights);
        assert_eq!(hot_pool.weight_of(7), 10);
        assert!(table.numbers_with(Temperature::Hot).is_empty());

        let loose = table.with_hot_z(1.5);
        assert_eq!(WeightedPool::by_category(&loose, weights).weight_of(7), 40);
    }

    #[test]
    fn test_category_weights() {
        let weights = CategoryWeights::new(40, 10, 0);
        assert_eq!(weights.mirrored(), CategoryWeights::new(0, 10, 40));
        assert_eq!(weights.weight(Temperature::Neutral), 10);

        let draws: Vec<_> = make_test_draws(60)
            .into_iter()
            .map(|mut d| {
                d.powerball = 7;
                d
            })
            .collect();
        let table = HeatTable::compute(&draws, Domain::Powerball).unwrap();

        let hot_pool = WeightedPool::by_category(&table, weights);
        assert_eq!(hot_pool.len(), 1);
        assert_eq!(hot_pool.weight_of(7), 40);

        let cold_pool = WeightedPool::by_category(&table, weights.mirrored());
        assert_eq!(cold_pool.len(), 25);
        assert_eq!(cold_pool.weight_of(7), 0);
        assert_eq!(cold_pool.weight_of(1), 40);
    }

    #[test]
    fn test_from_entries_merges_and_filters() {
        let pool = WeightedPool::from_entries(Domain::Powerball, [(3, 2), (3, 5), (0, 9), (27, 9)]);
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.weight_of(3), 7);
        assert_eq!(pool.total_weight(), 7);
    }

    #[test]
    fn test_positional_prefers_hot() {
        let sampler = WeightedSampler::default();
        let prefs = PositionPreferences::fixed();
        let hot = [3, 21, 35, 47, 59];
        let mut rng = StdRng::seed_from_u64(8);
        for _ in 0..20 {
            let balls = sampler.draw_positional(&prefs, &hot, 1.0, &mut rng).unwrap();
            assert_eq!(balls, [3, 21, 35, 47, 59]);
        }
    }

    #[test]
    fn test_positional_without_hot_stays_in_preferences() {
        let sampler = WeightedSampler::default();
        let prefs = PositionPreferences::fixed();
        let mut rng = StdRng::seed_from_u64(21);
        for _ in 0..50 {
            let balls = sampler.draw_positional(&prefs, &[], 0.8, &mut rng).unwrap();
            assert_valid_white(&balls);
            for (pos, n) in balls.iter().enumerate() {
                assert!(FIXED_POSITION_TABLE[pos].contains(n), "{n} not preferred at {pos}");
            }
        }
    }

    #[test]
    fn test_positional_repairs_duplicates() {
        let sampler = WeightedSampler::default();
        let prefs = PositionPreferences::from_lists(std::array::from_fn(|_| vec![5]));
        let mut rng = StdRng::seed_from_u64(4);
        let balls = sampler.draw_positional(&prefs, &[5], 0.8, &mut rng).unwrap();
        assert_valid_white(&balls);
        assert!(balls.contains(&5));
    }

    #[test]
    fn test_positional_rejects_bad_probability() {
        let sampler = WeightedSampler::default();
        let mut rng = StdRng::seed_from_u64(4);
        assert!(matches!(
            sampler.draw_positional(&PositionPreferences::fixed(), &[], 1.5, &mut rng),
            Err(EngineError::InvalidConfig(_))
        ));
    }
}
