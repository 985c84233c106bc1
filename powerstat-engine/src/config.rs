use std::path::Path;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::heat::HotThresholds;
use crate::strategy::StrategyProfile;

/// Largest cluster count the k sweep will try.
pub const MAX_K: usize = 7;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    pub k_min: usize,
    pub k_max: usize,
    /// k-means++ restarts per k; the lowest inertia wins.
    pub n_init: usize,
    pub max_iter: usize,
    pub tolerance: f64,
    pub seed: u64,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            k_min: 2,
            k_max: MAX_K,
            n_init: 10,
            max_iter: 300,
            tolerance: 1e-4,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    /// Weighted draws per candidate set before completing uniformly.
    pub max_attempts: usize,
    /// z-score a number must exceed (in absolute value) to be hot or cold.
    pub hot_z: HotThresholds,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            max_attempts: 1000,
            hot_z: HotThresholds::default(),
        }
    }
}

/// Where the position-based strategy gets its per-position preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionSource {
    #[default]
    Fixed,
    Historical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub cluster: ClusterConfig,
    pub sampler: SamplerConfig,
    pub strategies: Vec<StrategyProfile>,
    pub position: PositionSource,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cluster: ClusterConfig::default(),
            sampler: SamplerConfig::default(),
            strategies: StrategyProfile::defaults(),
            position: PositionSource::default(),
        }
    }
}

impl EngineConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: EngineConfig = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults when `path` does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            debug!("no config at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let c = &self.cluster;
        if c.k_min < 2 {
            return Err(invalid(format!("cluster.k_min must be at least 2, got {}", c.k_min)));
        }
        if c.k_min > c.k_max {
            return Err(invalid(format!(
                "cluster.k_min ({}) exceeds cluster.k_max ({})",
                c.k_min, c.k_max
            )));
        }
        if c.k_max > MAX_K {
            return Err(invalid(format!(
                "cluster.k_max must be at most {MAX_K}, got {}",
                c.k_max
            )));
        }
        if c.n_init == 0 {
            return Err(invalid("cluster.n_init must be at least 1".into()));
        }
        if c.max_iter == 0 {
            return Err(invalid("cluster.max_iter must be at least 1".into()));
        }
        if c.tolerance.is_nan() || c.tolerance < 0.0 {
            return Err(invalid(format!("cluster.tolerance must be >= 0, got {}", c.tolerance)));
        }
        if self.sampler.max_attempts == 0 {
            return Err(invalid("sampler.max_attempts must be at least 1".into()));
        }
        for (name, z) in [
            ("white", self.sampler.hot_z.white),
            ("powerball", self.sampler.hot_z.powerball),
        ] {
            if !z.is_finite() || z <= 0.0 {
                return Err(invalid(format!("sampler.hot_z.{name} must be > 0, got {z}")));
            }
        }
        if self.strategies.is_empty() {
            return Err(invalid("at least one strategy is required".into()));
        }
        for profile in &self.strategies {
            profile.validate()?;
        }
        Ok(())
    }
}

fn invalid(msg: String) -> EngineError {
    EngineError::InvalidConfig(msg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::StrategyKind;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir()
            .join(format!("powerstat-test-{}", std::process::id()))
            .join(name)
    }

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.cluster.k_min, 2);
        assert_eq!(config.cluster.k_max, 7);
        assert_eq!(config.cluster.n_init, 10);
        assert_eq!(config.cluster.seed, 42);
        assert_eq!(config.sampler.max_attempts, 1000);
        assert_eq!(config.sampler.hot_z.white, 2.0);
        assert_eq!(config.sampler.hot_z.powerball, 1.5);
        assert_eq!(config.strategies.len(), 6);
        assert_eq!(config.position, PositionSource::Fixed);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serde_roundtrip() {
        let config = EngineConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let restored: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, config);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{ "cluster": { "seed": 7 }, "position": "historical" }"#;
        let config: EngineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.cluster.seed, 7);
        assert_eq!(config.cluster.k_max, 7);
        assert_eq!(config.position, PositionSource::Historical);
        assert_eq!(config.strategies.len(), 6);
    }

    #[test]
    fn test_partial_hot_z() {
        let json = r#"{ "sampler": { "hot_z": { "white": 1.0 } } }"#;
        let config: EngineConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.sampler.hot_z.white, 1.0);
        assert_eq!(config.sampler.hot_z.powerball, 1.5);
        assert_eq!(config.sampler.max_attempts, 1000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_hot_z() {
        let mut config = EngineConfig::default();
        config.sampler.hot_z.white = 0.0;
        assert!(matches!(config.validate(), Err(EngineError::InvalidConfig(_))));

        let mut config = EngineConfig::default();
        config.sampler.hot_z.powerball = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_cluster_bounds() {
        let mut config = EngineConfig::default();
        config.cluster.k_min = 1;
        assert!(matches!(config.validate(), Err(EngineError::InvalidConfig(_))));

        let mut config = EngineConfig::default();
        config.cluster.k_min = 5;
        config.cluster.k_max = 4;
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        config.cluster.n_init = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_large_k_max() {
        let mut config = EngineConfig::default();
        config.cluster.k_max = MAX_K;
        assert!(config.validate().is_ok());

        config.cluster.k_max = MAX_K + 1;
        assert!(matches!(config.validate(), Err(EngineError::InvalidConfig(_))));

        let json = r#"{ "cluster": { "k_max": 50 } }"#;
        let config: EngineConfig = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_strategies() {
        let mut config = EngineConfig::default();
        config.strategies.clear();
        assert!(config.validate().is_err());

        let mut config = EngineConfig::default();
        let mut profile = StrategyProfile::default_for(StrategyKind::Balanced);
        profile.powerball_hot_ratio = Some(1.5);
        config.strategies = vec![profile];
        assert!(matches!(config.validate(), Err(EngineError::InvalidConfig(_))));
    }

    #[test]
    fn test_save_and_load() {
        let path = temp_path("config.json");
        let mut config = EngineConfig::default();
        config.cluster.seed = 1234;
        config.save(&path).unwrap();

        let loaded = EngineConfig::load(&path).unwrap();
        assert_eq!(loaded, config);

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let path = temp_path("does-not-exist.json");
        let config = EngineConfig::load_or_default(&path).unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_load_invalid_json() {
        let path = temp_path("broken.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(EngineConfig::load(&path), Err(EngineError::Json(_))));
        let _ = std::fs::remove_file(&path);
    }
}
