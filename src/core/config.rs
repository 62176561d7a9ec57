//! Engine configuration: title, start scene, resource pools and the mood rule table.

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::schema::mood_rule::{Comparator, MoodRule, MoodRuleTable};
use crate::schema::scene::SceneId;

/// Stat names with a fixed meaning that pools may not reuse.
pub const RESERVED_STATS: [&str; 3] = ["xp", "experience", "suspicion"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("invalid resource pool '{name}': initial {initial} outside 0..={max}")]
    InvalidPool { name: String, initial: i64, max: i64 },
    #[error("resource pool '{0}' is defined twice")]
    DuplicatePool(String),
    #[error("resource pool '{0}' shadows a built-in stat")]
    ReservedPoolName(String),
    #[error("experience_per_level must be positive")]
    ZeroLevelStep,
}

/// A bounded resource pool definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSpec {
    pub name: String,
    pub initial: i64,
    pub max: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub title: String,
    pub start_scene: SceneId,
    /// Shown when a scene or mood has no media of its own.
    pub placeholder_media: String,
    pub experience_per_level: u64,
    pub pools: Vec<PoolSpec>,
    pub mood_rules: MoodRuleTable,
    /// Most recent scene entries kept per session; zero keeps none.
    pub history_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            title: "My Visual Novel".to_string(),
            start_scene: SceneId::new("start"),
            placeholder_media: "placeholder.png".to_string(),
            experience_per_level: 100,
            pools: vec![PoolSpec {
                name: "magic".to_string(),
                initial: 10,
                max: 10,
            }],
            mood_rules: MoodRuleTable::new(vec![MoodRule {
                stat: "mind_altered".to_string(),
                comparator: Comparator::Gt,
                threshold: 5,
                mood: "altered".to_string(),
                npc: None,
            }]),
            history_limit: 32,
        }
    }
}

impl EngineConfig {
    /// Load a configuration from a RON file. Missing fields take their defaults.
    pub fn load_from_ron(path: &Path) -> Result<EngineConfig, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    pub fn parse_ron(input: &str) -> Result<EngineConfig, ConfigError> {
        let config: EngineConfig = ron::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.experience_per_level == 0 {
            return Err(ConfigError::ZeroLevelStep);
        }
        let mut seen = FxHashSet::default();
        for pool in &self.pools {
            if RESERVED_STATS.contains(&pool.name.as_str()) {
                return Err(ConfigError::ReservedPoolName(pool.name.clone()));
            }
            if !seen.insert(pool.name.as_str()) {
                return Err(ConfigError::DuplicatePool(pool.name.clone()));
            }
            if pool.max < 0 || pool.initial < 0 || pool.initial > pool.max {
                return Err(ConfigError::InvalidPool {
                    name: pool.name.clone(),
                    initial: pool.initial,
                    max: pool.max,
                });
            }
        }
        Ok(())
    }

    /// Level derived from experience; level 1 at zero experience.
    pub fn level_for(&self, experience: i64) -> u64 {
        let step = self.experience_per_level.max(1);
        1 + experience.max(0) as u64 / step
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.start_scene.as_str(), "start");
        assert_eq!(config.mood_rules.rules.len(), 1);
    }

    #[test]
    fn partial_ron_keeps_defaults() {
        let config = EngineConfig::parse_ron(r#"(title: "The Godot Forest")"#).unwrap();
        assert_eq!(config.title, "The Godot Forest");
        assert_eq!(config.experience_per_level, 100);
        assert_eq!(config.pools[0].name, "magic");
        assert_eq!(config.history_limit, 32);
    }

    #[test]
    fn full_ron_config() {
        let config = EngineConfig::parse_ron(
            r#"(
                title: "Test",
                start_scene: "gate",
                placeholder_media: "missing.png",
                experience_per_level: 50,
                history_limit: 4,
                pools: [
                    (name: "magic", initial: 3, max: 10),
                    (name: "stamina", initial: 5, max: 5),
                ],
                mood_rules: [
                    (stat: "trust", comparator: Ge, threshold: 3, mood: "friendly", npc: Some("ren")),
                ],
            )"#,
        )
        .unwrap();
        assert_eq!(config.start_scene.as_str(), "gate");
        assert_eq!(config.pools.len(), 2);
        assert_eq!(config.history_limit, 4);
        assert_eq!(config.mood_rules.rules[0].npc.as_ref().unwrap().as_str(), "ren");
    }

    #[test]
    fn rejects_initial_above_max() {
        let err = EngineConfig::parse_ron(r#"(pools: [(name: "magic", initial: 11, max: 10)])"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPool { .. }));
    }

    #[test]
    fn rejects_reserved_and_duplicate_pools() {
        let err = EngineConfig::parse_ron(r#"(pools: [(name: "xp", initial: 0, max: 10)])"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::ReservedPoolName(_)));

        let err = EngineConfig::parse_ron(
            r#"(pools: [(name: "magic", initial: 0, max: 1), (name: "magic", initial: 0, max: 1)])"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicatePool(_)));
    }

    #[test]
    fn rejects_zero_level_step() {
        let err = EngineConfig::parse_ron("(experience_per_level: 0)").unwrap_err();
        assert!(matches!(err, ConfigError::ZeroLevelStep));
    }

    #[test]
    fn level_curve() {
        let config = EngineConfig::default();
        assert_eq!(config.level_for(0), 1);
        assert_eq!(config.level_for(99), 1);
        assert_eq!(config.level_for(100), 2);
        assert_eq!(config.level_for(-5), 1);
    }
}
