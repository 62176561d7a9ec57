//! Session-scoped mutable state: player progression and NPC runtime state.

use rustc_hash::FxHashSet;
use std::collections::{BTreeMap, VecDeque};

use crate::core::catalog::StoryCatalog;
use crate::core::config::EngineConfig;
use crate::schema::character::NpcId;
use crate::schema::scene::{Requirement, SceneId};
use crate::schema::view::ViewMode;

/// A bounded resource. `0 <= current <= max` after every clamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourcePool {
    pub current: i64,
    pub max: i64,
}

impl ResourcePool {
    pub fn new(current: i64, max: i64) -> Self {
        let mut pool = Self { current, max };
        pool.clamp();
        pool
    }

    pub fn clamp(&mut self) {
        self.current = self.current.clamp(0, self.max.max(0));
    }

    pub fn is_within_bounds(&self) -> bool {
        (0..=self.max).contains(&self.current)
    }
}

/// The protagonist's progression for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerState {
    pub experience: i64,
    pub pools: BTreeMap<String, ResourcePool>,
    /// Unbounded alignment-style counter.
    pub suspicion: i64,
    pub flags: FxHashSet<String>,
    pub current_scene: SceneId,
    pub view_mode: ViewMode,
    /// Only meaningful in `ViewMode::NpcDetail`.
    pub selected_npc: Option<NpcId>,
    /// The most recent scenes entered, oldest first.
    pub history: VecDeque<SceneId>,
    history_limit: usize,
    pub ended: bool,
}

impl PlayerState {
    pub fn new(config: &EngineConfig) -> Self {
        let pools = config
            .pools
            .iter()
            .map(|spec| (spec.name.clone(), ResourcePool::new(spec.initial, spec.max)))
            .collect();
        let mut player = Self {
            experience: 0,
            pools,
            suspicion: 0,
            flags: FxHashSet::default(),
            current_scene: config.start_scene.clone(),
            view_mode: ViewMode::Game,
            selected_npc: None,
            history: VecDeque::new(),
            history_limit: config.history_limit,
            ended: false,
        };
        player.record(config.start_scene.clone());
        player
    }

    /// Current value of a named stat, or `None` if the name is unknown.
    pub fn stat(&self, name: &str) -> Option<i64> {
        match name {
            "xp" | "experience" => Some(self.experience),
            "suspicion" => Some(self.suspicion),
            _ => self.pools.get(name).map(|pool| pool.current),
        }
    }

    /// Add `delta` to a named stat without clamping. Returns false for unknown names.
    pub fn add_to_stat(&mut self, name: &str, delta: i64) -> bool {
        match name {
            "xp" | "experience" => self.experience = self.experience.saturating_add(delta),
            "suspicion" => self.suspicion = self.suspicion.saturating_add(delta),
            _ => match self.pools.get_mut(name) {
                Some(pool) => pool.current = pool.current.saturating_add(delta),
                None => return false,
            },
        }
        true
    }

    pub fn clamp(&mut self) {
        self.experience = self.experience.max(0);
        for pool in self.pools.values_mut() {
            pool.clamp();
        }
    }

    pub fn pool(&self, name: &str) -> Option<&ResourcePool> {
        self.pools.get(name)
    }

    /// Unknown stats count as zero.
    pub fn meets(&self, requirement: &Requirement) -> bool {
        match requirement {
            Requirement::AtLeast { stat, value } => self.stat(stat).unwrap_or(0) >= *value,
            Requirement::AtMost { stat, value } => self.stat(stat).unwrap_or(0) <= *value,
            Requirement::Flag(flag) => self.flags.contains(flag),
        }
    }

    pub fn first_unmet<'a>(&self, requirements: &'a [Requirement]) -> Option<&'a Requirement> {
        requirements.iter().find(|req| !self.meets(req))
    }

    pub fn enter_scene(&mut self, scene: SceneId) {
        self.record(scene.clone());
        self.current_scene = scene;
    }

    fn record(&mut self, scene: SceneId) {
        if self.history_limit == 0 {
            return;
        }
        if self.history.len() == self.history_limit {
            self.history.pop_front();
        }
        self.history.push_back(scene);
    }
}

/// Mutable per-NPC fields cloned from the catalog at session start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NpcRuntime {
    pub stats: BTreeMap<String, i64>,
    pub current_mood: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NpcRuntimeState {
    npcs: BTreeMap<NpcId, NpcRuntime>,
}

impl NpcRuntimeState {
    pub fn from_catalog(catalog: &StoryCatalog) -> Self {
        let npcs = catalog
            .characters()
            .map(|c| {
                (
                    c.id.clone(),
                    NpcRuntime {
                        stats: c.stats.clone(),
                        current_mood: c.default_mood.clone(),
                    },
                )
            })
            .collect();
        Self { npcs }
    }

    pub fn get(&self, id: &NpcId) -> Option<&NpcRuntime> {
        self.npcs.get(id)
    }

    pub fn get_mut(&mut self, id: &NpcId) -> Option<&mut NpcRuntime> {
        self.npcs.get_mut(id)
    }

    /// NPCs in id order.
    pub fn iter(&self) -> impl Iterator<Item = (&NpcId, &NpcRuntime)> {
        self.npcs.iter()
    }

    pub fn len(&self) -> usize {
        self.npcs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.npcs.is_empty()
    }
}

/// All mutable state of one player's session. Never shared between players.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub player: PlayerState,
    pub npcs: NpcRuntimeState,
}

impl Session {
    pub fn new(catalog: &StoryCatalog, config: &EngineConfig) -> Self {
        Self {
            player: PlayerState::new(config),
            npcs: NpcRuntimeState::from_catalog(catalog),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_clamps_both_ends() {
        let mut pool = ResourcePool { current: 14, max: 10 };
        pool.clamp();
        assert_eq!(pool.current, 10);
        pool.current = -3;
        pool.clamp();
        assert_eq!(pool.current, 0);
        assert!(pool.is_within_bounds());
        assert_eq!(ResourcePool::new(12, 5).current, 5);
    }

    #[test]
    fn defaults_follow_config() {
        let player = PlayerState::new(&EngineConfig::default());
        assert_eq!(player.experience, 0);
        assert_eq!(player.suspicion, 0);
        assert_eq!(player.pool("magic"), Some(&ResourcePool { current: 10, max: 10 }));
        assert_eq!(player.current_scene, SceneId::new("start"));
        assert_eq!(player.view_mode, ViewMode::Game);
        assert_eq!(player.history, vec![SceneId::new("start")]);
        assert!(!player.ended);
    }

    #[test]
    fn stat_names_resolve() {
        let mut player = PlayerState::new(&EngineConfig::default());
        assert!(player.add_to_stat("xp", 30));
        assert!(player.add_to_stat("experience", 5));
        assert!(player.add_to_stat("suspicion", -4));
        assert!(player.add_to_stat("magic", -15));
        assert!(!player.add_to_stat("charisma", 1));
        assert_eq!(player.stat("xp"), Some(35));
        assert_eq!(player.stat("suspicion"), Some(-4));
        assert_eq!(player.stat("magic"), Some(-5));
        assert_eq!(player.stat("charisma"), None);

        player.clamp();
        assert_eq!(player.stat("magic"), Some(0));
        assert_eq!(player.stat("suspicion"), Some(-4));
    }

    #[test]
    fn requirements() {
        let mut player = PlayerState::new(&EngineConfig::default());
        player.pools.insert("magic".to_string(), ResourcePool::new(3, 10));
        let need_five = Requirement::AtLeast {
            stat: "magic".to_string(),
            value: 5,
        };
        let low_suspicion = Requirement::AtMost {
            stat: "suspicion".to_string(),
            value: 2,
        };
        let crystal = Requirement::Flag("has_crystal".to_string());

        assert!(!player.meets(&need_five));
        assert!(player.meets(&low_suspicion));
        assert!(!player.meets(&crystal));

        let reqs = vec![low_suspicion.clone(), need_five.clone(), crystal.clone()];
        assert_eq!(player.first_unmet(&reqs), Some(&need_five));

        player.flags.insert("has_crystal".to_string());
        player.pools.insert("magic".to_string(), ResourcePool::new(5, 10));
        assert_eq!(player.first_unmet(&reqs), None);
    }

    #[test]
    fn enter_scene_records_history() {
        let mut player = PlayerState::new(&EngineConfig::default());
        player.enter_scene(SceneId::new("cave"));
        assert_eq!(player.current_scene.as_str(), "cave");
        assert_eq!(player.history.len(), 2);
    }

    #[test]
    fn history_keeps_only_the_latest_entries() {
        let config = EngineConfig {
            history_limit: 3,
            ..EngineConfig::default()
        };
        let mut player = PlayerState::new(&config);
        for scene in ["cave", "start", "cave", "well"] {
            player.enter_scene(SceneId::new(scene));
        }
        assert_eq!(
            player.history,
            vec![SceneId::new("start"), SceneId::new("cave"), SceneId::new("well")]
        );

        let config = EngineConfig {
            history_limit: 0,
            ..EngineConfig::default()
        };
        let mut player = PlayerState::new(&config);
        player.enter_scene(SceneId::new("cave"));
        assert!(player.history.is_empty());
        assert_eq!(player.current_scene.as_str(), "cave");
    }
}
