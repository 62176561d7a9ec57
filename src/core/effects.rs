//! Effect application, the write path from a chosen option to the next state.
//!
//! Steps run in a fixed order: player deltas, pool clamping, the NPC
//! effect, the mood rule table, then the scene transition.

use crate::core::catalog::StoryCatalog;
use crate::core::config::EngineConfig;
use crate::core::state::{NpcRuntimeState, PlayerState};
use crate::schema::character::NpcId;
use crate::schema::scene::{Choice, TerminalMarker};

/// Something noteworthy that happened while applying an option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EffectNote {
    /// A player stat name nothing in the state answers to.
    IgnoredStat(String),
    NpcStatChanged {
        npc: NpcId,
        stat: String,
        value: i64,
    },
    MoodChanged {
        npc: NpcId,
        from: String,
        to: String,
    },
    /// A rule asked for a mood the character has no media for.
    MoodRejected { npc: NpcId, mood: String },
    UnknownNpc(NpcId),
    Ended,
    Restarted,
}

/// The next state produced by `apply`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    pub player: PlayerState,
    pub npcs: NpcRuntimeState,
    pub notes: Vec<EffectNote>,
}

/// Apply a chosen option to the current state, returning the next state.
///
/// The inputs are not modified. Requirement checks are the caller's job.
pub fn apply(
    catalog: &StoryCatalog,
    config: &EngineConfig,
    player: &PlayerState,
    npcs: &NpcRuntimeState,
    choice: &Choice,
) -> Applied {
    let mut player = player.clone();
    let mut npcs = npcs.clone();
    let mut notes = Vec::new();

    // 1. Player deltas
    for (stat, delta) in &choice.effects {
        if !player.add_to_stat(stat, *delta) {
            notes.push(EffectNote::IgnoredStat(stat.clone()));
        }
    }
    player.flags.extend(choice.set_flags.iter().cloned());

    // 2. Clamp
    player.clamp();

    // 3-4. NPC effect, then mood rules for that NPC
    if let Some(ref effect) = choice.npc_effect {
        match npcs.get_mut(&effect.npc) {
            Some(runtime) => {
                let value = runtime.stats.entry(effect.stat.clone()).or_insert(0);
                *value = value.saturating_add(effect.delta);
                notes.push(EffectNote::NpcStatChanged {
                    npc: effect.npc.clone(),
                    stat: effect.stat.clone(),
                    value: *value,
                });

                if let Some(rule) = config.mood_rules.first_match(&effect.npc, &runtime.stats) {
                    let known = catalog
                        .character(&effect.npc)
                        .is_some_and(|c| c.has_mood(&rule.mood));
                    if !known {
                        tracing::warn!(
                            npc = %effect.npc,
                            mood = %rule.mood,
                            "mood transition rejected: character has no such mood"
                        );
                        notes.push(EffectNote::MoodRejected {
                            npc: effect.npc.clone(),
                            mood: rule.mood.clone(),
                        });
                    } else if runtime.current_mood != rule.mood {
                        let from = std::mem::replace(&mut runtime.current_mood, rule.mood.clone());
                        notes.push(EffectNote::MoodChanged {
                            npc: effect.npc.clone(),
                            from,
                            to: rule.mood.clone(),
                        });
                    }
                }
            }
            None => notes.push(EffectNote::UnknownNpc(effect.npc.clone())),
        }
    }

    // 5. Transition
    match choice.terminal() {
        Some(TerminalMarker::End) => {
            player.ended = true;
            notes.push(EffectNote::Ended);
        }
        Some(TerminalMarker::Restart) => {
            player.enter_scene(config.start_scene.clone());
            notes.push(EffectNote::Restarted);
        }
        None => player.enter_scene(choice.target.clone()),
    }

    Applied {
        player,
        npcs,
        notes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state::ResourcePool;
    use crate::schema::character::Character;
    use crate::schema::mood_rule::{Comparator, MoodRule, MoodRuleTable};
    use crate::schema::scene::{NpcEffect, Scene, SceneId};
    use std::collections::BTreeMap;

    fn make_catalog() -> StoryCatalog {
        let mut start = Scene::new("start", "A stone door.");
        start.options.push(Choice::new("Push", "cave"));
        let cave = Scene::new("cave", "Darkness.");
        let aiko = Character {
            id: NpcId::new("aiko"),
            name: Some("Aiko".to_string()),
            bio: String::new(),
            moods: BTreeMap::from([
                ("neutral".to_string(), "aiko/neutral.png".to_string()),
                ("altered".to_string(), "aiko/altered.png".to_string()),
            ]),
            default_mood: "neutral".to_string(),
            stats: BTreeMap::from([("mind_altered".to_string(), 4)]),
            hidden: false,
        };
        StoryCatalog::from_parts(vec![start, cave], vec![aiko]).unwrap()
    }

    fn rule(threshold: i64, mood: &str) -> MoodRule {
        MoodRule {
            stat: "mind_altered".to_string(),
            comparator: Comparator::Gt,
            threshold,
            mood: mood.to_string(),
            npc: None,
        }
    }

    fn touch_aiko(delta: i64) -> Choice {
        let mut choice = Choice::new("Talk", "cave");
        choice.npc_effect = Some(NpcEffect {
            npc: NpcId::new("aiko"),
            stat: "mind_altered".to_string(),
            delta,
        });
        choice
    }

    fn setup() -> (StoryCatalog, EngineConfig, PlayerState, NpcRuntimeState) {
        let catalog = make_catalog();
        let config = EngineConfig::default();
        let player = PlayerState::new(&config);
        let npcs = NpcRuntimeState::from_catalog(&catalog);
        (catalog, config, player, npcs)
    }

    #[test]
    fn moves_to_target() {
        let (catalog, config, player, npcs) = setup();
        let applied = apply(&catalog, &config, &player, &npcs, &Choice::new("Push", "cave"));
        assert_eq!(applied.player.current_scene, SceneId::new("cave"));
        assert_eq!(player.current_scene, SceneId::new("start"));
    }

    #[test]
    fn clamps_pools_after_deltas() {
        let (catalog, config, player, npcs) = setup();
        let mut choice = Choice::new("Overcast", "cave");
        choice.effects.insert("magic".to_string(), -25);
        choice.effects.insert("xp".to_string(), -3);
        choice.effects.insert("suspicion".to_string(), -7);
        let applied = apply(&catalog, &config, &player, &npcs, &choice);
        assert_eq!(applied.player.pool("magic"), Some(&ResourcePool { current: 0, max: 10 }));
        assert_eq!(applied.player.experience, 0);
        assert_eq!(applied.player.suspicion, -7);

        let mut choice = Choice::new("Meditate", "cave");
        choice.effects.insert("magic".to_string(), 40);
        let applied = apply(&catalog, &config, &applied.player, &npcs, &choice);
        assert_eq!(applied.player.pool("magic").unwrap().current, 10);
    }

    #[test]
    fn unknown_stats_are_ignored() {
        let (catalog, config, player, npcs) = setup();
        let mut choice = Choice::new("Flex", "cave");
        choice.effects.insert("charisma".to_string(), 3);
        let applied = apply(&catalog, &config, &player, &npcs, &choice);
        assert_eq!(applied.notes[0], EffectNote::IgnoredStat("charisma".to_string()));
        assert_eq!(applied.player.current_scene, SceneId::new("cave"));
    }

    #[test]
    fn npc_effect_triggers_mood_rule() {
        let (catalog, config, player, npcs) = setup();
        let applied = apply(&catalog, &config, &player, &npcs, &touch_aiko(2));
        let aiko = applied.npcs.get(&NpcId::new("aiko")).unwrap();
        assert_eq!(aiko.stats["mind_altered"], 6);
        assert_eq!(aiko.current_mood, "altered");
        assert!(applied.notes.contains(&EffectNote::MoodChanged {
            npc: NpcId::new("aiko"),
            from: "neutral".to_string(),
            to: "altered".to_string(),
        }));
    }

    #[test]
    fn below_threshold_keeps_mood() {
        let (catalog, config, player, npcs) = setup();
        let applied = apply(&catalog, &config, &player, &npcs, &touch_aiko(1));
        let aiko = applied.npcs.get(&NpcId::new("aiko")).unwrap();
        assert_eq!(aiko.stats["mind_altered"], 5);
        assert_eq!(aiko.current_mood, "neutral");
    }

    #[test]
    fn missing_npc_stat_starts_at_zero() {
        let (catalog, config, player, npcs) = setup();
        let mut choice = Choice::new("Gift", "cave");
        choice.npc_effect = Some(NpcEffect {
            npc: NpcId::new("aiko"),
            stat: "trust".to_string(),
            delta: 3,
        });
        let applied = apply(&catalog, &config, &player, &npcs, &choice);
        assert_eq!(applied.npcs.get(&NpcId::new("aiko")).unwrap().stats["trust"], 3);
    }

    #[test]
    fn earlier_rule_wins() {
        let (catalog, mut config, player, npcs) = setup();
        config.mood_rules = MoodRuleTable::new(vec![rule(5, "neutral"), rule(5, "altered")]);
        let mut npcs_altered = npcs.clone();
        npcs_altered
            .get_mut(&NpcId::new("aiko"))
            .unwrap()
            .current_mood = "altered".to_string();
        let applied = apply(&catalog, &config, &player, &npcs_altered, &touch_aiko(2));
        assert_eq!(
            applied.npcs.get(&NpcId::new("aiko")).unwrap().current_mood,
            "neutral"
        );
    }

    #[test]
    fn absent_mood_is_rejected() {
        let (catalog, mut config, player, npcs) = setup();
        config.mood_rules = MoodRuleTable::new(vec![rule(5, "furious")]);
        let applied = apply(&catalog, &config, &player, &npcs, &touch_aiko(2));
        let aiko = applied.npcs.get(&NpcId::new("aiko")).unwrap();
        assert_eq!(aiko.current_mood, "neutral");
        assert_eq!(aiko.stats["mind_altered"], 6);
        assert!(applied.notes.contains(&EffectNote::MoodRejected {
            npc: NpcId::new("aiko"),
            mood: "furious".to_string(),
        }));
    }

    #[test]
    fn terminal_targets() {
        let (catalog, config, player, npcs) = setup();
        let applied = apply(&catalog, &config, &player, &npcs, &Choice::new("Go", "cave"));
        let ended = apply(&catalog, &config, &applied.player, &npcs, &Choice::new("Stop", "@end"));
        assert!(ended.player.ended);
        assert_eq!(ended.player.current_scene, SceneId::new("cave"));

        let restarted = apply(
            &catalog,
            &config,
            &applied.player,
            &npcs,
            &Choice::new("Again", "@restart"),
        );
        assert_eq!(restarted.player.current_scene, SceneId::new("start"));
        assert!(restarted.notes.contains(&EffectNote::Restarted));
    }

    #[test]
    fn flags_are_set() {
        let (catalog, config, player, npcs) = setup();
        let mut choice = Choice::new("Take it", "cave");
        choice.set_flags.push("has_crystal".to_string());
        let applied = apply(&catalog, &config, &player, &npcs, &choice);
        assert!(applied.player.flags.contains("has_crystal"));
    }
}
