//! Seeded random playthroughs.
//!
//! Feeds random intents to an engine, including locked options and
//! out-of-mode intents, and records what happened. Same seed, same walk.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeSet;

use crate::core::controller::StoryEngine;
use crate::core::state::Session;
use crate::schema::scene::SceneId;
use crate::schema::view::{PlayerIntent, ViewMode, ViewModel};

/// Summary of one random walk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalkReport {
    pub steps: usize,
    pub visited: BTreeSet<SceneId>,
    pub rejected: usize,
    pub endings: usize,
    /// Scenes reached that offered no way forward and were not endings.
    pub dead_ends: BTreeSet<SceneId>,
    /// Steps after which some resource pool was out of bounds.
    pub bound_violations: usize,
    pub anomalies: usize,
}

pub fn random_walk(
    engine: &StoryEngine,
    session: &mut Session,
    seed: u64,
    steps: usize,
) -> WalkReport {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut report = WalkReport::default();
    let mut view = engine.render(session).view;
    report.visited.insert(view.scene.clone());

    for _ in 0..steps {
        let intent = match pick_intent(&view, &mut rng) {
            Some(intent) => intent,
            None => {
                report.dead_ends.insert(view.scene.clone());
                PlayerIntent::Reset
            }
        };

        let was_ended = session.player.ended;
        let turn = engine.handle(session, intent);
        report.steps += 1;
        if turn.rejected.is_some() {
            report.rejected += 1;
        }
        report.anomalies += turn.anomalies.len();
        if session.player.ended && !was_ended {
            report.endings += 1;
        }
        if session.player.pools.values().any(|p| !p.is_within_bounds()) {
            report.bound_violations += 1;
        }
        report.visited.insert(turn.view.scene.clone());
        view = turn.view;
    }

    report
}

/// Pick a plausible intent for the view. `None` means the scene is stuck.
fn pick_intent(view: &ViewModel, rng: &mut StdRng) -> Option<PlayerIntent> {
    // Occasionally send something the current mode should refuse.
    if rng.gen_bool(0.05) {
        return Some(PlayerIntent::Back);
    }

    match view.mode {
        ViewMode::Game => {
            if view.ended {
                return Some(PlayerIntent::Reset);
            }
            if rng.gen_bool(0.1) {
                return Some(PlayerIntent::OpenJournal);
            }
            if !view.options.is_empty() {
                // Locked options are picked too; they must bounce off.
                return Some(PlayerIntent::SelectOption(
                    rng.gen_range(0..view.options.len()),
                ));
            }
            if view.can_continue {
                return Some(PlayerIntent::Continue);
            }
            None
        }
        ViewMode::NpcList | ViewMode::NpcDetail => {
            let npcs = view.npc_list.as_deref().unwrap_or_default();
            if npcs.is_empty() || rng.gen_bool(0.4) {
                Some(PlayerIntent::Back)
            } else {
                let entry = &npcs[rng.gen_range(0..npcs.len())];
                Some(PlayerIntent::SelectNpc(entry.id.clone()))
            }
        }
    }
}
