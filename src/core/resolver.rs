//! Transition resolver, the read path from session state to a `ViewModel`.
//!
//! Resolution never mutates the session. Inconsistent state is reported as
//! an anomaly alongside a best-effort view; the controller decides how to
//! repair the session.

use std::fmt;

use crate::core::catalog::StoryCatalog;
use crate::core::config::EngineConfig;
use crate::core::state::Session;
use crate::schema::character::NpcId;
use crate::schema::scene::{MediaRef, Scene, SceneId};
use crate::schema::view::{
    NpcDetail, NpcListEntry, OptionView, PoolSummary, SidebarSummary, StagedSprite, ViewMode,
    ViewModel,
};

/// Shown on every option once the story is over.
pub const ENDED_REASON: &str = "the story has ended";

/// State that no longer resolves against the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoverableStateAnomaly {
    MissingScene { requested: SceneId, fallback: SceneId },
    /// Detail view without a valid selected NPC.
    MissingNpc { requested: Option<NpcId> },
}

impl fmt::Display for RecoverableStateAnomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingScene {
                requested,
                fallback,
            } => write!(f, "scene '{requested}' not found, fell back to '{fallback}'"),
            Self::MissingNpc {
                requested: Some(id),
            } => write!(f, "selected NPC '{id}' not found"),
            Self::MissingNpc { requested: None } => f.write_str("detail view without a selected NPC"),
        }
    }
}

/// A view plus whatever had to be papered over to build it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub view: ViewModel,
    pub anomalies: Vec<RecoverableStateAnomaly>,
}

/// Split `"Name: line"` into speaker and line.
///
/// Only the first colon is considered, and only when the trimmed prefix is
/// exactly one of `names` (case-sensitive). Anything else is narration and is
/// returned untouched.
pub fn split_speaker<'t, 'n>(
    text: &'t str,
    mut names: impl Iterator<Item = &'n str>,
) -> (Option<&'t str>, &'t str) {
    if let Some((prefix, rest)) = text.split_once(':') {
        let prefix = prefix.trim();
        if names.any(|name| name == prefix) {
            return (Some(prefix), rest.trim());
        }
    }
    (None, text)
}

/// Resolve the renderable view for the session's current mode.
pub fn resolve(catalog: &StoryCatalog, config: &EngineConfig, session: &Session) -> Resolution {
    match session.player.view_mode {
        ViewMode::Game => resolve_game(catalog, config, session),
        ViewMode::NpcList => Resolution {
            view: npc_list_view(catalog, config, session),
            anomalies: Vec::new(),
        },
        ViewMode::NpcDetail => match npc_detail_view(catalog, config, session) {
            Some(view) => Resolution {
                view,
                anomalies: Vec::new(),
            },
            None => {
                let mut resolution = resolve_game(catalog, config, session);
                resolution.anomalies.insert(
                    0,
                    RecoverableStateAnomaly::MissingNpc {
                        requested: session.player.selected_npc.clone(),
                    },
                );
                resolution
            }
        },
    }
}

fn placeholder(config: &EngineConfig) -> MediaRef {
    MediaRef::image(config.placeholder_media.clone())
}

fn sidebar(config: &EngineConfig, session: &Session) -> SidebarSummary {
    let player = &session.player;
    SidebarSummary {
        level: config.level_for(player.experience),
        experience: player.experience,
        resource_pools: player
            .pools
            .iter()
            .map(|(name, pool)| PoolSummary {
                name: name.clone(),
                current: pool.current,
                max: pool.max,
            })
            .collect(),
        suspicion: player.suspicion,
    }
}

fn empty_view(config: &EngineConfig, session: &Session, mode: ViewMode, scene: SceneId) -> ViewModel {
    ViewModel {
        mode,
        title: config.title.clone(),
        scene,
        scene_text: String::new(),
        speaker_name: None,
        media: placeholder(config),
        options: Vec::new(),
        sidebar_summary: sidebar(config, session),
        npc_list: None,
        npc_detail: None,
        stage: Vec::new(),
        can_continue: false,
        ended: session.player.ended,
    }
}

fn resolve_game(catalog: &StoryCatalog, config: &EngineConfig, session: &Session) -> Resolution {
    let player = &session.player;
    let mut anomalies = Vec::new();

    let scene = match catalog.scene(&player.current_scene) {
        Some(scene) => Some(scene),
        None => {
            anomalies.push(RecoverableStateAnomaly::MissingScene {
                requested: player.current_scene.clone(),
                fallback: config.start_scene.clone(),
            });
            catalog.scene(&config.start_scene)
        }
    };

    let scene_id = scene
        .map(|s| s.id.clone())
        .unwrap_or_else(|| config.start_scene.clone());
    let mut view = empty_view(config, session, ViewMode::Game, scene_id);
    if let Some(scene) = scene {
        fill_scene(&mut view, catalog, config, session, scene);
    }

    Resolution { view, anomalies }
}

fn fill_scene(
    view: &mut ViewModel,
    catalog: &StoryCatalog,
    config: &EngineConfig,
    session: &Session,
    scene: &Scene,
) {
    let player = &session.player;

    let (speaker, line) = split_speaker(&scene.text, catalog.speaker_names());
    view.speaker_name = speaker.map(str::to_string);
    view.scene_text = line.to_string();
    view.media = scene.media.clone().unwrap_or_else(|| placeholder(config));

    view.options = scene
        .options
        .iter()
        .map(|choice| {
            let reason = if player.ended {
                Some(ENDED_REASON.to_string())
            } else {
                player.first_unmet(&choice.requirements).map(ToString::to_string)
            };
            OptionView {
                label: choice.label.clone(),
                enabled: reason.is_none(),
                disabled_reason: reason,
            }
        })
        .collect();

    view.stage = scene
        .characters
        .iter()
        .filter_map(|staged| {
            let character = catalog.character(&staged.id).filter(|c| !c.hidden)?;
            let mood = staged
                .expression
                .as_deref()
                .or_else(|| session.npcs.get(&staged.id).map(|n| n.current_mood.as_str()))
                .unwrap_or(character.default_mood.as_str());
            let media = character
                .mood_media(mood)
                .map(MediaRef::image)
                .unwrap_or_else(|| placeholder(config));
            Some(StagedSprite {
                id: staged.id.clone(),
                name: character.display_name().to_string(),
                media,
                position: staged.position,
            })
        })
        .collect();

    view.can_continue = !player.ended
        && scene.is_auto_advance()
        && (scene.next_scene.is_some() || scene.end_game);
}

fn npc_list_view(catalog: &StoryCatalog, config: &EngineConfig, session: &Session) -> ViewModel {
    let mut view = empty_view(
        config,
        session,
        ViewMode::NpcList,
        session.player.current_scene.clone(),
    );
    let entries = session
        .npcs
        .iter()
        .filter_map(|(id, runtime)| {
            let character = catalog.character(id).filter(|c| !c.hidden)?;
            Some(NpcListEntry {
                id: id.clone(),
                name: character.display_name().to_string(),
                mood: runtime.current_mood.clone(),
            })
        })
        .collect();
    view.npc_list = Some(entries);
    view
}

fn npc_detail_view(
    catalog: &StoryCatalog,
    config: &EngineConfig,
    session: &Session,
) -> Option<ViewModel> {
    let id = session.player.selected_npc.as_ref()?;
    let character = catalog.character(id).filter(|c| !c.hidden)?;
    let runtime = session.npcs.get(id)?;

    // Falls back when the mood lost its media mid-session.
    let media = character
        .mood_media(&runtime.current_mood)
        .map(MediaRef::image)
        .unwrap_or_else(|| placeholder(config));

    let mut view = empty_view(
        config,
        session,
        ViewMode::NpcDetail,
        session.player.current_scene.clone(),
    );
    view.media = media.clone();
    view.npc_detail = Some(NpcDetail {
        id: id.clone(),
        name: character.display_name().to_string(),
        bio: character.bio.clone(),
        mood: runtime.current_mood.clone(),
        media,
        stats: runtime.stats.clone(),
    });
    Some(view)
}
