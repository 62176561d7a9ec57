//! The engine controller: one intent in, one view out.
//!
//! Wires together the catalog, the effect applicator, and the resolver,
//! and owns the view-mode state machine.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

use crate::core::catalog::{CatalogError, StoryCatalog};
use crate::core::config::{ConfigError, EngineConfig};
use crate::core::effects::{self, EffectNote};
use crate::core::resolver::{self, RecoverableStateAnomaly, Resolution};
use crate::core::state::{NpcRuntimeState, Session};
use crate::schema::character::NpcId;
use crate::schema::mood_rule::MoodRuleTable;
use crate::schema::scene::{SceneId, TerminalMarker};
use crate::schema::view::{PlayerIntent, ViewMode, ViewModel};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("no story source: set a story path or provide a catalog")]
    MissingStory,
}

/// Why an intent was refused. A rejected intent never changes the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    OptionLocked { index: usize, reason: String },
    OptionOutOfRange { index: usize, available: usize },
    UnknownNpc(NpcId),
    NotAvailable { intent: &'static str, mode: ViewMode },
    NothingToContinue,
    StoryEnded,
}

impl RejectReason {
    /// Stable machine-readable code for renderers.
    pub fn code(&self) -> &'static str {
        match self {
            Self::OptionLocked { .. } => "option_locked",
            Self::OptionOutOfRange { .. } => "option_out_of_range",
            Self::UnknownNpc(_) => "unknown_npc",
            Self::NotAvailable { .. } => "not_available",
            Self::NothingToContinue => "nothing_to_continue",
            Self::StoryEnded => "story_ended",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OptionLocked { index, reason } => write!(f, "option {index} is locked: {reason}"),
            Self::OptionOutOfRange { index, available } => {
                write!(f, "option {index} does not exist ({available} available)")
            }
            Self::UnknownNpc(id) => write!(f, "unknown NPC '{id}'"),
            Self::NotAvailable { intent, mode } => write!(f, "{intent} is not available in {mode:?}"),
            Self::NothingToContinue => f.write_str("this scene cannot be continued"),
            Self::StoryEnded => f.write_str("the story has ended"),
        }
    }
}

/// The outcome of one intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub view: ViewModel,
    pub rejected: Option<RejectReason>,
    /// State corrected before or while handling the intent.
    pub anomalies: Vec<RecoverableStateAnomaly>,
    pub notes: Vec<EffectNote>,
}

fn intent_name(intent: &PlayerIntent) -> &'static str {
    match intent {
        PlayerIntent::SelectOption(_) => "SelectOption",
        PlayerIntent::OpenJournal => "OpenJournal",
        PlayerIntent::SelectNpc(_) => "SelectNpc",
        PlayerIntent::Back => "Back",
        PlayerIntent::Reset => "Reset",
        PlayerIntent::Continue => "Continue",
    }
}

/// The story engine. Built via `StoryEngine::builder()`.
///
/// Holds only read-only data, so one engine can serve any number of
/// sessions; each session is a separate `Session` value.
#[derive(Debug, Clone)]
pub struct StoryEngine {
    catalog: Arc<StoryCatalog>,
    config: Arc<EngineConfig>,
}

/// Builder for constructing a `StoryEngine`.
#[derive(Debug, Default)]
pub struct StoryEngineBuilder {
    story_path: Option<PathBuf>,
    characters_path: Option<PathBuf>,
    config_path: Option<PathBuf>,
    start_scene: Option<SceneId>,
    /// Directly provided catalog (for testing without files).
    catalog: Option<StoryCatalog>,
    /// Directly provided config (for testing without files).
    config: Option<EngineConfig>,
    mood_rules: Option<MoodRuleTable>,
}

impl StoryEngine {
    pub fn builder() -> StoryEngineBuilder {
        StoryEngineBuilder::default()
    }

    pub fn catalog(&self) -> &StoryCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// A fresh session with default state at the start scene.
    pub fn new_session(&self) -> Session {
        Session::new(&self.catalog, &self.config)
    }

    /// Resolve the current view without touching the session.
    pub fn view(&self, session: &Session) -> Resolution {
        resolver::resolve(&self.catalog, &self.config, session)
    }

    /// Repair the session if needed and resolve its current view.
    pub fn render(&self, session: &mut Session) -> Turn {
        let anomalies = self.repair(session);
        self.finish(session, None, anomalies, Vec::new())
    }

    /// Apply one intent to the session and resolve the resulting view.
    pub fn handle(&self, session: &mut Session, intent: PlayerIntent) -> Turn {
        tracing::debug!(?intent, mode = ?session.player.view_mode, "handling intent");
        let anomalies = self.repair(session);

        let mut notes = Vec::new();
        let rejected = self.dispatch(session, &intent, &mut notes).err();
        if let Some(ref reason) = rejected {
            tracing::debug!(
                intent = intent_name(&intent),
                code = reason.code(),
                %reason,
                "intent rejected"
            );
        }
        for note in &notes {
            tracing::debug!(?note, "effect applied");
        }

        self.finish(session, rejected, anomalies, notes)
    }

    fn finish(
        &self,
        session: &mut Session,
        rejected: Option<RejectReason>,
        mut anomalies: Vec<RecoverableStateAnomaly>,
        notes: Vec<EffectNote>,
    ) -> Turn {
        let resolution = self.view(session);
        if !resolution.anomalies.is_empty() {
            for anomaly in &resolution.anomalies {
                tracing::warn!(%anomaly, "recoverable state anomaly after intent");
            }
            anomalies.extend(resolution.anomalies);
            self.repair(session);
        }
        Turn {
            view: resolution.view,
            rejected,
            anomalies,
            notes,
        }
    }

    /// Bring the session back in line with the catalog.
    fn repair(&self, session: &mut Session) -> Vec<RecoverableStateAnomaly> {
        let mut anomalies = Vec::new();
        let player = &mut session.player;

        if self.catalog.scene(&player.current_scene).is_none() {
            let anomaly = RecoverableStateAnomaly::MissingScene {
                requested: player.current_scene.clone(),
                fallback: self.config.start_scene.clone(),
            };
            tracing::warn!(%anomaly, "recoverable state anomaly");
            anomalies.push(anomaly);
            player.enter_scene(self.config.start_scene.clone());
        }

        if player.view_mode == ViewMode::NpcDetail {
            let valid = player
                .selected_npc
                .as_ref()
                .is_some_and(|id| self.is_visible_npc(&session.npcs, id));
            if !valid {
                let anomaly = RecoverableStateAnomaly::MissingNpc {
                    requested: player.selected_npc.take(),
                };
                tracing::warn!(%anomaly, "recoverable state anomaly");
                anomalies.push(anomaly);
                player.view_mode = ViewMode::Game;
            }
        } else {
            player.selected_npc = None;
        }

        anomalies
    }

    /// Hidden characters cannot be opened in the journal.
    fn is_visible_npc(&self, npcs: &NpcRuntimeState, id: &NpcId) -> bool {
        npcs.get(id).is_some() && self.catalog.character(id).is_some_and(|c| !c.hidden)
    }

    fn dispatch(
        &self,
        session: &mut Session,
        intent: &PlayerIntent,
        notes: &mut Vec<EffectNote>,
    ) -> Result<(), RejectReason> {
        let mode = session.player.view_mode;
        let not_available = || RejectReason::NotAvailable {
            intent: intent_name(intent),
            mode,
        };

        match intent {
            PlayerIntent::SelectOption(index) => {
                if mode != ViewMode::Game {
                    return Err(not_available());
                }
                self.select_option(session, *index, notes)
            }
            PlayerIntent::Continue => {
                if mode != ViewMode::Game {
                    return Err(not_available());
                }
                self.advance(session, notes)
            }
            PlayerIntent::OpenJournal => {
                if mode != ViewMode::Game {
                    return Err(not_available());
                }
                session.player.view_mode = ViewMode::NpcList;
                Ok(())
            }
            PlayerIntent::SelectNpc(id) => {
                if mode == ViewMode::Game {
                    return Err(not_available());
                }
                if !self.is_visible_npc(&session.npcs, id) {
                    return Err(RejectReason::UnknownNpc(id.clone()));
                }
                session.player.view_mode = ViewMode::NpcDetail;
                session.player.selected_npc = Some(id.clone());
                Ok(())
            }
            PlayerIntent::Back => match mode {
                ViewMode::NpcDetail => {
                    session.player.view_mode = ViewMode::NpcList;
                    session.player.selected_npc = None;
                    Ok(())
                }
                ViewMode::NpcList => {
                    session.player.view_mode = ViewMode::Game;
                    Ok(())
                }
                ViewMode::Game => Err(not_available()),
            },
            PlayerIntent::Reset => {
                *session = self.new_session();
                tracing::info!(start = %self.config.start_scene, "session reset");
                Ok(())
            }
        }
    }

    fn select_option(
        &self,
        session: &mut Session,
        index: usize,
        notes: &mut Vec<EffectNote>,
    ) -> Result<(), RejectReason> {
        if session.player.ended {
            return Err(RejectReason::StoryEnded);
        }
        let scene = self.catalog.scene(&session.player.current_scene);
        let available = scene.map_or(0, |s| s.options.len());
        let choice = scene
            .and_then(|s| s.options.get(index))
            .ok_or(RejectReason::OptionOutOfRange { index, available })?;

        // Renderers disable locked options, but the check is repeated here.
        if let Some(requirement) = session.player.first_unmet(&choice.requirements) {
            return Err(RejectReason::OptionLocked {
                index,
                reason: requirement.to_string(),
            });
        }

        let applied = effects::apply(
            &self.catalog,
            &self.config,
            &session.player,
            &session.npcs,
            choice,
        );
        session.player = applied.player;
        session.npcs = applied.npcs;
        notes.extend(applied.notes);
        Ok(())
    }

    fn advance(&self, session: &mut Session, notes: &mut Vec<EffectNote>) -> Result<(), RejectReason> {
        if session.player.ended {
            return Err(RejectReason::StoryEnded);
        }
        let scene = self
            .catalog
            .scene(&session.player.current_scene)
            .filter(|s| s.is_auto_advance())
            .ok_or(RejectReason::NothingToContinue)?;

        match scene.next_scene {
            Some(ref next) => match TerminalMarker::parse(next.as_str()) {
                Some(TerminalMarker::End) => {
                    session.player.ended = true;
                    notes.push(EffectNote::Ended);
                }
                Some(TerminalMarker::Restart) => {
                    session.player.enter_scene(self.config.start_scene.clone());
                    notes.push(EffectNote::Restarted);
                }
                None => session.player.enter_scene(next.clone()),
            },
            None if scene.end_game => {
                session.player.ended = true;
                notes.push(EffectNote::Ended);
            }
            None => return Err(RejectReason::NothingToContinue),
        }
        Ok(())
    }
}

impl StoryEngineBuilder {
    pub fn story(mut self, path: impl Into<PathBuf>) -> Self {
        self.story_path = Some(path.into());
        self
    }

    /// Optional; without it the story document must also carry the characters.
    pub fn characters(mut self, path: impl Into<PathBuf>) -> Self {
        self.characters_path = Some(path.into());
        self
    }

    pub fn config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    /// Override the configured start scene.
    pub fn start_scene(mut self, id: &str) -> Self {
        self.start_scene = Some(SceneId::new(id));
        self
    }

    /// Provide a catalog directly (for testing without files).
    pub fn with_catalog(mut self, catalog: StoryCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Provide a config directly (for testing without files).
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Replace the configured mood rule table.
    pub fn with_mood_rules(mut self, rules: MoodRuleTable) -> Self {
        self.mood_rules = Some(rules);
        self
    }

    pub fn build(self) -> Result<StoryEngine, EngineError> {
        let mut config = match (self.config, self.config_path) {
            (Some(config), _) => config,
            (None, Some(path)) => EngineConfig::load_from_ron(&path)?,
            (None, None) => EngineConfig::default(),
        };
        if let Some(start) = self.start_scene {
            config.start_scene = start;
        }
        if let Some(rules) = self.mood_rules {
            config.mood_rules = rules;
        }
        config.validate()?;

        let catalog = match (self.catalog, self.story_path) {
            (Some(catalog), _) => catalog,
            (None, Some(story)) => {
                StoryCatalog::load_from_paths(&story, self.characters_path.as_deref())?
            }
            (None, None) => return Err(EngineError::MissingStory),
        };
        catalog.require_scene(&config.start_scene)?;

        tracing::info!(
            title = %config.title,
            start = %config.start_scene,
            mood_rules = config.mood_rules.rules.len(),
            "story engine ready"
        );

        Ok(StoryEngine {
            catalog: Arc::new(catalog),
            config: Arc::new(config),
        })
    }
}
