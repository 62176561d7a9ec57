//! Story catalog: loading, source-format normalization and referential validation.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

use crate::schema::character::{Character, NpcId};
use crate::schema::scene::{
    Choice, MediaRef, NpcEffect, Requirement, Scene, SceneId, StagePosition, StagedCharacter,
    TerminalMarker,
};

/// Mood assumed when a character does not name one.
pub const DEFAULT_MOOD: &str = "default";

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON deserialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("catalog failed validation: {}", join_issues(.0))]
    Invalid(Vec<ValidationIssue>),
}

fn join_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// A single referential-integrity problem found at load time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationIssue {
    #[error("scene '{scene}' option {option} targets unknown scene '{target}'")]
    UnknownTarget {
        scene: SceneId,
        option: usize,
        target: SceneId,
    },
    #[error("scene '{scene}' continues to unknown scene '{target}'")]
    UnknownNextScene { scene: SceneId, target: SceneId },
    #[error("scene '{scene}' stages unknown character '{npc}'")]
    UnknownStagedCharacter { scene: SceneId, npc: NpcId },
    #[error("scene '{scene}' shows '{npc}' with unknown expression '{expression}'")]
    UnknownExpression {
        scene: SceneId,
        npc: NpcId,
        expression: String,
    },
    #[error("scene '{scene}' option {option} affects unknown character '{npc}'")]
    UnknownEffectNpc {
        scene: SceneId,
        option: usize,
        npc: NpcId,
    },
    #[error("scene '{scene}' option {option} names an NPC without a stat to change")]
    IncompleteNpcEffect { scene: SceneId, option: usize },
    #[error("character '{0}' has no moods")]
    NoMoods(NpcId),
    #[error("character '{npc}' default mood '{mood}' has no media")]
    MissingDefaultMood { npc: NpcId, mood: String },
    #[error("start scene '{0}' does not exist")]
    MissingStartScene(SceneId),
    #[error("scene '{0}' is defined more than once")]
    DuplicateScene(SceneId),
    #[error("character '{0}' is defined more than once")]
    DuplicateCharacter(NpcId),
}

// Source-format helpers. Story documents use the loose shape of hand-written
// story files; they are read into intermediate structs and normalized into
// the schema types.

/// A story or character document as authored.
///
/// Either section may be absent, so one combined document can serve as
/// both the story and the character source.
#[derive(Debug, Default, Deserialize)]
pub struct SourceDocument {
    #[serde(default, alias = "scenes")]
    story: BTreeMap<String, RawScene>,
    #[serde(default, alias = "characters")]
    npcs: BTreeMap<String, RawCharacter>,
}

#[derive(Debug, Deserialize)]
struct RawScene {
    #[serde(default)]
    text: String,
    #[serde(default, alias = "image", alias = "background")]
    media: Option<String>,
    #[serde(default, alias = "isVideo")]
    is_video: bool,
    #[serde(default, alias = "choices")]
    options: Vec<RawOption>,
    #[serde(default, alias = "nextScene")]
    next_scene: Option<String>,
    #[serde(default, alias = "endGame")]
    end_game: bool,
    #[serde(default)]
    characters: Vec<RawStaged>,
}

#[derive(Debug, Deserialize)]
struct RawStaged {
    id: String,
    #[serde(default)]
    expression: Option<String>,
    #[serde(default)]
    position: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawOption {
    #[serde(alias = "text")]
    label: String,
    #[serde(alias = "nextScene")]
    target: String,
    #[serde(default)]
    xp: i64,
    #[serde(default)]
    magic: i64,
    #[serde(default)]
    suspicion: i64,
    #[serde(default)]
    npc: Option<String>,
    #[serde(default)]
    stat_change: Option<String>,
    #[serde(default)]
    val: i64,
    #[serde(default)]
    req_magic: Option<i64>,
    #[serde(default)]
    effects: BTreeMap<String, i64>,
    #[serde(default)]
    requires: Vec<Requirement>,
    #[serde(default, alias = "setFlags")]
    set_flags: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawCharacter {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    bio: String,
    #[serde(default, alias = "expressions")]
    images: BTreeMap<String, String>,
    #[serde(default, alias = "defaultExpression")]
    current_mood: Option<String>,
    #[serde(default)]
    stats: BTreeMap<String, i64>,
    #[serde(default)]
    hidden: bool,
}

impl SourceDocument {
    pub fn parse_json(input: &str) -> Result<SourceDocument, CatalogError> {
        Ok(serde_json::from_str(input)?)
    }

    /// Parse a RON document. `Some(..)` may be omitted around optional fields.
    pub fn parse_ron(input: &str) -> Result<SourceDocument, CatalogError> {
        let options = ron::Options::default()
            .with_default_extension(ron::extensions::Extensions::IMPLICIT_SOME);
        Ok(options.from_str(input)?)
    }

    /// Load a document, choosing RON for `.ron` files and JSON otherwise.
    pub fn load(path: &Path) -> Result<SourceDocument, CatalogError> {
        let contents = std::fs::read_to_string(path)?;
        if path.extension().and_then(|s| s.to_str()) == Some("ron") {
            Self::parse_ron(&contents)
        } else {
            Self::parse_json(&contents)
        }
    }
}

fn parse_position(position: Option<&str>) -> StagePosition {
    match position {
        Some("left") => StagePosition::Left,
        Some("right") => StagePosition::Right,
        _ => StagePosition::Center,
    }
}

/// Build an option, folding the legacy numeric fields into effects and requirements.
fn normalize_option(
    raw: RawOption,
    scene: &SceneId,
    index: usize,
    issues: &mut Vec<ValidationIssue>,
) -> Choice {
    let mut effects = raw.effects;
    for (stat, delta) in [("xp", raw.xp), ("magic", raw.magic), ("suspicion", raw.suspicion)] {
        if delta != 0 {
            *effects.entry(stat.to_string()).or_insert(0) += delta;
        }
    }

    let npc_effect = match (raw.npc, raw.stat_change) {
        (Some(npc), Some(stat)) => Some(NpcEffect {
            npc: NpcId(npc),
            stat,
            delta: raw.val,
        }),
        (Some(_), None) => {
            issues.push(ValidationIssue::IncompleteNpcEffect {
                scene: scene.clone(),
                option: index,
            });
            None
        }
        (None, _) => None,
    };

    let mut requirements = raw.requires;
    if let Some(min) = raw.req_magic {
        requirements.push(Requirement::AtLeast {
            stat: "magic".to_string(),
            value: min,
        });
    }

    Choice {
        label: raw.label,
        target: SceneId(raw.target),
        effects,
        npc_effect,
        requirements,
        set_flags: raw.set_flags,
    }
}

fn normalize_scene(id: String, raw: RawScene, issues: &mut Vec<ValidationIssue>) -> Scene {
    let id = SceneId(id);
    let options = raw
        .options
        .into_iter()
        .enumerate()
        .map(|(i, option)| normalize_option(option, &id, i, issues))
        .collect();
    let characters = raw
        .characters
        .into_iter()
        .map(|staged| StagedCharacter {
            id: NpcId(staged.id),
            expression: staged.expression,
            position: parse_position(staged.position.as_deref()),
        })
        .collect();

    Scene {
        id,
        text: raw.text,
        media: raw.media.map(|reference| MediaRef {
            reference,
            is_video: raw.is_video,
        }),
        options,
        next_scene: raw.next_scene.map(SceneId),
        end_game: raw.end_game,
        characters,
    }
}

fn normalize_character(id: String, raw: RawCharacter) -> Character {
    Character {
        id: NpcId(id),
        name: raw.name,
        bio: raw.bio,
        moods: raw.images,
        default_mood: raw.current_mood.unwrap_or_else(|| DEFAULT_MOOD.to_string()),
        stats: raw.stats,
        hidden: raw.hidden,
    }
}

/// Immutable, validated repository of scenes and characters.
#[derive(Debug, Clone, Default)]
pub struct StoryCatalog {
    scenes: BTreeMap<SceneId, Scene>,
    characters: BTreeMap<NpcId, Character>,
}

impl StoryCatalog {
    /// Build a catalog from a story document and a character document.
    ///
    /// Sections are merged from both documents; an id defined twice is a
    /// validation issue. All issues are reported together.
    pub fn load(
        story: SourceDocument,
        characters: SourceDocument,
    ) -> Result<StoryCatalog, CatalogError> {
        let mut issues = Vec::new();
        let mut scenes = Vec::new();
        let mut npcs = Vec::new();

        for doc in [story, characters] {
            for (id, raw) in doc.story {
                scenes.push(normalize_scene(id, raw, &mut issues));
            }
            for (id, raw) in doc.npcs {
                npcs.push(normalize_character(id, raw));
            }
        }

        Self::assemble(scenes, npcs, issues)
    }

    /// Build a catalog from already-typed scenes and characters.
    pub fn from_parts(
        scenes: Vec<Scene>,
        characters: Vec<Character>,
    ) -> Result<StoryCatalog, CatalogError> {
        Self::assemble(scenes, characters, Vec::new())
    }

    /// Parse JSON story and character sources.
    pub fn parse_json(story: &str, characters: &str) -> Result<StoryCatalog, CatalogError> {
        Self::load(
            SourceDocument::parse_json(story)?,
            SourceDocument::parse_json(characters)?,
        )
    }

    /// Load from files. Without a character path the story file must carry both sections.
    pub fn load_from_paths(
        story: &Path,
        characters: Option<&Path>,
    ) -> Result<StoryCatalog, CatalogError> {
        let story_doc = SourceDocument::load(story)?;
        let character_doc = match characters {
            Some(path) => SourceDocument::load(path)?,
            None => SourceDocument::default(),
        };
        Self::load(story_doc, character_doc)
    }

    fn assemble(
        scene_list: Vec<Scene>,
        character_list: Vec<Character>,
        mut issues: Vec<ValidationIssue>,
    ) -> Result<StoryCatalog, CatalogError> {
        let mut scenes = BTreeMap::new();
        for scene in scene_list {
            if scenes.contains_key(&scene.id) {
                issues.push(ValidationIssue::DuplicateScene(scene.id.clone()));
                continue;
            }
            scenes.insert(scene.id.clone(), scene);
        }

        let mut characters = BTreeMap::new();
        for character in character_list {
            if characters.contains_key(&character.id) {
                issues.push(ValidationIssue::DuplicateCharacter(character.id.clone()));
                continue;
            }
            characters.insert(character.id.clone(), character);
        }

        let catalog = StoryCatalog { scenes, characters };
        issues.extend(catalog.validate());

        if issues.is_empty() {
            tracing::info!(
                scenes = catalog.scenes.len(),
                characters = catalog.characters.len(),
                "story catalog loaded"
            );
            Ok(catalog)
        } else {
            Err(CatalogError::Invalid(issues))
        }
    }

    fn is_valid_target(&self, target: &SceneId) -> bool {
        self.scenes.contains_key(target) || TerminalMarker::parse(target.as_str()).is_some()
    }

    fn validate(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        for character in self.characters.values() {
            if character.moods.is_empty() {
                issues.push(ValidationIssue::NoMoods(character.id.clone()));
            } else if !character.has_mood(&character.default_mood) {
                issues.push(ValidationIssue::MissingDefaultMood {
                    npc: character.id.clone(),
                    mood: character.default_mood.clone(),
                });
            }
        }

        for scene in self.scenes.values() {
            for (i, option) in scene.options.iter().enumerate() {
                if !self.is_valid_target(&option.target) {
                    issues.push(ValidationIssue::UnknownTarget {
                        scene: scene.id.clone(),
                        option: i,
                        target: option.target.clone(),
                    });
                }
                if let Some(ref effect) = option.npc_effect {
                    if !self.characters.contains_key(&effect.npc) {
                        issues.push(ValidationIssue::UnknownEffectNpc {
                            scene: scene.id.clone(),
                            option: i,
                            npc: effect.npc.clone(),
                        });
                    }
                }
            }

            if let Some(ref next) = scene.next_scene {
                if !self.is_valid_target(next) {
                    issues.push(ValidationIssue::UnknownNextScene {
                        scene: scene.id.clone(),
                        target: next.clone(),
                    });
                }
            }

            for staged in &scene.characters {
                let Some(character) = self.characters.get(&staged.id) else {
                    issues.push(ValidationIssue::UnknownStagedCharacter {
                        scene: scene.id.clone(),
                        npc: staged.id.clone(),
                    });
                    continue;
                };
                if let Some(ref expression) = staged.expression {
                    if !character.has_mood(expression) {
                        issues.push(ValidationIssue::UnknownExpression {
                            scene: scene.id.clone(),
                            npc: staged.id.clone(),
                            expression: expression.clone(),
                        });
                    }
                }
            }
        }

        issues
    }

    /// Fails with `MissingStartScene` unless `start` is a scene of this catalog.
    pub fn require_scene(&self, start: &SceneId) -> Result<(), CatalogError> {
        if self.scenes.contains_key(start) {
            Ok(())
        } else {
            Err(CatalogError::Invalid(vec![ValidationIssue::MissingStartScene(
                start.clone(),
            )]))
        }
    }

    pub fn scene(&self, id: &SceneId) -> Option<&Scene> {
        self.scenes.get(id)
    }

    pub fn character(&self, id: &NpcId) -> Option<&Character> {
        self.characters.get(id)
    }

    /// Scenes in id order.
    pub fn scenes(&self) -> impl Iterator<Item = &Scene> {
        self.scenes.values()
    }

    /// Characters in id order.
    pub fn characters(&self) -> impl Iterator<Item = &Character> {
        self.characters.values()
    }

    /// Explicit display names usable as dialogue speakers.
    pub fn speaker_names(&self) -> impl Iterator<Item = &str> {
        self.characters.values().filter_map(|c| c.name.as_deref())
    }
}
