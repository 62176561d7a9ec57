use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::character::NpcId;

/// Newtype wrapper for scene IDs.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SceneId(pub String);

impl SceneId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SceneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SceneId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Reserved option targets that do not name a scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TerminalMarker {
    /// `@end`: the story is over and the player stays on the current scene.
    End,
    /// `@restart`: jump back to the start scene, keeping progression.
    Restart,
}

impl TerminalMarker {
    pub const END: &'static str = "@end";
    pub const RESTART: &'static str = "@restart";

    pub fn parse(target: &str) -> Option<Self> {
        match target {
            Self::END => Some(Self::End),
            Self::RESTART => Some(Self::Restart),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::End => Self::END,
            Self::Restart => Self::RESTART,
        }
    }
}

/// A media reference: a path or URL, optionally tagged as video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaRef {
    #[serde(rename = "ref")]
    pub reference: String,
    #[serde(default)]
    pub is_video: bool,
}

impl MediaRef {
    pub fn image(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            is_video: false,
        }
    }
}

/// Where a staged character stands on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StagePosition {
    Left,
    #[default]
    Center,
    Right,
}

/// A character shown alongside a scene.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagedCharacter {
    pub id: NpcId,
    /// Mood to display; the character's default mood when absent.
    #[serde(default)]
    pub expression: Option<String>,
    #[serde(default)]
    pub position: StagePosition,
}

/// A predicate gating whether an option may be selected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Requirement {
    AtLeast { stat: String, value: i64 },
    AtMost { stat: String, value: i64 },
    Flag(String),
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AtLeast { stat, value } => write!(f, "requires {stat} >= {value}"),
            Self::AtMost { stat, value } => write!(f, "requires {stat} <= {value}"),
            Self::Flag(flag) => write!(f, "requires {flag}"),
        }
    }
}

/// A stat delta applied to one NPC when an option is chosen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NpcEffect {
    pub npc: NpcId,
    pub stat: String,
    pub delta: i64,
}

/// A labeled edge from one scene to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub label: String,
    pub target: SceneId,
    /// Player stat name → signed delta.
    #[serde(default)]
    pub effects: BTreeMap<String, i64>,
    #[serde(default)]
    pub npc_effect: Option<NpcEffect>,
    /// Every requirement must hold for the option to be enabled.
    #[serde(default)]
    pub requirements: Vec<Requirement>,
    #[serde(default)]
    pub set_flags: Vec<String>,
}

impl Choice {
    pub fn new(label: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            target: SceneId::new(target),
            effects: BTreeMap::new(),
            npc_effect: None,
            requirements: Vec::new(),
            set_flags: Vec::new(),
        }
    }

    /// The terminal marker this option leads to, if its target is reserved.
    pub fn terminal(&self) -> Option<TerminalMarker> {
        TerminalMarker::parse(self.target.as_str())
    }
}

/// One node of the branching narrative graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scene {
    pub id: SceneId,
    /// Display text; `"Name: line"` is read as dialogue when `Name` is a known character.
    pub text: String,
    #[serde(default)]
    pub media: Option<MediaRef>,
    #[serde(default)]
    pub options: Vec<Choice>,
    /// Auto-advance target for option-less scenes.
    #[serde(default)]
    pub next_scene: Option<SceneId>,
    #[serde(default)]
    pub end_game: bool,
    #[serde(default)]
    pub characters: Vec<StagedCharacter>,
}

impl Scene {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: SceneId::new(id),
            text: text.into(),
            media: None,
            options: Vec::new(),
            next_scene: None,
            end_game: false,
            characters: Vec::new(),
        }
    }

    /// True when the player can only move on with `Continue`.
    pub fn is_auto_advance(&self) -> bool {
        self.options.is_empty()
    }
}
