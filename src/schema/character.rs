use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Newtype wrapper for NPC IDs.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NpcId(pub String);

impl NpcId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NpcId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NpcId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// The static catalog record of a character.
///
/// Only `stats` and `default_mood` seed the per-session runtime state;
/// everything here stays untouched for the lifetime of the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    pub id: NpcId,
    /// Explicit display name. Characters without one never match as speakers.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub bio: String,
    /// Mood name → media reference.
    pub moods: BTreeMap<String, String>,
    pub default_mood: String,
    #[serde(default)]
    pub stats: BTreeMap<String, i64>,
    #[serde(default)]
    pub hidden: bool,
}

impl Character {
    /// Name shown to the player, falling back to the id.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(self.id.as_str())
    }

    pub fn has_mood(&self, mood: &str) -> bool {
        self.moods.contains_key(mood)
    }

    pub fn mood_media(&self, mood: &str) -> Option<&str> {
        self.moods.get(mood).map(String::as_str)
    }
}
