//! Render-ready snapshots handed to the renderer, and the intents it sends back.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::character::NpcId;
use super::scene::{MediaRef, SceneId, StagePosition};

/// Which screen the session is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViewMode {
    #[default]
    Game,
    NpcList,
    NpcDetail,
}

/// A renderer-originated request to mutate or navigate the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "camelCase")]
pub enum PlayerIntent {
    /// Index into `ViewModel::options`.
    SelectOption(usize),
    OpenJournal,
    SelectNpc(NpcId),
    Back,
    Reset,
    /// Advance an option-less scene.
    Continue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionView {
    pub label: String,
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolSummary {
    pub name: String,
    pub current: i64,
    pub max: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SidebarSummary {
    pub level: u64,
    pub experience: i64,
    pub resource_pools: Vec<PoolSummary>,
    pub suspicion: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NpcListEntry {
    pub id: NpcId,
    pub name: String,
    pub mood: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NpcDetail {
    pub id: NpcId,
    pub name: String,
    pub bio: String,
    pub mood: String,
    pub media: MediaRef,
    pub stats: BTreeMap<String, i64>,
}

/// A visible character drawn over the scene.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StagedSprite {
    pub id: NpcId,
    pub name: String,
    pub media: MediaRef,
    pub position: StagePosition,
}

/// Everything the renderer needs for one frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewModel {
    pub mode: ViewMode,
    pub title: String,
    pub scene: SceneId,
    pub scene_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker_name: Option<String>,
    pub media: MediaRef,
    pub options: Vec<OptionView>,
    pub sidebar_summary: SidebarSummary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub npc_list: Option<Vec<NpcListEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub npc_detail: Option<NpcDetail>,
    #[serde(default)]
    pub stage: Vec<StagedSprite>,
    pub can_continue: bool,
    pub ended: bool,
}
