//! WASM bindings for story-engine. A browser renderer drives a session
//! through JSON strings: intents in, view models out.

use wasm_bindgen::prelude::*;

use story_engine::core::catalog::{SourceDocument, StoryCatalog};
use story_engine::core::config::EngineConfig;
use story_engine::core::controller::{StoryEngine, Turn};
use story_engine::core::state::Session;
use story_engine::schema::view::{PlayerIntent, ViewModel};

// ---------------------------------------------------------------------------
// Embedded story data, compiled into the WASM binary
// ---------------------------------------------------------------------------
mod data {
    pub const FOREST_STORY: &str = include_str!("../../story_data/forest/story.json");
    pub const FOREST_CHARACTERS: &str = include_str!("../../story_data/forest/characters.ron");
    pub const FOREST_CONFIG: &str = include_str!("../../story_data/forest/engine.ron");
}

// ---------------------------------------------------------------------------
// JSON helper types for communication across the WASM boundary
// ---------------------------------------------------------------------------
#[derive(serde::Serialize)]
struct Rejection {
    code: &'static str,
    message: String,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct TurnOutput<'a> {
    view: &'a ViewModel,
    #[serde(skip_serializing_if = "Option::is_none")]
    rejected: Option<Rejection>,
    anomalies: Vec<String>,
}

impl<'a> From<&'a Turn> for TurnOutput<'a> {
    fn from(turn: &'a Turn) -> Self {
        TurnOutput {
            view: &turn.view,
            rejected: turn.rejected.as_ref().map(|reason| Rejection {
                code: reason.code(),
                message: reason.to_string(),
            }),
            anomalies: turn.anomalies.iter().map(ToString::to_string).collect(),
        }
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, JsError> {
    serde_json::to_string(value).map_err(|e| JsError::new(&format!("Serialization error: {e}")))
}

/// One player's session against one story.
#[wasm_bindgen]
pub struct StoryPlayer {
    engine: StoryEngine,
    session: Session,
}

#[wasm_bindgen]
impl StoryPlayer {
    /// Create a player from a JSON story, a JSON character document, and an
    /// optional RON engine config.
    #[wasm_bindgen(constructor)]
    pub fn new(
        story_json: &str,
        characters_json: &str,
        config_ron: Option<String>,
    ) -> Result<StoryPlayer, JsError> {
        let catalog = StoryCatalog::parse_json(story_json, characters_json)
            .map_err(|e| JsError::new(&format!("Story load error: {e}")))?;
        let config = match config_ron {
            Some(src) => EngineConfig::parse_ron(&src)
                .map_err(|e| JsError::new(&format!("Config parse error: {e}")))?,
            None => EngineConfig::default(),
        };
        Self::from_parts(catalog, config)
    }

    /// The bundled Godot Forest story.
    pub fn forest() -> Result<StoryPlayer, JsError> {
        let story = SourceDocument::parse_json(data::FOREST_STORY)
            .map_err(|e| JsError::new(&format!("Story parse error: {e}")))?;
        let characters = SourceDocument::parse_ron(data::FOREST_CHARACTERS)
            .map_err(|e| JsError::new(&format!("Character parse error: {e}")))?;
        let catalog = StoryCatalog::load(story, characters)
            .map_err(|e| JsError::new(&format!("Story load error: {e}")))?;
        let config = EngineConfig::parse_ron(data::FOREST_CONFIG)
            .map_err(|e| JsError::new(&format!("Config parse error: {e}")))?;
        Self::from_parts(catalog, config)
    }

    /// The current view model as JSON. Does not change the session.
    pub fn view(&self) -> Result<String, JsError> {
        to_json(&self.engine.view(&self.session).view)
    }

    /// Apply one intent and return the turn as JSON.
    ///
    /// Expected JSON shape:
    /// ```json
    /// { "type": "selectOption", "value": 0 }
    /// ```
    pub fn dispatch(&mut self, intent_json: &str) -> Result<String, JsError> {
        let intent: PlayerIntent = serde_json::from_str(intent_json)
            .map_err(|e| JsError::new(&format!("Invalid intent JSON: {e}")))?;
        let turn = self.engine.handle(&mut self.session, intent);
        to_json(&TurnOutput::from(&turn))
    }

    /// Start over with fresh state.
    pub fn reset(&mut self) -> Result<String, JsError> {
        self.session = self.engine.new_session();
        self.view()
    }

    pub fn title(&self) -> String {
        self.engine.config().title.clone()
    }
}

impl StoryPlayer {
    fn from_parts(catalog: StoryCatalog, config: EngineConfig) -> Result<StoryPlayer, JsError> {
        let engine = StoryEngine::builder()
            .with_catalog(catalog)
            .with_config(config)
            .build()
            .map_err(|e| JsError::new(&format!("Engine build error: {e}")))?;
        let session = engine.new_session();
        Ok(StoryPlayer { engine, session })
    }
}
