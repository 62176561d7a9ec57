//! Story data tests: the shipped forest story loads and plays to its ending.

use story_engine::core::catalog::{CatalogError, StoryCatalog};
use story_engine::core::config::EngineConfig;
use story_engine::core::controller::{EngineError, StoryEngine};
use story_engine::core::effects::EffectNote;
use story_engine::schema::character::NpcId;
use story_engine::schema::scene::SceneId;
use story_engine::schema::view::PlayerIntent;
use std::path::Path;

fn forest_engine() -> StoryEngine {
    StoryEngine::builder()
        .story("story_data/forest/story.json")
        .characters("story_data/forest/characters.ron")
        .config_file("story_data/forest/engine.ron")
        .build()
        .unwrap()
}

#[test]
fn forest_catalog_mixes_json_and_ron() {
    let catalog = StoryCatalog::load_from_paths(
        Path::new("story_data/forest/story.json"),
        Some(Path::new("story_data/forest/characters.ron")),
    )
    .unwrap();
    assert_eq!(catalog.scenes().count(), 9);
    assert_eq!(catalog.characters().count(), 3);

    let ren = catalog.character(&NpcId::new("ren")).unwrap();
    assert_eq!(ren.default_mood, "default");
    assert_eq!(ren.stats["trust"], 0);
    assert!(catalog.character(&NpcId::new("watcher")).unwrap().hidden);
}

#[test]
fn forest_config_loads() {
    let config = EngineConfig::load_from_ron(Path::new("story_data/forest/engine.ron")).unwrap();
    assert_eq!(config.title, "The Godot Forest");
    assert_eq!(config.experience_per_level, 50);
    assert_eq!(config.mood_rules.rules.len(), 2);
}

#[test]
fn crystal_path_reaches_the_ending() {
    let engine = forest_engine();
    let mut session = engine.new_session();

    // Search the bushes, take the crystal.
    engine.handle(&mut session, PlayerIntent::SelectOption(1));
    let turn = engine.handle(&mut session, PlayerIntent::SelectOption(0));
    assert_eq!(turn.view.scene, SceneId::new("start"));
    assert!(session.player.flags.contains("has_crystal"));
    assert_eq!(session.player.pool("magic").unwrap().current, 10);

    // Into the cave and the den.
    engine.handle(&mut session, PlayerIntent::SelectOption(0));
    let turn = engine.handle(&mut session, PlayerIntent::SelectOption(0));
    assert_eq!(turn.view.scene, SceneId::new("den"));
    assert!(turn.view.options[0].enabled);
    assert!(turn.view.options[1].enabled);

    // The offering scene has no options and continues on its own.
    let turn = engine.handle(&mut session, PlayerIntent::SelectOption(0));
    assert_eq!(turn.view.scene, SceneId::new("offering"));
    assert!(turn.view.options.is_empty());
    assert!(turn.view.can_continue);
    let turn = engine.handle(&mut session, PlayerIntent::Continue);
    assert_eq!(turn.view.scene, SceneId::new("depths"));

    // Naming Aiko tips her over the threshold.
    let turn = engine.handle(&mut session, PlayerIntent::SelectOption(0));
    assert_eq!(turn.view.scene, SceneId::new("farewell"));
    assert_eq!(
        session.npcs.get(&NpcId::new("aiko")).unwrap().current_mood,
        "altered"
    );
    // The scene pins her expression regardless of mood.
    assert_eq!(turn.view.stage[0].media.reference, "characters/aiko_neutral.png");
    assert_eq!(turn.view.speaker_name.as_deref(), Some("Aiko"));

    let turn = engine.handle(&mut session, PlayerIntent::Continue);
    assert!(turn.view.ended);
    assert!(turn.notes.contains(&EffectNote::Ended));
    assert!(!turn.view.can_continue);
    assert_eq!(session.player.experience, 70);
    assert_eq!(turn.view.sidebar_summary.level, 2);

    let turn = engine.handle(&mut session, PlayerIntent::SelectOption(0));
    assert_eq!(turn.rejected.map(|r| r.code()), Some("story_ended"));
}

#[test]
fn den_without_crystal_is_locked() {
    let engine = forest_engine();
    let mut session = engine.new_session();
    engine.handle(&mut session, PlayerIntent::SelectOption(0));
    let turn = engine.handle(&mut session, PlayerIntent::SelectOption(0));
    assert_eq!(turn.view.scene, SceneId::new("den"));
    assert!(!turn.view.options[0].enabled);
    assert_eq!(
        turn.view.options[0].disabled_reason.as_deref(),
        Some("requires has_crystal")
    );
    assert!(turn.view.options[1].enabled);
}

#[test]
fn ren_grows_wary_under_his_own_rule() {
    let engine = forest_engine();
    let mut session = engine.new_session();

    let turn = engine.handle(&mut session, PlayerIntent::SelectOption(3));
    assert_eq!(turn.view.scene, SceneId::new("runes"));
    assert_eq!(session.player.pool("magic").unwrap().current, 5);
    assert_eq!(turn.view.stage[0].media.reference, "characters/ren.png");

    engine.handle(&mut session, PlayerIntent::SelectOption(0));
    let ren = session.npcs.get(&NpcId::new("ren")).unwrap();
    assert_eq!(ren.stats["trust"], 2);
    assert_eq!(ren.current_mood, "wary");
    assert_eq!(
        session.npcs.get(&NpcId::new("aiko")).unwrap().current_mood,
        "neutral"
    );
}

#[test]
fn two_sessions_share_one_engine() {
    let engine = forest_engine();
    let mut first = engine.new_session();
    let mut second = engine.new_session();

    engine.handle(&mut first, PlayerIntent::SelectOption(0));
    assert_eq!(first.player.current_scene, SceneId::new("cave"));
    assert_eq!(second.player.current_scene, SceneId::new("start"));

    let clone = engine.clone();
    clone.handle(&mut second, PlayerIntent::SelectOption(2));
    assert_eq!(second.player.current_scene, SceneId::new("shrine"));
    assert_eq!(first.player.current_scene, SceneId::new("cave"));
}

#[test]
fn broken_story_fails_to_build() {
    let err = StoryEngine::builder()
        .story("story_data/forest/story.json")
        .config_file("story_data/forest/engine.ron")
        .build()
        .unwrap_err();
    // Without the character file every staged character and NPC effect dangles.
    let EngineError::Catalog(CatalogError::Invalid(issues)) = err else {
        panic!("expected validation failure");
    };
    assert!(issues.len() >= 4);
}

#[test]
fn missing_file_is_an_io_error() {
    let err = StoryEngine::builder()
        .story("story_data/forest/missing.json")
        .build()
        .unwrap_err();
    assert!(matches!(err, EngineError::Catalog(CatalogError::Io(_))));
}
