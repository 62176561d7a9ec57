//! Scripted playthrough of the bundled forest story.
//!
//! Run with `cargo run --example forest_door`. Set `RUST_LOG=story_engine=debug`
//! to see every intent and effect.

use story_engine::core::controller::StoryEngine;
use story_engine::schema::view::{PlayerIntent, ViewMode};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let engine = StoryEngine::builder()
        .story("story_data/forest/story.json")
        .characters("story_data/forest/characters.ron")
        .config_file("story_data/forest/engine.ron")
        .build()?;
    let mut session = engine.new_session();

    let script = [
        PlayerIntent::SelectOption(1), // search the bushes
        PlayerIntent::SelectOption(0), // take the crystal
        PlayerIntent::OpenJournal,
        PlayerIntent::SelectNpc("aiko".into()),
        PlayerIntent::Back,
        PlayerIntent::Back,
        PlayerIntent::SelectOption(0), // push the door
        PlayerIntent::SelectOption(0), // light a torch
        PlayerIntent::SelectOption(0), // offer the crystal
        PlayerIntent::Continue,
        PlayerIntent::SelectOption(0), // speak her name
        PlayerIntent::Continue,
    ];

    println!("=== {} ===\n", engine.config().title);
    for intent in script {
        let turn = engine.handle(&mut session, intent.clone());
        let view = &turn.view;
        println!("> {:?}", intent);
        if let Some(reason) = turn.rejected {
            println!("  rejected: {}", reason);
            continue;
        }
        match view.mode {
            ViewMode::Game => {
                match view.speaker_name {
                    Some(ref speaker) => println!("  {}: {}", speaker, view.scene_text),
                    None => println!("  {}", view.scene_text),
                }
                for option in &view.options {
                    let lock = if option.enabled { "" } else { " (locked)" };
                    println!("    - {}{}", option.label, lock);
                }
            }
            ViewMode::NpcList => {
                for entry in view.npc_list.iter().flatten() {
                    println!("  {} feels {}", entry.name, entry.mood);
                }
            }
            ViewMode::NpcDetail => {
                if let Some(ref detail) = view.npc_detail {
                    println!("  {}: {} {:?}", detail.name, detail.bio, detail.stats);
                }
            }
        }
        if view.ended {
            println!("\n  The story has ended.");
        }
    }

    let summary = &engine.view(&session).view.sidebar_summary;
    println!(
        "\nFinal: level {}, {} xp, suspicion {}",
        summary.level, summary.experience, summary.suspicion
    );
    Ok(())
}
