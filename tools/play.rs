//! Play: interactive terminal renderer for a story.
//!
//! Usage: play --story <path> [--characters <path>] [--config <path>] [--json]
//!
//! Commands:
//!   <n>              choose option n (1-based)
//!   continue, c      advance a scene without options
//!   journal, j       open the character journal
//!   npc <id>         open a character's page in the journal
//!   back, b          leave the journal page or the journal
//!   reset            start over
//!   walk <n> [seed]  play n random steps on a copy of the session
//!   json             print the current view model as JSON
//!   help             list commands
//!   quit             exit

use std::io::{self, BufRead, Write};
use std::process;

use story_engine::core::controller::{StoryEngine, Turn};
use story_engine::core::walk::random_walk;
use story_engine::schema::character::NpcId;
use story_engine::schema::view::{PlayerIntent, ViewMode, ViewModel};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage();
        return;
    }

    let mut builder = StoryEngine::builder();
    let mut has_story = false;
    let mut json_mode = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--story" if i + 1 < args.len() => {
                i += 1;
                builder = builder.story(&args[i]);
                has_story = true;
            }
            "--characters" if i + 1 < args.len() => {
                i += 1;
                builder = builder.characters(&args[i]);
            }
            "--config" if i + 1 < args.len() => {
                i += 1;
                builder = builder.config_file(&args[i]);
            }
            "--json" => json_mode = true,
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_usage();
                process::exit(1);
            }
        }
        i += 1;
    }

    if !has_story {
        eprintln!("ERROR: --story is required");
        process::exit(1);
    }

    let engine = match builder.build() {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            process::exit(1);
        }
    };

    println!("=== {} ===", engine.config().title);
    println!("Type 'help' for commands.\n");

    let mut session = engine.new_session();
    let turn = engine.render(&mut session);
    print_turn(&turn, json_mode);

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("play> ");
        stdout.flush().ok();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).is_err() || line.is_empty() {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        let cmd = parts[0].to_lowercase();

        let intent = match cmd.as_str() {
            "quit" | "exit" | "q" => {
                println!("Goodbye.");
                break;
            }
            "help" | "h" | "?" => {
                print_help();
                continue;
            }
            "json" => {
                print_json(&engine.view(&session).view);
                continue;
            }
            "walk" => {
                let steps: usize = match parts.get(1).map(|s| s.parse()) {
                    Some(Ok(n)) => n,
                    _ => {
                        println!("Usage: walk <n> [seed]");
                        continue;
                    }
                };
                let seed = parts.get(2).and_then(|s| s.parse().ok()).unwrap_or(42);
                let mut copy = session.clone();
                let report = random_walk(&engine, &mut copy, seed, steps);
                println!("\n=== Random walk: {} steps, seed {} ===", report.steps, seed);
                println!("  Scenes visited:   {}", report.visited.len());
                println!("  Intents rejected: {}", report.rejected);
                println!("  Endings reached:  {}", report.endings);
                println!("  Anomalies:        {}", report.anomalies);
                println!("  Bound violations: {}", report.bound_violations);
                for scene in &report.dead_ends {
                    println!("  Dead end: {}", scene);
                }
                println!();
                continue;
            }
            "continue" | "c" => PlayerIntent::Continue,
            "journal" | "j" => PlayerIntent::OpenJournal,
            "back" | "b" => PlayerIntent::Back,
            "reset" => PlayerIntent::Reset,
            "npc" => match parts.get(1) {
                Some(id) => PlayerIntent::SelectNpc(NpcId::new(*id)),
                None => {
                    println!("Usage: npc <id>");
                    continue;
                }
            },
            other => match other.parse::<usize>() {
                Ok(n) if n > 0 => PlayerIntent::SelectOption(n - 1),
                _ => {
                    println!("Unknown command: {}. Type 'help' for commands.", other);
                    continue;
                }
            },
        };

        let turn = engine.handle(&mut session, intent);
        print_turn(&turn, json_mode);
    }
}

fn print_turn(turn: &Turn, json_mode: bool) {
    if let Some(ref reason) = turn.rejected {
        println!("!! {}", reason);
    }
    for anomaly in &turn.anomalies {
        println!("!! recovered: {}", anomaly);
    }
    if json_mode {
        print_json(&turn.view);
    } else {
        print_view(&turn.view);
    }
}

fn print_json(view: &ViewModel) {
    match serde_json::to_string_pretty(view) {
        Ok(json) => println!("{}", json),
        Err(e) => println!("ERROR: {}", e),
    }
}

fn print_view(view: &ViewModel) {
    let sidebar = &view.sidebar_summary;
    let pools: Vec<String> = sidebar
        .resource_pools
        .iter()
        .map(|p| format!("{} {}/{}", p.name, p.current, p.max))
        .collect();
    println!(
        "[Lv {} | xp {} | {} | suspicion {}]",
        sidebar.level,
        sidebar.experience,
        pools.join(" | "),
        sidebar.suspicion
    );

    match view.mode {
        ViewMode::Game => {
            println!("--- {} ---", view.scene);
            let kind = if view.media.is_video { "video" } else { "image" };
            println!("({}: {})", kind, view.media.reference);
            for sprite in &view.stage {
                println!("  [{:?}] {} ({})", sprite.position, sprite.name, sprite.media.reference);
            }
            match view.speaker_name {
                Some(ref speaker) => println!("\n{}: \"{}\"\n", speaker, view.scene_text),
                None => println!("\n{}\n", view.scene_text),
            }
            for (i, option) in view.options.iter().enumerate() {
                match option.disabled_reason {
                    Some(ref reason) => println!("  {}. {} [locked: {}]", i + 1, option.label, reason),
                    None => println!("  {}. {}", i + 1, option.label),
                }
            }
            if view.can_continue {
                println!("  (continue)");
            }
            if view.ended {
                println!("  *** THE END *** (reset to play again)");
            }
        }
        ViewMode::NpcList => {
            println!("--- Journal ---");
            for entry in view.npc_list.iter().flatten() {
                println!("  {} ({}): {}", entry.name, entry.id, entry.mood);
            }
            println!("  (npc <id> to open, back to close)");
        }
        ViewMode::NpcDetail => {
            if let Some(ref detail) = view.npc_detail {
                println!("--- {} ---", detail.name);
                println!("({})", detail.media.reference);
                println!("Mood: {}", detail.mood);
                if !detail.bio.is_empty() {
                    println!("{}", detail.bio);
                }
                for (stat, value) in &detail.stats {
                    println!("  {}: {}", stat, value);
                }
            }
        }
    }
    println!();
}

fn print_usage() {
    println!("Usage: play --story <path> [--characters <path>] [--config <path>] [--json]");
}

fn print_help() {
    println!("Commands:");
    println!("  <n>              choose option n");
    println!("  continue, c      advance a scene without options");
    println!("  journal, j       open the character journal");
    println!("  npc <id>         open a character's page");
    println!("  back, b          go back from the journal");
    println!("  reset            start over");
    println!("  walk <n> [seed]  random playthrough on a copy of the session");
    println!("  json             print the current view as JSON");
    println!("  help             this list");
    println!("  quit             exit");
}
