//! Story Linter: loads a story and reports every validation error.
//!
//! Usage: story_linter <story_file> [--characters <file>] [--config <file>]

use std::path::PathBuf;
use std::process;

use story_engine::core::catalog::{CatalogError, StoryCatalog};
use story_engine::core::config::EngineConfig;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        println!("Usage: story_linter <story_file> [--characters <file>] [--config <file>]");
        process::exit(0);
    }

    let story_path = PathBuf::from(&args[1]);
    let mut characters_path = None;
    let mut config_path = None;

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--characters" if i + 1 < args.len() => {
                i += 1;
                characters_path = Some(PathBuf::from(&args[i]));
            }
            "--config" if i + 1 < args.len() => {
                i += 1;
                config_path = Some(PathBuf::from(&args[i]));
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                process::exit(1);
            }
        }
        i += 1;
    }

    let config = match config_path {
        Some(ref path) => match EngineConfig::load_from_ron(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("ERROR: Failed to load config: {}", e);
                process::exit(1);
            }
        },
        None => EngineConfig::default(),
    };

    let mut errors = Vec::new();
    match StoryCatalog::load_from_paths(&story_path, characters_path.as_deref()) {
        Ok(catalog) => {
            println!(
                "Loaded {} scenes and {} characters",
                catalog.scenes().count(),
                catalog.characters().count()
            );
            if let Err(e) = catalog.require_scene(&config.start_scene) {
                errors.push(e.to_string());
            }
        }
        Err(CatalogError::Invalid(issues)) => {
            errors.extend(issues.iter().map(ToString::to_string));
        }
        Err(e) => {
            eprintln!("ERROR: Failed to load story: {}", e);
            process::exit(1);
        }
    }

    println!("\n=== Story Lint Report ===\n");

    if errors.is_empty() {
        println!("All checks passed!");
    }

    for error in &errors {
        println!("ERROR: {}", error);
    }

    println!("\nSummary: {} errors", errors.len());

    if errors.is_empty() {
        process::exit(0);
    } else {
        process::exit(1);
    }
}
