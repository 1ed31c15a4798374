//! CLI command implementations.

use std::io::Write;
use std::path::Path;

use anyhow::{bail, Context, Result};

use gamemount::GameMountManager;

/// Prints the Steam roots the manager resolved (or was given).
pub fn run_roots(manager: &GameMountManager) -> Result<()> {
    let roots = manager.steam_root_paths();
    if roots.is_empty() {
        println!("No Steam installation found.");
        return Ok(());
    }
    for root in roots {
        println!("{}", root.display());
    }
    Ok(())
}

/// Prints every configured game with its mount outcome.
pub fn run_games(manager: &GameMountManager) -> Result<()> {
    let mounted = manager.mounted_game_identifiers();
    for info in manager.get_game_mount_infos() {
        let state = if !info.enabled {
            "disabled"
        } else if mounted.iter().any(|id| info.matches_identifier(id)) {
            "mounted"
        } else {
            "not found"
        };
        println!(
            "{:<24} {:<16} priority {:>4}  [{}]",
            info.identifier, info.game_engine, info.priority, state
        );
        if let Some(paths) = manager.get_mounted_game_paths(&info.identifier) {
            for path in paths {
                println!("    {}", path.display());
            }
        }
    }
    Ok(())
}

/// Runs a wildcard search and prints matching files and directories.
pub fn run_find(
    manager: &GameMountManager,
    pattern: &str,
    game: Option<&str>,
    absolute: bool,
) -> Result<()> {
    let mut files = Vec::new();
    let mut dirs = Vec::new();
    if !manager.find_files(pattern, Some(&mut files), Some(&mut dirs), absolute, game) {
        bail!("no mounted game named '{}'", game.unwrap_or_default());
    }
    for dir in &dirs {
        println!("{}/", dir);
    }
    for file in &files {
        println!("{}", file);
    }
    if files.is_empty() && dirs.is_empty() {
        eprintln!("No matches for '{}'.", pattern);
    }
    Ok(())
}

/// Resolves one asset and writes its bytes out.
pub fn run_extract(
    manager: &GameMountManager,
    path: &str,
    game: Option<&str>,
    output: Option<&Path>,
) -> Result<()> {
    let Some(file) = manager.load(path, game) else {
        bail!("'{}' was not found in any mounted game", path);
    };
    let source = file.source_path().to_string();
    let data = file
        .read_all()
        .with_context(|| format!("failed to read '{}'", path))?;
    match output {
        Some(output) => {
            std::fs::write(output, &data)
                .with_context(|| format!("failed to write {:?}", output))?;
            eprintln!("{} bytes from {} -> {}", data.len(), source, output.display());
        }
        None => {
            std::io::stdout()
                .write_all(&data)
                .context("failed to write to stdout")?;
        }
    }
    Ok(())
}
