//! gamemount CLI - inspect and extract assets from mounted game installs.
//!
//! Loads a TOML mount configuration, brings the mount manager up and runs
//! one lookup command against the resulting union filesystem.

mod commands;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use gamemount::{DirectoryOpener, GameMountManager, MountConfig};

#[derive(Parser)]
#[command(name = "gamemount")]
#[command(about = "Inspect and extract assets from mounted game installs", long_about = None)]
struct Cli {
    /// Mount configuration file
    #[arg(long, global = true, default_value = "gamemount.toml")]
    config: PathBuf,

    /// Log per-archive mount progress
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the Steam root directories in effect
    Roots,

    /// List configured games and their mount state
    Games,

    /// Search the mounted union for files matching a wildcard pattern
    Find {
        /// Pattern such as "materials/*.vmt"
        pattern: String,

        /// Restrict the search to one game
        #[arg(long)]
        game: Option<String>,

        /// Report absolute disk paths (skips archive contents)
        #[arg(long)]
        absolute: bool,
    },

    /// Extract a single asset to a file or stdout
    Extract {
        /// Logical asset path such as "materials/foo.vmt"
        path: String,

        /// Restrict the lookup to one game
        #[arg(long)]
        game: Option<String>,

        /// Output file; stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .init();

    let config = MountConfig::load(&cli.config)
        .with_context(|| format!("failed to load mount configuration {:?}", cli.config))?;
    tracing::debug!(games = config.games.len(), "mount configuration loaded");

    let manager = GameMountManager::new(Arc::new(DirectoryOpener));
    manager.set_verbose(cli.verbose || config.verbose);
    if !config.steam_roots.is_empty() {
        manager.set_steam_root_paths(config.steam_roots.clone());
    }
    for game in &config.games {
        manager
            .mount_game(game.clone())
            .with_context(|| format!("failed to register game '{}'", game.identifier))?;
    }
    manager.initialize(true);

    match cli.command {
        Commands::Roots => commands::run_roots(&manager),
        Commands::Games => commands::run_games(&manager),
        Commands::Find {
            pattern,
            game,
            absolute,
        } => commands::run_find(&manager, &pattern, game.as_deref(), absolute),
        Commands::Extract { path, game, output } => {
            commands::run_extract(&manager, &path, game.as_deref(), output.as_deref())
        }
    }
}
