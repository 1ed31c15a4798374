//! Mount-set configuration file.
//!
//! A TOML document describing which games to mount, consumed by the CLI and
//! by host processes that prefer file-based configuration over building
//! [`GameMountInfo`] values in code.
//!
//! ```toml
//! verbose = true
//!
//! [[games]]
//! identifier = "hl2"
//! game_engine = "source_engine"
//! absolute_path = "/games/hl2"
//! priority = 10
//!
//! [games.engine_settings.source.vpks."hl2/hl2_misc_dir.vpk"]
//! root_dir = ""
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::mount::GameMountInfo;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// The full mount set: global switches plus one entry per game.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MountConfig {
    /// Promote mount chatter to info-level logs.
    #[serde(default)]
    pub verbose: bool,

    /// Explicit Steam roots; empty means auto-discover.
    #[serde(default)]
    pub steam_roots: Vec<PathBuf>,

    #[serde(default)]
    pub games: Vec<GameMountInfo>,
}

impl MountConfig {
    /// Loads and parses a TOML mount configuration.
    pub fn load(path: &Path) -> Result<MountConfig, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&text).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn from_toml(text: &str) -> Result<MountConfig, toml::de::Error> {
        toml::from_str(text)
    }
}
