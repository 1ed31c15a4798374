//! Mount descriptors: which games exist, where they live and which archives
//! they ship.
//!
//! A [`GameMountInfo`] is the caller-supplied description of one game. It is
//! immutable once handed to the manager, with the single exception of
//! `priority`, which can be adjusted after initialisation to reorder lookups.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Engine family of a mounted game.
///
/// `Source2` shares all runtime behaviour with `SourceEngine`; the Bethesda
/// families are only available with the `bethesda` feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameEngine {
    SourceEngine,
    Source2,
    #[cfg(feature = "bethesda")]
    Gamebryo,
    #[cfg(feature = "bethesda")]
    CreationEngine,
    Other,
    Invalid,
}

impl GameEngine {
    /// Maps an engine name to its enum value. Unknown names yield `Invalid`.
    pub fn from_name(name: &str) -> GameEngine {
        match name {
            "source_engine" => GameEngine::SourceEngine,
            "source2" => GameEngine::Source2,
            #[cfg(feature = "bethesda")]
            "gamebryo" => GameEngine::Gamebryo,
            #[cfg(feature = "bethesda")]
            "creation_engine" => GameEngine::CreationEngine,
            "other" => GameEngine::Other,
            _ => GameEngine::Invalid,
        }
    }

    /// The canonical name for this engine, the inverse of [`from_name`].
    ///
    /// [`from_name`]: GameEngine::from_name
    pub fn name(&self) -> &'static str {
        match self {
            GameEngine::SourceEngine => "source_engine",
            GameEngine::Source2 => "source2",
            #[cfg(feature = "bethesda")]
            GameEngine::Gamebryo => "gamebryo",
            #[cfg(feature = "bethesda")]
            GameEngine::CreationEngine => "creation_engine",
            GameEngine::Other => "other",
            GameEngine::Invalid => "invalid",
        }
    }

    pub fn is_source_family(&self) -> bool {
        matches!(self, GameEngine::SourceEngine | GameEngine::Source2)
    }

    pub fn is_bethesda_family(&self) -> bool {
        #[cfg(feature = "bethesda")]
        {
            matches!(self, GameEngine::Gamebryo | GameEngine::CreationEngine)
        }
        #[cfg(not(feature = "bethesda"))]
        {
            false
        }
    }
}

impl fmt::Display for GameEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Steam-specific location settings for a game.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SteamSettings {
    /// Steam application id; `None` when the game has no workshop presence.
    #[serde(default)]
    pub app_id: Option<u32>,

    /// Install paths relative to `<steam_root>/steamapps/`, usually of the
    /// form `common/<GameDir>/<subdir>`. Every existing candidate across all
    /// Steam libraries is mounted.
    #[serde(default)]
    pub game_paths: Vec<String>,

    /// Whether to scan `steamapps/workshop/content/<app_id>/` for addon
    /// VPK archives and mount them into the same game.
    #[serde(default)]
    pub mount_workshop: bool,
}

/// Per-VPK settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VpkInfo {
    /// Sub-directory inside the VPK to treat as the archive root.
    #[serde(default)]
    pub root_dir: String,
}

/// Settings for Source / Source 2 games.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceEngineSettings {
    /// VPK files to mount, keyed by path relative to the game directory.
    #[serde(default)]
    pub vpks: HashMap<String, VpkInfo>,
}

/// Per-BSA settings. Currently empty, reserved for format options.
#[cfg(feature = "bethesda")]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BsaInfo {}

/// Settings for Gamebryo games.
#[cfg(feature = "bethesda")]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GamebryoSettings {
    /// BSA files to mount, keyed by path relative to the game directory.
    #[serde(default)]
    pub bsas: HashMap<String, BsaInfo>,
}

/// Per-BA2 settings. Currently empty, reserved for format options.
#[cfg(feature = "bethesda")]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ba2Info {}

/// Settings for Creation Engine games.
#[cfg(feature = "bethesda")]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreationEngineSettings {
    /// BA2 files to mount, keyed by path relative to the game directory.
    #[serde(default)]
    pub ba2s: HashMap<String, Ba2Info>,
}

/// Engine-specific archive settings, tagged by engine family.
///
/// The variant must match the [`GameMountInfo::game_engine`] it is attached
/// to; the manager rejects mismatched infos at registration time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineSettings {
    Source(SourceEngineSettings),
    #[cfg(feature = "bethesda")]
    Gamebryo(GamebryoSettings),
    #[cfg(feature = "bethesda")]
    Creation(CreationEngineSettings),
}

impl EngineSettings {
    /// Default settings variant for an engine kind, `None` for engines
    /// without archive support.
    pub fn for_engine(engine: GameEngine) -> Option<EngineSettings> {
        match engine {
            GameEngine::SourceEngine | GameEngine::Source2 => {
                Some(EngineSettings::Source(SourceEngineSettings::default()))
            }
            #[cfg(feature = "bethesda")]
            GameEngine::Gamebryo => Some(EngineSettings::Gamebryo(GamebryoSettings::default())),
            #[cfg(feature = "bethesda")]
            GameEngine::CreationEngine => {
                Some(EngineSettings::Creation(CreationEngineSettings::default()))
            }
            _ => None,
        }
    }

    /// Whether this settings variant belongs to the given engine kind.
    pub fn matches_engine(&self, engine: GameEngine) -> bool {
        match self {
            EngineSettings::Source(_) => engine.is_source_family(),
            #[cfg(feature = "bethesda")]
            EngineSettings::Gamebryo(_) => engine == GameEngine::Gamebryo,
            #[cfg(feature = "bethesda")]
            EngineSettings::Creation(_) => engine == GameEngine::CreationEngine,
        }
    }

    pub fn as_source(&self) -> Option<&SourceEngineSettings> {
        match self {
            EngineSettings::Source(settings) => Some(settings),
            #[cfg(feature = "bethesda")]
            _ => None,
        }
    }

    pub fn as_source_mut(&mut self) -> Option<&mut SourceEngineSettings> {
        match self {
            EngineSettings::Source(settings) => Some(settings),
            #[cfg(feature = "bethesda")]
            _ => None,
        }
    }
}

/// Caller-supplied description of one game to mount.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameMountInfo {
    /// Unique identifier, compared case-insensitively.
    pub identifier: String,

    /// Disabled games are kept in the info list but never mounted.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Steam location settings; tried before `absolute_path`.
    #[serde(default)]
    pub steam_settings: Option<SteamSettings>,

    /// Fallback install directory used when Steam resolution finds nothing.
    #[serde(default)]
    pub absolute_path: Option<PathBuf>,

    /// Display name; opaque to the mount core.
    #[serde(default)]
    pub localization_name: String,

    /// Higher priority games are searched first.
    #[serde(default)]
    pub priority: i32,

    /// Engine family; selects the path normaliser and backend kind.
    pub game_engine: GameEngine,

    /// Archive settings matching `game_engine`.
    #[serde(default)]
    pub engine_settings: Option<EngineSettings>,
}

fn default_enabled() -> bool {
    true
}

impl GameMountInfo {
    /// Creates an enabled info with the default settings variant for the
    /// engine kind.
    pub fn new(identifier: impl Into<String>, engine: GameEngine) -> Self {
        Self {
            identifier: identifier.into(),
            enabled: true,
            steam_settings: None,
            absolute_path: None,
            localization_name: String::new(),
            priority: 0,
            game_engine: engine,
            engine_settings: EngineSettings::for_engine(engine),
        }
    }

    pub fn with_absolute_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.absolute_path = Some(path.into());
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_steam_settings(mut self, settings: SteamSettings) -> Self {
        self.steam_settings = Some(settings);
        self
    }

    /// Case-insensitive identifier comparison.
    pub fn matches_identifier(&self, identifier: &str) -> bool {
        self.identifier.eq_ignore_ascii_case(identifier)
    }

    /// Whether the settings variant tag matches the engine kind. Infos
    /// without settings always pass.
    pub fn settings_match_engine(&self) -> bool {
        self.engine_settings
            .as_ref()
            .map_or(true, |s| s.matches_engine(self.game_engine))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_name_round_trip() {
        let engines = [
            GameEngine::SourceEngine,
            GameEngine::Source2,
            #[cfg(feature = "bethesda")]
            GameEngine::Gamebryo,
            #[cfg(feature = "bethesda")]
            GameEngine::CreationEngine,
            GameEngine::Other,
        ];
        for engine in engines {
            assert_eq!(GameEngine::from_name(engine.name()), engine);
        }
        assert_eq!(GameEngine::from_name("unknown"), GameEngine::Invalid);
        assert_eq!(GameEngine::Invalid.name(), "invalid");
    }

    #[test]
    fn new_info_selects_matching_settings() {
        let info = GameMountInfo::new("hl2", GameEngine::SourceEngine);
        assert!(info.enabled);
        assert!(matches!(
            info.engine_settings,
            Some(EngineSettings::Source(_))
        ));
        assert!(info.settings_match_engine());

        let other = GameMountInfo::new("misc", GameEngine::Other);
        assert!(other.engine_settings.is_none());
        assert!(other.settings_match_engine());
    }

    #[test]
    fn mismatched_settings_are_detected() {
        let mut info = GameMountInfo::new("hl2", GameEngine::SourceEngine);
        info.game_engine = GameEngine::Other;
        assert!(!info.settings_match_engine());
    }

    #[test]
    fn identifier_comparison_is_case_insensitive() {
        let info = GameMountInfo::new("HL2", GameEngine::SourceEngine);
        assert!(info.matches_identifier("hl2"));
        assert!(info.matches_identifier("Hl2"));
        assert!(!info.matches_identifier("hl2dm"));
    }

    #[cfg(feature = "bethesda")]
    #[test]
    fn bethesda_settings_match_their_engines() {
        let gamebryo = EngineSettings::Gamebryo(GamebryoSettings::default());
        assert!(gamebryo.matches_engine(GameEngine::Gamebryo));
        assert!(!gamebryo.matches_engine(GameEngine::CreationEngine));
        assert!(!gamebryo.matches_engine(GameEngine::SourceEngine));

        let creation = EngineSettings::Creation(CreationEngineSettings::default());
        assert!(creation.matches_engine(GameEngine::CreationEngine));
        assert!(!creation.matches_engine(GameEngine::Gamebryo));
    }
}
