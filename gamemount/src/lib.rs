//! gamemount - a unified, read-only virtual filesystem over the loose files
//! and binary archives shipped by installed games.
//!
//! A client asks for an asset by logical path (`materials/foo.vmt`) and gets
//! its bytes back, whether the asset lives as a loose file on disk or inside
//! a Source-engine VPK, a Gamebryo BSA or a Creation Engine BA2. The same
//! union supports wildcard directory listings.
//!
//! The entry point is the [`GameMountManager`]: register one
//! [`GameMountInfo`] per game, call [`initialize`], then resolve paths with
//! [`load`] and [`find_files`]. All mount I/O (Steam discovery, archive
//! opening, file-table indexing) runs on a single background worker;
//! lookups transparently wait for it to finish.
//!
//! ```no_run
//! use std::sync::Arc;
//! use gamemount::{DirectoryOpener, GameEngine, GameMountInfo, GameMountManager};
//!
//! let manager = GameMountManager::new(Arc::new(DirectoryOpener));
//! manager
//!     .mount_game(
//!         GameMountInfo::new("hl2", GameEngine::SourceEngine)
//!             .with_absolute_path("/games/hl2"),
//!     )
//!     .unwrap();
//! manager.initialize(true);
//!
//! if let Some(file) = manager.load("materials/foo.vmt", None) {
//!     let bytes = file.read_all().unwrap();
//!     println!("{} bytes", bytes.len());
//! }
//! ```
//!
//! Archive codecs are external collaborators: the manager consumes them
//! through the [`ArchiveOpener`] factory and the backend traits in
//! [`archive`].
//!
//! [`initialize`]: GameMountManager::initialize
//! [`load`]: GameMountManager::load
//! [`find_files`]: GameMountManager::find_files

pub mod archive;
pub mod config;
pub mod game;
pub mod host;
pub mod manager;
pub mod mount;
pub mod normalize;
pub mod steam;

pub use archive::{
    ArchiveBackend, ArchiveDirectory, ArchiveFileTable, ArchiveOpener, ArchiveStream,
    DirectoryArchive, DirectoryOpener, FileNode, MemoryArchive, SourceArchive,
};
#[cfg(feature = "bethesda")]
pub use archive::BethesdaArchive;
pub use config::{ConfigError, MountConfig};
pub use game::MountedGame;
pub use host::{HostFilesystem, LoadedFile, StdFilesystem, VirtualFileStore};
pub use manager::{GameMountManager, MountError};
pub use mount::{
    EngineSettings, GameEngine, GameMountInfo, SourceEngineSettings, SteamSettings, VpkInfo,
};
#[cfg(feature = "bethesda")]
pub use mount::{Ba2Info, BsaInfo, CreationEngineSettings, GamebryoSettings};
