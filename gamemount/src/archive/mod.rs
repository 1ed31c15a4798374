//! Archive backend seam.
//!
//! The mount core treats archive codecs as opaque backends behind a small
//! capability surface. Source-family packages (VPK) use a stream model:
//! open a file, query its size, read it. Bethesda packages (BSA / BA2) use a
//! direct-extract model: ask whether a path exists, then extract it to
//! memory. Backends are opened through an injected [`ArchiveOpener`] so the
//! actual codec crates stay outside this library.
//!
//! Every backend handle is shared (`Arc`) and must be internally
//! synchronised: the initialisation worker and lookup callers may touch the
//! same archive concurrently.

pub mod dir_fs;
pub mod memory;
mod table;

pub use dir_fs::DirectoryArchive;
pub use memory::MemoryArchive;
pub use table::{ArchiveFileTable, FileNode};

use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// One level of an archive's directory tree, produced by a backend's
/// enumerator. Used solely to build the in-memory file table at mount time.
#[derive(Debug, Clone, Default)]
pub struct ArchiveDirectory {
    /// Entry name; the root directory has an empty name.
    pub name: String,
    /// File names directly inside this directory.
    pub files: Vec<String>,
    /// Sub-directories.
    pub directories: Vec<ArchiveDirectory>,
}

impl ArchiveDirectory {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            files: Vec::new(),
            directories: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.directories.is_empty()
    }
}

/// An open file inside a Source-family archive.
pub trait ArchiveStream: Send {
    /// Uncompressed size of the file.
    fn size(&self) -> u32;

    /// Reads the whole file. `None` on any decode or I/O failure; the caller
    /// treats that as "archive does not contain the path" and moves on.
    fn read_all(&mut self) -> Option<Vec<u8>>;
}

/// Stream-model backend for VPK packages.
pub trait SourceArchive: Send + Sync {
    /// Restricts subsequent [`open_file`] calls to a sub-directory inside
    /// the archive. The default implementation ignores the call.
    ///
    /// [`open_file`]: SourceArchive::open_file
    fn set_root_directory(&self, rel_path: &str) {
        let _ = rel_path;
    }

    /// Enumerates the archive's full directory tree.
    fn root_directory(&self) -> ArchiveDirectory;

    /// Opens a file by normalised forward-slash path.
    fn open_file(&self, path: &str) -> Option<Box<dyn ArchiveStream>>;
}

/// Direct-extract backend for Bethesda packages.
#[cfg(feature = "bethesda")]
pub trait BethesdaArchive: Send + Sync {
    /// Whether the archive contains the given backslash-separated path.
    fn contains(&self, path: &str) -> bool;

    /// Extracts a contained asset to memory. `None` on any failure.
    fn extract(&self, path: &str) -> Option<Vec<u8>>;

    /// All asset paths in the archive, as stored in its name table.
    fn asset_paths(&self) -> Vec<String>;
}

/// Tagged sum over the backend variants a mounted game can hold.
#[derive(Clone)]
pub enum ArchiveBackend {
    Vpk(Arc<dyn SourceArchive>),
    #[cfg(feature = "bethesda")]
    Bsa(Arc<dyn BethesdaArchive>),
    #[cfg(feature = "bethesda")]
    Ba2(Arc<dyn BethesdaArchive>),
}

impl ArchiveBackend {
    pub fn kind_name(&self) -> &'static str {
        match self {
            ArchiveBackend::Vpk(_) => "vpk",
            #[cfg(feature = "bethesda")]
            ArchiveBackend::Bsa(_) => "bsa",
            #[cfg(feature = "bethesda")]
            ArchiveBackend::Ba2(_) => "ba2",
        }
    }
}

impl fmt::Debug for ArchiveBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ArchiveBackend")
            .field(&self.kind_name())
            .finish()
    }
}

/// Factory for archive backends, injected into the mount manager.
///
/// `initialize` / `shutdown` are one-shot hooks for backend families that
/// need process-global setup; the manager calls them once per manager
/// lifetime, from the worker thread and the destructor respectively.
pub trait ArchiveOpener: Send + Sync {
    fn initialize(&self) {}

    fn shutdown(&self) {}

    /// Opens a VPK package. `None` on any failure.
    fn open_vpk(&self, path: &Path) -> Option<Arc<dyn SourceArchive>>;

    /// Opens a BSA package. `None` on any failure.
    #[cfg(feature = "bethesda")]
    fn open_bsa(&self, path: &Path) -> Option<Arc<dyn BethesdaArchive>> {
        let _ = path;
        None
    }

    /// Opens a BA2 package. `None` on any failure.
    #[cfg(feature = "bethesda")]
    fn open_ba2(&self, path: &Path) -> Option<Arc<dyn BethesdaArchive>> {
        let _ = path;
        None
    }
}

/// Opener that mounts plain directories as archives and declines anything
/// else. The stand-in used when no real codec backends are linked in; also
/// handy for unpacked mod content.
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectoryOpener;

impl ArchiveOpener for DirectoryOpener {
    fn open_vpk(&self, path: &Path) -> Option<Arc<dyn SourceArchive>> {
        if path.is_dir() {
            Some(Arc::new(DirectoryArchive::new(path)))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_kind_names() {
        let archive: Arc<dyn SourceArchive> = Arc::new(MemoryArchive::new());
        assert_eq!(ArchiveBackend::Vpk(archive).kind_name(), "vpk");
    }

    #[test]
    fn directory_opener_declines_files() {
        let temp = tempfile::TempDir::new().unwrap();
        let file = temp.path().join("pak01_dir.vpk");
        std::fs::write(&file, b"not a real vpk").unwrap();

        let opener = DirectoryOpener;
        assert!(opener.open_vpk(&file).is_none());
        assert!(opener.open_vpk(temp.path()).is_some());
    }
}
