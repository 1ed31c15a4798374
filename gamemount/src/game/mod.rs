//! Per-game runtime state.
//!
//! A [`MountedGame`] is created by the manager's initialisation worker and
//! owned by the manager for its whole lifetime. It bundles the game's loose
//! search paths with its archive file tables; engine kind only selects the
//! path normaliser variant and the backend call shape.

use std::path::PathBuf;
use std::sync::Arc;

use crate::archive::{ArchiveBackend, ArchiveFileTable};
use crate::host::{join_logical, HostFilesystem, LoadedFile, VirtualFileStore};
use crate::mount::GameEngine;
use crate::normalize;

pub struct MountedGame {
    identifier: String,
    engine: GameEngine,
    info_index: usize,
    mounted_paths: Vec<PathBuf>,
    archives: Vec<ArchiveFileTable>,
    fs: Arc<dyn HostFilesystem>,
    virtual_files: Arc<VirtualFileStore>,
}

impl MountedGame {
    pub(crate) fn new(
        identifier: impl Into<String>,
        engine: GameEngine,
        fs: Arc<dyn HostFilesystem>,
        virtual_files: Arc<VirtualFileStore>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            engine,
            info_index: 0,
            mounted_paths: Vec::new(),
            archives: Vec::new(),
            fs,
            virtual_files,
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn engine(&self) -> GameEngine {
        self.engine
    }

    /// Index of this game's [`GameMountInfo`] in the manager's info list.
    ///
    /// [`GameMountInfo`]: crate::mount::GameMountInfo
    pub fn info_index(&self) -> usize {
        self.info_index
    }

    pub(crate) fn set_info_index(&mut self, index: usize) {
        self.info_index = index;
    }

    /// Absolute loose-file search paths, in mount order.
    pub fn mounted_paths(&self) -> &[PathBuf] {
        &self.mounted_paths
    }

    pub fn archives(&self) -> &[ArchiveFileTable] {
        &self.archives
    }

    /// Appends a loose-file search path. Order is preserved.
    pub(crate) fn mount_path(&mut self, path: impl Into<PathBuf>) {
        self.mounted_paths.push(path.into());
    }

    /// Appends an empty archive file table; the caller populates its trie.
    pub(crate) fn add_archive_table(
        &mut self,
        identifier: impl Into<String>,
        backend: ArchiveBackend,
    ) -> &mut ArchiveFileTable {
        self.archives.push(ArchiveFileTable::new(identifier, backend));
        self.archives
            .last_mut()
            .expect("archive list cannot be empty after push")
    }

    /// Searches both the loose and archived namespaces for `pattern`.
    ///
    /// With `keep_abs_paths` the appended loose entries are rewritten to
    /// absolute paths and archives are skipped entirely (disk-only absolute
    /// listings).
    pub fn find_files(
        &self,
        pattern: &str,
        mut files: Option<&mut Vec<String>>,
        mut dirs: Option<&mut Vec<String>>,
        keep_abs_paths: bool,
    ) {
        let npath = normalize::normalize_for_engine(self.engine, pattern);
        let (dir_part, name_part) = split_dir_name(&npath);
        for base in &self.mounted_paths {
            let file_offset = files.as_deref().map_or(0, |v| v.len());
            let dir_offset = dirs.as_deref().map_or(0, |v| v.len());
            let search = self.fs.canonicalize(&join_logical(base, dir_part));
            self.fs
                .find(&search, name_part, files.as_deref_mut(), dirs.as_deref_mut());
            if keep_abs_paths {
                if let Some(files) = files.as_deref_mut() {
                    for name in &mut files[file_offset..] {
                        *name = search.join(&*name).to_string_lossy().into_owned();
                    }
                }
                if let Some(dirs) = dirs.as_deref_mut() {
                    for name in &mut dirs[dir_offset..] {
                        *name = search.join(&*name).to_string_lossy().into_owned();
                    }
                }
            }
        }
        if keep_abs_paths {
            return;
        }
        let plain = normalize::normalize_path(&npath);
        for table in &self.archives {
            table
                .root
                .find(&plain, files.as_deref_mut(), dirs.as_deref_mut());
        }
    }

    /// Archive-only load; does not consult the loose search paths.
    ///
    /// Failure of a single archive is non-fatal: the search continues with
    /// the next one.
    pub fn load_bytes(&self, path: &str) -> Option<Vec<u8>> {
        if self.engine.is_source_family() {
            let npath = normalize::normalize_source_path(path);
            for table in &self.archives {
                let ArchiveBackend::Vpk(archive) = &table.backend else {
                    continue;
                };
                let Some(mut stream) = archive.open_file(&npath) else {
                    continue;
                };
                if let Some(data) = stream.read_all() {
                    return Some(data);
                }
            }
            return None;
        }
        #[cfg(feature = "bethesda")]
        if self.engine.is_bethesda_family() {
            let npath = normalize::normalize_bethesda_path(path);
            for table in &self.archives {
                let archive = match &table.backend {
                    ArchiveBackend::Bsa(archive) | ArchiveBackend::Ba2(archive) => archive,
                    ArchiveBackend::Vpk(_) => continue,
                };
                if !archive.contains(&npath) {
                    continue;
                }
                if let Some(data) = archive.extract(&npath) {
                    return Some(data);
                }
            }
        }
        None
    }

    /// Resolves `path` to a readable stream: loose disk files first, then
    /// archives. Archive hits are registered in the virtual-file store under
    /// their normalised path before a memory-backed stream is returned.
    pub fn load_stream(&self, path: &str) -> Option<LoadedFile> {
        let npath = normalize::normalize_for_engine(self.engine, path);
        for base in &self.mounted_paths {
            let full = join_logical(base, &npath);
            if let Some(reader) = self.fs.open_read(&full) {
                return Some(LoadedFile::new(reader, full.to_string_lossy().into_owned()));
            }
        }
        let data = self.load_bytes(path)?;
        self.virtual_files.add(npath.clone(), data);
        let reader = self.virtual_files.open(&npath)?;
        Some(LoadedFile::new(reader, npath))
    }
}

/// Splits a normalised path into its directory part and final component.
fn split_dir_name(path: &str) -> (&str, &str) {
    match path.rfind(['/', '\\']) {
        Some(index) => (&path[..index], &path[index + 1..]),
        None => ("", path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::{MemoryArchive, SourceArchive};
    use crate::host::StdFilesystem;
    use std::fs;
    use std::io::Read;
    use tempfile::TempDir;

    fn game_with_archive(engine: GameEngine, archive: MemoryArchive) -> MountedGame {
        let mut game = MountedGame::new(
            "test",
            engine,
            Arc::new(StdFilesystem),
            Arc::new(VirtualFileStore::new()),
        );
        let backend: Arc<dyn SourceArchive> = Arc::new(archive);
        let tree = backend.root_directory();
        let table = game.add_archive_table("test.vpk", ArchiveBackend::Vpk(backend));
        table.populate_from(&tree);
        game
    }

    #[test]
    fn load_bytes_normalises_per_engine() {
        let archive = MemoryArchive::new().with_file("sound/music/bar.wav", b"wav".to_vec());
        let game = game_with_archive(GameEngine::SourceEngine, archive);

        // The sounds alias resolves to the stored sound/ key.
        assert_eq!(game.load_bytes("sounds/music/bar.wav").unwrap(), b"wav");
        assert_eq!(game.load_bytes("SOUND\\MUSIC\\BAR.WAV").unwrap(), b"wav");
        assert!(game.load_bytes("sound/music/missing.wav").is_none());
    }

    #[test]
    fn load_stream_prefers_loose_files() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("materials")).unwrap();
        fs::write(temp.path().join("materials/foo.vmt"), b"loose").unwrap();

        let archive = MemoryArchive::new().with_file("materials/foo.vmt", b"archived".to_vec());
        let mut game = game_with_archive(GameEngine::SourceEngine, archive);
        game.mount_path(temp.path());

        let mut stream = game.load_stream("materials/foo.vmt").unwrap();
        let mut data = Vec::new();
        stream.read_to_end(&mut data).unwrap();
        assert_eq!(data, b"loose");
    }

    #[test]
    fn load_stream_falls_back_to_archives() {
        let archive = MemoryArchive::new().with_file("materials/foo.vmt", b"archived".to_vec());
        let game = game_with_archive(GameEngine::SourceEngine, archive);

        let stream = game.load_stream("materials/foo.vmt").unwrap();
        assert_eq!(stream.source_path(), "materials/foo.vmt");
        assert_eq!(stream.read_all().unwrap(), b"archived");

        // The extracted bytes were registered as a virtual file.
        assert!(game.virtual_files.contains("materials/foo.vmt"));
    }

    #[test]
    fn find_files_merges_loose_and_archives() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("materials")).unwrap();
        fs::write(temp.path().join("materials/disk.vmt"), b"d").unwrap();

        let archive = MemoryArchive::new().with_file("materials/packed.vmt", b"p".to_vec());
        let mut game = game_with_archive(GameEngine::SourceEngine, archive);
        game.mount_path(temp.path());

        let mut files = Vec::new();
        game.find_files("materials/*.vmt", Some(&mut files), None, false);
        files.sort();
        assert_eq!(files, vec!["disk.vmt", "packed.vmt"]);
    }

    #[test]
    fn keep_abs_paths_is_disk_only() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("materials")).unwrap();
        fs::write(temp.path().join("materials/disk.vmt"), b"d").unwrap();

        let archive = MemoryArchive::new().with_file("materials/packed.vmt", b"p".to_vec());
        let mut game = game_with_archive(GameEngine::SourceEngine, archive);
        game.mount_path(temp.path());

        let mut files = Vec::new();
        game.find_files("materials/*.vmt", Some(&mut files), None, true);
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("materials/disk.vmt"));
        assert!(PathBuf::from(&files[0]).is_absolute());
    }

    #[cfg(feature = "bethesda")]
    #[test]
    fn bethesda_games_use_the_direct_extract_model() {
        use crate::archive::BethesdaArchive;

        let archive = MemoryArchive::new().with_file("textures/art/tree.dds", b"dds".to_vec());
        let mut game = MountedGame::new(
            "fo4",
            GameEngine::CreationEngine,
            Arc::new(StdFilesystem),
            Arc::new(VirtualFileStore::new()),
        );
        let backend: Arc<dyn BethesdaArchive> = Arc::new(archive);
        let assets = backend.asset_paths();
        let table = game.add_archive_table("fo4.ba2", ArchiveBackend::Ba2(backend));
        for asset in assets {
            table
                .root
                .add(&crate::normalize::normalize_bethesda_path(&asset), false);
        }

        // materials → textures alias plus backslash separators.
        assert_eq!(game.load_bytes("materials/art/tree.dds").unwrap(), b"dds");

        let mut files = Vec::new();
        game.find_files("textures/art/*", Some(&mut files), None, false);
        assert_eq!(files, vec!["tree.dds"]);
    }
}
