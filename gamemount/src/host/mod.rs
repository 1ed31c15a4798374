//! Host filesystem seam.
//!
//! The mount core never calls `std::fs` directly; all platform I/O goes
//! through the [`HostFilesystem`] trait so the host process can substitute
//! its own filesystem layer. [`StdFilesystem`] is the default
//! implementation over `std::fs`.

pub mod virtual_files;

pub use virtual_files::VirtualFileStore;

use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Component, Path, PathBuf};

use glob::Pattern;

/// A readable, seekable stream. Blanket-implemented for anything that is
/// `Read + Seek + Send`.
pub trait ReadSeek: Read + Seek + Send {}

impl<T: Read + Seek + Send> ReadSeek for T {}

/// Wildcard comparator used for directory listings and archive table walks
/// (`*` and `?` globbing; case folding is the caller's concern).
pub(crate) enum Wildcard {
    Glob(Pattern),
    Literal(String),
}

impl Wildcard {
    /// Compiles a pattern, falling back to literal comparison when the
    /// pattern is not valid glob syntax.
    pub(crate) fn new(pattern: &str) -> Wildcard {
        match Pattern::new(pattern) {
            Ok(glob) => Wildcard::Glob(glob),
            Err(_) => Wildcard::Literal(pattern.to_string()),
        }
    }

    pub(crate) fn matches(&self, candidate: &str) -> bool {
        match self {
            Wildcard::Glob(glob) => glob.matches(candidate),
            Wildcard::Literal(literal) => literal == candidate,
        }
    }
}

/// Joins a normalised logical path onto a host base path, splitting on both
/// separator styles so Bethesda-normalised paths work on POSIX hosts.
pub(crate) fn join_logical(base: &Path, logical: &str) -> PathBuf {
    let mut path = base.to_path_buf();
    for component in logical.split(['/', '\\']).filter(|c| !c.is_empty()) {
        path.push(component);
    }
    path
}

/// A resolved file handle returned by the lookup surface.
///
/// Wraps either an open disk file or an in-memory view of archive-extracted
/// bytes, together with the path the bytes were resolved from.
pub struct LoadedFile {
    reader: Box<dyn ReadSeek>,
    source_path: String,
}

impl LoadedFile {
    pub(crate) fn new(reader: Box<dyn ReadSeek>, source_path: impl Into<String>) -> Self {
        Self {
            reader,
            source_path: source_path.into(),
        }
    }

    /// The path the file was resolved from: an absolute disk path for loose
    /// files, the normalised logical path for archive-extracted bytes.
    pub fn source_path(&self) -> &str {
        &self.source_path
    }

    /// Reads the remaining stream to the end.
    pub fn read_all(mut self) -> io::Result<Vec<u8>> {
        let mut data = Vec::new();
        self.reader.read_to_end(&mut data)?;
        Ok(data)
    }
}

impl Read for LoadedFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

impl Seek for LoadedFile {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.reader.seek(pos)
    }
}

/// Platform filesystem operations the mount core depends on.
///
/// Implementations must be callable from the initialisation worker thread as
/// well as from lookup callers.
pub trait HostFilesystem: Send + Sync {
    /// Whether `path` is an existing directory.
    fn is_dir(&self, path: &Path) -> bool;

    /// Opens a file for reading; `None` if it does not exist or is not a
    /// regular file.
    fn open_read(&self, path: &Path) -> Option<Box<dyn ReadSeek>>;

    /// Lists entries of `dir` whose names match `pattern` (case-insensitive
    /// wildcard), appending file names to `files` and directory names to
    /// `dirs`.
    fn find(
        &self,
        dir: &Path,
        pattern: &str,
        files: Option<&mut Vec<String>>,
        dirs: Option<&mut Vec<String>>,
    );

    /// Lexical path cleanup: resolves `.` and `..` without touching the
    /// filesystem, so non-existent search paths stay usable.
    fn canonicalize(&self, path: &Path) -> PathBuf;

    /// Fully resolves `path` through symlinks to an absolute path.
    fn resolve_link(&self, path: &Path) -> Option<PathBuf>;

    /// Reads a whole file as UTF-8 text.
    fn read_to_string(&self, path: &Path) -> Option<String>;
}

/// Default [`HostFilesystem`] over `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdFilesystem;

impl HostFilesystem for StdFilesystem {
    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn open_read(&self, path: &Path) -> Option<Box<dyn ReadSeek>> {
        if !fs::metadata(path).map(|m| m.is_file()).unwrap_or(false) {
            return None;
        }
        File::open(path)
            .ok()
            .map(|file| Box::new(file) as Box<dyn ReadSeek>)
    }

    fn find(
        &self,
        dir: &Path,
        pattern: &str,
        mut files: Option<&mut Vec<String>>,
        mut dirs: Option<&mut Vec<String>>,
    ) {
        let Ok(entries) = fs::read_dir(dir) else {
            return;
        };
        let matcher = Wildcard::new(pattern);
        let mut names: Vec<(String, bool)> = entries
            .flatten()
            .filter_map(|entry| {
                let name = entry.file_name().to_string_lossy().into_owned();
                let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
                matcher
                    .matches(&name.to_ascii_lowercase())
                    .then_some((name, is_dir))
            })
            .collect();
        names.sort();
        for (name, is_dir) in names {
            if is_dir {
                if let Some(dirs) = dirs.as_deref_mut() {
                    dirs.push(name);
                }
            } else if let Some(files) = files.as_deref_mut() {
                files.push(name);
            }
        }
    }

    fn canonicalize(&self, path: &Path) -> PathBuf {
        let mut out = PathBuf::new();
        for component in path.components() {
            match component {
                Component::CurDir => {}
                Component::ParentDir => {
                    if !out.pop() {
                        out.push("..");
                    }
                }
                other => out.push(other),
            }
        }
        out
    }

    fn resolve_link(&self, path: &Path) -> Option<PathBuf> {
        fs::canonicalize(path).ok()
    }

    fn read_to_string(&self, path: &Path) -> Option<String> {
        fs::read_to_string(path).ok()
    }
}
