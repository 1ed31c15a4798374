//! Directory-backed archive.
//!
//! Presents a loose directory tree through the [`SourceArchive`] interface,
//! so unpacked mod content can be mounted exactly like a package file.

use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::host::join_logical;
use crate::normalize::normalize_path;

use super::{ArchiveDirectory, ArchiveStream, SourceArchive};

pub struct DirectoryArchive {
    root: PathBuf,
    sub_root: Mutex<String>,
}

impl DirectoryArchive {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            sub_root: Mutex::new(String::new()),
        }
    }

    fn effective_root(&self) -> PathBuf {
        let sub_root = self.sub_root.lock().unwrap();
        if sub_root.is_empty() {
            self.root.clone()
        } else {
            join_logical(&self.root, &sub_root)
        }
    }
}

impl SourceArchive for DirectoryArchive {
    fn set_root_directory(&self, rel_path: &str) {
        *self.sub_root.lock().unwrap() = normalize_path(rel_path);
    }

    fn root_directory(&self) -> ArchiveDirectory {
        let mut tree = ArchiveDirectory::new("");
        enumerate(&self.root, &mut tree);
        tree
    }

    fn open_file(&self, path: &str) -> Option<Box<dyn ArchiveStream>> {
        let full = join_logical(&self.effective_root(), &normalize_path(path));
        let metadata = fs::metadata(&full).ok()?;
        if !metadata.is_file() {
            return None;
        }
        let file = File::open(&full).ok()?;
        Some(Box::new(DirectoryStream {
            file,
            size: metadata.len() as u32,
        }))
    }
}

struct DirectoryStream {
    file: File,
    size: u32,
}

impl ArchiveStream for DirectoryStream {
    fn size(&self) -> u32 {
        self.size
    }

    fn read_all(&mut self) -> Option<Vec<u8>> {
        let mut data = Vec::with_capacity(self.size as usize);
        self.file.read_to_end(&mut data).ok()?;
        Some(data)
    }
}

fn enumerate(dir: &Path, out: &mut ArchiveDirectory) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    let mut entries: Vec<_> = entries.flatten().collect();
    entries.sort_by_key(|e| e.file_name());
    for entry in entries {
        let name = entry.file_name().to_string_lossy().into_owned();
        let path = entry.path();
        if path.is_dir() {
            let mut sub = ArchiveDirectory::new(name);
            enumerate(&path, &mut sub);
            out.directories.push(sub);
        } else {
            out.files.push(name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_tree() -> TempDir {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("materials/models")).unwrap();
        fs::write(temp.path().join("materials/foo.vmt"), b"foo").unwrap();
        fs::write(temp.path().join("materials/models/skin.vtf"), b"skin").unwrap();
        temp
    }

    #[test]
    fn enumerates_the_directory_tree() {
        let temp = sample_tree();
        let archive = DirectoryArchive::new(temp.path());
        let tree = archive.root_directory();

        assert_eq!(tree.directories.len(), 1);
        assert_eq!(tree.directories[0].name, "materials");
        assert_eq!(tree.directories[0].files, vec!["foo.vmt"]);
        assert_eq!(tree.directories[0].directories[0].name, "models");
    }

    #[test]
    fn opens_files_by_normalised_path() {
        let temp = sample_tree();
        let archive = DirectoryArchive::new(temp.path());

        let mut stream = archive.open_file("MATERIALS\\FOO.VMT").unwrap();
        assert_eq!(stream.size(), 3);
        assert_eq!(stream.read_all().unwrap(), b"foo");

        assert!(archive.open_file("materials/missing.vmt").is_none());
        assert!(archive.open_file("materials").is_none());
    }

    #[test]
    fn set_root_directory_rebases_opens() {
        let temp = sample_tree();
        let archive = DirectoryArchive::new(temp.path());
        archive.set_root_directory("materials");

        let mut stream = archive.open_file("foo.vmt").unwrap();
        assert_eq!(stream.read_all().unwrap(), b"foo");
    }
}
