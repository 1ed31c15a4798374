//! In-memory archive.
//!
//! Backs both the stream and the direct-extract models from a plain map of
//! normalised paths to byte buffers. This is the fixture used throughout the
//! test suites, and doubles as a carrier for synthetic content.

use std::collections::BTreeMap;
use std::sync::Mutex;

use crate::normalize::normalize_path;

use super::{ArchiveDirectory, ArchiveStream, SourceArchive};
#[cfg(feature = "bethesda")]
use super::BethesdaArchive;

#[derive(Default)]
pub struct MemoryArchive {
    files: BTreeMap<String, Vec<u8>>,
    sub_root: Mutex<String>,
}

impl MemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a file under its normalised path.
    pub fn insert(&mut self, path: &str, data: Vec<u8>) {
        self.files.insert(normalize_path(path), data);
    }

    /// Builder-style [`insert`].
    ///
    /// [`insert`]: MemoryArchive::insert
    pub fn with_file(mut self, path: &str, data: Vec<u8>) -> Self {
        self.insert(path, data);
        self
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    fn resolve_key(&self, path: &str) -> String {
        let normalised = normalize_path(path);
        let sub_root = self.sub_root.lock().unwrap();
        if sub_root.is_empty() {
            normalised
        } else {
            format!("{}/{}", sub_root, normalised)
        }
    }
}

impl SourceArchive for MemoryArchive {
    fn set_root_directory(&self, rel_path: &str) {
        *self.sub_root.lock().unwrap() = normalize_path(rel_path);
    }

    fn root_directory(&self) -> ArchiveDirectory {
        let mut tree = ArchiveDirectory::new("");
        for path in self.files.keys() {
            let components: Vec<&str> = path.split('/').filter(|c| !c.is_empty()).collect();
            let Some((file_name, dirs)) = components.split_last() else {
                continue;
            };
            let mut node = &mut tree;
            for dir in dirs {
                let index = match node.directories.iter().position(|d| d.name == *dir) {
                    Some(index) => index,
                    None => {
                        node.directories.push(ArchiveDirectory::new(*dir));
                        node.directories.len() - 1
                    }
                };
                node = &mut node.directories[index];
            }
            node.files.push((*file_name).to_string());
        }
        tree
    }

    fn open_file(&self, path: &str) -> Option<Box<dyn ArchiveStream>> {
        let data = self.files.get(&self.resolve_key(path))?.clone();
        Some(Box::new(MemoryStream {
            size: data.len() as u32,
            data: Some(data),
        }))
    }
}

#[cfg(feature = "bethesda")]
impl BethesdaArchive for MemoryArchive {
    fn contains(&self, path: &str) -> bool {
        self.files.contains_key(&normalize_path(path))
    }

    fn extract(&self, path: &str) -> Option<Vec<u8>> {
        self.files.get(&normalize_path(path)).cloned()
    }

    fn asset_paths(&self) -> Vec<String> {
        self.files.keys().cloned().collect()
    }
}

struct MemoryStream {
    size: u32,
    data: Option<Vec<u8>>,
}

impl ArchiveStream for MemoryStream {
    fn size(&self) -> u32 {
        self.size
    }

    fn read_all(&mut self) -> Option<Vec<u8>> {
        self.data.take()
    }
}
