//! In-memory registry for archive-extracted assets.
//!
//! When a lookup pulls bytes out of an archive, the manager registers them
//! here under their normalised logical path. Host code can then re-open the
//! asset as a cheap in-memory stream without going back to the archive.

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::{Arc, RwLock};

use super::ReadSeek;

/// Shared byte buffer that can back multiple concurrent readers.
#[derive(Clone)]
struct SharedBytes(Arc<Vec<u8>>);

impl AsRef<[u8]> for SharedBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Registry of virtual files keyed by normalised logical path.
#[derive(Default)]
pub struct VirtualFileStore {
    files: RwLock<HashMap<String, Arc<Vec<u8>>>>,
}

impl VirtualFileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the bytes stored under `path`.
    pub fn add(&self, path: impl Into<String>, data: Vec<u8>) {
        self.files
            .write()
            .unwrap()
            .insert(path.into(), Arc::new(data));
    }

    /// Opens a registered file as a seekable in-memory stream.
    pub fn open(&self, path: &str) -> Option<Box<dyn ReadSeek>> {
        let files = self.files.read().unwrap();
        let data = files.get(path)?;
        Some(Box::new(Cursor::new(SharedBytes(Arc::clone(data)))))
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.read().unwrap().contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.files.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
