//! In-memory file table for one mounted archive.
//!
//! The table is a trie of normalised names, materialised once right after an
//! archive is opened. Lookups walk it component by component under the
//! wildcard comparator; no archive I/O happens until actual file bytes are
//! requested through the backend handle.

use crate::host::Wildcard;
use crate::normalize::normalize_path;

use super::{ArchiveBackend, ArchiveDirectory};

/// One node of an archive file table: a file or a directory.
///
/// File nodes never have children. Names are stored already normalised
/// (lowercase, single component), so matching is a direct comparison under
/// the active wildcard.
#[derive(Debug, Clone, Default)]
pub struct FileNode {
    pub name: String,
    pub is_directory: bool,
    pub children: Vec<FileNode>,
}

impl FileNode {
    /// An empty directory root.
    pub fn root() -> FileNode {
        FileNode {
            name: String::new(),
            is_directory: true,
            children: Vec::new(),
        }
    }

    /// Inserts a path into the trie, creating intermediate directories.
    /// Accepts both separator styles.
    pub fn add(&mut self, path: &str, is_directory: bool) {
        let components: Vec<&str> = path
            .split(['/', '\\'])
            .filter(|c| !c.is_empty())
            .collect();
        let Some((leaf, dirs)) = components.split_last() else {
            return;
        };
        let parent = self.ensure_dirs(dirs);
        match parent.children.iter_mut().find(|c| c.name == *leaf) {
            Some(existing) => existing.is_directory |= is_directory,
            None => parent.children.push(FileNode {
                name: (*leaf).to_string(),
                is_directory,
                children: Vec::new(),
            }),
        }
    }

    /// Walks (creating as needed) the directory chain named by `components`
    /// and returns the deepest node.
    fn ensure_dirs(&mut self, components: &[&str]) -> &mut FileNode {
        let mut node = self;
        for component in components {
            let index = match node.children.iter().position(|c| c.name == *component) {
                Some(index) => {
                    node.children[index].is_directory = true;
                    index
                }
                None => {
                    node.children.push(FileNode {
                        name: (*component).to_string(),
                        is_directory: true,
                        children: Vec::new(),
                    });
                    node.children.len() - 1
                }
            };
            node = &mut node.children[index];
        }
        node
    }

    /// Matches `pattern` against the trie, appending file names to `files`
    /// and directory names to `dirs`.
    ///
    /// Interior components descend into every matching directory child; the
    /// final component collects both files and directories. Matches are
    /// appended without deduplication; merging across archives is the
    /// caller's concern.
    pub fn find(
        &self,
        pattern: &str,
        mut files: Option<&mut Vec<String>>,
        mut dirs: Option<&mut Vec<String>>,
    ) {
        let components: Vec<&str> = pattern
            .split(['/', '\\'])
            .filter(|c| !c.is_empty())
            .collect();
        if components.is_empty() {
            return;
        }
        let mut frontier: Vec<&FileNode> = vec![self];
        for (depth, component) in components.iter().enumerate() {
            let matcher = Wildcard::new(component);
            if depth + 1 == components.len() {
                for node in &frontier {
                    for child in &node.children {
                        if !matcher.matches(&child.name) {
                            continue;
                        }
                        if child.is_directory {
                            if let Some(dirs) = dirs.as_deref_mut() {
                                dirs.push(child.name.clone());
                            }
                        } else if let Some(files) = files.as_deref_mut() {
                            files.push(child.name.clone());
                        }
                    }
                }
                return;
            }
            let mut next = Vec::new();
            for node in &frontier {
                for child in &node.children {
                    if child.is_directory && matcher.matches(&child.name) {
                        next.push(child);
                    }
                }
            }
            if next.is_empty() {
                return;
            }
            frontier = next;
        }
    }

    /// Total number of file entries below this node.
    pub fn file_count(&self) -> usize {
        self.children
            .iter()
            .map(|c| {
                if c.is_directory {
                    c.file_count()
                } else {
                    1
                }
            })
            .sum()
    }
}

/// The file table of one mounted archive: a backend handle plus the trie of
/// its contents. Holds no open streams; bytes are pulled through the backend
/// on demand.
#[derive(Debug)]
pub struct ArchiveFileTable {
    pub backend: ArchiveBackend,
    pub identifier: String,
    pub root: FileNode,
}

impl ArchiveFileTable {
    pub fn new(identifier: impl Into<String>, backend: ArchiveBackend) -> Self {
        Self {
            backend,
            identifier: identifier.into(),
            root: FileNode::root(),
        }
    }

    /// Materialises the trie from a backend enumeration tree.
    pub fn populate_from(&mut self, directory: &ArchiveDirectory) {
        populate(&mut self.root, directory);
    }
}

fn populate(node: &mut FileNode, directory: &ArchiveDirectory) {
    for file in &directory.files {
        let name = convert_entry_name(file);
        if !name.is_empty() {
            node.add(&name, false);
        }
    }
    for sub in &directory.directories {
        let name = convert_entry_name(&sub.name);
        if name.is_empty() {
            // Wrapper-root node; splice its contents into the current level.
            populate(node, sub);
            continue;
        }
        let components: Vec<&str> = name
            .split(['/', '\\'])
            .filter(|c| !c.is_empty())
            .collect();
        populate(node.ensure_dirs(&components), sub);
    }
}

/// Normalises an enumerator entry name and strips a leading `root` segment,
/// an artefact of one backend's wrapper-root node.
fn convert_entry_name(raw: &str) -> String {
    let name = normalize_path(raw);
    if let Some(stripped) = name.strip_prefix("root/") {
        return stripped.to_string();
    }
    if name == "root" {
        return String::new();
    }
    name
}
