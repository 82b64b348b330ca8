//! Per-level directory listings.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use crate::error::CompareError;

/// File or directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotEntry {
    pub name: String,
    pub kind: EntryKind,
    /// Permission bits only.
    pub mode: u32,
    pub size: u64,
}

/// Listing of a single directory level, sorted by name.
#[derive(Debug, Clone)]
pub struct DirectorySnapshot {
    root: PathBuf,
    entries: Vec<SnapshotEntry>,
}

impl DirectorySnapshot {
    /// List `dir` without descending into subdirectories.
    pub fn capture(dir: &Path) -> Result<Self, CompareError> {
        let io_err = |source| CompareError::Io {
            path: dir.to_path_buf(),
            source,
        };

        let mut entries = Vec::new();
        for entry in fs::read_dir(dir).map_err(io_err)? {
            let entry = entry.map_err(io_err)?;
            let meta = entry.metadata().map_err(|source| CompareError::Io {
                path: entry.path(),
                source,
            })?;

            entries.push(SnapshotEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                kind: if meta.is_dir() {
                    EntryKind::Directory
                } else {
                    EntryKind::File
                },
                mode: permission_bits(&meta),
                size: meta.len(),
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(Self {
            root: dir.to_path_buf(),
            entries,
        })
    }

    /// The directory this listing was taken from.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn entries(&self) -> &[SnapshotEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub(crate) fn permission_bits(meta: &fs::Metadata) -> u32 {
    meta.permissions().mode() & 0o7777
}
