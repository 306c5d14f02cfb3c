//! Package snapshots and the references between their files.

use super::{FileEntry, MetadataHandle};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Which build of the comparison a snapshot belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildSide {
    Before,
    After,
}

impl BuildSide {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Before => "before",
            Self::After => "after",
        }
    }

    #[must_use]
    pub const fn opposite(&self) -> Self {
        match self {
            Self::Before => Self::After,
            Self::After => Self::Before,
        }
    }
}

impl fmt::Display for BuildSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Generational id of a snapshot held by a peer index.
///
/// The generation changes when the slot is torn down, so ids issued before
/// the teardown no longer resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SnapshotId {
    pub(crate) slot: u32,
    pub(crate) generation: u32,
}

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.slot, self.generation)
    }
}

/// Non-owning reference to one file of a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileRef {
    pub snapshot: SnapshotId,
    /// Position in the snapshot's file list
    pub position: usize,
}

/// The payload files and metadata of one package on one side of a comparison.
#[derive(Debug, Clone)]
pub struct PackageSnapshot {
    metadata: MetadataHandle,
    side: BuildSide,
    /// Path of the package archive
    pub package_path: Option<PathBuf>,
    /// Root directory the payload was extracted to
    pub extracted_root: Option<PathBuf>,
    files: Vec<FileEntry>,
}

impl PackageSnapshot {
    #[must_use]
    pub fn new(metadata: MetadataHandle, side: BuildSide) -> Self {
        Self {
            metadata,
            side,
            package_path: None,
            extracted_root: None,
            files: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_files(mut self, files: Vec<FileEntry>) -> Self {
        self.files = files;
        self
    }

    #[must_use]
    pub fn with_package_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.package_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_extracted_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.extracted_root = Some(root.into());
        self
    }

    pub fn push_file(&mut self, file: FileEntry) {
        self.files.push(file);
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    #[must_use]
    pub fn metadata(&self) -> &MetadataHandle {
        &self.metadata
    }

    #[must_use]
    pub const fn side(&self) -> BuildSide {
        self.side
    }

    #[must_use]
    pub fn files(&self) -> &[FileEntry] {
        &self.files
    }

    #[must_use]
    pub fn file(&self, position: usize) -> Option<&FileEntry> {
        self.files.get(position)
    }

    pub(crate) fn set_side(&mut self, side: BuildSide) {
        self.side = side;
    }

    pub(crate) fn file_mut(&mut self, position: usize) -> Option<&mut FileEntry> {
        self.files.get_mut(position)
    }

    pub(crate) fn files_mut(&mut self) -> &mut [FileEntry] {
        &mut self.files
    }

    /// Find a file by payload path.
    #[must_use]
    pub fn find(&self, localpath: &str) -> Option<&FileEntry> {
        self.files.iter().find(|f| f.localpath == localpath)
    }
}
