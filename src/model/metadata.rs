//! Parsed package metadata.

use super::FileFlags;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Shared handle to immutable package metadata.
///
/// Every snapshot and file correlation that needs the metadata holds a clone
/// of the handle; the metadata and its raw header buffer are released when
/// the last holder drops it.
pub type MetadataHandle = Arc<PackageMetadata>;

/// Parsed descriptor of one package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageMetadata {
    pub name: String,
    #[serde(default)]
    pub epoch: Option<u32>,
    pub version: String,
    pub release: String,
    #[serde(default)]
    pub arch: Option<String>,
    /// File list declared by the package header
    #[serde(default)]
    pub files: Vec<DeclaredFile>,
    /// Raw header bytes the descriptor was parsed from
    #[serde(skip)]
    raw_header: Option<Box<[u8]>>,
}

/// A file as declared in the package header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclaredFile {
    pub path: String,
    pub mode: u32,
    #[serde(default = "default_owner")]
    pub owner: String,
    #[serde(default = "default_owner")]
    pub group: String,
    #[serde(default)]
    pub digest: Option<String>,
    #[serde(default)]
    pub flags: FileFlags,
}

fn default_owner() -> String {
    "root".to_string()
}

impl PackageMetadata {
    /// Create metadata for `name-version-release`.
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        release: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            epoch: None,
            version: version.into(),
            release: release.into(),
            arch: None,
            files: Vec::new(),
            raw_header: None,
        }
    }

    #[must_use]
    pub fn with_epoch(mut self, epoch: u32) -> Self {
        self.epoch = Some(epoch);
        self
    }

    #[must_use]
    pub fn with_arch(mut self, arch: impl Into<String>) -> Self {
        self.arch = Some(arch.into());
        self
    }

    #[must_use]
    pub fn with_files(mut self, files: Vec<DeclaredFile>) -> Self {
        self.files = files;
        self
    }

    /// Attach the raw header buffer this metadata was parsed from.
    #[must_use]
    pub fn with_raw_header(mut self, raw: impl Into<Box<[u8]>>) -> Self {
        self.raw_header = Some(raw.into());
        self
    }

    #[must_use]
    pub fn raw_header(&self) -> Option<&[u8]> {
        self.raw_header.as_deref()
    }

    /// `name-version-release`
    #[must_use]
    pub fn nvr(&self) -> String {
        format!("{}-{}-{}", self.name, self.version, self.release)
    }

    /// `[epoch:]version-release`
    #[must_use]
    pub fn evr(&self) -> String {
        match self.epoch {
            Some(epoch) if epoch > 0 => format!("{epoch}:{}-{}", self.version, self.release),
            _ => format!("{}-{}", self.version, self.release),
        }
    }

    /// Look up a declared file by payload path.
    #[must_use]
    pub fn declared_file(&self, path: &str) -> Option<&DeclaredFile> {
        self.files.iter().find(|f| f.path == path)
    }
}
