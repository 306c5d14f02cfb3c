//! Payload file entries.

use super::FileRef;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const S_IFMT: u32 = 0o170_000;
const S_IFDIR: u32 = 0o040_000;
const S_IFREG: u32 = 0o100_000;
const S_IFLNK: u32 = 0o120_000;
const S_ISUID: u32 = 0o4000;
const S_ISGID: u32 = 0o2000;
const S_ISVTX: u32 = 0o1000;
const S_IWOTH: u32 = 0o0002;

/// RPM-level file attribute flags (`%config`, `%doc`, `%ghost`, ...).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileFlags(u32);

impl FileFlags {
    pub const CONFIG: Self = Self(1 << 0);
    pub const DOC: Self = Self(1 << 1);
    pub const MISSINGOK: Self = Self(1 << 3);
    pub const NOREPLACE: Self = Self(1 << 4);
    pub const GHOST: Self = Self(1 << 6);
    pub const LICENSE: Self = Self(1 << 7);
    pub const README: Self = Self(1 << 8);

    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

/// Stat metadata of a payload file, as described by the package payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStat {
    /// Full `st_mode`, including the file type bits
    pub mode: u32,
    pub owner: String,
    pub group: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub mtime: i64,
}

impl Default for FileStat {
    fn default() -> Self {
        Self {
            mode: S_IFREG | 0o644,
            owner: "root".to_string(),
            group: "root".to_string(),
            size: 0,
            mtime: 0,
        }
    }
}

impl FileStat {
    /// File type bits of the mode.
    #[must_use]
    pub const fn file_type(&self) -> u32 {
        self.mode & S_IFMT
    }

    /// Permission bits, including setuid/setgid/sticky.
    #[must_use]
    pub const fn permissions(&self) -> u32 {
        self.mode & 0o7777
    }

    #[must_use]
    pub const fn is_regular(&self) -> bool {
        self.file_type() == S_IFREG
    }

    #[must_use]
    pub const fn is_dir(&self) -> bool {
        self.file_type() == S_IFDIR
    }

    #[must_use]
    pub const fn is_symlink(&self) -> bool {
        self.file_type() == S_IFLNK
    }

    #[must_use]
    pub const fn is_setuid(&self) -> bool {
        self.mode & S_ISUID != 0
    }

    #[must_use]
    pub const fn is_setgid(&self) -> bool {
        self.mode & S_ISGID != 0
    }

    /// World-writable, ignoring symlinks and sticky directories.
    #[must_use]
    pub const fn is_world_writable(&self) -> bool {
        if self.is_symlink() {
            return false;
        }
        if self.is_dir() && self.mode & S_ISVTX != 0 {
            return false;
        }
        self.mode & S_IWOTH != 0
    }
}

/// One payload file of a package snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Absolute path of the extracted file, if it was extracted
    #[serde(default)]
    pub fullpath: Option<PathBuf>,
    /// Path of the file inside the payload
    pub localpath: String,
    #[serde(default)]
    pub stat: FileStat,
    /// Index into the header's per-file arrays
    #[serde(default)]
    pub index: usize,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub checksum: Option<String>,
    #[serde(default)]
    pub capabilities: Option<String>,
    #[serde(default)]
    pub flags: FileFlags,
    #[serde(skip)]
    peer: Option<FileRef>,
    #[serde(skip)]
    moved_path: bool,
    #[serde(skip)]
    moved_subpackage: bool,
}

impl FileEntry {
    /// Create an entry for a payload path with default stat data.
    pub fn new(localpath: impl Into<String>) -> Self {
        Self {
            fullpath: None,
            localpath: localpath.into(),
            stat: FileStat::default(),
            index: 0,
            mime_type: None,
            checksum: None,
            capabilities: None,
            flags: FileFlags::empty(),
            peer: None,
            moved_path: false,
            moved_subpackage: false,
        }
    }

    #[must_use]
    pub fn with_stat(mut self, stat: FileStat) -> Self {
        self.stat = stat;
        self
    }

    #[must_use]
    pub fn with_mode(mut self, mode: u32) -> Self {
        self.stat.mode = mode;
        self
    }

    #[must_use]
    pub fn with_owner(mut self, owner: impl Into<String>, group: impl Into<String>) -> Self {
        self.stat.owner = owner.into();
        self.stat.group = group.into();
        self
    }

    #[must_use]
    pub fn with_checksum(mut self, checksum: impl Into<String>) -> Self {
        self.checksum = Some(checksum.into());
        self
    }

    #[must_use]
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    #[must_use]
    pub fn with_capabilities(mut self, caps: impl Into<String>) -> Self {
        self.capabilities = Some(caps.into());
        self
    }

    #[must_use]
    pub fn with_flags(mut self, flags: FileFlags) -> Self {
        self.flags = flags;
        self
    }

    #[must_use]
    pub fn with_fullpath(mut self, path: impl Into<PathBuf>) -> Self {
        self.fullpath = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_index(mut self, index: usize) -> Self {
        self.index = index;
        self
    }

    /// The matched counterpart in the other build, if any.
    ///
    /// Resolve it through [`BuildPeerIndex::resolve`](crate::peers::BuildPeerIndex::resolve);
    /// a reference whose snapshot has been torn down resolves to `None`.
    #[must_use]
    pub const fn peer(&self) -> Option<FileRef> {
        self.peer
    }

    #[must_use]
    pub const fn moved_path(&self) -> bool {
        self.moved_path
    }

    #[must_use]
    pub const fn moved_subpackage(&self) -> bool {
        self.moved_subpackage
    }

    /// Final path component of the payload path.
    #[must_use]
    pub fn basename(&self) -> &str {
        self.localpath
            .rsplit('/')
            .next()
            .unwrap_or(self.localpath.as_str())
    }

    /// Whether the file was extracted to disk.
    #[must_use]
    pub const fn is_extracted(&self) -> bool {
        self.fullpath.is_some()
    }

    /// Check the attributes correlation depends on.
    pub fn validate(&self) -> Result<(), String> {
        if self.localpath.is_empty() {
            return Err("empty payload path".to_string());
        }
        if !self.localpath.starts_with('/') {
            return Err(format!("payload path '{}' is not absolute", self.localpath));
        }
        if self.localpath.len() > 1 && self.localpath.ends_with('/') {
            return Err(format!("payload path '{}' has a trailing slash", self.localpath));
        }
        Ok(())
    }

    pub(crate) fn link_peer(&mut self, peer: FileRef, moved_path: bool, moved_subpackage: bool) {
        self.peer = Some(peer);
        self.moved_path = moved_path;
        self.moved_subpackage = moved_subpackage;
    }

    pub(crate) fn unlink_peer(&mut self) {
        self.peer = None;
        self.moved_path = false;
        self.moved_subpackage = false;
    }
}
