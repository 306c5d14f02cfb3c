//! Data model for build comparisons.
//!
//! This module defines the structures shared by every part of the engine:
//! package metadata handed out by the [`MetadataCache`](crate::cache::MetadataCache),
//! the payload files of a package snapshot, and the severity / waiver / verb
//! vocabulary used by findings.
//!
//! # Ownership
//!
//! - [`PackageMetadata`] is shared through [`MetadataHandle`] (`Arc`) and is
//!   never mutated after creation.
//! - [`FileEntry`] values are owned by exactly one [`PackageSnapshot`].
//! - A file's peer link is a [`FileRef`]: a generational reference that the
//!   [`BuildPeerIndex`](crate::peers::BuildPeerIndex) resolves, or reports as
//!   absent once the referenced snapshot has been torn down.

mod file;
mod finding;
mod metadata;
mod snapshot;

pub use file::*;
pub use finding::*;
pub use metadata::*;
pub use snapshot::*;
