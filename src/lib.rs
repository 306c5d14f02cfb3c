//! **Build-pair correlation and inspection for package sets.**
//!
//! `peerdiff` compares two builds of the same set of packages (a *before* and
//! an *after* build), pairs up packages and their payload files across the
//! builds, and runs inspections over the pairs. Findings are judged against
//! a severity threshold to produce a pass/fail verdict.
//!
//! ## Core Concepts & Modules
//!
//! - **[`cache`]**: [`MetadataCache`], a load-once store of parsed package
//!   metadata shared by every snapshot of a package.
//! - **[`peers`]**: [`BuildPeerIndex`] pairs same-named packages across the
//!   builds and correlates their files, detecting files that moved to another
//!   path or another subpackage.
//! - **[`policy`]**: per-package security rules. The
//!   [`SecurityPolicyResolver`] picks the most specific clause for a package
//!   build.
//! - **[`results`]**: the [`ResultAggregator`] collects findings from
//!   concurrent inspections and tracks the worst severity.
//! - **[`inspect`]**: the inspection run, its borrowed context and the
//!   built-in inspections.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use peerdiff::{
//!     BuildPeerIndex, BuildSide, FileEntry, PackageMetadata, PackageSnapshot,
//! };
//!
//! let before = PackageSnapshot::new(
//!     Arc::new(PackageMetadata::new("foo", "1.0", "1")),
//!     BuildSide::Before,
//! )
//! .with_files(vec![FileEntry::new("/usr/bin/foo").with_checksum("aaaa")]);
//! let after = PackageSnapshot::new(
//!     Arc::new(PackageMetadata::new("foo", "2.0", "1")),
//!     BuildSide::After,
//! )
//! .with_files(vec![FileEntry::new("/usr/bin/foo").with_checksum("bbbb")]);
//!
//! let index = BuildPeerIndex::build(vec![before], vec![after]);
//! for peer in index.peers() {
//!     for c in index.correlations(peer) {
//!         println!("{} {}", c.path(), c.correlation.change);
//!     }
//! }
//! ```

// Lint to discourage unwrap() in production code - prefer explicit error handling
#![warn(clippy::unwrap_used)]
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::similar_names
)]

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod inspect;
pub mod model;
pub mod peers;
pub mod policy;
pub mod results;
pub mod utils;

// Re-export main types for convenience
pub use cache::{BuildCaches, CacheStats, MetadataCache};
pub use config::{ConfigError, RunConfig, RunConfigBuilder, Validatable};
pub use error::{CorrelationError, ErrorContext, InspectError, MetadataErrorKind, Result};
pub use inspect::{
    Inspection, InspectionRun, InspectionRunner, PairedCheck, RunContext, SingleBuildCheck,
};
pub use model::{
    BuildSide, FileEntry, FileRef, FileStat, MetadataHandle, PackageMetadata, PackageSnapshot,
    Severity, SnapshotId, Verb, WaiverAuthority,
};
pub use peers::{
    BuildPeerIndex, BuildStats, ChangeKind, FavorRelease, FileCorrelation, PackagePeer,
    PeerIndexBuilder,
};
pub use policy::{RuleClause, SecurityPolicyResolver, SecurityRuleSet};
pub use results::{Finding, FindingParams, Report, ResultAggregator, Verdict};
