//! Pairing of before/after package snapshots and their payload files.
//!
//! [`BuildPeerIndex`] owns every snapshot of a comparison in a generational
//! arena. Peers are formed by package name, files are correlated by payload
//! path, and leftovers are checked for moves across paths and subpackages.

mod arena;
mod correlate;
mod favor;
mod index;

pub use favor::FavorRelease;
pub use index::{
    BuildPeerIndex, BuildStats, ChangeKind, FileCorrelation, PackagePeer, PeerIndexBuilder,
    ResolvedCorrelation,
};
