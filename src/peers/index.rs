//! The before/after peer index.

use super::arena::SnapshotArena;
use super::correlate;
use super::favor::FavorRelease;
use crate::error::CorrelationError;
use crate::model::{BuildSide, FileEntry, FileRef, PackageSnapshot, SnapshotId, Verb};
use crate::utils::Fingerprint;
use indexmap::IndexMap;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// How a correlated file changed between builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Unchanged,
    Changed,
    Added,
    Removed,
    /// Same content at another path or in another subpackage
    Moved,
}

impl ChangeKind {
    /// The finding verb for this change, if it is reportable as one.
    #[must_use]
    pub const fn verb(&self) -> Option<Verb> {
        match self {
            Self::Unchanged => None,
            Self::Changed | Self::Moved => Some(Verb::Changed),
            Self::Added => Some(Verb::Added),
            Self::Removed => Some(Verb::Removed),
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unchanged => "unchanged",
            Self::Changed => "changed",
            Self::Added => "added",
            Self::Removed => "removed",
            Self::Moved => "moved",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One file matched (or not) across builds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCorrelation {
    pub before: Option<FileRef>,
    pub after: Option<FileRef>,
    pub moved_path: bool,
    pub moved_subpackage: bool,
    /// More than one move candidate was available
    pub ambiguous: bool,
    pub change: ChangeKind,
}

impl FileCorrelation {
    pub(super) fn unmatched(before: Option<FileRef>, after: Option<FileRef>) -> Self {
        let change = if before.is_some() {
            ChangeKind::Removed
        } else {
            ChangeKind::Added
        };
        Self {
            before,
            after,
            moved_path: false,
            moved_subpackage: false,
            ambiguous: false,
            change,
        }
    }

    #[must_use]
    pub const fn is_moved(&self) -> bool {
        self.moved_path || self.moved_subpackage
    }
}

/// A correlation with both sides resolved against the index.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedCorrelation<'a> {
    pub before: Option<&'a FileEntry>,
    pub after: Option<&'a FileEntry>,
    pub correlation: &'a FileCorrelation,
}

impl<'a> ResolvedCorrelation<'a> {
    /// Payload path, preferring the after side.
    #[must_use]
    pub fn path(&self) -> &'a str {
        self.after
            .or(self.before)
            .map_or("", |entry| entry.localpath.as_str())
    }
}

/// A package name with its snapshot on each side.
#[derive(Debug, Clone)]
pub struct PackagePeer {
    pub(super) name: String,
    pub(super) before: Option<SnapshotId>,
    pub(super) after: Option<SnapshotId>,
    pub(super) files: Vec<FileCorrelation>,
}

impl PackagePeer {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn before(&self) -> Option<SnapshotId> {
        self.before
    }

    #[must_use]
    pub const fn after(&self) -> Option<SnapshotId> {
        self.after
    }

    #[must_use]
    pub const fn side(&self, side: BuildSide) -> Option<SnapshotId> {
        match side {
            BuildSide::Before => self.before,
            BuildSide::After => self.after,
        }
    }

    /// File correlations ordered by payload path.
    #[must_use]
    pub fn files(&self) -> &[FileCorrelation] {
        &self.files
    }

    /// The package exists only in the after build.
    #[must_use]
    pub const fn is_added(&self) -> bool {
        self.before.is_none() && self.after.is_some()
    }

    /// The package exists only in the before build.
    #[must_use]
    pub const fn is_removed(&self) -> bool {
        self.before.is_some() && self.after.is_none()
    }

    #[must_use]
    pub const fn is_paired(&self) -> bool {
        self.before.is_some() && self.after.is_some()
    }
}

/// Counters collected while building an index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildStats {
    pub peers: usize,
    /// Duplicate snapshots dropped by the release tie-break
    pub shadowed_snapshots: usize,
    pub correlation_errors: usize,
    pub unchanged: usize,
    pub changed: usize,
    pub added: usize,
    pub removed: usize,
    pub moved_path: usize,
    pub moved_subpackage: usize,
    pub ambiguous: usize,
}

impl BuildStats {
    pub(super) fn record(
        &mut self,
        change: ChangeKind,
        moved_path: bool,
        moved_subpackage: bool,
        ambiguous: bool,
    ) {
        match change {
            ChangeKind::Unchanged | ChangeKind::Moved => self.unchanged += 1,
            ChangeKind::Changed => self.changed += 1,
            ChangeKind::Added => self.added += 1,
            ChangeKind::Removed => self.removed += 1,
        }
        self.moved_path += usize::from(moved_path);
        self.moved_subpackage += usize::from(moved_subpackage);
        self.ambiguous += usize::from(ambiguous);
    }
}

type NameOrdering = Box<dyn Fn(&str, &str) -> Ordering + Send + Sync>;

/// Builder for [`BuildPeerIndex`].
#[derive(Default)]
pub struct PeerIndexBuilder {
    favor_release: FavorRelease,
    name_ordering: Option<NameOrdering>,
}

impl fmt::Debug for PeerIndexBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeerIndexBuilder")
            .field("favor_release", &self.favor_release)
            .field("custom_ordering", &self.name_ordering.is_some())
            .finish()
    }
}

impl PeerIndexBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_favor_release(mut self, favor: FavorRelease) -> Self {
        self.favor_release = favor;
        self
    }

    /// Order peers with a custom comparison instead of alphabetically.
    ///
    /// Names the comparison considers equal fall back to byte order.
    #[must_use]
    pub fn with_name_ordering<F>(mut self, ordering: F) -> Self
    where
        F: Fn(&str, &str) -> Ordering + Send + Sync + 'static,
    {
        self.name_ordering = Some(Box::new(ordering));
        self
    }

    /// Pair both sides by package name and correlate their files.
    #[must_use]
    pub fn build(
        self,
        before: Vec<PackageSnapshot>,
        after: Vec<PackageSnapshot>,
    ) -> BuildPeerIndex {
        let mut stats = BuildStats::default();
        let mut errors = Vec::new();

        let mut before = self.group(before, BuildSide::Before, &mut stats);
        let mut after = self.group(after, BuildSide::After, &mut stats);

        let mut names: Vec<String> = before
            .keys()
            .chain(after.keys())
            .cloned()
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        match &self.name_ordering {
            Some(ordering) => names.sort_by(|a, b| ordering(a, b).then_with(|| a.cmp(b))),
            None => names.sort(),
        }

        let mut arena = SnapshotArena::default();
        let mut malformed = HashSet::new();
        let mut peers = Vec::with_capacity(names.len());
        for name in names {
            let before_id = before
                .remove(&name)
                .map(|s| admit(&mut arena, s, &mut malformed, &mut errors));
            let after_id = after
                .remove(&name)
                .map(|s| admit(&mut arena, s, &mut malformed, &mut errors));
            peers.push(PackagePeer {
                name,
                before: before_id,
                after: after_id,
                files: Vec::new(),
            });
        }

        correlate::correlate(&mut arena, &mut peers, &malformed, &mut stats);

        stats.peers = peers.len();
        stats.correlation_errors = errors.len();
        let by_name = peers
            .iter()
            .enumerate()
            .map(|(idx, peer)| (peer.name.clone(), idx))
            .collect();

        tracing::info!(
            peers = stats.peers,
            changed = stats.changed,
            added = stats.added,
            removed = stats.removed,
            moved = stats.moved_path + stats.moved_subpackage,
            errors = stats.correlation_errors,
            "Built peer index"
        );

        BuildPeerIndex {
            arena,
            peers,
            by_name,
            errors,
            stats,
        }
    }

    /// Group one side by name, applying the release tie-break to duplicates.
    fn group(
        &self,
        snapshots: Vec<PackageSnapshot>,
        side: BuildSide,
        stats: &mut BuildStats,
    ) -> HashMap<String, PackageSnapshot> {
        let mut grouped: IndexMap<String, Vec<PackageSnapshot>> = IndexMap::new();
        for mut snapshot in snapshots {
            if snapshot.side() != side {
                tracing::warn!(
                    package = snapshot.name(),
                    declared = %snapshot.side(),
                    %side,
                    "Snapshot side does not match the build it was given in"
                );
                snapshot.set_side(side);
            }
            grouped
                .entry(snapshot.name().to_string())
                .or_default()
                .push(snapshot);
        }

        let mut chosen = HashMap::with_capacity(grouped.len());
        for (name, candidates) in grouped {
            let Some((winner, shadowed)) = self.favor_release.select(candidates) else {
                continue;
            };
            for dropped in &shadowed {
                tracing::warn!(
                    package = %name,
                    %side,
                    kept = %winner.metadata().nvr(),
                    dropped = %dropped.metadata().nvr(),
                    favor = %self.favor_release,
                    "Dropping duplicate package snapshot"
                );
            }
            stats.shadowed_snapshots += shadowed.len();
            chosen.insert(name, winner);
        }
        chosen
    }
}

/// Validate a snapshot's files, clear stale links and move it into the arena.
fn admit(
    arena: &mut SnapshotArena,
    mut snapshot: PackageSnapshot,
    malformed: &mut HashSet<FileRef>,
    errors: &mut Vec<CorrelationError>,
) -> SnapshotId {
    let mut bad_positions = Vec::new();
    for (position, entry) in snapshot.files().iter().enumerate() {
        if let Err(reason) = entry.validate() {
            tracing::warn!(
                package = snapshot.name(),
                side = %snapshot.side(),
                position,
                "Malformed file entry: {reason}"
            );
            errors.push(CorrelationError {
                package: snapshot.name().to_string(),
                side: snapshot.side(),
                position,
                localpath: entry.localpath.clone(),
                reason,
            });
            bad_positions.push(position);
        }
    }
    for entry in snapshot.files_mut() {
        entry.unlink_peer();
    }

    let id = arena.insert(snapshot);
    malformed.extend(bad_positions.into_iter().map(|position| FileRef {
        snapshot: id,
        position,
    }));
    id
}

/// Package peers of a before/after build pair with their file correlations.
///
/// The index owns every snapshot. File peer links are [`FileRef`]s into the
/// index and are resolved with [`BuildPeerIndex::resolve`].
#[derive(Debug)]
pub struct BuildPeerIndex {
    arena: SnapshotArena,
    peers: Vec<PackagePeer>,
    by_name: HashMap<String, usize>,
    errors: Vec<CorrelationError>,
    stats: BuildStats,
}

impl BuildPeerIndex {
    /// Build with default options.
    #[must_use]
    pub fn build(before: Vec<PackageSnapshot>, after: Vec<PackageSnapshot>) -> Self {
        PeerIndexBuilder::new().build(before, after)
    }

    #[must_use]
    pub fn builder() -> PeerIndexBuilder {
        PeerIndexBuilder::new()
    }

    /// All peers in name order.
    #[must_use]
    pub fn peers(&self) -> &[PackagePeer] {
        &self.peers
    }

    #[must_use]
    pub fn peer(&self, name: &str) -> Option<&PackagePeer> {
        self.by_name.get(name).map(|&idx| &self.peers[idx])
    }

    #[must_use]
    pub fn snapshot(&self, id: SnapshotId) -> Option<&PackageSnapshot> {
        self.arena.get(id)
    }

    /// Live snapshots of one side, in peer order.
    pub fn snapshots(&self, side: BuildSide) -> impl Iterator<Item = &PackageSnapshot> + '_ {
        self.peers
            .iter()
            .filter_map(move |peer| peer.side(side))
            .filter_map(|id| self.arena.get(id))
    }

    /// Whether the index holds any before-side snapshot.
    #[must_use]
    pub fn has_before(&self) -> bool {
        self.snapshots(BuildSide::Before).next().is_some()
    }

    #[must_use]
    pub fn resolve(&self, fref: FileRef) -> Option<&FileEntry> {
        self.arena.file(fref)
    }

    /// The entry linked to `entry`, if its snapshot is still live.
    #[must_use]
    pub fn peer_of(&self, entry: &FileEntry) -> Option<&FileEntry> {
        entry.peer().and_then(|fref| self.arena.file(fref))
    }

    /// Correlations of a peer with both sides resolved.
    pub fn correlations<'a>(
        &'a self,
        peer: &'a PackagePeer,
    ) -> impl Iterator<Item = ResolvedCorrelation<'a>> + 'a {
        peer.files.iter().map(move |correlation| ResolvedCorrelation {
            before: correlation.before.and_then(|r| self.arena.file(r)),
            after: correlation.after.and_then(|r| self.arena.file(r)),
            correlation,
        })
    }

    #[must_use]
    pub fn before_files(&self, peer: &PackagePeer) -> &[FileEntry] {
        self.side_files(peer, BuildSide::Before)
    }

    #[must_use]
    pub fn after_files(&self, peer: &PackagePeer) -> &[FileEntry] {
        self.side_files(peer, BuildSide::After)
    }

    fn side_files(&self, peer: &PackagePeer, side: BuildSide) -> &[FileEntry] {
        peer.side(side)
            .and_then(|id| self.arena.get(id))
            .map(PackageSnapshot::files)
            .unwrap_or_default()
    }

    /// Entries that could not be correlated.
    #[must_use]
    pub fn errors(&self) -> &[CorrelationError] {
        &self.errors
    }

    /// Correlation errors recorded for one package.
    pub fn errors_for<'a>(
        &'a self,
        package: &'a str,
    ) -> impl Iterator<Item = &'a CorrelationError> + 'a {
        self.errors.iter().filter(move |e| e.package == package)
    }

    #[must_use]
    pub fn stats(&self) -> &BuildStats {
        &self.stats
    }

    #[must_use]
    pub fn live_snapshots(&self) -> usize {
        self.arena.len()
    }

    /// Hash of the peer and correlation layout.
    ///
    /// Two indexes built from the same snapshot sets produce the same
    /// fingerprint regardless of input order.
    #[must_use]
    pub fn fingerprint(&self) -> u64 {
        let mut fp = Fingerprint::new();
        for peer in &self.peers {
            fp.field(peer.name.as_bytes()).flags(&[
                u8::from(peer.before.is_some()) | (u8::from(peer.after.is_some()) << 1),
            ]);
            for c in &peer.files {
                for side in [c.before, c.after] {
                    let path = side
                        .and_then(|r| self.arena.file(r))
                        .map_or("", |entry| entry.localpath.as_str());
                    fp.field(path.as_bytes());
                }
                fp.flags(&[
                    u8::from(c.moved_path),
                    u8::from(c.moved_subpackage),
                    u8::from(c.ambiguous),
                    c.change as u8,
                ]);
            }
            fp.end_group();
        }
        fp.finish()
    }

    /// Tear down a snapshot and return it.
    ///
    /// Partner entries that pointed into the snapshot lose their peer link,
    /// as do the returned snapshot's own entries. Ids and refs issued for it
    /// no longer resolve.
    pub fn remove_snapshot(&mut self, id: SnapshotId) -> Option<PackageSnapshot> {
        let partners: Vec<FileRef> = self
            .arena
            .get(id)?
            .files()
            .iter()
            .filter_map(FileEntry::peer)
            .collect();

        for partner in partners {
            if let Some(entry) = self.arena.file_mut(partner) {
                if entry.peer().is_some_and(|p| p.snapshot == id) {
                    entry.unlink_peer();
                }
            }
        }

        let mut snapshot = self.arena.remove(id)?;
        for entry in snapshot.files_mut() {
            entry.unlink_peer();
        }
        tracing::debug!(package = snapshot.name(), side = %snapshot.side(), "Tore down snapshot");
        Some(snapshot)
    }
}
