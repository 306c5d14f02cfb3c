//! File correlation between the before and after sides of every peer.
//!
//! Matching runs in two passes. The first pairs files with identical payload
//! paths inside one peer. The second looks at everything left over across
//! all peers, in peer order then file order, and detects files that moved
//! to another package (same path) or to another path (same basename and
//! checksum). Files are visited in path order so pairing does not depend on
//! the order of a snapshot's file list. The first available candidate wins;
//! a correlation is ambiguous when either side had more than one candidate.

use super::arena::SnapshotArena;
use super::index::{BuildStats, ChangeKind, FileCorrelation, PackagePeer};
use crate::model::{FileEntry, FileRef, SnapshotId};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

/// A file waiting for a partner.
#[derive(Debug, Clone, Copy)]
struct Pending {
    peer: usize,
    fref: FileRef,
}

/// Two files matched across builds.
#[derive(Debug, Clone, Copy)]
struct Pair {
    before: FileRef,
    after: FileRef,
    /// Peer the correlation is recorded in (the after file's peer)
    peer: usize,
    moved_path: bool,
    moved_subpackage: bool,
    ambiguous: bool,
}

/// Correlate the files of all peers, link matched entries and fill in
/// each peer's correlation list.
pub(super) fn correlate(
    arena: &mut SnapshotArena,
    peers: &mut [PackagePeer],
    malformed: &HashSet<FileRef>,
    stats: &mut BuildStats,
) {
    let mut pairs = Vec::new();
    let mut pending_before = Vec::new();
    let mut pending_after = Vec::new();

    for (peer_idx, peer) in peers.iter().enumerate() {
        let before = live_refs(arena, peer.before, malformed);
        let after = live_refs(arena, peer.after, malformed);
        match_by_path(
            arena,
            peer_idx,
            &before,
            &after,
            &mut pairs,
            &mut pending_before,
            &mut pending_after,
        );
    }

    let mut before_claimed = vec![false; pending_before.len()];
    let mut after_claimed = vec![false; pending_after.len()];

    detect_subpackage_moves(
        arena,
        &pending_before,
        &pending_after,
        &mut before_claimed,
        &mut after_claimed,
        &mut pairs,
    );
    detect_path_moves(
        arena,
        &pending_before,
        &pending_after,
        &mut before_claimed,
        &mut after_claimed,
        &mut pairs,
    );

    for pair in &pairs {
        if let Some(entry) = arena.file_mut(pair.before) {
            entry.link_peer(pair.after, pair.moved_path, pair.moved_subpackage);
        }
        if let Some(entry) = arena.file_mut(pair.after) {
            entry.link_peer(pair.before, pair.moved_path, pair.moved_subpackage);
        }
    }

    for pair in pairs {
        let change = match (arena.file(pair.before), arena.file(pair.after)) {
            (Some(b), Some(a)) if content_differs(b, a) => ChangeKind::Changed,
            _ if pair.moved_path || pair.moved_subpackage => ChangeKind::Moved,
            _ => ChangeKind::Unchanged,
        };
        stats.record(change, pair.moved_path, pair.moved_subpackage, pair.ambiguous);
        peers[pair.peer].files.push(FileCorrelation {
            before: Some(pair.before),
            after: Some(pair.after),
            moved_path: pair.moved_path,
            moved_subpackage: pair.moved_subpackage,
            ambiguous: pair.ambiguous,
            change,
        });
    }

    for (pending, _) in pending_before
        .iter()
        .zip(&before_claimed)
        .filter(|(_, claimed)| !**claimed)
    {
        stats.record(ChangeKind::Removed, false, false, false);
        peers[pending.peer]
            .files
            .push(FileCorrelation::unmatched(Some(pending.fref), None));
    }

    for (pending, _) in pending_after
        .iter()
        .zip(&after_claimed)
        .filter(|(_, claimed)| !**claimed)
    {
        stats.record(ChangeKind::Added, false, false, false);
        peers[pending.peer]
            .files
            .push(FileCorrelation::unmatched(None, Some(pending.fref)));
    }

    for peer in peers.iter_mut() {
        sort_correlations(arena, &mut peer.files);
    }
}

/// Refs to the well-formed files of a snapshot, in path order.
fn live_refs(
    arena: &SnapshotArena,
    id: Option<SnapshotId>,
    malformed: &HashSet<FileRef>,
) -> Vec<FileRef> {
    let Some(id) = id else {
        return Vec::new();
    };
    let Some(snapshot) = arena.get(id) else {
        return Vec::new();
    };
    let mut refs: Vec<FileRef> = (0..snapshot.files().len())
        .map(|position| FileRef {
            snapshot: id,
            position,
        })
        .filter(|fref| !malformed.contains(fref))
        .collect();
    refs.sort_by(|a, b| {
        let by_content = match (arena.file(*a), arena.file(*b)) {
            (Some(x), Some(y)) => visit_key(x).cmp(&visit_key(y)),
            _ => Ordering::Equal,
        };
        by_content.then(a.position.cmp(&b.position))
    });
    refs
}

fn visit_key(entry: &FileEntry) -> (&str, Option<&str>, u32) {
    (
        entry.localpath.as_str(),
        entry.checksum.as_deref(),
        entry.stat.mode,
    )
}

fn match_by_path(
    arena: &SnapshotArena,
    peer: usize,
    before: &[FileRef],
    after: &[FileRef],
    pairs: &mut Vec<Pair>,
    pending_before: &mut Vec<Pending>,
    pending_after: &mut Vec<Pending>,
) {
    let mut by_path: HashMap<&str, Vec<usize>> = HashMap::with_capacity(after.len());
    for (idx, fref) in after.iter().enumerate() {
        if let Some(entry) = arena.file(*fref) {
            by_path
                .entry(entry.localpath.as_str())
                .or_default()
                .push(idx);
        }
    }

    let mut claimed = vec![false; after.len()];
    for &fref in before {
        let matched = arena
            .file(fref)
            .and_then(|entry| by_path.get(entry.localpath.as_str()))
            .and_then(|candidates| candidates.iter().copied().find(|&idx| !claimed[idx]));

        match matched {
            Some(idx) => {
                claimed[idx] = true;
                pairs.push(Pair {
                    before: fref,
                    after: after[idx],
                    peer,
                    moved_path: false,
                    moved_subpackage: false,
                    ambiguous: false,
                });
            }
            None => pending_before.push(Pending { peer, fref }),
        }
    }

    for (idx, &fref) in after.iter().enumerate() {
        if !claimed[idx] {
            pending_after.push(Pending { peer, fref });
        }
    }
}

/// Same payload path, different package.
fn detect_subpackage_moves(
    arena: &SnapshotArena,
    pending_before: &[Pending],
    pending_after: &[Pending],
    before_claimed: &mut [bool],
    after_claimed: &mut [bool],
    pairs: &mut Vec<Pair>,
) {
    let after_by_path = group_by_path(arena, pending_after);
    let before_by_path = group_by_path(arena, pending_before);

    for (bi, pending) in pending_before.iter().enumerate() {
        let Some(entry) = arena.file(pending.fref) else {
            continue;
        };
        let Some(candidates) = after_by_path.get(entry.localpath.as_str()) else {
            continue;
        };
        let available: Vec<usize> = candidates
            .iter()
            .copied()
            .filter(|&ai| !after_claimed[ai] && pending_after[ai].peer != pending.peer)
            .collect();
        let Some(&ai) = available.first() else {
            continue;
        };

        let target_peer = pending_after[ai].peer;
        let rivals = before_by_path
            .get(entry.localpath.as_str())
            .map_or(0, |same_path| {
                same_path
                    .iter()
                    .filter(|&&other| {
                        !before_claimed[other] && pending_before[other].peer != target_peer
                    })
                    .count()
            });

        before_claimed[bi] = true;
        after_claimed[ai] = true;
        tracing::debug!(
            path = %entry.localpath,
            candidates = available.len(),
            rivals,
            "File moved to another subpackage"
        );
        pairs.push(Pair {
            before: pending.fref,
            after: pending_after[ai].fref,
            peer: target_peer,
            moved_path: false,
            moved_subpackage: true,
            ambiguous: available.len() > 1 || rivals > 1,
        });
    }
}

fn group_by_path<'a>(
    arena: &'a SnapshotArena,
    pending: &[Pending],
) -> HashMap<&'a str, Vec<usize>> {
    let mut by_path: HashMap<&str, Vec<usize>> = HashMap::new();
    for (idx, p) in pending.iter().enumerate() {
        if let Some(entry) = arena.file(p.fref) {
            by_path
                .entry(entry.localpath.as_str())
                .or_default()
                .push(idx);
        }
    }
    by_path
}

/// Unclaimed files keyed by basename and checksum.
fn group_by_content<'a>(
    arena: &'a SnapshotArena,
    pending: &[Pending],
    claimed: &[bool],
) -> HashMap<(&'a str, &'a str), Vec<usize>> {
    let mut by_content: HashMap<(&str, &str), Vec<usize>> = HashMap::new();
    for (idx, p) in pending.iter().enumerate() {
        if claimed[idx] {
            continue;
        }
        if let Some(entry) = arena.file(p.fref) {
            if let Some(checksum) = entry.checksum.as_deref() {
                by_content
                    .entry((entry.basename(), checksum))
                    .or_default()
                    .push(idx);
            }
        }
    }
    by_content
}

/// Same basename and checksum, different payload path.
fn detect_path_moves(
    arena: &SnapshotArena,
    pending_before: &[Pending],
    pending_after: &[Pending],
    before_claimed: &mut [bool],
    after_claimed: &mut [bool],
    pairs: &mut Vec<Pair>,
) {
    let after_by_content = group_by_content(arena, pending_after, after_claimed);
    let before_by_content = group_by_content(arena, pending_before, before_claimed);

    for (bi, pending) in pending_before.iter().enumerate() {
        if before_claimed[bi] {
            continue;
        }
        let Some(entry) = arena.file(pending.fref) else {
            continue;
        };
        let Some(checksum) = entry.checksum.as_deref() else {
            continue;
        };
        let key = (entry.basename(), checksum);
        let Some(candidates) = after_by_content.get(&key) else {
            continue;
        };

        let available: Vec<usize> = candidates
            .iter()
            .copied()
            .filter(|&ai| !after_claimed[ai])
            .filter(|&ai| {
                arena.file(pending_after[ai].fref).is_some_and(|other| {
                    other.localpath != entry.localpath && mime_compatible(entry, other)
                })
            })
            .collect();

        let Some(&ai) = available.first() else {
            continue;
        };
        let Some(target) = arena.file(pending_after[ai].fref) else {
            continue;
        };
        let rivals = before_by_content.get(&key).map_or(0, |same_content| {
            same_content
                .iter()
                .filter(|&&other| !before_claimed[other])
                .filter(|&&other| {
                    arena.file(pending_before[other].fref).is_some_and(|rival| {
                        rival.localpath != target.localpath && mime_compatible(rival, target)
                    })
                })
                .count()
        });

        before_claimed[bi] = true;
        after_claimed[ai] = true;
        let same_package = pending_after[ai].peer == pending.peer;
        tracing::debug!(
            path = %entry.localpath,
            same_package,
            candidates = available.len(),
            rivals,
            "File moved to another path"
        );
        pairs.push(Pair {
            before: pending.fref,
            after: pending_after[ai].fref,
            peer: pending_after[ai].peer,
            moved_path: same_package,
            moved_subpackage: !same_package,
            ambiguous: available.len() > 1 || rivals > 1,
        });
    }
}

fn mime_compatible(a: &FileEntry, b: &FileEntry) -> bool {
    match (a.mime_type.as_deref(), b.mime_type.as_deref()) {
        (Some(x), Some(y)) => x == y,
        _ => true,
    }
}

fn content_differs(before: &FileEntry, after: &FileEntry) -> bool {
    before.checksum != after.checksum || before.stat.file_type() != after.stat.file_type()
}

/// Order correlations by payload path so output does not depend on input order.
fn sort_correlations(arena: &SnapshotArena, files: &mut Vec<FileCorrelation>) {
    let path_of = |fref: Option<FileRef>| -> String {
        fref.and_then(|r| arena.file(r))
            .map(|entry| entry.localpath.clone())
            .unwrap_or_default()
    };

    let mut keyed: Vec<(String, String, FileCorrelation)> = files
        .drain(..)
        .map(|c| {
            let before = path_of(c.before);
            let primary = if c.after.is_some() {
                path_of(c.after)
            } else {
                before.clone()
            };
            (primary, before, c)
        })
        .collect();
    keyed.sort_by(|a, b| (&a.0, &a.1).cmp(&(&b.0, &b.1)));
    files.extend(keyed.into_iter().map(|(_, _, c)| c));
}
