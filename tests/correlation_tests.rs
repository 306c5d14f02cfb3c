//! Integration tests for package peering and file correlation.

use peerdiff::{
    BuildPeerIndex, BuildSide, ChangeKind, FavorRelease, FileEntry, PackageMetadata,
    PackageSnapshot,
};
use std::sync::Arc;

// ============================================================================
// Helpers
// ============================================================================

fn snapshot(
    side: BuildSide,
    name: &str,
    version: &str,
    files: Vec<FileEntry>,
) -> PackageSnapshot {
    PackageSnapshot::new(
        Arc::new(PackageMetadata::new(name, version, "1").with_arch("x86_64")),
        side,
    )
    .with_files(files)
}

fn file(path: &str, checksum: &str) -> FileEntry {
    FileEntry::new(path).with_checksum(checksum)
}

fn changes(index: &BuildPeerIndex, package: &str) -> Vec<(String, ChangeKind)> {
    let peer = index.peer(package).expect("peer");
    index
        .correlations(peer)
        .map(|c| (c.path().to_string(), c.correlation.change))
        .collect()
}

// ============================================================================
// Single package
// ============================================================================

mod single_package {
    use super::*;

    #[test]
    fn test_changed_binary_scenario() {
        let before = snapshot(
            BuildSide::Before,
            "foo",
            "1.0",
            vec![file("/usr/bin/foo", "A").with_mode(0o100_755)],
        );
        let after = snapshot(
            BuildSide::After,
            "foo",
            "2.0",
            vec![file("/usr/bin/foo", "B").with_mode(0o100_755)],
        );

        let index = BuildPeerIndex::build(vec![before], vec![after]);
        assert_eq!(index.peers().len(), 1);

        let peer = &index.peers()[0];
        assert!(peer.is_paired());
        let correlations: Vec<_> = index.correlations(peer).collect();
        assert_eq!(correlations.len(), 1);

        let c = &correlations[0];
        assert_eq!(c.correlation.change, ChangeKind::Changed);
        assert!(!c.correlation.moved_path);
        assert!(!c.correlation.moved_subpackage);
        assert_eq!(c.before.map(|e| e.checksum.as_deref()), Some(Some("A")));
        assert_eq!(c.after.map(|e| e.checksum.as_deref()), Some(Some("B")));
    }

    #[test]
    fn test_added_removed_unchanged() {
        let before = snapshot(
            BuildSide::Before,
            "foo",
            "1.0",
            vec![file("/usr/bin/foo", "A"), file("/usr/bin/old", "O")],
        );
        let after = snapshot(
            BuildSide::After,
            "foo",
            "1.0",
            vec![file("/usr/bin/foo", "A"), file("/usr/bin/new", "N")],
        );

        let index = BuildPeerIndex::build(vec![before], vec![after]);
        assert_eq!(
            changes(&index, "foo"),
            vec![
                ("/usr/bin/foo".to_string(), ChangeKind::Unchanged),
                ("/usr/bin/new".to_string(), ChangeKind::Added),
                ("/usr/bin/old".to_string(), ChangeKind::Removed),
            ]
        );
        let stats = index.stats();
        assert_eq!((stats.unchanged, stats.added, stats.removed), (1, 1, 1));
    }

    #[test]
    fn test_moved_path_links_both_sides() {
        let before = snapshot(
            BuildSide::Before,
            "foo",
            "1.0",
            vec![file("/usr/share/foo/data.bin", "D")],
        );
        let after = snapshot(
            BuildSide::After,
            "foo",
            "1.0",
            vec![file("/usr/share/foo/v2/data.bin", "D")],
        );

        let index = BuildPeerIndex::build(vec![before], vec![after]);
        let peer = index.peer("foo").expect("peer");
        let c = index.correlations(peer).next().expect("correlation");

        assert_eq!(c.correlation.change, ChangeKind::Moved);
        assert!(c.correlation.moved_path);
        assert!(!c.correlation.ambiguous);

        let before = c.before.expect("before");
        let after = c.after.expect("after");
        assert!(before.moved_path() && after.moved_path());
        assert_eq!(
            index.peer_of(after).map(|e| e.localpath.as_str()),
            Some("/usr/share/foo/data.bin")
        );
        assert_eq!(
            index.peer_of(before).map(|e| e.localpath.as_str()),
            Some("/usr/share/foo/v2/data.bin")
        );
    }

    #[test]
    fn test_after_only_build() {
        let after = snapshot(
            BuildSide::After,
            "foo",
            "1.0",
            vec![file("/usr/bin/foo", "A")],
        );
        let index = BuildPeerIndex::build(Vec::new(), vec![after]);

        assert!(!index.has_before());
        let peer = index.peer("foo").expect("peer");
        assert!(peer.is_added());
        assert_eq!(changes(&index, "foo")[0].1, ChangeKind::Added);
    }
}

// ============================================================================
// Multiple packages
// ============================================================================

mod subpackages {
    use super::*;

    #[test]
    fn test_file_moved_between_subpackages() {
        let before = vec![
            snapshot(BuildSide::Before, "foo", "1.0", vec![file("/usr/bin/foo", "A")]),
            snapshot(
                BuildSide::Before,
                "foo-libs",
                "1.0",
                vec![file("/usr/lib64/libfoo.so.1", "L")],
            ),
        ];
        let after = vec![
            snapshot(
                BuildSide::After,
                "foo",
                "1.0",
                vec![file("/usr/bin/foo", "A"), file("/usr/lib64/libfoo.so.1", "L")],
            ),
            snapshot(BuildSide::After, "foo-libs", "1.0", Vec::new()),
        ];

        let index = BuildPeerIndex::build(before, after);
        let foo = index.peer("foo").expect("foo");
        let moved: Vec<_> = index
            .correlations(foo)
            .filter(|c| c.correlation.moved_subpackage)
            .collect();
        assert_eq!(moved.len(), 1);
        assert_eq!(moved[0].path(), "/usr/lib64/libfoo.so.1");
        assert_eq!(moved[0].correlation.change, ChangeKind::Moved);

        // Nothing left behind as removed in the old owner
        let libs = index.peer("foo-libs").expect("foo-libs");
        assert!(index.correlations(libs).next().is_none());
        assert_eq!(index.stats().moved_subpackage, 1);
    }

    #[test]
    fn test_ambiguous_move_takes_first_candidate() {
        let before = vec![snapshot(
            BuildSide::Before,
            "foo",
            "1.0",
            vec![file("/usr/share/foo/logo.png", "P")],
        )];
        let after = vec![
            snapshot(
                BuildSide::After,
                "foo",
                "1.0",
                vec![file("/usr/share/foo/a/logo.png", "P")],
            ),
            snapshot(
                BuildSide::After,
                "foo-data",
                "1.0",
                vec![file("/usr/share/foo-data/logo.png", "P")],
            ),
        ];

        let index = BuildPeerIndex::build(before, after);
        let foo = index.peer("foo").expect("foo");
        let c = index
            .correlations(foo)
            .find(|c| c.correlation.before.is_some())
            .expect("paired");
        assert!(c.correlation.ambiguous);
        assert!(c.correlation.moved_path);
        assert_eq!(c.path(), "/usr/share/foo/a/logo.png");

        assert_eq!(changes(&index, "foo-data")[0].1, ChangeKind::Added);
        assert_eq!(index.stats().ambiguous, 1);
    }

    #[test]
    fn test_input_order_does_not_matter() {
        let build = |reverse: bool| {
            let mut before = vec![
                snapshot(BuildSide::Before, "a", "1", vec![file("/a", "1"), file("/x", "X")]),
                snapshot(BuildSide::Before, "b", "1", vec![file("/b", "2")]),
                snapshot(BuildSide::Before, "c", "1", vec![file("/c", "3")]),
            ];
            let mut after = vec![
                snapshot(BuildSide::After, "a", "2", vec![file("/a", "9")]),
                snapshot(BuildSide::After, "b", "2", vec![file("/b", "2"), file("/x", "X")]),
                snapshot(BuildSide::After, "d", "2", vec![file("/d", "4")]),
            ];
            if reverse {
                before.reverse();
                after.reverse();
            }
            BuildPeerIndex::build(before, after)
        };

        let forward = build(false);
        let reversed = build(true);
        assert_eq!(forward.fingerprint(), reversed.fingerprint());
        let names: Vec<&str> = forward.peers().iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_file_order_does_not_change_move_pairing() {
        let build = |reverse: bool| {
            let mut files = vec![
                file("/usr/lib/a/lib.so", "L"),
                file("/usr/lib/b/lib.so", "L"),
            ];
            if reverse {
                files.reverse();
            }
            BuildPeerIndex::build(
                vec![snapshot(BuildSide::Before, "foo", "1", files)],
                vec![snapshot(
                    BuildSide::After,
                    "foo",
                    "2",
                    vec![file("/usr/lib64/lib.so", "L")],
                )],
            )
        };

        let forward = build(false);
        let reversed = build(true);
        assert_eq!(forward.fingerprint(), reversed.fingerprint());

        let foo = forward.peer("foo").expect("foo");
        let moved = forward
            .correlations(foo)
            .find(|c| c.correlation.is_moved())
            .expect("moved");
        let source = forward
            .resolve(moved.correlation.before.expect("before"))
            .expect("live");
        assert_eq!(source.localpath, "/usr/lib/a/lib.so");
        assert!(moved.correlation.ambiguous);
    }
}

// ============================================================================
// Duplicates, malformed entries and teardown
// ============================================================================

mod lifecycle {
    use super::*;

    #[test]
    fn test_favor_newest_picks_highest_release() {
        let after = vec![
            snapshot(BuildSide::After, "foo", "1.2", vec![file("/usr/bin/foo", "A")]),
            snapshot(BuildSide::After, "foo", "1.10", vec![file("/usr/bin/foo", "B")]),
        ];
        let index = BuildPeerIndex::builder()
            .with_favor_release(FavorRelease::Newest)
            .build(Vec::new(), after);

        let peer = index.peer("foo").expect("foo");
        let snap = peer
            .after()
            .and_then(|id| index.snapshot(id))
            .expect("after");
        assert_eq!(snap.metadata().version, "1.10");
        assert_eq!(index.stats().shadowed_snapshots, 1);
    }

    #[test]
    fn test_malformed_entry_is_recorded_and_skipped() {
        let before = snapshot(
            BuildSide::Before,
            "foo",
            "1.0",
            vec![file("/usr/bin/foo", "A")],
        );
        let after = snapshot(
            BuildSide::After,
            "foo",
            "1.0",
            vec![file("relative/path", "R"), file("/usr/bin/foo", "A")],
        );

        let index = BuildPeerIndex::build(vec![before], vec![after]);
        let errors: Vec<_> = index.errors_for("foo").collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].side, BuildSide::After);
        assert_eq!(errors[0].position, 0);
        assert_eq!(
            changes(&index, "foo"),
            vec![("/usr/bin/foo".to_string(), ChangeKind::Unchanged)]
        );
    }

    #[test]
    fn test_teardown_invalidates_peer_links() {
        let before = snapshot(
            BuildSide::Before,
            "foo",
            "1.0",
            vec![file("/usr/bin/foo", "A")],
        );
        let after = snapshot(
            BuildSide::After,
            "foo",
            "2.0",
            vec![file("/usr/bin/foo", "B")],
        );
        let mut index = BuildPeerIndex::build(vec![before], vec![after]);

        let peer = index.peer("foo").expect("foo").clone();
        let before_id = peer.before().expect("before id");
        let after_id = peer.after().expect("after id");

        let removed = index.remove_snapshot(before_id).expect("removed");
        assert_eq!(removed.side(), BuildSide::Before);
        assert!(removed.files()[0].peer().is_none());
        assert!(index.snapshot(before_id).is_none());

        let after_file = &index.snapshot(after_id).expect("after").files()[0];
        assert!(after_file.peer().is_none());
        assert!(index.peer_of(after_file).is_none());
        assert_eq!(index.live_snapshots(), 1);
    }
}
