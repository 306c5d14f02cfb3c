//! Added, removed, changed and moved payload files.

use super::{PairedCheck, RunContext};
use crate::model::{FileEntry, FileRef, PackageMetadata, Severity, Verb, WaiverAuthority};
use crate::peers::{ChangeKind, PackagePeer, ResolvedCorrelation};
use crate::results::FindingParams;

/// Reports every file correlation that is not unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileChanges;

impl FileChanges {
    pub const NAME: &'static str = "filechanges";
}

impl PairedCheck for FileChanges {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn check_peer(&self, ctx: &RunContext<'_>, peer: &PackagePeer) {
        let peer_meta = peer
            .after()
            .or(peer.before())
            .and_then(|id| ctx.peers.snapshot(id))
            .map(|snapshot| snapshot.metadata().as_ref());

        for err in ctx.peers.errors_for(peer.name()) {
            let mut params =
                FindingParams::new(Self::NAME, Severity::Bad, Verb::Failed, err.to_string())
                    .with_noun(format!("{} entry #{}", err.side, err.position))
                    .with_remedy("Make sure every payload entry has an absolute path.");
            if !err.localpath.is_empty() {
                params = params.with_file(err.localpath.clone());
            }
            if let Some(meta) = peer_meta {
                params = params.with_package(meta);
            }
            ctx.report(params);
        }

        for c in ctx.peers.correlations(peer) {
            let path = c.path();
            if ctx.is_ignored(Self::NAME, path) {
                continue;
            }
            let Some(meta) = owner_of(ctx, c.correlation.after)
                .or_else(|| owner_of(ctx, c.correlation.before))
            else {
                continue;
            };

            if c.correlation.ambiguous {
                ctx.report(
                    FindingParams::new(
                        Self::NAME,
                        Severity::Verify,
                        Verb::Changed,
                        format!(
                            "{path} in {} matched one of several files with the same \
                             content; the pairing may be wrong",
                            meta.nvr()
                        ),
                    )
                    .with_noun(format!("file {path}"))
                    .with_file(path)
                    .with_package(meta),
                );
            }

            if let Some(params) = describe(ctx, &c, meta) {
                ctx.report(params);
            }
        }
    }
}

/// Metadata of the snapshot a file ref points into.
fn owner_of<'a>(ctx: &RunContext<'a>, fref: Option<FileRef>) -> Option<&'a PackageMetadata> {
    fref.and_then(|r| ctx.peers.snapshot(r.snapshot))
        .map(|snapshot| snapshot.metadata().as_ref())
}

fn describe(
    ctx: &RunContext<'_>,
    c: &ResolvedCorrelation<'_>,
    meta: &PackageMetadata,
) -> Option<FindingParams> {
    let path = c.path();
    let verb = c.correlation.change.verb()?;
    let nvr = meta.nvr();

    let (severity, waiver, message) = match c.correlation.change {
        ChangeKind::Unchanged => return None,
        ChangeKind::Added => (Severity::Info, None, format!("{path} added to {nvr}")),
        ChangeKind::Removed => {
            let from = owner_of(ctx, c.correlation.before)
                .map_or_else(|| nvr.clone(), PackageMetadata::nvr);
            (Severity::Verify, None, format!("{path} removed from {from}"))
        }
        ChangeKind::Changed if ctx.is_security_path(path) => (
            Severity::Bad,
            Some(WaiverAuthority::Security),
            format!("{path} changed content in {nvr}{}", moved_suffix(ctx, c)),
        ),
        ChangeKind::Changed => (
            Severity::Info,
            None,
            format!("{path} changed content in {nvr}{}", moved_suffix(ctx, c)),
        ),
        ChangeKind::Moved => (
            Severity::Info,
            None,
            format!("{path} in {nvr}{}", moved_suffix(ctx, c)),
        ),
    };

    let mut params = FindingParams::new(FileChanges::NAME, severity, verb, message)
        .with_noun(format!("file {path}"))
        .with_file(path)
        .with_package(meta);
    if let Some(waiver) = waiver {
        params = params
            .with_waiver(waiver)
            .with_remedy("Content changes under security sensitive paths need a security review.");
    }
    if let (Some(before), Some(after)) = (c.before, c.after) {
        if let Some(details) = checksum_details(before, after) {
            params = params.with_details(details);
        }
    }
    Some(params)
}

fn moved_suffix(ctx: &RunContext<'_>, c: &ResolvedCorrelation<'_>) -> String {
    let Some(before) = c.before else {
        return String::new();
    };
    if c.correlation.moved_subpackage {
        let from = owner_of(ctx, c.correlation.before)
            .map_or_else(String::new, |m| m.name.clone());
        format!(" (moved from subpackage {from}, was {})", before.localpath)
    } else if c.correlation.moved_path {
        format!(" (moved from {})", before.localpath)
    } else {
        String::new()
    }
}

fn checksum_details(before: &FileEntry, after: &FileEntry) -> Option<String> {
    match (&before.checksum, &after.checksum) {
        (Some(b), Some(a)) if b != a => Some(format!("checksum {b} -> {a}")),
        _ => None,
    }
}
