//! Mode and ownership drift, new setuid/setgid bits and world-writable files.
//!
//! Files whose new mode and ownership match a `fileinfo` entry are expected:
//! their drift is not reported and new setuid/setgid bits are INFO.

use super::{PairedCheck, RunContext};
use crate::model::{FileEntry, PackageMetadata, Severity, Verb, WaiverAuthority};
use crate::peers::PackagePeer;
use crate::results::FindingParams;

/// Security rule action remapping new setuid/setgid findings.
pub const ACTION_SETUID: &str = "setuid";
/// Security rule action remapping world-writable findings.
pub const ACTION_WORLD_WRITABLE: &str = "worldwritable";
/// Security rule action remapping mode and ownership drift.
pub const ACTION_MODES: &str = "modes";

#[derive(Debug, Clone, Copy, Default)]
pub struct Permissions;

impl Permissions {
    pub const NAME: &'static str = "permissions";
}

impl PairedCheck for Permissions {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn check_peer(&self, ctx: &RunContext<'_>, peer: &PackagePeer) {
        let Some(snapshot) = peer.after().and_then(|id| ctx.peers.snapshot(id)) else {
            return;
        };
        let meta = snapshot.metadata().as_ref();

        for c in ctx.peers.correlations(peer) {
            let Some(after) = c.after else {
                continue;
            };
            if ctx.is_ignored(Self::NAME, &after.localpath) {
                continue;
            }
            check_file(ctx, meta, c.before, after);
        }
    }
}

fn check_file(
    ctx: &RunContext<'_>,
    meta: &PackageMetadata,
    before: Option<&FileEntry>,
    after: &FileEntry,
) {
    let path = after.localpath.as_str();
    let new = &after.stat;

    let expected = ctx
        .config
        .expected_fileinfo(path, new.permissions(), &new.owner, &new.group);

    let gained_setuid = new.is_setuid() && !before.is_some_and(|b| b.stat.is_setuid());
    let gained_setgid = new.is_setgid() && !before.is_some_and(|b| b.stat.is_setgid());
    if gained_setuid || gained_setgid {
        let bit = if gained_setuid { "setuid" } else { "setgid" };
        if expected.is_some() {
            ctx.report(finding(
                meta,
                path,
                Severity::Info,
                format!(
                    "{path} in {} is newly {bit} ({:04o}) as listed in fileinfo",
                    meta.nvr(),
                    new.permissions()
                ),
            ));
        } else {
            let severity = ctx.action_severity(meta, ACTION_SETUID, Severity::Bad);
            let message = format!(
                "{path} in {} is newly {bit} ({:04o})",
                meta.nvr(),
                new.permissions()
            );
            ctx.report(
                finding(meta, path, severity, message)
                    .with_waiver(WaiverAuthority::Security)
                    .with_remedy(
                        "Setuid and setgid files need a security review, or a fileinfo entry.",
                    ),
            );
        }
    }

    if new.is_world_writable() && !before.is_some_and(|b| b.stat.is_world_writable()) {
        let severity = ctx.action_severity(meta, ACTION_WORLD_WRITABLE, Severity::Bad);
        let message = format!(
            "{path} in {} is world-writable ({:04o})",
            meta.nvr(),
            new.permissions()
        );
        ctx.report(
            finding(meta, path, severity, message)
                .with_waiver(WaiverAuthority::Security)
                .with_remedy("Remove the world-writable bit or make the directory sticky."),
        );
    }

    let Some(before) = before else {
        return;
    };
    if expected.is_some() {
        tracing::debug!(path, "Mode and ownership match fileinfo");
        return;
    }
    let old = &before.stat;

    if old.permissions() != new.permissions() {
        let severity = ctx.action_severity(meta, ACTION_MODES, Severity::Verify);
        ctx.report(
            finding(
                meta,
                path,
                severity,
                format!(
                    "{path} in {} changed mode from {:04o} to {:04o}",
                    meta.nvr(),
                    old.permissions(),
                    new.permissions()
                ),
            ),
        );
    }

    if old.owner != new.owner || old.group != new.group {
        let severity = ctx.action_severity(meta, ACTION_MODES, Severity::Verify);
        ctx.report(finding(
            meta,
            path,
            severity,
            format!(
                "{path} in {} changed ownership from {}:{} to {}:{}",
                meta.nvr(),
                old.owner,
                old.group,
                new.owner,
                new.group
            ),
        ));
    }
}

fn finding(
    meta: &PackageMetadata,
    path: &str,
    severity: Severity,
    message: String,
) -> FindingParams {
    FindingParams::new(Permissions::NAME, severity, Verb::Changed, message)
        .with_noun(format!("file {path}"))
        .with_file(path)
        .with_package(meta)
}
