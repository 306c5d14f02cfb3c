//! File capability drift against the allowed capabilities list.

use super::{PairedCheck, RunContext};
use crate::model::{FileEntry, PackageMetadata, Severity, Verb, WaiverAuthority};
use crate::peers::PackagePeer;
use crate::results::FindingParams;

/// Security rule action remapping unlisted capability findings.
pub const ACTION_CAPS: &str = "caps";

#[derive(Debug, Clone, Copy, Default)]
pub struct Capabilities;

impl Capabilities {
    pub const NAME: &'static str = "capabilities";
}

impl PairedCheck for Capabilities {
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
    let old = before.and_then(|b| b.capabilities.as_deref());
    let new = after.capabilities.as_deref();

    let Some(new) = new else {
        if let Some(old) = old {
            ctx.report(
                finding(
                    meta,
                    path,
                    Severity::Verify,
                    Verb::Removed,
                    format!("{path} in {} lost capabilities {old}", meta.nvr()),
                )
                .with_remedy("Make sure the program no longer needs its capabilities."),
            );
        }
        return;
    };
    if old == Some(new) {
        return;
    }

    let verb = if old.is_some() {
        Verb::Changed
    } else {
        Verb::Added
    };
    let change = match old {
        Some(old) => format!("changed capabilities from {old} to {new}"),
        None => format!("gained capabilities {new}"),
    };

    match ctx.config.allowed_capabilities(&meta.name, path) {
        Some(allowed) if allowed == new => ctx.report(finding(
            meta,
            path,
            Severity::Info,
            verb,
            format!("{path} in {} {change}, as listed", meta.nvr()),
        )),
        allowed => {
            let severity = ctx.action_severity(meta, ACTION_CAPS, Severity::Bad);
            let mut params = finding(
                meta,
                path,
                severity,
                verb,
                format!("{path} in {} {change}", meta.nvr()),
            )
            .with_waiver(WaiverAuthority::Security)
            .with_remedy("New file capabilities need a security review.");
            if let Some(allowed) = allowed {
                params = params.with_details(format!("The capabilities list allows {allowed}"));
            }
            ctx.report(params);
        }
    }
}

fn finding(
    meta: &PackageMetadata,
    path: &str,
    severity: Severity,
    verb: Verb,
    message: String,
) -> FindingParams {
    FindingParams::new(Capabilities::NAME, severity, verb, message)
        .with_noun(format!("file {path}"))
        .with_file(path)
        .with_package(meta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::BuildCaches;
    use crate::config::{CapsEntry, RunConfig};
    use crate::inspect::InspectionRun;
    use crate::model::{BuildSide, PackageSnapshot};
    use crate::policy::SecurityPolicyResolver;
    use std::sync::Arc;

    fn ping(caps: Option<&str>) -> FileEntry {
        let entry = FileEntry::new("/usr/bin/ping").with_checksum("p");
        match caps {
            Some(caps) => entry.with_capabilities(caps),
            None => entry,
        }
    }

    fn run(config: RunConfig, before: FileEntry, after: FileEntry) -> Vec<(Severity, Verb)> {
        let snapshot = |side, file| {
            PackageSnapshot::new(Arc::new(PackageMetadata::new("iputils", "2", "1")), side)
                .with_files(vec![file])
        };
        let run = InspectionRun::new(
            config,
            BuildCaches::new(),
            SecurityPolicyResolver::default(),
            vec![snapshot(BuildSide::Before, before)],
            vec![snapshot(BuildSide::After, after)],
        )
        .expect("run");
        let ctx = run.context();
        for peer in ctx.peers.peers() {
            Capabilities.check_peer(&ctx, peer);
        }
        run.results()
            .findings()
            .into_iter()
            .map(|f| (f.severity, f.verb))
            .collect()
    }

    fn listed() -> RunConfig {
        RunConfig::builder()
            .capabilities(CapsEntry::new("iputils", "/usr/bin/ping", "cap_net_raw=p"))
            .build()
    }

    #[test]
    fn test_unlisted_new_capabilities_are_bad() {
        let findings = run(RunConfig::default(), ping(None), ping(Some("cap_net_raw=p")));
        assert_eq!(findings, vec![(Severity::Bad, Verb::Added)]);
    }

    #[test]
    fn test_listed_capabilities_are_info() {
        let findings = run(listed(), ping(None), ping(Some("cap_net_raw=p")));
        assert_eq!(findings, vec![(Severity::Info, Verb::Added)]);
    }

    #[test]
    fn test_capabilities_differing_from_list_are_bad() {
        let findings = run(
            listed(),
            ping(Some("cap_net_raw=p")),
            ping(Some("cap_net_raw,cap_net_admin=ep")),
        );
        assert_eq!(findings, vec![(Severity::Bad, Verb::Changed)]);
    }

    #[test]
    fn test_unchanged_and_lost_capabilities() {
        let same = run(
            RunConfig::default(),
            ping(Some("cap_net_raw=p")),
            ping(Some("cap_net_raw=p")),
        );
        assert!(same.is_empty());

        let lost = run(RunConfig::default(), ping(Some("cap_net_raw=p")), ping(None));
        assert_eq!(lost, vec![(Severity::Verify, Verb::Removed)]);
    }
}
