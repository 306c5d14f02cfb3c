//! Inspect command handler.
//!
//! Implements the `inspect` subcommand: load both builds, correlate them,
//! run the enabled inspections and report against the threshold.

use super::exit_codes;
use super::manifest::{BuildManifest, LoadedBuild};
use super::output::{should_use_color, write_output, OutputTarget};
use crate::cache::BuildCaches;
use crate::config::{load_or_default, RunConfig, Validatable};
use crate::error::InspectError;
use crate::inspect::{InspectionRun, InspectionRunner};
use crate::model::{BuildSide, Severity, Verb};
use crate::peers::FavorRelease;
use crate::policy::{load_rule_file, SecurityPolicyResolver};
use crate::results::{FindingParams, Report, ReportFormat};
use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

/// Header of findings about packages that could not be loaded.
const METADATA_HEADER: &str = "metadata";

/// Command line inputs of the `inspect` subcommand.
///
/// `None` leaves the config file (or default) value in place.
#[derive(Debug, Clone, Default)]
pub struct InspectOptions {
    pub after: PathBuf,
    pub before: Option<PathBuf>,
    pub config_file: Option<PathBuf>,
    pub rules: Option<PathBuf>,
    pub threshold: Option<Severity>,
    pub favor_release: Option<FavorRelease>,
    pub format: Option<ReportFormat>,
    pub output_file: Option<PathBuf>,
    pub no_color: bool,
    pub quiet: bool,
}

impl InspectOptions {
    /// Resolve the effective run configuration.
    pub fn resolve_config(&self) -> Result<RunConfig> {
        let (mut config, source) = load_or_default(self.config_file.as_deref())
            .context("Failed to load configuration")?;
        if let Some(path) = source {
            tracing::debug!(path = %path.display(), "Using config file");
        }

        if let Some(threshold) = self.threshold {
            config.threshold = threshold;
        }
        if let Some(favor) = self.favor_release {
            config.favor_release = favor;
        }
        if let Some(rules) = &self.rules {
            config.security_rules = Some(rules.clone());
        }
        if let Some(format) = self.format {
            config.output.format = format;
        }
        if self.output_file.is_some() {
            config.output.file.clone_from(&self.output_file);
        }
        config.output.no_color |= self.no_color;

        let errors = config.validate();
        if !errors.is_empty() {
            for error in &errors {
                tracing::error!("{error}");
            }
            bail!("Invalid configuration ({} error(s))", errors.len());
        }
        Ok(config)
    }
}

/// Run the inspect command, returning the desired exit code.
///
/// The caller is responsible for calling `std::process::exit()` with the
/// returned code when it is non-zero.
#[allow(clippy::needless_pass_by_value)]
pub fn run_inspect(options: InspectOptions) -> Result<i32> {
    let config = options.resolve_config()?;
    let output = config.output.clone();
    let report = inspect_builds(&options, config)?;

    let target = OutputTarget::from_option(output.file);
    let colored = should_use_color(output.no_color, &target);
    let rendered = report
        .render(output.format, colored)
        .context("Failed to render report")?;
    write_output(&rendered, &target, options.quiet)?;

    Ok(if report.passed() {
        exit_codes::SUCCESS
    } else {
        exit_codes::THRESHOLD_REACHED
    })
}

/// Load, correlate and inspect both builds.
pub fn inspect_builds(options: &InspectOptions, config: RunConfig) -> Result<Report> {
    let resolver = match &config.security_rules {
        Some(path) => SecurityPolicyResolver::new(
            load_rule_file(path)
                .with_context(|| format!("Failed to load security rules from {}", path.display()))?,
        ),
        None => SecurityPolicyResolver::default(),
    };

    let caches = BuildCaches::new();
    let after = load_build(&options.after, BuildSide::After, &caches)?;
    let before = match &options.before {
        Some(path) => load_build(path, BuildSide::Before, &caches)?,
        None => LoadedBuild::default(),
    };

    let failures: Vec<InspectError> = before.failures.into_iter().chain(after.failures).collect();
    let run = InspectionRun::new(config, caches, resolver, before.snapshots, after.snapshots)
        .context("Failed to set up inspection run")?;

    for failure in &failures {
        let params = FindingParams::new(
            METADATA_HEADER,
            Severity::Bad,
            Verb::Failed,
            failure.to_string(),
        );
        let params = match failure.package() {
            Some(package) => params.with_noun(package),
            None => params,
        };
        run.results().submit(params);
    }

    let stats = run.peers().stats();
    if !options.quiet {
        tracing::info!(
            peers = run.peers().peers().len(),
            changed = stats.changed,
            added = stats.added,
            removed = stats.removed,
            moved = stats.moved_path + stats.moved_subpackage,
            failed_packages = failures.len(),
            "Correlated builds"
        );
    }

    let runner = InspectionRunner::from_config(run.config());
    let outcomes = runner.run(&run.context());
    let report = run.finish(outcomes);

    if !options.quiet {
        tracing::info!(
            worst = %report.worst_severity,
            threshold = %report.threshold,
            findings = report.findings.len(),
            "Inspection finished"
        );
    }
    Ok(report)
}

fn load_build(path: &Path, side: BuildSide, caches: &BuildCaches) -> Result<LoadedBuild> {
    let manifest = BuildManifest::load(path)
        .with_context(|| format!("Failed to load {side} build manifest"))?;
    Ok(manifest.into_snapshots(side, caches.side(side)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::Verdict;
    use std::fs;

    const BEFORE: &str = r#"
- name: foo
  version: "1.0"
  release: "1"
  arch: x86_64
  files:
    - path: /usr/bin/foo
      mode: "0100755"
      checksum: aaaa
"#;

    const AFTER: &str = r#"
- name: foo
  version: "2.0"
  release: "1"
  arch: x86_64
  files:
    - path: /usr/bin/foo
      mode: "0104755"
      checksum: bbbb
- name: broken
  release: "1"
"#;

    fn options(dir: &Path) -> InspectOptions {
        let before = dir.join("before.yaml");
        let after = dir.join("after.yaml");
        fs::write(&before, BEFORE).expect("write before");
        fs::write(&after, AFTER).expect("write after");
        let config = dir.join("config.yaml");
        fs::write(&config, "threshold: bad\n").expect("write config");
        InspectOptions {
            after,
            before: Some(before),
            config_file: Some(config),
            quiet: true,
            ..InspectOptions::default()
        }
    }

    #[test]
    fn test_inspect_builds_reports_findings() {
        let dir = tempfile::tempdir().expect("tempdir");
        let options = options(dir.path());
        let config = options.resolve_config().expect("config");
        assert_eq!(config.threshold, Severity::Bad);

        let report = inspect_builds(&options, config).expect("inspect");
        assert_eq!(report.verdict, Verdict::Fail);
        assert!(report
            .findings
            .iter()
            .any(|f| f.header == METADATA_HEADER && f.noun == "broken"));
        assert!(report
            .findings
            .iter()
            .any(|f| f.header == "permissions" && f.severity == Severity::Bad));
    }

    #[test]
    fn test_cli_overrides_config_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut options = options(dir.path());
        options.threshold = Some(Severity::Verify);
        options.format = Some(ReportFormat::Json);

        let config = options.resolve_config().expect("config");
        assert_eq!(config.threshold, Severity::Verify);
        assert_eq!(config.output.format, ReportFormat::Json);
    }

    #[test]
    fn test_invalid_config_is_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut options = options(dir.path());
        options.threshold = Some(Severity::Skip);
        assert!(options.resolve_config().is_err());
    }

    #[test]
    fn test_run_inspect_writes_report() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut options = options(dir.path());
        let out = dir.path().join("report.json");
        options.format = Some(ReportFormat::Json);
        options.output_file = Some(out.clone());

        let code = run_inspect(options).expect("run");
        assert_eq!(code, exit_codes::THRESHOLD_REACHED);
        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(out).expect("read")).expect("json");
        assert_eq!(json["verdict"], "fail");
    }

    #[test]
    fn test_missing_manifest_is_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let options = InspectOptions {
            after: dir.path().join("nope.yaml"),
            config_file: None,
            quiet: true,
            ..InspectOptions::default()
        };
        let config = RunConfig::default();
        assert!(inspect_builds(&options, config).is_err());
    }
}
