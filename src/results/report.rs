//! Final run report and its renderings.

use super::finding::Finding;
use crate::error::Result;
use crate::model::Severity;
use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Outcome of one inspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InspectionOutcome {
    pub name: String,
    pub passed: bool,
}

/// Overall verdict of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Pass,
    Fail,
}

/// Finding counts per severity for one inspection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityCounts {
    pub ok: usize,
    pub info: usize,
    pub verify: usize,
    pub bad: usize,
    pub skip: usize,
}

impl SeverityCounts {
    fn add(&mut self, severity: Severity) {
        match severity {
            Severity::Ok => self.ok += 1,
            Severity::Info => self.info += 1,
            Severity::Verify => self.verify += 1,
            Severity::Bad => self.bad += 1,
            Severity::Skip => self.skip += 1,
        }
    }
}

/// Output formats for the report.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Summary,
    Json,
}

/// Ordered findings of a run with its verdict.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub generated: DateTime<Utc>,
    pub threshold: Severity,
    pub worst_severity: Severity,
    pub verdict: Verdict,
    /// Reportable findings in submission order
    pub findings: Vec<Finding>,
    /// Number of SKIP findings left out of `findings`
    pub skipped: usize,
    /// The SKIP findings themselves, for auditing
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped_findings: Vec<Finding>,
    pub summary: BTreeMap<String, SeverityCounts>,
    #[serde(default)]
    pub inspections: Vec<InspectionOutcome>,
}

impl Report {
    pub(crate) fn new(
        all: Vec<Finding>,
        worst_severity: Severity,
        threshold: Severity,
        inspections: Vec<InspectionOutcome>,
    ) -> Self {
        let mut summary: BTreeMap<String, SeverityCounts> = BTreeMap::new();
        for finding in &all {
            summary
                .entry(finding.header.clone())
                .or_default()
                .add(finding.severity);
        }

        let (findings, skipped_findings): (Vec<Finding>, Vec<Finding>) = all
            .into_iter()
            .partition(|f| f.severity.is_reportable());

        let verdict = if worst_severity < threshold {
            Verdict::Pass
        } else {
            Verdict::Fail
        };

        Self {
            generated: Utc::now(),
            threshold,
            worst_severity,
            verdict,
            findings,
            skipped: skipped_findings.len(),
            skipped_findings,
            summary,
            inspections,
        }
    }

    #[must_use]
    pub fn passed(&self) -> bool {
        self.verdict == Verdict::Pass
    }

    /// Render in the requested format.
    pub fn render(&self, format: ReportFormat, colored: bool) -> Result<String> {
        match format {
            ReportFormat::Summary => Ok(self.to_summary(colored)),
            ReportFormat::Json => self.to_json(true),
        }
    }

    pub fn to_json(&self, pretty: bool) -> Result<String> {
        let json = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(json)
    }

    /// Compact terminal summary.
    #[must_use]
    pub fn to_summary(&self, colored: bool) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", ansi_color("Inspection Summary", "bold", colored));
        let _ = writeln!(out, "{}", ansi_color(&"-".repeat(40), "dim", colored));

        for outcome in &self.inspections {
            let status = if outcome.passed {
                ansi_color("PASS", "green", colored)
            } else {
                ansi_color("FAIL", "red", colored)
            };
            let _ = writeln!(out, "  {:<20} {status}", outcome.name);
        }
        if !self.inspections.is_empty() {
            out.push('\n');
        }

        for finding in &self.findings {
            let severity = ansi_color(
                finding.severity.as_str(),
                severity_color(finding.severity),
                colored,
            );
            let location = match (&finding.package, &finding.file) {
                (Some(pkg), Some(file)) => format!(" {}: {file}", pkg.name),
                (Some(pkg), None) => format!(" {}", pkg.name),
                (None, Some(file)) => format!(" {file}"),
                (None, None) => String::new(),
            };
            let _ = writeln!(
                out,
                "[{}] {severity}{location}: {}",
                finding.header, finding.message
            );
            if let Some(remedy) = &finding.remedy {
                let _ = writeln!(out, "    {}", ansi_color(remedy, "dim", colored));
            }
        }

        let verdict = match self.verdict {
            Verdict::Pass => ansi_color("PASS", "green", colored),
            Verdict::Fail => ansi_color("FAIL", "red", colored),
        };
        let _ = writeln!(
            out,
            "\n{} {verdict} (worst {}, threshold {}, {} findings, {} skipped)",
            ansi_color("Result:", "cyan", colored),
            self.worst_severity,
            self.threshold,
            self.findings.len(),
            self.skipped
        );
        out
    }
}

const fn severity_color(severity: Severity) -> &'static str {
    match severity {
        Severity::Bad => "red",
        Severity::Verify => "yellow",
        Severity::Info => "cyan",
        Severity::Ok | Severity::Skip => "dim",
    }
}

fn ansi_color(text: &str, color: &str, colored: bool) -> String {
    if !colored {
        return text.to_string();
    }
    match color {
        "red" => format!("\x1b[31m{text}\x1b[0m"),
        "green" => format!("\x1b[32m{text}\x1b[0m"),
        "yellow" => format!("\x1b[33m{text}\x1b[0m"),
        "cyan" => format!("\x1b[36m{text}\x1b[0m"),
        "bold" => format!("\x1b[1m{text}\x1b[0m"),
        "dim" => format!("\x1b[2m{text}\x1b[0m"),
        _ => text.to_string(),
    }
}
