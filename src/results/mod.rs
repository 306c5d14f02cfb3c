//! Collection of inspection findings into a judged report.

mod aggregator;
mod finding;
mod report;

pub use aggregator::ResultAggregator;
pub use finding::{Finding, FindingParams, PackageContext, WaiverPolicy};
pub use report::{InspectionOutcome, Report, ReportFormat, SeverityCounts, Verdict};
