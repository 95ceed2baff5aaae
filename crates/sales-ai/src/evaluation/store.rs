use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::domain::EvaluationReport;

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum ReportStoreError {
    #[error("report {0} already exists")]
    Conflict(String),
    #[error("report {0} not found")]
    NotFound(String),
    #[error("report store unavailable: {0}")]
    Unavailable(String),
}

/// Listing row carrying just enough of a report to pick one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportDigest {
    pub report_id: String,
    pub timestamp: DateTime<Utc>,
    pub total_tests: usize,
    pub passed_tests: usize,
    pub overall_score: f64,
    pub pass_rate: f64,
}

impl From<&EvaluationReport> for ReportDigest {
    fn from(report: &EvaluationReport) -> Self {
        Self {
            report_id: report.report_id.clone(),
            timestamp: report.timestamp,
            total_tests: report.summary.total_tests,
            passed_tests: report.summary.passed_tests,
            overall_score: report.summary.overall_score,
            pass_rate: report.summary.pass_rate,
        }
    }
}

/// Append-only archive of evaluation reports.
pub trait ReportStore: Send + Sync {
    /// Persist a report. Saving an id that already exists is a conflict.
    fn save(&self, report: &EvaluationReport) -> Result<(), ReportStoreError>;

    fn load(&self, report_id: &str) -> Result<EvaluationReport, ReportStoreError>;

    /// Digests of stored reports, newest first, at most `limit` rows.
    fn list(&self, limit: usize) -> Result<Vec<ReportDigest>, ReportStoreError>;
}
