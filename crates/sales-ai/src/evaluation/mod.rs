//! Evaluation harness for the lead-scoring model.
//!
//! Test cases pair a lead record with expectations about the model's output.
//! A run dispatches the selected cases to the configured [`ScoringOracle`],
//! grades each response, and folds the graded results into a report with
//! per-category diagnostics, stored for later listing and comparison.

mod aggregator;
mod analyzer;
mod comparator;
pub mod domain;
mod evaluator;
pub mod oracle;
pub mod registry;
pub mod router;
pub mod service;
pub mod store;

#[cfg(test)]
mod tests;

pub use aggregator::{ReportAggregator, SLOW_RESPONSE_MS};
pub use analyzer::{QualitativeAnalyzer, UNDERPERFORMANCE_THRESHOLD};
pub use comparator::{ReportComparator, SIGNIFICANT_CHANGE};
pub use domain::{
    BantComponent, CheckField, ComparedReport, DealSize, EvaluationCategory, EvaluationCriteria,
    EvaluationReport, EvaluationResult, EvaluationTestCase, ExpectedScoring, FailureCase,
    PerformanceLevel, Priority, QualitativeAnalysis, ReportComparison, ReportSummary, ScoreRange,
    ScoringOutput, DEFAULT_SCORE_TOLERANCE,
};
pub use evaluator::{EvaluatorConfig, ResultEvaluator, PASSING_THRESHOLD};
pub use oracle::{GrokScoringOracle, OracleFailure, ScoringOracle};
pub use registry::{RegistryError, TestCaseFilter, TestCaseRegistry, REQUIRED_INPUT_FIELDS};
pub use router::evaluation_router;
pub use service::{
    CancellationFlag, EvaluationRunRequest, EvaluationService, EvaluationServiceError, RunOutcome,
};
pub use store::{ReportDigest, ReportStore, ReportStoreError};
