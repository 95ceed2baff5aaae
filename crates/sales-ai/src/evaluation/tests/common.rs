use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::evaluation::domain::{
    BantComponent, DealSize, EvaluationCategory, EvaluationCriteria, EvaluationReport,
    EvaluationResult, EvaluationTestCase, ExpectedScoring, PerformanceLevel, Priority, ScoreRange,
    ScoringOutput,
};
use crate::evaluation::oracle::{OracleFailure, ScoringOracle};
use crate::evaluation::store::{ReportDigest, ReportStore, ReportStoreError};
use crate::evaluation::{CancellationFlag, EvaluationService, ReportAggregator, TestCaseRegistry};

pub(super) fn lead_input(name: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("name".to_string(), name.to_string()),
        ("title".to_string(), "VP of Engineering".to_string()),
        ("company".to_string(), "TechCorp Inc".to_string()),
        ("email".to_string(), "lead@techcorp.com".to_string()),
    ])
}

/// Case probing a single behavior, keyed so the scripted oracle can pick
/// its response by the lead's name.
pub(super) fn case(
    test_id: &str,
    category: EvaluationCategory,
    expected: ExpectedScoring,
    criteria: EvaluationCriteria,
) -> EvaluationTestCase {
    EvaluationTestCase {
        test_id: test_id.to_string(),
        category,
        description: format!("probes {test_id}"),
        input_data: lead_input(test_id),
        expected_output: expected,
        evaluation_criteria: criteria,
        tags: vec!["scripted".to_string()],
    }
}

pub(super) fn range_case(test_id: &str, low: f64, high: f64) -> EvaluationTestCase {
    case(
        test_id,
        EvaluationCategory::LeadScoring,
        ExpectedScoring {
            overall_score: Some(ScoreRange::new(low, high)),
            ..ExpectedScoring::default()
        },
        EvaluationCriteria::default(),
    )
}

/// Output satisfying the enterprise_lead_001 expectations in full.
pub(super) fn full_output() -> ScoringOutput {
    ScoringOutput {
        overall_score: Some(85.0),
        priority: Some(Priority::Hot),
        deal_size: Some(DealSize::Enterprise),
        bant_scores: BTreeMap::from([
            (BantComponent::Authority, 28.0),
            (BantComponent::CompanyFit, 27.0),
            (BantComponent::SourceQuality, 15.0),
            (BantComponent::EngagementPotential, 15.0),
        ]),
        insights: vec!["Decision maker with approved budget".to_string()],
        red_flags: vec!["Timeline pressure from expiring contract".to_string()],
        recommended_action: Some("Schedule a demo within 24 hours".to_string()),
    }
}

pub(super) fn overall_output(score: f64) -> ScoringOutput {
    ScoringOutput {
        overall_score: Some(score),
        ..ScoringOutput::default()
    }
}

pub(super) fn fixed_timestamp() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0)
        .single()
        .expect("valid timestamp")
}

/// Fabricated graded result for aggregator and analyzer inputs.
pub(super) fn graded(
    test_id: &str,
    category: EvaluationCategory,
    passed: bool,
    score: f64,
) -> EvaluationResult {
    EvaluationResult {
        test_id: test_id.to_string(),
        category,
        passed,
        score,
        performance_level: PerformanceLevel::from_score(score),
        discrepancies: Vec::new(),
        strengths: Vec::new(),
        oracle_output: ScoringOutput::default(),
        response_time_ms: 120,
        error: None,
        timestamp: fixed_timestamp(),
    }
}

pub(super) fn report_from(
    results: Vec<EvaluationResult>,
    timestamp: DateTime<Utc>,
) -> EvaluationReport {
    ReportAggregator::new().aggregate_at(results, timestamp)
}

pub(super) fn registry_with(cases: Vec<EvaluationTestCase>) -> TestCaseRegistry {
    let mut registry = TestCaseRegistry::new();
    for case in cases {
        registry.add(case).expect("test case validates");
    }
    registry
}

pub(super) enum ScriptedResponse {
    Output(ScoringOutput),
    Timeout,
    Upstream(String),
}

/// Oracle double answering by the lead's name field. Unknown leads get the
/// all-missing output.
#[derive(Default)]
pub(super) struct ScriptedOracle {
    responses: Mutex<BTreeMap<String, ScriptedResponse>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedOracle {
    pub(super) fn new() -> Self {
        Self::default()
    }

    pub(super) fn respond(self, name: &str, response: ScriptedResponse) -> Self {
        self.responses
            .lock()
            .expect("oracle mutex poisoned")
            .insert(name.to_string(), response);
        self
    }

    pub(super) fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("oracle mutex poisoned").clone()
    }
}

#[async_trait]
impl ScoringOracle for ScriptedOracle {
    async fn score(&self, lead: &BTreeMap<String, String>) -> Result<ScoringOutput, OracleFailure> {
        let name = lead.get("name").cloned().unwrap_or_default();
        self.calls
            .lock()
            .expect("oracle mutex poisoned")
            .push(name.clone());
        match self
            .responses
            .lock()
            .expect("oracle mutex poisoned")
            .get(&name)
        {
            Some(ScriptedResponse::Output(output)) => Ok(output.clone()),
            Some(ScriptedResponse::Timeout) => Err(OracleFailure::Timeout),
            Some(ScriptedResponse::Upstream(message)) => {
                Err(OracleFailure::Upstream(message.clone()))
            }
            None => Ok(ScoringOutput::default()),
        }
    }
}

/// Oracle double that trips the shared cancellation flag while answering,
/// so the run stops before dispatching the next case.
pub(super) struct CancellingOracle {
    flag: CancellationFlag,
}

impl CancellingOracle {
    pub(super) fn new(flag: CancellationFlag) -> Self {
        Self { flag }
    }
}

#[async_trait]
impl ScoringOracle for CancellingOracle {
    async fn score(
        &self,
        _lead: &BTreeMap<String, String>,
    ) -> Result<ScoringOutput, OracleFailure> {
        self.flag.cancel();
        Ok(full_output())
    }
}

#[derive(Default)]
pub(super) struct MemoryReports {
    reports: Mutex<Vec<EvaluationReport>>,
}

impl MemoryReports {
    pub(super) fn stored(&self) -> Vec<EvaluationReport> {
        self.reports.lock().expect("report mutex poisoned").clone()
    }
}

impl ReportStore for MemoryReports {
    fn save(&self, report: &EvaluationReport) -> Result<(), ReportStoreError> {
        let mut guard = self.reports.lock().expect("report mutex poisoned");
        if guard
            .iter()
            .any(|existing| existing.report_id == report.report_id)
        {
            return Err(ReportStoreError::Conflict(report.report_id.clone()));
        }
        guard.push(report.clone());
        Ok(())
    }

    fn load(&self, report_id: &str) -> Result<EvaluationReport, ReportStoreError> {
        self.reports
            .lock()
            .expect("report mutex poisoned")
            .iter()
            .find(|report| report.report_id == report_id)
            .cloned()
            .ok_or_else(|| ReportStoreError::NotFound(report_id.to_string()))
    }

    fn list(&self, limit: usize) -> Result<Vec<ReportDigest>, ReportStoreError> {
        let guard = self.reports.lock().expect("report mutex poisoned");
        let mut digests: Vec<ReportDigest> = guard.iter().map(ReportDigest::from).collect();
        digests.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        digests.truncate(limit);
        Ok(digests)
    }
}

pub(super) struct ConflictReports;

impl ReportStore for ConflictReports {
    fn save(&self, report: &EvaluationReport) -> Result<(), ReportStoreError> {
        Err(ReportStoreError::Conflict(report.report_id.clone()))
    }

    fn load(&self, report_id: &str) -> Result<EvaluationReport, ReportStoreError> {
        Err(ReportStoreError::NotFound(report_id.to_string()))
    }

    fn list(&self, _limit: usize) -> Result<Vec<ReportDigest>, ReportStoreError> {
        Ok(Vec::new())
    }
}

pub(super) struct UnavailableReports;

impl ReportStore for UnavailableReports {
    fn save(&self, _report: &EvaluationReport) -> Result<(), ReportStoreError> {
        Err(ReportStoreError::Unavailable("archive offline".to_string()))
    }

    fn load(&self, _report_id: &str) -> Result<EvaluationReport, ReportStoreError> {
        Err(ReportStoreError::Unavailable("archive offline".to_string()))
    }

    fn list(&self, _limit: usize) -> Result<Vec<ReportDigest>, ReportStoreError> {
        Err(ReportStoreError::Unavailable("archive offline".to_string()))
    }
}

pub(super) fn service_with_store<S: ReportStore>(
    registry: TestCaseRegistry,
    oracle: ScriptedOracle,
    store: S,
) -> (
    Arc<EvaluationService<ScriptedOracle, S>>,
    Arc<ScriptedOracle>,
    Arc<S>,
) {
    let oracle = Arc::new(oracle);
    let store = Arc::new(store);
    let service = Arc::new(EvaluationService::new(registry, oracle.clone(), store.clone()));
    (service, oracle, store)
}

pub(super) fn build_service(
    registry: TestCaseRegistry,
    oracle: ScriptedOracle,
) -> (
    Arc<EvaluationService<ScriptedOracle, MemoryReports>>,
    Arc<ScriptedOracle>,
    Arc<MemoryReports>,
) {
    service_with_store(registry, oracle, MemoryReports::default())
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1 << 20)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
