//! Orchestration of evaluation runs against the scoring oracle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::aggregator::ReportAggregator;
use super::comparator::ReportComparator;
use super::domain::{
    EvaluationCategory, EvaluationReport, EvaluationResult, EvaluationTestCase, ReportComparison,
};
use super::evaluator::ResultEvaluator;
use super::oracle::ScoringOracle;
use super::registry::{RegistryError, TestCaseFilter, TestCaseRegistry};
use super::store::{ReportDigest, ReportStore, ReportStoreError};

#[derive(Debug, thiserror::Error)]
pub enum EvaluationServiceError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Store(#[from] ReportStoreError),
}

/// Selection and reporting options for one run. Absent filters select the
/// whole registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRunRequest {
    #[serde(default)]
    pub test_ids: Option<Vec<String>>,
    #[serde(default)]
    pub categories: Option<Vec<EvaluationCategory>>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default = "default_generate_report")]
    pub generate_report: bool,
}

fn default_generate_report() -> bool {
    true
}

impl Default for EvaluationRunRequest {
    fn default() -> Self {
        Self {
            test_ids: None,
            categories: None,
            tags: None,
            generate_report: true,
        }
    }
}

impl EvaluationRunRequest {
    pub fn filter(&self) -> TestCaseFilter {
        TestCaseFilter {
            test_ids: self.test_ids.clone(),
            categories: self.categories.clone(),
            tags: self.tags.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutcome {
    pub results: Vec<EvaluationResult>,
    pub report: Option<EvaluationReport>,
}

/// Cooperative stop signal for a running suite. Cancelling stops further
/// cases from dispatching; the in-flight call finishes normally.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Runs test cases against the scoring oracle and manages the report
/// archive. Generic over the oracle and store so tests can swap in scripted
/// doubles.
pub struct EvaluationService<O, S> {
    registry: RwLock<TestCaseRegistry>,
    oracle: Arc<O>,
    store: Arc<S>,
    evaluator: ResultEvaluator,
    aggregator: ReportAggregator,
    comparator: ReportComparator,
}

impl<O, S> EvaluationService<O, S>
where
    O: ScoringOracle,
    S: ReportStore,
{
    pub fn new(registry: TestCaseRegistry, oracle: Arc<O>, store: Arc<S>) -> Self {
        Self {
            registry: RwLock::new(registry),
            oracle,
            store,
            evaluator: ResultEvaluator::default(),
            aggregator: ReportAggregator::new(),
            comparator: ReportComparator::new(),
        }
    }

    /// Service preloaded with the built-in catalog.
    pub fn with_standard_catalog(oracle: Arc<O>, store: Arc<S>) -> Self {
        Self::new(TestCaseRegistry::standard_catalog(), oracle, store)
    }

    pub async fn run(
        &self,
        request: &EvaluationRunRequest,
    ) -> Result<RunOutcome, EvaluationServiceError> {
        self.run_with_cancellation(request, &CancellationFlag::new())
            .await
    }

    /// Sequential dispatch over the selected cases. A failed scoring call
    /// degrades that case and the run continues.
    pub async fn run_with_cancellation(
        &self,
        request: &EvaluationRunRequest,
        cancellation: &CancellationFlag,
    ) -> Result<RunOutcome, EvaluationServiceError> {
        let cases = self.test_cases(&request.filter());
        info!(selected = cases.len(), "starting evaluation run");

        let mut results = Vec::with_capacity(cases.len());
        for case in &cases {
            if cancellation.is_cancelled() {
                info!(completed = results.len(), "evaluation run cancelled");
                break;
            }

            let started = Instant::now();
            let result = match self.oracle.score(&case.input_data).await {
                Ok(output) => {
                    let elapsed = started.elapsed().as_millis() as u64;
                    self.evaluator.evaluate(case, &output, elapsed)
                }
                Err(failure) => {
                    warn!(test_id = %case.test_id, error = %failure, "scoring call failed");
                    self.evaluator.evaluate_degraded(case, &failure.to_string())
                }
            };
            debug!(
                test_id = %result.test_id,
                score = result.score,
                passed = result.passed,
                "case evaluated"
            );
            results.push(result);
        }

        let report = if request.generate_report {
            let report = self.aggregator.aggregate(results.clone());
            self.store.save(&report)?;
            info!(
                report_id = %report.report_id,
                overall_score = report.summary.overall_score,
                pass_rate = report.summary.pass_rate,
                "evaluation report stored"
            );
            Some(report)
        } else {
            None
        };

        Ok(RunOutcome { results, report })
    }

    pub fn test_cases(&self, filter: &TestCaseFilter) -> Vec<EvaluationTestCase> {
        self.registry
            .read()
            .expect("registry lock poisoned")
            .matching(filter)
    }

    pub fn add_test_case(&self, case: EvaluationTestCase) -> Result<(), EvaluationServiceError> {
        self.registry
            .write()
            .expect("registry lock poisoned")
            .add(case)?;
        Ok(())
    }

    pub fn report(&self, report_id: &str) -> Result<EvaluationReport, EvaluationServiceError> {
        Ok(self.store.load(report_id)?)
    }

    pub fn reports(&self, limit: usize) -> Result<Vec<ReportDigest>, EvaluationServiceError> {
        Ok(self.store.list(limit)?)
    }

    pub fn compare(
        &self,
        report1_id: &str,
        report2_id: &str,
    ) -> Result<ReportComparison, EvaluationServiceError> {
        let report1 = self.store.load(report1_id)?;
        let report2 = self.store.load(report2_id)?;
        Ok(self.comparator.compare(&report1, &report2))
    }
}
