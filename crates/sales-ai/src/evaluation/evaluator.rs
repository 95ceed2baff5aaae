//! Grading of raw oracle output against a test case's expectations.

use chrono::Utc;

use super::domain::{
    CheckField, DealSize, EvaluationCriteria, EvaluationResult, EvaluationTestCase,
    PerformanceLevel, Priority, ScoreRange, ScoringOutput,
};

/// Score at or above which a graded case counts as passed, absent a
/// must-match failure.
pub const PASSING_THRESHOLD: f64 = 60.0;

#[derive(Debug, Clone, PartialEq)]
pub struct EvaluatorConfig {
    pub passing_threshold: f64,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            passing_threshold: PASSING_THRESHOLD,
        }
    }
}

/// Turns one oracle response into a graded [`EvaluationResult`]. Each declared
/// expectation contributes a credit in [0, 1]; the final score is the
/// weighted mean of credits scaled to 0-100.
#[derive(Debug, Clone, Default)]
pub struct ResultEvaluator {
    config: EvaluatorConfig,
}

impl ResultEvaluator {
    pub fn new(config: EvaluatorConfig) -> Self {
        Self { config }
    }

    pub fn evaluate(
        &self,
        case: &EvaluationTestCase,
        output: &ScoringOutput,
        response_time_ms: u64,
    ) -> EvaluationResult {
        let mut ledger = CheckLedger::new(&case.evaluation_criteria);

        if let Some(expected) = &case.expected_output.overall_score {
            ledger.check_range(
                CheckField::OverallScore,
                "Overall score",
                expected,
                output.overall_score,
            );
        }

        for (component, expected) in &case.expected_output.bant_scores {
            ledger.check_range(
                CheckField::for_bant(*component),
                &format!("{} score", component.display_name()),
                expected,
                output.bant_scores.get(component).copied(),
            );
        }

        if let Some(expected) = case.expected_output.priority {
            ledger.check_priority(
                expected,
                output.priority,
                case.evaluation_criteria.priority_must_match,
            );
        }

        if let Some(expected) = case.expected_output.deal_size {
            ledger.check_deal_size(
                expected,
                output.deal_size,
                case.evaluation_criteria.deal_size_must_match,
            );
        }

        if case.expected_output.expect_insights {
            ledger.check_insights(&output.insights);
        }

        if case.expected_output.expect_red_flags {
            ledger.check_red_flags(&output.red_flags);
        }

        if case.expected_output.expect_recommended_action {
            ledger.check_recommended_action(output.recommended_action.as_deref());
        }

        let score = ledger.score();
        EvaluationResult {
            test_id: case.test_id.clone(),
            category: case.category,
            passed: score >= self.config.passing_threshold && !ledger.must_match_failed,
            score,
            performance_level: PerformanceLevel::from_score(score),
            discrepancies: ledger.discrepancies,
            strengths: ledger.strengths,
            oracle_output: output.clone(),
            response_time_ms,
            error: None,
            timestamp: Utc::now(),
        }
    }

    /// Grade a case whose scoring call failed. The empty output fails every
    /// declared expectation through the ordinary missing-field paths, and the
    /// call error is carried on the result.
    pub fn evaluate_degraded(&self, case: &EvaluationTestCase, error: &str) -> EvaluationResult {
        let mut result = self.evaluate(case, &ScoringOutput::default(), 0);
        result.error = Some(error.to_string());
        result
    }
}

/// Running tally for one grading pass. Informational label checks record
/// notes without touching the credit sums.
struct CheckLedger<'a> {
    criteria: &'a EvaluationCriteria,
    weighted_credit: f64,
    total_weight: f64,
    discrepancies: Vec<String>,
    strengths: Vec<String>,
    must_match_failed: bool,
}

impl<'a> CheckLedger<'a> {
    fn new(criteria: &'a EvaluationCriteria) -> Self {
        Self {
            criteria,
            weighted_credit: 0.0,
            total_weight: 0.0,
            discrepancies: Vec::new(),
            strengths: Vec::new(),
            must_match_failed: false,
        }
    }

    fn record(&mut self, field: CheckField, credit: f64) {
        let weight = self.criteria.weights.get(&field).copied().unwrap_or(1.0);
        self.weighted_credit += credit * weight;
        self.total_weight += weight;
    }

    fn check_range(
        &mut self,
        field: CheckField,
        name: &str,
        expected: &ScoreRange,
        actual: Option<f64>,
    ) {
        match actual {
            None => {
                self.record(field, 0.0);
                self.discrepancies.push(format!(
                    "{name} missing from oracle output (expected range [{}, {}])",
                    expected.low, expected.high
                ));
            }
            Some(value) if expected.contains(value) => {
                self.record(field, 1.0);
                self.strengths.push(format!(
                    "{name} {value} within expected range [{}, {}]",
                    expected.low, expected.high
                ));
            }
            Some(value) => {
                // Linear partial credit that runs out score_tolerance points
                // past the nearest bound.
                let excess = expected.excess_beyond(value);
                let credit = (1.0 - excess / self.criteria.score_tolerance).max(0.0);
                self.record(field, credit);
                self.discrepancies.push(format!(
                    "{name} {value} outside expected range [{}, {}]",
                    expected.low, expected.high
                ));
            }
        }
    }

    fn check_priority(&mut self, expected: Priority, actual: Option<Priority>, must_match: bool) {
        match actual {
            None => self.label_miss(
                CheckField::Priority,
                must_match,
                format!(
                    "Priority missing from oracle output (expected '{}')",
                    expected.label()
                ),
            ),
            Some(actual) if actual == expected => self.label_hit(
                CheckField::Priority,
                must_match,
                format!("Priority correctly classified as '{}'", expected.label()),
            ),
            Some(actual) => self.label_miss(
                CheckField::Priority,
                must_match,
                format!(
                    "Priority mismatch: expected '{}', got '{}'",
                    expected.label(),
                    actual.label()
                ),
            ),
        }
    }

    fn check_deal_size(&mut self, expected: DealSize, actual: Option<DealSize>, must_match: bool) {
        match actual {
            None => self.label_miss(
                CheckField::DealSize,
                must_match,
                format!(
                    "Deal size missing from oracle output (expected '{}')",
                    expected.label()
                ),
            ),
            Some(actual) if actual == expected => self.label_hit(
                CheckField::DealSize,
                must_match,
                format!("Deal size correctly estimated as '{}'", expected.label()),
            ),
            Some(actual) => self.label_miss(
                CheckField::DealSize,
                must_match,
                format!(
                    "Deal size mismatch: expected '{}', got '{}'",
                    expected.label(),
                    actual.label()
                ),
            ),
        }
    }

    fn check_insights(&mut self, insights: &[String]) {
        if insights.is_empty() {
            self.record(CheckField::Insights, 0.0);
            self.discrepancies
                .push("Expected insights but none were identified".to_string());
        } else {
            self.record(CheckField::Insights, 1.0);
            self.strengths
                .push(format!("Generated {} insights", insights.len()));
        }
    }

    fn check_red_flags(&mut self, red_flags: &[String]) {
        if red_flags.is_empty() {
            self.record(CheckField::RedFlags, 0.0);
            self.discrepancies
                .push("Expected red flags but none were identified".to_string());
        } else {
            self.record(CheckField::RedFlags, 1.0);
            self.strengths
                .push(format!("Identified {} red flags", red_flags.len()));
        }
    }

    fn check_recommended_action(&mut self, action: Option<&str>) {
        match action {
            Some(action) if !action.trim().is_empty() => {
                self.record(CheckField::RecommendedAction, 1.0);
                self.strengths
                    .push("Recommended action provided".to_string());
            }
            _ => {
                self.record(CheckField::RecommendedAction, 0.0);
                self.discrepancies
                    .push("Expected a recommended action but none was provided".to_string());
            }
        }
    }

    fn label_hit(&mut self, field: CheckField, must_match: bool, note: String) {
        if must_match {
            self.record(field, 1.0);
        }
        self.strengths.push(note);
    }

    fn label_miss(&mut self, field: CheckField, must_match: bool, note: String) {
        if must_match {
            self.record(field, 0.0);
            self.must_match_failed = true;
        }
        self.discrepancies.push(note);
    }

    /// Weighted credit mean scaled to 0-100. A case with no scored checks
    /// grades to zero rather than dividing by zero.
    fn score(&self) -> f64 {
        if self.total_weight == 0.0 {
            return 0.0;
        }
        self.weighted_credit * 100.0 / self.total_weight
    }
}
