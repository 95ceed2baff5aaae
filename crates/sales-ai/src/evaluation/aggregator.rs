//! Report assembly from a run's graded results.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use super::analyzer::{QualitativeAnalyzer, UNDERPERFORMANCE_THRESHOLD};
use super::domain::{
    EvaluationCategory, EvaluationReport, EvaluationResult, PerformanceLevel, ReportSummary,
};

/// Latency above which a scoring call counts as slow.
pub const SLOW_RESPONSE_MS: u64 = 5_000;

/// Share of slow calls above which the report recommends trimming the prompt.
const SLOW_SHARE: f64 = 0.2;

/// Folds graded results into an [`EvaluationReport`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportAggregator {
    analyzer: QualitativeAnalyzer,
}

impl ReportAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn aggregate(&self, results: Vec<EvaluationResult>) -> EvaluationReport {
        self.aggregate_at(results, Utc::now())
    }

    /// Build the report with an explicit timestamp, which also fixes the
    /// derived report id.
    pub fn aggregate_at(
        &self,
        results: Vec<EvaluationResult>,
        timestamp: DateTime<Utc>,
    ) -> EvaluationReport {
        let total = results.len();
        let passed = results.iter().filter(|result| result.passed).count();
        let overall_score = if total == 0 {
            0.0
        } else {
            results.iter().map(|result| result.score).sum::<f64>() / total as f64
        };
        let pass_rate = if total == 0 {
            0.0
        } else {
            passed as f64 * 100.0 / total as f64
        };

        let category_scores = category_means(&results);

        let mut performance_breakdown: BTreeMap<PerformanceLevel, usize> = PerformanceLevel::ordered()
            .into_iter()
            .map(|level| (level, 0))
            .collect();
        for result in &results {
            if let Some(count) = performance_breakdown.get_mut(&result.performance_level) {
                *count += 1;
            }
        }

        EvaluationReport {
            report_id: format!("eval_report_{}", timestamp.format("%Y%m%d_%H%M%S")),
            timestamp,
            summary: ReportSummary {
                total_tests: total,
                passed_tests: passed,
                failed_tests: total - passed,
                overall_score,
                pass_rate,
            },
            actionable_recommendations: recommendations(&results, &category_scores),
            prompt_iteration_plan: prompt_iteration_plan(),
            qualitative_analyses: self.analyzer.analyze(&results),
            category_scores,
            performance_breakdown,
            results,
        }
    }
}

fn category_means(results: &[EvaluationResult]) -> BTreeMap<EvaluationCategory, f64> {
    let mut sums: BTreeMap<EvaluationCategory, (f64, usize)> = BTreeMap::new();
    for result in results {
        let entry = sums.entry(result.category).or_insert((0.0, 0));
        entry.0 += result.score;
        entry.1 += 1;
    }
    sums.into_iter()
        .map(|(category, (sum, count))| (category, sum / count as f64))
        .collect()
}

/// Category items first (weakest category leading), then the latency item
/// when applicable, then the fixed process items.
fn recommendations(
    results: &[EvaluationResult],
    category_scores: &BTreeMap<EvaluationCategory, f64>,
) -> Vec<String> {
    let mut recommendations = Vec::new();

    let mut weak: Vec<(EvaluationCategory, f64)> = category_scores
        .iter()
        .filter(|(_, score)| **score < UNDERPERFORMANCE_THRESHOLD)
        .map(|(category, score)| (*category, *score))
        .collect();
    weak.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
    for (category, score) in weak {
        recommendations.push(format!(
            "Priority: Improve {} (score: {score:.1})",
            category.display_name()
        ));
    }

    let slow = results
        .iter()
        .filter(|result| result.response_time_ms > SLOW_RESPONSE_MS)
        .count();
    if slow as f64 > results.len() as f64 * SLOW_SHARE {
        recommendations.push(
            "Performance: Consider reducing max_tokens or optimizing prompt length for faster responses"
                .to_string(),
        );
    }

    recommendations
        .push("Testing: Run evaluations weekly to track prompt iteration effectiveness".to_string());
    recommendations
        .push("Data: Collect real-world lead scoring data for comparison and calibration".to_string());

    recommendations
}

fn prompt_iteration_plan() -> Vec<String> {
    [
        "1. Iteratively refine prompts for the lowest-scoring categories",
        "2. Add targeted few-shot examples for underperforming scenarios",
        "3. Re-run the evaluation suite and validate improvements against edge cases",
        "4. Deploy the updated prompt and monitor production scoring drift",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}
