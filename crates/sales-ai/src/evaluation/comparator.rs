use std::collections::BTreeMap;

use super::domain::{EvaluationCategory, EvaluationReport, ReportComparison};

/// Overall-score delta at which a comparison is called significant.
pub const SIGNIFICANT_CHANGE: f64 = 5.0;

/// Computes the delta view between a baseline report and a candidate report.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportComparator;

impl ReportComparator {
    pub fn new() -> Self {
        Self
    }

    pub fn compare(&self, report1: &EvaluationReport, report2: &EvaluationReport) -> ReportComparison {
        let overall_score_change = report2.summary.overall_score - report1.summary.overall_score;
        let pass_rate_change = report2.summary.pass_rate - report1.summary.pass_rate;

        // Only categories measured on both sides are comparable.
        let mut category_improvements: BTreeMap<EvaluationCategory, f64> = BTreeMap::new();
        let mut category_regressions: BTreeMap<EvaluationCategory, f64> = BTreeMap::new();
        for (category, baseline) in &report1.category_scores {
            let Some(candidate) = report2.category_scores.get(category) else {
                continue;
            };
            let delta = candidate - baseline;
            if delta > 0.0 {
                category_improvements.insert(*category, delta);
            } else if delta < 0.0 {
                category_regressions.insert(*category, -delta);
            }
        }

        let summary = if overall_score_change >= SIGNIFICANT_CHANGE {
            "Significant improvement in model performance"
        } else if overall_score_change <= -SIGNIFICANT_CHANGE {
            "Significant regression in model performance"
        } else {
            "No significant change in model performance"
        };

        ReportComparison {
            report1: report1.into(),
            report2: report2.into(),
            overall_score_change,
            pass_rate_change,
            category_improvements,
            category_regressions,
            summary: summary.to_string(),
        }
    }
}
