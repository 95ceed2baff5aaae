//! Failure-pattern mining for categories whose mean score falls short.

use std::collections::BTreeMap;

use super::domain::{EvaluationCategory, EvaluationResult, FailureCase, QualitativeAnalysis};

/// Mean category score below which a qualitative analysis is produced.
pub const UNDERPERFORMANCE_THRESHOLD: f64 = 70.0;

struct PatternRule {
    needle: &'static str,
    root_cause: &'static str,
    suggestion: &'static str,
}

/// Ordered diagnosis table. The first rule whose needle appears in a
/// normalized pattern wins; later rules never see that pattern.
const PATTERN_RULES: &[PatternRule] = &[
    PatternRule {
        needle: "mismatch",
        root_cause: "Classification criteria may be too strict or unclear in the prompt",
        suggestion: "Add explicit classification examples for hot, warm, and cold priorities and each deal size band",
    },
    PatternRule {
        needle: "missing from oracle output",
        root_cause: "Model may not consistently generate all required output fields",
        suggestion: "Strengthen output format instructions and require the full JSON schema in every response",
    },
    PatternRule {
        needle: "outside expected range",
        root_cause: "Score calibration may not align with lead quality expectations",
        suggestion: "Recalibrate scoring thresholds against real conversion data",
    },
    PatternRule {
        needle: "red flags but none",
        root_cause: "Red flag detection sensitivity may be too low",
        suggestion: "Expand red flag examples to cover competitor signals, tire-kickers, and invalid contact data",
    },
    PatternRule {
        needle: "insights but none",
        root_cause: "Insight generation may be superficial or template-based",
        suggestion: "Ask the model to reason across multiple lead fields when forming insights",
    },
    PatternRule {
        needle: "recommended action",
        root_cause: "Next-action recommendations may lack specificity or urgency awareness",
        suggestion: "Add an urgency-based prioritization framework to the prompt",
    },
];

const FALLBACK_ROOT_CAUSE: &str =
    "Category-specific sensitivity may be miscalibrated for the current prompt";
const FALLBACK_SUGGESTION: &str =
    "Review and refine the prompt with additional context and examples";

/// A normalized discrepancy seen one or more times within a category.
struct Pattern {
    key: String,
    text: String,
    count: usize,
}

/// Diagnoses underperforming categories from their graded results.
#[derive(Debug, Clone, Copy, Default)]
pub struct QualitativeAnalyzer;

impl QualitativeAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// One analysis per category whose mean score is below
    /// [`UNDERPERFORMANCE_THRESHOLD`], worst category first.
    pub fn analyze(&self, results: &[EvaluationResult]) -> Vec<QualitativeAnalysis> {
        let mut grouped: BTreeMap<EvaluationCategory, Vec<&EvaluationResult>> = BTreeMap::new();
        for result in results {
            grouped.entry(result.category).or_default().push(result);
        }

        let mut underperforming: Vec<(f64, EvaluationCategory, Vec<&EvaluationResult>)> = grouped
            .into_iter()
            .filter_map(|(category, results)| {
                let mean = results.iter().map(|result| result.score).sum::<f64>()
                    / results.len() as f64;
                (mean < UNDERPERFORMANCE_THRESHOLD).then_some((mean, category, results))
            })
            .collect();
        underperforming.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

        underperforming
            .into_iter()
            .map(|(_, category, results)| analyze_category(category, &results))
            .collect()
    }
}

fn analyze_category(
    category: EvaluationCategory,
    results: &[&EvaluationResult],
) -> QualitativeAnalysis {
    // Patterns are mined from every result in the category; a passing result
    // can still carry informational discrepancies worth surfacing.
    let patterns = recurring_patterns(results);
    let (root_cause_analysis, prompt_improvement_suggestions) = diagnose(&patterns);

    let specific_failure_cases = results
        .iter()
        .filter(|result| !result.passed)
        .map(|result| FailureCase {
            test_id: result.test_id.clone(),
            score: result.score,
            discrepancies: result.discrepancies.clone(),
        })
        .collect();

    let passed = results.iter().filter(|result| result.passed).count();
    let confidence_score = passed as f64 * 100.0 / results.len() as f64;

    QualitativeAnalysis {
        category,
        confidence_score,
        underperformance_patterns: patterns
            .iter()
            .map(|pattern| format!("{} (occurred {} times)", pattern.text, pattern.count))
            .collect(),
        specific_failure_cases,
        root_cause_analysis,
        prompt_improvement_suggestions,
    }
}

/// Group discrepancies case-insensitively, keeping the first-seen spelling
/// as the representative text. Most frequent first, ties alphabetical.
fn recurring_patterns(results: &[&EvaluationResult]) -> Vec<Pattern> {
    let mut patterns: Vec<Pattern> = Vec::new();
    for result in results {
        for discrepancy in &result.discrepancies {
            let text = discrepancy.trim();
            let key = text.to_lowercase();
            if let Some(existing) = patterns.iter_mut().find(|pattern| pattern.key == key) {
                existing.count += 1;
            } else {
                patterns.push(Pattern {
                    key,
                    text: text.to_string(),
                    count: 1,
                });
            }
        }
    }
    patterns.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.key.cmp(&b.key)));
    patterns
}

fn diagnose(patterns: &[Pattern]) -> (Vec<String>, Vec<String>) {
    let mut root_causes: Vec<String> = Vec::new();
    let mut suggestions: Vec<String> = Vec::new();

    for pattern in patterns {
        let Some(rule) = PATTERN_RULES
            .iter()
            .find(|rule| pattern.key.contains(rule.needle))
        else {
            continue;
        };
        if !root_causes.iter().any(|cause| cause == rule.root_cause) {
            root_causes.push(rule.root_cause.to_string());
            suggestions.push(rule.suggestion.to_string());
        }
    }

    if root_causes.is_empty() {
        root_causes.push(FALLBACK_ROOT_CAUSE.to_string());
        suggestions.push(FALLBACK_SUGGESTION.to_string());
    }

    (root_causes, suggestions)
}
