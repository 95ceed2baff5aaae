use super::common::*;
use crate::evaluation::domain::EvaluationCategory;
use crate::evaluation::QualitativeAnalyzer;

#[test]
fn categories_at_the_threshold_stay_unanalyzed() {
    let results = vec![
        graded("a", EvaluationCategory::LeadScoring, true, 70.0),
        graded("b", EvaluationCategory::LeadScoring, true, 70.0),
    ];

    let analyses = QualitativeAnalyzer::new().analyze(&results);

    assert!(analyses.is_empty());
}

#[test]
fn worst_category_is_analyzed_first() {
    let results = vec![
        graded("a", EvaluationCategory::BantAnalysis, false, 50.0),
        graded("b", EvaluationCategory::LeadScoring, false, 30.0),
        graded("c", EvaluationCategory::InsightGeneration, true, 95.0),
    ];

    let analyses = QualitativeAnalyzer::new().analyze(&results);

    let categories: Vec<EvaluationCategory> =
        analyses.iter().map(|analysis| analysis.category).collect();
    assert_eq!(
        categories,
        [
            EvaluationCategory::LeadScoring,
            EvaluationCategory::BantAnalysis,
        ]
    );
}

#[test]
fn patterns_group_case_insensitively_keeping_first_spelling() {
    let mut first = graded("a", EvaluationCategory::PriorityClassification, false, 40.0);
    first
        .discrepancies
        .push("Priority mismatch: expected 'hot', got 'warm'".to_string());
    let mut second = graded("b", EvaluationCategory::PriorityClassification, false, 40.0);
    second
        .discrepancies
        .push("priority mismatch: expected 'hot', got 'warm'".to_string());
    second
        .discrepancies
        .push("Overall score 50 outside expected range [80, 100]".to_string());

    let analyses = QualitativeAnalyzer::new().analyze(&[first, second]);

    assert_eq!(analyses.len(), 1);
    let analysis = &analyses[0];
    assert_eq!(
        analysis.underperformance_patterns,
        vec![
            "Priority mismatch: expected 'hot', got 'warm' (occurred 2 times)".to_string(),
            "Overall score 50 outside expected range [80, 100] (occurred 1 times)".to_string(),
        ]
    );
    assert!(analysis
        .root_cause_analysis
        .contains(&"Score calibration may not align with lead quality expectations".to_string()));
}

#[test]
fn passing_results_feed_patterns_but_not_failure_cases() {
    let mut passed = graded("informational", EvaluationCategory::LeadScoring, true, 65.0);
    passed
        .discrepancies
        .push("Priority mismatch: expected 'hot', got 'warm'".to_string());
    let mut failed = graded("hard_miss", EvaluationCategory::LeadScoring, false, 50.0);
    failed
        .discrepancies
        .push("Overall score 45 outside expected range [80, 100]".to_string());

    let analyses = QualitativeAnalyzer::new().analyze(&[passed, failed]);

    assert_eq!(analyses.len(), 1);
    let analysis = &analyses[0];
    assert_eq!(analysis.underperformance_patterns.len(), 2);
    assert_eq!(analysis.specific_failure_cases.len(), 1);
    let failure = &analysis.specific_failure_cases[0];
    assert_eq!(failure.test_id, "hard_miss");
    assert_eq!(failure.score, 50.0);
    assert_eq!(
        failure.discrepancies,
        vec!["Overall score 45 outside expected range [80, 100]".to_string()]
    );
}

#[test]
fn diagnosis_follows_the_rule_table_without_repeats() {
    let mut failing = graded("everything_wrong", EvaluationCategory::LeadScoring, false, 10.0);
    failing.discrepancies = vec![
        "Priority mismatch: expected 'hot', got 'warm'".to_string(),
        "Deal size mismatch: expected 'enterprise', got 'small'".to_string(),
        "Overall score missing from oracle output (expected range [80, 100])".to_string(),
        "Expected insights but none were identified".to_string(),
        "Expected a recommended action but none was provided".to_string(),
    ];

    let analyses = QualitativeAnalyzer::new().analyze(&[failing]);

    assert_eq!(analyses.len(), 1);
    let analysis = &analyses[0];
    // Both mismatch patterns collapse onto one classification diagnosis.
    assert_eq!(
        analysis.root_cause_analysis,
        vec![
            "Classification criteria may be too strict or unclear in the prompt".to_string(),
            "Next-action recommendations may lack specificity or urgency awareness".to_string(),
            "Insight generation may be superficial or template-based".to_string(),
            "Model may not consistently generate all required output fields".to_string(),
        ]
    );
    assert_eq!(
        analysis.prompt_improvement_suggestions,
        vec![
            "Add explicit classification examples for hot, warm, and cold priorities and each deal size band"
                .to_string(),
            "Add an urgency-based prioritization framework to the prompt".to_string(),
            "Ask the model to reason across multiple lead fields when forming insights".to_string(),
            "Strengthen output format instructions and require the full JSON schema in every response"
                .to_string(),
        ]
    );
}

#[test]
fn unmatched_patterns_fall_back_to_generic_guidance() {
    let mut failing = graded("odd_failure", EvaluationCategory::BantAnalysis, false, 20.0);
    failing
        .discrepancies
        .push("Latency budget exceeded".to_string());

    let analyses = QualitativeAnalyzer::new().analyze(&[failing]);

    let analysis = &analyses[0];
    assert_eq!(
        analysis.root_cause_analysis,
        vec!["Category-specific sensitivity may be miscalibrated for the current prompt".to_string()]
    );
    assert_eq!(
        analysis.prompt_improvement_suggestions,
        vec!["Review and refine the prompt with additional context and examples".to_string()]
    );
}

#[test]
fn silent_failures_also_get_the_fallback_diagnosis() {
    let failing = graded("quiet_failure", EvaluationCategory::BantAnalysis, false, 0.0);

    let analyses = QualitativeAnalyzer::new().analyze(&[failing]);

    let analysis = &analyses[0];
    assert!(analysis.underperformance_patterns.is_empty());
    assert_eq!(
        analysis.root_cause_analysis,
        vec!["Category-specific sensitivity may be miscalibrated for the current prompt".to_string()]
    );
}

#[test]
fn confidence_mirrors_the_category_pass_rate() {
    let results = vec![
        graded("a", EvaluationCategory::DealSizeEstimation, true, 40.0),
        graded("b", EvaluationCategory::DealSizeEstimation, false, 40.0),
        graded("c", EvaluationCategory::DealSizeEstimation, false, 40.0),
        graded("d", EvaluationCategory::DealSizeEstimation, false, 40.0),
    ];

    let analyses = QualitativeAnalyzer::new().analyze(&results);

    assert_eq!(analyses.len(), 1);
    assert_eq!(analyses[0].confidence_score, 25.0);
}
