use crate::infra::{HeuristicScoringOracle, InMemoryReportStore, JsonFileReportStore};
use clap::Args;
use sales_ai::config::AppConfig;
use sales_ai::error::AppError;
use sales_ai::evaluation::{
    EvaluationCategory, EvaluationReport, EvaluationResult, EvaluationRunRequest,
    EvaluationService, GrokScoringOracle, ReportComparator, ReportComparison, ReportStore,
    TestCaseFilter, TestCaseRegistry,
};
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct EvaluateArgs {
    /// Restrict the run to these test ids (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub(crate) test_ids: Vec<String>,
    /// Restrict the run to one category
    #[arg(long, value_parser = crate::infra::parse_category)]
    pub(crate) category: Option<EvaluationCategory>,
    /// Restrict the run to cases carrying any of these tags (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub(crate) tags: Vec<String>,
    /// Grade the selected cases without archiving a report
    #[arg(long)]
    pub(crate) no_report: bool,
    /// Score with the offline rule-based scorer instead of the live model
    #[arg(long)]
    pub(crate) offline: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct TestCasesArgs {
    /// Restrict the listing to one category
    #[arg(long, value_parser = crate::infra::parse_category)]
    pub(crate) category: Option<EvaluationCategory>,
    /// Restrict the listing to cases carrying any of these tags (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub(crate) tags: Vec<String>,
}

#[derive(Args, Debug)]
pub(crate) struct ReportsArgs {
    /// Maximum number of archive rows to list
    #[arg(long, default_value_t = 10)]
    pub(crate) limit: usize,
}

#[derive(Args, Debug)]
pub(crate) struct ReportArgs {
    /// Identifier of the archived report
    pub(crate) report_id: String,
    /// Print the raw JSON payload instead of the rendered summary
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct CompareArgs {
    /// Identifier of the baseline report
    pub(crate) baseline_id: String,
    /// Identifier of the candidate report
    pub(crate) candidate_id: String,
}

pub(crate) async fn run_evaluation(args: EvaluateArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let store = Arc::new(JsonFileReportStore::new(&config.reports)?);

    let request = EvaluationRunRequest {
        test_ids: none_if_empty(args.test_ids),
        categories: args.category.map(|category| vec![category]),
        tags: none_if_empty(args.tags),
        generate_report: !args.no_report,
    };

    let outcome = if args.offline {
        let service = Arc::new(EvaluationService::with_standard_catalog(
            Arc::new(HeuristicScoringOracle),
            store,
        ));
        service.run(&request).await?
    } else {
        let oracle = Arc::new(GrokScoringOracle::new(&config.oracle)?);
        let service = Arc::new(EvaluationService::with_standard_catalog(oracle, store));
        service.run(&request).await?
    };

    render_results(&outcome.results);
    if let Some(report) = &outcome.report {
        println!();
        render_report(report);
        println!("\nArchived as {}", report.report_id);
    }

    Ok(())
}

pub(crate) fn run_test_cases(args: TestCasesArgs) -> Result<(), AppError> {
    let registry = TestCaseRegistry::standard_catalog();
    let filter = TestCaseFilter {
        test_ids: None,
        categories: args.category.map(|category| vec![category]),
        tags: none_if_empty(args.tags),
    };

    let cases = registry.matching(&filter);
    println!("{} test case(s)", cases.len());
    for case in &cases {
        println!(
            "- {} [{}] {}",
            case.test_id,
            case.category.label(),
            case.description
        );
        if !case.tags.is_empty() {
            println!("  tags: {}", case.tags.join(", "));
        }
    }

    Ok(())
}

pub(crate) fn run_reports(args: ReportsArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let store = JsonFileReportStore::new(&config.reports)?;
    let digests = store.list(args.limit)?;

    if digests.is_empty() {
        println!("No reports archived yet");
        return Ok(());
    }

    println!("Archived reports (newest first)");
    for digest in &digests {
        println!(
            "- {} | {} | score {:.1} | {}/{} passed",
            digest.report_id,
            digest.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
            digest.overall_score,
            digest.passed_tests,
            digest.total_tests
        );
    }

    Ok(())
}

pub(crate) fn run_report(args: ReportArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let store = JsonFileReportStore::new(&config.reports)?;
    let report = store.load(&args.report_id)?;

    if args.json {
        match serde_json::to_string_pretty(&report) {
            Ok(body) => println!("{body}"),
            Err(err) => println!("Report payload unavailable: {err}"),
        }
        return Ok(());
    }

    render_report(&report);
    Ok(())
}

pub(crate) fn run_compare(args: CompareArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let store = JsonFileReportStore::new(&config.reports)?;
    let baseline = store.load(&args.baseline_id)?;
    let candidate = store.load(&args.candidate_id)?;

    let comparison = ReportComparator::new().compare(&baseline, &candidate);
    render_comparison(&comparison);
    Ok(())
}

pub(crate) async fn run_demo() -> Result<(), AppError> {
    println!("Lead scoring evaluation demo (offline scorer)");

    let store = Arc::new(InMemoryReportStore::default());
    let service = Arc::new(EvaluationService::with_standard_catalog(
        Arc::new(HeuristicScoringOracle),
        store.clone(),
    ));

    let outcome = service.run(&EvaluationRunRequest::default()).await?;
    render_results(&outcome.results);

    let Some(report) = outcome.report else {
        println!("Run produced no report");
        return Ok(());
    };
    println!();
    render_report(&report);

    let digests = store.list(5)?;
    println!("\nArchive now holds {} report(s)", digests.len());

    Ok(())
}

fn none_if_empty(values: Vec<String>) -> Option<Vec<String>> {
    if values.is_empty() {
        None
    } else {
        Some(values)
    }
}

fn render_results(results: &[EvaluationResult]) {
    println!("\nGraded {} case(s)", results.len());
    for result in results {
        let verdict = if result.passed { "PASS" } else { "FAIL" };
        println!(
            "- {} [{}] {} | score {:.1} | {} ms",
            result.test_id,
            result.category.label(),
            verdict,
            result.score,
            result.response_time_ms
        );
        if let Some(error) = &result.error {
            println!("  scoring error: {error}");
        }
        for discrepancy in &result.discrepancies {
            println!("  - {discrepancy}");
        }
    }
}

pub(crate) fn render_report(report: &EvaluationReport) {
    println!("Evaluation report {}", report.report_id);
    println!("Generated {}", report.timestamp.format("%Y-%m-%d %H:%M:%S UTC"));
    println!(
        "Overall score {:.1} | {}/{} passed ({:.1}%)",
        report.summary.overall_score,
        report.summary.passed_tests,
        report.summary.total_tests,
        report.summary.pass_rate
    );

    if report.category_scores.is_empty() {
        println!("\nCategory scores: none measured");
    } else {
        println!("\nCategory scores");
        for (category, score) in &report.category_scores {
            println!("- {}: {:.1}", category.display_name(), score);
        }
    }

    println!("\nPerformance breakdown");
    for (level, count) in &report.performance_breakdown {
        println!("- {}: {}", level.label(), count);
    }

    if !report.actionable_recommendations.is_empty() {
        println!("\nRecommendations");
        for recommendation in &report.actionable_recommendations {
            println!("- {recommendation}");
        }
    }

    if !report.prompt_iteration_plan.is_empty() {
        println!("\nPrompt iteration plan");
        for step in &report.prompt_iteration_plan {
            println!("- {step}");
        }
    }

    for analysis in &report.qualitative_analyses {
        println!(
            "\nDiagnosis for {} (confidence {:.1}%)",
            analysis.category.display_name(),
            analysis.confidence_score
        );
        for pattern in &analysis.underperformance_patterns {
            println!("- pattern: {pattern}");
        }
        for (cause, suggestion) in analysis
            .root_cause_analysis
            .iter()
            .zip(&analysis.prompt_improvement_suggestions)
        {
            println!("- cause: {cause}");
            println!("  fix: {suggestion}");
        }
    }
}

pub(crate) fn render_comparison(comparison: &ReportComparison) {
    println!(
        "Comparing {} -> {}",
        comparison.report1.report_id, comparison.report2.report_id
    );
    println!(
        "Overall score {:.1} -> {:.1} ({:+.1})",
        comparison.report1.overall_score,
        comparison.report2.overall_score,
        comparison.overall_score_change
    );
    println!("Pass rate change {:+.1}%", comparison.pass_rate_change);

    if !comparison.category_improvements.is_empty() {
        println!("\nImprovements");
        for (category, delta) in &comparison.category_improvements {
            println!("- {}: +{:.1}", category.display_name(), delta);
        }
    }

    if !comparison.category_regressions.is_empty() {
        println!("\nRegressions");
        for (category, delta) in &comparison.category_regressions {
            println!("- {}: -{:.1}", category.display_name(), delta);
        }
    }

    println!("\n{}", comparison.summary);
}
