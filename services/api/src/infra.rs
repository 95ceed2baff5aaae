use metrics_exporter_prometheus::PrometheusHandle;
use sales_ai::config::ReportStoreConfig;
use sales_ai::evaluation::{
    BantComponent, DealSize, EvaluationCategory, EvaluationReport, OracleFailure, Priority,
    ReportDigest, ReportStore, ReportStoreError, ScoringOracle, ScoringOutput,
};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) fn parse_category(raw: &str) -> Result<EvaluationCategory, String> {
    EvaluationCategory::from_label(raw).ok_or_else(|| format!("unknown category '{raw}'"))
}

/// Volatile report archive for demos and tests.
#[derive(Default, Clone)]
pub(crate) struct InMemoryReportStore {
    reports: Arc<Mutex<Vec<EvaluationReport>>>,
}

impl ReportStore for InMemoryReportStore {
    fn save(&self, report: &EvaluationReport) -> Result<(), ReportStoreError> {
        let mut guard = self.reports.lock().expect("report store mutex poisoned");
        if guard.iter().any(|stored| stored.report_id == report.report_id) {
            return Err(ReportStoreError::Conflict(report.report_id.clone()));
        }
        guard.push(report.clone());
        Ok(())
    }

    fn load(&self, report_id: &str) -> Result<EvaluationReport, ReportStoreError> {
        let guard = self.reports.lock().expect("report store mutex poisoned");
        guard
            .iter()
            .find(|stored| stored.report_id == report_id)
            .cloned()
            .ok_or_else(|| ReportStoreError::NotFound(report_id.to_string()))
    }

    fn list(&self, limit: usize) -> Result<Vec<ReportDigest>, ReportStoreError> {
        let guard = self.reports.lock().expect("report store mutex poisoned");
        let mut digests: Vec<ReportDigest> = guard.iter().map(ReportDigest::from).collect();
        digests.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        digests.truncate(limit);
        Ok(digests)
    }
}

/// Report archive keeping one pretty-printed JSON file per report under the
/// configured directory.
pub(crate) struct JsonFileReportStore {
    directory: PathBuf,
}

impl JsonFileReportStore {
    pub(crate) fn new(config: &ReportStoreConfig) -> Result<Self, ReportStoreError> {
        fs::create_dir_all(&config.directory)
            .map_err(|err| ReportStoreError::Unavailable(err.to_string()))?;
        Ok(Self {
            directory: config.directory.clone(),
        })
    }

    fn report_path(&self, report_id: &str) -> PathBuf {
        self.directory.join(format!("{report_id}.json"))
    }
}

impl ReportStore for JsonFileReportStore {
    fn save(&self, report: &EvaluationReport) -> Result<(), ReportStoreError> {
        let path = self.report_path(&report.report_id);
        if path.exists() {
            return Err(ReportStoreError::Conflict(report.report_id.clone()));
        }
        let body = serde_json::to_string_pretty(report)
            .map_err(|err| ReportStoreError::Unavailable(err.to_string()))?;
        fs::write(&path, body).map_err(|err| ReportStoreError::Unavailable(err.to_string()))
    }

    fn load(&self, report_id: &str) -> Result<EvaluationReport, ReportStoreError> {
        let path = self.report_path(report_id);
        let body = fs::read_to_string(&path).map_err(|err| match err.kind() {
            ErrorKind::NotFound => ReportStoreError::NotFound(report_id.to_string()),
            _ => ReportStoreError::Unavailable(err.to_string()),
        })?;
        serde_json::from_str(&body).map_err(|err| ReportStoreError::Unavailable(err.to_string()))
    }

    fn list(&self, limit: usize) -> Result<Vec<ReportDigest>, ReportStoreError> {
        let entries = fs::read_dir(&self.directory)
            .map_err(|err| ReportStoreError::Unavailable(err.to_string()))?;

        let mut digests = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|err| ReportStoreError::Unavailable(err.to_string()))?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let body = fs::read_to_string(&path)
                .map_err(|err| ReportStoreError::Unavailable(err.to_string()))?;
            // Files that do not parse as reports are skipped.
            if let Ok(report) = serde_json::from_str::<EvaluationReport>(&body) {
                digests.push(ReportDigest::from(&report));
            }
        }

        digests.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        digests.truncate(limit);
        Ok(digests)
    }
}

const PROFILE_FIELDS: [&str; 9] = [
    "name",
    "title",
    "company",
    "company_size",
    "industry",
    "source",
    "email",
    "phone",
    "notes",
];

/// Rule-based lead scorer mirroring the model's rubric. Backs the demo and
/// the offline evaluation path, neither of which should need an API key.
#[derive(Debug, Default, Clone)]
pub(crate) struct HeuristicScoringOracle;

#[async_trait::async_trait]
impl ScoringOracle for HeuristicScoringOracle {
    async fn score(&self, lead: &BTreeMap<String, String>) -> Result<ScoringOutput, OracleFailure> {
        Ok(assess(lead))
    }
}

fn raw<'a>(lead: &'a BTreeMap<String, String>, key: &str) -> &'a str {
    lead.get(key).map(String::as_str).unwrap_or("")
}

fn lowered(lead: &BTreeMap<String, String>, key: &str) -> String {
    raw(lead, key).trim().to_lowercase()
}

fn has_value(lead: &BTreeMap<String, String>, key: &str) -> bool {
    !raw(lead, key).trim().is_empty()
}

fn authority_score(title: &str) -> f64 {
    if ["ceo", "cto", "vp", "director"]
        .iter()
        .any(|needle| title.contains(needle))
    {
        30.0
    } else if ["manager", "lead"]
        .iter()
        .any(|needle| title.contains(needle))
    {
        20.0
    } else {
        10.0
    }
}

fn company_fit_score(company_size: &str) -> f64 {
    if company_size.contains("500+") || company_size.contains("201-500") {
        30.0
    } else if company_size.contains("51-200") {
        25.0
    } else if company_size.contains("11-50") {
        15.0
    } else {
        10.0
    }
}

fn source_quality_score(source: &str) -> f64 {
    if source.contains("referral") {
        20.0
    } else if source.contains("linkedin") {
        18.0
    } else if source.contains("website") {
        15.0
    } else {
        10.0
    }
}

/// Engagement potential derived from profile completeness, scaled into the
/// 12-18 band of the scoring rubric.
fn engagement_score(lead: &BTreeMap<String, String>) -> f64 {
    let filled = PROFILE_FIELDS
        .iter()
        .filter(|key| has_value(lead, key))
        .count();
    12.0 + ((filled as f64 / PROFILE_FIELDS.len() as f64) * 6.0).round()
}

fn assess(lead: &BTreeMap<String, String>) -> ScoringOutput {
    let authority = authority_score(&lowered(lead, "title"));
    let company_fit = company_fit_score(&lowered(lead, "company_size"));
    let source_quality = source_quality_score(&lowered(lead, "source"));
    let engagement = engagement_score(lead);

    let total = (authority + company_fit + source_quality + engagement).min(100.0);
    let priority = if total >= 70.0 {
        Priority::Hot
    } else if total >= 50.0 {
        Priority::Warm
    } else {
        Priority::Cold
    };
    let deal_size = if company_fit >= 28.0 {
        DealSize::Large
    } else if company_fit >= 20.0 {
        DealSize::Medium
    } else {
        DealSize::Small
    };

    let mut strengths = Vec::new();
    if authority >= 25.0 {
        strengths.push(format!(
            "Strong decision-making authority ({})",
            raw(lead, "title")
        ));
    }
    if company_fit >= 25.0 {
        strengths.push(format!("Ideal company size ({})", raw(lead, "company_size")));
    }
    if source_quality >= 18.0 {
        strengths.push(format!("High-quality lead source ({})", raw(lead, "source")));
    }
    if strengths.is_empty() {
        strengths.push("Requires further qualification".to_string());
    }

    let mut red_flags = Vec::new();
    if authority < 15.0 {
        red_flags
            .push("Limited purchasing authority - may need to involve decision makers".to_string());
    }
    if company_fit < 15.0 {
        red_flags.push("Company size may indicate budget constraints".to_string());
    }
    if !has_value(lead, "phone") {
        red_flags.push("No phone number - may be harder to reach".to_string());
    }
    if red_flags.is_empty() {
        red_flags.push("None identified - proceed with confidence".to_string());
    }

    let bant_scores = BTreeMap::from([
        (BantComponent::Authority, authority),
        (BantComponent::CompanyFit, company_fit),
        (BantComponent::SourceQuality, source_quality),
        (BantComponent::EngagementPotential, engagement),
    ]);

    // First component wins ties, in rubric order.
    let mut strongest = BantComponent::Authority;
    for component in BantComponent::ordered() {
        if bant_scores[&component] > bant_scores[&strongest] {
            strongest = component;
        }
    }

    let insights = vec![
        format!("Overall score: {total:.0}/100 ({} priority)", priority.label()),
        format!("Strongest factor: {}", strongest.display_name()),
        format!("Main opportunity: {}", strengths[0]),
    ];

    let recommended_action = if total >= 70.0 {
        "Contact within 24 hours"
    } else if total >= 50.0 {
        "Follow up within 48-72 hours"
    } else {
        "Add to nurture campaign"
    };

    ScoringOutput {
        overall_score: Some(total),
        priority: Some(priority),
        deal_size: Some(deal_size),
        bant_scores,
        insights,
        red_flags,
        recommended_action: Some(recommended_action.to_string()),
    }
}
