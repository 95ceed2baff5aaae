use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Behaviors of the scoring model that test cases exercise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationCategory {
    LeadScoring,
    BantAnalysis,
    PriorityClassification,
    DealSizeEstimation,
    InsightGeneration,
    RedFlagDetection,
    NextActionRecommendation,
}

impl EvaluationCategory {
    pub const fn ordered() -> [EvaluationCategory; 7] {
        [
            EvaluationCategory::LeadScoring,
            EvaluationCategory::BantAnalysis,
            EvaluationCategory::PriorityClassification,
            EvaluationCategory::DealSizeEstimation,
            EvaluationCategory::InsightGeneration,
            EvaluationCategory::RedFlagDetection,
            EvaluationCategory::NextActionRecommendation,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            EvaluationCategory::LeadScoring => "lead_scoring",
            EvaluationCategory::BantAnalysis => "bant_analysis",
            EvaluationCategory::PriorityClassification => "priority_classification",
            EvaluationCategory::DealSizeEstimation => "deal_size_estimation",
            EvaluationCategory::InsightGeneration => "insight_generation",
            EvaluationCategory::RedFlagDetection => "red_flag_detection",
            EvaluationCategory::NextActionRecommendation => "next_action_recommendation",
        }
    }

    /// Human-readable name used in recommendation strings.
    pub const fn display_name(self) -> &'static str {
        match self {
            EvaluationCategory::LeadScoring => "Lead Scoring",
            EvaluationCategory::BantAnalysis => "Bant Analysis",
            EvaluationCategory::PriorityClassification => "Priority Classification",
            EvaluationCategory::DealSizeEstimation => "Deal Size Estimation",
            EvaluationCategory::InsightGeneration => "Insight Generation",
            EvaluationCategory::RedFlagDetection => "Red Flag Detection",
            EvaluationCategory::NextActionRecommendation => "Next Action Recommendation",
        }
    }

    pub fn from_label(value: &str) -> Option<Self> {
        EvaluationCategory::ordered()
            .into_iter()
            .find(|category| category.label() == value.trim().to_ascii_lowercase())
    }
}

/// Qualitative band a test score falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceLevel {
    Excellent,
    Good,
    Acceptable,
    Poor,
    Failing,
}

impl PerformanceLevel {
    pub const fn ordered() -> [PerformanceLevel; 5] {
        [
            PerformanceLevel::Excellent,
            PerformanceLevel::Good,
            PerformanceLevel::Acceptable,
            PerformanceLevel::Poor,
            PerformanceLevel::Failing,
        ]
    }

    /// Band assignment: [90, 100] excellent, [75, 90) good, [60, 75) acceptable,
    /// [40, 60) poor, everything below failing.
    pub fn from_score(score: f64) -> Self {
        if score >= 90.0 {
            PerformanceLevel::Excellent
        } else if score >= 75.0 {
            PerformanceLevel::Good
        } else if score >= 60.0 {
            PerformanceLevel::Acceptable
        } else if score >= 40.0 {
            PerformanceLevel::Poor
        } else {
            PerformanceLevel::Failing
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            PerformanceLevel::Excellent => "excellent",
            PerformanceLevel::Good => "good",
            PerformanceLevel::Acceptable => "acceptable",
            PerformanceLevel::Poor => "poor",
            PerformanceLevel::Failing => "failing",
        }
    }
}

/// Follow-up urgency the model assigns to a lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Hot,
    Warm,
    Cold,
}

impl Priority {
    pub const fn label(self) -> &'static str {
        match self {
            Priority::Hot => "hot",
            Priority::Warm => "warm",
            Priority::Cold => "cold",
        }
    }

    pub fn from_label(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "hot" => Some(Priority::Hot),
            "warm" => Some(Priority::Warm),
            "cold" => Some(Priority::Cold),
            _ => None,
        }
    }
}

/// Revenue band the model estimates for a lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DealSize {
    Small,
    Medium,
    Large,
    Enterprise,
}

impl DealSize {
    pub const fn label(self) -> &'static str {
        match self {
            DealSize::Small => "small",
            DealSize::Medium => "medium",
            DealSize::Large => "large",
            DealSize::Enterprise => "enterprise",
        }
    }

    pub fn from_label(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "small" => Some(DealSize::Small),
            "medium" => Some(DealSize::Medium),
            "large" => Some(DealSize::Large),
            "enterprise" => Some(DealSize::Enterprise),
            _ => None,
        }
    }
}

/// Component rubric the scoring prompt asks the model to break a score into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BantComponent {
    Authority,
    CompanyFit,
    SourceQuality,
    EngagementPotential,
}

impl BantComponent {
    pub const fn ordered() -> [BantComponent; 4] {
        [
            BantComponent::Authority,
            BantComponent::CompanyFit,
            BantComponent::SourceQuality,
            BantComponent::EngagementPotential,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            BantComponent::Authority => "authority",
            BantComponent::CompanyFit => "company_fit",
            BantComponent::SourceQuality => "source_quality",
            BantComponent::EngagementPotential => "engagement_potential",
        }
    }

    pub const fn display_name(self) -> &'static str {
        match self {
            BantComponent::Authority => "Authority",
            BantComponent::CompanyFit => "Company fit",
            BantComponent::SourceQuality => "Source quality",
            BantComponent::EngagementPotential => "Engagement potential",
        }
    }
}

/// Inclusive band an expected numeric value must land in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreRange {
    pub low: f64,
    pub high: f64,
}

impl ScoreRange {
    pub const fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.low && value <= self.high
    }

    /// Distance past the nearest bound; zero when the value is inside the range.
    pub fn excess_beyond(&self, value: f64) -> f64 {
        if value < self.low {
            self.low - value
        } else if value > self.high {
            value - self.high
        } else {
            0.0
        }
    }
}

/// Fields the evaluator can check, used to key per-field weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckField {
    OverallScore,
    AuthorityScore,
    CompanyFitScore,
    SourceQualityScore,
    EngagementPotentialScore,
    Priority,
    DealSize,
    Insights,
    RedFlags,
    RecommendedAction,
}

impl CheckField {
    pub const fn for_bant(component: BantComponent) -> CheckField {
        match component {
            BantComponent::Authority => CheckField::AuthorityScore,
            BantComponent::CompanyFit => CheckField::CompanyFitScore,
            BantComponent::SourceQuality => CheckField::SourceQualityScore,
            BantComponent::EngagementPotential => CheckField::EngagementPotentialScore,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            CheckField::OverallScore => "overall_score",
            CheckField::AuthorityScore => "authority_score",
            CheckField::CompanyFitScore => "company_fit_score",
            CheckField::SourceQualityScore => "source_quality_score",
            CheckField::EngagementPotentialScore => "engagement_potential_score",
            CheckField::Priority => "priority",
            CheckField::DealSize => "deal_size",
            CheckField::Insights => "insights",
            CheckField::RedFlags => "red_flags",
            CheckField::RecommendedAction => "recommended_action",
        }
    }
}

/// What the oracle is expected to produce for a test case. Every field is
/// optional so a case can probe a single behavior in isolation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpectedScoring {
    #[serde(default)]
    pub overall_score: Option<ScoreRange>,
    #[serde(default)]
    pub bant_scores: BTreeMap<BantComponent, ScoreRange>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub deal_size: Option<DealSize>,
    #[serde(default)]
    pub expect_insights: bool,
    #[serde(default)]
    pub expect_red_flags: bool,
    #[serde(default)]
    pub expect_recommended_action: bool,
}

impl ExpectedScoring {
    pub fn declares_expectation(&self) -> bool {
        self.overall_score.is_some()
            || !self.bant_scores.is_empty()
            || self.priority.is_some()
            || self.deal_size.is_some()
            || self.expect_insights
            || self.expect_red_flags
            || self.expect_recommended_action
    }
}

pub const DEFAULT_SCORE_TOLERANCE: f64 = 10.0;

/// Tolerances and strictness flags applied while grading a case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationCriteria {
    /// Distance past a range bound at which partial credit decays to zero.
    #[serde(default = "default_score_tolerance")]
    pub score_tolerance: f64,
    #[serde(default)]
    pub priority_must_match: bool,
    #[serde(default)]
    pub deal_size_must_match: bool,
    /// Per-field weights for the credit mean; absent fields weigh 1.0.
    #[serde(default)]
    pub weights: BTreeMap<CheckField, f64>,
}

fn default_score_tolerance() -> f64 {
    DEFAULT_SCORE_TOLERANCE
}

impl Default for EvaluationCriteria {
    fn default() -> Self {
        Self {
            score_tolerance: DEFAULT_SCORE_TOLERANCE,
            priority_must_match: false,
            deal_size_must_match: false,
            weights: BTreeMap::new(),
        }
    }
}

/// A registered probe of one scoring behavior. Immutable once registered;
/// replacing it means registering a new case under the same id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationTestCase {
    pub test_id: String,
    pub category: EvaluationCategory,
    pub description: String,
    /// Lead-record-shaped input forwarded verbatim to the oracle.
    pub input_data: BTreeMap<String, String>,
    pub expected_output: ExpectedScoring,
    #[serde(default)]
    pub evaluation_criteria: EvaluationCriteria,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Normalized output of one scoring call. `Default` is the fully-missing
/// shape used when a call fails or times out.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoringOutput {
    #[serde(default)]
    pub overall_score: Option<f64>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub deal_size: Option<DealSize>,
    #[serde(default)]
    pub bant_scores: BTreeMap<BantComponent, f64>,
    #[serde(default)]
    pub insights: Vec<String>,
    #[serde(default)]
    pub red_flags: Vec<String>,
    #[serde(default)]
    pub recommended_action: Option<String>,
}

/// Graded outcome of one test case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub test_id: String,
    pub category: EvaluationCategory,
    pub passed: bool,
    pub score: f64,
    pub performance_level: PerformanceLevel,
    pub discrepancies: Vec<String>,
    pub strengths: Vec<String>,
    pub oracle_output: ScoringOutput,
    pub response_time_ms: u64,
    #[serde(default)]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Failed result reduced to the fields an analyst needs to reproduce it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureCase {
    pub test_id: String,
    pub score: f64,
    pub discrepancies: Vec<String>,
}

/// Per-category diagnosis produced for underperforming categories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualitativeAnalysis {
    pub category: EvaluationCategory,
    /// Pass rate within the category, 0-100. Distinct from the mean score.
    pub confidence_score: f64,
    pub underperformance_patterns: Vec<String>,
    pub specific_failure_cases: Vec<FailureCase>,
    pub root_cause_analysis: Vec<String>,
    pub prompt_improvement_suggestions: Vec<String>,
}

/// Headline counters for a report.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_tests: usize,
    pub passed_tests: usize,
    pub failed_tests: usize,
    pub overall_score: f64,
    pub pass_rate: f64,
}

/// Aggregated outcome of one evaluation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub report_id: String,
    pub timestamp: DateTime<Utc>,
    pub summary: ReportSummary,
    pub category_scores: BTreeMap<EvaluationCategory, f64>,
    pub performance_breakdown: BTreeMap<PerformanceLevel, usize>,
    pub actionable_recommendations: Vec<String>,
    pub prompt_iteration_plan: Vec<String>,
    pub qualitative_analyses: Vec<QualitativeAnalysis>,
    pub results: Vec<EvaluationResult>,
}

/// Identity block for one side of a comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparedReport {
    pub report_id: String,
    pub timestamp: DateTime<Utc>,
    pub overall_score: f64,
}

impl From<&EvaluationReport> for ComparedReport {
    fn from(report: &EvaluationReport) -> Self {
        Self {
            report_id: report.report_id.clone(),
            timestamp: report.timestamp,
            overall_score: report.summary.overall_score,
        }
    }
}

/// Delta view between two stored reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportComparison {
    pub report1: ComparedReport,
    pub report2: ComparedReport,
    pub overall_score_change: f64,
    pub pass_rate_change: f64,
    pub category_improvements: BTreeMap<EvaluationCategory, f64>,
    /// Regressions are stored as positive magnitudes.
    pub category_regressions: BTreeMap<EvaluationCategory, f64>,
    pub summary: String,
}
