use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::domain::{
    BantComponent, CheckField, DealSize, EvaluationCategory, EvaluationCriteria,
    EvaluationTestCase, ExpectedScoring, Priority, ScoreRange,
};

/// Lead fields every test case must carry so the oracle prompt stays coherent.
pub const REQUIRED_INPUT_FIELDS: [&str; 3] = ["name", "company", "email"];

/// Validation failures raised when a test case is registered. A malformed
/// case is rejected here rather than producing a nonsense result later.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum RegistryError {
    #[error("test case is missing a test_id")]
    MissingTestId,
    #[error("test case {test_id} is missing a description")]
    MissingDescription { test_id: String },
    #[error("test case {test_id} input_data is missing required field '{field}'")]
    MissingInputField { test_id: String, field: String },
    #[error("test case {test_id} declares no expectations")]
    NoExpectations { test_id: String },
    #[error("test case {test_id} has invalid range [{low}, {high}] for {field}")]
    InvalidRange {
        test_id: String,
        field: String,
        low: f64,
        high: f64,
    },
    #[error("test case {test_id} has non-positive score tolerance {tolerance}")]
    InvalidTolerance { test_id: String, tolerance: f64 },
    #[error("test case {test_id} has non-positive weight for {field}")]
    InvalidWeight { test_id: String, field: String },
}

/// Optional predicates combined with AND; the tag predicate passes when the
/// case's tags intersect the requested set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TestCaseFilter {
    #[serde(default)]
    pub test_ids: Option<Vec<String>>,
    #[serde(default)]
    pub categories: Option<Vec<EvaluationCategory>>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

impl TestCaseFilter {
    pub fn matches(&self, case: &EvaluationTestCase) -> bool {
        if let Some(test_ids) = &self.test_ids {
            if !test_ids.iter().any(|id| id == &case.test_id) {
                return false;
            }
        }
        if let Some(categories) = &self.categories {
            if !categories.contains(&case.category) {
                return false;
            }
        }
        if let Some(tags) = &self.tags {
            if !tags.iter().any(|tag| case.tags.contains(tag)) {
                return false;
            }
        }
        true
    }
}

/// Holds the test cases a run can select from, in registration order.
#[derive(Debug, Clone, Default)]
pub struct TestCaseRegistry {
    cases: Vec<EvaluationTestCase>,
}

impl TestCaseRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and insert a case. An existing case with the same test_id is
    /// replaced in place, keeping its original position.
    pub fn add(&mut self, case: EvaluationTestCase) -> Result<(), RegistryError> {
        validate(&case)?;
        if let Some(existing) = self
            .cases
            .iter_mut()
            .find(|existing| existing.test_id == case.test_id)
        {
            *existing = case;
        } else {
            self.cases.push(case);
        }
        Ok(())
    }

    pub fn matching(&self, filter: &TestCaseFilter) -> Vec<EvaluationTestCase> {
        self.cases
            .iter()
            .filter(|case| filter.matches(case))
            .cloned()
            .collect()
    }

    pub fn get(&self, test_id: &str) -> Option<&EvaluationTestCase> {
        self.cases.iter().find(|case| case.test_id == test_id)
    }

    pub fn all(&self) -> &[EvaluationTestCase] {
        &self.cases
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    /// The standard suite probing every scoring behavior once.
    pub fn standard_catalog() -> Self {
        let mut registry = Self::new();
        for case in standard_test_cases() {
            registry
                .add(case)
                .expect("built-in test case must validate");
        }
        registry
    }
}

fn validate(case: &EvaluationTestCase) -> Result<(), RegistryError> {
    if case.test_id.trim().is_empty() {
        return Err(RegistryError::MissingTestId);
    }

    if case.description.trim().is_empty() {
        return Err(RegistryError::MissingDescription {
            test_id: case.test_id.clone(),
        });
    }

    for field in REQUIRED_INPUT_FIELDS {
        let present = case
            .input_data
            .get(field)
            .map(|value| !value.trim().is_empty())
            .unwrap_or(false);
        if !present {
            return Err(RegistryError::MissingInputField {
                test_id: case.test_id.clone(),
                field: field.to_string(),
            });
        }
    }

    if !case.expected_output.declares_expectation() {
        return Err(RegistryError::NoExpectations {
            test_id: case.test_id.clone(),
        });
    }

    if let Some(range) = &case.expected_output.overall_score {
        check_range(&case.test_id, CheckField::OverallScore.label(), range)?;
    }
    for (component, range) in &case.expected_output.bant_scores {
        check_range(&case.test_id, component.label(), range)?;
    }

    if case.evaluation_criteria.score_tolerance <= 0.0 {
        return Err(RegistryError::InvalidTolerance {
            test_id: case.test_id.clone(),
            tolerance: case.evaluation_criteria.score_tolerance,
        });
    }

    for (field, weight) in &case.evaluation_criteria.weights {
        if *weight <= 0.0 {
            return Err(RegistryError::InvalidWeight {
                test_id: case.test_id.clone(),
                field: field.label().to_string(),
            });
        }
    }

    Ok(())
}

fn check_range(test_id: &str, field: &str, range: &ScoreRange) -> Result<(), RegistryError> {
    if range.low > range.high || range.low < 0.0 || range.high > 100.0 {
        return Err(RegistryError::InvalidRange {
            test_id: test_id.to_string(),
            field: field.to_string(),
            low: range.low,
            high: range.high,
        });
    }
    Ok(())
}

fn lead(fields: &[(&str, &str)]) -> BTreeMap<String, String> {
    fields
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

fn tags(values: &[&str]) -> Vec<String> {
    values.iter().map(|tag| tag.to_string()).collect()
}

fn standard_test_cases() -> Vec<EvaluationTestCase> {
    vec![
        EvaluationTestCase {
            test_id: "enterprise_lead_001".to_string(),
            category: EvaluationCategory::LeadScoring,
            description: "Enterprise VP with clear authority and budget should score 80+".to_string(),
            input_data: lead(&[
                ("name", "Sarah Chen"),
                ("title", "VP of Engineering"),
                ("company", "TechCorp Inc"),
                ("company_size", "1000+ employees"),
                ("industry", "Enterprise Software"),
                ("source", "Direct Website Inquiry"),
                ("email", "sarah.chen@techcorp.com"),
                ("phone", "+1-555-0123"),
                ("notes", "Looking to replace current CRM. Budget approved for Q1. Needs demo ASAP."),
            ]),
            expected_output: ExpectedScoring {
                overall_score: Some(ScoreRange::new(80.0, 100.0)),
                bant_scores: BTreeMap::from([
                    (BantComponent::Authority, ScoreRange::new(25.0, 30.0)),
                    (BantComponent::CompanyFit, ScoreRange::new(25.0, 30.0)),
                ]),
                priority: Some(Priority::Hot),
                deal_size: Some(DealSize::Enterprise),
                expect_recommended_action: true,
                ..ExpectedScoring::default()
            },
            evaluation_criteria: EvaluationCriteria {
                score_tolerance: 10.0,
                priority_must_match: true,
                deal_size_must_match: true,
                ..EvaluationCriteria::default()
            },
            tags: tags(&["enterprise", "high_priority", "baseline"]),
        },
        EvaluationTestCase {
            test_id: "low_quality_lead_001".to_string(),
            category: EvaluationCategory::LeadScoring,
            description: "Student intern with no authority should score below 40".to_string(),
            input_data: lead(&[
                ("name", "John Doe"),
                ("title", "Intern"),
                ("company", "Small Startup"),
                ("company_size", "1-10 employees"),
                ("industry", "Unknown"),
                ("source", "Cold Email"),
                ("email", "john@startup.com"),
                ("phone", ""),
                ("notes", "Just browsing options"),
            ]),
            expected_output: ExpectedScoring {
                overall_score: Some(ScoreRange::new(0.0, 40.0)),
                priority: Some(Priority::Cold),
                deal_size: Some(DealSize::Small),
                expect_red_flags: true,
                ..ExpectedScoring::default()
            },
            evaluation_criteria: EvaluationCriteria {
                score_tolerance: 10.0,
                priority_must_match: true,
                ..EvaluationCriteria::default()
            },
            tags: tags(&["low_quality", "baseline"]),
        },
        EvaluationTestCase {
            test_id: "midtier_lead_001".to_string(),
            category: EvaluationCategory::LeadScoring,
            description: "Manager at a medium company should score 50-70".to_string(),
            input_data: lead(&[
                ("name", "Alice Johnson"),
                ("title", "Sales Manager"),
                ("company", "MidSize Corp"),
                ("company_size", "100-500 employees"),
                ("industry", "B2B Services"),
                ("source", "LinkedIn"),
                ("email", "alice.j@midsizecorp.com"),
                ("phone", "+1-555-0199"),
                ("notes", "Interested in learning more about pricing"),
            ]),
            expected_output: ExpectedScoring {
                overall_score: Some(ScoreRange::new(50.0, 70.0)),
                priority: Some(Priority::Warm),
                deal_size: Some(DealSize::Medium),
                ..ExpectedScoring::default()
            },
            evaluation_criteria: EvaluationCriteria {
                score_tolerance: 15.0,
                priority_must_match: true,
                ..EvaluationCriteria::default()
            },
            tags: tags(&["midtier", "baseline"]),
        },
        EvaluationTestCase {
            test_id: "bant_authority_001".to_string(),
            category: EvaluationCategory::BantAnalysis,
            description: "C-level executive should register near-maximal authority".to_string(),
            input_data: lead(&[
                ("name", "Michael Roberts"),
                ("title", "CTO"),
                ("company", "Innovation Labs"),
                ("company_size", "500-1000 employees"),
                ("industry", "Technology"),
                ("source", "Referral"),
                ("email", "michael.roberts@innovationlabs.com"),
                ("phone", "+1-555-0150"),
                ("notes", "Decision maker for all tech purchases. Direct access to CEO."),
            ]),
            expected_output: ExpectedScoring {
                bant_scores: BTreeMap::from([(
                    BantComponent::Authority,
                    ScoreRange::new(28.0, 30.0),
                )]),
                expect_insights: true,
                ..ExpectedScoring::default()
            },
            evaluation_criteria: EvaluationCriteria::default(),
            tags: tags(&["bant", "authority", "c_level"]),
        },
        EvaluationTestCase {
            test_id: "red_flag_001".to_string(),
            category: EvaluationCategory::RedFlagDetection,
            description: "Should flag a competitor and potential tire-kicker".to_string(),
            input_data: lead(&[
                ("name", "Competitor Research"),
                ("title", "Market Analyst"),
                ("company", "CompetitorCorp"),
                ("company_size", "Unknown"),
                ("industry", "Same as ours"),
                ("source", "Unknown"),
                ("email", "research@competitor.com"),
                ("phone", ""),
                ("notes", "Asking lots of questions about pricing and features. No mention of actual need."),
            ]),
            expected_output: ExpectedScoring {
                priority: Some(Priority::Cold),
                expect_red_flags: true,
                ..ExpectedScoring::default()
            },
            evaluation_criteria: EvaluationCriteria::default(),
            tags: tags(&["red_flags", "edge_case"]),
        },
        EvaluationTestCase {
            test_id: "deal_size_001".to_string(),
            category: EvaluationCategory::DealSizeEstimation,
            description: "Fortune 500 buyer should be estimated as an enterprise deal".to_string(),
            input_data: lead(&[
                ("name", "Enterprise Buyer"),
                ("title", "Director of Sales Operations"),
                ("company", "Fortune 500 Company"),
                ("company_size", "10000+ employees"),
                ("industry", "Financial Services"),
                ("source", "Direct Inquiry"),
                ("email", "buyer@fortune500.com"),
                ("phone", "+1-555-0200"),
                ("notes", "Need solution for entire sales org, 500+ users"),
            ]),
            expected_output: ExpectedScoring {
                deal_size: Some(DealSize::Enterprise),
                ..ExpectedScoring::default()
            },
            evaluation_criteria: EvaluationCriteria {
                deal_size_must_match: true,
                ..EvaluationCriteria::default()
            },
            tags: tags(&["deal_size", "enterprise"]),
        },
        EvaluationTestCase {
            test_id: "next_action_001".to_string(),
            category: EvaluationCategory::NextActionRecommendation,
            description: "Hot lead with an expiring contract should get an immediate action".to_string(),
            input_data: lead(&[
                ("name", "Urgent Buyer"),
                ("title", "VP Sales"),
                ("company", "GrowthCo"),
                ("company_size", "500+ employees"),
                ("industry", "SaaS"),
                ("source", "Direct Inquiry"),
                ("email", "urgent@growthco.com"),
                ("phone", "+1-555-0300"),
                ("notes", "Current CRM contract expires in 2 weeks. Need replacement urgently."),
            ]),
            expected_output: ExpectedScoring {
                priority: Some(Priority::Hot),
                expect_recommended_action: true,
                ..ExpectedScoring::default()
            },
            evaluation_criteria: EvaluationCriteria {
                priority_must_match: true,
                ..EvaluationCriteria::default()
            },
            tags: tags(&["next_action", "urgency"]),
        },
        EvaluationTestCase {
            test_id: "insight_generation_001".to_string(),
            category: EvaluationCategory::InsightGeneration,
            description: "Should still surface insights from a sparse profile".to_string(),
            input_data: lead(&[
                ("name", "Minimal Info Lead"),
                ("title", "Manager"),
                ("company", "Some Company"),
                ("company_size", "Unknown"),
                ("industry", "Technology"),
                ("source", "Web Form"),
                ("email", "contact@somecompany.com"),
                ("phone", ""),
                ("notes", "Interested in demo"),
            ]),
            expected_output: ExpectedScoring {
                expect_insights: true,
                ..ExpectedScoring::default()
            },
            evaluation_criteria: EvaluationCriteria::default(),
            tags: tags(&["insight", "edge_case", "incomplete_data"]),
        },
    ]
}
