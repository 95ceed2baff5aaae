//! Boundary to the lead-scoring model under evaluation.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;

use super::domain::{BantComponent, DealSize, Priority, ScoringOutput};
use crate::config::OracleConfig;

/// Why a scoring call produced no usable output. Failures degrade the
/// affected case; they never abort a suite.
#[derive(Debug, thiserror::Error)]
pub enum OracleFailure {
    #[error("scoring call timed out")]
    Timeout,
    #[error("{0}")]
    Upstream(String),
    #[error("malformed scoring response: {0}")]
    MalformedResponse(String),
}

/// The model under evaluation, reduced to one call: a lead record in,
/// normalized scoring output back.
#[async_trait]
pub trait ScoringOracle: Send + Sync {
    async fn score(&self, lead: &BTreeMap<String, String>) -> Result<ScoringOutput, OracleFailure>;
}

const SYSTEM_PROMPT: &str = r#"You are an expert B2B sales AI that scores leads based on their likelihood to convert.
You analyze leads using the BANT framework (Budget, Authority, Need, Timeline) and provide detailed reasoning.

For each scoring component, provide:
1. A numerical score
2. Detailed reasoning explaining WHY you gave that score
3. Specific evidence from the lead's profile

Respond ONLY with valid JSON in this exact format:
{
    "score": <number 0-100>,
    "breakdown": {
        "authority": {"score": <number 0-30>, "reasoning": "<detailed explanation>"},
        "company_fit": {"score": <number 0-30>, "reasoning": "<detailed explanation>"},
        "source_quality": {"score": <number 0-20>, "reasoning": "<detailed explanation>"},
        "engagement_potential": {"score": <number 0-20>, "reasoning": "<detailed explanation>"}
    },
    "priority_level": "<hot|warm|cold>",
    "key_insights": ["<specific actionable insight 1>", "<specific actionable insight 2>"],
    "recommended_action": "<specific next step with reasoning>",
    "estimated_deal_size": "<small|medium|large|enterprise>",
    "red_flags": ["<potential concern 1>", "<potential concern 2>"],
    "strengths": ["<positive signal 1>", "<positive signal 2>"]
}"#;

/// Scoring oracle backed by an OpenAI-compatible chat-completions endpoint.
pub struct GrokScoringOracle {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl GrokScoringOracle {
    pub fn new(config: &OracleConfig) -> Result<Self, OracleFailure> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| OracleFailure::Upstream("GROK_API_KEY is not configured".to_string()))?;
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| OracleFailure::Upstream(format!("failed to build http client: {err}")))?;
        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key,
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl ScoringOracle for GrokScoringOracle {
    async fn score(&self, lead: &BTreeMap<String, String>) -> Result<ScoringOutput, OracleFailure> {
        let request = serde_json::json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": build_scoring_prompt(lead) },
            ],
            "temperature": 0.3,
            "max_tokens": 1500,
        });

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    OracleFailure::Timeout
                } else {
                    OracleFailure::Upstream(format!("scoring request failed: {err}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(OracleFailure::Upstream(format!(
                "scoring endpoint returned {status}"
            )));
        }

        let envelope: Value = response.json().await.map_err(|err| {
            OracleFailure::MalformedResponse(format!("invalid response body: {err}"))
        })?;

        let content = envelope
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                OracleFailure::MalformedResponse("response carried no message content".to_string())
            })?;

        parse_scoring_output(content)
    }
}

fn field_or<'a>(lead: &'a BTreeMap<String, String>, key: &str, default: &'a str) -> &'a str {
    lead.get(key)
        .map(String::as_str)
        .filter(|value| !value.trim().is_empty())
        .unwrap_or(default)
}

pub(crate) fn build_scoring_prompt(lead: &BTreeMap<String, String>) -> String {
    format!(
        r#"Analyze this B2B sales lead and provide a comprehensive score with DETAILED REASONING:

Lead Information:
- Name: {name}
- Job Title: {title}
- Company: {company}
- Company Size: {company_size}
- Industry: {industry}
- Source: {source}
- Email: {email}
- Phone: {phone}
- Notes: {notes}

Context about our product:
- We sell B2B SaaS solutions (API infrastructure, developer tools)
- Ideal customer: Mid-market to enterprise companies (50+ employees)
- Best fit: Engineering leaders, CTOs, VPs at tech companies
- High-intent sources: Referrals, LinkedIn, direct website inquiries
- Average deal size: $50k-$500k annually

For each scoring component (authority, company_fit, source_quality, engagement_potential):
1. Assign a score based on the lead's profile
2. Explain in detail WHY you gave that score
3. Cite specific evidence from the lead's information
4. Note any red flags or concerns
5. Highlight strengths that indicate high conversion potential

Be specific and actionable in your reasoning."#,
        name = field_or(lead, "name", "Not provided"),
        title = field_or(lead, "title", "Not provided"),
        company = field_or(lead, "company", "Not provided"),
        company_size = field_or(lead, "company_size", "Not provided"),
        industry = field_or(lead, "industry", "Not provided"),
        source = field_or(lead, "source", "Not provided"),
        email = field_or(lead, "email", "Not provided"),
        phone = field_or(lead, "phone", "Not provided"),
        notes = field_or(lead, "notes", "None"),
    )
}

/// Models wrap their JSON in markdown fences often enough to handle it here.
pub(crate) fn strip_code_fences(content: &str) -> &str {
    if let Some((_, rest)) = content.split_once("```json") {
        if let Some((inner, _)) = rest.split_once("```") {
            return inner.trim();
        }
        return rest.trim();
    }
    if let Some((_, rest)) = content.split_once("```") {
        if let Some((inner, _)) = rest.split_once("```") {
            return inner.trim();
        }
        return rest.trim();
    }
    content.trim()
}

pub(crate) fn parse_scoring_output(content: &str) -> Result<ScoringOutput, OracleFailure> {
    let raw: Value = serde_json::from_str(strip_code_fences(content))
        .map_err(|err| OracleFailure::MalformedResponse(err.to_string()))?;
    Ok(normalize_scoring_json(&raw))
}

/// Map the model's response shape onto [`ScoringOutput`]. Both the canonical
/// field names and the aliases the prompt schema uses are accepted; labels
/// outside the closed vocabularies come back as missing fields.
pub(crate) fn normalize_scoring_json(raw: &Value) -> ScoringOutput {
    let mut output = ScoringOutput {
        overall_score: field(raw, &["overall_score", "score"]).and_then(Value::as_f64),
        priority: field(raw, &["priority", "priority_level"])
            .and_then(Value::as_str)
            .and_then(Priority::from_label),
        deal_size: field(raw, &["deal_size", "estimated_deal_size"])
            .and_then(Value::as_str)
            .and_then(DealSize::from_label),
        insights: string_list(field(raw, &["insights", "key_insights"])),
        red_flags: string_list(raw.get("red_flags")),
        recommended_action: raw
            .get("recommended_action")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|action| !action.is_empty())
            .map(str::to_string),
        ..ScoringOutput::default()
    };

    if let Some(breakdown) = raw.get("breakdown").and_then(Value::as_object) {
        for component in BantComponent::ordered() {
            let Some(entry) = breakdown.get(component.label()) else {
                continue;
            };
            // Components arrive either as a bare number or as an object
            // with a "score" field and free-form reasoning.
            let score = entry
                .as_f64()
                .or_else(|| entry.get("score").and_then(Value::as_f64));
            if let Some(score) = score {
                output.bant_scores.insert(component, score);
            }
        }
    }

    output
}

fn field<'a>(raw: &'a Value, names: &[&str]) -> Option<&'a Value> {
    names.iter().find_map(|name| raw.get(name))
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn oracle_config(uri: &str, timeout: Duration) -> OracleConfig {
        OracleConfig {
            api_url: format!("{uri}/v1/chat/completions"),
            api_key: Some("test-key".to_string()),
            model: "grok-4-latest".to_string(),
            timeout,
        }
    }

    fn lead() -> BTreeMap<String, String> {
        BTreeMap::from([
            ("name".to_string(), "Sarah Chen".to_string()),
            ("title".to_string(), "VP of Engineering".to_string()),
            ("company".to_string(), "TechCorp Inc".to_string()),
            ("email".to_string(), "sarah.chen@techcorp.com".to_string()),
            ("phone".to_string(), String::new()),
        ])
    }

    fn chat_envelope(content: &str) -> serde_json::Value {
        json!({
            "choices": [
                { "message": { "role": "assistant", "content": content } }
            ]
        })
    }

    #[test]
    fn strips_json_code_fences() {
        let fenced = "```json\n{\"score\": 85}\n```";
        assert_eq!(strip_code_fences(fenced), "{\"score\": 85}");
    }

    #[test]
    fn strips_bare_code_fences() {
        let fenced = "```\n{\"score\": 85}\n```";
        assert_eq!(strip_code_fences(fenced), "{\"score\": 85}");
    }

    #[test]
    fn leaves_unfenced_content_alone() {
        assert_eq!(strip_code_fences("  {\"score\": 85} "), "{\"score\": 85}");
    }

    #[test]
    fn tolerates_missing_closing_fence() {
        let fenced = "```json\n{\"score\": 85}";
        assert_eq!(strip_code_fences(fenced), "{\"score\": 85}");
    }

    #[test]
    fn normalizes_prompt_schema_aliases() {
        let raw = json!({
            "score": 85,
            "priority_level": "hot",
            "estimated_deal_size": "enterprise",
            "key_insights": ["Decision maker", "Budget approved"],
            "red_flags": [],
            "recommended_action": "Contact within 24 hours",
            "breakdown": {
                "authority": {"score": 28, "reasoning": "VP-level title"},
                "company_fit": 27,
                "source_quality": {"score": 15},
                "engagement_potential": {"score": 15}
            }
        });

        let output = normalize_scoring_json(&raw);
        assert_eq!(output.overall_score, Some(85.0));
        assert_eq!(output.priority, Some(Priority::Hot));
        assert_eq!(output.deal_size, Some(DealSize::Enterprise));
        assert_eq!(output.insights.len(), 2);
        assert!(output.red_flags.is_empty());
        assert_eq!(
            output.recommended_action.as_deref(),
            Some("Contact within 24 hours")
        );
        assert_eq!(output.bant_scores.get(&BantComponent::Authority), Some(&28.0));
        assert_eq!(output.bant_scores.get(&BantComponent::CompanyFit), Some(&27.0));
    }

    #[test]
    fn unknown_labels_become_missing_fields() {
        let raw = json!({
            "overall_score": 42,
            "priority": "lukewarm",
            "deal_size": "gigantic",
            "recommended_action": "   "
        });

        let output = normalize_scoring_json(&raw);
        assert_eq!(output.overall_score, Some(42.0));
        assert_eq!(output.priority, None);
        assert_eq!(output.deal_size, None);
        assert_eq!(output.recommended_action, None);
    }

    #[test]
    fn prompt_substitutes_defaults_for_blank_fields() {
        let prompt = build_scoring_prompt(&lead());
        assert!(prompt.contains("- Name: Sarah Chen"));
        assert!(prompt.contains("- Phone: Not provided"));
        assert!(prompt.contains("- Notes: None"));
    }

    #[tokio::test]
    async fn scores_a_lead_through_the_chat_endpoint() {
        let server = MockServer::start().await;
        let content = "```json\n{\"score\": 85, \"priority_level\": \"hot\", \
                       \"estimated_deal_size\": \"enterprise\", \
                       \"key_insights\": [\"Budget approved\"], \
                       \"recommended_action\": \"Schedule demo\", \
                       \"breakdown\": {\"authority\": {\"score\": 28}}}\n```";
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(json!({"model": "grok-4-latest"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_envelope(content)))
            .expect(1)
            .mount(&server)
            .await;

        let oracle = GrokScoringOracle::new(&oracle_config(&server.uri(), Duration::from_secs(5)))
            .expect("oracle should build");
        let output = oracle.score(&lead()).await.expect("scoring should succeed");

        assert_eq!(output.overall_score, Some(85.0));
        assert_eq!(output.priority, Some(Priority::Hot));
        assert_eq!(output.bant_scores.get(&BantComponent::Authority), Some(&28.0));
    }

    #[tokio::test]
    async fn upstream_error_carries_the_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let oracle = GrokScoringOracle::new(&oracle_config(&server.uri(), Duration::from_secs(5)))
            .expect("oracle should build");
        match oracle.score(&lead()).await {
            Err(OracleFailure::Upstream(message)) => assert!(message.contains("500")),
            other => panic!("expected upstream failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn slow_endpoint_maps_to_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(chat_envelope("{}"))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let oracle =
            GrokScoringOracle::new(&oracle_config(&server.uri(), Duration::from_millis(200)))
                .expect("oracle should build");
        match oracle.score(&lead()).await {
            Err(OracleFailure::Timeout) => {}
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unparseable_content_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(chat_envelope("not json at all")),
            )
            .mount(&server)
            .await;

        let oracle = GrokScoringOracle::new(&oracle_config(&server.uri(), Duration::from_secs(5)))
            .expect("oracle should build");
        match oracle.score(&lead()).await {
            Err(OracleFailure::MalformedResponse(_)) => {}
            other => panic!("expected malformed response, got {other:?}"),
        }
    }

    #[test]
    fn oracle_requires_an_api_key() {
        let mut config = oracle_config("http://localhost:9", Duration::from_secs(5));
        config.api_key = None;
        match GrokScoringOracle::new(&config) {
            Err(OracleFailure::Upstream(message)) => assert!(message.contains("GROK_API_KEY")),
            Err(other) => panic!("expected configuration failure, got {other:?}"),
            Ok(_) => panic!("expected configuration failure, got an oracle"),
        }
    }
}
