//! Decision report model and decoding.
//!
//! Model output is decoded tolerantly: code fences and any prose around
//! the outermost JSON object are ignored, scalar fields accept numbers,
//! and list fields accept a single string. The decoded report must still
//! pass [`DecisionReport::validate`] before it is sent.

use crate::context::ContextWindow;
use chrono::{DateTime, Utc};
use govbrief_core::{AppError, AppResult};
use serde::{Deserialize, Deserializer, Serialize};

/// Strings, numbers and booleans as text; null as empty.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    })
}

/// Optional text; lists are joined with "; ".
fn lenient_optional<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Array(items) => Some(
            items
                .into_iter()
                .map(|item| match item {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join("; "),
        ),
        other => Some(other.to_string()),
    })
}

/// A list of strings, or one string taken as a single item.
fn string_or_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<serde_json::Value>),
        Null(()),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) if s.trim().is_empty() => Vec::new(),
        OneOrMany::One(s) => vec![s],
        OneOrMany::Many(items) => items
            .into_iter()
            .filter_map(|item| match item {
                serde_json::Value::String(s) => Some(s),
                serde_json::Value::Null => None,
                other => Some(other.to_string()),
            })
            .collect(),
        OneOrMany::Null(()) => Vec::new(),
    })
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutiveSummary {
    #[serde(deserialize_with = "lenient_string")]
    pub recommendation: String,
    #[serde(deserialize_with = "lenient_string")]
    pub rationale: String,
    #[serde(deserialize_with = "string_or_list")]
    pub key_risks: Vec<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub expected_impact: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyOption {
    #[serde(deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub description: String,
    #[serde(deserialize_with = "string_or_list")]
    pub benefits: Vec<String>,
    #[serde(deserialize_with = "string_or_list")]
    pub risks: Vec<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub tradeoffs: String,
    #[serde(deserialize_with = "lenient_string")]
    pub cost: String,
    /// "High", "Medium" or "Low"
    #[serde(deserialize_with = "lenient_string")]
    pub impact_score: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionalImpact {
    #[serde(deserialize_with = "string_or_list")]
    pub counties_benefiting: Vec<String>,
    #[serde(deserialize_with = "string_or_list")]
    pub counties_affected: Vec<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub magnitude: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulationImpact {
    #[serde(deserialize_with = "string_or_list")]
    pub groups_affected: Vec<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub total_citizens: String,
    #[serde(deserialize_with = "lenient_string")]
    pub demographics: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImpactBreakdown {
    #[serde(deserialize_with = "lenient_string")]
    pub economic: String,
    #[serde(deserialize_with = "lenient_string")]
    pub social: String,
    pub regional: RegionalImpact,
    pub population: PopulationImpact,
    #[serde(deserialize_with = "lenient_string")]
    pub budget: String,
    #[serde(
        deserialize_with = "lenient_optional",
        skip_serializing_if = "Option::is_none"
    )]
    pub sentiment: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskMitigation {
    #[serde(deserialize_with = "lenient_string")]
    pub risk: String,
    #[serde(deserialize_with = "lenient_string")]
    pub likelihood: String,
    #[serde(deserialize_with = "lenient_string")]
    pub impact: String,
    #[serde(deserialize_with = "lenient_string")]
    pub mitigation: String,
    #[serde(deserialize_with = "lenient_string")]
    pub owner: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NextStep {
    #[serde(deserialize_with = "lenient_string")]
    pub action: String,
    #[serde(deserialize_with = "lenient_string")]
    pub responsible: String,
    #[serde(deserialize_with = "lenient_string")]
    pub deadline: String,
    #[serde(deserialize_with = "lenient_string")]
    pub priority: String,
}

/// Request facts attached to a report after decoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub generated_at: DateTime<Utc>,
    pub question: String,
    pub documents_used: usize,
    pub news_used: usize,
    pub included_news: bool,
    pub included_sentiment: bool,
}

/// Structured decision brief.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecisionReport {
    #[serde(deserialize_with = "lenient_string")]
    pub decision_required: String,
    #[serde(deserialize_with = "lenient_string")]
    pub timeline: String,
    #[serde(deserialize_with = "lenient_string")]
    pub accountable: String,
    pub executive_summary: Option<ExecutiveSummary>,
    pub options: Vec<PolicyOption>,
    #[serde(deserialize_with = "lenient_string")]
    pub recommended_option: String,
    #[serde(deserialize_with = "lenient_string")]
    pub recommendation_rationale: String,
    pub impact_breakdown: ImpactBreakdown,
    pub risks_mitigations: Vec<RiskMitigation>,
    pub next_steps: Vec<NextStep>,
    #[serde(deserialize_with = "string_or_list")]
    pub data_sources: Vec<String>,
    #[serde(deserialize_with = "string_or_list")]
    pub assumptions: Vec<String>,
    #[serde(
        deserialize_with = "lenient_optional",
        skip_serializing_if = "Option::is_none"
    )]
    pub limitations: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ReportMetadata>,
}

impl DecisionReport {
    /// A report needs a decision statement, at least one option and an
    /// executive summary.
    pub fn validate(&self) -> AppResult<()> {
        if self.decision_required.trim().is_empty() {
            return Err(AppError::Schema("missing decision_required".to_string()));
        }
        if self.options.is_empty() {
            return Err(AppError::Schema("report has no options".to_string()));
        }
        if self.executive_summary.is_none() {
            return Err(AppError::Schema("missing executive_summary".to_string()));
        }
        Ok(())
    }

    /// Record the request facts and list every context passage's source.
    pub fn annotate(
        &mut self,
        question: &str,
        window: &ContextWindow,
        generated_at: DateTime<Utc>,
    ) {
        for passage in window.passages() {
            let entry = format!(
                "Document: {} (relevance: {:.2})",
                passage.source,
                passage.relevance()
            );
            if !self.data_sources.contains(&entry) {
                self.data_sources.push(entry);
            }
        }

        self.metadata = Some(ReportMetadata {
            generated_at,
            question: question.to_string(),
            documents_used: window.len(),
            news_used: window.news().len(),
            included_news: window.has_news(),
            included_sentiment: window.has_sentiment(),
        });
    }
}

/// The outermost `{ ... }` span, ignoring fences and prose.
fn json_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Decode and validate a report from raw model output.
///
/// # Errors
/// `AppError::Schema` when no JSON object is found, it does not decode,
/// or the decoded report is incomplete.
pub fn decode_report(text: &str) -> AppResult<DecisionReport> {
    let span = json_span(text)
        .ok_or_else(|| AppError::Schema("no JSON object in model output".to_string()))?;
    let report: DecisionReport = serde_json::from_str(span)
        .map_err(|e| AppError::Schema(format!("report did not decode: {}", e)))?;
    report.validate()?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextAssembler;
    use crate::query::Query;
    use chrono::TimeZone;
    use govbrief_evidence::Passage;

    const MINIMAL: &str = r#"{
        "decision_required": "Whether to expand community health promoters",
        "executive_summary": {"recommendation": "Expand in phases", "rationale": "Staffing gaps", "key_risks": ["Funding"], "expected_impact": "Better coverage"},
        "options": [{"name": "Phased expansion", "cost": 1200000000, "benefits": "Coverage"}]
    }"#;

    #[test]
    fn test_decode_minimal() {
        let report = decode_report(MINIMAL).unwrap();
        assert_eq!(report.options[0].cost, "1200000000");
        assert_eq!(report.options[0].benefits, vec!["Coverage"]);
        assert!(report.data_sources.is_empty());
        assert!(report.limitations.is_none());
    }

    #[test]
    fn test_decode_strips_fences_and_prose() {
        let wrapped = format!(
            "Here is the report you asked for:\n```json\n{}\n```\nLet me know if you need more.",
            MINIMAL
        );
        let report = decode_report(&wrapped).unwrap();
        assert_eq!(
            report.decision_required,
            "Whether to expand community health promoters"
        );
    }

    #[test]
    fn test_invalid_reports_are_schema_errors() {
        let cases = [
            "Sorry, I cannot produce JSON today.",
            "{ not json }",
            r#"{"decision_required": "", "options": [{}], "executive_summary": {}}"#,
            r#"{"decision_required": "x", "options": [], "executive_summary": {}}"#,
            r#"{"decision_required": "x", "options": [{}]}"#,
        ];
        for case in cases {
            let err = decode_report(case).unwrap_err();
            assert!(matches!(err, AppError::Schema(_)), "{}", case);
        }
    }

    #[test]
    fn test_null_list_fields_are_empty() {
        let text = r#"{"decision_required": "x", "options": [{"name": "a", "risks": null}],
                       "executive_summary": {"key_risks": null}, "assumptions": null}"#;
        let report = decode_report(text).unwrap();
        assert!(report.options[0].risks.is_empty());
        assert!(report.assumptions.is_empty());
    }

    #[test]
    fn test_list_limitations_are_joined() {
        let text = r#"{"decision_required": "x", "options": [{}], "executive_summary": {},
                       "limitations": ["Old census data", "No county splits"]}"#;
        let report = decode_report(text).unwrap();
        assert_eq!(
            report.limitations.as_deref(),
            Some("Old census data; No county splits")
        );
    }

    #[test]
    fn test_annotate_adds_sources_once_and_metadata() {
        let passages = vec![
            Passage::new("p1", "text", "Health Review 2024", 0.876),
            Passage::new("p2", "text", "KDHS", 0.5),
        ];
        let window = ContextAssembler::default().assemble(&passages, None, &Query::new("q"));

        let mut report = decode_report(MINIMAL).unwrap();
        report
            .data_sources
            .push("Document: KDHS (relevance: 0.50)".to_string());

        let at = Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap();
        report.annotate("Should we expand CHPs?", &window, at);

        assert_eq!(
            report.data_sources,
            vec![
                "Document: KDHS (relevance: 0.50)".to_string(),
                "Document: Health Review 2024 (relevance: 0.88)".to_string(),
            ]
        );
        let metadata = report.metadata.unwrap();
        assert_eq!(metadata.generated_at, at);
        assert_eq!(metadata.documents_used, 2);
        assert!(!metadata.included_news);
    }
}
