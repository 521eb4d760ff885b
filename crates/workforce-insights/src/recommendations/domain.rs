use crate::analytics::domain::OutlierResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    LowEngagement,
    PerformanceIssues,
    LowSatisfaction,
    HighPerformerRetention,
    General,
}

impl IssueType {
    pub const fn ordered() -> [Self; 5] {
        [
            Self::LowEngagement,
            Self::PerformanceIssues,
            Self::LowSatisfaction,
            Self::HighPerformerRetention,
            Self::General,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::LowEngagement => "Low Engagement",
            Self::PerformanceIssues => "Performance Issues",
            Self::LowSatisfaction => "Low Satisfaction",
            Self::HighPerformerRetention => "High Performer Retention",
            Self::General => "General Improvement",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "low_engagement" => Some(Self::LowEngagement),
            "performance_issues" => Some(Self::PerformanceIssues),
            "low_satisfaction" => Some(Self::LowSatisfaction),
            "high_performer_retention" => Some(Self::HighPerformerRetention),
            "general" => Some(Self::General),
            _ => None,
        }
    }
}

/// What a recommendation request is about: a named issue or a set of classified outliers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationSubject {
    IssueType(IssueType),
    Outliers(Vec<OutlierResult>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationRequest {
    #[serde(flatten)]
    pub subject: RecommendationSubject,
    /// Free-form narrowing such as department or period, forwarded verbatim.
    #[serde(default)]
    pub context_filters: BTreeMap<String, String>,
}

impl RecommendationRequest {
    pub fn for_issue(issue: IssueType) -> Self {
        Self {
            subject: RecommendationSubject::IssueType(issue),
            context_filters: BTreeMap::new(),
        }
    }

    pub fn for_outliers(outliers: Vec<OutlierResult>) -> Self {
        Self {
            subject: RecommendationSubject::Outliers(outliers),
            context_filters: BTreeMap::new(),
        }
    }

    pub fn with_filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context_filters.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionStep {
    pub step: String,
    #[serde(default)]
    pub timeline: String,
    #[serde(default)]
    pub responsible: String,
}

impl ActionStep {
    pub fn new(step: &str, timeline: &str, responsible: &str) -> Self {
        Self {
            step: step.to_string(),
            timeline: timeline.to_string(),
            responsible: responsible.to_string(),
        }
    }
}

/// Action-plan recommendation, either produced by the collaborator or a local stub.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationResponse {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub category: Option<String>,
    pub steps: Vec<ActionStep>,
    pub success_metrics: Vec<String>,
    #[serde(alias = "target_kpi")]
    pub target_metric: String,
    pub expected_improvement: String,
    #[serde(default)]
    pub estimated_duration: Option<String>,
    #[serde(default)]
    pub is_fallback: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyQuestion {
    pub question: String,
    #[serde(rename = "type", alias = "question_type")]
    pub question_type: String,
    #[serde(default)]
    pub options: Option<Vec<String>>,
    #[serde(default)]
    pub kpi_mapping: Option<String>,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub is_fallback: bool,
}

/// Everything that can go wrong talking to the collaborator. Never surfaced to callers
/// of the gateway; each one resolves into a flagged fallback.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GatewayFailure {
    #[error("no recommendation endpoint configured")]
    NotConfigured,
    #[error("transport error: {0}")]
    Transport(String),
    #[error("no reply within {after_ms} ms")]
    Timeout { after_ms: u64 },
    #[error("collaborator answered {status}: {body}")]
    Status { status: u16, body: String },
    #[error("reply could not be parsed: {0}")]
    Malformed(String),
    #[error("entry {index} is missing required field {field}")]
    MissingField { index: usize, field: &'static str },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_accepts_either_subject() {
        let by_issue: RecommendationRequest = serde_json::from_value(json!({
            "issue_type": "low_engagement",
            "context_filters": { "department": "Sales" }
        }))
        .expect("issue request");
        assert_eq!(
            by_issue.subject,
            RecommendationSubject::IssueType(IssueType::LowEngagement)
        );
        assert_eq!(by_issue.context_filters["department"], "Sales");

        let by_outliers: RecommendationRequest =
            serde_json::from_value(json!({ "outliers": [] })).expect("outlier request");
        assert_eq!(by_outliers.subject, RecommendationSubject::Outliers(Vec::new()));
    }

    #[test]
    fn response_accepts_target_kpi_alias() {
        let response: RecommendationResponse = serde_json::from_value(json!({
            "title": "Pulse check-ins",
            "description": "Weekly pulse surveys",
            "steps": [{ "step": "Launch survey", "timeline": "1 week", "responsible": "HR" }],
            "success_metrics": ["Response rate"],
            "target_kpi": "Engagement",
            "expected_improvement": "10%"
        }))
        .expect("parses");
        assert_eq!(response.target_metric, "Engagement");
        assert!(!response.is_fallback);
    }

    #[test]
    fn issue_type_parse_is_forgiving() {
        assert_eq!(IssueType::parse("Low Engagement"), Some(IssueType::LowEngagement));
        assert_eq!(
            IssueType::parse("high-performer-retention"),
            Some(IssueType::HighPerformerRetention)
        );
        assert_eq!(IssueType::parse("burnout"), None);
    }
}
