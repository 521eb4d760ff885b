//! Single-attempt bridge to the external recommendation collaborator.
//!
//! Every public call resolves to a usable list. Transport errors, timeouts, bad status
//! codes and replies that fail validation all collapse into the local templates from
//! [`super::fallback`], flagged with `is_fallback`. Retries are left to callers.

use super::domain::{
    GatewayFailure, IssueType, RecommendationRequest, RecommendationResponse,
    RecommendationSubject, SurveyQuestion,
};
use super::extract::{extract_entries, require_fields};
use super::fallback::{fallback_recommendations, fallback_survey_questions, issue_for_outliers};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

const RECOMMENDATION_FIELDS: &[&[&str]] = &[
    &["title"],
    &["description"],
    &["steps"],
    &["success_metrics"],
    &["target_metric", "target_kpi"],
    &["expected_improvement"],
];
const QUESTION_FIELDS: &[&[&str]] = &[&["question"], &["type", "question_type"]];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayRequestKind {
    ActionPlans,
    SurveyQuestions,
}

/// One outbound call: an instruction plus the structured context it refers to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GatewayRequest {
    pub kind: GatewayRequestKind,
    pub prompt: String,
    pub payload: Value,
}

/// Transport to the collaborator. Returns the raw reply body.
#[async_trait]
pub trait RecommendationProvider: Send + Sync {
    async fn send(&self, request: &GatewayRequest) -> Result<String, GatewayFailure>;
}

#[derive(Clone)]
pub struct RecommendationGateway {
    provider: Option<Arc<dyn RecommendationProvider>>,
    timeout: Duration,
}

impl std::fmt::Debug for RecommendationGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecommendationGateway")
            .field("configured", &self.provider.is_some())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl RecommendationGateway {
    pub fn new(provider: Arc<dyn RecommendationProvider>) -> Self {
        Self {
            provider: Some(provider),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// A gateway with no collaborator; every call returns the fallback.
    pub fn unconfigured() -> Self {
        Self {
            provider: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.provider.is_some()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn request_recommendations(
        &self,
        request: &RecommendationRequest,
    ) -> Vec<RecommendationResponse> {
        self.request_recommendations_within(request, self.timeout)
            .await
    }

    /// As [`Self::request_recommendations`], aborting the pending call after `timeout`.
    pub async fn request_recommendations_within(
        &self,
        request: &RecommendationRequest,
        timeout: Duration,
    ) -> Vec<RecommendationResponse> {
        let issue = match &request.subject {
            RecommendationSubject::IssueType(issue) => *issue,
            RecommendationSubject::Outliers(outliers) => issue_for_outliers(outliers),
        };
        let outbound = action_plan_request(request, issue);

        match self
            .attempt(&outbound, timeout, RECOMMENDATION_FIELDS)
            .await
            .and_then(|entries| decode::<RecommendationResponse>(entries))
        {
            Ok(mut plans) => {
                for plan in &mut plans {
                    plan.is_fallback = false;
                }
                info!(issue = issue.label(), plans = plans.len(), "recommendations received");
                plans
            }
            Err(failure) => {
                warn!(issue = issue.label(), %failure, "using fallback recommendations");
                fallback_recommendations(issue)
            }
        }
    }

    pub async fn request_survey_questions(
        &self,
        kpi_focus: &str,
        survey_type: &str,
    ) -> Vec<SurveyQuestion> {
        let outbound = GatewayRequest {
            kind: GatewayRequestKind::SurveyQuestions,
            prompt: format!(
                "Generate 8-12 unbiased {survey_type} survey questions measuring {kpi_focus}. \
                 Reply with only a JSON array of objects with question, type \
                 (likert|multiple_choice|text|rating), options, kpi_mapping and weight."
            ),
            payload: json!({ "kpi_focus": kpi_focus, "survey_type": survey_type }),
        };

        match self
            .attempt(&outbound, self.timeout, QUESTION_FIELDS)
            .await
            .and_then(|entries| decode::<SurveyQuestion>(entries))
        {
            Ok(mut questions) => {
                for question in &mut questions {
                    question.is_fallback = false;
                }
                questions
            }
            Err(failure) => {
                warn!(kpi_focus, %failure, "using fallback survey questions");
                fallback_survey_questions(kpi_focus)
            }
        }
    }

    async fn attempt(
        &self,
        request: &GatewayRequest,
        timeout: Duration,
        required: &[&'static [&'static str]],
    ) -> Result<Vec<Value>, GatewayFailure> {
        let provider = self.provider.as_ref().ok_or(GatewayFailure::NotConfigured)?;

        let body = tokio::time::timeout(timeout, provider.send(request))
            .await
            .map_err(|_| GatewayFailure::Timeout {
                after_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            })??;

        let entries = extract_entries(&body)?;
        require_fields(&entries, required)?;
        Ok(entries)
    }
}

fn action_plan_request(request: &RecommendationRequest, issue: IssueType) -> GatewayRequest {
    let outliers = match &request.subject {
        RecommendationSubject::Outliers(outliers) => outliers
            .iter()
            .map(|result| {
                json!({
                    "entity_id": result.entity_id,
                    "department": result.department,
                    "outlier_type": result.outlier_type,
                    "severity": result.severity,
                    "deviation_score": result.deviation_score,
                    "metrics": result.contributing_metrics,
                })
            })
            .collect(),
        RecommendationSubject::IssueType(_) => Vec::new(),
    };

    GatewayRequest {
        kind: GatewayRequestKind::ActionPlans,
        prompt: format!(
            "Generate 3-4 practical HR action plans addressing {}. Reply with only a JSON \
             array of objects with title, description, category, steps (step, timeline, \
             responsible), success_metrics, estimated_duration, target_kpi and \
             expected_improvement.",
            issue.label().to_lowercase()
        ),
        payload: json!({
            "issue_type": issue,
            "context_filters": request.context_filters,
            "outliers": outliers,
        }),
    }
}

/// All-or-nothing: one undecodable entry discards the whole reply.
fn decode<T: serde::de::DeserializeOwned>(entries: Vec<Value>) -> Result<Vec<T>, GatewayFailure> {
    entries
        .into_iter()
        .enumerate()
        .map(|(index, entry)| {
            serde_json::from_value(entry)
                .map_err(|err| GatewayFailure::Malformed(format!("entry {index}: {err}")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::domain::{OutlierResult, OutlierType, Severity};
    use std::sync::Mutex;

    struct CannedProvider {
        reply: String,
        seen: Mutex<Vec<GatewayRequest>>,
    }

    impl CannedProvider {
        fn new(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.to_string(),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl RecommendationProvider for CannedProvider {
        async fn send(&self, request: &GatewayRequest) -> Result<String, GatewayFailure> {
            self.seen.lock().expect("lock").push(request.clone());
            Ok(self.reply.clone())
        }
    }

    struct StalledProvider;

    #[async_trait]
    impl RecommendationProvider for StalledProvider {
        async fn send(&self, _request: &GatewayRequest) -> Result<String, GatewayFailure> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok("[]".to_string())
        }
    }

    struct FailingProvider;

    #[async_trait]
    impl RecommendationProvider for FailingProvider {
        async fn send(&self, _request: &GatewayRequest) -> Result<String, GatewayFailure> {
            Err(GatewayFailure::Transport("connection refused".to_string()))
        }
    }

    const PLAN: &str = r#"{
        "title": "Pulse check-ins",
        "description": "Weekly pulse surveys for the team",
        "category": "engagement",
        "steps": [{ "step": "Launch survey", "timeline": "1 week", "responsible": "HR" }],
        "success_metrics": ["Response rate"],
        "target_kpi": "Engagement",
        "expected_improvement": "10%",
        "is_fallback": true
    }"#;

    fn negative_performance_outlier() -> OutlierResult {
        OutlierResult {
            entity_id: "emp-7".to_string(),
            entity_label: "Riley".to_string(),
            department: Some("Support".to_string()),
            outlier_type: OutlierType::Negative,
            severity: Severity::High,
            deviation_score: -2.4,
            confidence_score: 0.8,
            contributing_metrics: [("performance".to_string(), 1.8)].into_iter().collect(),
        }
    }

    #[tokio::test]
    async fn valid_reply_is_returned_unflagged() {
        let provider = CannedProvider::new(&format!("Here you go:\n[{PLAN}]"));
        let gateway = RecommendationGateway::new(provider.clone());

        let plans = gateway
            .request_recommendations(&RecommendationRequest::for_issue(IssueType::LowEngagement))
            .await;

        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].title, "Pulse check-ins");
        assert!(!plans[0].is_fallback);
        let seen = provider.seen.lock().expect("lock");
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].payload["issue_type"], "low_engagement");
    }

    #[tokio::test]
    async fn simulated_timeout_yields_flagged_fallback() {
        let gateway = RecommendationGateway::new(Arc::new(StalledProvider));

        let plans = gateway
            .request_recommendations_within(
                &RecommendationRequest::for_issue(IssueType::PerformanceIssues),
                Duration::from_millis(20),
            )
            .await;

        assert!(!plans.is_empty());
        assert!(plans.iter().all(|plan| plan.is_fallback));
        assert_eq!(plans[0].title, "Performance Improvement Plan");
    }

    #[tokio::test]
    async fn transport_failure_and_missing_endpoint_fall_back() {
        let request = RecommendationRequest::for_issue(IssueType::LowSatisfaction);

        let failing = RecommendationGateway::new(Arc::new(FailingProvider));
        assert!(failing
            .request_recommendations(&request)
            .await
            .iter()
            .all(|plan| plan.is_fallback));

        let unconfigured = RecommendationGateway::unconfigured();
        assert!(!unconfigured.is_configured());
        assert!(unconfigured
            .request_recommendations(&request)
            .await
            .iter()
            .all(|plan| plan.is_fallback));
    }

    #[tokio::test]
    async fn one_incomplete_entry_discards_the_whole_reply() {
        let reply = format!(r#"[{PLAN}, {{ "title": "Half a plan" }}]"#);
        let gateway = RecommendationGateway::new(CannedProvider::new(&reply));

        let plans = gateway
            .request_recommendations(&RecommendationRequest::for_issue(IssueType::LowEngagement))
            .await;

        assert!(plans.iter().all(|plan| plan.is_fallback));
        assert_eq!(plans[0].title, "Team Building Workshop");
    }

    #[tokio::test]
    async fn outlier_requests_forward_context_and_derive_the_issue() {
        let provider = CannedProvider::new("not json at all");
        let gateway = RecommendationGateway::new(provider.clone());
        let request = RecommendationRequest::for_outliers(vec![negative_performance_outlier()])
            .with_filter("department", "Support");

        let plans = gateway.request_recommendations(&request).await;

        assert_eq!(plans[0].title, "Performance Improvement Plan");
        assert!(plans[0].is_fallback);
        let seen = provider.seen.lock().expect("lock");
        assert_eq!(seen[0].payload["context_filters"]["department"], "Support");
        assert_eq!(seen[0].payload["outliers"][0]["entity_id"], "emp-7");
    }

    #[tokio::test]
    async fn survey_questions_validate_and_fall_back() {
        let reply = r#"[{ "question": "I feel valued at work", "type": "likert",
                          "options": ["Disagree", "Agree"], "kpi_mapping": "Engagement" }]"#;
        let gateway = RecommendationGateway::new(CannedProvider::new(reply));
        let questions = gateway
            .request_survey_questions("Engagement", "pulse")
            .await;
        assert_eq!(questions.len(), 1);
        assert!(!questions[0].is_fallback);

        let gateway = RecommendationGateway::new(CannedProvider::new(r#"[{ "question": "?" }]"#));
        let questions = gateway
            .request_survey_questions("Engagement", "pulse")
            .await;
        assert!(questions[0].is_fallback);
        assert_eq!(questions[0].question_type, "likert");
    }
}
