use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use workforce_insights::analytics::{OutlierResult, OutlierType, Severity};
use workforce_insights::recommendations::{
    fallback_recommendations, GatewayFailure, GatewayRequest, GatewayRequestKind, IssueType,
    RecommendationGateway, RecommendationProvider, RecommendationRequest,
};

struct RecordingProvider {
    reply: String,
    requests: Mutex<Vec<GatewayRequest>>,
}

impl RecordingProvider {
    fn replying(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.to_string(),
            requests: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl RecommendationProvider for RecordingProvider {
    async fn send(&self, request: &GatewayRequest) -> Result<String, GatewayFailure> {
        self.requests.lock().expect("requests lock").push(request.clone());
        Ok(self.reply.clone())
    }
}

fn disengaged(entity_id: &str) -> OutlierResult {
    let mut contributing_metrics = BTreeMap::new();
    contributing_metrics.insert("engagement_score".to_string(), 1.8);
    contributing_metrics.insert("performance_score".to_string(), 3.4);
    OutlierResult {
        entity_id: entity_id.to_string(),
        entity_label: entity_id.to_uppercase(),
        department: Some("Support".to_string()),
        outlier_type: OutlierType::Negative,
        severity: Severity::High,
        deviation_score: -2.7,
        confidence_score: 0.9,
        contributing_metrics,
    }
}

#[tokio::test]
async fn outlier_context_reaches_the_provider_and_replies_are_kept() {
    let provider = RecordingProvider::replying(
        "Here are the plans you asked for:\n[{\"title\": \"Stay interviews\", \
         \"description\": \"Talk to each flagged employee\", \"steps\": [{\"step\": \
         \"Schedule interviews\", \"timeline\": \"Week 1\", \"responsible\": \"HR\"}], \
         \"success_metrics\": [\"engagement +0.5\"], \"target_kpi\": \"engagement_score\", \
         \"expected_improvement\": \"10%\", \"is_fallback\": true}]\nGood luck!",
    );
    let gateway = RecommendationGateway::new(provider.clone());

    let request = RecommendationRequest::for_outliers(vec![disengaged("e1"), disengaged("e2")])
        .with_filter("department", "Support");
    let plans = gateway.request_recommendations(&request).await;

    assert_eq!(plans.len(), 1);
    assert_eq!(plans[0].title, "Stay interviews");
    assert_eq!(plans[0].target_metric, "engagement_score");
    assert!(!plans[0].is_fallback);

    let requests = provider.requests.lock().expect("requests lock");
    assert_eq!(requests.len(), 1);
    let sent = &requests[0];
    assert_eq!(sent.kind, GatewayRequestKind::ActionPlans);
    assert_eq!(sent.payload["issue_type"], "low_engagement");
    assert_eq!(sent.payload["context_filters"]["department"], "Support");
    assert_eq!(sent.payload["outliers"][1]["entity_id"], "e2");
}

#[tokio::test]
async fn incomplete_reply_falls_back_for_the_derived_issue() {
    let provider = RecordingProvider::replying("[{\"title\": \"Half a plan\"}]");
    let gateway = RecommendationGateway::new(provider);

    let request = RecommendationRequest::for_outliers(vec![disengaged("e1")]);
    let plans = gateway.request_recommendations(&request).await;

    assert_eq!(plans, fallback_recommendations(IssueType::LowEngagement));
    assert!(plans.iter().all(|plan| plan.is_fallback));
}

#[tokio::test]
async fn survey_questions_fall_back_without_an_endpoint() {
    let gateway = RecommendationGateway::unconfigured();
    let questions = gateway.request_survey_questions("Engagement", "pulse").await;

    assert!(!questions.is_empty());
    assert!(questions.iter().all(|question| question.is_fallback));
}
