use crate::infra::AppState;
use axum::extract::Path;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{delete, get, post, put};
use axum::{Extension, Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use workforce_insights::analytics::report::views::DistributionView;
use workforce_insights::analytics::statistics::summarize_values;
use workforce_insights::analytics::{
    bucket, department_heatmap, DepartmentHeatmap, DetectionOverrides, DistributionBucket,
    KpiOverview, KpiReading, MetricSample, OutlierClassifier, OutlierResult, OutlierSummary,
    RangeTable, SampleFilter, StatSummary,
};
use workforce_insights::error::AppError;
use workforce_insights::recommendations::{
    RecommendationRequest, RecommendationResponse, SurveyQuestion,
};

#[derive(Debug, Deserialize)]
pub(crate) struct OpenSessionRequest {
    pub(crate) user: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SummaryRequest {
    pub(crate) metric_name: String,
    #[serde(default)]
    pub(crate) entity_ids: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DistributionRequest {
    pub(crate) metric_name: String,
    #[serde(default)]
    pub(crate) ranges: Option<RangeTable>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct HeatmapRequest {
    pub(crate) metric_name: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct DetectionResponse {
    pub(crate) results: Vec<OutlierResult>,
    pub(crate) summary: OutlierSummary,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SurveyQuestionRequest {
    pub(crate) kpi_focus: String,
    #[serde(default = "default_survey_type")]
    pub(crate) survey_type: String,
}

fn default_survey_type() -> String {
    "pulse".to_string()
}

pub(crate) fn insights_router() -> Router {
    Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .route("/api/v1/sessions", post(open_session))
        .route("/api/v1/sessions/:id", delete(close_session))
        .route("/api/v1/sessions/:id/samples", put(load_samples))
        .route("/api/v1/sessions/:id/summary", post(summary_endpoint))
        .route("/api/v1/sessions/:id/distribution", post(distribution_endpoint))
        .route("/api/v1/sessions/:id/heatmap", post(heatmap_endpoint))
        .route("/api/v1/sessions/:id/outliers/detect", post(detect_endpoint))
        .route("/api/v1/kpis/status", post(kpi_status_endpoint))
        .route(
            "/api/v1/action-plans/ai/generate-recommendations",
            post(recommendations_endpoint),
        )
        .route(
            "/api/v1/surveys/ai/generate-questions",
            post(survey_questions_endpoint),
        )
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn open_session(
    Extension(state): Extension<AppState>,
    Json(payload): Json<OpenSessionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let session_id = state.sessions.open(&payload.user)?;
    Ok((StatusCode::CREATED, Json(json!({ "session_id": session_id }))))
}

pub(crate) async fn close_session(
    Extension(state): Extension<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let discarded = state.sessions.close(&id)?;
    Ok(Json(json!({ "session_id": id, "discarded_samples": discarded })))
}

pub(crate) async fn load_samples(
    Extension(state): Extension<AppState>,
    Path(id): Path<String>,
    Json(samples): Json<Vec<MetricSample>>,
) -> Result<Json<serde_json::Value>, AppError> {
    let loaded = state
        .sessions
        .with_session(&id, |session| session.load_samples(samples))??;
    Ok(Json(json!({ "session_id": id, "loaded": loaded })))
}

pub(crate) async fn summary_endpoint(
    Extension(state): Extension<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<SummaryRequest>,
) -> Result<Json<StatSummary>, AppError> {
    let filter = SampleFilter {
        entity_ids: payload.entity_ids,
        ..SampleFilter::for_metric(payload.metric_name)
    };
    let summary = state.sessions.with_session(&id, |session| {
        let values: Vec<f64> = session
            .store()
            .query(&filter)
            .map(|sample| sample.value)
            .collect();
        summarize_values(&values)
    })?;
    Ok(Json(summary))
}

pub(crate) async fn distribution_endpoint(
    Extension(state): Extension<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<DistributionRequest>,
) -> Result<Json<DistributionView>, AppError> {
    let ranges = payload.ranges.unwrap_or_default();
    let buckets = state.sessions.with_session(&id, |session| {
        bucket(&session.store().scores_for(&payload.metric_name), &ranges)
    })??;

    let unclassified = buckets
        .iter()
        .filter(|bucket| bucket.is_unclassified())
        .map(DistributionBucket::count)
        .sum();

    Ok(Json(DistributionView {
        metric_name: payload.metric_name,
        buckets,
        unclassified,
    }))
}

pub(crate) async fn heatmap_endpoint(
    Extension(state): Extension<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<HeatmapRequest>,
) -> Result<Json<DepartmentHeatmap>, AppError> {
    let heatmap = state.sessions.with_session(&id, |session| {
        department_heatmap(session.store(), &payload.metric_name)
    })?;
    Ok(Json(heatmap))
}

pub(crate) async fn detect_endpoint(
    Extension(state): Extension<AppState>,
    Path(id): Path<String>,
    Json(overrides): Json<DetectionOverrides>,
) -> Result<Json<DetectionResponse>, AppError> {
    let config = overrides.apply(state.detection_defaults.clone());
    let classifier = OutlierClassifier::new(state.sessions.catalog().clone());

    let results = state.sessions.with_session(&id, |session| {
        let population = session.store().entity_metrics(&config.metrics);
        classifier.detect(&population, &config)
    })??;

    let summary = OutlierSummary::from_results(&results);
    Ok(Json(DetectionResponse { results, summary }))
}

pub(crate) async fn kpi_status_endpoint(
    Json(readings): Json<Vec<KpiReading>>,
) -> Json<KpiOverview> {
    Json(KpiOverview::build(&readings))
}

pub(crate) async fn recommendations_endpoint(
    Extension(state): Extension<AppState>,
    Json(request): Json<RecommendationRequest>,
) -> Json<Vec<RecommendationResponse>> {
    Json(state.gateway.request_recommendations(&request).await)
}

pub(crate) async fn survey_questions_endpoint(
    Extension(state): Extension<AppState>,
    Json(request): Json<SurveyQuestionRequest>,
) -> Json<Vec<SurveyQuestion>> {
    Json(
        state
            .gateway
            .request_survey_questions(&request.kpi_focus, &request.survey_type)
            .await,
    )
}
