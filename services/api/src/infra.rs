use chrono::{TimeZone, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use workforce_insights::analytics::{DetectionConfig, DetectionMethod, MetricSample};
use workforce_insights::recommendations::{IssueType, RecommendationGateway};
use workforce_insights::session::SessionRegistry;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) sessions: Arc<SessionRegistry>,
    pub(crate) gateway: RecommendationGateway,
    /// Server-side defaults; request bodies layer overrides on top.
    pub(crate) detection_defaults: DetectionConfig,
}

pub(crate) fn parse_method(raw: &str) -> Result<DetectionMethod, String> {
    DetectionMethod::parse(raw).ok_or_else(|| {
        format!("unknown detection method '{raw}' (zscore, iqr, isolation_forest_proxy)")
    })
}

pub(crate) fn parse_issue(raw: &str) -> Result<IssueType, String> {
    IssueType::parse(raw).ok_or_else(|| format!("unknown issue type '{raw}'"))
}

pub(crate) fn parse_metric_list(raw: &str) -> Result<Vec<String>, String> {
    let metrics: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect();
    if metrics.is_empty() {
        return Err("at least one metric name is required".to_string());
    }
    Ok(metrics)
}

/// `(id, label, department, performance, engagement, satisfaction)`
const DEMO_EMPLOYEES: [(&str, &str, &str, f64, f64, f64); 10] = [
    ("emp-01", "Avery Brooks", "Sales", 3.8, 3.9, 4.0),
    ("emp-02", "Blake Chen", "Sales", 3.6, 3.7, 3.5),
    ("emp-03", "Casey Diaz", "Sales", 4.9, 4.8, 4.7),
    ("emp-04", "Devon Ellis", "Support", 3.4, 3.5, 3.6),
    ("emp-05", "Emery Flores", "Support", 1.4, 1.6, 1.8),
    ("emp-06", "Finley Grant", "Support", 3.7, 3.3, 3.5),
    ("emp-07", "Harper Ito", "Engineering", 3.9, 4.1, 3.8),
    ("emp-08", "Jordan Kim", "Engineering", 3.5, 3.6, 3.9),
    ("emp-09", "Kendall Lopez", "Engineering", 4.0, 3.8, 3.7),
    ("emp-10", "Logan Moore", "Engineering", 3.3, 3.4, 3.2),
];

/// One quarter of synthetic five-point ratings.
pub(crate) fn demo_samples() -> Vec<MetricSample> {
    let period_start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).single();
    let period_end = Utc.with_ymd_and_hms(2025, 3, 31, 0, 0, 0).single();
    let (Some(period_start), Some(period_end)) = (period_start, period_end) else {
        return Vec::new();
    };

    DEMO_EMPLOYEES
        .iter()
        .flat_map(|(id, label, department, performance, engagement, satisfaction)| {
            [
                ("performance", *performance),
                ("engagement", *engagement),
                ("satisfaction", *satisfaction),
            ]
            .into_iter()
            .map(move |(metric_name, value)| MetricSample {
                entity_id: id.to_string(),
                entity_label: label.to_string(),
                department: Some(department.to_string()),
                metric_name: metric_name.to_string(),
                value,
                period_start,
                period_end,
            })
        })
        .collect()
}
