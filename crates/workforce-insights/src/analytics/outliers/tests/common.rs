use crate::analytics::domain::{EntityMetrics, MetricCatalog};
use crate::analytics::outliers::{DetectionConfig, OutlierClassifier};

pub(super) fn entity(id: &str, metrics: &[(&str, f64)]) -> EntityMetrics {
    metrics
        .iter()
        .fold(EntityMetrics::new(id, id.to_uppercase()), |entity, (name, value)| {
            entity.with_metric(*name, *value)
        })
}

pub(super) fn classifier() -> OutlierClassifier {
    OutlierClassifier::new(MetricCatalog::standard())
}

/// Three employees spread evenly across the five-point scale.
pub(super) fn three_employee_population() -> Vec<EntityMetrics> {
    vec![
        entity("A", &[("performance", 5.0), ("engagement", 5.0)]),
        entity("B", &[("performance", 3.0), ("engagement", 3.0)]),
        entity("C", &[("performance", 1.0), ("engagement", 1.0)]),
    ]
}

/// Each non-average employee is extreme on exactly one of the two metrics.
pub(super) fn single_metric_spread() -> Vec<EntityMetrics> {
    vec![
        entity("a", &[("performance", 5.0), ("engagement", 3.0)]),
        entity("b", &[("performance", 3.0), ("engagement", 5.0)]),
        entity("c", &[("performance", 3.0), ("engagement", 1.0)]),
        entity("d", &[("performance", 1.0), ("engagement", 3.0)]),
        entity("e", &[("performance", 3.0), ("engagement", 3.0)]),
    ]
}

pub(super) fn unfiltered(metrics: &[&str]) -> DetectionConfig {
    DetectionConfig::for_metrics(metrics.iter().copied()).with_confidence_threshold(None)
}

pub(super) fn ids(results: &[crate::analytics::domain::OutlierResult]) -> Vec<&str> {
    results.iter().map(|result| result.entity_id.as_str()).collect()
}
