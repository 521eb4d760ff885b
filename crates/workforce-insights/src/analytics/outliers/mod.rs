//! Composite-deviation outlier detection over an entity population.
//!
//! Each selected metric gets a population baseline (z-score or IQR), every entity is
//! scored as the weighted mean of its per-metric deviations, and the composite is then
//! mapped onto a type, a severity band and a confidence. A run either returns the full
//! classified set or an [`InvalidConfigError`]; partial results are never produced.

mod config;
mod policy;
mod scoring;
mod summary;

pub use config::{
    DetectionConfig, DetectionMethod, DetectionOverrides, ExtremeMetricRule,
    DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_SENSITIVITY_THRESHOLD,
};
pub use summary::{OutlierSummary, SeverityCountEntry};

use super::domain::{EntityMetrics, InvalidConfigError, MetricCatalog, OutlierResult};
use tracing::{debug, info};

#[derive(Debug, Clone, Default)]
pub struct OutlierClassifier {
    catalog: MetricCatalog,
}

impl OutlierClassifier {
    pub fn new(catalog: MetricCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &MetricCatalog {
        &self.catalog
    }

    /// Flags and classifies the outliers of `population`.
    ///
    /// Results are ordered by absolute deviation, largest first, with ties broken by
    /// entity id so repeated runs over the same input are identical.
    pub fn detect(
        &self,
        population: &[EntityMetrics],
        config: &DetectionConfig,
    ) -> Result<Vec<OutlierResult>, InvalidConfigError> {
        config.validate()?;
        if config.method == DetectionMethod::IsolationForestProxy {
            debug!("isolation forest proxy scores with z-score baselines");
        }

        let baselines = scoring::baselines(population, config)?;
        let direction_of = |metric: &str| self.catalog.direction_of(metric);

        let mut results: Vec<OutlierResult> = population
            .iter()
            .filter_map(|entity| {
                let score = scoring::score_entity(entity, &baselines)?;
                let classification = policy::classify(&score, config, direction_of)?;
                Some(OutlierResult {
                    entity_id: entity.entity_id.clone(),
                    entity_label: entity.entity_label.clone(),
                    department: entity.department.clone(),
                    outlier_type: classification.outlier_type,
                    severity: classification.severity,
                    deviation_score: classification.deviation,
                    confidence_score: classification.confidence,
                    contributing_metrics: score.contributing,
                })
            })
            .collect();

        let flagged = results.len();
        if let Some(minimum) = config.confidence_threshold {
            results.retain(|result| result.confidence_score >= minimum);
        }

        results.sort_by(|a, b| {
            b.deviation_score
                .abs()
                .total_cmp(&a.deviation_score.abs())
                .then_with(|| a.entity_id.cmp(&b.entity_id))
        });

        info!(
            method = config.method.label(),
            population = population.len(),
            flagged,
            returned = results.len(),
            "outlier detection completed"
        );

        Ok(results)
    }
}

#[cfg(test)]
mod tests;
