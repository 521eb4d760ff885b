use super::super::distribution::{self, DistributionBucket, RangeTable};
use super::super::domain::{InvalidConfigError, OutlierResult};
use super::super::outliers::{DetectionConfig, DetectionMethod, OutlierClassifier, OutlierSummary};
use super::super::statistics::{self, StatSummary};
use super::super::store::{MetricSampleStore, SampleFilter};
use super::insights::generate_insight;
use super::views::{AnalysisReportSummary, DistributionView, MetricSummaryEntry, OutlierView};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What to include in an [`AnalysisReport`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportRequest {
    pub detection: DetectionConfig,
    /// Metric bucketed into the distribution. No distribution when absent.
    #[serde(default)]
    pub score_metric: Option<String>,
    #[serde(default)]
    pub ranges: RangeTable,
}

#[derive(Debug)]
pub struct AnalysisReport {
    pub population: usize,
    pub method: DetectionMethod,
    pub metric_summaries: BTreeMap<String, StatSummary>,
    pub distribution: Option<(String, Vec<DistributionBucket>)>,
    pub outliers: Vec<OutlierResult>,
}

impl AnalysisReport {
    pub fn build(
        store: &MetricSampleStore,
        request: &ReportRequest,
    ) -> Result<Self, InvalidConfigError> {
        let classifier = OutlierClassifier::new(store.catalog().clone());
        let selected: Vec<String> = request
            .detection
            .selected_metrics()
            .into_iter()
            .map(str::to_string)
            .collect();

        let population = store.entity_metrics(&selected);
        let outliers = classifier.detect(&population, &request.detection)?;

        let distribution = match request.score_metric.as_deref() {
            Some(metric) => {
                let buckets = distribution::bucket(&store.scores_for(metric), &request.ranges)?;
                Some((metric.to_string(), buckets))
            }
            None => None,
        };

        let mut summary_metrics = selected;
        if let Some(metric) = &request.score_metric {
            if !summary_metrics.contains(metric) {
                summary_metrics.push(metric.clone());
            }
        }
        let metric_summaries = summary_metrics
            .into_iter()
            .map(|metric| {
                let filter = SampleFilter::for_metric(metric.clone());
                let samples: Vec<_> = store.query(&filter).cloned().collect();
                (metric, statistics::summarize(&samples))
            })
            .collect();

        Ok(Self {
            population: population.len(),
            method: request.detection.method,
            metric_summaries,
            distribution,
            outliers,
        })
    }

    pub fn summary(&self) -> AnalysisReportSummary {
        let metric_summaries = self
            .metric_summaries
            .iter()
            .map(|(metric_name, summary)| MetricSummaryEntry {
                metric_name: metric_name.clone(),
                summary: *summary,
            })
            .collect();

        let distribution = self
            .distribution
            .as_ref()
            .map(|(metric_name, buckets)| DistributionView {
                metric_name: metric_name.clone(),
                unclassified: buckets
                    .iter()
                    .filter(|bucket| bucket.is_unclassified())
                    .map(DistributionBucket::count)
                    .sum(),
                buckets: buckets.clone(),
            });

        let outliers = self
            .outliers
            .iter()
            .map(|result| OutlierView::new(result.clone(), generate_insight(result)))
            .collect();

        AnalysisReportSummary {
            population: self.population,
            method_label: self.method.label(),
            metric_summaries,
            distribution,
            outliers,
            outlier_summary: OutlierSummary::from_results(&self.outliers),
        }
    }
}
