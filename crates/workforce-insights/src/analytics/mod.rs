//! Metric aggregation, bucketing, and outlier classification.
//!
//! Data flows one way: samples are loaded into a [`store::MetricSampleStore`], summarized
//! by [`statistics`], then either bucketed by [`distribution`] or classified by
//! [`outliers::OutlierClassifier`]. [`report::AnalysisReport`] strings those together.
//! [`heatmap`] and [`kpi`] feed the dashboard overview.

pub mod distribution;
pub mod domain;
pub mod heatmap;
pub mod import;
pub mod kpi;
pub mod outliers;
pub mod report;
pub mod statistics;
pub mod store;

pub use distribution::{bucket, BucketRange, DistributionBucket, RangeTable, UNCLASSIFIED_LABEL};
pub use domain::{
    EntityMetrics, InvalidConfigError, MetricCatalog, MetricDefinition, MetricDirection,
    MetricSample, OutlierResult, OutlierType, ScoredEntity, Severity, ValidationError,
};
pub use heatmap::{department_heatmap, DepartmentHeatmap, HeatBand, HeatmapCell, HeatmapLegend};
pub use import::{SampleImportError, SampleImporter};
pub use kpi::{
    KpiOverview, KpiReading, KpiStatus, KpiStatusCounts, KpiStatusView, KpiTrend, KpiTrendCounts,
};
pub use outliers::{
    DetectionConfig, DetectionMethod, DetectionOverrides, ExtremeMetricRule, OutlierClassifier,
    OutlierSummary,
};
pub use report::{AnalysisReport, ReportRequest};
pub use statistics::{summarize, StatSummary};
pub use store::{MetricSampleStore, SampleFilter};
