use super::super::distribution::DistributionBucket;
use super::super::domain::OutlierResult;
use super::super::outliers::OutlierSummary;
use super::super::statistics::StatSummary;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricSummaryEntry {
    pub metric_name: String,
    pub summary: StatSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionView {
    pub metric_name: String,
    pub buckets: Vec<DistributionBucket>,
    pub unclassified: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutlierView {
    #[serde(flatten)]
    pub result: OutlierResult,
    pub outlier_type_label: &'static str,
    pub severity_label: &'static str,
    pub insight: OutlierInsight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictedOutcome {
    TurnoverRisk,
    AdvancementPotential,
    Stable,
}

impl PredictedOutcome {
    pub const fn label(self) -> &'static str {
        match self {
            Self::TurnoverRisk => "High risk of turnover without intervention",
            Self::AdvancementPotential => "High potential for advancement and leadership",
            Self::Stable => "Stable performance with room for improvement",
        }
    }
}

/// Locally derived reading of one outlier, used when no collaborator analysis exists.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutlierInsight {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub risk_factors: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub strengths: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recommendations: Vec<String>,
    /// 9 urgent, 6 attention, 3 routine.
    pub intervention_priority: u8,
    pub predicted_outcome: PredictedOutcome,
    pub predicted_outcome_label: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReportSummary {
    pub population: usize,
    pub method_label: &'static str,
    pub metric_summaries: Vec<MetricSummaryEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distribution: Option<DistributionView>,
    pub outliers: Vec<OutlierView>,
    pub outlier_summary: OutlierSummary,
}

impl OutlierView {
    pub fn new(result: OutlierResult, insight: OutlierInsight) -> Self {
        Self {
            outlier_type_label: result.outlier_type.label(),
            severity_label: result.severity.label(),
            result,
            insight,
        }
    }
}
