use super::super::domain::{OutlierResult, OutlierType, Severity};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeverityCountEntry {
    pub severity: Severity,
    pub severity_label: &'static str,
    pub count: usize,
}

/// Dashboard header figures for one detection run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutlierSummary {
    pub total_outliers: usize,
    pub positive_outliers: usize,
    pub negative_outliers: usize,
    pub neutral_outliers: usize,
    pub critical_outliers: usize,
    pub departments_affected: usize,
    pub average_confidence: f64,
    pub severity_breakdown: Vec<SeverityCountEntry>,
}

impl OutlierSummary {
    pub fn from_results(results: &[OutlierResult]) -> Self {
        let mut by_type: HashMap<OutlierType, usize> = HashMap::new();
        let mut by_severity: HashMap<Severity, usize> = HashMap::new();
        let mut departments = BTreeSet::new();
        let mut confidence_total = 0.0;

        for result in results {
            *by_type.entry(result.outlier_type).or_default() += 1;
            *by_severity.entry(result.severity).or_default() += 1;
            if let Some(department) = result.department.as_deref() {
                departments.insert(department);
            }
            confidence_total += result.confidence_score;
        }

        let average_confidence = if results.is_empty() {
            0.0
        } else {
            confidence_total / results.len() as f64
        };

        let severity_breakdown = Severity::ordered()
            .into_iter()
            .map(|severity| SeverityCountEntry {
                severity,
                severity_label: severity.label(),
                count: by_severity.get(&severity).copied().unwrap_or_default(),
            })
            .collect();

        let count_of = |kind: OutlierType| by_type.get(&kind).copied().unwrap_or_default();

        Self {
            total_outliers: results.len(),
            positive_outliers: count_of(OutlierType::Positive),
            negative_outliers: count_of(OutlierType::Negative),
            neutral_outliers: count_of(OutlierType::Neutral),
            critical_outliers: by_severity
                .get(&Severity::Critical)
                .copied()
                .unwrap_or_default(),
            departments_affected: departments.len(),
            average_confidence,
            severity_breakdown,
        }
    }
}
