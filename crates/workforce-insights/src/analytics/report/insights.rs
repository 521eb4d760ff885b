use super::super::domain::OutlierResult;
use super::views::{OutlierInsight, PredictedOutcome};

const RISK_BELOW: f64 = 3.0;
const STRENGTH_ABOVE: f64 = 4.5;

/// Reads either the short or the `_score` spelling of a metric.
fn reading(result: &OutlierResult, metric: &str) -> Option<f64> {
    result
        .contributing_metrics
        .get(metric)
        .or_else(|| result.contributing_metrics.get(&format!("{metric}_score")))
        .copied()
}

pub(crate) fn generate_insight(result: &OutlierResult) -> OutlierInsight {
    let mut risk_factors = Vec::new();
    let mut strengths = Vec::new();
    let mut recommendations = Vec::new();

    match reading(result, "performance") {
        Some(value) if value < RISK_BELOW => {
            risk_factors.push("Low performance score points to productivity issues".to_string());
            recommendations.push("Arrange targeted performance coaching".to_string());
        }
        Some(value) if value > STRENGTH_ABOVE => {
            strengths.push("Exceptional performance signals high potential".to_string());
            recommendations
                .push("Consider for leadership development and mentoring roles".to_string());
        }
        _ => {}
    }

    match reading(result, "engagement") {
        Some(value) if value < RISK_BELOW => {
            risk_factors.push("Low engagement suggests disengagement risk".to_string());
            recommendations.push("Hold one-on-one meetings to surface concerns".to_string());
        }
        Some(value) if value > STRENGTH_ABOVE => {
            strengths.push("High engagement shows strong commitment".to_string());
            recommendations.push("Involve as a change champion".to_string());
        }
        _ => {}
    }

    if matches!(reading(result, "satisfaction"), Some(value) if value < RISK_BELOW) {
        risk_factors.push("Low satisfaction indicates turnover risk".to_string());
        recommendations.push("Prepare a retention conversation".to_string());
    }

    let intervention_priority = match risk_factors.len() {
        0 => 3,
        1 | 2 => 6,
        _ => 9,
    };

    let predicted_outcome = if risk_factors.len() > 2 {
        PredictedOutcome::TurnoverRisk
    } else if strengths.len() > 1 {
        PredictedOutcome::AdvancementPotential
    } else {
        PredictedOutcome::Stable
    };

    OutlierInsight {
        risk_factors,
        strengths,
        recommendations,
        intervention_priority,
        predicted_outcome,
        predicted_outcome_label: predicted_outcome.label(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::domain::{OutlierType, Severity};
    use std::collections::BTreeMap;

    fn result_with(metrics: &[(&str, f64)]) -> OutlierResult {
        OutlierResult {
            entity_id: "emp-1".to_string(),
            entity_label: "Sam".to_string(),
            department: None,
            outlier_type: OutlierType::Negative,
            severity: Severity::High,
            deviation_score: -2.5,
            confidence_score: 0.9,
            contributing_metrics: metrics
                .iter()
                .map(|(name, value)| (name.to_string(), *value))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    #[test]
    fn three_risks_are_urgent() {
        let insight = generate_insight(&result_with(&[
            ("performance", 2.0),
            ("engagement_score", 2.5),
            ("satisfaction", 1.5),
        ]));
        assert_eq!(insight.risk_factors.len(), 3);
        assert_eq!(insight.intervention_priority, 9);
        assert_eq!(insight.predicted_outcome, PredictedOutcome::TurnoverRisk);
    }

    #[test]
    fn two_strengths_predict_advancement() {
        let insight = generate_insight(&result_with(&[
            ("performance_score", 4.8),
            ("engagement", 4.9),
        ]));
        assert!(insight.risk_factors.is_empty());
        assert_eq!(insight.intervention_priority, 3);
        assert_eq!(insight.predicted_outcome, PredictedOutcome::AdvancementPotential);
        assert_eq!(insight.recommendations.len(), 2);
    }

    #[test]
    fn a_single_risk_needs_attention() {
        let insight = generate_insight(&result_with(&[("performance", 2.9), ("engagement", 3.5)]));
        assert_eq!(insight.intervention_priority, 6);
        assert_eq!(insight.predicted_outcome, PredictedOutcome::Stable);
    }
}
