use super::super::domain::{MetricDirection, OutlierType, Severity};
use super::config::{DetectionConfig, ExtremeMetricRule};
use super::scoring::EntityScore;

/// Classification of a flagged entity before it is attached to its identity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Classification {
    pub outlier_type: OutlierType,
    pub severity: Severity,
    pub deviation: f64,
    pub confidence: f64,
}

/// Severity bands at 1x, 2x and 3x the sensitivity threshold.
pub(crate) fn severity_for(deviation: f64, threshold: f64) -> Option<Severity> {
    let magnitude = deviation.abs();
    if magnitude >= 3.0 * threshold {
        Some(Severity::Critical)
    } else if magnitude >= 2.0 * threshold {
        Some(Severity::High)
    } else if magnitude >= threshold {
        Some(Severity::Medium)
    } else {
        None
    }
}

pub(crate) fn confidence_for(deviation: f64, threshold: f64) -> f64 {
    (deviation.abs() / (3.0 * threshold)).clamp(0.0, 1.0)
}

/// Direction-aware typing. Mixed or undeclared polarity is always neutral.
pub(crate) fn outlier_type_for(
    deviation: f64,
    directions: impl IntoIterator<Item = MetricDirection>,
) -> OutlierType {
    let mut directions = directions.into_iter();
    let Some(first) = directions.next() else {
        return OutlierType::Neutral;
    };
    if first == MetricDirection::Unspecified || directions.any(|direction| direction != first) {
        return OutlierType::Neutral;
    }

    let above = deviation > 0.0;
    let below = deviation < 0.0;
    match first {
        MetricDirection::HigherIsBetter if above => OutlierType::Positive,
        MetricDirection::HigherIsBetter if below => OutlierType::Negative,
        MetricDirection::LowerIsBetter if above => OutlierType::Negative,
        MetricDirection::LowerIsBetter if below => OutlierType::Positive,
        _ => OutlierType::Neutral,
    }
}

pub(crate) fn classify(
    score: &EntityScore,
    config: &DetectionConfig,
    direction_of: impl Fn(&str) -> MetricDirection,
) -> Option<Classification> {
    let threshold = config.sensitivity_threshold;

    if let Some(severity) = severity_for(score.composite, threshold) {
        let directions = config
            .selected_metrics()
            .into_iter()
            .map(&direction_of)
            .collect::<Vec<_>>();
        return Some(Classification {
            outlier_type: outlier_type_for(score.composite, directions),
            severity,
            deviation: score.composite,
            confidence: confidence_for(score.composite, threshold),
        });
    }

    let ExtremeMetricRule::Enabled {
        threshold: extreme_threshold,
    } = config.extreme_metric_rule
    else {
        return None;
    };

    let (metric, metric_deviation) = score.most_extreme()?;
    if metric_deviation.abs() < extreme_threshold {
        return None;
    }

    // Typed by the triggering metric. Confidence follows the reported composite, so it
    // stays below that of any composite-flagged entity.
    Some(Classification {
        outlier_type: outlier_type_for(metric_deviation, [direction_of(metric)]),
        severity: Severity::Low,
        deviation: score.composite,
        confidence: confidence_for(score.composite, threshold),
    })
}
