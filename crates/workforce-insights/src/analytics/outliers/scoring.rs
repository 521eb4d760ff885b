use super::super::domain::{EntityMetrics, InvalidConfigError};
use super::super::statistics::{mean, population_std_dev, quartiles};
use super::config::{DetectionConfig, DetectionMethod};
use std::collections::BTreeMap;

/// Spreads at or below this fraction of the center are treated as zero.
const DEGENERATE_SPREAD: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Baseline {
    ZScore { mean: f64, std_dev: f64 },
    Iqr { q1: f64, q3: f64 },
}

impl Baseline {
    fn degenerate(spread: f64, center: f64) -> bool {
        spread <= DEGENERATE_SPREAD * center.abs().max(1.0)
    }

    /// Signed deviation in spread units. Zero for a degenerate population.
    pub(crate) fn deviation(&self, value: f64) -> f64 {
        match *self {
            Baseline::ZScore { mean, std_dev } => {
                if Self::degenerate(std_dev, mean) {
                    0.0
                } else {
                    (value - mean) / std_dev
                }
            }
            Baseline::Iqr { q1, q3 } => {
                let iqr = q3 - q1;
                if Self::degenerate(iqr, q3) {
                    0.0
                } else if value < q1 {
                    (value - q1) / iqr
                } else if value > q3 {
                    (value - q3) / iqr
                } else {
                    0.0
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct MetricBaseline {
    pub metric: String,
    pub weight: f64,
    pub baseline: Baseline,
}

/// Population baselines for each selected metric.
pub(crate) fn baselines(
    population: &[EntityMetrics],
    config: &DetectionConfig,
) -> Result<Vec<MetricBaseline>, InvalidConfigError> {
    config
        .selected_metrics()
        .into_iter()
        .map(|metric| {
            let values: Vec<f64> = population
                .iter()
                .filter_map(|entity| entity.value(metric))
                .filter(|value| value.is_finite())
                .collect();

            let insufficient = || InvalidConfigError::InsufficientData {
                metric: metric.to_string(),
                samples: values.len(),
            };
            if values.len() < 2 {
                return Err(insufficient());
            }

            let baseline = match config.method {
                DetectionMethod::Zscore | DetectionMethod::IsolationForestProxy => {
                    Baseline::ZScore {
                        mean: mean(&values).ok_or_else(insufficient)?,
                        std_dev: population_std_dev(&values).ok_or_else(insufficient)?,
                    }
                }
                DetectionMethod::Iqr => {
                    let (q1, q3) = quartiles(&values).ok_or_else(insufficient)?;
                    Baseline::Iqr { q1, q3 }
                }
            };

            Ok(MetricBaseline {
                metric: metric.to_string(),
                weight: config.weight_for(metric),
                baseline,
            })
        })
        .collect()
}

/// Deviation profile of one entity against the population baselines.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct EntityScore {
    pub composite: f64,
    /// Per-metric deviations in baseline order.
    pub per_metric: Vec<(String, f64)>,
    pub contributing: BTreeMap<String, f64>,
}

impl EntityScore {
    /// The metric with the largest absolute deviation.
    pub(crate) fn most_extreme(&self) -> Option<(&str, f64)> {
        self.per_metric
            .iter()
            .max_by(|a, b| a.1.abs().total_cmp(&b.1.abs()))
            .map(|(metric, deviation)| (metric.as_str(), *deviation))
    }
}

/// Weighted mean of the per-metric deviations the entity has values for, with
/// weights renormalized over those metrics. `None` when nothing usable remains.
pub(crate) fn score_entity(
    entity: &EntityMetrics,
    baselines: &[MetricBaseline],
) -> Option<EntityScore> {
    let mut weighted_sum = 0.0;
    let mut weight_total = 0.0;
    let mut per_metric = Vec::with_capacity(baselines.len());
    let mut contributing = BTreeMap::new();

    for baseline in baselines {
        let Some(value) = entity.value(&baseline.metric).filter(|v| v.is_finite()) else {
            continue;
        };

        let deviation = baseline.baseline.deviation(value);
        contributing.insert(baseline.metric.clone(), value);
        per_metric.push((baseline.metric.clone(), deviation));

        weighted_sum += deviation * baseline.weight;
        weight_total += baseline.weight;
    }

    if per_metric.is_empty() || weight_total <= 0.0 {
        return None;
    }

    Some(EntityScore {
        composite: weighted_sum / weight_total,
        per_metric,
        contributing,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zscore_deviation_is_signed() {
        let baseline = Baseline::ZScore {
            mean: 3.0,
            std_dev: 2.0,
        };
        assert_eq!(baseline.deviation(5.0), 1.0);
        assert_eq!(baseline.deviation(1.0), -1.0);
    }

    #[test]
    fn iqr_deviation_is_zero_inside_the_box() {
        let baseline = Baseline::Iqr { q1: 2.0, q3: 4.0 };
        assert_eq!(baseline.deviation(3.0), 0.0);
        assert_eq!(baseline.deviation(8.0), 2.0);
        assert_eq!(baseline.deviation(0.0), -1.0);
    }

    #[test]
    fn degenerate_spread_yields_zero_deviation() {
        let baseline = Baseline::ZScore {
            mean: 0.1,
            std_dev: 1e-17,
        };
        assert_eq!(baseline.deviation(0.1 + 1e-16), 0.0);
    }
}
