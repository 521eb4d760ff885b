//! Department heatmap: one cell per department for a single metric.

use super::domain::{MetricDefinition, MetricDirection};
use super::store::MetricSampleStore;
use serde::Serialize;
use std::collections::BTreeMap;

/// Points of a lower-is-better percentage at which a department reads as fully unfavourable.
const LOWER_IS_BETTER_SPAN: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HeatBand {
    VeryLow,
    Low,
    Moderate,
    High,
    VeryHigh,
}

impl HeatBand {
    pub const fn label(self) -> &'static str {
        match self {
            Self::VeryLow => "Very Low",
            Self::Low => "Low",
            Self::Moderate => "Moderate",
            Self::High => "High",
            Self::VeryHigh => "Very High",
        }
    }

    pub fn from_intensity(intensity: f64) -> Self {
        if intensity <= 0.2 {
            Self::VeryLow
        } else if intensity <= 0.4 {
            Self::Low
        } else if intensity <= 0.6 {
            Self::Moderate
        } else if intensity <= 0.8 {
            Self::High
        } else {
            Self::VeryHigh
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatmapCell {
    pub department: String,
    /// Mean of the per-employee averages in the department.
    pub value: f64,
    pub employee_count: usize,
    /// Favourability in [0, 1]; 1 is the best end of the metric's scale.
    pub intensity: f64,
    pub band: HeatBand,
    pub band_label: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatmapLegend {
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    pub unit: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DepartmentHeatmap {
    pub metric_name: String,
    pub cells: Vec<HeatmapCell>,
    pub legend: HeatmapLegend,
}

/// Builds the heatmap for `metric`. Employees without a department are left out and
/// departments come back in name order.
pub fn department_heatmap(store: &MetricSampleStore, metric: &str) -> DepartmentHeatmap {
    let mut departments: BTreeMap<String, (f64, usize)> = BTreeMap::new();
    for row in store.entity_metrics(&[metric.to_string()]) {
        let (Some(department), Some(value)) = (row.department.clone(), row.value(metric)) else {
            continue;
        };
        let (sum, count) = departments.entry(department).or_default();
        *sum += value;
        *count += 1;
    }

    let values: Vec<(String, f64, usize)> = departments
        .into_iter()
        .map(|(department, (sum, count))| (department, sum / count as f64, count))
        .collect();

    let min_value = values.iter().map(|(_, value, _)| *value).reduce(f64::min);
    let max_value = values.iter().map(|(_, value, _)| *value).reduce(f64::max);
    let definition = store.catalog().get(metric).copied();

    let cells = values
        .into_iter()
        .map(|(department, value, employee_count)| {
            let intensity = intensity_for(value, definition, min_value, max_value);
            let band = HeatBand::from_intensity(intensity);
            HeatmapCell {
                department,
                value,
                employee_count,
                intensity,
                band,
                band_label: band.label(),
            }
        })
        .collect();

    let unit = match definition {
        Some(definition) if definition.scale_max == 100.0 => "%",
        _ => "score",
    };

    DepartmentHeatmap {
        metric_name: metric.to_string(),
        cells,
        legend: HeatmapLegend {
            min_value,
            max_value,
            unit,
        },
    }
}

fn intensity_for(
    value: f64,
    definition: Option<MetricDefinition>,
    min_value: Option<f64>,
    max_value: Option<f64>,
) -> f64 {
    match definition {
        Some(definition) if definition.direction == MetricDirection::LowerIsBetter => {
            1.0 - ((value - definition.scale_min) / LOWER_IS_BETTER_SPAN).clamp(0.0, 1.0)
        }
        Some(definition) => {
            let span = definition.scale_max - definition.scale_min;
            ((value - definition.scale_min) / span).clamp(0.0, 1.0)
        }
        // No declared scale: place departments relative to each other.
        None => match (min_value, max_value) {
            (Some(min), Some(max)) if max > min => (value - min) / (max - min),
            _ => 0.5,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::domain::{MetricCatalog, MetricSample};
    use chrono::{TimeZone, Utc};

    fn sample(entity: &str, department: Option<&str>, metric: &str, value: f64) -> MetricSample {
        MetricSample {
            entity_id: entity.to_string(),
            entity_label: entity.to_string(),
            department: department.map(str::to_string),
            metric_name: metric.to_string(),
            value,
            period_start: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            period_end: Utc.with_ymd_and_hms(2025, 3, 31, 0, 0, 0).unwrap(),
        }
    }

    fn store(samples: Vec<MetricSample>) -> MetricSampleStore {
        let mut store = MetricSampleStore::new(MetricCatalog::standard());
        store.load(samples).expect("valid samples");
        store
    }

    #[test]
    fn departments_average_their_employees_on_the_declared_scale() {
        let store = store(vec![
            sample("e1", Some("Sales"), "engagement", 4.0),
            sample("e1", Some("Sales"), "engagement", 5.0),
            sample("e2", Some("Sales"), "engagement", 3.5),
            sample("e3", Some("Support"), "engagement", 1.0),
            sample("e4", None, "engagement", 5.0),
        ]);

        let heatmap = department_heatmap(&store, "engagement");
        assert_eq!(heatmap.cells.len(), 2);

        let sales = &heatmap.cells[0];
        assert_eq!(sales.department, "Sales");
        assert_eq!(sales.employee_count, 2);
        assert!((sales.value - 4.0).abs() < 1e-12);
        assert!((sales.intensity - 0.8).abs() < 1e-12);
        assert_eq!(sales.band, HeatBand::High);

        let support = &heatmap.cells[1];
        assert_eq!(support.department, "Support");
        assert!((support.intensity - 0.2).abs() < 1e-12);
        assert_eq!(support.band_label, "Very Low");

        assert_eq!(heatmap.legend.min_value, Some(1.0));
        assert_eq!(heatmap.legend.max_value, Some(4.0));
        assert_eq!(heatmap.legend.unit, "score");
    }

    #[test]
    fn lower_is_better_percentages_saturate_at_twenty_points() {
        let store = store(vec![
            sample("e1", Some("Ops"), "turnover_risk", 5.0),
            sample("e2", Some("Field"), "turnover_risk", 35.0),
        ]);

        let heatmap = department_heatmap(&store, "turnover_risk");
        let field = &heatmap.cells[0];
        let ops = &heatmap.cells[1];
        assert_eq!(field.department, "Field");
        assert_eq!(field.intensity, 0.0);
        assert_eq!(field.band, HeatBand::VeryLow);
        assert!((ops.intensity - 0.75).abs() < 1e-12);
        assert_eq!(ops.band, HeatBand::High);
        assert_eq!(heatmap.legend.unit, "%");
    }

    #[test]
    fn undeclared_metrics_are_ranked_between_departments() {
        let store = store(vec![
            sample("e1", Some("A"), "tickets_closed", 10.0),
            sample("e2", Some("B"), "tickets_closed", 30.0),
            sample("e3", Some("C"), "tickets_closed", 20.0),
        ]);

        let intensities: Vec<f64> = department_heatmap(&store, "tickets_closed")
            .cells
            .iter()
            .map(|cell| cell.intensity)
            .collect();
        assert_eq!(intensities, vec![0.0, 1.0, 0.5]);
    }

    #[test]
    fn empty_metric_yields_no_cells_and_open_legend() {
        let store = store(vec![sample("e1", Some("A"), "performance", 3.0)]);
        let heatmap = department_heatmap(&store, "engagement");
        assert!(heatmap.cells.is_empty());
        assert_eq!(heatmap.legend.min_value, None);
        assert_eq!(heatmap.legend.max_value, None);
    }
}
