use super::domain::{EntityMetrics, MetricCatalog, MetricSample, ScoredEntity, ValidationError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Narrowing criteria for [`MetricSampleStore::query`]. Empty criteria match everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleFilter {
    #[serde(default)]
    pub entity_ids: Option<Vec<String>>,
    #[serde(default)]
    pub metric_names: Option<Vec<String>>,
    #[serde(default)]
    pub period_start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub period_end: Option<DateTime<Utc>>,
}

impl SampleFilter {
    pub fn for_metric(metric: impl Into<String>) -> Self {
        Self {
            metric_names: Some(vec![metric.into()]),
            ..Self::default()
        }
    }

    pub fn matches(&self, sample: &MetricSample) -> bool {
        let entity_ok = self
            .entity_ids
            .as_ref()
            .map_or(true, |ids| ids.iter().any(|id| id == &sample.entity_id));
        let metric_ok = self
            .metric_names
            .as_ref()
            .map_or(true, |names| names.iter().any(|name| name == &sample.metric_name));
        let start_ok = self
            .period_start
            .map_or(true, |start| sample.period_start >= start);
        let end_ok = self.period_end.map_or(true, |end| sample.period_end <= end);

        entity_ok && metric_ok && start_ok && end_ok
    }
}

/// In-memory snapshot of the samples for the current analysis scope.
#[derive(Debug, Clone, Default)]
pub struct MetricSampleStore {
    catalog: MetricCatalog,
    samples: Vec<MetricSample>,
}

impl MetricSampleStore {
    pub fn new(catalog: MetricCatalog) -> Self {
        Self {
            catalog,
            samples: Vec::new(),
        }
    }

    pub fn catalog(&self) -> &MetricCatalog {
        &self.catalog
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Replace the snapshot. On error the previous snapshot is left untouched.
    pub fn load(&mut self, samples: Vec<MetricSample>) -> Result<(), ValidationError> {
        validate_samples(&self.catalog, &samples)?;

        let mut samples = samples;
        samples.sort_by(|a, b| {
            a.entity_id
                .cmp(&b.entity_id)
                .then_with(|| a.metric_name.cmp(&b.metric_name))
        });

        debug!(
            samples = samples.len(),
            entities = count_entities(&samples),
            "metric snapshot loaded"
        );
        self.samples = samples;
        Ok(())
    }

    /// Matching samples ordered by `(entity_id, metric_name)`. Repeatable and side-effect free.
    pub fn query<'a>(
        &'a self,
        filter: &'a SampleFilter,
    ) -> impl Iterator<Item = &'a MetricSample> + 'a {
        self.samples
            .iter()
            .filter(move |sample| filter.matches(sample))
    }

    /// Fold samples into one row per entity, averaging repeated observations of a metric.
    /// An empty `metrics` slice keeps every metric.
    pub fn entity_metrics(&self, metrics: &[String]) -> Vec<EntityMetrics> {
        let mut rows: BTreeMap<&str, (EntityMetrics, BTreeMap<&str, (f64, usize)>)> =
            BTreeMap::new();

        for sample in &self.samples {
            if !metrics.is_empty() && !metrics.contains(&sample.metric_name) {
                continue;
            }

            let (_, sums) = rows.entry(sample.entity_id.as_str()).or_insert_with(|| {
                let mut row = EntityMetrics::new(&sample.entity_id, &sample.entity_label);
                row.department = sample.department.clone();
                (row, BTreeMap::new())
            });
            let entry = sums.entry(sample.metric_name.as_str()).or_insert((0.0, 0));
            entry.0 += sample.value;
            entry.1 += 1;
        }

        rows.into_values()
            .map(|(mut row, sums)| {
                for (metric, (sum, count)) in sums {
                    row.metrics.insert(metric.to_string(), sum / count as f64);
                }
                row
            })
            .collect()
    }

    /// One score per entity for `metric`, suitable for distribution bucketing.
    pub fn scores_for(&self, metric: &str) -> Vec<ScoredEntity> {
        self.entity_metrics(&[metric.to_string()])
            .into_iter()
            .filter_map(|row| {
                row.value(metric)
                    .map(|score| ScoredEntity::new(row.entity_id, score))
            })
            .collect()
    }

    pub fn metric_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .samples
            .iter()
            .map(|sample| sample.metric_name.clone())
            .collect();
        names.sort();
        names.dedup();
        names
    }
}

fn validate_samples(
    catalog: &MetricCatalog,
    samples: &[MetricSample],
) -> Result<(), ValidationError> {
    let mut windows: HashMap<&str, (DateTime<Utc>, DateTime<Utc>)> = HashMap::new();

    for (index, sample) in samples.iter().enumerate() {
        if sample.entity_id.trim().is_empty() {
            return Err(ValidationError::MissingField {
                index,
                field: "entity_id",
            });
        }
        if sample.metric_name.trim().is_empty() {
            return Err(ValidationError::MissingField {
                index,
                field: "metric_name",
            });
        }
        if !sample.value.is_finite() {
            return Err(ValidationError::NonFiniteValue {
                entity_id: sample.entity_id.clone(),
                metric_name: sample.metric_name.clone(),
            });
        }
        if let Some(definition) = catalog.get(&sample.metric_name) {
            if !definition.contains(sample.value) {
                return Err(ValidationError::OutOfDomain {
                    entity_id: sample.entity_id.clone(),
                    metric_name: sample.metric_name.clone(),
                    value: sample.value,
                    min: definition.scale_min,
                    max: definition.scale_max,
                });
            }
        }
        if sample.period_end < sample.period_start {
            return Err(ValidationError::InvertedWindow {
                entity_id: sample.entity_id.clone(),
                metric_name: sample.metric_name.clone(),
            });
        }

        let window = windows
            .entry(sample.entity_id.as_str())
            .or_insert_with(|| sample.window());
        if *window != sample.window() {
            return Err(ValidationError::InconsistentWindow {
                entity_id: sample.entity_id.clone(),
            });
        }
    }

    Ok(())
}

fn count_entities(sorted: &[MetricSample]) -> usize {
    let mut count = 0;
    let mut previous: Option<&str> = None;
    for sample in sorted {
        if previous != Some(sample.entity_id.as_str()) {
            count += 1;
            previous = Some(sample.entity_id.as_str());
        }
    }
    count
}
