use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// One observation of a metric for an employee or department over a measurement window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    pub entity_id: String,
    pub entity_label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    pub metric_name: String,
    pub value: f64,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
}

impl MetricSample {
    pub fn window(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        (self.period_start, self.period_end)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricDirection {
    HigherIsBetter,
    LowerIsBetter,
    Unspecified,
}

impl MetricDirection {
    pub const fn label(self) -> &'static str {
        match self {
            Self::HigherIsBetter => "Higher is better",
            Self::LowerIsBetter => "Lower is better",
            Self::Unspecified => "Unspecified",
        }
    }
}

/// Declared scale and polarity of a metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricDefinition {
    pub scale_min: f64,
    pub scale_max: f64,
    pub direction: MetricDirection,
}

impl MetricDefinition {
    pub const fn new(scale_min: f64, scale_max: f64, direction: MetricDirection) -> Self {
        Self {
            scale_min,
            scale_max,
            direction,
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.scale_min && value <= self.scale_max
    }
}

const FIVE_POINT: MetricDefinition =
    MetricDefinition::new(0.0, 5.0, MetricDirection::HigherIsBetter);
const PERCENT_HIGHER: MetricDefinition =
    MetricDefinition::new(0.0, 100.0, MetricDirection::HigherIsBetter);
const PERCENT_LOWER: MetricDefinition =
    MetricDefinition::new(0.0, 100.0, MetricDirection::LowerIsBetter);

/// Registry of known metrics. Metrics absent from the catalog have no declared domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricCatalog {
    definitions: BTreeMap<String, MetricDefinition>,
}

impl MetricCatalog {
    pub fn empty() -> Self {
        Self {
            definitions: BTreeMap::new(),
        }
    }

    /// Metrics used across the dashboard surveys and performance reviews.
    pub fn standard() -> Self {
        let mut catalog = Self::empty();
        for name in [
            "performance",
            "performance_score",
            "engagement",
            "engagement_score",
            "satisfaction",
            "satisfaction_score",
            "wellbeing",
            "wellbeing_score",
        ] {
            catalog = catalog.with_metric(name, FIVE_POINT);
        }

        catalog
            .with_metric("survey_response_rate", PERCENT_HIGHER)
            .with_metric("turnover_risk", PERCENT_LOWER)
            .with_metric("absenteeism_rate", PERCENT_LOWER)
    }

    pub fn with_metric(mut self, name: impl Into<String>, definition: MetricDefinition) -> Self {
        self.definitions.insert(name.into(), definition);
        self
    }

    pub fn get(&self, name: &str) -> Option<&MetricDefinition> {
        self.definitions.get(name)
    }

    pub fn direction_of(&self, name: &str) -> MetricDirection {
        self.get(name)
            .map(|definition| definition.direction)
            .unwrap_or(MetricDirection::Unspecified)
    }
}

impl Default for MetricCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

/// Per-entity view of the metrics selected for a detection run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityMetrics {
    pub entity_id: String,
    pub entity_label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default, deserialize_with = "finite_metrics")]
    pub metrics: BTreeMap<String, f64>,
}

impl EntityMetrics {
    pub fn new(entity_id: impl Into<String>, entity_label: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            entity_label: entity_label.into(),
            department: None,
            metrics: BTreeMap::new(),
        }
    }

    pub fn in_department(mut self, department: impl Into<String>) -> Self {
        self.department = Some(department.into());
        self
    }

    pub fn with_metric(mut self, name: impl Into<String>, value: f64) -> Self {
        if value.is_finite() {
            self.metrics.insert(name.into(), value);
        }
        self
    }

    pub fn value(&self, metric: &str) -> Option<f64> {
        self.metrics.get(metric).copied()
    }
}

/// Backend payloads carry `null` for unrecorded metrics; those are treated as absent.
fn finite_metrics<'de, D>(deserializer: D) -> Result<BTreeMap<String, f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, Option<f64>>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .filter_map(|(name, value)| value.filter(|v| v.is_finite()).map(|v| (name, v)))
        .collect())
}

/// An entity paired with the score used for distribution bucketing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredEntity {
    pub entity_id: String,
    pub score: f64,
}

impl ScoredEntity {
    pub fn new(entity_id: impl Into<String>, score: f64) -> Self {
        Self {
            entity_id: entity_id.into(),
            score,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutlierType {
    Positive,
    Negative,
    Neutral,
}

impl OutlierType {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Positive => "Positive",
            Self::Negative => "Negative",
            Self::Neutral => "Neutral",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub const fn ordered() -> [Self; 4] {
        [Self::Critical, Self::High, Self::Medium, Self::Low]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
            Self::Critical => "Critical",
        }
    }
}

/// Classified outlier produced by a single detection run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlierResult {
    pub entity_id: String,
    pub entity_label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    pub outlier_type: OutlierType,
    pub severity: Severity,
    pub deviation_score: f64,
    pub confidence_score: f64,
    pub contributing_metrics: BTreeMap<String, f64>,
}

/// Malformed or out-of-domain input samples.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("sample {index} is missing {field}")]
    MissingField { index: usize, field: &'static str },
    #[error("{metric_name} for {entity_id} is not a finite number")]
    NonFiniteValue {
        entity_id: String,
        metric_name: String,
    },
    #[error("{metric_name} for {entity_id} is {value}, outside the declared scale {min}..={max}")]
    OutOfDomain {
        entity_id: String,
        metric_name: String,
        value: f64,
        min: f64,
        max: f64,
    },
    #[error("{metric_name} for {entity_id} ends before it starts")]
    InvertedWindow {
        entity_id: String,
        metric_name: String,
    },
    #[error("samples for {entity_id} span more than one measurement window")]
    InconsistentWindow { entity_id: String },
}

/// Classifier or bucketer misconfiguration. No partial results accompany these.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InvalidConfigError {
    #[error("at least one metric must be selected for detection")]
    EmptyMetrics,
    #[error("metric {metric} has {samples} usable sample(s); at least 2 are required")]
    InsufficientData { metric: String, samples: usize },
    #[error("sensitivity threshold must be a positive number (found {0})")]
    SensitivityThreshold(f64),
    #[error("confidence threshold must lie within 0..=1 (found {0})")]
    ConfidenceThreshold(f64),
    #[error("extreme metric threshold must be a positive number (found {0})")]
    ExtremeMetricThreshold(f64),
    #[error("weight for {metric} must be a non-negative number (found {weight})")]
    NegativeWeight { metric: String, weight: f64 },
    #[error("selected metric weights sum to zero")]
    ZeroWeights,
    #[error("range table is empty")]
    EmptyRangeTable,
    #[error("range {label} has an empty or inverted span")]
    InvertedRange { label: String },
    #[error("ranges {lower} and {upper} leave a gap or overlap")]
    DiscontinuousRanges { lower: String, upper: String },
}
