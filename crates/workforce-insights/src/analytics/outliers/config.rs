use super::super::domain::InvalidConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_SENSITIVITY_THRESHOLD: f64 = 2.0;
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.7;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMethod {
    #[default]
    Zscore,
    Iqr,
    /// Placeholder for a model-based detector; scores exactly like `Zscore`.
    IsolationForestProxy,
}

impl DetectionMethod {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Zscore => "Z-Score Analysis",
            Self::Iqr => "IQR Method",
            Self::IsolationForestProxy => "Isolation Forest (z-score proxy)",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "zscore" | "z_score" | "statistical_zscore" => Some(Self::Zscore),
            "iqr" | "interquartile_range" => Some(Self::Iqr),
            "isolation_forest_proxy" | "isolation_forest" => Some(Self::IsolationForestProxy),
            _ => None,
        }
    }
}

/// Secondary flagging for entities whose composite stays under the threshold while
/// one metric alone is extreme. Such entities are reported with `Severity::Low`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ExtremeMetricRule {
    #[default]
    Disabled,
    Enabled {
        threshold: f64,
    },
}

/// Options recognized by the outlier classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionConfig {
    #[serde(default)]
    pub method: DetectionMethod,
    #[serde(default = "default_sensitivity")]
    pub sensitivity_threshold: f64,
    /// `None` disables confidence filtering.
    #[serde(default = "default_confidence")]
    pub confidence_threshold: Option<f64>,
    #[serde(default)]
    pub metrics: Vec<String>,
    /// Missing entries weigh 1.0.
    #[serde(default)]
    pub parameter_weights: BTreeMap<String, f64>,
    #[serde(default)]
    pub extreme_metric_rule: ExtremeMetricRule,
}

fn default_sensitivity() -> f64 {
    DEFAULT_SENSITIVITY_THRESHOLD
}

fn default_confidence() -> Option<f64> {
    Some(DEFAULT_CONFIDENCE_THRESHOLD)
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            method: DetectionMethod::default(),
            sensitivity_threshold: DEFAULT_SENSITIVITY_THRESHOLD,
            confidence_threshold: Some(DEFAULT_CONFIDENCE_THRESHOLD),
            metrics: Vec::new(),
            parameter_weights: BTreeMap::new(),
            extreme_metric_rule: ExtremeMetricRule::Disabled,
        }
    }
}

impl DetectionConfig {
    pub fn for_metrics<I, S>(metrics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            metrics: metrics.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_method(mut self, method: DetectionMethod) -> Self {
        self.method = method;
        self
    }

    pub fn with_sensitivity(mut self, threshold: f64) -> Self {
        self.sensitivity_threshold = threshold;
        self
    }

    pub fn with_confidence_threshold(mut self, threshold: Option<f64>) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    pub fn with_weight(mut self, metric: impl Into<String>, weight: f64) -> Self {
        self.parameter_weights.insert(metric.into(), weight);
        self
    }

    pub fn with_extreme_metric_rule(mut self, rule: ExtremeMetricRule) -> Self {
        self.extreme_metric_rule = rule;
        self
    }

    pub fn weight_for(&self, metric: &str) -> f64 {
        self.parameter_weights.get(metric).copied().unwrap_or(1.0)
    }

    /// Selected metrics in request order with duplicates removed.
    pub fn selected_metrics(&self) -> Vec<&str> {
        let mut selected: Vec<&str> = Vec::with_capacity(self.metrics.len());
        for metric in &self.metrics {
            if !selected.contains(&metric.as_str()) {
                selected.push(metric.as_str());
            }
        }
        selected
    }

    pub fn validate(&self) -> Result<(), InvalidConfigError> {
        let selected = self.selected_metrics();
        if selected.is_empty() {
            return Err(InvalidConfigError::EmptyMetrics);
        }

        if !(self.sensitivity_threshold.is_finite() && self.sensitivity_threshold > 0.0) {
            return Err(InvalidConfigError::SensitivityThreshold(
                self.sensitivity_threshold,
            ));
        }

        if let Some(threshold) = self.confidence_threshold {
            if !(0.0..=1.0).contains(&threshold) {
                return Err(InvalidConfigError::ConfidenceThreshold(threshold));
            }
        }

        if let ExtremeMetricRule::Enabled { threshold } = self.extreme_metric_rule {
            if !(threshold.is_finite() && threshold > 0.0) {
                return Err(InvalidConfigError::ExtremeMetricThreshold(threshold));
            }
        }

        let mut total_weight = 0.0;
        for metric in &selected {
            let weight = self.weight_for(metric);
            if !(weight.is_finite() && weight >= 0.0) {
                return Err(InvalidConfigError::NegativeWeight {
                    metric: metric.to_string(),
                    weight,
                });
            }
            total_weight += weight;
        }
        if total_weight <= 0.0 {
            return Err(InvalidConfigError::ZeroWeights);
        }

        Ok(())
    }
}

/// Partial configuration layered over server-side defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionOverrides {
    #[serde(default)]
    pub method: Option<DetectionMethod>,
    #[serde(default)]
    pub sensitivity_threshold: Option<f64>,
    #[serde(default)]
    pub confidence_threshold: Option<f64>,
    #[serde(default)]
    pub disable_confidence_filter: bool,
    #[serde(default)]
    pub metrics: Option<Vec<String>>,
    #[serde(default)]
    pub parameter_weights: Option<BTreeMap<String, f64>>,
    #[serde(default)]
    pub extreme_metric_rule: Option<ExtremeMetricRule>,
}

impl DetectionOverrides {
    pub fn apply(self, mut base: DetectionConfig) -> DetectionConfig {
        if let Some(method) = self.method {
            base.method = method;
        }
        if let Some(threshold) = self.sensitivity_threshold {
            base.sensitivity_threshold = threshold;
        }
        if let Some(threshold) = self.confidence_threshold {
            base.confidence_threshold = Some(threshold);
        }
        if self.disable_confidence_filter {
            base.confidence_threshold = None;
        }
        if let Some(metrics) = self.metrics {
            base.metrics = metrics;
        }
        if let Some(weights) = self.parameter_weights {
            base.parameter_weights = weights;
        }
        if let Some(rule) = self.extreme_metric_rule {
            base.extreme_metric_rule = rule;
        }
        base
    }
}
