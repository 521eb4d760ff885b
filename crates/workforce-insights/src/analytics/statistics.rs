//! Aggregate statistics over metric samples.
//!
//! All functions are pure. An empty input yields a [`StatSummary`] with
//! `has_data == false` rather than an error, since "no data yet" is the common
//! case for a freshly opened dashboard view.

use super::domain::MetricSample;
use serde::{Deserialize, Serialize};

/// Immutable summary of a set of values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatSummary {
    pub count: usize,
    pub mean: Option<f64>,
    pub median: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    /// Population standard deviation.
    pub std_dev: Option<f64>,
    pub has_data: bool,
}

impl StatSummary {
    pub const fn empty() -> Self {
        Self {
            count: 0,
            mean: None,
            median: None,
            min: None,
            max: None,
            std_dev: None,
            has_data: false,
        }
    }
}

pub fn summarize(samples: &[MetricSample]) -> StatSummary {
    let values: Vec<f64> = samples.iter().map(|sample| sample.value).collect();
    summarize_values(&values)
}

pub fn summarize_values(values: &[f64]) -> StatSummary {
    if values.is_empty() {
        return StatSummary::empty();
    }

    let sorted = sorted(values);
    let mean = mean(values);

    StatSummary {
        count: values.len(),
        mean,
        median: median_of_sorted(&sorted),
        min: sorted.first().copied(),
        max: sorted.last().copied(),
        std_dev: population_std_dev(values),
        has_data: true,
    }
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Median with the averaged-middle rule for even counts.
pub fn median(values: &[f64]) -> Option<f64> {
    median_of_sorted(&sorted(values))
}

pub fn population_std_dev(values: &[f64]) -> Option<f64> {
    let mean = mean(values)?;
    let variance = values
        .iter()
        .map(|value| {
            let diff = value - mean;
            diff * diff
        })
        .sum::<f64>()
        / values.len() as f64;
    Some(variance.sqrt())
}

/// First and third quartiles, linearly interpolated between order statistics.
pub fn quartiles(values: &[f64]) -> Option<(f64, f64)> {
    let sorted = sorted(values);
    Some((
        percentile_of_sorted(&sorted, 0.25)?,
        percentile_of_sorted(&sorted, 0.75)?,
    ))
}

fn sorted(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted
}

fn median_of_sorted(sorted: &[f64]) -> Option<f64> {
    let len = sorted.len();
    if len == 0 {
        return None;
    }

    let mid = len / 2;
    if len % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

fn percentile_of_sorted(sorted: &[f64], fraction: f64) -> Option<f64> {
    let last = sorted.len().checked_sub(1)?;
    let rank = fraction * last as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * weight)
}
