//! CSV import for metric exports.
//!
//! Expected header: `entity_id,entity_label,department,metric_name,value,period_start,period_end`.
//! Timestamps accept RFC 3339 or a bare `YYYY-MM-DD` (midnight UTC).

use super::domain::{MetricSample, ValidationError};
use super::store::MetricSampleStore;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer};
use std::io::Read;
use std::path::Path;
use tracing::info;

#[derive(Debug, thiserror::Error)]
pub enum SampleImportError {
    #[error("failed to read metric export: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid metric CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("row {row}: unrecognized timestamp {value:?}")]
    Timestamp { row: usize, value: String },
    #[error("metric export rejected: {0}")]
    Validation(#[from] ValidationError),
}

pub struct SampleImporter;

impl SampleImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Vec<MetricSample>, SampleImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Vec<MetricSample>, SampleImportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut samples = Vec::new();

        for (index, record) in csv_reader.deserialize::<SampleRow>().enumerate() {
            let row = record?;
            samples.push(row.into_sample(index + 1)?);
        }

        Ok(samples)
    }

    /// Parses `reader` and replaces the snapshot held by `store`.
    pub fn load_into<R: Read>(
        store: &mut MetricSampleStore,
        reader: R,
    ) -> Result<usize, SampleImportError> {
        let samples = Self::from_reader(reader)?;
        let count = samples.len();
        store.load(samples)?;
        info!(samples = count, "metric export imported");
        Ok(count)
    }
}

#[derive(Debug, Deserialize)]
struct SampleRow {
    entity_id: String,
    #[serde(default)]
    entity_label: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    department: Option<String>,
    metric_name: String,
    value: f64,
    period_start: String,
    period_end: String,
}

impl SampleRow {
    fn into_sample(self, row: usize) -> Result<MetricSample, SampleImportError> {
        let period_start = parse_timestamp(&self.period_start).ok_or_else(|| {
            SampleImportError::Timestamp {
                row,
                value: self.period_start.clone(),
            }
        })?;
        let period_end =
            parse_timestamp(&self.period_end).ok_or_else(|| SampleImportError::Timestamp {
                row,
                value: self.period_end.clone(),
            })?;

        let entity_label = if self.entity_label.is_empty() {
            self.entity_id.clone()
        } else {
            self.entity_label
        };

        Ok(MetricSample {
            entity_id: self.entity_id,
            entity_label,
            department: self.department,
            metric_name: self.metric_name,
            value: self.value,
            period_start,
            period_end,
        })
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
