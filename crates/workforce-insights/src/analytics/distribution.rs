use super::domain::{InvalidConfigError, ScoredEntity};
use serde::{Deserialize, Serialize};

pub const UNCLASSIFIED_LABEL: &str = "Unclassified";

/// A named score band. `min` is inclusive; `max` is exclusive except for the top band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketRange {
    pub label: String,
    pub min: f64,
    pub max: f64,
}

impl BucketRange {
    pub fn new(label: impl Into<String>, min: f64, max: f64) -> Self {
        Self {
            label: label.into(),
            min,
            max,
        }
    }
}

/// Ordered set of bands that must tile one contiguous score domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RangeTable {
    ranges: Vec<BucketRange>,
}

impl RangeTable {
    pub fn new(ranges: Vec<BucketRange>) -> Self {
        Self { ranges }
    }

    /// Five-point rating bands used by the KPI dashboards.
    pub fn five_point() -> Self {
        Self::new(vec![
            BucketRange::new("Excellent (4.5-5.0)", 4.5, 5.0),
            BucketRange::new("Good (3.5-4.5)", 3.5, 4.5),
            BucketRange::new("Average (2.5-3.5)", 2.5, 3.5),
            BucketRange::new("Below Average (1.5-2.5)", 1.5, 2.5),
            BucketRange::new("Poor (1.0-1.5)", 1.0, 1.5),
        ])
    }

    pub fn ranges(&self) -> &[BucketRange] {
        &self.ranges
    }

    /// Checks the partition invariant and returns the upper bound of the whole domain.
    pub fn validate(&self) -> Result<f64, InvalidConfigError> {
        let mut ascending: Vec<&BucketRange> = self.ranges.iter().collect();
        if ascending.is_empty() {
            return Err(InvalidConfigError::EmptyRangeTable);
        }
        ascending.sort_by(|a, b| a.min.total_cmp(&b.min));

        for range in &ascending {
            if !(range.min.is_finite() && range.max.is_finite() && range.min < range.max) {
                return Err(InvalidConfigError::InvertedRange {
                    label: range.label.clone(),
                });
            }
        }

        for pair in ascending.windows(2) {
            if pair[0].max != pair[1].min {
                return Err(InvalidConfigError::DiscontinuousRanges {
                    lower: pair[0].label.clone(),
                    upper: pair[1].label.clone(),
                });
            }
        }

        Ok(ascending[ascending.len() - 1].max)
    }
}

impl Default for RangeTable {
    fn default() -> Self {
        Self::five_point()
    }
}

/// A band filled with the ids of the entities whose score falls inside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionBucket {
    pub label: String,
    /// `None` only for the unclassified bucket.
    pub range_min: Option<f64>,
    pub range_max: Option<f64>,
    pub members: Vec<String>,
}

impl DistributionBucket {
    pub fn count(&self) -> usize {
        self.members.len()
    }

    pub fn is_unclassified(&self) -> bool {
        self.range_min.is_none()
    }
}

/// Partition `entities` across `ranges`, in table order, followed by an
/// always-present unclassified bucket for scores outside the domain.
/// Members within each bucket are sorted by entity id.
pub fn bucket(
    entities: &[ScoredEntity],
    ranges: &RangeTable,
) -> Result<Vec<DistributionBucket>, InvalidConfigError> {
    let domain_max = ranges.validate()?;

    let mut buckets: Vec<DistributionBucket> = ranges
        .ranges()
        .iter()
        .map(|range| DistributionBucket {
            label: range.label.clone(),
            range_min: Some(range.min),
            range_max: Some(range.max),
            members: Vec::new(),
        })
        .collect();
    let mut unclassified = Vec::new();

    for entity in entities {
        let score = entity.score;
        let slot = ranges.ranges().iter().position(|range| {
            let closes_domain = range.max == domain_max && score == range.max;
            score >= range.min && (score < range.max || closes_domain)
        });

        match slot {
            Some(index) => buckets[index].members.push(entity.entity_id.clone()),
            None => unclassified.push(entity.entity_id.clone()),
        }
    }

    buckets.push(DistributionBucket {
        label: UNCLASSIFIED_LABEL.to_string(),
        range_min: None,
        range_max: None,
        members: unclassified,
    });

    for bucket in &mut buckets {
        bucket.members.sort();
    }

    Ok(buckets)
}
