use serde::{Deserialize, Serialize};

const ON_TARGET_RATIO: f64 = 0.95;
const BELOW_TARGET_RATIO: f64 = 0.80;
/// Relative change over the series beyond which a KPI counts as moving.
const TREND_THRESHOLD: f64 = 0.05;
/// Fewest measurements a trend direction is read from.
pub const MIN_TREND_POINTS: usize = 3;

/// A tracked KPI with its current reading and goal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiReading {
    pub name: String,
    #[serde(default)]
    pub current_value: Option<f64>,
    #[serde(default)]
    pub target_value: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
    /// Past measurements, oldest first.
    #[serde(default)]
    pub history: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KpiStatus {
    OnTarget,
    BelowTarget,
    Critical,
    NoData,
}

impl KpiStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::OnTarget => "On Target",
            Self::BelowTarget => "Below Target",
            Self::Critical => "Critical",
            Self::NoData => "No Data",
        }
    }

    pub fn from_ratio(ratio: Option<f64>) -> Self {
        match ratio {
            Some(ratio) if ratio >= ON_TARGET_RATIO => Self::OnTarget,
            Some(ratio) if ratio >= BELOW_TARGET_RATIO => Self::BelowTarget,
            Some(_) => Self::Critical,
            None => Self::NoData,
        }
    }
}

/// `current / target`, undefined when either side is missing, zero, or non-finite.
pub fn achievement_ratio(current: Option<f64>, target: Option<f64>) -> Option<f64> {
    let current = current.filter(|value| value.is_finite() && *value != 0.0)?;
    let target = target.filter(|value| value.is_finite() && *value != 0.0)?;
    Some(current / target)
}

impl KpiReading {
    pub fn achievement_ratio(&self) -> Option<f64> {
        achievement_ratio(self.current_value, self.target_value)
    }

    pub fn status(&self) -> KpiStatus {
        KpiStatus::from_ratio(self.achievement_ratio())
    }

    /// Progress-bar fill, capped at 100%.
    pub fn progress_pct(&self) -> Option<f64> {
        self.achievement_ratio()
            .map(|ratio| (ratio * 100.0).clamp(0.0, 100.0))
    }

    pub fn trend(&self) -> KpiTrend {
        KpiTrend::of(&self.history)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KpiStatusCounts {
    pub on_target: usize,
    pub below_target: usize,
    pub critical: usize,
    pub no_data: usize,
}

impl KpiStatusCounts {
    pub fn tally<'a>(readings: impl IntoIterator<Item = &'a KpiReading>) -> Self {
        readings
            .into_iter()
            .fold(Self::default(), |mut counts, reading| {
                match reading.status() {
                    KpiStatus::OnTarget => counts.on_target += 1,
                    KpiStatus::BelowTarget => counts.below_target += 1,
                    KpiStatus::Critical => counts.critical += 1,
                    KpiStatus::NoData => counts.no_data += 1,
                }
                counts
            })
    }
}

/// Least-squares slope over the series index, scaled to the span of the series and
/// expressed relative to the first value. Returns 0 for fewer than two values or a
/// zero first value.
pub fn trend(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 || values[0] == 0.0 {
        return 0.0;
    }

    let count = n as f64;
    let (sum_x, sum_y, sum_xy, sum_x2) = values.iter().enumerate().fold(
        (0.0, 0.0, 0.0, 0.0),
        |(sx, sy, sxy, sx2), (index, value)| {
            let x = index as f64;
            (sx + x, sy + value, sxy + x * value, sx2 + x * x)
        },
    );
    let denominator = count * sum_x2 - sum_x * sum_x;
    if denominator == 0.0 {
        return 0.0;
    }

    let slope = (count * sum_xy - sum_x * sum_y) / denominator;
    slope * (count - 1.0) / values[0]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KpiTrend {
    Up,
    Down,
    Stable,
}

impl KpiTrend {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Up => "Trending Up",
            Self::Down => "Trending Down",
            Self::Stable => "Stable",
        }
    }

    /// Direction of a chronological series; shorter series than [`MIN_TREND_POINTS`] read
    /// as stable.
    pub fn of(values: &[f64]) -> Self {
        if values.len() < MIN_TREND_POINTS {
            return Self::Stable;
        }
        let change = trend(values);
        if change > TREND_THRESHOLD {
            Self::Up
        } else if change < -TREND_THRESHOLD {
            Self::Down
        } else {
            Self::Stable
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KpiTrendCounts {
    pub trending_up: usize,
    pub trending_down: usize,
}

impl KpiTrendCounts {
    pub fn tally<'a>(histories: impl IntoIterator<Item = &'a [f64]>) -> Self {
        histories
            .into_iter()
            .fold(Self::default(), |mut counts, values| {
                match KpiTrend::of(values) {
                    KpiTrend::Up => counts.trending_up += 1,
                    KpiTrend::Down => counts.trending_down += 1,
                    KpiTrend::Stable => {}
                }
                counts
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiStatusView {
    pub name: String,
    pub current_value: Option<f64>,
    pub target_value: Option<f64>,
    pub unit: Option<String>,
    pub status: KpiStatus,
    pub status_label: &'static str,
    pub progress_pct: Option<f64>,
    pub trend: KpiTrend,
    pub trend_label: &'static str,
    /// Fitted change over the history, in percent of its first value.
    pub trend_pct: f64,
}

impl KpiStatusView {
    pub fn from_reading(reading: &KpiReading) -> Self {
        let status = reading.status();
        let trend = reading.trend();
        Self {
            name: reading.name.clone(),
            current_value: reading.current_value,
            target_value: reading.target_value,
            unit: reading.unit.clone(),
            status,
            status_label: status.label(),
            progress_pct: reading.progress_pct(),
            trend,
            trend_label: trend.label(),
            trend_pct: self::trend(&reading.history) * 100.0,
        }
    }
}

/// Per-KPI status plus the dashboard tallies.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KpiOverview {
    pub kpis: Vec<KpiStatusView>,
    pub status_counts: KpiStatusCounts,
    pub trend_counts: KpiTrendCounts,
}

impl KpiOverview {
    pub fn build(readings: &[KpiReading]) -> Self {
        Self {
            kpis: readings.iter().map(KpiStatusView::from_reading).collect(),
            status_counts: KpiStatusCounts::tally(readings),
            trend_counts: KpiTrendCounts::tally(
                readings.iter().map(|reading| reading.history.as_slice()),
            ),
        }
    }
}
