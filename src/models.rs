use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::CalculationError;

/// A single training or match entry as reported by the athlete
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionEntry {
    /// Calendar day the session took place
    pub date: NaiveDate,

    /// Session duration in minutes
    pub duration_minutes: f64,

    /// Post-session rating of perceived exertion (conventionally 0-10)
    pub rpe_post: f64,
}

impl SessionEntry {
    /// Create a validated session entry
    ///
    /// Negative or non-finite inputs are rejected here so they never reach
    /// the rolling averages downstream.
    pub fn new(
        date: NaiveDate,
        duration_minutes: f64,
        rpe_post: f64,
    ) -> Result<Self, CalculationError> {
        ensure_non_negative("session_load", "duration_minutes", duration_minutes)?;
        ensure_non_negative("session_load", "rpe_post", rpe_post)?;

        Ok(SessionEntry {
            date,
            duration_minutes,
            rpe_post,
        })
    }
}

/// Total session load for one athlete on one day
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyLoad {
    /// Calendar day
    pub date: NaiveDate,

    /// Summed session load (duration x RPE) for the day
    pub load: f64,
}

impl DailyLoad {
    /// Create a validated daily load
    pub fn new(date: NaiveDate, load: f64) -> Result<Self, CalculationError> {
        ensure_non_negative("daily_load", "load", load)?;
        Ok(DailyLoad { date, load })
    }
}

/// Acute:chronic workload ratio for one day
///
/// `ratio` is `None` when there is not enough history, never zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AcwrPoint {
    pub date: NaiveDate,
    pub ratio: Option<f64>,
}

/// Weekly value keyed by the Monday that starts the ISO week
///
/// Used for both Monotony and Strain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeeklyPoint {
    pub week_start: NaiveDate,
    pub value: Option<f64>,
}

/// The wellness metrics the readiness and outlier rules know about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WellnessMetric {
    /// Heart rate variability (RMSSD) in milliseconds
    HrvMs,
    /// Morning resting heart rate
    RestingHrBpm,
    /// Self-reported sleep quality
    SleepQuality,
    /// Self-reported muscle soreness
    Soreness,
    /// Self-reported stress
    Stress,
    /// Self-reported mood
    Mood,
    /// Morning body weight
    BodyWeightKg,
}

impl WellnessMetric {
    /// All known metrics in readiness order
    pub const ALL: [WellnessMetric; 7] = [
        WellnessMetric::HrvMs,
        WellnessMetric::RestingHrBpm,
        WellnessMetric::SleepQuality,
        WellnessMetric::Soreness,
        WellnessMetric::Stress,
        WellnessMetric::Mood,
        WellnessMetric::BodyWeightKg,
    ];

    /// Name used in wellness samples and baseline maps
    pub fn as_str(&self) -> &'static str {
        match self {
            WellnessMetric::HrvMs => "hrv_ms",
            WellnessMetric::RestingHrBpm => "resting_hr_bpm",
            WellnessMetric::SleepQuality => "sleep_quality",
            WellnessMetric::Soreness => "soreness",
            WellnessMetric::Stress => "stress",
            WellnessMetric::Mood => "mood",
            WellnessMetric::BodyWeightKg => "body_weight_kg",
        }
    }

    /// True when a lower reading means the athlete is better recovered
    pub fn lower_is_better(&self) -> bool {
        matches!(
            self,
            WellnessMetric::RestingHrBpm
                | WellnessMetric::Soreness
                | WellnessMetric::Stress
                | WellnessMetric::BodyWeightKg
        )
    }
}

impl fmt::Display for WellnessMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WellnessMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WellnessMetric::ALL
            .iter()
            .copied()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| format!("Unknown wellness metric: {}", s))
    }
}

/// One named wellness measurement for one day
///
/// Metric names are free-form; only the names in [`WellnessMetric`] feed
/// readiness and outlier detection, but every name gets a baseline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WellnessSample {
    pub date: NaiveDate,
    pub metric: String,
    pub value: f64,
}

impl WellnessSample {
    /// Create a validated wellness sample
    pub fn new(
        date: NaiveDate,
        metric: impl Into<String>,
        value: f64,
    ) -> Result<Self, CalculationError> {
        let metric = metric.into();
        if !value.is_finite() {
            return Err(CalculationError::NonFinite {
                calculation: "wellness_sample".to_string(),
                field: metric,
            });
        }

        Ok(WellnessSample {
            date,
            metric,
            value,
        })
    }
}

/// Trailing-window mean and sample standard deviation for one metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineStat {
    pub metric: String,
    pub mean: f64,
    /// Sample standard deviation (n-1), 0.0 when fewer than two samples
    pub std: f64,
}

/// Baselines keyed by metric name
pub type BaselineMap = BTreeMap<String, BaselineStat>;

/// Per-day wellness readings keyed by metric name
pub type DailyWellness = BTreeMap<NaiveDate, BTreeMap<String, f64>>;

/// Composite readiness for one day
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReadinessScore {
    pub date: NaiveDate,
    /// 0-100, `None` when no metric had a usable baseline
    pub value: Option<f64>,
}

/// Group flat wellness samples into per-day metric maps
///
/// When the same metric appears twice on one day the later sample wins.
pub fn group_wellness_by_date(samples: &[WellnessSample]) -> DailyWellness {
    let mut by_date = DailyWellness::new();

    for sample in samples {
        by_date
            .entry(sample.date)
            .or_default()
            .insert(sample.metric.clone(), sample.value);
    }

    by_date
}

fn ensure_non_negative(
    calculation: &str,
    field: &str,
    value: f64,
) -> Result<(), CalculationError> {
    if !value.is_finite() {
        return Err(CalculationError::NonFinite {
            calculation: calculation.to_string(),
            field: field.to_string(),
        });
    }

    if value < 0.0 {
        return Err(CalculationError::InvalidParameter {
            calculation: calculation.to_string(),
            parameter: field.to_string(),
            value: value.to_string(),
        });
    }

    Ok(())
}
