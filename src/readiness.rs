//! Composite Readiness Index
//!
//! Each wellness metric is turned into a z-score against its trailing
//! baseline, signed so that positive always means "more ready", weighted,
//! and mapped onto a 0-100 scale centred at 50.
//!
//! | Metric           | Weight | Direction                 |
//! |------------------|--------|---------------------------|
//! | `hrv_ms`         | 0.20   | higher is better          |
//! | `resting_hr_bpm` | 0.15   | lower is better           |
//! | `sleep_quality`  | 0.20   | higher is better          |
//! | `soreness`       | 0.15   | lower is better           |
//! | `stress`         | 0.15   | lower is better           |
//! | `mood`           | 0.10   | higher is better          |
//! | `body_weight_kg` | 0.05   | lower is better, halved   |
//!
//! Missing metrics drop out of both numerator and denominator, so partial
//! data is not penalised.

use crate::baseline::{BaselineConfig, BaselineEstimator};
use crate::error::CalculationError;
use crate::models::{
    group_wellness_by_date, BaselineMap, ReadinessScore, WellnessMetric, WellnessSample,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Per-metric readiness weights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadinessWeights {
    pub hrv_ms: f64,
    pub resting_hr_bpm: f64,
    pub sleep_quality: f64,
    pub soreness: f64,
    pub stress: f64,
    pub mood: f64,
    pub body_weight_kg: f64,
}

impl Default for ReadinessWeights {
    fn default() -> Self {
        ReadinessWeights {
            hrv_ms: 0.20,
            resting_hr_bpm: 0.15,
            sleep_quality: 0.20,
            soreness: 0.15,
            stress: 0.15,
            mood: 0.10,
            body_weight_kg: 0.05,
        }
    }
}

impl ReadinessWeights {
    pub fn weight(&self, metric: WellnessMetric) -> f64 {
        match metric {
            WellnessMetric::HrvMs => self.hrv_ms,
            WellnessMetric::RestingHrBpm => self.resting_hr_bpm,
            WellnessMetric::SleepQuality => self.sleep_quality,
            WellnessMetric::Soreness => self.soreness,
            WellnessMetric::Stress => self.stress,
            WellnessMetric::Mood => self.mood,
            WellnessMetric::BodyWeightKg => self.body_weight_kg,
        }
    }

    pub fn total(&self) -> f64 {
        WellnessMetric::ALL.iter().map(|m| self.weight(*m)).sum()
    }
}

/// Readiness scoring configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadinessConfig {
    pub weights: ReadinessWeights,

    /// Score for an athlete exactly at baseline (default: 50)
    pub center: f64,

    /// Points per unit of weighted z-score (default: 16.67, maps +/-3 onto 0-100)
    pub scale: f64,

    /// Multiplier applied to the body weight signal (default: 0.5)
    pub body_weight_damping: f64,

    /// Baseline window used when scoring a series of days
    pub baseline: BaselineConfig,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        ReadinessConfig {
            weights: ReadinessWeights::default(),
            center: 50.0,
            scale: 16.67,
            body_weight_damping: 0.5,
            baseline: BaselineConfig::default(),
        }
    }
}

/// Readiness Index composer
pub struct ReadinessComposer {
    config: ReadinessConfig,
}

impl ReadinessComposer {
    pub fn new() -> Self {
        ReadinessComposer {
            config: ReadinessConfig::default(),
        }
    }

    pub fn with_config(config: ReadinessConfig) -> Self {
        ReadinessComposer { config }
    }

    /// Readiness-signed z-score of one metric, `None` when it cannot be scored
    fn signed_z(
        &self,
        metric: WellnessMetric,
        today: &BTreeMap<String, f64>,
        baselines: &BaselineMap,
    ) -> Option<f64> {
        let value = *today.get(metric.as_str())?;
        let z = baselines.get(metric.as_str())?.z_score(value)?;

        let signed = if metric.lower_is_better() { -z } else { z };
        Some(match metric {
            WellnessMetric::BodyWeightKg => signed * self.config.body_weight_damping,
            _ => signed,
        })
    }

    /// Score one day's readings against precomputed baselines
    pub fn compute_index(
        &self,
        today: &BTreeMap<String, f64>,
        baselines: &BaselineMap,
    ) -> Option<f64> {
        let mut weighted_sum = 0.0;
        let mut weight_total = 0.0;

        for metric in WellnessMetric::ALL {
            if let Some(z) = self.signed_z(metric, today, baselines) {
                let weight = self.config.weights.weight(metric);
                weighted_sum += weight * z;
                weight_total += weight;
            }
        }

        if weight_total <= 0.0 {
            return None;
        }

        let average_z = weighted_sum / weight_total;
        if !average_z.is_finite() {
            return None;
        }
        Some((self.config.center + average_z * self.config.scale).clamp(0.0, 100.0))
    }

    /// Score every day in `[from, to]`
    ///
    /// Each day is scored against its own trailing baseline. Days without
    /// readings, or without any scorable metric, get `None`.
    pub fn compute_series(
        &self,
        samples: &[WellnessSample],
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<ReadinessScore>, CalculationError> {
        if from > to {
            return Err(CalculationError::InvalidDateRange { from, to });
        }

        let estimator = BaselineEstimator::with_config(self.config.baseline.clone());
        let by_date = group_wellness_by_date(samples);

        let series: Vec<ReadinessScore> = from
            .iter_days()
            .take_while(|date| *date <= to)
            .map(|date| {
                let value = by_date.get(&date).and_then(|today| {
                    let baselines = estimator.compute(samples, date);
                    self.compute_index(today, &baselines)
                });
                ReadinessScore { date, value }
            })
            .collect();

        debug!(
            days = series.len(),
            scored = series.iter().filter(|s| s.value.is_some()).count(),
            "Computed readiness series"
        );

        Ok(series)
    }
}

impl Default for ReadinessComposer {
    fn default() -> Self {
        Self::new()
    }
}

/// Readiness Index with default weights and scale
pub fn compute_readiness_index(
    today: &BTreeMap<String, f64>,
    baselines: &BaselineMap,
) -> Option<f64> {
    ReadinessComposer::new().compute_index(today, baselines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BaselineStat;

    fn baselines(stats: &[(WellnessMetric, f64, f64)]) -> BaselineMap {
        stats
            .iter()
            .map(|(metric, mean, std)| {
                (
                    metric.as_str().to_string(),
                    BaselineStat {
                        metric: metric.as_str().to_string(),
                        mean: *mean,
                        std: *std,
                    },
                )
            })
            .collect()
    }

    fn readings(values: &[(WellnessMetric, f64)]) -> BTreeMap<String, f64> {
        values
            .iter()
            .map(|(metric, value)| (metric.as_str().to_string(), *value))
            .collect()
    }

    fn full_baselines() -> BaselineMap {
        baselines(&[
            (WellnessMetric::HrvMs, 60.0, 6.0),
            (WellnessMetric::RestingHrBpm, 52.0, 3.0),
            (WellnessMetric::SleepQuality, 7.0, 1.0),
            (WellnessMetric::Soreness, 3.0, 1.0),
            (WellnessMetric::Stress, 4.0, 1.0),
            (WellnessMetric::Mood, 7.0, 1.0),
            (WellnessMetric::BodyWeightKg, 72.0, 0.5),
        ])
    }

    #[test]
    fn test_all_metrics_at_baseline_scores_fifty() {
        let today = readings(&[
            (WellnessMetric::HrvMs, 60.0),
            (WellnessMetric::RestingHrBpm, 52.0),
            (WellnessMetric::SleepQuality, 7.0),
            (WellnessMetric::Soreness, 3.0),
            (WellnessMetric::Stress, 4.0),
            (WellnessMetric::Mood, 7.0),
            (WellnessMetric::BodyWeightKg, 72.0),
        ]);

        assert_eq!(compute_readiness_index(&today, &full_baselines()), Some(50.0));
    }

    #[test]
    fn test_high_hrv_alone_is_clamped() {
        let today = readings(&[(WellnessMetric::HrvMs, 120.0)]);

        let score = compute_readiness_index(&today, &full_baselines()).unwrap();

        assert!(score > 50.0);
        assert_eq!(score, 100.0);
    }

    #[test]
    fn test_partial_data_is_not_penalised() {
        // One standard deviation better on HRV only: 50 + 1 * 16.67
        let today = readings(&[(WellnessMetric::HrvMs, 66.0)]);

        let score = compute_readiness_index(&today, &full_baselines()).unwrap();

        assert!((score - 66.67).abs() < 1e-9);
    }

    #[test]
    fn test_lower_is_better_metrics_are_flipped() {
        let today = readings(&[
            (WellnessMetric::RestingHrBpm, 55.0), // z = +1, worse
            (WellnessMetric::Soreness, 2.0),      // z = -1, better
        ]);

        // Equal weights, opposite signs
        let score = compute_readiness_index(&today, &full_baselines()).unwrap();
        assert!((score - 50.0).abs() < 1e-9);

        let sore = readings(&[(WellnessMetric::Soreness, 5.0)]);
        let score = compute_readiness_index(&sore, &full_baselines()).unwrap();
        assert!(score < 50.0);
    }

    #[test]
    fn test_body_weight_is_halved() {
        // z = +2 on body weight alone: signed -2, halved to -1
        let today = readings(&[(WellnessMetric::BodyWeightKg, 73.0)]);

        let score = compute_readiness_index(&today, &full_baselines()).unwrap();

        assert!((score - (50.0 - 16.67)).abs() < 1e-9);
    }

    #[test]
    fn test_non_finite_reading_is_skipped() {
        let nan_only = readings(&[(WellnessMetric::HrvMs, f64::NAN)]);
        assert_eq!(compute_readiness_index(&nan_only, &full_baselines()), None);

        // A bad reading drops out and the rest still score
        let mixed = readings(&[(WellnessMetric::HrvMs, f64::NAN), (WellnessMetric::Mood, 8.0)]);
        let score = compute_readiness_index(&mixed, &full_baselines()).unwrap();
        assert!((score - 66.67).abs() < 1e-9);
    }

    #[test]
    fn test_no_usable_metrics() {
        let today = readings(&[(WellnessMetric::Mood, 8.0)]);
        assert_eq!(compute_readiness_index(&today, &BaselineMap::new()), None);

        // Zero spread carries no signal
        let flat = baselines(&[(WellnessMetric::Mood, 7.0, 0.0)]);
        assert_eq!(compute_readiness_index(&today, &flat), None);

        // Unknown metrics never contribute
        let mut other = BTreeMap::new();
        other.insert("grip_strength_kg".to_string(), 44.0);
        let mut grip = BaselineMap::new();
        grip.insert(
            "grip_strength_kg".to_string(),
            BaselineStat {
                metric: "grip_strength_kg".to_string(),
                mean: 40.0,
                std: 2.0,
            },
        );
        assert_eq!(compute_readiness_index(&other, &grip), None);
    }

    #[test]
    fn test_series_scores_each_day_against_own_baseline() {
        let start = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        let mut samples = Vec::new();
        for i in 0..10u64 {
            let date = start + chrono::Days::new(i);
            let hrv = if i % 2 == 0 { 58.0 } else { 62.0 };
            samples.push(WellnessSample::new(date, "hrv_ms", hrv).unwrap());
        }

        let composer = ReadinessComposer::new();
        let from = start;
        let to = start + chrono::Days::new(11);
        let series = composer.compute_series(&samples, from, to).unwrap();

        assert_eq!(series.len(), 12);
        // Fewer than 3 prior samples on the first three days
        assert!(series[..3].iter().all(|s| s.value.is_none()));
        assert!(series[3..10].iter().all(|s| s.value.is_some()));
        // No readings on the last two days
        assert!(series[10..].iter().all(|s| s.value.is_none()));
    }

    #[test]
    fn test_series_rejects_inverted_range() {
        let day = NaiveDate::from_ymd_opt(2024, 2, 10).unwrap();
        let err = ReadinessComposer::new()
            .compute_series(&[], day, day - chrono::Days::new(1))
            .unwrap_err();
        assert!(matches!(err, CalculationError::InvalidDateRange { .. }));
    }

    #[test]
    fn test_default_weights_sum_to_one() {
        assert!((ReadinessWeights::default().total() - 1.0).abs() < 1e-12);
    }
}
