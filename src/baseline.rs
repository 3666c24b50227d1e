//! Trailing 28-day wellness baselines
//!
//! The window is half-open, `[target - 28 days, target)`, so the target
//! day's own readings never leak into the baseline they are scored against.

use crate::models::{BaselineMap, BaselineStat, WellnessSample};
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::BTreeMap;
use tracing::debug;

/// Baseline window configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineConfig {
    /// Trailing window length in calendar days (default: 28)
    pub window_days: u32,

    /// Samples a metric needs inside the window to get a baseline (default: 3)
    pub min_samples: usize,
}

impl Default for BaselineConfig {
    fn default() -> Self {
        BaselineConfig {
            window_days: 28,
            min_samples: 3,
        }
    }
}

impl BaselineStat {
    /// Standard score of `value` against this baseline
    ///
    /// A zero (or non-finite) spread carries no signal and yields `None`,
    /// as does a non-finite reading.
    pub fn z_score(&self, value: f64) -> Option<f64> {
        if !value.is_finite() || !self.std.is_finite() || self.std == 0.0 || !self.mean.is_finite() {
            return None;
        }
        let z = (value - self.mean) / self.std;
        z.is_finite().then_some(z)
    }
}

/// Per-metric baseline estimator
pub struct BaselineEstimator {
    config: BaselineConfig,
}

impl BaselineEstimator {
    pub fn new() -> Self {
        BaselineEstimator {
            config: BaselineConfig::default(),
        }
    }

    pub fn with_config(config: BaselineConfig) -> Self {
        BaselineEstimator { config }
    }

    /// Compute baselines for every metric with enough samples before `target_date`
    ///
    /// Metrics below `min_samples` are left out of the map rather than reported
    /// as errors.
    pub fn compute(&self, samples: &[WellnessSample], target_date: NaiveDate) -> BaselineMap {
        let window_start = target_date
            .checked_sub_days(Days::new(self.config.window_days as u64))
            .unwrap_or(NaiveDate::MIN);

        let mut by_metric: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
        for sample in samples
            .iter()
            .filter(|s| s.date >= window_start && s.date < target_date)
        {
            by_metric
                .entry(sample.metric.as_str())
                .or_default()
                .push(sample.value);
        }

        let baselines: BaselineMap = by_metric
            .into_iter()
            .filter(|(_, values)| !values.is_empty() && values.len() >= self.config.min_samples)
            .map(|(metric, values)| {
                let mean = values.iter().mean();
                let std = if values.len() >= 2 {
                    values.iter().std_dev()
                } else {
                    0.0
                };
                (
                    metric.to_string(),
                    BaselineStat {
                        metric: metric.to_string(),
                        mean,
                        std,
                    },
                )
            })
            .collect();

        debug!(
            target = %target_date,
            metrics = baselines.len(),
            "Computed wellness baselines"
        );

        baselines
    }
}

impl Default for BaselineEstimator {
    fn default() -> Self {
        Self::new()
    }
}

/// 28-day baselines with default settings
pub fn compute_baseline_28d(samples: &[WellnessSample], target_date: NaiveDate) -> BaselineMap {
    BaselineEstimator::new().compute(samples, target_date)
}
