//! Weekly load variability: Monotony and Strain
//!
//! Daily loads are bucketed into ISO weeks keyed by their Monday.
//!
//! - **Monotony** = weekly mean load / weekly sample standard deviation.
//!   High monotony means every day looked the same.
//! - **Strain** = weekly total load x Monotony.

use crate::models::{DailyLoad, WeeklyPoint};
use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::BTreeMap;
use tracing::debug;

/// Monotony / Strain configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariabilityConfig {
    /// Minimum entries in a week before Monotony is estimated (default: 3)
    pub min_days_per_week: usize,

    /// Floor applied to the weekly standard deviation (default: 0.1)
    pub std_floor: f64,
}

impl Default for VariabilityConfig {
    fn default() -> Self {
        VariabilityConfig {
            min_days_per_week: 3,
            std_floor: 0.1,
        }
    }
}

/// Monday of the ISO week containing `date`
pub fn week_start(date: NaiveDate) -> NaiveDate {
    let offset = date.weekday().num_days_from_monday() as u64;
    date - Days::new(offset)
}

/// Group daily loads into Monday-keyed weeks, preserving entry order
fn bucket_by_week(daily_loads: &[DailyLoad]) -> BTreeMap<NaiveDate, Vec<f64>> {
    let mut weeks: BTreeMap<NaiveDate, Vec<f64>> = BTreeMap::new();
    for day in daily_loads {
        weeks.entry(week_start(day.date)).or_default().push(day.load);
    }
    weeks
}

/// Weekly Monotony and Strain calculator
pub struct VariabilityCalculator {
    config: VariabilityConfig,
}

impl VariabilityCalculator {
    pub fn new() -> Self {
        VariabilityCalculator {
            config: VariabilityConfig::default(),
        }
    }

    pub fn with_config(config: VariabilityConfig) -> Self {
        VariabilityCalculator { config }
    }

    /// Weekly Monotony, one point per week that has at least one entry
    pub fn compute_monotony(&self, daily_loads: &[DailyLoad]) -> Vec<WeeklyPoint> {
        let weeks = bucket_by_week(daily_loads);

        let monotony: Vec<WeeklyPoint> = weeks
            .into_iter()
            .map(|(week_start, loads)| WeeklyPoint {
                week_start,
                value: self.week_monotony(&loads),
            })
            .collect();

        debug!(weeks = monotony.len(), "Computed weekly monotony");
        monotony
    }

    fn week_monotony(&self, loads: &[f64]) -> Option<f64> {
        // min_days_per_week below 2 would leave std undefined
        if loads.len() < self.config.min_days_per_week.max(2) {
            return None;
        }

        let mean = loads.iter().mean();
        let std = loads.iter().std_dev().max(self.config.std_floor);
        Some(mean / std)
    }

    /// Weekly Strain, one point per week present in `daily_loads`
    ///
    /// Weeks whose Monotony is `None` or missing from `monotony` get `None`.
    pub fn compute_strain(
        &self,
        daily_loads: &[DailyLoad],
        monotony: &[WeeklyPoint],
    ) -> Vec<WeeklyPoint> {
        let lookup: BTreeMap<NaiveDate, Option<f64>> = monotony
            .iter()
            .map(|p| (p.week_start, p.value))
            .collect();

        let strain: Vec<WeeklyPoint> = bucket_by_week(daily_loads)
            .into_iter()
            .map(|(week_start, loads)| {
                let total: f64 = loads.iter().sum();
                let value = lookup
                    .get(&week_start)
                    .copied()
                    .flatten()
                    .map(|m| total * m);
                WeeklyPoint { week_start, value }
            })
            .collect();

        debug!(weeks = strain.len(), "Computed weekly strain");
        strain
    }
}

impl Default for VariabilityCalculator {
    fn default() -> Self {
        Self::new()
    }
}

/// Weekly Monotony with default settings
pub fn compute_monotony_weekly(daily_loads: &[DailyLoad]) -> Vec<WeeklyPoint> {
    VariabilityCalculator::new().compute_monotony(daily_loads)
}

/// Weekly Strain with default settings
pub fn compute_strain_weekly(
    daily_loads: &[DailyLoad],
    monotony_weekly: &[WeeklyPoint],
) -> Vec<WeeklyPoint> {
    VariabilityCalculator::new().compute_strain(daily_loads, monotony_weekly)
}
