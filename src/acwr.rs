//! Rolling Acute:Chronic Workload Ratio
//!
//! ACWR divides the mean load of a short trailing window (acute, 7 entries)
//! by the mean load of a long trailing window (chronic, 28 entries). Windows
//! count entries, not calendar days: a gap in the daily series simply means
//! the window reaches further back in time.
//!
//! Windows are borrowed sub-slices of the caller's series, so a full series
//! is computed without any per-point allocation.

use crate::models::{AcwrPoint, DailyLoad};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use tracing::debug;

/// ACWR window configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcwrConfig {
    /// Acute window length in entries (default: 7)
    pub short_window: usize,

    /// Chronic window length in entries (default: 28)
    pub long_window: usize,

    /// Entries the acute window may be short of and still count (default: 2)
    pub short_tolerance: usize,

    /// Entries the chronic window may be short of and still count (default: 5)
    pub long_tolerance: usize,
}

impl Default for AcwrConfig {
    fn default() -> Self {
        AcwrConfig {
            short_window: 7,
            long_window: 28,
            short_tolerance: 2,
            long_tolerance: 5,
        }
    }
}

/// ACWR risk zones
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AcwrZone {
    Undertrained, // below 0.8
    Optimal,      // 0.8 to 1.3
    Caution,      // 1.3 to 1.5
    HighRisk,     // above 1.5
}

impl AcwrZone {
    /// Classify a ratio
    pub fn from_ratio(ratio: f64) -> Self {
        if ratio < 0.8 {
            AcwrZone::Undertrained
        } else if ratio <= 1.3 {
            AcwrZone::Optimal
        } else if ratio <= 1.5 {
            AcwrZone::Caution
        } else {
            AcwrZone::HighRisk
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            AcwrZone::Undertrained => "Under-loading relative to recent history",
            AcwrZone::Optimal => "Load in line with recent history",
            AcwrZone::Caution => "Load rising faster than recent history",
            AcwrZone::HighRisk => "Load spike, elevated injury risk",
        }
    }

    pub fn recommendation(&self) -> &'static str {
        match self {
            AcwrZone::Undertrained => "Build load back up gradually to avoid detraining",
            AcwrZone::Optimal => "Continue the current progression",
            AcwrZone::Caution => "Hold load steady and monitor wellness closely",
            AcwrZone::HighRisk => "Reduce volume and intensity until the ratio settles",
        }
    }
}

/// Rolling ACWR calculator
pub struct AcwrCalculator {
    config: AcwrConfig,
}

impl AcwrCalculator {
    /// Create calculator with the 7/28 default windows
    pub fn new() -> Self {
        AcwrCalculator {
            config: AcwrConfig::default(),
        }
    }

    /// Create calculator with custom windows
    pub fn with_config(config: AcwrConfig) -> Self {
        AcwrCalculator { config }
    }

    pub fn config(&self) -> &AcwrConfig {
        &self.config
    }

    /// Compute one ACWR point per entry from index `long_window - 1` onwards
    ///
    /// A series shorter than the chronic window yields an empty result.
    pub fn compute_series(&self, daily_loads: &[DailyLoad]) -> Vec<AcwrPoint> {
        let long_window = self.config.long_window;
        if long_window == 0 || daily_loads.len() < long_window {
            debug!(
                entries = daily_loads.len(),
                long_window, "Not enough history for ACWR"
            );
            return Vec::new();
        }

        let series: Vec<AcwrPoint> = (long_window - 1..daily_loads.len())
            .map(|i| AcwrPoint {
                date: daily_loads[i].date,
                ratio: self.ratio_at(daily_loads, i),
            })
            .collect();

        debug!(
            entries = daily_loads.len(),
            points = series.len(),
            valid = series.iter().filter(|p| p.ratio.is_some()).count(),
            "Computed ACWR series"
        );

        series
    }

    /// Ratio for the entry at `index`, using windows clipped at the series start
    fn ratio_at(&self, daily_loads: &[DailyLoad], index: usize) -> Option<f64> {
        let short = trailing(daily_loads, index, self.config.short_window);
        let long = trailing(daily_loads, index, self.config.long_window);

        let min_short = self
            .config
            .short_window
            .saturating_sub(self.config.short_tolerance);
        let min_long = self
            .config
            .long_window
            .saturating_sub(self.config.long_tolerance);

        if short.is_empty() || short.len() < min_short || long.len() < min_long {
            return None;
        }

        let acute = short.iter().map(|d| d.load).mean();
        let chronic = long.iter().map(|d| d.load).mean();

        if chronic > 0.0 {
            Some(acute / chronic)
        } else {
            None
        }
    }
}

impl Default for AcwrCalculator {
    fn default() -> Self {
        Self::new()
    }
}

/// Up to `window` entries ending at `index`, never before the series start
fn trailing(series: &[DailyLoad], index: usize, window: usize) -> &[DailyLoad] {
    let start = (index + 1).saturating_sub(window);
    &series[start..=index]
}

/// Compute an ACWR series with explicit window lengths and default tolerances
pub fn compute_acwr_series(
    daily_loads: &[DailyLoad],
    short_window: usize,
    long_window: usize,
) -> Vec<AcwrPoint> {
    AcwrCalculator::with_config(AcwrConfig {
        short_window,
        long_window,
        ..AcwrConfig::default()
    })
    .compute_series(daily_loads)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use proptest::prelude::*;

    fn series(loads: &[f64]) -> Vec<DailyLoad> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        loads
            .iter()
            .enumerate()
            .map(|(i, &load)| DailyLoad {
                date: start + chrono::Days::new(i as u64),
                load,
            })
            .collect()
    }

    #[test]
    fn test_short_series_is_empty() {
        let calculator = AcwrCalculator::new();
        assert!(calculator.compute_series(&series(&[300.0; 27])).is_empty());
        assert!(calculator.compute_series(&[]).is_empty());
    }

    #[test]
    fn test_uniform_load_gives_one() {
        let calculator = AcwrCalculator::new();
        let loads = series(&[400.0; 28]);

        let acwr = calculator.compute_series(&loads);

        assert_eq!(acwr.len(), 1);
        assert_eq!(acwr[0].date, loads[27].date);
        assert_eq!(acwr[0].ratio, Some(1.0));
    }

    #[test]
    fn test_series_is_parallel_from_long_window() {
        let calculator = AcwrCalculator::new();
        let loads = series(&[250.0; 40]);

        let acwr = calculator.compute_series(&loads);

        assert_eq!(acwr.len(), 13);
        for (point, load) in acwr.iter().zip(&loads[27..]) {
            assert_eq!(point.date, load.date);
        }
    }

    #[test]
    fn test_spike_raises_ratio() {
        let calculator = AcwrCalculator::new();
        let mut values = vec![300.0; 21];
        values.extend([600.0; 7]);

        let acwr = calculator.compute_series(&series(&values));

        // acute 600, chronic (21*300 + 7*600)/28 = 375
        let ratio = acwr[0].ratio.unwrap();
        assert!((ratio - 1.6).abs() < 1e-9);
        assert_eq!(AcwrZone::from_ratio(ratio), AcwrZone::HighRisk);
    }

    #[test]
    fn test_zero_chronic_is_none() {
        let calculator = AcwrCalculator::new();
        let acwr = calculator.compute_series(&series(&[0.0; 30]));

        assert_eq!(acwr.len(), 3);
        assert!(acwr.iter().all(|p| p.ratio.is_none()));
    }

    #[test]
    fn test_tolerance_rejects_short_windows() {
        // Acute window wider than the chronic one, so the start clip bites.
        let calculator = AcwrCalculator::with_config(AcwrConfig {
            short_window: 12,
            long_window: 10,
            short_tolerance: 0,
            long_tolerance: 0,
        });
        let acwr = calculator.compute_series(&series(&[100.0; 12]));

        // Index 9 and 10 see fewer than 12 acute entries; index 11 sees all 12.
        assert_eq!(acwr.len(), 3);
        assert_eq!(acwr[0].ratio, None);
        assert_eq!(acwr[1].ratio, None);
        assert_eq!(acwr[2].ratio, Some(1.0));
    }

    #[test]
    fn test_explicit_windows() {
        let acwr = compute_acwr_series(&series(&[200.0; 14]), 3, 14);
        assert_eq!(acwr.len(), 1);
        assert_eq!(acwr[0].ratio, Some(1.0));
    }

    #[test]
    fn test_zone_boundaries() {
        assert_eq!(AcwrZone::from_ratio(0.79), AcwrZone::Undertrained);
        assert_eq!(AcwrZone::from_ratio(0.8), AcwrZone::Optimal);
        assert_eq!(AcwrZone::from_ratio(1.3), AcwrZone::Optimal);
        assert_eq!(AcwrZone::from_ratio(1.5), AcwrZone::Caution);
        assert_eq!(AcwrZone::from_ratio(1.51), AcwrZone::HighRisk);
    }

    proptest! {
        #[test]
        fn prop_series_length_and_positivity(loads in prop::collection::vec(0.0f64..1000.0, 0..120)) {
            let acwr = AcwrCalculator::new().compute_series(&series(&loads));

            let expected = if loads.len() < 28 { 0 } else { loads.len() - 27 };
            prop_assert_eq!(acwr.len(), expected);
            for point in acwr {
                if let Some(ratio) = point.ratio {
                    prop_assert!(ratio.is_finite());
                    prop_assert!(ratio >= 0.0);
                }
            }
        }
    }
}
