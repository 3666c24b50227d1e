//! One athlete's daily analytics run, and a parallel batch over many athletes
//!
//! An athlete's pipeline is the unit of parallelism: it has no internal
//! concurrency, and pipelines for different athletes share nothing.

use crate::acwr::{AcwrCalculator, AcwrConfig, AcwrZone};
use crate::alerts::{Alert, AlertConfig, AlertEngine, Severity};
use crate::baseline::BaselineEstimator;
use crate::error::{self, CalculationError, LoadWatchError};
use crate::models::{AcwrPoint, DailyLoad, ReadinessScore, SessionEntry, WeeklyPoint, WellnessSample};
use crate::readiness::{ReadinessComposer, ReadinessConfig};
use crate::session::aggregate_daily_loads;
use crate::variability::{week_start, VariabilityCalculator, VariabilityConfig};
use chrono::NaiveDate;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{info, instrument, warn};

/// Settings for every stage of the pipeline
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub acwr: AcwrConfig,
    pub variability: VariabilityConfig,
    pub readiness: ReadinessConfig,
    pub alerts: AlertConfig,
}

/// Raw series for one athlete
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AthleteInput {
    pub athlete_id: String,

    /// One entry per day, ascending
    pub daily_loads: Vec<DailyLoad>,

    pub wellness: Vec<WellnessSample>,
}

impl AthleteInput {
    /// Build input from individual sessions, summing same-day entries
    pub fn from_sessions(
        athlete_id: impl Into<String>,
        sessions: &[SessionEntry],
        wellness: Vec<WellnessSample>,
    ) -> Self {
        AthleteInput {
            athlete_id: athlete_id.into(),
            daily_loads: aggregate_daily_loads(sessions),
            wellness,
        }
    }
}

/// Everything derived for one athlete over a reporting window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AthleteReport {
    pub athlete_id: String,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub acwr: Vec<AcwrPoint>,
    pub monotony: Vec<WeeklyPoint>,
    pub strain: Vec<WeeklyPoint>,
    pub readiness: Vec<ReadinessScore>,
    pub alerts: Vec<Alert>,
}

impl AthleteReport {
    /// Most recent ACWR value in the window
    pub fn latest_acwr(&self) -> Option<f64> {
        self.acwr.iter().rev().find_map(|p| p.ratio)
    }

    pub fn latest_acwr_zone(&self) -> Option<AcwrZone> {
        self.latest_acwr().map(AcwrZone::from_ratio)
    }

    /// Most recent readiness score in the window
    pub fn latest_readiness(&self) -> Option<f64> {
        self.readiness.iter().rev().find_map(|s| s.value)
    }

    pub fn error_count(&self) -> usize {
        self.alerts
            .iter()
            .filter(|a| a.severity == Severity::Error)
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.alerts
            .iter()
            .filter(|a| a.severity == Severity::Warning)
            .count()
    }
}

/// Runs the full analytics chain for one athlete
pub struct AthletePipeline {
    config: PipelineConfig,
}

impl AthletePipeline {
    pub fn new() -> Self {
        AthletePipeline {
            config: PipelineConfig::default(),
        }
    }

    pub fn with_config(config: PipelineConfig) -> Self {
        AthletePipeline { config }
    }

    /// Materialise derived series and alerts for `[from, to]`
    ///
    /// ACWR is computed over the full load history and then cut to the window.
    /// Weekly series keep every week that overlaps the window. Readiness and
    /// outliers both score each day against its own trailing baseline.
    #[instrument(skip(self, input), fields(athlete = %input.athlete_id))]
    pub fn run(
        &self,
        input: &AthleteInput,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<AthleteReport, CalculationError> {
        if from > to {
            return Err(CalculationError::InvalidDateRange { from, to });
        }

        if input.daily_loads.windows(2).any(|w| w[0].date >= w[1].date) {
            warn!("Daily loads are not strictly ascending; windows follow entry order");
        }

        let in_window = |date: NaiveDate| date >= from && date <= to;

        let acwr: Vec<AcwrPoint> = AcwrCalculator::with_config(self.config.acwr.clone())
            .compute_series(&input.daily_loads)
            .into_iter()
            .filter(|p| in_window(p.date))
            .collect();

        let variability = VariabilityCalculator::with_config(self.config.variability.clone());
        let all_monotony = variability.compute_monotony(&input.daily_loads);
        let all_strain = variability.compute_strain(&input.daily_loads, &all_monotony);
        let first_week = week_start(from);
        let week_in_window = |p: &WeeklyPoint| p.week_start >= first_week && p.week_start <= to;
        let monotony: Vec<WeeklyPoint> = all_monotony.into_iter().filter(week_in_window).collect();
        let strain: Vec<WeeklyPoint> = all_strain.into_iter().filter(week_in_window).collect();

        let readiness = ReadinessComposer::with_config(self.config.readiness.clone())
            .compute_series(&input.wellness, from, to)?;

        let estimator = BaselineEstimator::with_config(self.config.readiness.baseline.clone());
        let alerts = AlertEngine::with_config(self.config.alerts.clone()).generate_alerts_trailing(
            &acwr,
            &readiness,
            &input.wellness,
            &estimator,
            from,
            to,
        )?;

        let report = AthleteReport {
            athlete_id: input.athlete_id.clone(),
            from,
            to,
            acwr,
            monotony,
            strain,
            readiness,
            alerts,
        };

        info!(
            latest_acwr = ?report.latest_acwr(),
            latest_readiness = ?report.latest_readiness(),
            alerts = report.alerts.len(),
            "Athlete pipeline complete"
        );

        Ok(report)
    }
}

impl Default for AthletePipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Batch execution options
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Worker threads (None for rayon's default of one per CPU)
    pub num_threads: Option<usize>,

    /// Show a progress bar on stderr
    pub show_progress: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        BatchConfig {
            num_threads: None,
            show_progress: false,
        }
    }
}

/// Outcome of a batch run
#[derive(Debug, Clone, Serialize)]
pub struct BatchSummary {
    /// Reports in input order, for athletes that succeeded
    pub reports: Vec<AthleteReport>,

    /// Athlete id and error message for each failure
    pub failures: Vec<(String, String)>,

    pub duration_ms: u128,
}

impl BatchSummary {
    pub fn is_fully_successful(&self) -> bool {
        self.failures.is_empty()
    }

    /// True when athletes were run and none of them produced a report
    pub fn all_failed(&self) -> bool {
        self.reports.is_empty() && !self.failures.is_empty()
    }

    pub fn total_alerts(&self) -> usize {
        self.reports.iter().map(|r| r.alerts.len()).sum()
    }
}

/// Run one pipeline per athlete in parallel
///
/// A failing athlete is recorded in `failures`; the rest of the batch still runs.
pub fn run_batch(
    inputs: &[AthleteInput],
    from: NaiveDate,
    to: NaiveDate,
    pipeline_config: &PipelineConfig,
    batch_config: &BatchConfig,
) -> error::Result<BatchSummary> {
    let start = Instant::now();
    let pipeline = AthletePipeline::with_config(pipeline_config.clone());

    let progress = if batch_config.show_progress {
        let pb = ProgressBar::new(inputs.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} athletes")
                .map_err(|e| LoadWatchError::Internal(format!("progress template: {}", e)))?
                .progress_chars("#>-"),
        );
        Some(pb)
    } else {
        None
    };

    let run_all = || -> Vec<(String, Result<AthleteReport, CalculationError>)> {
        inputs
            .par_iter()
            .map(|input| {
                let result = pipeline.run(input, from, to);
                if let Some(pb) = &progress {
                    pb.inc(1);
                }
                (input.athlete_id.clone(), result)
            })
            .collect()
    };

    let results = match batch_config.num_threads {
        Some(threads) => rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map_err(|e| LoadWatchError::Internal(format!("thread pool: {}", e)))?
            .install(run_all),
        None => run_all(),
    };

    if let Some(pb) = &progress {
        pb.finish_and_clear();
    }

    let mut reports = Vec::with_capacity(results.len());
    let mut failures = Vec::new();
    for (athlete_id, result) in results {
        match result {
            Ok(report) => reports.push(report),
            Err(e) => {
                warn!(athlete = %athlete_id, error = %e, "Athlete pipeline failed");
                failures.push((athlete_id, e.to_string()));
            }
        }
    }

    let summary = BatchSummary {
        reports,
        failures,
        duration_ms: start.elapsed().as_millis(),
    };

    info!(
        athletes = inputs.len(),
        succeeded = summary.reports.len(),
        failed = summary.failures.len(),
        alerts = summary.total_alerts(),
        duration_ms = summary.duration_ms as u64,
        "Batch complete"
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::AlertType;
    use chrono::Days;

    fn start() -> NaiveDate {
        // Monday
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    fn athlete(id: &str, days: u64, spike_from: u64) -> AthleteInput {
        let daily_loads = (0..days)
            .map(|i| DailyLoad {
                date: start() + Days::new(i),
                load: if i >= spike_from { 900.0 } else { 400.0 + (i % 3) as f64 * 10.0 },
            })
            .collect();

        let wellness = (0..days)
            .flat_map(|i| {
                let date = start() + Days::new(i);
                vec![
                    WellnessSample::new(date, "hrv_ms", 60.0 + (i % 4) as f64).unwrap(),
                    WellnessSample::new(date, "resting_hr_bpm", 50.0 + (i % 2) as f64).unwrap(),
                ]
            })
            .collect();

        AthleteInput {
            athlete_id: id.to_string(),
            daily_loads,
            wellness,
        }
    }

    #[test]
    fn test_pipeline_window_and_series() {
        let input = athlete("a1", 42, 100);
        let from = start() + Days::new(35);
        let to = start() + Days::new(41);

        let report = AthletePipeline::new().run(&input, from, to).unwrap();

        assert_eq!(report.acwr.len(), 7);
        assert!(report.acwr.iter().all(|p| p.date >= from && p.date <= to));
        assert_eq!(report.readiness.len(), 7);
        assert!(report.readiness.iter().all(|s| s.value.is_some()));
        // 2024-02-05 is the Monday of the window's only week
        assert_eq!(report.monotony.len(), 1);
        assert_eq!(report.strain.len(), 1);
        assert_eq!(report.monotony[0].week_start, from);
        assert_eq!(report.latest_acwr_zone(), Some(AcwrZone::Optimal));
    }

    #[test]
    fn test_pipeline_flags_load_spike() {
        let input = athlete("a2", 42, 35);
        let from = start() + Days::new(35);
        let to = start() + Days::new(41);

        let report = AthletePipeline::new().run(&input, from, to).unwrap();

        assert!(report
            .alerts
            .iter()
            .any(|a| a.alert_type == AlertType::Acwr && a.severity == Severity::Error));
        assert!(report.error_count() > 0);
        assert!(report.alerts.windows(2).all(|w| w[0].date <= w[1].date));
    }

    #[test]
    fn test_pipeline_flags_shift_from_window_start() {
        // HRV sits at 60/61 for four weeks, then drops to 50/51 for the whole window
        let wellness = (0..56u64)
            .map(|i| {
                let base = if i < 28 { 60.0 } else { 50.0 };
                WellnessSample::new(start() + Days::new(i), "hrv_ms", base + (i % 2) as f64)
                    .unwrap()
            })
            .collect();
        let input = AthleteInput {
            athlete_id: "shift".to_string(),
            daily_loads: Vec::new(),
            wellness,
        };
        let from = start() + Days::new(28);
        let to = start() + Days::new(55);

        let report = AthletePipeline::new().run(&input, from, to).unwrap();

        let outliers: Vec<&Alert> = report
            .alerts
            .iter()
            .filter(|a| a.alert_type == AlertType::Outlier)
            .collect();
        assert!(!outliers.is_empty());
        assert_eq!(outliers[0].date, from);
        assert_eq!(outliers[0].metric, "hrv_ms");
        assert!(outliers.iter().all(|a| a.date >= from && a.date <= to));
    }

    #[test]
    fn test_pipeline_rejects_inverted_window() {
        let input = athlete("a3", 10, 100);
        let result = AthletePipeline::new().run(&input, start() + Days::new(5), start());
        assert!(result.is_err());
    }

    #[test]
    fn test_from_sessions_aggregates() {
        let day = start();
        let sessions = vec![
            SessionEntry::new(day, 60.0, 5.0).unwrap(),
            SessionEntry::new(day, 30.0, 8.0).unwrap(),
        ];
        let input = AthleteInput::from_sessions("a4", &sessions, Vec::new());
        assert_eq!(input.daily_loads, vec![DailyLoad { date: day, load: 540.0 }]);
    }

    #[test]
    fn test_batch_collects_failures() {
        let inputs = vec![athlete("ok-1", 40, 100), athlete("ok-2", 40, 30)];
        let from = start() + Days::new(30);
        let to = start() + Days::new(39);

        let summary = run_batch(
            &inputs,
            from,
            to,
            &PipelineConfig::default(),
            &BatchConfig {
                num_threads: Some(2),
                show_progress: false,
            },
        )
        .unwrap();

        assert!(summary.is_fully_successful());
        assert_eq!(summary.reports.len(), 2);
        assert_eq!(summary.reports[0].athlete_id, "ok-1");

        let failed = run_batch(&inputs, to, from, &PipelineConfig::default(), &BatchConfig::default())
            .unwrap();
        assert_eq!(failed.failures.len(), 2);
        assert!(failed.reports.is_empty());
        assert!(failed.all_failed());
        assert!(!summary.all_failed());
    }

    #[test]
    fn test_empty_batch_is_not_a_failure() {
        let summary = run_batch(
            &[],
            start(),
            start() + Days::new(6),
            &PipelineConfig::default(),
            &BatchConfig::default(),
        )
        .unwrap();

        assert!(summary.reports.is_empty());
        assert!(!summary.all_failed());
    }
}
