//! Alert detection and fusion
//!
//! Three rules turn derived series into alert value objects:
//!
//! - **ACWR**: warning below 0.8 (detraining), error above 1.5 (spike).
//! - **Low readiness**: error on every day a run of consecutive sub-threshold
//!   readiness scores has reached the configured length. Once the run is
//!   established each further low day alerts again.
//! - **Wellness outlier**: `|z|` above the configured threshold for one of the
//!   watched metrics. Severity follows the configured threshold, not the
//!   observed `|z|`.
//!
//! The engine holds no state. Delivery and cross-run deduplication belong to
//! the caller.

use crate::baseline::BaselineEstimator;
use crate::error::CalculationError;
use crate::models::{
    group_wellness_by_date, AcwrPoint, BaselineMap, BaselineStat, DailyWellness,
    ReadinessScore, WellnessMetric, WellnessSample,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use tracing::{debug, info};

/// Alert categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    Acwr,
    LowReadiness,
    Outlier,
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlertType::Acwr => write!(f, "acwr"),
            AlertType::LowReadiness => write!(f, "low_readiness"),
            AlertType::Outlier => write!(f, "outlier"),
        }
    }
}

/// Alert urgency, mapped to a delivery channel downstream
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Advisory
    Warning,
    /// Higher urgency
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// A single detected alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub alert_type: AlertType,

    /// Series or wellness metric the alert is about
    pub metric: String,

    pub date: NaiveDate,

    /// Observed value that triggered the alert
    pub value: f64,

    /// Human-readable threshold, e.g. "> 1.5"
    pub threshold: String,

    pub severity: Severity,
}

/// Alert thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertConfig {
    /// ACWR below this is a detraining warning (default: 0.8)
    pub acwr_low: f64,

    /// ACWR above this is an injury-risk error (default: 1.5)
    pub acwr_high: f64,

    /// Readiness below this counts as a low day (default: 40)
    pub readiness_threshold: f64,

    /// Consecutive low days before alerting (default: 3)
    pub readiness_run_length: usize,

    /// `|z|` above this is an outlier (default: 2.0)
    pub outlier_z_threshold: f64,

    /// Outlier thresholds above this produce errors instead of warnings (default: 2.5)
    pub outlier_error_cut: f64,

    /// Metrics checked for outliers
    pub outlier_metrics: Vec<WellnessMetric>,
}

impl Default for AlertConfig {
    fn default() -> Self {
        AlertConfig {
            acwr_low: 0.8,
            acwr_high: 1.5,
            readiness_threshold: 40.0,
            readiness_run_length: 3,
            outlier_z_threshold: 2.0,
            outlier_error_cut: 2.5,
            outlier_metrics: vec![
                WellnessMetric::RestingHrBpm,
                WellnessMetric::HrvMs,
                WellnessMetric::Soreness,
                WellnessMetric::Mood,
            ],
        }
    }
}

/// Stateless alert engine
pub struct AlertEngine {
    config: AlertConfig,
}

impl AlertEngine {
    pub fn new() -> Self {
        AlertEngine {
            config: AlertConfig::default(),
        }
    }

    pub fn with_config(config: AlertConfig) -> Self {
        AlertEngine { config }
    }

    pub fn config(&self) -> &AlertConfig {
        &self.config
    }

    /// Check one ACWR point
    pub fn detect_acwr_alert(&self, point: &AcwrPoint) -> Option<Alert> {
        let ratio = point.ratio?;

        let (threshold, severity) = if ratio < self.config.acwr_low {
            (format!("< {}", self.config.acwr_low), Severity::Warning)
        } else if ratio > self.config.acwr_high {
            (format!("> {}", self.config.acwr_high), Severity::Error)
        } else {
            return None;
        };

        Some(Alert {
            alert_type: AlertType::Acwr,
            metric: "acwr".to_string(),
            date: point.date,
            value: ratio,
            threshold,
            severity,
        })
    }

    /// Scan a readiness series for runs of low days
    pub fn detect_readiness_alerts(&self, series: &[ReadinessScore]) -> Vec<Alert> {
        detect_readiness_alert(
            series,
            self.config.readiness_threshold,
            self.config.readiness_run_length,
        )
    }

    /// Check one wellness value against its baseline with the configured threshold
    pub fn detect_outlier_alert(
        &self,
        metric: &str,
        date: NaiveDate,
        value: Option<f64>,
        baseline: Option<&BaselineStat>,
    ) -> Option<Alert> {
        detect_outlier_alert(
            metric,
            date,
            value,
            baseline,
            self.config.outlier_z_threshold,
            self.config.outlier_error_cut,
        )
    }

    /// Run every rule over `[from, to]` and return the alerts sorted by date
    ///
    /// Every in-range day's readings are scored against the one `baselines`
    /// map. The sort is stable, so alerts sharing a date keep rule order:
    /// ACWR, then readiness, then outliers in `outlier_metrics` order.
    pub fn generate_alerts(
        &self,
        acwr: &[AcwrPoint],
        readiness: &[ReadinessScore],
        wellness: &DailyWellness,
        baselines: &BaselineMap,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Alert>, CalculationError> {
        self.fuse(acwr, readiness, wellness, |_| Cow::Borrowed(baselines), from, to)
    }

    /// Same as [`generate_alerts`](Self::generate_alerts), but each day's
    /// readings are scored against that day's own trailing baseline
    pub fn generate_alerts_trailing(
        &self,
        acwr: &[AcwrPoint],
        readiness: &[ReadinessScore],
        samples: &[WellnessSample],
        estimator: &BaselineEstimator,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Alert>, CalculationError> {
        let wellness = group_wellness_by_date(samples);
        self.fuse(
            acwr,
            readiness,
            &wellness,
            |date| Cow::Owned(estimator.compute(samples, date)),
            from,
            to,
        )
    }

    fn fuse<'b, F>(
        &self,
        acwr: &[AcwrPoint],
        readiness: &[ReadinessScore],
        wellness: &DailyWellness,
        baselines_for: F,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Alert>, CalculationError>
    where
        F: Fn(NaiveDate) -> Cow<'b, BaselineMap>,
    {
        if from > to {
            return Err(CalculationError::InvalidDateRange { from, to });
        }
        let in_range = |date: &NaiveDate| *date >= from && *date <= to;

        let mut alerts: Vec<Alert> = acwr
            .iter()
            .filter(|p| in_range(&p.date))
            .filter_map(|p| self.detect_acwr_alert(p))
            .collect();

        let readiness_window: Vec<ReadinessScore> = readiness
            .iter()
            .filter(|s| in_range(&s.date))
            .copied()
            .collect();
        alerts.extend(self.detect_readiness_alerts(&readiness_window));

        for (date, readings) in wellness.range(from..=to) {
            let baselines = baselines_for(*date);
            for metric in &self.config.outlier_metrics {
                let name = metric.as_str();
                if let (Some(value), Some(baseline)) = (readings.get(name), baselines.get(name)) {
                    alerts.extend(self.detect_outlier_alert(
                        name,
                        *date,
                        Some(*value),
                        Some(baseline),
                    ));
                }
            }
        }

        alerts.sort_by_key(|a| a.date);

        info!(
            from = %from,
            to = %to,
            total = alerts.len(),
            errors = alerts.iter().filter(|a| a.severity == Severity::Error).count(),
            "Generated alerts"
        );

        Ok(alerts)
    }
}

impl Default for AlertEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Check one ACWR value with the default 0.8 / 1.5 bounds
pub fn detect_acwr_alert(ratio: Option<f64>, date: NaiveDate) -> Option<Alert> {
    AlertEngine::new().detect_acwr_alert(&AcwrPoint { date, ratio })
}

/// Fuse all rules over `[from, to]` with default thresholds
pub fn generate_alerts(
    acwr: &[AcwrPoint],
    readiness: &[ReadinessScore],
    wellness: &DailyWellness,
    baselines: &BaselineMap,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<Alert>, CalculationError> {
    AlertEngine::new().generate_alerts(acwr, readiness, wellness, baselines, from, to)
}

/// Emit an error for every day a low-readiness run has reached `run_length`
///
/// Missing scores and scores at or above `threshold` reset the run.
pub fn detect_readiness_alert(
    series: &[ReadinessScore],
    threshold: f64,
    run_length: usize,
) -> Vec<Alert> {
    let mut alerts = Vec::new();
    let mut streak = 0usize;

    for score in series {
        match score.value {
            Some(value) if value < threshold => {
                streak += 1;
                if streak >= run_length {
                    alerts.push(Alert {
                        alert_type: AlertType::LowReadiness,
                        metric: "readiness".to_string(),
                        date: score.date,
                        value,
                        threshold: format!("< {} for {}+ days", threshold, run_length),
                        severity: Severity::Error,
                    });
                }
            }
            _ => streak = 0,
        }
    }

    debug!(days = series.len(), alerts = alerts.len(), "Scanned readiness series");
    alerts
}

/// Flag a wellness value more than `z_threshold` standard deviations from baseline
///
/// Severity is `Warning` when `z_threshold <= error_cut`, `Error` otherwise.
/// No alert without a value, without a baseline, or with a zero spread.
pub fn detect_outlier_alert(
    metric: &str,
    date: NaiveDate,
    value: Option<f64>,
    baseline: Option<&BaselineStat>,
    z_threshold: f64,
    error_cut: f64,
) -> Option<Alert> {
    let value = value?;
    let z = baseline?.z_score(value)?.abs();

    if !(z > z_threshold) {
        return None;
    }

    let severity = if z_threshold <= error_cut {
        Severity::Warning
    } else {
        Severity::Error
    };

    Some(Alert {
        alert_type: AlertType::Outlier,
        metric: metric.to_string(),
        date,
        value,
        threshold: format!("|z| > {}", z_threshold),
        severity,
    })
}
