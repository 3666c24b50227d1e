use crate::alerts::Alert;
use crate::pipeline::AthleteReport;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

pub mod csv;
pub mod json;
pub mod text;

/// Export format types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Csv,
    Text,
}

impl std::str::FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            "text" | "txt" | "table" => Ok(ExportFormat::Text),
            _ => Err(ExportError::UnsupportedFormat(s.to_string())),
        }
    }
}

/// Export errors
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("CSV error: {0}")]
    CsvError(#[from] ::csv::Error),
}

/// One row per athlete per day in a report window
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyRow {
    pub athlete_id: String,
    pub date: NaiveDate,
    pub acwr: Option<f64>,
    pub readiness: Option<f64>,
}

/// One row per athlete per week in a report window
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklyRow {
    pub athlete_id: String,
    pub week_start: NaiveDate,
    pub monotony: Option<f64>,
    pub strain: Option<f64>,
}

/// An alert tagged with the athlete it belongs to
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AthleteAlert<'a> {
    pub athlete_id: &'a str,
    #[serde(flatten)]
    pub alert: &'a Alert,
}

/// Join a report's ACWR and readiness series on date
///
/// ACWR only starts once enough history exists, so early days carry
/// readiness alone.
pub fn daily_rows(report: &AthleteReport) -> Vec<DailyRow> {
    let mut by_date: BTreeMap<NaiveDate, (Option<f64>, Option<f64>)> = BTreeMap::new();

    for point in &report.acwr {
        by_date.entry(point.date).or_default().0 = point.ratio;
    }
    for score in &report.readiness {
        by_date.entry(score.date).or_default().1 = score.value;
    }

    by_date
        .into_iter()
        .map(|(date, (acwr, readiness))| DailyRow {
            athlete_id: report.athlete_id.clone(),
            date,
            acwr,
            readiness,
        })
        .collect()
}

/// Join a report's Monotony and Strain series on week
pub fn weekly_rows(report: &AthleteReport) -> Vec<WeeklyRow> {
    let mut by_week: BTreeMap<NaiveDate, (Option<f64>, Option<f64>)> = BTreeMap::new();

    for point in &report.monotony {
        by_week.entry(point.week_start).or_default().0 = point.value;
    }
    for point in &report.strain {
        by_week.entry(point.week_start).or_default().1 = point.value;
    }

    by_week
        .into_iter()
        .map(|(week_start, (monotony, strain))| WeeklyRow {
            athlete_id: report.athlete_id.clone(),
            week_start,
            monotony,
            strain,
        })
        .collect()
}

/// All alerts across reports, tagged with athlete id
pub fn athlete_alerts(reports: &[AthleteReport]) -> Vec<AthleteAlert<'_>> {
    reports
        .iter()
        .flat_map(|r| {
            r.alerts.iter().map(move |alert| AthleteAlert {
                athlete_id: &r.athlete_id,
                alert,
            })
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::alerts::{Alert, AlertType, Severity};
    use crate::models::{AcwrPoint, ReadinessScore, WeeklyPoint};
    use crate::pipeline::AthleteReport;
    use chrono::NaiveDate;

    pub fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 9, d).unwrap()
    }

    pub fn sample_report() -> AthleteReport {
        AthleteReport {
            athlete_id: "p7".to_string(),
            from: day(2),
            to: day(4),
            acwr: vec![
                AcwrPoint { date: day(3), ratio: Some(1.62) },
                AcwrPoint { date: day(4), ratio: None },
            ],
            monotony: vec![WeeklyPoint { week_start: day(2), value: Some(2.5) }],
            strain: vec![WeeklyPoint { week_start: day(2), value: Some(5250.0) }],
            readiness: vec![
                ReadinessScore { date: day(2), value: Some(55.0) },
                ReadinessScore { date: day(3), value: Some(38.5) },
                ReadinessScore { date: day(4), value: None },
            ],
            alerts: vec![Alert {
                alert_type: AlertType::Acwr,
                metric: "acwr".to_string(),
                date: day(3),
                value: 1.62,
                threshold: "> 1.5".to_string(),
                severity: Severity::Error,
            }],
        }
    }
}
