use super::{athlete_alerts, daily_rows, weekly_rows, ExportError};
use crate::pipeline::AthleteReport;
use csv::Writer;
use std::io::Write;

/// Write per-day ACWR and readiness for every report
///
/// Columns: `athlete_id,date,acwr,readiness`; missing values are blank.
pub fn write_daily_series<W: Write>(
    reports: &[AthleteReport],
    writer: W,
) -> Result<(), ExportError> {
    let mut csv_writer = Writer::from_writer(writer);
    for report in reports {
        for row in daily_rows(report) {
            csv_writer.serialize(row)?;
        }
    }
    csv_writer.flush()?;
    Ok(())
}

/// Write per-week Monotony and Strain for every report
///
/// Columns: `athlete_id,week_start,monotony,strain`.
pub fn write_weekly_series<W: Write>(
    reports: &[AthleteReport],
    writer: W,
) -> Result<(), ExportError> {
    let mut csv_writer = Writer::from_writer(writer);
    for report in reports {
        for row in weekly_rows(report) {
            csv_writer.serialize(row)?;
        }
    }
    csv_writer.flush()?;
    Ok(())
}

/// Write every alert, one row each, tagged with athlete id
pub fn write_alerts<W: Write>(reports: &[AthleteReport], writer: W) -> Result<(), ExportError> {
    // serde(flatten) is not supported by the csv serializer, so write fields by hand
    let mut csv_writer = Writer::from_writer(writer);
    csv_writer.write_record([
        "athlete_id",
        "date",
        "alert_type",
        "metric",
        "value",
        "threshold",
        "severity",
    ])?;

    for tagged in athlete_alerts(reports) {
        let alert = tagged.alert;
        csv_writer.write_record([
            tagged.athlete_id.to_string(),
            alert.date.format("%Y-%m-%d").to_string(),
            alert.alert_type.to_string(),
            alert.metric.clone(),
            alert.value.to_string(),
            alert.threshold.clone(),
            alert.severity.to_string(),
        ])?;
    }

    csv_writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::test_support::sample_report;

    #[test]
    fn test_daily_series_csv() {
        let mut buffer = Vec::new();
        write_daily_series(&[sample_report()], &mut buffer).unwrap();

        let output = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines[0], "athlete_id,date,acwr,readiness");
        assert_eq!(lines[1], "p7,2024-09-02,,55.0");
        assert_eq!(lines[2], "p7,2024-09-03,1.62,38.5");
        assert_eq!(lines[3], "p7,2024-09-04,,");
    }

    #[test]
    fn test_weekly_series_csv() {
        let mut buffer = Vec::new();
        write_weekly_series(&[sample_report()], &mut buffer).unwrap();

        let output = String::from_utf8(buffer).unwrap();
        assert!(output.starts_with("athlete_id,week_start,monotony,strain\n"));
        assert!(output.contains("p7,2024-09-02,2.5,5250.0"));
    }

    #[test]
    fn test_alerts_csv() {
        let mut buffer = Vec::new();
        write_alerts(&[sample_report()], &mut buffer).unwrap();

        let output = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], "p7,2024-09-03,acwr,acwr,1.62,> 1.5,error");
    }
}
