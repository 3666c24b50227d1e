use super::{ExportError, WeeklyRow};
use crate::alerts::{Alert, Severity};
use crate::pipeline::{AthleteReport, BatchSummary};
use colored::*;
use std::io::Write;
use tabled::settings::Style;
use tabled::{Table, Tabled};

#[derive(Tabled)]
struct SummaryRow {
    #[tabled(rename = "Athlete")]
    athlete: String,
    #[tabled(rename = "ACWR")]
    acwr: String,
    #[tabled(rename = "Zone")]
    zone: String,
    #[tabled(rename = "Readiness")]
    readiness: String,
    #[tabled(rename = "Errors")]
    errors: usize,
    #[tabled(rename = "Warnings")]
    warnings: usize,
}

#[derive(Tabled)]
struct WeekRow {
    #[tabled(rename = "Week of")]
    week_start: String,
    #[tabled(rename = "Monotony")]
    monotony: String,
    #[tabled(rename = "Strain")]
    strain: String,
}

fn fmt_opt(value: Option<f64>, precision: usize) -> String {
    match value {
        Some(v) => format!("{:.*}", precision, v),
        None => "-".to_string(),
    }
}

fn severity_label(severity: Severity) -> ColoredString {
    match severity {
        Severity::Error => "ERROR".red().bold(),
        Severity::Warning => "WARN".yellow(),
    }
}

/// Render one alert as a single line
pub fn format_alert(alert: &Alert) -> String {
    format!(
        "{} {} {:<14} {:<16} {:>8.2}  ({})",
        alert.date.format("%Y-%m-%d"),
        severity_label(alert.severity),
        alert.alert_type.to_string(),
        alert.metric,
        alert.value,
        alert.threshold
    )
}

/// Write a one-row-per-athlete overview table
pub fn write_summary<W: Write>(reports: &[AthleteReport], mut writer: W) -> Result<(), ExportError> {
    let rows: Vec<SummaryRow> = reports
        .iter()
        .map(|r| SummaryRow {
            athlete: r.athlete_id.clone(),
            acwr: fmt_opt(r.latest_acwr(), 2),
            zone: r
                .latest_acwr_zone()
                .map(|z| z.description().to_string())
                .unwrap_or_else(|| "-".to_string()),
            readiness: fmt_opt(r.latest_readiness(), 1),
            errors: r.error_count(),
            warnings: r.warning_count(),
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::modern());
    writeln!(writer, "{}", table)?;
    Ok(())
}

/// Write the full human-readable report for one athlete
pub fn write_report<W: Write>(report: &AthleteReport, mut writer: W) -> Result<(), ExportError> {
    writeln!(writer, "{}", format!("Athlete: {}", report.athlete_id).bold())?;
    writeln!(
        writer,
        "Period: {} to {}",
        report.from.format("%Y-%m-%d"),
        report.to.format("%Y-%m-%d")
    )?;
    writeln!(writer)?;

    writeln!(writer, "{}", "LOAD".bold())?;
    match (report.latest_acwr(), report.latest_acwr_zone()) {
        (Some(ratio), Some(zone)) => {
            writeln!(writer, "Latest ACWR: {:.2} ({})", ratio, zone.description())?;
            writeln!(writer, "{}", zone.recommendation())?;
        }
        _ => writeln!(writer, "Latest ACWR: not enough history")?,
    }
    writeln!(writer)?;

    let weeks: Vec<WeekRow> = super::weekly_rows(report)
        .into_iter()
        .map(|WeeklyRow { week_start, monotony, strain, .. }| WeekRow {
            week_start: week_start.format("%Y-%m-%d").to_string(),
            monotony: fmt_opt(monotony, 2),
            strain: fmt_opt(strain, 0),
        })
        .collect();
    if !weeks.is_empty() {
        let mut table = Table::new(weeks);
        table.with(Style::modern());
        writeln!(writer, "{}", table)?;
        writeln!(writer)?;
    }

    writeln!(writer, "{}", "READINESS".bold())?;
    match report.latest_readiness() {
        Some(score) => writeln!(writer, "Latest readiness: {:.1} / 100", score)?,
        None => writeln!(writer, "Latest readiness: no baseline yet")?,
    }
    writeln!(writer)?;

    writeln!(writer, "{}", "ALERTS".bold())?;
    if report.alerts.is_empty() {
        writeln!(writer, "{}", "No alerts".green())?;
    } else {
        for alert in &report.alerts {
            writeln!(writer, "{}", format_alert(alert))?;
        }
    }

    Ok(())
}

/// Write every report followed by the batch footer
pub fn write_batch<W: Write>(summary: &BatchSummary, mut writer: W) -> Result<(), ExportError> {
    write_summary(&summary.reports, &mut writer)?;
    writeln!(writer)?;

    for report in &summary.reports {
        write_report(report, &mut writer)?;
        writeln!(writer)?;
    }

    for (athlete_id, reason) in &summary.failures {
        writeln!(writer, "{} {}: {}", "FAILED".red().bold(), athlete_id, reason)?;
    }

    writeln!(
        writer,
        "{} athletes, {} alerts, {} ms",
        summary.reports.len(),
        summary.total_alerts(),
        summary.duration_ms
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::test_support::sample_report;

    fn render<F>(f: F) -> String
    where
        F: FnOnce(&mut Vec<u8>) -> Result<(), ExportError>,
    {
        colored::control::set_override(false);
        let mut buffer = Vec::new();
        f(&mut buffer).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn test_summary_table() {
        let output = render(|w| write_summary(&[sample_report()], w));

        assert!(output.contains("Athlete"));
        assert!(output.contains("p7"));
        // Trailing None values are skipped
        assert!(output.contains("1.62"));
        assert!(output.contains("38.5"));
        assert!(output.contains("elevated injury risk"));
    }

    #[test]
    fn test_report_lists_alerts() {
        let output = render(|w| write_report(&sample_report(), w));

        assert!(output.contains("Period: 2024-09-02 to 2024-09-04"));
        assert!(output.contains("2024-09-03 ERROR acwr"));
        assert!(output.contains("(> 1.5)"));
        assert!(output.contains("Strain"));
    }

    #[test]
    fn test_batch_footer() {
        let summary = BatchSummary {
            reports: vec![sample_report()],
            failures: vec![("p9".to_string(), "no data".to_string())],
            duration_ms: 12,
        };
        let output = render(|w| write_batch(&summary, w));

        assert!(output.contains("FAILED p9: no data"));
        assert!(output.ends_with("1 athletes, 1 alerts, 12 ms\n"));
    }
}
