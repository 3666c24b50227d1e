use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord};
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::ImportError;
use crate::models::{SessionEntry, WellnessSample};

use super::DEFAULT_ATHLETE;

/// Sessions keyed by athlete id
pub type SessionsByAthlete = BTreeMap<String, Vec<SessionEntry>>;

/// Wellness samples keyed by athlete id
pub type WellnessByAthlete = BTreeMap<String, Vec<WellnessSample>>;

/// CSV importer for session and wellness files with flexible column names
///
/// Sessions: `athlete_id,date,duration_minutes,rpe_post`.
/// Wellness, long layout: `athlete_id,date,metric,value`.
/// Wellness, wide layout: `athlete_id,date,<metric>,<metric>,...` with blank
/// cells for missing readings.
///
/// `athlete_id` is optional; rows without one belong to [`DEFAULT_ATHLETE`].
/// Any unparsable or out-of-contract value aborts the import.
pub struct CsvImporter {
    column_mapping: HashMap<String, String>,
}

impl CsvImporter {
    pub fn new() -> Self {
        let mut column_mapping = HashMap::new();

        Self::add_mapping(
            &mut column_mapping,
            "athlete_id",
            &["athlete_id", "athlete", "player_id", "player"],
        );
        Self::add_mapping(&mut column_mapping, "date", &["date", "day", "session_date"]);
        Self::add_mapping(
            &mut column_mapping,
            "duration_minutes",
            &["duration_minutes", "duration", "minutes", "duration_min"],
        );
        Self::add_mapping(
            &mut column_mapping,
            "rpe_post",
            &["rpe_post", "rpe", "srpe_rating", "perceived_exertion"],
        );
        Self::add_mapping(&mut column_mapping, "metric", &["metric", "metric_name", "name"]);
        Self::add_mapping(&mut column_mapping, "value", &["value", "reading"]);

        Self { column_mapping }
    }

    fn add_mapping(mapping: &mut HashMap<String, String>, standard: &str, variations: &[&str]) {
        for variation in variations {
            mapping.insert(variation.to_lowercase(), standard.to_string());
        }
    }

    fn normalize_column_name(&self, name: &str) -> String {
        let key = name.trim().to_lowercase();
        self.column_mapping.get(&key).cloned().unwrap_or(key)
    }

    fn column_index(&self, headers: &StringRecord) -> HashMap<String, usize> {
        headers
            .iter()
            .enumerate()
            .map(|(i, header)| (self.normalize_column_name(header), i))
            .collect()
    }

    /// Read a sessions file
    pub fn import_sessions(&self, path: &Path) -> Result<SessionsByAthlete, ImportError> {
        let file = open(path)?;
        self.import_sessions_from(file, path)
    }

    /// Read sessions from any reader; `source` is used in error messages
    pub fn import_sessions_from<R: Read>(
        &self,
        reader: R,
        source: &Path,
    ) -> Result<SessionsByAthlete, ImportError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = reader
            .headers()
            .map_err(|e| parse_error(source, 1, e))?
            .clone();
        let columns = self.column_index(&headers);
        let date_col = require(&columns, "date", source)?;
        let duration_col = require(&columns, "duration_minutes", source)?;
        let rpe_col = require(&columns, "rpe_post", source)?;
        let athlete_col = columns.get("athlete_id").copied();

        let mut sessions = SessionsByAthlete::new();
        let mut rows = 0usize;

        for result in reader.records() {
            let record = result.map_err(|e| {
                let line = e.position().map(|p| p.line()).unwrap_or(0);
                parse_error(source, line, e)
            })?;
            let line = record.position().map(|p| p.line()).unwrap_or(0);

            let athlete = athlete_of(&record, athlete_col);
            let date = parse_date(field(&record, date_col), source, line)?;
            let duration = parse_number(field(&record, duration_col), "duration_minutes", source, line)?;
            let rpe = parse_number(field(&record, rpe_col), "rpe_post", source, line)?;

            let entry = SessionEntry::new(date, duration, rpe).map_err(|e| {
                warn!(path = %source.display(), line, error = %e, "Rejected session row");
                ImportError::InvalidValue {
                    path: source.to_path_buf(),
                    line,
                    reason: e.to_string(),
                }
            })?;

            sessions.entry(athlete).or_default().push(entry);
            rows += 1;
        }

        info!(
            path = %source.display(),
            rows,
            athletes = sessions.len(),
            "Imported sessions"
        );

        Ok(sessions)
    }

    /// Read a wellness file in long or wide layout
    pub fn import_wellness(&self, path: &Path) -> Result<WellnessByAthlete, ImportError> {
        let file = open(path)?;
        self.import_wellness_from(file, path)
    }

    /// Read wellness samples from any reader; `source` is used in error messages
    pub fn import_wellness_from<R: Read>(
        &self,
        reader: R,
        source: &Path,
    ) -> Result<WellnessByAthlete, ImportError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = reader
            .headers()
            .map_err(|e| parse_error(source, 1, e))?
            .clone();
        let columns = self.column_index(&headers);
        let date_col = require(&columns, "date", source)?;
        let athlete_col = columns.get("athlete_id").copied();

        let long_layout = match (columns.get("metric"), columns.get("value")) {
            (Some(&metric), Some(&value)) => Some((metric, value)),
            _ => None,
        };

        // Wide layout: every column other than id and date is a metric
        let metric_columns: Vec<(usize, String)> = headers
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != date_col && Some(*i) != athlete_col)
            .map(|(i, header)| (i, header.trim().to_lowercase()))
            .collect();

        let mut wellness = WellnessByAthlete::new();
        let mut samples = 0usize;

        for result in reader.records() {
            let record = result.map_err(|e| {
                let line = e.position().map(|p| p.line()).unwrap_or(0);
                parse_error(source, line, e)
            })?;
            let line = record.position().map(|p| p.line()).unwrap_or(0);

            let athlete = athlete_of(&record, athlete_col);
            let date = parse_date(field(&record, date_col), source, line)?;

            let readings: Vec<(String, &str)> = match long_layout {
                Some((metric_col, value_col)) => {
                    let metric = field(&record, metric_col);
                    if metric.is_empty() {
                        return Err(ImportError::InvalidValue {
                            path: source.to_path_buf(),
                            line,
                            reason: "empty metric name".to_string(),
                        });
                    }
                    vec![(metric.to_lowercase(), field(&record, value_col))]
                }
                None => metric_columns
                    .iter()
                    .filter(|(i, _)| !field(&record, *i).is_empty())
                    .map(|(i, name)| (name.clone(), field(&record, *i)))
                    .collect(),
            };

            for (metric, raw) in readings {
                let value = parse_number(raw, &metric, source, line)?;
                let sample = WellnessSample::new(date, metric, value).map_err(|e| {
                    ImportError::InvalidValue {
                        path: source.to_path_buf(),
                        line,
                        reason: e.to_string(),
                    }
                })?;
                wellness.entry(athlete.clone()).or_default().push(sample);
                samples += 1;
            }
        }

        info!(
            path = %source.display(),
            samples,
            athletes = wellness.len(),
            "Imported wellness samples"
        );

        Ok(wellness)
    }
}

impl Default for CsvImporter {
    fn default() -> Self {
        Self::new()
    }
}

fn open(path: &Path) -> Result<File, ImportError> {
    File::open(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => ImportError::FileNotFound {
            path: path.to_path_buf(),
        },
        _ => ImportError::Io {
            path: path.to_path_buf(),
            source: e,
        },
    })
}

fn require(
    columns: &HashMap<String, usize>,
    column: &str,
    source: &Path,
) -> Result<usize, ImportError> {
    columns
        .get(column)
        .copied()
        .ok_or_else(|| ImportError::MissingColumn {
            path: source.to_path_buf(),
            column: column.to_string(),
        })
}

fn field(record: &StringRecord, index: usize) -> &str {
    record.get(index).unwrap_or("")
}

fn athlete_of(record: &StringRecord, athlete_col: Option<usize>) -> String {
    athlete_col
        .map(|i| field(record, i))
        .filter(|id| !id.is_empty())
        .unwrap_or(DEFAULT_ATHLETE)
        .to_string()
}

fn parse_date(raw: &str, source: &Path, line: u64) -> Result<NaiveDate, ImportError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| ImportError::ParseError {
        path: source.to_path_buf(),
        line,
        reason: format!("invalid date '{}': {}", raw, e),
    })
}

fn parse_number(raw: &str, field: &str, source: &Path, line: u64) -> Result<f64, ImportError> {
    raw.parse::<f64>().map_err(|_| ImportError::ParseError {
        path: source.to_path_buf(),
        line,
        reason: format!("{} is not a number: '{}'", field, raw),
    })
}

fn parse_error(source: &Path, line: u64, err: csv::Error) -> ImportError {
    ImportError::ParseError {
        path: PathBuf::from(source),
        line,
        reason: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> &'static Path {
        Path::new("test.csv")
    }

    #[test]
    fn test_import_sessions_with_aliases() {
        let data = "player,day,minutes,rpe\n\
                    p1,2024-03-01,60,7\n\
                    p1,2024-03-01,30,4\n\
                    p2,2024-03-02,90,8\n";

        let sessions = CsvImporter::new()
            .import_sessions_from(data.as_bytes(), source())
            .unwrap();

        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions["p1"].len(), 2);
        assert_eq!(sessions["p1"][0].load(), 420.0);
        assert_eq!(sessions["p2"][0].rpe_post, 8.0);
    }

    #[test]
    fn test_sessions_without_athlete_column() {
        let data = "date,duration_minutes,rpe_post\n2024-03-01,45,6\n";

        let sessions = CsvImporter::new()
            .import_sessions_from(data.as_bytes(), source())
            .unwrap();

        assert_eq!(sessions[DEFAULT_ATHLETE].len(), 1);
    }

    #[test]
    fn test_negative_duration_fails_fast() {
        let data = "date,duration_minutes,rpe_post\n2024-03-01,45,6\n2024-03-02,-10,6\n";

        let err = CsvImporter::new()
            .import_sessions_from(data.as_bytes(), source())
            .unwrap_err();

        match err {
            ImportError::InvalidValue { line, .. } => assert_eq!(line, 3),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_non_numeric_value_fails_fast() {
        let data = "date,duration_minutes,rpe_post\n2024-03-01,forty,6\n";

        let err = CsvImporter::new()
            .import_sessions_from(data.as_bytes(), source())
            .unwrap_err();

        assert!(matches!(err, ImportError::ParseError { line: 2, .. }));
    }

    #[test]
    fn test_missing_column() {
        let data = "date,duration_minutes\n2024-03-01,45\n";

        let err = CsvImporter::new()
            .import_sessions_from(data.as_bytes(), source())
            .unwrap_err();

        assert!(matches!(err, ImportError::MissingColumn { ref column, .. } if column == "rpe_post"));
    }

    #[test]
    fn test_import_wellness_long_layout() {
        let data = "athlete_id,date,metric,value\n\
                    p1,2024-03-01,hrv_ms,62.5\n\
                    p1,2024-03-01,Mood,7\n";

        let wellness = CsvImporter::new()
            .import_wellness_from(data.as_bytes(), source())
            .unwrap();

        let samples = &wellness["p1"];
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].metric, "hrv_ms");
        assert_eq!(samples[1].metric, "mood");
    }

    #[test]
    fn test_import_wellness_wide_layout() {
        let data = "athlete_id,date,hrv_ms,resting_hr_bpm,soreness\n\
                    p1,2024-03-01,62,51,\n\
                    p2,2024-03-01,,48,3\n";

        let wellness = CsvImporter::new()
            .import_wellness_from(data.as_bytes(), source())
            .unwrap();

        assert_eq!(wellness["p1"].len(), 2);
        assert_eq!(wellness["p2"].len(), 2);
        assert!(wellness["p2"].iter().any(|s| s.metric == "soreness" && s.value == 3.0));
    }

    #[test]
    fn test_wellness_nan_rejected() {
        let data = "date,metric,value\n2024-03-01,hrv_ms,NaN\n";

        let err = CsvImporter::new()
            .import_wellness_from(data.as_bytes(), source())
            .unwrap_err();

        assert!(matches!(err, ImportError::InvalidValue { .. }));
    }

    #[test]
    fn test_missing_file() {
        let err = CsvImporter::new()
            .import_sessions(Path::new("/nonexistent/sessions.csv"))
            .unwrap_err();
        assert!(matches!(err, ImportError::FileNotFound { .. }));
    }
}
