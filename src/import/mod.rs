use crate::error::ImportError;
use crate::pipeline::AthleteInput;
use crate::session::aggregate_daily_loads;
use std::collections::BTreeSet;
use std::path::Path;
use tracing::info;

pub mod csv;

pub use self::csv::{CsvImporter, SessionsByAthlete, WellnessByAthlete};

/// Athlete id used for rows that do not name one
pub const DEFAULT_ATHLETE: &str = "default";

/// Build pipeline inputs from a sessions file and an optional wellness file
///
/// Same-day sessions are summed into one daily load. Athletes that only
/// appear in one of the files still get an input with the other side empty.
/// Inputs are ordered by athlete id.
pub fn load_athletes(
    sessions_path: &Path,
    wellness_path: Option<&Path>,
) -> Result<Vec<AthleteInput>, ImportError> {
    let importer = CsvImporter::new();
    let sessions = importer.import_sessions(sessions_path)?;
    let wellness = match wellness_path {
        Some(path) => importer.import_wellness(path)?,
        None => WellnessByAthlete::new(),
    };

    let inputs = merge_athletes(sessions, wellness);
    info!(athletes = inputs.len(), "Loaded athlete inputs");
    Ok(inputs)
}

/// Join per-athlete sessions and wellness samples into pipeline inputs
pub fn merge_athletes(
    mut sessions: SessionsByAthlete,
    mut wellness: WellnessByAthlete,
) -> Vec<AthleteInput> {
    let ids: BTreeSet<String> = sessions.keys().chain(wellness.keys()).cloned().collect();

    ids.into_iter()
        .map(|id| {
            let athlete_sessions = sessions.remove(&id).unwrap_or_default();
            AthleteInput {
                daily_loads: aggregate_daily_loads(&athlete_sessions),
                wellness: wellness.remove(&id).unwrap_or_default(),
                athlete_id: id,
            }
        })
        .collect()
}
