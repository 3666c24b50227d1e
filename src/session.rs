//! Session load (sRPE) aggregation
//!
//! Session load is the atomic unit of training stress:
//! `load = duration_minutes x rpe_post`. [`SessionEntry::new`] only rejects
//! negative and non-finite inputs; [`validate_session`] also bounds the RPE
//! to 0-10 for values typed at the command line.

use crate::error::{LoadWatchError, Result};
use crate::models::{DailyLoad, SessionEntry};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::debug;

/// Compute the load of a single session
pub fn compute_session_load(duration_minutes: f64, rpe_post: f64) -> f64 {
    duration_minutes * rpe_post
}

impl SessionEntry {
    /// Session load of this entry
    pub fn load(&self) -> f64 {
        compute_session_load(self.duration_minutes, self.rpe_post)
    }
}

/// Upper end of the post-session RPE scale
pub const RPE_MAX: f64 = 10.0;

/// Build a session from values entered by a user
///
/// Applies the 0-10 RPE bound on top of [`SessionEntry::new`]. Every
/// rejection is reported as [`LoadWatchError::Validation`].
pub fn validate_session(date: NaiveDate, duration_minutes: f64, rpe_post: f64) -> Result<SessionEntry> {
    if rpe_post > RPE_MAX {
        return Err(LoadWatchError::Validation(format!(
            "rpe_post must be between 0 and {}, got {}",
            RPE_MAX, rpe_post
        )));
    }

    SessionEntry::new(date, duration_minutes, rpe_post)
        .map_err(|e| LoadWatchError::Validation(e.to_string()))
}

/// Sum session loads per calendar day
///
/// Returns one `DailyLoad` per date that had at least one session, in
/// ascending date order. Days without sessions are not filled in.
pub fn aggregate_daily_loads(sessions: &[SessionEntry]) -> Vec<DailyLoad> {
    let mut totals: BTreeMap<NaiveDate, f64> = BTreeMap::new();

    for session in sessions {
        *totals.entry(session.date).or_insert(0.0) += session.load();
    }

    debug!(
        sessions = sessions.len(),
        days = totals.len(),
        "Aggregated session loads"
    );

    totals
        .into_iter()
        .map(|(date, load)| DailyLoad { date, load })
        .collect()
}
