use crate::config::{AttendanceOnLoad, Config};
use crate::roster::{AttendanceState, Roster};
use chrono::NaiveDate;
use serde_json::Value;
use thiserror::Error;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnFamily {
    /// Keyed by ISO date, values are attendance states.
    Attendance,
    /// Keyed by test-item name, values are nullable numbers.
    Score,
}

impl ColumnFamily {
    /// Persisted tables carry no column metadata, so the family is read off
    /// the name: ISO dates are attendance, anything else is a score item.
    pub fn infer(name: &str) -> Self {
        if parse_date_key(name).is_some() {
            ColumnFamily::Attendance
        } else {
            ColumnFamily::Score
        }
    }

    /// Value a freshly created cell gets. `None` means unset.
    pub fn default_value(self, cfg: &Config) -> Option<Value> {
        match self {
            ColumnFamily::Attendance => Some(Value::String(
                AttendanceState::Present
                    .label(&cfg.attendance_labels)
                    .to_string(),
            )),
            ColumnFamily::Score => None,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ColumnError {
    #[error("attendance column must be an ISO date (YYYY-MM-DD): {0:?}")]
    NotADate(String),
    #[error("column name is blank")]
    Blank,
    #[error("{0:?} is a fixed roster column")]
    Fixed(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnsureOutcome {
    pub created: bool,
    /// Cells that received the family default.
    pub filled: usize,
}

pub fn parse_date_key(raw: &str) -> Option<NaiveDate> {
    let t = raw.trim();
    if t.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(t, DATE_FORMAT).ok()
}

/// Makes sure `name` exists as a dynamic column of `family`.
///
/// Existing values are kept. For attendance, cells that are missing (or hold
/// text that is not a known state) are defaulted to Present, unless the
/// configured policy is `ResetToPresent`, which overwrites the whole column.
/// Score cells are never filled: unset stays unset. Calling this twice has
/// the same effect as calling it once.
pub fn ensure_column(
    roster: &mut Roster,
    name: &str,
    family: ColumnFamily,
    cfg: &Config,
) -> Result<EnsureOutcome, ColumnError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ColumnError::Blank);
    }
    if roster.is_fixed_column(name) {
        return Err(ColumnError::Fixed(name.to_string()));
    }
    if family == ColumnFamily::Attendance && parse_date_key(name).is_none() {
        return Err(ColumnError::NotADate(name.to_string()));
    }

    let mut outcome = EnsureOutcome::default();
    if !roster.has_column(name) {
        roster.dynamic_columns.push(name.to_string());
        outcome.created = true;
    }

    let Some(default) = family.default_value(cfg) else {
        return Ok(outcome);
    };

    let labels = &cfg.attendance_labels;
    let reset = cfg.attendance_on_load == AttendanceOnLoad::ResetToPresent;
    for s in roster.students.iter_mut() {
        let current = AttendanceState::from_cell(s.cells.get(name), labels);
        let keep = !reset && current.is_some();
        if keep {
            continue;
        }
        if s.cells.get(name) != Some(&default) {
            s.cells.insert(name.to_string(), default.clone());
            outcome.filled += 1;
        }
    }

    if outcome.created || outcome.filled > 0 {
        log::debug!(
            "{}: ensured {:?} column {:?} (created={}, filled={})",
            roster.table,
            family,
            name,
            outcome.created,
            outcome.filled
        );
    }
    Ok(outcome)
}
