use crate::columns::ColumnFamily;
use crate::config::{AttendanceLabels, Config};
use crate::roster::{AttendanceState, Roster};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("row {row} out of range (roster has {rows} rows)")]
    RowOutOfRange { row: usize, rows: usize },
    #[error("unknown column {0:?}")]
    UnknownColumn(String),
    #[error("session was opened on {expected:?}, not {actual:?}")]
    TableMismatch { expected: String, actual: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum CellOutcome {
    Accepted,
    /// Stored, but as the column default instead of the submitted value.
    Coerced { reason: String },
    /// Not stored; the cell keeps whatever the roster had.
    Rejected { reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Pending {
    Attendance(AttendanceState),
    Score(Option<f64>),
}

/// Pending cell edits for one form interaction. Dropping the session
/// discards every edit; nothing reaches the roster until `commit_into`.
#[derive(Debug)]
pub struct EditSession {
    table: String,
    rows: usize,
    families: BTreeMap<String, ColumnFamily>,
    labels: AttendanceLabels,
    edits: BTreeMap<(usize, String), Pending>,
}

impl EditSession {
    pub fn open(roster: &Roster, cfg: &Config) -> Self {
        let families = roster
            .dynamic_columns
            .iter()
            .map(|c| (c.clone(), ColumnFamily::infer(c)))
            .collect();
        Self {
            table: roster.table.clone(),
            rows: roster.students.len(),
            families,
            labels: cfg.attendance_labels.clone(),
            edits: BTreeMap::new(),
        }
    }

    /// Overrides the inferred family of a column the roster already has,
    /// e.g. a score item whose label happens to look like a date.
    pub fn declare(&mut self, column: &str, family: ColumnFamily) -> Result<(), SessionError> {
        match self.families.get_mut(column) {
            Some(f) => {
                *f = family;
                Ok(())
            }
            None => Err(SessionError::UnknownColumn(column.to_string())),
        }
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Validates `raw` against the column's domain and buffers it.
    ///
    /// Bad attendance input becomes Present; bad score input is dropped.
    /// Neither is an error: only addressing a cell that does not exist is.
    pub fn set(
        &mut self,
        row: usize,
        column: &str,
        raw: &Value,
    ) -> Result<CellOutcome, SessionError> {
        if row >= self.rows {
            return Err(SessionError::RowOutOfRange {
                row,
                rows: self.rows,
            });
        }
        let family = *self
            .families
            .get(column)
            .ok_or_else(|| SessionError::UnknownColumn(column.to_string()))?;

        let key = (row, column.to_string());
        let outcome = match family {
            ColumnFamily::Attendance => {
                match raw.as_str().and_then(|s| AttendanceState::parse(s, &self.labels)) {
                    Some(state) => {
                        self.edits.insert(key, Pending::Attendance(state));
                        CellOutcome::Accepted
                    }
                    None => {
                        self.edits
                            .insert(key, Pending::Attendance(AttendanceState::Present));
                        CellOutcome::Coerced {
                            reason: format!("{} is not an attendance state, using present", raw),
                        }
                    }
                }
            }
            ColumnFamily::Score => match parse_score(raw) {
                Ok(v) => {
                    self.edits.insert(key, Pending::Score(v));
                    CellOutcome::Accepted
                }
                Err(reason) => CellOutcome::Rejected { reason },
            },
        };

        if outcome != CellOutcome::Accepted {
            log::debug!("{}: row {} {:?}: {:?}", self.table, row, column, outcome);
        }
        Ok(outcome)
    }

    /// Applies every buffered edit to `roster`. All targets are checked
    /// before the first write so a bad session leaves the roster untouched.
    pub fn commit_into(self, roster: &mut Roster) -> Result<usize, SessionError> {
        if roster.table != self.table {
            return Err(SessionError::TableMismatch {
                expected: self.table,
                actual: roster.table.clone(),
            });
        }
        for (row, column) in self.edits.keys() {
            if *row >= roster.students.len() {
                return Err(SessionError::RowOutOfRange {
                    row: *row,
                    rows: roster.students.len(),
                });
            }
            if !roster.has_column(column) {
                return Err(SessionError::UnknownColumn(column.clone()));
            }
        }

        let applied = self.edits.len();
        for ((row, column), pending) in self.edits {
            let cells = &mut roster.students[row].cells;
            match pending {
                Pending::Attendance(state) => {
                    cells.insert(column, Value::String(state.label(&self.labels).to_string()));
                }
                Pending::Score(Some(v)) => {
                    cells.insert(column, Value::from(v));
                }
                Pending::Score(None) => {
                    cells.remove(&column);
                }
            }
        }
        Ok(applied)
    }
}

/// Finite number, numeric text, or explicit unset (`null` / blank text).
pub fn parse_score(raw: &Value) -> Result<Option<f64>, String> {
    let v = match raw {
        Value::Null => return Ok(None),
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let t = s.trim();
            if t.is_empty() {
                return Ok(None);
            }
            t.parse::<f64>().ok()
        }
        _ => None,
    };
    match v {
        Some(f) if f.is_finite() => Ok(Some(f)),
        _ => Err(format!("{} is not a number", raw)),
    }
}
