use crate::config::{AttendanceLabels, ColumnNames, GenderLabels};
use crate::normalize::normalize_seat_str;
use crate::store::Table;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceState {
    Present,
    Late,
    Absent,
    Excused,
}

impl AttendanceState {
    pub const ALL: [AttendanceState; 4] = [
        AttendanceState::Present,
        AttendanceState::Late,
        AttendanceState::Absent,
        AttendanceState::Excused,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AttendanceState::Present => "present",
            AttendanceState::Late => "late",
            AttendanceState::Absent => "absent",
            AttendanceState::Excused => "excused",
        }
    }

    /// Text stored in the sheet for this state.
    pub fn label(self, labels: &AttendanceLabels) -> &str {
        match self {
            AttendanceState::Present => &labels.present,
            AttendanceState::Late => &labels.late,
            AttendanceState::Absent => &labels.absent,
            AttendanceState::Excused => &labels.excused,
        }
    }

    /// Accepts either the configured sheet label or the wire name, ignoring
    /// case and surrounding whitespace.
    pub fn parse(raw: &str, labels: &AttendanceLabels) -> Option<Self> {
        let t = raw.trim();
        if t.is_empty() {
            return None;
        }
        Self::ALL.into_iter().find(|s| {
            t.eq_ignore_ascii_case(s.as_str()) || t.eq_ignore_ascii_case(s.label(labels))
        })
    }

    pub fn from_cell(cell: Option<&Value>, labels: &AttendanceLabels) -> Option<Self> {
        cell.and_then(|v| v.as_str())
            .and_then(|s| Self::parse(s, labels))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Student {
    pub seat_id: String,
    pub name: String,
    /// Raw gender text, never validated.
    pub gender: String,
    /// Sparse dynamic cells. A missing key means the cell is unset.
    pub cells: BTreeMap<String, Value>,
}

impl Student {
    pub fn label(&self) -> String {
        format!("{}.{}", self.seat_id, self.name)
    }

    pub fn gender_class(&self, labels: &GenderLabels) -> Gender {
        let g = self.gender.trim();
        if g.is_empty() {
            Gender::Other
        } else if g.eq_ignore_ascii_case(&labels.male) {
            Gender::Male
        } else if g.eq_ignore_ascii_case(&labels.female) {
            Gender::Female
        } else {
            Gender::Other
        }
    }

    pub fn cell(&self, column: &str) -> Option<&Value> {
        self.cells.get(column)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassSummary {
    pub male: usize,
    pub female: usize,
    pub total: usize,
}

/// In-memory copy of one class table. Built fresh on every load and owned
/// by the request that loaded it.
#[derive(Debug, Clone, PartialEq)]
pub struct Roster {
    pub table: String,
    pub fixed: ColumnNames,
    /// Dynamic column names in sheet order.
    pub dynamic_columns: Vec<String>,
    pub students: Vec<Student>,
    /// Fingerprint of the stored table this roster was loaded from.
    pub fingerprint: Option<String>,
}

impl Roster {
    pub fn empty(table: &str, fixed: &ColumnNames) -> Self {
        Self {
            table: table.to_string(),
            fixed: fixed.clone(),
            dynamic_columns: Vec::new(),
            students: Vec::new(),
            fingerprint: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.students.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.dynamic_columns.iter().any(|c| c == name)
    }

    pub fn is_fixed_column(&self, name: &str) -> bool {
        name == self.fixed.seat || name == self.fixed.name || name == self.fixed.gender
    }

    /// Row currently holding the student a client saw at `row`.
    ///
    /// The position is kept when it still holds a student with that name
    /// (and seat, if given). Otherwise the student is looked up by identity
    /// and must match exactly one row.
    pub fn locate(&self, row: usize, seat_id: Option<&str>, name: &str) -> Option<usize> {
        let name = name.trim();
        let seat = seat_id.map(normalize_seat_str);
        let same = |s: &Student| {
            s.name == name && seat.as_deref().map_or(true, |id| s.seat_id == id)
        };

        if self.students.get(row).is_some_and(|s| same(s)) {
            return Some(row);
        }
        let mut found = self
            .students
            .iter()
            .enumerate()
            .filter(|(_, s)| same(*s))
            .map(|(i, _)| i);
        match (found.next(), found.next()) {
            (Some(i), None) => Some(i),
            _ => None,
        }
    }

    pub fn summary(&self, labels: &GenderLabels) -> ClassSummary {
        let mut summary = ClassSummary {
            total: self.students.len(),
            ..ClassSummary::default()
        };
        for s in &self.students {
            match s.gender_class(labels) {
                Gender::Male => summary.male += 1,
                Gender::Female => summary.female += 1,
                Gender::Other => {}
            }
        }
        summary
    }

    /// The whole roster as a table: fixed columns first, then every dynamic
    /// column. Unset cells are written as null.
    pub fn to_table(&self) -> Table {
        let mut header = vec![
            self.fixed.seat.clone(),
            self.fixed.name.clone(),
            self.fixed.gender.clone(),
        ];
        header.extend(self.dynamic_columns.iter().cloned());

        let rows = self
            .students
            .iter()
            .map(|s| {
                let mut row = vec![
                    Value::String(s.seat_id.clone()),
                    Value::String(s.name.clone()),
                    Value::String(s.gender.clone()),
                ];
                row.extend(
                    self.dynamic_columns
                        .iter()
                        .map(|c| s.cells.get(c).cloned().unwrap_or(Value::Null)),
                );
                row
            })
            .collect();

        Table { header, rows }
    }
}
