use crate::config::{ColumnNames, Config};
use crate::normalize::normalize_seat_id;
use crate::roster::{Roster, Student};
use crate::store::{ReadMode, Store, Table};
use anyhow::anyhow;
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct LoadOutcome {
    pub roster: Roster,
    /// Set when the load failed and `roster` is the empty fallback.
    pub warning: Option<String>,
}

/// Fresh read of `table` into a Roster. Never fails: any backend or schema
/// problem yields an empty roster plus a warning for the caller to show.
pub fn load_roster(store: &mut dyn Store, table: &str, cfg: &Config) -> LoadOutcome {
    let result = store
        .read_table(table, ReadMode::Fresh)
        .and_then(|raw| build_roster(table, &raw, &cfg.columns));
    match result {
        Ok(roster) => {
            log::debug!(
                "loaded {}: {} students, {} dynamic columns",
                table,
                roster.students.len(),
                roster.dynamic_columns.len()
            );
            LoadOutcome {
                roster,
                warning: None,
            }
        }
        Err(e) => {
            log::warn!("load of {} failed: {:#}", table, e);
            LoadOutcome {
                roster: Roster::empty(table, &cfg.columns),
                warning: Some(format!("could not load table {}: {:#}", table, e)),
            }
        }
    }
}

pub fn build_roster(name: &str, raw: &Table, fixed: &ColumnNames) -> anyhow::Result<Roster> {
    let name_idx = raw
        .column_index(&fixed.name)
        .ok_or_else(|| anyhow!("missing required column {:?}", fixed.name))?;
    let seat_idx = raw.column_index(&fixed.seat);
    let gender_idx = raw.column_index(&fixed.gender);

    // A commit rewrites the header from the roster, so a column the roster
    // cannot key by name would be lost on the next write.
    for (i, h) in raw.header.iter().enumerate() {
        if h.trim().is_empty() {
            return Err(anyhow!("column {} has no name", i + 1));
        }
        if raw.header[..i].contains(h) {
            return Err(anyhow!("column {:?} appears more than once", h));
        }
    }

    let dynamic: Vec<(usize, String)> = raw
        .header
        .iter()
        .enumerate()
        .filter(|(_, h)| *h != &fixed.name && *h != &fixed.seat && *h != &fixed.gender)
        .map(|(i, h)| (i, h.clone()))
        .collect();

    let mut students = Vec::new();
    for row in 0..raw.rows.len() {
        let student_name = cell_text(raw.cell(row, name_idx));
        if student_name.is_empty() {
            continue;
        }
        let seat_id = seat_idx
            .map(|i| normalize_seat_id(raw.cell(row, i)))
            .unwrap_or_default();
        let gender = gender_idx
            .map(|i| cell_text(raw.cell(row, i)))
            .unwrap_or_default();

        let mut cells = BTreeMap::new();
        for (i, col) in &dynamic {
            let v = raw.cell(row, *i);
            if is_blank(v) {
                continue;
            }
            cells.insert(col.clone(), v.clone());
        }

        students.push(Student {
            seat_id,
            name: student_name,
            gender,
            cells,
        });
    }

    Ok(Roster {
        table: name.to_string(),
        fixed: fixed.clone(),
        dynamic_columns: dynamic.into_iter().map(|(_, c)| c).collect(),
        students,
        fingerprint: Some(raw.fingerprint()),
    })
}

fn cell_text(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::String(s) => s.trim().to_string(),
        other => other.to_string(),
    }
}

fn is_blank(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use serde_json::json;

    fn class_402() -> Table {
        Table {
            header: vec![
                "seat".into(),
                "name".into(),
                "gender".into(),
                "2024-04-30".into(),
            ],
            rows: vec![
                vec![json!(1.0), json!("Amy"), json!("female"), json!("Late")],
                vec![json!("5"), json!(""), json!("male"), json!("Present")],
                vec![json!("2.0"), json!("Ben"), json!("male"), Value::Null],
                vec![Value::Null, Value::Null, Value::Null],
            ],
        }
    }

    #[test]
    fn drops_nameless_rows_and_normalizes_seats() {
        let mut store = MemoryStore::with_table("402", class_402());
        let out = load_roster(&mut store, "402", &Config::default());
        assert!(out.warning.is_none());
        let r = out.roster;
        assert_eq!(r.students.len(), 2);
        assert_eq!(r.students[0].seat_id, "1");
        assert_eq!(r.students[1].seat_id, "2");
        assert_eq!(r.students[1].name, "Ben");
        assert!(r.students.iter().all(|s| !s.name.is_empty()));
        assert_eq!(r.dynamic_columns, vec!["2024-04-30"]);
        assert_eq!(r.students[0].cell("2024-04-30"), Some(&json!("Late")));
        assert_eq!(r.students[1].cell("2024-04-30"), None);
    }

    #[test]
    fn missing_table_is_soft_failure() {
        let mut store = MemoryStore::default();
        let out = load_roster(&mut store, "999", &Config::default());
        assert!(out.roster.is_empty());
        assert_eq!(out.roster.table, "999");
        assert!(out.warning.expect("warning").contains("999"));
    }

    #[test]
    fn missing_name_column_is_soft_failure() {
        let table = Table {
            header: vec!["seat".into(), "gender".into()],
            rows: vec![vec![json!("1"), json!("male")]],
        };
        let mut store = MemoryStore::with_table("402", table);
        let out = load_roster(&mut store, "402", &Config::default());
        assert!(out.roster.is_empty());
        assert!(out.warning.is_some());
    }

    #[test]
    fn every_load_reads_the_store() {
        let mut store = MemoryStore::with_table("402", class_402());
        let cfg = Config::default();
        let _ = load_roster(&mut store, "402", &cfg);
        store
            .tables
            .get_mut("402")
            .expect("table")
            .rows[0][1] = json!("Amelia");
        let second = load_roster(&mut store, "402", &cfg);
        assert_eq!(store.reads, 2);
        assert_eq!(second.roster.students[0].name, "Amelia");
    }

    #[test]
    fn unnamed_or_repeated_headers_fail_the_load() {
        let cfg = Config::default();
        for header in [
            vec!["seat", "name", "gender", "800m", "800m"],
            vec!["seat", "name", "gender", "800m", ""],
            vec!["seat", "name", "name"],
        ] {
            let width = header.len();
            let table = Table {
                header: header.into_iter().map(String::from).collect(),
                rows: vec![vec![json!("1"); width]],
            };
            let mut store = MemoryStore::with_table("402", table);
            let out = load_roster(&mut store, "402", &cfg);
            assert!(out.roster.is_empty());
            assert!(out.warning.is_some());
        }
    }

    #[test]
    fn optional_fixed_columns_may_be_absent() {
        let table = Table {
            header: vec!["name".into(), "800m".into()],
            rows: vec![vec![json!("Amy"), json!(0)]],
        };
        let roster = build_roster("t", &table, &ColumnNames::default()).expect("build");
        assert_eq!(roster.students[0].seat_id, "");
        assert_eq!(roster.students[0].gender, "");
        assert_eq!(roster.students[0].cell("800m"), Some(&json!(0)));
    }
}
