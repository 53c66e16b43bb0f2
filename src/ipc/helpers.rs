use crate::columns::{ensure_column, ColumnError, ColumnFamily};
use crate::commit::{commit, CommitError};
use crate::config::Config;
use crate::db::SqliteStore;
use crate::ipc::error::HandlerErr;
use crate::ipc::types::AppState;
use crate::loader::load_roster;
use crate::roster::{AttendanceState, Roster, Student};
use crate::session::{CellOutcome, EditSession, SessionError};
use serde_json::json;

pub fn get_required_str(params: &serde_json::Value, key: &str) -> Result<String, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| HandlerErr::new("bad_params", format!("missing {}", key)))
}

pub fn get_optional_str(params: &serde_json::Value, key: &str) -> Option<String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub fn store_and_config(state: &mut AppState) -> Result<(&mut SqliteStore, &Config), HandlerErr> {
    let AppState { store, config, .. } = state;
    let store = store
        .as_mut()
        .ok_or_else(|| HandlerErr::new("no_workspace", "select a workspace first"))?;
    Ok((store, config))
}

pub fn require_class(cfg: &Config, params: &serde_json::Value) -> Result<String, HandlerErr> {
    let class_id = get_required_str(params, "classId")?;
    if !cfg.has_class(&class_id) {
        return Err(HandlerErr::new("not_found", "class not found")
            .with_details(json!({ "classId": class_id })));
    }
    Ok(class_id)
}

pub fn today() -> String {
    chrono::Local::now()
        .date_naive()
        .format(crate::columns::DATE_FORMAT)
        .to_string()
}

/// One submitted cell, with the identity the client saw at `row` on open.
#[derive(Debug, Clone)]
pub struct RowEdit {
    pub row: usize,
    pub seat_id: Option<String>,
    pub name: String,
    pub value: serde_json::Value,
}

/// Reads `[{row, name, seatId?, <value_key>}]` from `params[list_key]`.
pub fn parse_edits(
    params: &serde_json::Value,
    list_key: &str,
    value_key: &str,
) -> Result<Vec<RowEdit>, HandlerErr> {
    let Some(items) = params.get(list_key).and_then(|v| v.as_array()) else {
        return Err(HandlerErr::new("bad_params", format!("missing {}", list_key)));
    };
    let mut out = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let row = item
            .get("row")
            .and_then(|v| v.as_u64())
            .ok_or_else(|| {
                HandlerErr::new("bad_params", format!("{}[{}].row must be a number", list_key, i))
            })?;
        let name = get_optional_str(item, "name").ok_or_else(|| {
            HandlerErr::new("bad_params", format!("{}[{}].name is required", list_key, i))
        })?;
        out.push(RowEdit {
            row: row as usize,
            seat_id: get_optional_str(item, "seatId"),
            name,
            value: item.get(value_key).cloned().unwrap_or(serde_json::Value::Null),
        });
    }
    Ok(out)
}

/// Maps each edit onto the row its student occupies in the fresh roster.
/// Fails without touching anything if any student can no longer be found.
fn resolve_rows(roster: &Roster, edits: &[RowEdit]) -> Result<Vec<usize>, HandlerErr> {
    let mut rows = Vec::with_capacity(edits.len());
    let mut missing = Vec::new();
    for e in edits {
        match roster.locate(e.row, e.seat_id.as_deref(), &e.name) {
            Some(row) => {
                if row != e.row {
                    log::info!(
                        "{}: {:?} moved from row {} to {}",
                        roster.table,
                        e.name,
                        e.row,
                        row
                    );
                }
                rows.push(row);
            }
            None => missing.push(json!({ "row": e.row, "seatId": e.seat_id, "name": e.name })),
        }
    }
    if !missing.is_empty() {
        return Err(HandlerErr::new(
            "row_mismatch",
            "students changed since the table was opened; reopen and try again",
        )
        .with_details(json!({ "table": roster.table, "rows": missing })));
    }
    Ok(rows)
}

pub fn state_options(cfg: &Config) -> Vec<serde_json::Value> {
    AttendanceState::ALL
        .iter()
        .map(|s| json!({ "state": s, "label": s.label(&cfg.attendance_labels) }))
        .collect()
}

pub fn student_json(row: usize, s: &Student, cfg: &Config) -> serde_json::Value {
    json!({
        "row": row,
        "seatId": s.seat_id,
        "name": s.name,
        "label": s.label(),
        "gender": s.gender_class(&cfg.gender_labels),
    })
}

pub fn column_err(e: ColumnError) -> HandlerErr {
    HandlerErr::new("column_invalid", e.to_string())
}

pub fn session_err(e: SessionError) -> HandlerErr {
    HandlerErr::new("bad_params", e.to_string())
}

pub fn commit_err(e: CommitError) -> HandlerErr {
    let CommitError::Backend { ref table, .. } = e;
    let details = json!({ "table": table });
    HandlerErr::new("commit_failed", e.to_string()).with_details(details)
}

pub struct OpenedColumn {
    pub roster: Roster,
    pub warning: Option<String>,
}

/// Loads `table` fresh and materializes `column` in memory. Nothing is
/// written; a load failure comes back as an empty roster plus warning.
pub fn open_column(
    store: &mut SqliteStore,
    cfg: &Config,
    table: &str,
    column: &str,
    family: ColumnFamily,
) -> Result<OpenedColumn, HandlerErr> {
    let loaded = load_roster(store, table, cfg);
    let mut roster = loaded.roster;
    if loaded.warning.is_none() {
        ensure_column(&mut roster, column, family, cfg).map_err(column_err)?;
    }
    Ok(OpenedColumn {
        roster,
        warning: loaded.warning,
    })
}

/// One submit: fresh load, ensure the column, match edits to students,
/// buffer them in a session, merge, write the whole table back.
pub fn submit_column(
    store: &mut SqliteStore,
    cfg: &Config,
    table: &str,
    column: &str,
    family: ColumnFamily,
    edits: Vec<RowEdit>,
) -> Result<serde_json::Value, HandlerErr> {
    let loaded = load_roster(store, table, cfg);
    if let Some(warning) = loaded.warning {
        // Writing the empty fallback would wipe the table.
        return Err(HandlerErr::new("load_failed", warning)
            .with_details(json!({ "table": table })));
    }
    let mut roster = loaded.roster;
    if roster.is_empty() {
        log::warn!("{}: no students with a name, writing header only", table);
    }
    let column = column.trim();
    ensure_column(&mut roster, column, family, cfg).map_err(column_err)?;

    let rows = resolve_rows(&roster, &edits)?;

    let mut session = EditSession::open(&roster, cfg);
    session.declare(column, family).map_err(session_err)?;

    let mut coerced = Vec::new();
    let mut rejected = Vec::new();
    for (row, edit) in rows.into_iter().zip(&edits) {
        match session.set(row, column, &edit.value).map_err(session_err)? {
            CellOutcome::Accepted => {}
            CellOutcome::Coerced { reason } => {
                coerced.push(json!({ "row": row, "name": edit.name, "reason": reason }))
            }
            CellOutcome::Rejected { reason } => {
                rejected.push(json!({ "row": row, "name": edit.name, "reason": reason }))
            }
        }
    }
    if session.is_empty() {
        log::debug!("{}: no cell edits, writing column {:?} as materialized", table, column);
    } else {
        log::debug!("{}: {} pending edits for {:?}", table, session.len(), column);
    }
    let applied = session.commit_into(&mut roster).map_err(session_err)?;
    let receipt = commit(store, &roster).map_err(commit_err)?;

    Ok(json!({
        "table": receipt.table,
        "column": column,
        "rows": receipt.rows,
        "columns": receipt.columns,
        "fingerprint": receipt.fingerprint,
        "applied": applied,
        "coerced": coerced,
        "rejected": rejected,
    }))
}
