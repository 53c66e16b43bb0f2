use crate::columns::ColumnFamily;
use crate::config::Purpose;
use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::helpers::{
    get_optional_str, get_required_str, open_column, parse_edits, require_class,
    state_options, store_and_config, student_json, submit_column, today,
};
use crate::ipc::types::{AppState, Request};
use crate::roster::AttendanceState;
use serde_json::json;

fn attendance_open(
    state: &mut AppState,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let (store, cfg) = store_and_config(state)?;
    let class_id = require_class(cfg, params)?;
    let date = get_optional_str(params, "date").unwrap_or_else(today);
    let table = cfg.table_name(&class_id, Purpose::Attendance);

    let opened = open_column(store, cfg, &table, &date, ColumnFamily::Attendance)?;
    let roster = &opened.roster;
    let rows: Vec<serde_json::Value> = roster
        .students
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let mut row = student_json(i, s, cfg);
            let current = AttendanceState::from_cell(s.cell(&date), &cfg.attendance_labels)
                .unwrap_or(AttendanceState::Present);
            row["state"] = json!(current);
            row
        })
        .collect();

    Ok(json!({
        "classId": class_id,
        "table": table,
        "date": date,
        "summary": roster.summary(&cfg.gender_labels),
        "options": state_options(cfg),
        "rows": rows,
        "fingerprint": roster.fingerprint,
        "warning": opened.warning,
    }))
}

fn attendance_submit(
    state: &mut AppState,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let (store, cfg) = store_and_config(state)?;
    let class_id = require_class(cfg, params)?;
    let date = get_required_str(params, "date")?;
    let table = cfg.table_name(&class_id, Purpose::Attendance);
    let marks = parse_edits(params, "marks", "state")?;

    submit_column(store, cfg, &table, &date, ColumnFamily::Attendance, marks)
}

fn handle_attendance_open(state: &mut AppState, req: &Request) -> serde_json::Value {
    respond(&req.id, attendance_open(state, &req.params))
}

fn handle_attendance_submit(state: &mut AppState, req: &Request) -> serde_json::Value {
    respond(&req.id, attendance_submit(state, &req.params))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "attendance.open" => Some(handle_attendance_open(state, req)),
        "attendance.submit" => Some(handle_attendance_submit(state, req)),
        _ => None,
    }
}
