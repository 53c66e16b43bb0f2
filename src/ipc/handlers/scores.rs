use crate::columns::ColumnFamily;
use crate::config::Purpose;
use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::helpers::{
    get_optional_str, open_column, parse_edits, require_class, store_and_config, student_json,
    submit_column,
};
use crate::ipc::types::{AppState, Request};
use crate::session::parse_score;
use serde_json::json;

fn require_item(params: &serde_json::Value) -> Result<String, HandlerErr> {
    get_optional_str(params, "item")
        .ok_or_else(|| HandlerErr::new("bad_params", "missing item"))
}

fn scores_open(
    state: &mut AppState,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let (store, cfg) = store_and_config(state)?;
    let class_id = require_class(cfg, params)?;
    let item = require_item(params)?;
    let table = cfg.table_name(&class_id, Purpose::Scores);

    let opened = open_column(store, cfg, &table, &item, ColumnFamily::Score)?;
    let roster = &opened.roster;
    let rows: Vec<serde_json::Value> = roster
        .students
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let mut row = student_json(i, s, cfg);
            // Text left in a score cell by hand shows as unset.
            let score = s
                .cell(&item)
                .and_then(|v| parse_score(v).ok().flatten());
            row["score"] = json!(score);
            row
        })
        .collect();

    Ok(json!({
        "classId": class_id,
        "table": table,
        "item": item,
        "suggested": cfg.suggested_items.contains(&item),
        "summary": roster.summary(&cfg.gender_labels),
        "rows": rows,
        "fingerprint": roster.fingerprint,
        "warning": opened.warning,
    }))
}

fn scores_submit(
    state: &mut AppState,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let (store, cfg) = store_and_config(state)?;
    let class_id = require_class(cfg, params)?;
    let item = require_item(params)?;
    let table = cfg.table_name(&class_id, Purpose::Scores);
    let scores = parse_edits(params, "scores", "value")?;

    submit_column(store, cfg, &table, &item, ColumnFamily::Score, scores)
}

fn handle_scores_open(state: &mut AppState, req: &Request) -> serde_json::Value {
    respond(&req.id, scores_open(state, &req.params))
}

fn handle_scores_submit(state: &mut AppState, req: &Request) -> serde_json::Value {
    respond(&req.id, scores_submit(state, &req.params))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "scores.open" => Some(handle_scores_open(state, req)),
        "scores.submit" => Some(handle_scores_submit(state, req)),
        _ => None,
    }
}
