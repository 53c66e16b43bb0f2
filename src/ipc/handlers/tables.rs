use crate::config::Purpose;
use crate::ipc::error::{respond, HandlerErr};
use crate::ipc::helpers::{get_required_str, require_class, store_and_config};
use crate::ipc::types::{AppState, Request};
use crate::store::{ReadMode, Store, Table};
use serde_json::json;

fn tables_list(state: &mut AppState) -> Result<serde_json::Value, HandlerErr> {
    let (store, _) = store_and_config(state)?;
    let sheets = store
        .list_sheets()
        .map_err(|e| HandlerErr::new("db_query_failed", format!("{:#}", e)))?;
    Ok(json!({ "tables": sheets }))
}

/// Full replace of a stored table, used to seed class lists.
fn tables_write(
    state: &mut AppState,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let (store, _) = store_and_config(state)?;
    let name = get_required_str(params, "table")?.trim().to_string();
    if name.is_empty() {
        return Err(HandlerErr::new("bad_params", "table must not be empty"));
    }
    let table: Table = serde_json::from_value(json!({
        "header": params.get("header").cloned().unwrap_or(serde_json::Value::Null),
        "rows": params.get("rows").cloned().unwrap_or_else(|| json!([])),
    }))
    .map_err(|e| HandlerErr::new("bad_params", format!("invalid table: {}", e)))?;

    store.write_table(&name, &table).map_err(|e| {
        HandlerErr::new("commit_failed", format!("{:#}", e)).with_details(json!({ "table": name }))
    })?;
    log::info!("table {} replaced ({} rows)", name, table.rows.len());
    Ok(json!({
        "table": name,
        "rows": table.rows.len(),
        "fingerprint": table.fingerprint(),
    }))
}

/// Raw view of both class tables for the overview screen.
fn tables_preview(
    state: &mut AppState,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let (store, cfg) = store_and_config(state)?;
    let class_id = require_class(cfg, params)?;

    let mut warnings = Vec::new();
    let mut out = serde_json::Map::new();
    for (key, purpose) in [("attendance", Purpose::Attendance), ("scores", Purpose::Scores)] {
        let name = cfg.table_name(&class_id, purpose);
        match store.read_table(&name, ReadMode::AllowCached) {
            Ok(table) => {
                out.insert(
                    key.to_string(),
                    json!({
                        "table": name,
                        "header": table.header,
                        "rows": table.rows,
                        "fingerprint": table.fingerprint(),
                    }),
                );
            }
            Err(e) => {
                log::warn!("preview of {} failed: {:#}", name, e);
                warnings.push(format!("could not load table {}: {:#}", name, e));
                out.insert(key.to_string(), serde_json::Value::Null);
            }
        }
    }
    out.insert("classId".to_string(), json!(class_id));
    out.insert("warnings".to_string(), json!(warnings));
    Ok(serde_json::Value::Object(out))
}

fn handle_tables_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    respond(&req.id, tables_list(state))
}

fn handle_tables_write(state: &mut AppState, req: &Request) -> serde_json::Value {
    respond(&req.id, tables_write(state, &req.params))
}

fn handle_tables_preview(state: &mut AppState, req: &Request) -> serde_json::Value {
    respond(&req.id, tables_preview(state, &req.params))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "tables.list" => Some(handle_tables_list(state, req)),
        "tables.write" => Some(handle_tables_write(state, req)),
        "tables.preview" => Some(handle_tables_preview(state, req)),
        _ => None,
    }
}
