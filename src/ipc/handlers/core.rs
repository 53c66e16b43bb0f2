use crate::config::{self, Config};
use crate::db::SqliteStore;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use std::path::PathBuf;
use std::time::Duration;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string())
        }),
    )
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let p = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let Some(path) = p else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };

    // A broken config file must not prevent the workspace from opening.
    let cfg = match config::load_config(&path) {
        Ok(cfg) => cfg,
        Err(e) => {
            log::warn!("using default config: {:#}", e);
            Config::default()
        }
    };

    match SqliteStore::open(&path, Duration::from_secs(cfg.preview_cache_secs)) {
        Ok(store) => {
            log::info!(
                "workspace {} opened ({} classes, {:?} table naming)",
                path.to_string_lossy(),
                cfg.classes.len(),
                cfg.table_naming
            );
            state.workspace = Some(path.clone());
            state.store = Some(store);
            state.config = cfg;
            ok(&req.id, json!({ "workspacePath": path.to_string_lossy() }))
        }
        Err(e) => err(&req.id, "db_open_failed", format!("{e:?}"), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        _ => None,
    }
}
