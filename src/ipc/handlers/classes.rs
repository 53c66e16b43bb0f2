use crate::ipc::error::ok;
use crate::ipc::helpers::{state_options, today};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_classes_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let cfg = &state.config;
    ok(
        &req.id,
        json!({
            "classes": cfg.classes,
            "defaultClass": cfg.classes.first(),
            "today": today(),
            "attendanceStates": state_options(cfg),
            "suggestedItems": cfg.suggested_items,
            "customItemDefault": cfg.custom_item_default,
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "classes.list" => Some(handle_classes_list(state, req)),
        _ => None,
    }
}
