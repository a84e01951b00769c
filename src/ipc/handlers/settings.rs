use crate::config::TimetableConfig;
use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_settings_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match db::load_config(conn) {
        Ok(cfg) => ok(&req.id, json!({ "config": cfg })),
        Err(e) => err(&req.id, "db_query_failed", e.to_string(), None),
    }
}

/// Shallow-merges `params.patch` over the stored config.
fn handle_settings_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(patch) = req.params.get("patch").and_then(|v| v.as_object()) else {
        return err(&req.id, "bad_params", "missing patch", None);
    };

    let current = match db::load_config(conn) {
        Ok(cfg) => cfg,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let mut merged = match serde_json::to_value(&current) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "server_error", e.to_string(), None),
    };
    if let Some(obj) = merged.as_object_mut() {
        for (k, v) in patch {
            obj.insert(k.clone(), v.clone());
        }
    }
    let next: TimetableConfig = match serde_json::from_value(merged) {
        Ok(cfg) => cfg,
        Err(e) => return err(&req.id, "bad_params", format!("invalid patch: {}", e), None),
    };
    if let Err(message) = next.validate() {
        return err(&req.id, "bad_params", message, None);
    }

    if let Err(e) = db::save_config(conn, &next) {
        return err(&req.id, "db_update_failed", e.to_string(), None);
    }
    tracing::info!(keys = patch.len(), "config updated");
    ok(&req.id, json!({ "config": next }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "settings.get" => Some(handle_settings_get(state, req)),
        "settings.update" => Some(handle_settings_update(state, req)),
        _ => None,
    }
}
