use crate::db::{self, RenameError};
use crate::ipc::error::{err, ok, HandlerErr};
use crate::ipc::helpers::{get_bool, get_required_str};
use crate::ipc::types::{AppState, Request};
use crate::taxonomy::{LevelTaxonomy, RenamePlan, TransitionKind};
use rusqlite::Connection;
use serde_json::json;

fn plan_from_params(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<(LevelTaxonomy, RenamePlan), HandlerErr> {
    let name = get_required_str(params, "name")?;
    let kind_raw = get_required_str(params, "kind")?;
    let Some(kind) = TransitionKind::parse(&kind_raw) else {
        return Err(HandlerErr::new(
            "bad_params",
            format!("unknown kind: {}", kind_raw),
        ));
    };
    let taxonomy = db::load_config(conn)
        .map_err(HandlerErr::query)?
        .taxonomy();
    let plan = taxonomy
        .plan_transition(&name, kind)
        .map_err(|e| HandlerErr {
            code: "level_rejected",
            message: e.to_string(),
            details: Some(json!({ "name": name, "kind": kind })),
        })?;
    Ok((taxonomy, plan))
}

fn handle_levels_preview(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let (taxonomy, plan) = match plan_from_params(conn, &req.params) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let name = plan.old_name.as_str();
    ok(
        &req.id,
        json!({
            "plan": plan,
            "canNumberLevelUp": taxonomy.can_number_level_up(name),
            "canNumberLevelDown": taxonomy.can_number_level_down(name),
            "isMaxLevel": taxonomy.is_max_level(name),
            "isMinLevel": taxonomy.is_min_level(name),
        }),
    )
}

fn handle_levels_rename(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    if !get_bool(&req.params, "confirmed") {
        return err(&req.id, "not_confirmed", "rename must be confirmed", None);
    }
    if !state.pending.is_empty() {
        return err(
            &req.id,
            "pending_moves",
            "commit or cancel staged moves before renaming a class",
            Some(json!({ "pendingMoves": state.pending.len() })),
        );
    }
    let (_, plan) = match plan_from_params(conn, &req.params) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };

    match db::rename_class(conn, &plan.old_name, &plan.new_name) {
        Ok(outcome) => ok(&req.id, json!({ "plan": plan, "outcome": outcome })),
        Err(RenameError::Collision(name)) => err(
            &req.id,
            "rename_collision",
            format!("a class named {} already exists", name),
            Some(json!({ "newName": name })),
        ),
        Err(e @ RenameError::NothingToUpdate(_)) => {
            err(&req.id, "nothing_to_update", e.to_string(), None)
        }
        Err(e) => {
            tracing::error!(error = %e, old = %plan.old_name, "rename failed");
            err(&req.id, "db_tx_failed", e.to_string(), None)
        }
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "levels.preview" => Some(handle_levels_preview(state, req)),
        "levels.rename" => Some(handle_levels_rename(state, req)),
        _ => None,
    }
}
