use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::handlers::roster::live_rosters;
use crate::ipc::helpers::{get_bool, get_required_str, today};
use crate::ipc::types::{AppState, Request};
use crate::overlay::PendingMove;
use serde_json::json;

fn pending_json(state: &AppState) -> serde_json::Value {
    let moves: Vec<&PendingMove> = state.pending.iter().collect();
    json!({
        "moves": moves,
        "hasUnsavedChanges": state.pending.has_unsaved_changes(),
    })
}

fn handle_moves_stage(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let (student_id, from, to) = match (
        get_required_str(&req.params, "studentId"),
        get_required_str(&req.params, "fromClass"),
        get_required_str(&req.params, "toClass"),
    ) {
        (Ok(s), Ok(f), Ok(t)) => (s, f, t),
        (Err(e), _, _) | (_, Err(e), _) | (_, _, Err(e)) => return e.response(&req.id),
    };
    let today = today(&req.params);

    // A student already staged out of a class is looked up in that original class.
    let source = state
        .pending
        .get(&student_id)
        .map(|m| m.from_class.clone())
        .unwrap_or_else(|| from.clone());
    let live = match live_rosters(conn, std::slice::from_ref(&source), &today) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let Some(student) = live
        .get(&source)
        .and_then(|list| list.iter().find(|s| s.student_id == student_id))
        .cloned()
    else {
        return err(
            &req.id,
            "not_found",
            "student is not in the source class",
            Some(json!({ "studentId": student_id, "fromClass": source })),
        );
    };

    state.pending.move_student(student, &from, &to);
    tracing::debug!(student_id = %student_id, from = %from, to = %to, "move staged");
    ok(&req.id, pending_json(state))
}

fn handle_moves_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(&req.id, pending_json(state))
}

fn handle_moves_cancel(state: &mut AppState, req: &Request) -> serde_json::Value {
    if state.pending.is_empty() {
        return ok(&req.id, json!({ "cancelled": false }));
    }
    if !state.pending.cancel(get_bool(&req.params, "confirmed")) {
        return err(
            &req.id,
            "not_confirmed",
            "discarding staged moves must be confirmed",
            Some(json!({ "pendingMoves": state.pending.len() })),
        );
    }
    ok(&req.id, json!({ "cancelled": true }))
}

fn handle_moves_commit(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let today = today(&req.params);
    let result = state
        .pending
        .commit_with(&today, |op| db::apply_move(conn, op).map(|_| ()));
    match result {
        Ok(ops) => {
            tracing::info!(count = ops.len(), "staged moves committed");
            ok(&req.id, json!({ "committed": ops.len(), "operations": ops }))
        }
        Err(e) => err(
            &req.id,
            "db_commit_failed",
            e.to_string(),
            Some(json!({ "pendingMoves": state.pending.len() })),
        ),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "moves.stage" => Some(handle_moves_stage(state, req)),
        "moves.list" => Some(handle_moves_list(state, req)),
        "moves.cancel" => Some(handle_moves_cancel(state, req)),
        "moves.commit" => Some(handle_moves_commit(state, req)),
        _ => None,
    }
}
