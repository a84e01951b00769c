use crate::db;
use crate::ipc::error::{err, ok, HandlerErr};
use crate::ipc::helpers::{get_value, today};
use crate::ipc::types::{AppState, Request};
use crate::roster::{self, Membership, RosterEntry, Student};
use crate::schedule;
use chrono::NaiveDate;
use rusqlite::Connection;
use serde_json::json;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Confirmed rosters for `class_names`, straight from storage.
pub(super) fn live_rosters(
    conn: &Connection,
    class_names: &[String],
    today: &str,
) -> Result<BTreeMap<String, Vec<RosterEntry>>, HandlerErr> {
    let students = db::list_students(conn).map_err(HandlerErr::query)?;
    let memberships = db::list_memberships(conn).map_err(HandlerErr::query)?;
    Ok(roster::derive_class_rosters(
        &students,
        &memberships,
        class_names,
        today,
    ))
}

fn handle_upsert_student(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let mut student: Student = match get_value(&req.params, "student") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    if student.name.trim().is_empty() {
        return err(&req.id, "bad_params", "student name must not be empty", None);
    }
    if student.id.trim().is_empty() {
        student.id = Uuid::new_v4().to_string();
    }
    match db::upsert_student(conn, &student) {
        Ok(()) => ok(&req.id, json!({ "studentId": student.id })),
        Err(e) => err(&req.id, "db_insert_failed", e.to_string(), None),
    }
}

fn handle_add_membership(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let membership: Membership = match get_value(&req.params, "membership") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    if membership.class_name.trim().is_empty() {
        return err(&req.id, "bad_params", "className must not be empty", None);
    }
    match db::student_exists(conn, &membership.student_id) {
        Ok(true) => {}
        Ok(false) => {
            return err(
                &req.id,
                "not_found",
                "student not found",
                Some(json!({ "studentId": membership.student_id })),
            )
        }
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    }
    match db::add_membership(conn, &membership) {
        Ok(id) => ok(&req.id, json!({ "membershipId": id })),
        Err(e) => err(&req.id, "db_insert_failed", e.to_string(), None),
    }
}

fn class_names_param(params: &serde_json::Value) -> Result<Vec<String>, HandlerErr> {
    if let Some(name) = params.get("className").and_then(|v| v.as_str()) {
        return Ok(vec![name.to_string()]);
    }
    let names: Vec<String> = get_value(params, "classNames")?;
    if names.is_empty() {
        return Err(HandlerErr::new("bad_params", "classNames must not be empty"));
    }
    Ok(names)
}

/// Rosters as displayed, with staged moves applied on top of storage.
fn handle_roster_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let names = match class_names_param(&req.params) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let today = today(&req.params);
    let live = match live_rosters(conn, &names, &today) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };

    let rosters: Vec<_> = names
        .iter()
        .map(|name| {
            let entries = live.get(name).map(Vec::as_slice).unwrap_or(&[]);
            state.pending.display_roster(name, entries, &today)
        })
        .collect();
    ok(
        &req.id,
        json!({
            "rosters": rosters,
            "hasUnsavedChanges": state.pending.has_unsaved_changes(),
        }),
    )
}

fn handle_roster_stats(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let raw_today = today(&req.params);
    let Ok(day) = NaiveDate::parse_from_str(&raw_today, "%Y-%m-%d") else {
        return err(
            &req.id,
            "bad_params",
            "today must be YYYY-MM-DD",
            Some(json!({ "today": raw_today })),
        );
    };

    let snapshot = match db::load_snapshot(conn) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let students = match db::list_students(conn) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    let memberships = match db::list_memberships(conn) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    let classes = schedule::class_names(&snapshot);
    let stats = roster::class_stats(&students, &memberships, &classes, day);
    ok(
        &req.id,
        json!({
            "classCount": classes.len(),
            "stats": stats,
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "roster.upsertStudent" => Some(handle_upsert_student(state, req)),
        "roster.addMembership" => Some(handle_add_membership(state, req)),
        "roster.get" => Some(handle_roster_get(state, req)),
        "roster.stats" => Some(handle_roster_stats(state, req)),
        _ => None,
    }
}
