use crate::aggregate::{self, ClassDescriptor};
use crate::db;
use crate::ipc::error::{err, ok, HandlerErr};
use crate::ipc::helpers::get_value;
use crate::ipc::types::{AppState, Request};
use crate::schedule::Snapshot;
use crate::slot_key;
use rusqlite::Connection;
use serde_json::json;

fn handle_schedule_replace(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let snapshot: Snapshot = match get_value(&req.params, "cells") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let classes: Vec<db::ClassUpsert> = match req.params.get("classes") {
        None => Vec::new(),
        Some(_) => match get_value(&req.params, "classes") {
            Ok(v) => v,
            Err(e) => return e.response(&req.id),
        },
    };

    let invalid_keys: Vec<&String> = snapshot
        .keys()
        .filter(|k| slot_key::decode(k).is_none())
        .collect();

    let stored = match db::replace_snapshot(conn, &snapshot, &classes) {
        Ok(n) => n,
        Err(e) => return err(&req.id, "db_tx_failed", e.to_string(), None),
    };

    ok(
        &req.id,
        json!({
            "stored": stored,
            "classesUpserted": classes.len(),
            "invalidKeys": invalid_keys,
        }),
    )
}

fn load_descriptors(conn: &Connection) -> Result<Vec<ClassDescriptor>, HandlerErr> {
    let snapshot = db::load_snapshot(conn).map_err(HandlerErr::query)?;
    let config = db::load_config(conn).map_err(HandlerErr::query)?;
    let teachers = db::primary_teachers(conn).map_err(HandlerErr::query)?;
    Ok(aggregate::aggregate(&snapshot, &config, &teachers))
}

fn handle_schedule_classes(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let mut classes = match load_descriptors(conn) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    if let Some(term) = req.params.get("search").and_then(|v| v.as_str()) {
        classes = aggregate::filter_by_name(&classes, term);
    }

    let group_by = req
        .params
        .get("groupBy")
        .and_then(|v| v.as_str())
        .unwrap_or("startPeriod");
    let groups = match group_by {
        "startPeriod" => aggregate::group_by_start_period(&classes),
        "customGroups" => {
            let config = match db::load_config(conn) {
                Ok(c) => c,
                Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
            };
            aggregate::group_by_custom_groups(&classes, &config)
        }
        other => {
            return err(
                &req.id,
                "bad_params",
                format!("unknown groupBy: {}", other),
                None,
            )
        }
    };

    ok(
        &req.id,
        json!({
            "classCount": classes.len(),
            "groups": groups,
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "schedule.replace" => Some(handle_schedule_replace(state, req)),
        "schedule.classes" => Some(handle_schedule_classes(state, req)),
        _ => None,
    }
}
