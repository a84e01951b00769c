mod test_support;

use serde_json::json;
use test_support::{
    error_code, request, request_ok, sample_cells, select_workspace, spawn_sidecar, TODAY,
};

#[test]
fn roster_stats_counts_timetabled_students_once() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    select_workspace(&mut stdin, &mut reader, "timetabled-stats");
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "schedule.replace",
        json!({ "cells": sample_cells() }),
    );

    let memberships = [
        json!({ "studentId": "s1", "className": "DP3", "startDate": "2026-03-02" }),
        json!({ "studentId": "s1", "className": "LE1", "startDate": "2026-03-02" }),
        json!({ "studentId": "s2", "className": "DP3", "startDate": "2026-10-01" }),
        json!({ "studentId": "s3", "className": "PL1", "startDate": "2026-09-01" }),
        json!({ "studentId": "s4", "className": "LE1", "startDate": "2026-01-05",
                "endDate": "2026-10-10", "withdrawalDate": "2026-10-10" }),
        json!({ "studentId": "s5", "className": "DP3", "startDate": "2026-01-05",
                "withdrawalDate": "2026-11-05" }),
        json!({ "studentId": "s6", "className": "PL1", "startDate": "2026-05-04", "onHold": true }),
        json!({ "studentId": "s7", "className": "ZZ9", "startDate": "2026-10-12" }),
    ];
    for id in ["s1", "s2", "s3", "s4", "s5", "s6", "s7"] {
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            &format!("student-{}", id),
            "roster.upsertStudent",
            json!({ "student": { "id": id, "name": id } }),
        );
    }
    for (i, m) in memberships.iter().enumerate() {
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            &format!("membership-{}", i),
            "roster.addMembership",
            json!({ "membership": m }),
        );
    }

    let res = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "roster.stats",
        json!({ "today": TODAY }),
    );
    assert_eq!(res["classCount"], 3);
    let stats = &res["stats"];
    assert_eq!(stats["active"], 3);
    assert_eq!(stats["new1"], 1);
    assert_eq!(stats["new2"], 1);
    assert_eq!(stats["withdrawn"], 1);
    assert_eq!(stats["withdrawnFuture"], 1);
    assert_eq!(stats["waiting"], 1);
    assert_eq!(stats["withdrawnStudents"][0]["id"], "s4");
    assert_eq!(stats["withdrawnFutureStudents"][0]["id"], "s5");
    assert_eq!(stats["waitingStudents"][0]["id"], "s6");
}

#[test]
fn roster_stats_rejects_malformed_today() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    select_workspace(&mut stdin, &mut reader, "timetabled-stats-bad-date");
    let res = request(
        &mut stdin,
        &mut reader,
        "1",
        "roster.stats",
        json!({ "today": "19/10/2026" }),
    );
    assert_eq!(error_code(&res), Some("bad_params"));
}
