use crate::auth::Role;
use crate::ipc::error::ok;
use crate::ipc::helpers::{
    get_required_i64, get_required_str, parse_date, parse_status, parse_time, require_class_owner,
    require_role, require_teacher_account, student_enrolled, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use rusqlite::Connection;
use serde_json::json;

fn insert_record(
    conn: &Connection,
    class_id: i64,
    student_account_no: i64,
    date: &str,
    time: &str,
    status: &str,
) -> Result<(), HandlerErr> {
    conn.execute(
        "INSERT INTO attendance(student_account_no, class_id, date, time, status)
         VALUES(?, ?, ?, ?, ?)",
        (student_account_no, class_id, date, time, status),
    )
    .map(|_| ())
    .map_err(|e| HandlerErr::new("db_insert_failed", e.to_string()))
}

fn record(
    conn: &Connection,
    teacher_account_no: i64,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_required_i64(params, "classId")?;
    require_class_owner(conn, class_id, teacher_account_no)?;

    let student_account_no = get_required_i64(params, "studentAccountNo")?;
    let date = parse_date(&get_required_str(params, "date")?)?;
    let time = parse_time(&get_required_str(params, "time")?)?;
    let status = parse_status(&get_required_str(params, "status")?)?;

    // The enrollment link is the authorization to mark this student at all;
    // the schema does not enforce it, so the registry must.
    if !student_enrolled(conn, class_id, student_account_no)? {
        return Err(HandlerErr::new(
            "not_enrolled",
            "student is not enrolled in class",
        ));
    }

    insert_record(conn, class_id, student_account_no, &date, &time, status)?;
    Ok(json!({ "ok": true }))
}

/// Per-row commit: an unenrolled or malformed entry is skipped and reported,
/// the rest of the batch still lands.
fn record_bulk(
    conn: &Connection,
    teacher_account_no: i64,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_required_i64(params, "classId")?;
    require_class_owner(conn, class_id, teacher_account_no)?;

    let date = parse_date(&get_required_str(params, "date")?)?;
    let time = parse_time(&get_required_str(params, "time")?)?;
    let Some(entries) = params.get("entries").and_then(|v| v.as_array()) else {
        return Err(HandlerErr::new("bad_params", "missing entries[]"));
    };

    let mut recorded: usize = 0;
    let mut skipped: Vec<serde_json::Value> = Vec::new();

    for entry in entries {
        let account = entry.get("studentAccountNo").and_then(|v| v.as_i64());
        let status_raw = entry.get("status").and_then(|v| v.as_str());
        let (Some(student_account_no), Some(status_raw)) = (account, status_raw) else {
            skipped.push(json!({
                "studentAccountNo": account,
                "reason": "bad_entry",
            }));
            continue;
        };
        let status = match parse_status(status_raw) {
            Ok(s) => s,
            Err(_) => {
                skipped.push(json!({
                    "studentAccountNo": student_account_no,
                    "reason": "bad_status",
                }));
                continue;
            }
        };
        if !student_enrolled(conn, class_id, student_account_no)? {
            skipped.push(json!({
                "studentAccountNo": student_account_no,
                "reason": "not_enrolled",
            }));
            continue;
        }
        insert_record(conn, class_id, student_account_no, &date, &time, status)?;
        recorded += 1;
    }

    Ok(json!({ "recorded": recorded, "skipped": skipped }))
}

/// Rewrites the status of the chronologically latest record only; earlier
/// rows stay untouched.
fn update_status(
    conn: &Connection,
    teacher_account_no: i64,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_required_i64(params, "classId")?;
    require_class_owner(conn, class_id, teacher_account_no)?;

    let student_account_no = get_required_i64(params, "studentAccountNo")?;
    let status = parse_status(&get_required_str(params, "status")?)?;

    let changed = conn
        .execute(
            "UPDATE attendance SET status = ?
             WHERE rowid = (
                 SELECT rowid FROM attendance
                 WHERE student_account_no = ? AND class_id = ?
                 ORDER BY date DESC, time DESC, rowid DESC
                 LIMIT 1
             )",
            (status, student_account_no, class_id),
        )
        .map_err(|e| HandlerErr::new("db_update_failed", e.to_string()))?;
    if changed == 0 {
        return Err(HandlerErr::new(
            "not_found",
            "no attendance record for student in class",
        ));
    }
    Ok(json!({ "ok": true }))
}

fn list_own(
    conn: &Connection,
    student_account_no: i64,
) -> Result<serde_json::Value, HandlerErr> {
    let mut stmt = conn
        .prepare(
            "SELECT s.name, a.status, a.date, a.time, a.class_id
             FROM attendance a
             JOIN classes c ON c.class_id = a.class_id
             JOIN subjects s ON s.subject_id = c.subject_id
             WHERE a.student_account_no = ?
             ORDER BY a.date DESC, a.time DESC",
        )
        .map_err(HandlerErr::db)?;
    let rows = stmt
        .query_map([student_account_no], |r| {
            Ok(json!({
                "subject": r.get::<_, String>(0)?,
                "status": r.get::<_, String>(1)?,
                "date": r.get::<_, String>(2)?,
                "time": r.get::<_, String>(3)?,
                "classId": r.get::<_, i64>(4)?,
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(HandlerErr::db)?;
    Ok(json!({ "records": rows }))
}

fn dispatch_teacher_op(state: &AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let teacher_account_no = require_teacher_account(state)?;
    let Some(conn) = state.db.as_ref() else {
        return Err(HandlerErr::new("no_workspace", "select a workspace first"));
    };
    match req.method.as_str() {
        "attendance.record" => record(conn, teacher_account_no, &req.params),
        "attendance.recordBulk" => record_bulk(conn, teacher_account_no, &req.params),
        "attendance.updateStatus" => update_status(conn, teacher_account_no, &req.params),
        _ => unreachable!("routed method handled above"),
    }
}

fn dispatch_list_own(state: &AppState) -> Result<serde_json::Value, HandlerErr> {
    let principal = require_role(state, Role::Student)?;
    let Some(conn) = state.db.as_ref() else {
        return Err(HandlerErr::new("no_workspace", "select a workspace first"));
    };
    let student_account_no = principal
        .account_id
        .parse::<i64>()
        .map_err(|_| HandlerErr::new("forbidden", "student session has no account number"))?;
    list_own(conn, student_account_no)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "attendance.record" | "attendance.recordBulk" | "attendance.updateStatus" => {
            Some(match dispatch_teacher_op(state, req) {
                Ok(result) => ok(&req.id, result),
                Err(error) => error.response(&req.id),
            })
        }
        "attendance.listOwn" => Some(match dispatch_list_own(state) {
            Ok(result) => ok(&req.id, result),
            Err(error) => error.response(&req.id),
        }),
        _ => None,
    }
}
