use crate::auth::Role;
use crate::ipc::error::ok;
use crate::ipc::helpers::{
    class_teacher, get_required_i64, require_class_owner, require_session,
    require_teacher_account, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use rusqlite::Connection;
use serde_json::json;

fn list_own(conn: &Connection, teacher_account_no: i64) -> Result<serde_json::Value, HandlerErr> {
    let mut stmt = conn
        .prepare(
            "SELECT c.class_id, c.subject_id, s.name, c.section_label
             FROM classes c
             JOIN subjects s ON s.subject_id = c.subject_id
             WHERE c.teacher_account_no = ?
             ORDER BY c.class_id",
        )
        .map_err(HandlerErr::db)?;
    let rows = stmt
        .query_map([teacher_account_no], |r| {
            Ok(json!({
                "classId": r.get::<_, i64>(0)?,
                "subjectId": r.get::<_, String>(1)?,
                "subject": r.get::<_, String>(2)?,
                "section": r.get::<_, String>(3)?,
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(HandlerErr::db)?;
    Ok(json!({ "classes": rows }))
}

/// Enrolled students joined with each one's latest attendance row for the
/// class. Latest = (date, time, rowid) descending, matching the edit path.
fn roster(conn: &Connection, class_id: i64) -> Result<serde_json::Value, HandlerErr> {
    let mut stmt = conn
        .prepare(
            "SELECT st.account_no, st.name, a.status, a.date, a.time
             FROM enrollments e
             JOIN students st ON st.account_no = e.student_account_no
             LEFT JOIN attendance a ON a.rowid = (
                 SELECT a2.rowid FROM attendance a2
                 WHERE a2.student_account_no = e.student_account_no
                   AND a2.class_id = e.class_id
                 ORDER BY a2.date DESC, a2.time DESC, a2.rowid DESC
                 LIMIT 1
             )
             WHERE e.class_id = ?
             ORDER BY st.account_no",
        )
        .map_err(HandlerErr::db)?;
    let rows = stmt
        .query_map([class_id], |r| {
            Ok(json!({
                "accountNo": r.get::<_, i64>(0)?,
                "name": r.get::<_, String>(1)?,
                "lastStatus": r.get::<_, Option<String>>(2)?,
                "lastDate": r.get::<_, Option<String>>(3)?,
                "lastTime": r.get::<_, Option<String>>(4)?,
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(HandlerErr::db)?;
    Ok(json!({ "classId": class_id, "students": rows }))
}

fn dispatch_list_own(state: &AppState) -> Result<serde_json::Value, HandlerErr> {
    let teacher_account_no = require_teacher_account(state)?;
    let Some(conn) = state.db.as_ref() else {
        return Err(HandlerErr::new("no_workspace", "select a workspace first"));
    };
    list_own(conn, teacher_account_no)
}

fn dispatch_roster(state: &AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let principal = require_session(state)?;
    let Some(conn) = state.db.as_ref() else {
        return Err(HandlerErr::new("no_workspace", "select a workspace first"));
    };
    let class_id = get_required_i64(params, "classId")?;
    match principal.role {
        Role::Administrator => {
            if class_teacher(conn, class_id)?.is_none() {
                return Err(HandlerErr::new("not_found", "class not found"));
            }
        }
        Role::Teacher => {
            let teacher_account_no = require_teacher_account(state)?;
            require_class_owner(conn, class_id, teacher_account_no)?;
        }
        Role::Student => {
            return Err(HandlerErr::new(
                "forbidden",
                "requires teacher or administrator role",
            ));
        }
    }
    roster(conn, class_id)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "classes.listOwn" => Some(match dispatch_list_own(state) {
            Ok(result) => ok(&req.id, result),
            Err(error) => error.response(&req.id),
        }),
        "classes.roster" => Some(match dispatch_roster(state, &req.params) {
            Ok(result) => ok(&req.id, result),
            Err(error) => error.response(&req.id),
        }),
        _ => None,
    }
}
