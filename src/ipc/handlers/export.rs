use crate::ipc::error::ok;
use crate::ipc::helpers::{
    get_required_i64, require_class_owner, require_teacher_account, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use rusqlite::Connection;
use serde_json::json;
use std::path::Path;

fn csv_quote(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// The download is named after the subject; keep the stem filesystem-safe.
fn file_stem(subject: &str) -> String {
    subject
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect()
}

fn write_text_file(path: &Path, contents: &str) -> Result<(), HandlerErr> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| HandlerErr {
            code: "export_failed",
            message: e.to_string(),
            details: Some(json!({ "path": path.to_string_lossy() })),
        })?;
    }
    std::fs::write(path, contents).map_err(|e| HandlerErr {
        code: "export_failed",
        message: e.to_string(),
        details: Some(json!({ "path": path.to_string_lossy() })),
    })?;
    Ok(())
}

fn export(
    conn: &Connection,
    class_id: i64,
    out_path: Option<&str>,
) -> Result<serde_json::Value, HandlerErr> {
    let (subject, teacher): (String, String) = conn
        .query_row(
            "SELECT s.name, t.name
             FROM classes c
             JOIN subjects s ON s.subject_id = c.subject_id
             JOIN teachers t ON t.account_no = c.teacher_account_no
             WHERE c.class_id = ?",
            [class_id],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .map_err(HandlerErr::db)?;

    let mut stmt = conn
        .prepare(
            "SELECT a.student_account_no, st.name, a.date, a.time, a.status
             FROM attendance a
             JOIN students st ON st.account_no = a.student_account_no
             WHERE a.class_id = ?
             ORDER BY a.date, a.time, st.account_no",
        )
        .map_err(HandlerErr::db)?;
    let rows = stmt
        .query_map([class_id], |r| {
            Ok((
                r.get::<_, i64>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, String>(2)?,
                r.get::<_, String>(3)?,
                r.get::<_, String>(4)?,
            ))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(HandlerErr::db)?;

    let mut csv = String::from("account_no,student,date,time,status\n");
    for (account_no, name, date, time, status) in &rows {
        csv.push_str(&format!(
            "{},{},{},{},{}\n",
            account_no,
            csv_quote(name),
            csv_quote(date),
            csv_quote(time),
            csv_quote(status),
        ));
    }

    let file_name = format!("Asistencias_{}.csv", file_stem(&subject));
    if let Some(out) = out_path {
        let path = Path::new(out).join(&file_name);
        write_text_file(&path, &csv)?;
    }

    Ok(json!({
        "fileName": file_name,
        "subject": subject,
        "teacher": teacher,
        "rowCount": rows.len(),
        "csv": csv,
    }))
}

fn dispatch(state: &AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let teacher_account_no = require_teacher_account(state)?;
    let Some(conn) = state.db.as_ref() else {
        return Err(HandlerErr::new("no_workspace", "select a workspace first"));
    };
    let class_id = get_required_i64(&req.params, "classId")?;
    require_class_owner(conn, class_id, teacher_account_no)?;
    let out_path = req.params.get("outPath").and_then(|v| v.as_str());
    export(conn, class_id, out_path)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "attendance.export" => Some(match dispatch(state, req) {
            Ok(result) => ok(&req.id, result),
            Err(error) => error.response(&req.id),
        }),
        _ => None,
    }
}
