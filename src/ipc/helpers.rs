use crate::auth::{Principal, Role};
use crate::ipc::error::err;
use crate::ipc::types::AppState;
use chrono::{NaiveDate, NaiveTime};
use rusqlite::{Connection, OptionalExtension};

pub struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl HandlerErr {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        HandlerErr {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn db(e: impl std::fmt::Display) -> Self {
        HandlerErr::new("db_query_failed", e.to_string())
    }

    pub fn response(self, id: &str) -> serde_json::Value {
        err(id, self.code, self.message, self.details)
    }
}

pub fn get_required_str(params: &serde_json::Value, key: &str) -> Result<String, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .ok_or_else(|| HandlerErr::new("bad_params", format!("missing {}", key)))
}

pub fn get_required_i64(params: &serde_json::Value, key: &str) -> Result<i64, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_i64())
        .ok_or_else(|| HandlerErr::new("bad_params", format!("missing {}", key)))
}

/// The caller's identity comes from the session only, never from params.
pub fn require_session(state: &AppState) -> Result<Principal, HandlerErr> {
    state
        .session
        .current()
        .cloned()
        .ok_or_else(|| HandlerErr::new("not_authenticated", "log in first"))
}

pub fn require_role(state: &AppState, role: Role) -> Result<Principal, HandlerErr> {
    let principal = require_session(state)?;
    if principal.role != role {
        return Err(HandlerErr::new(
            "forbidden",
            format!("requires {} role", role.as_str()),
        ));
    }
    Ok(principal)
}

/// Teacher principals carry their 8-digit account number as the account id.
pub fn require_teacher_account(state: &AppState) -> Result<i64, HandlerErr> {
    let principal = require_role(state, Role::Teacher)?;
    principal
        .account_id
        .parse::<i64>()
        .map_err(|_| HandlerErr::new("forbidden", "teacher session has no account number"))
}

pub fn class_teacher(conn: &Connection, class_id: i64) -> Result<Option<i64>, HandlerErr> {
    conn.query_row(
        "SELECT teacher_account_no FROM classes WHERE class_id = ?",
        [class_id],
        |r| r.get::<_, i64>(0),
    )
    .optional()
    .map_err(HandlerErr::db)
}

/// Ownership gate: the session's teacher account must match the class row.
/// Mismatch is forbidden regardless of how valid the rest of the input is.
pub fn require_class_owner(
    conn: &Connection,
    class_id: i64,
    teacher_account_no: i64,
) -> Result<(), HandlerErr> {
    let Some(owner) = class_teacher(conn, class_id)? else {
        return Err(HandlerErr::new("not_found", "class not found"));
    };
    if owner != teacher_account_no {
        return Err(HandlerErr::new(
            "forbidden",
            "class belongs to another teacher",
        ));
    }
    Ok(())
}

pub fn student_enrolled(
    conn: &Connection,
    class_id: i64,
    student_account_no: i64,
) -> Result<bool, HandlerErr> {
    conn.query_row(
        "SELECT 1 FROM enrollments WHERE class_id = ? AND student_account_no = ?",
        (class_id, student_account_no),
        |r| r.get::<_, i64>(0),
    )
    .optional()
    .map(|v| v.is_some())
    .map_err(HandlerErr::db)
}

pub const STATUSES: [&str; 3] = ["present", "absent", "justified"];

pub fn parse_status(raw: &str) -> Result<&'static str, HandlerErr> {
    STATUSES
        .iter()
        .find(|s| **s == raw)
        .copied()
        .ok_or_else(|| {
            HandlerErr::new(
                "validation_failed",
                "status must be present, absent or justified",
            )
        })
}

pub fn parse_date(raw: &str) -> Result<String, HandlerErr> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(|d| d.format("%Y-%m-%d").to_string())
        .map_err(|_| HandlerErr::new("validation_failed", "date must be YYYY-MM-DD"))
}

pub fn parse_time(raw: &str) -> Result<String, HandlerErr> {
    NaiveTime::parse_from_str(raw, "%H:%M")
        .map(|t| t.format("%H:%M").to_string())
        .map_err(|_| HandlerErr::new("validation_failed", "time must be HH:MM"))
}
