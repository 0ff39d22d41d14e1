use crate::auth::{self, Role};
use crate::ipc::error::ok;
use crate::ipc::helpers::{get_required_i64, get_required_str, require_role, HandlerErr};
use crate::ipc::types::{AppState, Request};
use rusqlite::{Connection, OptionalExtension};
use serde_json::json;

fn validation(message: impl Into<String>) -> HandlerErr {
    HandlerErr::new("validation_failed", message)
}

/// Account numbers are externally assigned and always 8 digits.
fn get_account_no(params: &serde_json::Value, key: &str) -> Result<i64, HandlerErr> {
    let v = get_required_i64(params, key)?;
    if !(10_000_000..=99_999_999).contains(&v) {
        return Err(validation(format!("{} must be an 8-digit number", key)));
    }
    Ok(v)
}

fn get_non_empty(params: &serde_json::Value, key: &str) -> Result<String, HandlerErr> {
    let v = get_required_str(params, key)?;
    if v.is_empty() {
        return Err(validation(format!("{} must not be empty", key)));
    }
    Ok(v)
}

fn get_in_range(
    params: &serde_json::Value,
    key: &str,
    min: i64,
    max: i64,
) -> Result<i64, HandlerErr> {
    let v = get_required_i64(params, key)?;
    if !(min..=max).contains(&v) {
        return Err(validation(format!("{} must be between {} and {}", key, min, max)));
    }
    Ok(v)
}

fn list_students(conn: &Connection) -> Result<serde_json::Value, HandlerErr> {
    let mut stmt = conn
        .prepare(
            "SELECT account_no, name, program, grade, group_label, age, email
             FROM students
             ORDER BY account_no",
        )
        .map_err(HandlerErr::db)?;
    let rows = stmt
        .query_map([], |r| {
            Ok(json!({
                "accountNo": r.get::<_, i64>(0)?,
                "name": r.get::<_, String>(1)?,
                "program": r.get::<_, String>(2)?,
                "grade": r.get::<_, i64>(3)?,
                "group": r.get::<_, String>(4)?,
                "age": r.get::<_, i64>(5)?,
                "email": r.get::<_, String>(6)?,
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(HandlerErr::db)?;
    Ok(json!({ "students": rows }))
}

fn list_teachers(conn: &Connection) -> Result<serde_json::Value, HandlerErr> {
    let mut stmt = conn
        .prepare(
            "SELECT account_no, name, faculty, program, email
             FROM teachers
             ORDER BY account_no",
        )
        .map_err(HandlerErr::db)?;
    let rows = stmt
        .query_map([], |r| {
            Ok(json!({
                "accountNo": r.get::<_, i64>(0)?,
                "name": r.get::<_, String>(1)?,
                "faculty": r.get::<_, String>(2)?,
                "program": r.get::<_, String>(3)?,
                "email": r.get::<_, String>(4)?,
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(HandlerErr::db)?;
    Ok(json!({ "teachers": rows }))
}

fn list_subjects(conn: &Connection) -> Result<serde_json::Value, HandlerErr> {
    let mut stmt = conn
        .prepare(
            "SELECT subject_id, name, program, grade, credits
             FROM subjects
             ORDER BY subject_id",
        )
        .map_err(HandlerErr::db)?;
    let rows = stmt
        .query_map([], |r| {
            Ok(json!({
                "subjectId": r.get::<_, String>(0)?,
                "name": r.get::<_, String>(1)?,
                "program": r.get::<_, String>(2)?,
                "grade": r.get::<_, i64>(3)?,
                "credits": r.get::<_, i64>(4)?,
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(HandlerErr::db)?;
    Ok(json!({ "subjects": rows }))
}

fn list_classes(conn: &Connection) -> Result<serde_json::Value, HandlerErr> {
    let mut stmt = conn
        .prepare(
            "SELECT c.class_id, c.subject_id, s.name, c.teacher_account_no, c.section_label
             FROM classes c
             JOIN subjects s ON s.subject_id = c.subject_id
             ORDER BY c.class_id",
        )
        .map_err(HandlerErr::db)?;
    let rows = stmt
        .query_map([], |r| {
            Ok(json!({
                "classId": r.get::<_, i64>(0)?,
                "subjectId": r.get::<_, String>(1)?,
                "subject": r.get::<_, String>(2)?,
                "teacherAccountNo": r.get::<_, i64>(3)?,
                "section": r.get::<_, String>(4)?,
            }))
        })
        .and_then(|it| it.collect::<Result<Vec<_>, _>>())
        .map_err(HandlerErr::db)?;
    Ok(json!({ "classes": rows }))
}

fn register_student(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let account_no = get_account_no(params, "accountNo")?;
    let name = get_non_empty(params, "name")?;
    let program = get_non_empty(params, "program")?;
    let grade = get_in_range(params, "grade", 1, 10)?;
    let group = get_non_empty(params, "group")?;
    if group.chars().count() != 1 {
        return Err(validation("group must be a single character"));
    }
    let age = get_in_range(params, "age", 15, 100)?;
    let email = get_non_empty(params, "email")?;
    let secret = get_non_empty(params, "secret")?;

    let taken = conn
        .query_row(
            "SELECT 1 FROM students WHERE account_no = ?",
            [account_no],
            |r| r.get::<_, i64>(0),
        )
        .optional()
        .map_err(HandlerErr::db)?
        .is_some();
    if taken {
        return Err(validation("account number already registered"));
    }

    conn.execute(
        "INSERT INTO students(account_no, name, program, grade, group_label, age, email, password)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?)",
        (
            account_no,
            &name,
            &program,
            grade,
            &group,
            age,
            &email,
            auth::hash_secret(&secret),
        ),
    )
    .map_err(|e| HandlerErr::new("db_insert_failed", e.to_string()))?;

    Ok(json!({ "accountNo": account_no }))
}

fn register_teacher(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let account_no = get_account_no(params, "accountNo")?;
    let name = get_non_empty(params, "name")?;
    let faculty = get_non_empty(params, "faculty")?;
    let program = get_non_empty(params, "program")?;
    let email = get_non_empty(params, "email")?;
    let secret = get_non_empty(params, "secret")?;

    let taken = conn
        .query_row(
            "SELECT 1 FROM teachers WHERE account_no = ?",
            [account_no],
            |r| r.get::<_, i64>(0),
        )
        .optional()
        .map_err(HandlerErr::db)?
        .is_some();
    if taken {
        return Err(validation("account number already registered"));
    }

    conn.execute(
        "INSERT INTO teachers(account_no, name, faculty, program, email, password)
         VALUES(?, ?, ?, ?, ?, ?)",
        (
            account_no,
            &name,
            &faculty,
            &program,
            &email,
            auth::hash_secret(&secret),
        ),
    )
    .map_err(|e| HandlerErr::new("db_insert_failed", e.to_string()))?;

    Ok(json!({ "accountNo": account_no }))
}

fn register_subject(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let subject_id = get_non_empty(params, "subjectId")?;
    let name = get_non_empty(params, "name")?;
    let program = get_non_empty(params, "program")?;
    let grade = get_in_range(params, "grade", 1, 10)?;
    let credits = get_required_i64(params, "credits")?;
    if credits < 1 {
        return Err(validation("credits must be at least 1"));
    }

    let taken = conn
        .query_row(
            "SELECT 1 FROM subjects WHERE subject_id = ?",
            [&subject_id],
            |r| r.get::<_, i64>(0),
        )
        .optional()
        .map_err(HandlerErr::db)?
        .is_some();
    if taken {
        return Err(validation("subject id already registered"));
    }

    conn.execute(
        "INSERT INTO subjects(subject_id, name, program, grade, credits)
         VALUES(?, ?, ?, ?, ?)",
        (&subject_id, &name, &program, grade, credits),
    )
    .map_err(|e| HandlerErr::new("db_insert_failed", e.to_string()))?;

    Ok(json!({ "subjectId": subject_id }))
}

fn register_class(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let subject_id = get_non_empty(params, "subjectId")?;
    let teacher_account_no = get_account_no(params, "teacherAccountNo")?;
    let section = get_non_empty(params, "section")?;

    let subject_exists = conn
        .query_row(
            "SELECT 1 FROM subjects WHERE subject_id = ?",
            [&subject_id],
            |r| r.get::<_, i64>(0),
        )
        .optional()
        .map_err(HandlerErr::db)?
        .is_some();
    if !subject_exists {
        return Err(HandlerErr::new("not_found", "subject not found"));
    }
    let teacher_exists = conn
        .query_row(
            "SELECT 1 FROM teachers WHERE account_no = ?",
            [teacher_account_no],
            |r| r.get::<_, i64>(0),
        )
        .optional()
        .map_err(HandlerErr::db)?
        .is_some();
    if !teacher_exists {
        return Err(HandlerErr::new("not_found", "teacher not found"));
    }

    conn.execute(
        "INSERT INTO classes(subject_id, teacher_account_no, section_label)
         VALUES(?, ?, ?)",
        (&subject_id, teacher_account_no, &section),
    )
    .map_err(|e| HandlerErr::new("db_insert_failed", e.to_string()))?;

    Ok(json!({ "classId": conn.last_insert_rowid() }))
}

fn register_enrollment(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let student_account_no = get_account_no(params, "studentAccountNo")?;
    let class_id = get_required_i64(params, "classId")?;

    let student_exists = conn
        .query_row(
            "SELECT 1 FROM students WHERE account_no = ?",
            [student_account_no],
            |r| r.get::<_, i64>(0),
        )
        .optional()
        .map_err(HandlerErr::db)?
        .is_some();
    if !student_exists {
        return Err(HandlerErr::new("not_found", "student not found"));
    }
    let class_exists = conn
        .query_row(
            "SELECT 1 FROM classes WHERE class_id = ?",
            [class_id],
            |r| r.get::<_, i64>(0),
        )
        .optional()
        .map_err(HandlerErr::db)?
        .is_some();
    if !class_exists {
        return Err(HandlerErr::new("not_found", "class not found"));
    }

    let already = conn
        .query_row(
            "SELECT 1 FROM enrollments WHERE student_account_no = ? AND class_id = ?",
            (student_account_no, class_id),
            |r| r.get::<_, i64>(0),
        )
        .optional()
        .map_err(HandlerErr::db)?
        .is_some();
    if already {
        return Err(validation("student already enrolled in class"));
    }

    conn.execute(
        "INSERT INTO enrollments(student_account_no, class_id) VALUES(?, ?)",
        (student_account_no, class_id),
    )
    .map_err(|e| HandlerErr::new("db_insert_failed", e.to_string()))?;

    Ok(json!({ "ok": true }))
}

fn dispatch(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    require_role(state, Role::Administrator)?;
    let Some(conn) = state.db.as_ref() else {
        return Err(HandlerErr::new("no_workspace", "select a workspace first"));
    };
    match req.method.as_str() {
        "admin.listStudents" => list_students(conn),
        "admin.listTeachers" => list_teachers(conn),
        "admin.listSubjects" => list_subjects(conn),
        "admin.listClasses" => list_classes(conn),
        "admin.registerStudent" => register_student(conn, &req.params),
        "admin.registerTeacher" => register_teacher(conn, &req.params),
        "admin.registerSubject" => register_subject(conn, &req.params),
        "admin.registerClass" => register_class(conn, &req.params),
        "admin.registerEnrollment" => register_enrollment(conn, &req.params),
        _ => unreachable!("routed method handled above"),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "admin.listStudents"
        | "admin.listTeachers"
        | "admin.listSubjects"
        | "admin.listClasses"
        | "admin.registerStudent"
        | "admin.registerTeacher"
        | "admin.registerSubject"
        | "admin.registerClass"
        | "admin.registerEnrollment" => Some(match dispatch(state, req) {
            Ok(result) => ok(&req.id, result),
            Err(error) => error.response(&req.id),
        }),
        _ => None,
    }
}
