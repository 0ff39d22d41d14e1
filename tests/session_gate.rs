
use serde_json::json;
use test_support::{login, request_err, request_ok, seed_worked_example, spawn_sidecar, temp_dir};

#[test]
fn registry_is_unreachable_without_a_session() {
    let workspace = temp_dir("asistencia-session-gate");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    for (i, method) in [
        "admin.listStudents",
        "admin.registerSubject",
        "classes.listOwn",
        "classes.roster",
        "attendance.record",
        "attendance.recordBulk",
        "attendance.updateStatus",
        "attendance.listOwn",
        "attendance.export",
    ]
    .iter()
    .enumerate()
    {
        let code = request_err(
            &mut stdin,
            &mut reader,
            &format!("gate-{}", i),
            method,
            json!({ "classId": 1 }),
        );
        assert_eq!(code, "not_authenticated", "method {}", method);
    }
}

#[test]
fn logout_returns_to_the_unauthenticated_state() {
    let workspace = temp_dir("asistencia-session-logout");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    test_support::boot_admin(&mut stdin, &mut reader, &workspace);

    let _ = request_ok(&mut stdin, &mut reader, "1", "admin.listStudents", json!({}));

    let current = request_ok(&mut stdin, &mut reader, "2", "auth.session", json!({}));
    assert_eq!(
        current.pointer("/principal/accountId").and_then(|v| v.as_str()),
        Some("admin")
    );

    let _ = request_ok(&mut stdin, &mut reader, "3", "auth.logout", json!({}));

    let current = request_ok(&mut stdin, &mut reader, "4", "auth.session", json!({}));
    assert!(current.get("principal").map(|v| v.is_null()).unwrap_or(false));

    let code = request_err(&mut stdin, &mut reader, "5", "admin.listStudents", json!({}));
    assert_eq!(code, "not_authenticated");
}

#[test]
fn roles_do_not_cross_over() {
    let workspace = temp_dir("asistencia-session-roles");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let class_id = seed_worked_example(&mut stdin, &mut reader, &workspace);

    // Students get none of the admin or teacher surface.
    let _ = login(&mut stdin, &mut reader, "student", "10000001", "stud-pass");
    for (i, method) in ["admin.listStudents", "classes.listOwn", "attendance.record"]
        .iter()
        .enumerate()
    {
        let code = request_err(
            &mut stdin,
            &mut reader,
            &format!("stud-{}", i),
            method,
            json!({ "classId": class_id }),
        );
        assert_eq!(code, "forbidden", "method {}", method);
    }

    // Teachers get none of the admin or student surface.
    let _ = login(&mut stdin, &mut reader, "teacher", "20000001", "teach-pass");
    for (i, method) in ["admin.listStudents", "attendance.listOwn"].iter().enumerate() {
        let code = request_err(
            &mut stdin,
            &mut reader,
            &format!("teach-{}", i),
            method,
            json!({}),
        );
        assert_eq!(code, "forbidden", "method {}", method);
    }
}
