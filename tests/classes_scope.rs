
use serde_json::json;
use test_support::{login, request_err, request_ok, seed_worked_example, spawn_sidecar, temp_dir};

#[test]
fn teachers_see_only_their_own_classes() {
    let workspace = temp_dir("asistencia-classes-own");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let class_id = seed_worked_example(&mut stdin, &mut reader, &workspace);

    // A class for the other teacher.
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "admin.registerClass",
        json!({ "subjectId": "MAT101", "teacherAccountNo": 20000002, "section": "B" }),
    );

    let _ = login(&mut stdin, &mut reader, "teacher", "20000001", "teach-pass");
    let own = request_ok(&mut stdin, &mut reader, "2", "classes.listOwn", json!({}));
    let classes = own.get("classes").and_then(|v| v.as_array()).expect("classes");
    assert_eq!(classes.len(), 1);
    assert_eq!(
        classes[0].get("classId").and_then(|v| v.as_i64()),
        Some(class_id)
    );
    assert_eq!(
        classes[0].get("subject").and_then(|v| v.as_str()),
        Some("Calculus")
    );
    assert_eq!(classes[0].get("section").and_then(|v| v.as_str()), Some("A"));

    let _ = login(&mut stdin, &mut reader, "teacher", "20000002", "teach-pass-2");
    let own = request_ok(&mut stdin, &mut reader, "3", "classes.listOwn", json!({}));
    let classes = own.get("classes").and_then(|v| v.as_array()).expect("classes");
    assert_eq!(classes.len(), 1);
    assert_eq!(classes[0].get("section").and_then(|v| v.as_str()), Some("B"));
}

#[test]
fn administrators_may_read_any_roster() {
    let workspace = temp_dir("asistencia-roster-admin");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let class_id = seed_worked_example(&mut stdin, &mut reader, &workspace);

    // Admin session is still active after seeding.
    let roster = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "classes.roster",
        json!({ "classId": class_id }),
    );
    let students = roster.get("students").and_then(|v| v.as_array()).expect("students");
    assert_eq!(students.len(), 1);
    assert_eq!(
        students[0].get("name").and_then(|v| v.as_str()),
        Some("Ana Lopez")
    );

    let code = request_err(
        &mut stdin,
        &mut reader,
        "2",
        "classes.roster",
        json!({ "classId": 9999 }),
    );
    assert_eq!(code, "not_found");
}

#[test]
fn admin_listings_are_ordered_by_primary_key() {
    let workspace = temp_dir("asistencia-admin-listings");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = seed_worked_example(&mut stdin, &mut reader, &workspace);

    let teachers = request_ok(&mut stdin, &mut reader, "1", "admin.listTeachers", json!({}));
    let rows = teachers.get("teachers").and_then(|v| v.as_array()).expect("teachers");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].get("accountNo").and_then(|v| v.as_i64()), Some(20000001));
    assert_eq!(rows[1].get("accountNo").and_then(|v| v.as_i64()), Some(20000002));

    let subjects = request_ok(&mut stdin, &mut reader, "2", "admin.listSubjects", json!({}));
    let rows = subjects.get("subjects").and_then(|v| v.as_array()).expect("subjects");
    assert_eq!(rows.len(), 1);
    assert_eq!(
        rows[0].get("subjectId").and_then(|v| v.as_str()),
        Some("MAT101")
    );

    let classes = request_ok(&mut stdin, &mut reader, "3", "admin.listClasses", json!({}));
    let rows = classes.get("classes").and_then(|v| v.as_array()).expect("classes");
    assert_eq!(rows.len(), 1);
    assert_eq!(
        rows[0].get("teacherAccountNo").and_then(|v| v.as_i64()),
        Some(20000001)
    );

    // Listings never expose stored secrets, hashed or otherwise.
    let students = request_ok(&mut stdin, &mut reader, "4", "admin.listStudents", json!({}));
    let rows = students.get("students").and_then(|v| v.as_array()).expect("students");
    assert!(rows[0].get("password").is_none());
}
