
use serde_json::json;
use test_support::{login, request_ok, seed_worked_example, spawn_sidecar, temp_dir};

#[test]
fn export_is_named_after_the_subject_and_carries_all_rows() {
    let workspace = temp_dir("asistencia-export");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let class_id = seed_worked_example(&mut stdin, &mut reader, &workspace);

    let _ = login(&mut stdin, &mut reader, "teacher", "20000001", "teach-pass");
    for (i, (date, status)) in [("2024-03-01", "present"), ("2024-03-08", "absent")]
        .iter()
        .enumerate()
    {
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            &format!("rec-{}", i),
            "attendance.record",
            json!({
                "classId": class_id,
                "studentAccountNo": 10000001,
                "date": date,
                "time": "09:00",
                "status": status
            }),
        );
    }

    let out_dir = workspace.join("exports");
    let result = request_ok(
        &mut stdin,
        &mut reader,
        "export",
        "attendance.export",
        json!({ "classId": class_id, "outPath": out_dir.to_string_lossy() }),
    );

    assert_eq!(
        result.get("fileName").and_then(|v| v.as_str()),
        Some("Asistencias_Calculus.csv")
    );
    assert_eq!(
        result.get("subject").and_then(|v| v.as_str()),
        Some("Calculus")
    );
    assert_eq!(
        result.get("teacher").and_then(|v| v.as_str()),
        Some("Prof. Rivera")
    );
    assert_eq!(result.get("rowCount").and_then(|v| v.as_u64()), Some(2));

    let csv = result.get("csv").and_then(|v| v.as_str()).expect("csv");
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines[0], "account_no,student,date,time,status");
    assert_eq!(lines[1], "10000001,Ana Lopez,2024-03-01,09:00,present");
    assert_eq!(lines[2], "10000001,Ana Lopez,2024-03-08,09:00,absent");

    // The same bytes landed on disk.
    let written =
        std::fs::read_to_string(out_dir.join("Asistencias_Calculus.csv")).expect("written file");
    assert_eq!(written, csv);
}

#[test]
fn file_stem_is_sanitized_and_fields_are_quoted() {
    let workspace = temp_dir("asistencia-export-quoting");
    let (_child, mut stdin, mut reader) = spawn_sidecar();
    test_support::boot_admin(&mut stdin, &mut reader, &workspace);

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "admin.registerTeacher",
        json!({
            "accountNo": 20000001,
            "name": "Prof. Rivera",
            "faculty": "Sciences",
            "program": "Eng",
            "email": "rivera@example.edu",
            "secret": "teach-pass"
        }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "admin.registerSubject",
        json!({
            "subjectId": "HIS101",
            "name": "History, Modern / Survey",
            "program": "Hum",
            "grade": 1,
            "credits": 6
        }),
    );
    let created = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "admin.registerClass",
        json!({ "subjectId": "HIS101", "teacherAccountNo": 20000001, "section": "B" }),
    );
    let class_id = created.get("classId").and_then(|v| v.as_i64()).expect("classId");
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "admin.registerStudent",
        json!({
            "accountNo": 10000001,
            "name": "Lopez, Ana",
            "program": "Hum",
            "grade": 1,
            "group": "B",
            "age": 19,
            "email": "ana@example.edu",
            "secret": "pw"
        }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "admin.registerEnrollment",
        json!({ "studentAccountNo": 10000001, "classId": class_id }),
    );

    let _ = login(&mut stdin, &mut reader, "teacher", "20000001", "teach-pass");
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "attendance.record",
        json!({
            "classId": class_id,
            "studentAccountNo": 10000001,
            "date": "2024-03-01",
            "time": "09:00",
            "status": "present"
        }),
    );

    let result = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "attendance.export",
        json!({ "classId": class_id }),
    );
    assert_eq!(
        result.get("fileName").and_then(|v| v.as_str()),
        Some("Asistencias_History__Modern___Survey.csv")
    );
    let csv = result.get("csv").and_then(|v| v.as_str()).expect("csv");
    assert!(csv.contains("\"Lopez, Ana\""));
}
