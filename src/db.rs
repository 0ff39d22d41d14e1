use rusqlite::Connection;
use std::path::Path;

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join("asistencia.sqlite3");
    let conn = Connection::open(db_path)?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS students(
            account_no INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            program TEXT NOT NULL,
            grade INTEGER NOT NULL,
            group_label TEXT NOT NULL,
            age INTEGER NOT NULL,
            email TEXT NOT NULL,
            password TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS teachers(
            account_no INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            faculty TEXT NOT NULL,
            program TEXT NOT NULL,
            email TEXT NOT NULL,
            password TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS administrators(
            username TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL,
            password TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS subjects(
            subject_id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            program TEXT NOT NULL,
            grade INTEGER NOT NULL,
            credits INTEGER NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS classes(
            class_id INTEGER PRIMARY KEY AUTOINCREMENT,
            subject_id TEXT NOT NULL,
            teacher_account_no INTEGER NOT NULL,
            section_label TEXT NOT NULL,
            FOREIGN KEY(subject_id) REFERENCES subjects(subject_id),
            FOREIGN KEY(teacher_account_no) REFERENCES teachers(account_no)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_classes_teacher ON classes(teacher_account_no)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS enrollments(
            student_account_no INTEGER NOT NULL,
            class_id INTEGER NOT NULL,
            UNIQUE(student_account_no, class_id),
            FOREIGN KEY(student_account_no) REFERENCES students(account_no),
            FOREIGN KEY(class_id) REFERENCES classes(class_id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_enrollments_class ON enrollments(class_id)",
        [],
    )?;

    // Append-oriented: no uniqueness over (student, class, date, time).
    // Duplicate submissions for the same slot produce duplicate rows; status
    // edits target the chronologically latest row.
    conn.execute(
        "CREATE TABLE IF NOT EXISTS attendance(
            student_account_no INTEGER NOT NULL,
            class_id INTEGER NOT NULL,
            date TEXT NOT NULL,
            time TEXT NOT NULL,
            status TEXT NOT NULL,
            FOREIGN KEY(student_account_no) REFERENCES students(account_no),
            FOREIGN KEY(class_id) REFERENCES classes(class_id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_attendance_class ON attendance(class_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_attendance_student ON attendance(student_account_no)",
        [],
    )?;

    Ok(conn)
}
