use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};
use std::path::Path;

pub const DB_FILE_NAME: &str = "lms.sqlite3";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(DB_FILE_NAME);
    let conn = Connection::open(db_path)?;
    init_schema(&conn)?;
    Ok(conn)
}

/// Creates every table and index if missing. Safe to run against an existing
/// workspace.
pub fn init_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS users(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            email TEXT NOT NULL,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            role TEXT NOT NULL CHECK(role IN ('student', 'teacher', 'administrator')),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_users_email ON users(email)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_users_role ON users(role)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS courses(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            description TEXT,
            teacher_id INTEGER NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY(teacher_id) REFERENCES users(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_courses_teacher ON courses(teacher_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS enrollments(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            student_id INTEGER NOT NULL,
            course_id INTEGER NOT NULL,
            enrolled_at TEXT NOT NULL,
            FOREIGN KEY(student_id) REFERENCES users(id),
            FOREIGN KEY(course_id) REFERENCES courses(id),
            UNIQUE(student_id, course_id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_enrollments_student ON enrollments(student_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_enrollments_course ON enrollments(course_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS course_materials(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            course_id INTEGER NOT NULL,
            title TEXT NOT NULL,
            content TEXT,
            file_url TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY(course_id) REFERENCES courses(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_course_materials_course ON course_materials(course_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS assignments(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            course_id INTEGER NOT NULL,
            title TEXT NOT NULL,
            description TEXT,
            due_date TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            FOREIGN KEY(course_id) REFERENCES courses(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_assignments_course ON assignments(course_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS assignment_submissions(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            assignment_id INTEGER NOT NULL,
            student_id INTEGER NOT NULL,
            content TEXT,
            file_url TEXT,
            submitted_at TEXT NOT NULL,
            grade REAL,
            graded_at TEXT,
            FOREIGN KEY(assignment_id) REFERENCES assignments(id),
            FOREIGN KEY(student_id) REFERENCES users(id),
            UNIQUE(assignment_id, student_id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_submissions_assignment ON assignment_submissions(assignment_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_submissions_student ON assignment_submissions(student_id)",
        [],
    )?;

    Ok(())
}

pub fn now_utc() -> DateTime<Utc> {
    Utc::now()
}

pub fn timestamp_value(ts: DateTime<Utc>) -> Value {
    Value::Text(ts.to_rfc3339_opts(chrono::SecondsFormat::Micros, true))
}

/// Collects `column = ?` assignments for a partial UPDATE.
#[derive(Debug, Default)]
pub struct Patch {
    set_parts: Vec<String>,
    bind_values: Vec<Value>,
}

impl Patch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, column: &str, value: Value) {
        self.set_parts.push(format!("{} = ?", column));
        self.bind_values.push(value);
    }

    pub fn set_text(&mut self, column: &str, value: Option<String>) {
        self.set(column, value.map(Value::Text).unwrap_or(Value::Null));
    }

    /// Runs the UPDATE against `table` for row `id`, returning the changed row count.
    pub fn apply(mut self, conn: &Connection, table: &str, id: i64) -> rusqlite::Result<usize> {
        if self.set_parts.is_empty() {
            return Ok(0);
        }
        let sql = format!(
            "UPDATE {} SET {} WHERE id = ?",
            table,
            self.set_parts.join(", ")
        );
        self.bind_values.push(Value::Integer(id));
        conn.execute(&sql, params_from_iter(self.bind_values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_names(conn: &Connection) -> Vec<String> {
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .expect("prepare");
        stmt.query_map([], |r| r.get::<_, String>(0))
            .expect("query")
            .collect::<Result<Vec<_>, _>>()
            .expect("collect")
    }

    #[test]
    fn schema_is_idempotent() {
        let conn = Connection::open_in_memory().expect("open");
        init_schema(&conn).expect("first init");
        init_schema(&conn).expect("second init");
        let names = table_names(&conn);
        for t in [
            "users",
            "courses",
            "enrollments",
            "course_materials",
            "assignments",
            "assignment_submissions",
        ] {
            assert!(names.iter().any(|n| n == t), "missing table {}", t);
        }
    }

    #[test]
    fn foreign_keys_are_enforced() {
        let conn = Connection::open_in_memory().expect("open");
        init_schema(&conn).expect("init");
        let res = conn.execute(
            "INSERT INTO courses(name, description, teacher_id, created_at, updated_at)
             VALUES('Orphan', NULL, 999, 'x', 'x')",
            [],
        );
        assert!(res.is_err());
    }

    #[test]
    fn empty_patch_is_a_noop() {
        let conn = Connection::open_in_memory().expect("open");
        init_schema(&conn).expect("init");
        let changed = Patch::new().apply(&conn, "users", 1).expect("apply");
        assert_eq!(changed, 0);
    }
}
