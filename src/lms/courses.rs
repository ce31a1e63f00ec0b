use crate::db::{self, Patch};
use crate::lms::error::{LmsError, LmsResult};
use crate::lms::model::{Course, UserRole};
use crate::lms::users;
use crate::lms::validate::{CreateCourseInput, UpdateCourseInput};
use log::info;
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension};

pub(crate) fn find(conn: &Connection, id: i64) -> LmsResult<Option<Course>> {
    let sql = format!("SELECT {} FROM courses c WHERE c.id = ?", Course::COLUMNS);
    Ok(conn.query_row(&sql, [id], Course::from_row).optional()?)
}

pub(crate) fn require(conn: &Connection, id: i64) -> LmsResult<Course> {
    find(conn, id)?.ok_or_else(|| LmsError::not_found("course", id))
}

fn query(conn: &Connection, sql: &str, id: Option<i64>) -> LmsResult<Vec<Course>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = match id {
        Some(id) => stmt.query_map([id], Course::from_row)?,
        None => stmt.query_map([], Course::from_row)?,
    };
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

pub fn create(conn: &Connection, input: CreateCourseInput) -> LmsResult<Course> {
    // Administrators may own courses at creation time; reassignment via update
    // is restricted to teachers.
    users::require_role(
        conn,
        input.teacher_id,
        &[UserRole::Teacher, UserRole::Administrator],
        "teacher or administrator",
    )?;

    let now = db::timestamp_value(db::now_utc());
    conn.execute(
        "INSERT INTO courses(name, description, teacher_id, created_at, updated_at)
         VALUES(?, ?, ?, ?, ?)",
        (
            &input.name,
            input.description.as_deref(),
            input.teacher_id,
            &now,
            &now,
        ),
    )?;
    let id = conn.last_insert_rowid();
    info!("created course {} for teacher {}", id, input.teacher_id);
    require(conn, id)
}

pub fn list(conn: &Connection) -> LmsResult<Vec<Course>> {
    let sql = format!("SELECT {} FROM courses c ORDER BY c.id", Course::COLUMNS);
    query(conn, &sql, None)
}

pub fn by_teacher(conn: &Connection, teacher_id: i64) -> LmsResult<Vec<Course>> {
    let sql = format!(
        "SELECT {} FROM courses c WHERE c.teacher_id = ? ORDER BY c.id",
        Course::COLUMNS
    );
    query(conn, &sql, Some(teacher_id))
}

pub fn by_student(conn: &Connection, student_id: i64) -> LmsResult<Vec<Course>> {
    let sql = format!(
        "SELECT {}
         FROM enrollments e
         JOIN courses c ON c.id = e.course_id
         WHERE e.student_id = ?
         ORDER BY e.id",
        Course::COLUMNS
    );
    query(conn, &sql, Some(student_id))
}

pub fn update(conn: &Connection, input: UpdateCourseInput) -> LmsResult<Course> {
    require(conn, input.id)?;
    if let Some(teacher_id) = input.teacher_id {
        users::require_role(conn, teacher_id, &[UserRole::Teacher], "teacher")?;
    }

    let mut patch = Patch::new();
    if let Some(name) = input.name {
        patch.set("name", Value::Text(name));
    }
    if let Some(description) = input.description {
        patch.set_text("description", description);
    }
    if let Some(teacher_id) = input.teacher_id {
        patch.set("teacher_id", Value::Integer(teacher_id));
    }
    patch.set("updated_at", db::timestamp_value(db::now_utc()));
    patch.apply(conn, "courses", input.id)?;

    info!("updated course {}", input.id);
    require(conn, input.id)
}

/// Removes a course and everything hanging off it, leaves first:
/// submissions, assignments, materials, enrollments, then the course row.
/// A course that does not exist is a successful no-op.
pub fn delete(conn: &Connection, id: i64) -> LmsResult<bool> {
    let tx = conn.unchecked_transaction()?;

    let assignment_ids = {
        let mut stmt = tx.prepare("SELECT id FROM assignments WHERE course_id = ? ORDER BY id")?;
        let rows = stmt.query_map([id], |r| r.get::<_, i64>(0))?;
        rows.collect::<Result<Vec<_>, _>>()?
    };

    let mut submissions = 0usize;
    for assignment_id in &assignment_ids {
        submissions += tx.execute(
            "DELETE FROM assignment_submissions WHERE assignment_id = ?",
            [assignment_id],
        )?;
    }
    let assignments = tx.execute("DELETE FROM assignments WHERE course_id = ?", [id])?;
    let materials = tx.execute("DELETE FROM course_materials WHERE course_id = ?", [id])?;
    let enrollments = tx.execute("DELETE FROM enrollments WHERE course_id = ?", [id])?;
    let removed = tx.execute("DELETE FROM courses WHERE id = ?", [id])?;
    tx.commit()?;

    if removed > 0 {
        info!(
            "deleted course {}: {} assignments, {} submissions, {} materials, {} enrollments",
            id, assignments, submissions, materials, enrollments
        );
    }
    Ok(true)
}
