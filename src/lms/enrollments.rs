use crate::db;
use crate::lms::error::{LmsError, LmsResult};
use crate::lms::model::{Enrollment, User, UserRole};
use crate::lms::validate::CreateEnrollmentInput;
use crate::lms::{courses, users};
use log::info;
use rusqlite::{Connection, OptionalExtension};

pub(crate) fn exists(conn: &Connection, student_id: i64, course_id: i64) -> LmsResult<bool> {
    let hit: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM enrollments WHERE student_id = ? AND course_id = ?",
            [student_id, course_id],
            |r| r.get(0),
        )
        .optional()?;
    Ok(hit.is_some())
}

pub fn create(conn: &Connection, input: CreateEnrollmentInput) -> LmsResult<Enrollment> {
    users::require_role(conn, input.student_id, &[UserRole::Student], "student")?;
    courses::require(conn, input.course_id)?;
    if exists(conn, input.student_id, input.course_id)? {
        return Err(LmsError::AlreadyEnrolled {
            student_id: input.student_id,
            course_id: input.course_id,
        });
    }

    let now = db::timestamp_value(db::now_utc());
    conn.execute(
        "INSERT INTO enrollments(student_id, course_id, enrolled_at) VALUES(?, ?, ?)",
        (input.student_id, input.course_id, &now),
    )?;
    let id = conn.last_insert_rowid();
    info!(
        "enrolled student {} in course {}",
        input.student_id, input.course_id
    );

    let sql = format!("SELECT {} FROM enrollments e WHERE e.id = ?", Enrollment::COLUMNS);
    Ok(conn.query_row(&sql, [id], Enrollment::from_row)?)
}

pub fn course_students(conn: &Connection, course_id: i64) -> LmsResult<Vec<User>> {
    let sql = format!(
        "SELECT {}
         FROM enrollments e
         JOIN users u ON u.id = e.student_id
         WHERE e.course_id = ?
         ORDER BY e.id",
        User::COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([course_id], User::from_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}
