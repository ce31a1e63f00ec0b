use crate::db;
use crate::lms::error::{LmsError, LmsResult};
use crate::lms::model::{AssignmentSubmission, UserRole};
use crate::lms::validate::{CreateAssignmentSubmissionInput, GradeSubmissionInput};
use crate::lms::{assignments, enrollments, users};
use log::info;
use rusqlite::{Connection, OptionalExtension};

fn find(conn: &Connection, id: i64) -> LmsResult<Option<AssignmentSubmission>> {
    let sql = format!(
        "SELECT {} FROM assignment_submissions s WHERE s.id = ?",
        AssignmentSubmission::COLUMNS
    );
    Ok(conn
        .query_row(&sql, [id], AssignmentSubmission::from_row)
        .optional()?)
}

fn require(conn: &Connection, id: i64) -> LmsResult<AssignmentSubmission> {
    find(conn, id)?.ok_or_else(|| LmsError::not_found("assignment submission", id))
}

fn already_submitted(conn: &Connection, assignment_id: i64, student_id: i64) -> LmsResult<bool> {
    let hit: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM assignment_submissions WHERE assignment_id = ? AND student_id = ?",
            [assignment_id, student_id],
            |r| r.get(0),
        )
        .optional()?;
    Ok(hit.is_some())
}

pub fn create(
    conn: &Connection,
    input: CreateAssignmentSubmissionInput,
) -> LmsResult<AssignmentSubmission> {
    let assignment = assignments::require(conn, input.assignment_id)?;
    users::require_role(conn, input.student_id, &[UserRole::Student], "student")?;
    if !enrollments::exists(conn, input.student_id, assignment.course_id)? {
        return Err(LmsError::NotEnrolled {
            student_id: input.student_id,
            course_id: assignment.course_id,
        });
    }
    if already_submitted(conn, input.assignment_id, input.student_id)? {
        return Err(LmsError::AlreadySubmitted {
            assignment_id: input.assignment_id,
            student_id: input.student_id,
        });
    }

    let now = db::timestamp_value(db::now_utc());
    conn.execute(
        "INSERT INTO assignment_submissions(assignment_id, student_id, content, file_url, submitted_at)
         VALUES(?, ?, ?, ?, ?)",
        (
            input.assignment_id,
            input.student_id,
            input.content.as_deref(),
            input.file_url.as_deref(),
            &now,
        ),
    )?;
    let id = conn.last_insert_rowid();
    info!(
        "student {} submitted assignment {}",
        input.student_id, input.assignment_id
    );
    require(conn, id)
}

pub fn by_assignment(conn: &Connection, assignment_id: i64) -> LmsResult<Vec<AssignmentSubmission>> {
    let sql = format!(
        "SELECT {} FROM assignment_submissions s WHERE s.assignment_id = ? ORDER BY s.id",
        AssignmentSubmission::COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([assignment_id], AssignmentSubmission::from_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

pub fn by_student(conn: &Connection, student_id: i64) -> LmsResult<Vec<AssignmentSubmission>> {
    let sql = format!(
        "SELECT {} FROM assignment_submissions s WHERE s.student_id = ? ORDER BY s.id",
        AssignmentSubmission::COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([student_id], AssignmentSubmission::from_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

/// Sets grade and graded_at; every other column is left as submitted.
pub fn grade(conn: &Connection, input: GradeSubmissionInput) -> LmsResult<AssignmentSubmission> {
    let graded_at = db::timestamp_value(db::now_utc());
    let changed = conn.execute(
        "UPDATE assignment_submissions SET grade = ?, graded_at = ? WHERE id = ?",
        (input.grade, &graded_at, input.id),
    )?;
    if changed == 0 {
        return Err(LmsError::not_found("assignment submission", input.id));
    }
    info!("graded submission {}: {}", input.id, input.grade);
    require(conn, input.id)
}
