use crate::db::{self, Patch};
use crate::lms::courses;
use crate::lms::error::{LmsError, LmsResult};
use crate::lms::model::Assignment;
use crate::lms::validate::{CreateAssignmentInput, UpdateAssignmentInput};
use log::info;
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension};

pub(crate) fn find(conn: &Connection, id: i64) -> LmsResult<Option<Assignment>> {
    let sql = format!("SELECT {} FROM assignments a WHERE a.id = ?", Assignment::COLUMNS);
    Ok(conn.query_row(&sql, [id], Assignment::from_row).optional()?)
}

pub(crate) fn require(conn: &Connection, id: i64) -> LmsResult<Assignment> {
    find(conn, id)?.ok_or_else(|| LmsError::not_found("assignment", id))
}

pub fn create(conn: &Connection, input: CreateAssignmentInput) -> LmsResult<Assignment> {
    courses::require(conn, input.course_id)?;

    let now = db::timestamp_value(db::now_utc());
    let due_date = input
        .due_date
        .map(|d| db::timestamp_value(d.0))
        .unwrap_or(Value::Null);
    conn.execute(
        "INSERT INTO assignments(course_id, title, description, due_date, created_at, updated_at)
         VALUES(?, ?, ?, ?, ?, ?)",
        (
            input.course_id,
            &input.title,
            input.description.as_deref(),
            &due_date,
            &now,
            &now,
        ),
    )?;
    let id = conn.last_insert_rowid();
    info!("created assignment {} in course {}", id, input.course_id);
    require(conn, id)
}

pub fn list(conn: &Connection, course_id: i64) -> LmsResult<Vec<Assignment>> {
    let sql = format!(
        "SELECT {} FROM assignments a WHERE a.course_id = ? ORDER BY a.id",
        Assignment::COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([course_id], Assignment::from_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

pub fn update(conn: &Connection, input: UpdateAssignmentInput) -> LmsResult<Assignment> {
    require(conn, input.id)?;

    let mut patch = Patch::new();
    if let Some(title) = input.title {
        patch.set("title", Value::Text(title));
    }
    if let Some(description) = input.description {
        patch.set_text("description", description);
    }
    if let Some(due_date) = input.due_date {
        patch.set(
            "due_date",
            due_date
                .map(|d| db::timestamp_value(d.0))
                .unwrap_or(Value::Null),
        );
    }
    patch.set("updated_at", db::timestamp_value(db::now_utc()));
    patch.apply(conn, "assignments", input.id)?;

    info!("updated assignment {}", input.id);
    require(conn, input.id)
}

/// Removes the assignment's submissions, then the assignment. Returns whether
/// an assignment row was actually removed.
pub fn delete(conn: &Connection, id: i64) -> LmsResult<bool> {
    let tx = conn.unchecked_transaction()?;
    let submissions = tx.execute(
        "DELETE FROM assignment_submissions WHERE assignment_id = ?",
        [id],
    )?;
    let removed = tx.execute("DELETE FROM assignments WHERE id = ?", [id])?;
    tx.commit()?;

    if removed > 0 {
        info!("deleted assignment {} and {} submissions", id, submissions);
    }
    Ok(removed > 0)
}
