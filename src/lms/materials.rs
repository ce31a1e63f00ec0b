use crate::db::{self, Patch};
use crate::lms::courses;
use crate::lms::error::{LmsError, LmsResult};
use crate::lms::model::CourseMaterial;
use crate::lms::validate::{CreateCourseMaterialInput, UpdateCourseMaterialInput};
use log::info;
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension};

fn find(conn: &Connection, id: i64) -> LmsResult<Option<CourseMaterial>> {
    let sql = format!(
        "SELECT {} FROM course_materials m WHERE m.id = ?",
        CourseMaterial::COLUMNS
    );
    Ok(conn
        .query_row(&sql, [id], CourseMaterial::from_row)
        .optional()?)
}

fn require(conn: &Connection, id: i64) -> LmsResult<CourseMaterial> {
    find(conn, id)?.ok_or_else(|| LmsError::not_found("course material", id))
}

pub fn create(conn: &Connection, input: CreateCourseMaterialInput) -> LmsResult<CourseMaterial> {
    courses::require(conn, input.course_id)?;

    let now = db::timestamp_value(db::now_utc());
    conn.execute(
        "INSERT INTO course_materials(course_id, title, content, file_url, created_at, updated_at)
         VALUES(?, ?, ?, ?, ?, ?)",
        (
            input.course_id,
            &input.title,
            input.content.as_deref(),
            input.file_url.as_deref(),
            &now,
            &now,
        ),
    )?;
    let id = conn.last_insert_rowid();
    info!("created material {} in course {}", id, input.course_id);
    require(conn, id)
}

pub fn list(conn: &Connection, course_id: i64) -> LmsResult<Vec<CourseMaterial>> {
    let sql = format!(
        "SELECT {} FROM course_materials m WHERE m.course_id = ? ORDER BY m.id",
        CourseMaterial::COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([course_id], CourseMaterial::from_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

pub fn update(conn: &Connection, input: UpdateCourseMaterialInput) -> LmsResult<CourseMaterial> {
    require(conn, input.id)?;

    let mut patch = Patch::new();
    if let Some(title) = input.title {
        patch.set("title", Value::Text(title));
    }
    if let Some(content) = input.content {
        patch.set_text("content", content);
    }
    if let Some(file_url) = input.file_url {
        patch.set_text("file_url", file_url);
    }
    patch.set("updated_at", db::timestamp_value(db::now_utc()));
    patch.apply(conn, "course_materials", input.id)?;

    info!("updated material {}", input.id);
    require(conn, input.id)
}

/// Unlike courses and assignments, a missing material is an error.
pub fn delete(conn: &Connection, id: i64) -> LmsResult<bool> {
    require(conn, id)?;
    conn.execute("DELETE FROM course_materials WHERE id = ?", [id])?;
    info!("deleted material {}", id);
    Ok(true)
}
