use crate::db::{self, Patch};
use crate::lms::error::{LmsError, LmsResult};
use crate::lms::model::{User, UserRole};
use crate::lms::validate::{CreateUserInput, GetUsersInput, UpdateUserInput};
use log::info;
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension};

pub(crate) fn find(conn: &Connection, id: i64) -> LmsResult<Option<User>> {
    let sql = format!("SELECT {} FROM users u WHERE u.id = ?", User::COLUMNS);
    Ok(conn.query_row(&sql, [id], User::from_row).optional()?)
}

pub(crate) fn require(conn: &Connection, id: i64) -> LmsResult<User> {
    find(conn, id)?.ok_or_else(|| LmsError::not_found("user", id))
}

/// Loads a user and checks that its role is one of `allowed`.
pub(crate) fn require_role(
    conn: &Connection,
    id: i64,
    allowed: &[UserRole],
    expected: &'static str,
) -> LmsResult<User> {
    let user = require(conn, id)?;
    if !allowed.contains(&user.role) {
        return Err(LmsError::InvalidRole {
            user_id: id,
            actual: user.role,
            expected,
        });
    }
    Ok(user)
}

fn email_owner(conn: &Connection, email: &str) -> LmsResult<Option<i64>> {
    Ok(conn
        .query_row("SELECT id FROM users WHERE email = ?", [email], |r| r.get(0))
        .optional()?)
}

pub fn create(conn: &Connection, input: CreateUserInput) -> LmsResult<User> {
    if email_owner(conn, &input.email)?.is_some() {
        return Err(LmsError::DuplicateEmail(input.email));
    }

    let now = db::timestamp_value(db::now_utc());
    conn.execute(
        "INSERT INTO users(email, first_name, last_name, role, created_at, updated_at)
         VALUES(?, ?, ?, ?, ?, ?)",
        (
            &input.email,
            &input.first_name,
            &input.last_name,
            input.role,
            &now,
            &now,
        ),
    )?;
    let id = conn.last_insert_rowid();
    info!("created user {} ({})", id, input.role);
    require(conn, id)
}

pub fn list(conn: &Connection, input: GetUsersInput) -> LmsResult<Vec<User>> {
    let users = match input.role {
        Some(role) => {
            let sql = format!(
                "SELECT {} FROM users u WHERE u.role = ? ORDER BY u.id",
                User::COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([role], User::from_row)?;
            rows.collect::<Result<Vec<_>, _>>()?
        }
        None => {
            let sql = format!("SELECT {} FROM users u ORDER BY u.id", User::COLUMNS);
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([], User::from_row)?;
            rows.collect::<Result<Vec<_>, _>>()?
        }
    };
    Ok(users)
}

pub fn update(conn: &Connection, input: UpdateUserInput) -> LmsResult<User> {
    let existing = require(conn, input.id)?;

    let mut patch = Patch::new();
    if let Some(email) = input.email {
        if email != existing.email {
            if let Some(owner) = email_owner(conn, &email)? {
                if owner != input.id {
                    return Err(LmsError::DuplicateEmail(email));
                }
            }
        }
        patch.set("email", Value::Text(email));
    }
    if let Some(first_name) = input.first_name {
        patch.set("first_name", Value::Text(first_name));
    }
    if let Some(last_name) = input.last_name {
        patch.set("last_name", Value::Text(last_name));
    }
    if let Some(role) = input.role {
        patch.set("role", Value::Text(role.as_str().to_string()));
    }
    patch.set("updated_at", db::timestamp_value(db::now_utc()));
    patch.apply(conn, "users", input.id)?;

    info!("updated user {}", input.id);
    require(conn, input.id)
}

/// Deletes a user after applying the role-specific rules:
/// students take their enrollments and submissions with them, teachers who
/// still own courses are refused, administrators are removed as-is.
pub fn delete(conn: &Connection, id: i64) -> LmsResult<bool> {
    let tx = conn.unchecked_transaction()?;
    let user = require(&tx, id)?;

    match user.role {
        UserRole::Student => {
            let enrollments = tx.execute("DELETE FROM enrollments WHERE student_id = ?", [id])?;
            let submissions = tx.execute(
                "DELETE FROM assignment_submissions WHERE student_id = ?",
                [id],
            )?;
            info!(
                "user {}: removed {} enrollments, {} submissions",
                id, enrollments, submissions
            );
        }
        UserRole::Teacher => {
            let active_courses: i64 = tx.query_row(
                "SELECT COUNT(*) FROM courses WHERE teacher_id = ?",
                [id],
                |r| r.get(0),
            )?;
            if active_courses > 0 {
                return Err(LmsError::Blocked {
                    user_id: id,
                    active_courses,
                });
            }
        }
        UserRole::Administrator => {}
    }

    tx.execute("DELETE FROM users WHERE id = ?", [id])?;
    tx.commit()?;
    info!("deleted user {} ({})", id, user.role);
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lms::testutil::{course, enroll, memory_store, user};

    #[test]
    fn create_stamps_id_and_timestamps() {
        let conn = memory_store();
        let u = create(
            &conn,
            CreateUserInput {
                email: "ada@example.com".into(),
                first_name: "Ada".into(),
                last_name: "Lovelace".into(),
                role: UserRole::Teacher,
            },
        )
        .expect("create");
        assert!(u.id > 0);
        assert_eq!(u.email, "ada@example.com");
        assert_eq!(u.role, UserRole::Teacher);
        assert!(u.created_at <= u.updated_at);
        assert!((chrono::Utc::now() - u.created_at).num_seconds() < 5);
    }

    #[test]
    fn duplicate_email_is_a_conflict() {
        let conn = memory_store();
        user(&conn, "dup@example.com", UserRole::Student);
        let err = create(
            &conn,
            CreateUserInput {
                email: "dup@example.com".into(),
                first_name: "Second".into(),
                last_name: "User".into(),
                role: UserRole::Teacher,
            },
        )
        .expect_err("duplicate");
        assert!(matches!(err, LmsError::DuplicateEmail(_)));
        assert_eq!(list(&conn, GetUsersInput::default()).expect("list").len(), 1);
    }

    #[test]
    fn list_filters_by_role() {
        let conn = memory_store();
        user(&conn, "s1@example.com", UserRole::Student);
        user(&conn, "t1@example.com", UserRole::Teacher);
        user(&conn, "s2@example.com", UserRole::Student);
        let students = list(
            &conn,
            GetUsersInput {
                role: Some(UserRole::Student),
            },
        )
        .expect("list");
        assert_eq!(students.len(), 2);
        assert!(students.iter().all(|u| u.role == UserRole::Student));
    }

    #[test]
    fn update_changes_only_supplied_fields() {
        let conn = memory_store();
        let u = user(&conn, "old@example.com", UserRole::Student);
        let updated = update(
            &conn,
            UpdateUserInput {
                id: u.id,
                email: None,
                first_name: Some("Renamed".into()),
                last_name: None,
                role: None,
            },
        )
        .expect("update");
        assert_eq!(updated.first_name, "Renamed");
        assert_eq!(updated.last_name, u.last_name);
        assert_eq!(updated.email, u.email);
        assert_eq!(updated.created_at, u.created_at);
        assert!(updated.updated_at >= u.updated_at);
    }

    #[test]
    fn update_rejects_email_of_another_user() {
        let conn = memory_store();
        user(&conn, "taken@example.com", UserRole::Student);
        let u = user(&conn, "mine@example.com", UserRole::Student);
        let err = update(
            &conn,
            UpdateUserInput {
                id: u.id,
                email: Some("taken@example.com".into()),
                first_name: None,
                last_name: None,
                role: None,
            },
        )
        .expect_err("taken");
        assert!(matches!(err, LmsError::DuplicateEmail(_)));
    }

    #[test]
    fn update_missing_user_is_not_found() {
        let conn = memory_store();
        let err = update(
            &conn,
            UpdateUserInput {
                id: 404,
                email: None,
                first_name: None,
                last_name: None,
                role: None,
            },
        )
        .expect_err("missing");
        assert!(matches!(err, LmsError::NotFound { entity: "user", id: 404 }));
    }

    #[test]
    fn teacher_with_courses_is_blocked_until_courses_are_gone() {
        let conn = memory_store();
        let t = user(&conn, "t@example.com", UserRole::Teacher);
        let c = course(&conn, t.id, "Algebra");

        let err = delete(&conn, t.id).expect_err("blocked");
        assert!(matches!(
            err,
            LmsError::Blocked {
                active_courses: 1,
                ..
            }
        ));
        assert!(find(&conn, t.id).expect("find").is_some());

        crate::lms::courses::delete(&conn, c.id).expect("delete course");
        assert!(delete(&conn, t.id).expect("delete teacher"));
        assert!(find(&conn, t.id).expect("find").is_none());
    }

    #[test]
    fn deleting_student_removes_enrollments() {
        let conn = memory_store();
        let t = user(&conn, "t@example.com", UserRole::Teacher);
        let s = user(&conn, "s@example.com", UserRole::Student);
        let c = course(&conn, t.id, "Biology");
        enroll(&conn, s.id, c.id);

        assert!(delete(&conn, s.id).expect("delete"));
        let remaining: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM enrollments WHERE student_id = ?",
                [s.id],
                |r| r.get(0),
            )
            .expect("count");
        assert_eq!(remaining, 0);
    }

    #[test]
    fn administrator_delete_has_no_cascade_of_its_own() {
        let conn = memory_store();
        let bare = user(&conn, "root@example.com", UserRole::Administrator);
        assert!(delete(&conn, bare.id).expect("delete admin"));
        assert!(find(&conn, bare.id).expect("find").is_none());

        let owner = user(&conn, "owner@example.com", UserRole::Administrator);
        let c = course(&conn, owner.id, "Orientation");
        let err = delete(&conn, owner.id).expect_err("still owns a course");
        assert!(matches!(err, LmsError::Constraint(_)));
        assert_eq!(err.code(), "conflict");
        assert!(find(&conn, owner.id).expect("find").is_some());
        assert!(crate::lms::courses::find(&conn, c.id).expect("course").is_some());
    }

    #[test]
    fn deleting_missing_user_is_not_found() {
        let conn = memory_store();
        assert!(matches!(
            delete(&conn, 99),
            Err(LmsError::NotFound { entity: "user", .. })
        ));
    }
}
