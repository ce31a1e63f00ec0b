use crate::lms::model::UserRole;
use rusqlite::ErrorCode;
use serde_json::json;
use thiserror::Error;

pub type LmsResult<T> = Result<T, LmsError>;

#[derive(Debug, Error)]
pub enum LmsError {
    #[error("{0}")]
    Validation(String),

    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("user {user_id} has role {actual}, expected {expected}")]
    InvalidRole {
        user_id: i64,
        actual: UserRole,
        expected: &'static str,
    },

    #[error("user with email {0} already exists")]
    DuplicateEmail(String),

    #[error("student {student_id} is already enrolled in course {course_id}")]
    AlreadyEnrolled { student_id: i64, course_id: i64 },

    #[error("student {student_id} has already submitted assignment {assignment_id}")]
    AlreadySubmitted { assignment_id: i64, student_id: i64 },

    #[error("student {student_id} is not enrolled in course {course_id}")]
    NotEnrolled { student_id: i64, course_id: i64 },

    #[error("cannot delete teacher: user has {active_courses} active courses")]
    Blocked { user_id: i64, active_courses: i64 },

    #[error("constraint violation: {0}")]
    Constraint(String),

    #[error("database error: {0}")]
    Db(rusqlite::Error),
}

impl From<rusqlite::Error> for LmsError {
    fn from(e: rusqlite::Error) -> Self {
        match e {
            rusqlite::Error::SqliteFailure(ref f, ref msg)
                if f.code == ErrorCode::ConstraintViolation =>
            {
                LmsError::Constraint(msg.clone().unwrap_or_else(|| f.to_string()))
            }
            other => LmsError::Db(other),
        }
    }
}

impl LmsError {
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        LmsError::NotFound { entity, id }
    }

    /// Stable wire code for the error response.
    pub fn code(&self) -> &'static str {
        match self {
            LmsError::Validation(_) => "bad_params",
            LmsError::NotFound { .. } => "not_found",
            LmsError::InvalidRole { .. } => "invalid_role",
            LmsError::DuplicateEmail(_)
            | LmsError::AlreadyEnrolled { .. }
            | LmsError::AlreadySubmitted { .. }
            | LmsError::Constraint(_) => "conflict",
            LmsError::NotEnrolled { .. } => "not_enrolled",
            LmsError::Blocked { .. } => "blocked",
            LmsError::Db(_) => "db_query_failed",
        }
    }

    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            LmsError::Validation(_) | LmsError::Db(_) => None,
            LmsError::NotFound { entity, id } => Some(json!({ "entity": entity, "id": id })),
            LmsError::InvalidRole {
                user_id,
                actual,
                expected,
            } => Some(json!({
                "userId": user_id,
                "role": actual,
                "expected": expected
            })),
            LmsError::DuplicateEmail(email) => Some(json!({
                "reason": "duplicate_email",
                "email": email
            })),
            LmsError::AlreadyEnrolled {
                student_id,
                course_id,
            } => Some(json!({
                "reason": "already_enrolled",
                "studentId": student_id,
                "courseId": course_id
            })),
            LmsError::AlreadySubmitted {
                assignment_id,
                student_id,
            } => Some(json!({
                "reason": "already_submitted",
                "assignmentId": assignment_id,
                "studentId": student_id
            })),
            LmsError::Constraint(_) => Some(json!({ "reason": "constraint" })),
            LmsError::NotEnrolled {
                student_id,
                course_id,
            } => Some(json!({ "studentId": student_id, "courseId": course_id })),
            LmsError::Blocked {
                user_id,
                active_courses,
            } => Some(json!({
                "userId": user_id,
                "activeCourses": active_courses
            })),
        }
    }
}
