//! Typed operation inputs and the shape checks applied before any store access.
//!
//! Create inputs use `required_nullable` for columns that may be NULL but must
//! still be present in the payload. Update inputs use `Option<Option<T>>` via
//! `patch_nullable`: an absent key leaves the column alone, `null` clears it.

use crate::lms::error::{LmsError, LmsResult};
use crate::lms::model::UserRole;
use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use validator::Validate;

pub fn parse<T>(params: &serde_json::Value) -> LmsResult<T>
where
    T: DeserializeOwned + Validate,
{
    let raw = if params.is_null() {
        serde_json::Value::Object(Default::default())
    } else {
        params.clone()
    };
    let input: T = serde_json::from_value(raw).map_err(|e| LmsError::Validation(e.to_string()))?;
    input
        .validate()
        .map_err(|e| LmsError::Validation(e.to_string()))?;
    Ok(input)
}

fn required_nullable<'de, D, T>(d: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(d)
}

fn patch_nullable<'de, D, T>(d: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(d).map(Some)
}

/// Accepts an RFC 3339 timestamp, a bare `YYYY-MM-DD` date (midnight UTC), or
/// an integer count of milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DueDate(pub DateTime<Utc>);

impl DueDate {
    pub fn parse(s: &str) -> Result<Self, String> {
        let s = s.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(DueDate(dt.with_timezone(&Utc)));
        }
        if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            if let Some(dt) = d.and_hms_opt(0, 0, 0) {
                return Ok(DueDate(dt.and_utc()));
            }
        }
        Err(format!("invalid date: {}", s))
    }

    pub fn from_millis(ms: i64) -> Result<Self, String> {
        DateTime::from_timestamp_millis(ms)
            .map(DueDate)
            .ok_or_else(|| format!("timestamp out of range: {}", ms))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDueDate {
    Millis(i64),
    Text(String),
}

impl<'de> Deserialize<'de> for DueDate {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        match RawDueDate::deserialize(d)? {
            RawDueDate::Millis(ms) => DueDate::from_millis(ms),
            RawDueDate::Text(s) => DueDate::parse(&s),
        }
        .map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserInput {
    #[validate(email(message = "email must be a valid email address"))]
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GetUsersInput {
    #[serde(default)]
    pub role: Option<UserRole>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserInput {
    pub id: i64,
    #[serde(default)]
    #[validate(email(message = "email must be a valid email address"))]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub role: Option<UserRole>,
}

/// Shared by every delete operation.
#[derive(Debug, Clone, Copy, Deserialize, Validate)]
pub struct IdInput {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCourseInput {
    pub name: String,
    #[serde(deserialize_with = "required_nullable")]
    pub description: Option<String>,
    pub teacher_id: i64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCourseInput {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "patch_nullable")]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub teacher_id: Option<i64>,
}

#[derive(Debug, Clone, Copy, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TeacherIdInput {
    pub teacher_id: i64,
}

#[derive(Debug, Clone, Copy, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct StudentIdInput {
    pub student_id: i64,
}

#[derive(Debug, Clone, Copy, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CourseIdInput {
    pub course_id: i64,
}

#[derive(Debug, Clone, Copy, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentIdInput {
    pub assignment_id: i64,
}

#[derive(Debug, Clone, Copy, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateEnrollmentInput {
    pub student_id: i64,
    pub course_id: i64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCourseMaterialInput {
    pub course_id: i64,
    pub title: String,
    #[serde(deserialize_with = "required_nullable")]
    pub content: Option<String>,
    #[serde(deserialize_with = "required_nullable")]
    pub file_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCourseMaterialInput {
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "patch_nullable")]
    pub content: Option<Option<String>>,
    #[serde(default, deserialize_with = "patch_nullable")]
    pub file_url: Option<Option<String>>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateAssignmentInput {
    pub course_id: i64,
    pub title: String,
    #[serde(deserialize_with = "required_nullable")]
    pub description: Option<String>,
    #[serde(deserialize_with = "required_nullable")]
    pub due_date: Option<DueDate>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAssignmentInput {
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "patch_nullable")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "patch_nullable")]
    pub due_date: Option<Option<DueDate>>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateAssignmentSubmissionInput {
    pub assignment_id: i64,
    pub student_id: i64,
    #[serde(deserialize_with = "required_nullable")]
    pub content: Option<String>,
    #[serde(deserialize_with = "required_nullable")]
    pub file_url: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize, Validate)]
pub struct GradeSubmissionInput {
    pub id: i64,
    pub grade: f64,
}
