use crate::ipc::helpers::{db_conn, respond};
use crate::ipc::types::{AppState, Request};
use crate::lms::enrollments;
use crate::lms::validate::{self, CourseIdInput, CreateEnrollmentInput};

fn handle_enrollments_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let result = validate::parse::<CreateEnrollmentInput>(&req.params)
        .and_then(|input| enrollments::create(conn, input));
    respond(req, "enrollment", result)
}

fn handle_enrollments_course_students(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let result = validate::parse::<CourseIdInput>(&req.params)
        .and_then(|input| enrollments::course_students(conn, input.course_id));
    respond(req, "students", result)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "enrollments.create" => Some(handle_enrollments_create(state, req)),
        "enrollments.courseStudents" => Some(handle_enrollments_course_students(state, req)),
        _ => None,
    }
}
