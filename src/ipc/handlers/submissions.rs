use crate::ipc::helpers::{db_conn, respond};
use crate::ipc::types::{AppState, Request};
use crate::lms::submissions;
use crate::lms::validate::{
    self, AssignmentIdInput, CreateAssignmentSubmissionInput, GradeSubmissionInput,
    StudentIdInput,
};

fn handle_submissions_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let result = validate::parse::<CreateAssignmentSubmissionInput>(&req.params)
        .and_then(|input| submissions::create(conn, input));
    respond(req, "submission", result)
}

fn handle_submissions_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let result = validate::parse::<AssignmentIdInput>(&req.params)
        .and_then(|input| submissions::by_assignment(conn, input.assignment_id));
    respond(req, "submissions", result)
}

fn handle_submissions_by_student(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let result = validate::parse::<StudentIdInput>(&req.params)
        .and_then(|input| submissions::by_student(conn, input.student_id));
    respond(req, "submissions", result)
}

fn handle_submissions_grade(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let result = validate::parse::<GradeSubmissionInput>(&req.params)
        .and_then(|input| submissions::grade(conn, input));
    respond(req, "submission", result)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "submissions.create" => Some(handle_submissions_create(state, req)),
        "submissions.list" => Some(handle_submissions_list(state, req)),
        "submissions.byStudent" => Some(handle_submissions_by_student(state, req)),
        "submissions.grade" => Some(handle_submissions_grade(state, req)),
        _ => None,
    }
}
