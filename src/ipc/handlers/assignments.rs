use crate::ipc::helpers::{db_conn, respond};
use crate::ipc::types::{AppState, Request};
use crate::lms::assignments;
use crate::lms::validate::{
    self, CourseIdInput, CreateAssignmentInput, IdInput, UpdateAssignmentInput,
};

fn handle_assignments_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let result = validate::parse::<CreateAssignmentInput>(&req.params)
        .and_then(|input| assignments::create(conn, input));
    respond(req, "assignment", result)
}

fn handle_assignments_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let result = validate::parse::<CourseIdInput>(&req.params)
        .and_then(|input| assignments::list(conn, input.course_id));
    respond(req, "assignments", result)
}

fn handle_assignments_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let result = validate::parse::<UpdateAssignmentInput>(&req.params)
        .and_then(|input| assignments::update(conn, input));
    respond(req, "assignment", result)
}

fn handle_assignments_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let result = validate::parse::<IdInput>(&req.params)
        .and_then(|input| assignments::delete(conn, input.id));
    respond(req, "success", result)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "assignments.create" => Some(handle_assignments_create(state, req)),
        "assignments.list" => Some(handle_assignments_list(state, req)),
        "assignments.update" => Some(handle_assignments_update(state, req)),
        "assignments.delete" => Some(handle_assignments_delete(state, req)),
        _ => None,
    }
}
