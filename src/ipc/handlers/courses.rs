use crate::ipc::helpers::{db_conn, respond};
use crate::ipc::types::{AppState, Request};
use crate::lms::courses;
use crate::lms::validate::{
    self, CreateCourseInput, IdInput, StudentIdInput, TeacherIdInput, UpdateCourseInput,
};

fn handle_courses_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let result = validate::parse::<CreateCourseInput>(&req.params)
        .and_then(|input| courses::create(conn, input));
    respond(req, "course", result)
}

fn handle_courses_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    respond(req, "courses", courses::list(conn))
}

fn handle_courses_by_teacher(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let result = validate::parse::<TeacherIdInput>(&req.params)
        .and_then(|input| courses::by_teacher(conn, input.teacher_id));
    respond(req, "courses", result)
}

fn handle_courses_by_student(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let result = validate::parse::<StudentIdInput>(&req.params)
        .and_then(|input| courses::by_student(conn, input.student_id));
    respond(req, "courses", result)
}

fn handle_courses_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let result = validate::parse::<UpdateCourseInput>(&req.params)
        .and_then(|input| courses::update(conn, input));
    respond(req, "course", result)
}

fn handle_courses_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let result =
        validate::parse::<IdInput>(&req.params).and_then(|input| courses::delete(conn, input.id));
    respond(req, "success", result)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "courses.create" => Some(handle_courses_create(state, req)),
        "courses.list" => Some(handle_courses_list(state, req)),
        "courses.byTeacher" => Some(handle_courses_by_teacher(state, req)),
        "courses.byStudent" => Some(handle_courses_by_student(state, req)),
        "courses.update" => Some(handle_courses_update(state, req)),
        "courses.delete" => Some(handle_courses_delete(state, req)),
        _ => None,
    }
}
