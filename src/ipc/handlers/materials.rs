use crate::ipc::helpers::{db_conn, respond};
use crate::ipc::types::{AppState, Request};
use crate::lms::materials;
use crate::lms::validate::{
    self, CourseIdInput, CreateCourseMaterialInput, IdInput, UpdateCourseMaterialInput,
};

fn handle_materials_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let result = validate::parse::<CreateCourseMaterialInput>(&req.params)
        .and_then(|input| materials::create(conn, input));
    respond(req, "material", result)
}

fn handle_materials_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let result = validate::parse::<CourseIdInput>(&req.params)
        .and_then(|input| materials::list(conn, input.course_id));
    respond(req, "materials", result)
}

fn handle_materials_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let result = validate::parse::<UpdateCourseMaterialInput>(&req.params)
        .and_then(|input| materials::update(conn, input));
    respond(req, "material", result)
}

fn handle_materials_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let result = validate::parse::<IdInput>(&req.params)
        .and_then(|input| materials::delete(conn, input.id));
    respond(req, "success", result)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "materials.create" => Some(handle_materials_create(state, req)),
        "materials.list" => Some(handle_materials_list(state, req)),
        "materials.update" => Some(handle_materials_update(state, req)),
        "materials.delete" => Some(handle_materials_delete(state, req)),
        _ => None,
    }
}
