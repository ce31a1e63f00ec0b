use crate::ipc::helpers::{db_conn, respond};
use crate::ipc::types::{AppState, Request};
use crate::lms::users;
use crate::lms::validate::{self, CreateUserInput, GetUsersInput, IdInput, UpdateUserInput};

fn handle_users_create(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let result = validate::parse::<CreateUserInput>(&req.params)
        .and_then(|input| users::create(conn, input));
    respond(req, "user", result)
}

fn handle_users_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let result =
        validate::parse::<GetUsersInput>(&req.params).and_then(|input| users::list(conn, input));
    respond(req, "users", result)
}

fn handle_users_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let result = validate::parse::<UpdateUserInput>(&req.params)
        .and_then(|input| users::update(conn, input));
    respond(req, "user", result)
}

fn handle_users_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let result =
        validate::parse::<IdInput>(&req.params).and_then(|input| users::delete(conn, input.id));
    respond(req, "success", result)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "users.create" => Some(handle_users_create(state, req)),
        "users.list" => Some(handle_users_list(state, req)),
        "users.update" => Some(handle_users_update(state, req)),
        "users.delete" => Some(handle_users_delete(state, req)),
        _ => None,
    }
}
