use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::lms::{LmsError, LmsResult};
use log::{error, warn};
use rusqlite::Connection;

pub fn db_conn<'a>(state: &'a AppState, req: &Request) -> Result<&'a Connection, serde_json::Value> {
    state
        .db
        .as_ref()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}

/// Wraps a domain result as `{ <key>: value }`, or maps the error to its wire code.
pub fn respond<T: serde::Serialize>(req: &Request, key: &str, result: LmsResult<T>) -> serde_json::Value {
    match result {
        Ok(value) => match serde_json::to_value(value) {
            Ok(v) => {
                let mut body = serde_json::Map::new();
                body.insert(key.to_string(), v);
                ok(&req.id, serde_json::Value::Object(body))
            }
            Err(e) => err(&req.id, "serialize_failed", e.to_string(), None),
        },
        Err(e) => {
            match &e {
                LmsError::Db(inner) => error!("{} failed: {}", req.method, inner),
                other => warn!("{} rejected: {}", req.method, other),
            }
            err(&req.id, e.code(), e.to_string(), e.details())
        }
    }
}
