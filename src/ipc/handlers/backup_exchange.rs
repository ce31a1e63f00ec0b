use crate::backup;
use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::db_conn;
use crate::ipc::types::{AppState, Request};
use log::{info, warn};
use serde_json::json;
use std::path::PathBuf;

fn path_param(req: &Request, key: &str) -> Result<PathBuf, serde_json::Value> {
    match req.params.get(key).and_then(|v| v.as_str()).map(str::trim) {
        Some(v) if !v.is_empty() => Ok(PathBuf::from(v)),
        _ => Err(err(&req.id, "bad_params", format!("missing {}", key), None)),
    }
}

fn handle_export(state: &mut AppState, req: &Request) -> serde_json::Value {
    let out = match path_param(req, "outPath") {
        Ok(p) => p,
        Err(e) => return e,
    };
    let conn = match db_conn(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };

    match backup::export_bundle(conn, &out) {
        Ok(manifest) => {
            info!(
                "exported bundle {} ({} tables)",
                out.to_string_lossy(),
                manifest.table_counts.len()
            );
            ok(
                &req.id,
                json!({
                    "path": out.to_string_lossy(),
                    "bundleFormat": manifest.format,
                    "dbSha256": manifest.db_sha256,
                    "tableCounts": manifest.table_counts
                }),
            )
        }
        Err(e) => {
            warn!("bundle export failed: {:#}", e);
            err(
                &req.id,
                "io_failed",
                format!("{:#}", e),
                Some(json!({ "path": out.to_string_lossy() })),
            )
        }
    }
}

fn handle_import(state: &mut AppState, req: &Request) -> serde_json::Value {
    let src = match path_param(req, "inPath") {
        Ok(p) => p,
        Err(e) => return e,
    };
    let target = match path_param(req, "workspacePath") {
        Ok(p) => p,
        Err(_) => match state.workspace.clone() {
            Some(p) => p,
            None => return err(&req.id, "no_workspace", "select a workspace first", None),
        },
    };
    if !src.is_file() {
        return err(
            &req.id,
            "not_found",
            "bundle file not found",
            Some(json!({ "path": src.to_string_lossy() })),
        );
    }

    // The store file is replaced underneath any open handle.
    let replacing_current = state.workspace.as_deref() == Some(target.as_path());
    if replacing_current {
        state.db = None;
    }

    let manifest = match backup::import_bundle(&src, &target) {
        Ok(m) => m,
        Err(e) => {
            warn!("bundle import failed: {:#}", e);
            if replacing_current {
                state.db = db::open_db(&target).ok();
            }
            return err(
                &req.id,
                "io_failed",
                format!("{:#}", e),
                Some(json!({ "path": src.to_string_lossy() })),
            );
        }
    };

    match db::open_db(&target) {
        Ok(conn) => {
            state.workspace = Some(target.clone());
            state.db = Some(conn);
            info!(
                "restored {} into {}",
                src.to_string_lossy(),
                target.to_string_lossy()
            );
            ok(
                &req.id,
                json!({
                    "workspacePath": target.to_string_lossy(),
                    "bundleFormat": manifest.format,
                    "tableCounts": manifest.table_counts
                }),
            )
        }
        Err(e) => err(&req.id, "db_open_failed", format!("{:#}", e), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "backup.exportWorkspaceBundle" => Some(handle_export(state, req)),
        "backup.importWorkspaceBundle" => Some(handle_import(state, req)),
        _ => None,
    }
}
