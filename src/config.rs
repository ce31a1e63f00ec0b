use log::{info, warn};
use std::env;
use std::path::PathBuf;

pub const WORKSPACE_VAR: &str = "LMSD_WORKSPACE";

pub struct Config {
    /// Workspace opened before the first request is read.
    pub workspace: Option<PathBuf>,
}

impl Config {
    pub fn load() -> Self {
        match dotenvy::dotenv() {
            Ok(path) => info!("loaded environment from {}", path.to_string_lossy()),
            Err(e) if e.not_found() => {}
            Err(e) => warn!("ignoring unreadable .env file: {e}"),
        }

        Self {
            workspace: optional_path(WORKSPACE_VAR),
        }
    }
}

fn optional_path(key: &str) -> Option<PathBuf> {
    match env::var(key) {
        Ok(v) if !v.trim().is_empty() => Some(PathBuf::from(v.trim())),
        Ok(_) => {
            warn!("{key} is empty, starting without a workspace");
            None
        }
        Err(_) => {
            info!("{key} not set, waiting for workspace.select");
            None
        }
    }
}
