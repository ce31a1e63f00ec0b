//! Workspace bundles: a zip holding a consistent snapshot of the store plus a
//! manifest describing it.
//!
//! Export snapshots the live connection with `VACUUM INTO`, so the bundle
//! reflects every committed write without closing the workspace. Import checks
//! the manifest, the snapshot digest, SQLite's own integrity check and the
//! recorded row counts before the snapshot replaces the workspace store.

use anyhow::{anyhow, bail, Context};
use chrono::{SecondsFormat, Utc};
use rusqlite::{Connection, OpenFlags};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

pub const BUNDLE_FORMAT: &str = "lms-workspace-v1";
const BUNDLE_VERSION: u32 = 1;
const MANIFEST_ENTRY: &str = "manifest.json";
const DB_ENTRY: &str = "db/lms.sqlite3";
const WORKSPACE_DB_FILE: &str = "lms.sqlite3";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub format: String,
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub app_version: String,
    #[serde(default)]
    pub exported_at: String,
    #[serde(default)]
    pub db_sha256: String,
    #[serde(default)]
    pub table_counts: BTreeMap<String, i64>,
}

fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Row count of every user table, keyed by table name.
pub fn table_counts(conn: &Connection) -> rusqlite::Result<BTreeMap<String, i64>> {
    let names = {
        let mut stmt = conn.prepare(
            "SELECT name FROM sqlite_master
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
             ORDER BY name",
        )?;
        let rows = stmt.query_map([], |r| r.get::<_, String>(0))?;
        rows.collect::<Result<Vec<_>, _>>()?
    };

    let mut counts = BTreeMap::new();
    for name in names {
        let sql = format!("SELECT COUNT(*) FROM \"{}\"", name.replace('"', "\"\""));
        let n: i64 = conn.query_row(&sql, [], |r| r.get(0))?;
        counts.insert(name, n);
    }
    Ok(counts)
}

fn snapshot_path(out_path: &Path) -> PathBuf {
    let mut name = out_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".snapshot");
    out_path.with_file_name(name)
}

/// Copies the store behind `conn` into a fresh file and returns its bytes.
fn snapshot(conn: &Connection, scratch: &Path) -> anyhow::Result<Vec<u8>> {
    if scratch.exists() {
        std::fs::remove_file(scratch)
            .with_context(|| format!("failed to clear {}", scratch.to_string_lossy()))?;
    }
    let target = scratch.to_string_lossy().to_string();
    conn.execute("VACUUM INTO ?", [&target])
        .context("failed to snapshot database")?;
    let bytes = std::fs::read(scratch);
    let _ = std::fs::remove_file(scratch);
    bytes.with_context(|| format!("failed to read snapshot {}", target))
}

pub fn export_bundle(conn: &Connection, out_path: &Path) -> anyhow::Result<Manifest> {
    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.to_string_lossy()))?;
    }

    let counts = table_counts(conn).context("failed to count rows")?;
    let db_bytes = snapshot(conn, &snapshot_path(out_path))?;
    let manifest = Manifest {
        format: BUNDLE_FORMAT.to_string(),
        version: BUNDLE_VERSION,
        app_version: env!("CARGO_PKG_VERSION").to_string(),
        exported_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        db_sha256: sha256_hex(&db_bytes),
        table_counts: counts,
    };

    let out_file = File::create(out_path)
        .with_context(|| format!("failed to create bundle {}", out_path.to_string_lossy()))?;
    let mut zip = ZipWriter::new(out_file);
    let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);

    zip.start_file(MANIFEST_ENTRY, opts)?;
    serde_json::to_writer_pretty(&mut zip, &manifest).context("failed to write manifest")?;
    zip.start_file(DB_ENTRY, opts)?;
    zip.write_all(&db_bytes)
        .context("failed to write database entry")?;
    zip.finish().context("failed to finalize bundle")?;

    Ok(manifest)
}

fn read_bundle(in_path: &Path) -> anyhow::Result<(Manifest, Vec<u8>)> {
    let file = File::open(in_path)
        .with_context(|| format!("failed to open bundle {}", in_path.to_string_lossy()))?;
    let mut archive = ZipArchive::new(file).context("not a workspace bundle")?;

    let manifest: Manifest = {
        let entry = archive
            .by_name(MANIFEST_ENTRY)
            .context("bundle missing manifest.json")?;
        serde_json::from_reader(entry).context("manifest.json is invalid")?
    };
    if manifest.format != BUNDLE_FORMAT {
        bail!("unsupported bundle format: {}", manifest.format);
    }
    if manifest.db_sha256.is_empty() {
        bail!("manifest missing dbSha256");
    }

    let mut db_bytes = Vec::new();
    archive
        .by_name(DB_ENTRY)
        .with_context(|| format!("bundle missing {}", DB_ENTRY))?
        .read_to_end(&mut db_bytes)
        .context("failed to extract database entry")?;

    let actual = sha256_hex(&db_bytes);
    if actual != manifest.db_sha256.to_ascii_lowercase() {
        bail!(
            "database checksum mismatch: expected {}, got {}",
            manifest.db_sha256,
            actual
        );
    }
    Ok((manifest, db_bytes))
}

/// Opens the extracted snapshot read-only and compares it with the manifest.
fn verify_snapshot(path: &Path, manifest: &Manifest) -> anyhow::Result<()> {
    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
        .context("failed to open extracted database")?;
    let status: String = conn
        .query_row("PRAGMA quick_check", [], |r| r.get(0))
        .context("extracted database is not readable")?;
    if status != "ok" {
        bail!("extracted database failed integrity check: {}", status);
    }

    let counts = table_counts(&conn).context("failed to count restored rows")?;
    for (table, expected) in &manifest.table_counts {
        let actual = counts.get(table).copied();
        if actual != Some(*expected) {
            return Err(anyhow!(
                "row count mismatch for {}: manifest {}, bundle {}",
                table,
                expected,
                actual.map(|n| n.to_string()).unwrap_or_else(|| "missing".into())
            ));
        }
    }
    Ok(())
}

/// Replaces `<workspace>/lms.sqlite3` with the bundle's snapshot. The current
/// store is untouched unless every check passes.
pub fn import_bundle(in_path: &Path, workspace_path: &Path) -> anyhow::Result<Manifest> {
    let (manifest, db_bytes) = read_bundle(in_path)?;

    std::fs::create_dir_all(workspace_path).with_context(|| {
        format!(
            "failed to create workspace {}",
            workspace_path.to_string_lossy()
        )
    })?;
    let dst = workspace_path.join(WORKSPACE_DB_FILE);
    let staged = workspace_path.join(format!("{}.importing", WORKSPACE_DB_FILE));

    std::fs::write(&staged, &db_bytes)
        .with_context(|| format!("failed to stage {}", staged.to_string_lossy()))?;
    if let Err(e) = verify_snapshot(&staged, &manifest) {
        let _ = std::fs::remove_file(&staged);
        return Err(e);
    }

    if dst.exists() {
        std::fs::remove_file(&dst)
            .with_context(|| format!("failed to remove {}", dst.to_string_lossy()))?;
    }
    std::fs::rename(&staged, &dst)
        .with_context(|| format!("failed to move restored database to {}", dst.to_string_lossy()))?;
    Ok(manifest)
}
