//! SQLite-backed change-tracking store.
//!
//! Owns the only long-lived connection; every subdomain ever observed per
//! root domain is kept with first/last-seen timestamps, so repeated scans
//! can tell new names from known ones. Scans and findings are append-only.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};

use crate::analyze::risk_classifier::Severity;

/// Database wrapper. Cloning shares the underlying connection; writes are
/// serialized through the mutex, which together with the UNIQUE constraint
/// keeps upserts atomic per (root_domain, name).
#[derive(Clone)]
pub struct ScanDb {
    conn: Arc<Mutex<Connection>>,
}

/// One row of the subdomains table.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SubdomainRecord {
    pub id: i64,
    pub root_domain: String,
    pub name: String,
    pub first_seen: String,
    pub last_seen: String,
}

/// Finding data as persisted; the pipeline fills this from enrichment and
/// classification output.
#[derive(Debug, Clone)]
pub struct FindingRecord {
    pub ip: Option<String>,
    pub asn: Option<u32>,
    pub asn_description: Option<String>,
    pub status_code: Option<u16>,
    pub title: Option<String>,
    pub risk_tags: Vec<String>,
    pub risk_score: i32,
    pub severity: Severity,
    pub is_new: bool,
}

/// A finding read back for reporting, joined with its subdomain name.
#[derive(Debug, Clone)]
pub struct StoredFinding {
    pub scan_id: i64,
    pub subdomain_id: i64,
    pub subdomain: String,
    pub ip: Option<String>,
    pub asn: Option<u32>,
    pub asn_description: Option<String>,
    pub status_code: Option<u16>,
    pub title: Option<String>,
    pub risk_score: i32,
    pub severity: String,
    pub risk_tags: Vec<String>,
    pub is_new: bool,
}

impl ScanDb {
    /// Open or create the database at `path` and initialize the schema.
    /// Safe to call on every process start.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create db dir: {}", parent.display()))?;
            }
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open scan db: {}", path.display()))?;

        // WAL for concurrent readers while a scan writes
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        Self::from_connection(conn)
    }

    /// In-memory database, used by tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory scan db")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(())
    }

    /// Insert a new scan row and return its id.
    pub fn create_scan(&self, root_domain: &str) -> Result<i64> {
        let conn = self.conn.lock();
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO scans (root_domain, started_at) VALUES (?1, ?2)",
            params![root_domain, now],
        )
        .context("Failed to create scan")?;
        Ok(conn.last_insert_rowid())
    }

    /// Record an observation of (root_domain, name). First observation
    /// inserts the row with first_seen = last_seen = now and reports true;
    /// later observations only advance last_seen and report false.
    pub fn upsert_subdomain(&self, root_domain: &str, name: &str) -> Result<(i64, bool)> {
        let conn = self.conn.lock();
        let now = Utc::now().to_rfc3339();

        let existing: Option<i64> = conn
            .query_row(
                "SELECT id FROM subdomains WHERE root_domain = ?1 AND name = ?2",
                params![root_domain, name],
                |r| r.get(0),
            )
            .optional()?;

        if let Some(id) = existing {
            conn.execute(
                "UPDATE subdomains SET last_seen = ?1 WHERE id = ?2",
                params![now, id],
            )?;
            return Ok((id, false));
        }

        // The UNIQUE constraint backstops writers on other connections;
        // first_seen is never rewritten on conflict.
        conn.execute(
            "INSERT INTO subdomains (root_domain, name, first_seen, last_seen)
             VALUES (?1, ?2, ?3, ?3)
             ON CONFLICT(root_domain, name) DO UPDATE SET last_seen = excluded.last_seen",
            params![root_domain, name, now],
        )
        .context("Failed to upsert subdomain")?;

        // A writer on another connection may have inserted the row between
        // the SELECT above and this INSERT; in that case first_seen predates
        // this call and the name is not new.
        let (id, first_seen): (i64, String) = conn.query_row(
            "SELECT id, first_seen FROM subdomains WHERE root_domain = ?1 AND name = ?2",
            params![root_domain, name],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )?;
        Ok((id, first_seen == now))
    }

    /// Persist one immutable finding row.
    pub fn insert_finding(
        &self,
        scan_id: i64,
        subdomain_id: i64,
        finding: &FindingRecord,
    ) -> Result<()> {
        let conn = self.conn.lock();
        let tags_json = serde_json::to_string(&finding.risk_tags)?;
        conn.execute(
            "INSERT INTO findings (
                scan_id, subdomain_id, ip, asn, asn_description,
                status_code, title, risk_score, severity,
                risk_tags_json, is_new
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                scan_id,
                subdomain_id,
                finding.ip,
                finding.asn,
                finding.asn_description,
                finding.status_code,
                finding.title,
                finding.risk_score,
                finding.severity.as_str(),
                tags_json,
                finding.is_new,
            ],
        )
        .context("Failed to insert finding")?;
        Ok(())
    }

    /// Single subdomain row, if recorded.
    pub fn get_subdomain(&self, root_domain: &str, name: &str) -> Result<Option<SubdomainRecord>> {
        let conn = self.conn.lock();
        let row = conn
            .query_row(
                "SELECT id, root_domain, name, first_seen, last_seen
                 FROM subdomains WHERE root_domain = ?1 AND name = ?2",
                params![root_domain, name],
                map_subdomain_row,
            )
            .optional()?;
        Ok(row)
    }

    /// Every subdomain ever recorded for a root domain, ordered by name.
    pub fn subdomain_history(&self, root_domain: &str) -> Result<Vec<SubdomainRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT id, root_domain, name, first_seen, last_seen
             FROM subdomains WHERE root_domain = ?1 ORDER BY name",
        )?;
        let rows = stmt
            .query_map(params![root_domain], map_subdomain_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Findings persisted for one scan, joined with subdomain names.
    pub fn findings_for_scan(&self, scan_id: i64) -> Result<Vec<StoredFinding>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT f.scan_id, f.subdomain_id, s.name, f.ip, f.asn, f.asn_description,
                    f.status_code, f.title, f.risk_score, f.severity, f.risk_tags_json, f.is_new
             FROM findings f
             JOIN subdomains s ON s.id = f.subdomain_id
             WHERE f.scan_id = ?1
             ORDER BY s.name",
        )?;
        let rows = stmt
            .query_map(params![scan_id], |row| {
                let tags_json: String = row.get(10)?;
                let risk_tags = serde_json::from_str(&tags_json).unwrap_or_else(|e| {
                    tracing::warn!(scan_id, error = %e, "corrupt risk_tags_json row, reading as empty");
                    Vec::new()
                });
                Ok(StoredFinding {
                    scan_id: row.get(0)?,
                    subdomain_id: row.get(1)?,
                    subdomain: row.get(2)?,
                    ip: row.get(3)?,
                    asn: row.get(4)?,
                    asn_description: row.get(5)?,
                    status_code: row.get(6)?,
                    title: row.get(7)?,
                    risk_score: row.get(8)?,
                    severity: row.get(9)?,
                    risk_tags,
                    is_new: row.get(11)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

fn map_subdomain_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SubdomainRecord> {
    Ok(SubdomainRecord {
        id: row.get(0)?,
        root_domain: row.get(1)?,
        name: row.get(2)?,
        first_seen: row.get(3)?,
        last_seen: row.get(4)?,
    })
}

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS scans (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    root_domain TEXT NOT NULL,
    started_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS subdomains (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    root_domain TEXT NOT NULL,
    name TEXT NOT NULL,
    first_seen TEXT NOT NULL,
    last_seen TEXT NOT NULL,
    UNIQUE(root_domain, name)
);

CREATE TABLE IF NOT EXISTS findings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    scan_id INTEGER NOT NULL,
    subdomain_id INTEGER NOT NULL,
    ip TEXT,
    asn INTEGER,
    asn_description TEXT,
    status_code INTEGER,
    title TEXT,
    risk_score INTEGER,
    severity TEXT,
    risk_tags_json TEXT,
    is_new INTEGER,
    FOREIGN KEY(scan_id) REFERENCES scans(id),
    FOREIGN KEY(subdomain_id) REFERENCES subdomains(id)
);

CREATE INDEX IF NOT EXISTS idx_findings_scan ON findings(scan_id);
CREATE INDEX IF NOT EXISTS idx_subdomains_root ON subdomains(root_domain);
"#;
