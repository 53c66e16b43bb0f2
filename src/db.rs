use crate::store::{ReadMode, Store, Table};
use anyhow::{anyhow, Context};
use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::time::{Duration, Instant};

pub const DB_FILE: &str = "rosterd.sqlite3";

pub fn open_db(workspace: &Path) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace)?;
    let db_path = workspace.join(DB_FILE);
    let conn = Connection::open(db_path)?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS sheets(
            name TEXT PRIMARY KEY,
            header TEXT NOT NULL
        )",
        [],
    )?;
    conn.execute(
        "CREATE TABLE IF NOT EXISTS sheet_rows(
            sheet TEXT NOT NULL,
            row_idx INTEGER NOT NULL,
            cells TEXT NOT NULL,
            PRIMARY KEY(sheet, row_idx),
            FOREIGN KEY(sheet) REFERENCES sheets(name)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_sheet_rows_sheet ON sheet_rows(sheet)",
        [],
    )?;

    // Workspaces created before fingerprints/timestamps were tracked.
    ensure_sheets_fingerprint(&conn)?;
    ensure_sheets_updated_at(&conn)?;

    Ok(conn)
}

fn ensure_sheets_fingerprint(conn: &Connection) -> anyhow::Result<()> {
    if table_has_column(conn, "sheets", "fingerprint")? {
        return Ok(());
    }
    conn.execute("ALTER TABLE sheets ADD COLUMN fingerprint TEXT", [])?;
    Ok(())
}

fn ensure_sheets_updated_at(conn: &Connection) -> anyhow::Result<()> {
    if table_has_column(conn, "sheets", "updated_at")? {
        return Ok(());
    }
    conn.execute("ALTER TABLE sheets ADD COLUMN updated_at TEXT", [])?;
    Ok(())
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> anyhow::Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetInfo {
    pub name: String,
    pub columns: usize,
    pub rows: usize,
    pub fingerprint: Option<String>,
    pub updated_at: Option<String>,
}

/// Workspace-local sheet store. Each table is a header plus JSON rows.
pub struct SqliteStore {
    conn: Connection,
    cache_ttl: Duration,
    cache: HashMap<String, (Instant, Table)>,
}

impl SqliteStore {
    pub fn open(workspace: &Path, cache_ttl: Duration) -> anyhow::Result<Self> {
        Ok(Self::from_connection(open_db(workspace)?, cache_ttl))
    }

    pub fn from_connection(conn: Connection, cache_ttl: Duration) -> Self {
        Self {
            conn,
            cache_ttl,
            cache: HashMap::new(),
        }
    }

    pub fn list_sheets(&self) -> anyhow::Result<Vec<SheetInfo>> {
        let mut stmt = self.conn.prepare(
            "SELECT s.name, s.header, s.fingerprint, s.updated_at,
                    (SELECT COUNT(*) FROM sheet_rows r WHERE r.sheet = s.name)
             FROM sheets s
             ORDER BY s.name",
        )?;
        let rows = stmt
            .query_map([], |r| {
                Ok((
                    r.get::<_, String>(0)?,
                    r.get::<_, String>(1)?,
                    r.get::<_, Option<String>>(2)?,
                    r.get::<_, Option<String>>(3)?,
                    r.get::<_, i64>(4)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(name, header, fingerprint, updated_at, count)| {
                let header: Vec<String> = serde_json::from_str(&header)
                    .with_context(|| format!("malformed header for sheet {}", name))?;
                Ok(SheetInfo {
                    name,
                    columns: header.len(),
                    rows: count as usize,
                    fingerprint,
                    updated_at,
                })
            })
            .collect()
    }

    fn read_from_db(&self, name: &str) -> anyhow::Result<Table> {
        let header_raw: Option<String> = self
            .conn
            .query_row("SELECT header FROM sheets WHERE name = ?", [name], |r| {
                r.get(0)
            })
            .optional()?;
        let Some(header_raw) = header_raw else {
            return Err(anyhow!("table not found: {}", name));
        };
        let header: Vec<String> = serde_json::from_str(&header_raw)
            .with_context(|| format!("malformed header for sheet {}", name))?;

        let mut stmt = self
            .conn
            .prepare("SELECT row_idx, cells FROM sheet_rows WHERE sheet = ? ORDER BY row_idx")?;
        let raw_rows = stmt
            .query_map([name], |r| Ok((r.get::<_, i64>(0)?, r.get::<_, String>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut rows = Vec::with_capacity(raw_rows.len());
        for (idx, cells) in raw_rows {
            let row: Vec<Value> = serde_json::from_str(&cells)
                .with_context(|| format!("malformed row {} in sheet {}", idx, name))?;
            rows.push(row);
        }
        Ok(Table { header, rows })
    }
}

impl Store for SqliteStore {
    fn read_table(&mut self, name: &str, mode: ReadMode) -> anyhow::Result<Table> {
        if mode == ReadMode::AllowCached && !self.cache_ttl.is_zero() {
            if let Some((at, table)) = self.cache.get(name) {
                if at.elapsed() < self.cache_ttl {
                    return Ok(table.clone());
                }
            }
        }
        let table = self.read_from_db(name)?;
        if !self.cache_ttl.is_zero() {
            self.cache
                .insert(name.to_string(), (Instant::now(), table.clone()));
        }
        Ok(table)
    }

    fn write_table(&mut self, name: &str, table: &Table) -> anyhow::Result<()> {
        self.cache.remove(name);

        let header = serde_json::to_string(&table.header)?;
        let fingerprint = table.fingerprint();
        let now = chrono::Utc::now().to_rfc3339();

        let tx = self.conn.transaction().context("failed to start transaction")?;
        tx.execute(
            "INSERT INTO sheets(name, header, fingerprint, updated_at)
             VALUES(?, ?, ?, ?)
             ON CONFLICT(name) DO UPDATE SET
               header = excluded.header,
               fingerprint = excluded.fingerprint,
               updated_at = excluded.updated_at",
            (name, &header, &fingerprint, &now),
        )
        .with_context(|| format!("failed to write header for {}", name))?;
        tx.execute("DELETE FROM sheet_rows WHERE sheet = ?", [name])
            .with_context(|| format!("failed to clear rows for {}", name))?;
        {
            let mut stmt =
                tx.prepare("INSERT INTO sheet_rows(sheet, row_idx, cells) VALUES(?, ?, ?)")?;
            for (i, row) in table.rows.iter().enumerate() {
                let cells = serde_json::to_string(row)?;
                stmt.execute((name, i as i64, &cells))
                    .with_context(|| format!("failed to write row {} of {}", i, name))?;
            }
        }
        tx.commit().context("failed to commit table write")?;
        Ok(())
    }
}
