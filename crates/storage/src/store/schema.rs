#![forbid(unsafe_code)]

use super::{StoreError, now_ms};
use rusqlite::{Connection, OptionalExtension, params};
use std::collections::BTreeSet;

pub(super) const SCHEMA_VERSION: i64 = 1;

const REQUIRED_TABLES: &[&str] = &[
    "store_state",
    "categories",
    "motions",
    "motion_versions",
    "motion_submitters",
    "motion_supporters",
    "comments",
    "polls",
    "poll_options",
    "votes",
    "poll_counters",
];

/// Refuses databases written by a different schema instead of migrating them.
pub(super) fn preflight_gate(conn: &Connection) -> Result<(), StoreError> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
    )?;
    let mut rows = stmt.query([])?;
    let mut tables = BTreeSet::new();
    while let Some(row) = rows.next()? {
        tables.insert(row.get::<_, String>(0)?);
    }

    if tables.is_empty() {
        return Ok(());
    }

    if tables
        .iter()
        .any(|table| !REQUIRED_TABLES.contains(&table.as_str()))
    {
        return Err(StoreError::ResetRequired("unsupported tables detected"));
    }
    if REQUIRED_TABLES.iter().any(|table| !tables.contains(*table)) {
        return Err(StoreError::ResetRequired("required table is missing"));
    }

    let version = conn
        .query_row(
            "SELECT schema_version FROM store_state WHERE singleton=1",
            [],
            |row| row.get::<_, i64>(0),
        )
        .optional()?;

    match version {
        Some(v) if v == SCHEMA_VERSION => Ok(()),
        Some(_) => Err(StoreError::ResetRequired("schema version mismatch")),
        None => Err(StoreError::ResetRequired("schema state row is missing")),
    }
}

pub(super) fn install_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS store_state (
          singleton INTEGER PRIMARY KEY CHECK(singleton = 1),
          schema_version INTEGER NOT NULL,
          created_at_ms INTEGER NOT NULL,
          updated_at_ms INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS categories (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          name TEXT NOT NULL,
          prefix TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS motions (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          revision INTEGER NOT NULL,
          state_id TEXT NOT NULL,
          identifier TEXT UNIQUE,
          category_id INTEGER REFERENCES categories(id) ON DELETE SET NULL,
          master_id INTEGER REFERENCES motions(id) ON DELETE SET NULL,
          permitted_version_id INTEGER REFERENCES motion_versions(id) ON DELETE SET NULL,
          created_at_ms INTEGER NOT NULL,
          updated_at_ms INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_motions_category
          ON motions(category_id, id);

        CREATE TABLE IF NOT EXISTS motion_versions (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          motion_id INTEGER NOT NULL REFERENCES motions(id) ON DELETE CASCADE,
          title TEXT NOT NULL,
          text TEXT NOT NULL,
          reason TEXT,
          note TEXT,
          rejected INTEGER NOT NULL DEFAULT 0,
          created_at_ms INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_motion_versions_motion
          ON motion_versions(motion_id, id);

        CREATE TABLE IF NOT EXISTS motion_submitters (
          motion_id INTEGER NOT NULL REFERENCES motions(id) ON DELETE CASCADE,
          person TEXT NOT NULL,
          created_at_ms INTEGER NOT NULL,
          PRIMARY KEY(motion_id, person)
        );

        CREATE TABLE IF NOT EXISTS motion_supporters (
          motion_id INTEGER NOT NULL REFERENCES motions(id) ON DELETE CASCADE,
          person TEXT NOT NULL,
          created_at_ms INTEGER NOT NULL,
          PRIMARY KEY(motion_id, person)
        );

        CREATE TABLE IF NOT EXISTS comments (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          version_id INTEGER NOT NULL REFERENCES motion_versions(id) ON DELETE CASCADE,
          author TEXT NOT NULL,
          text TEXT NOT NULL,
          created_at_ms INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS polls (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          motion_id INTEGER NOT NULL REFERENCES motions(id) ON DELETE CASCADE,
          poll_number INTEGER NOT NULL CHECK(poll_number > 0),
          votes_cast INTEGER,
          votes_invalid INTEGER,
          created_at_ms INTEGER NOT NULL,
          UNIQUE(motion_id, poll_number)
        );

        CREATE TABLE IF NOT EXISTS poll_options (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          poll_id INTEGER NOT NULL REFERENCES polls(id) ON DELETE CASCADE
        );

        CREATE TABLE IF NOT EXISTS votes (
          option_id INTEGER NOT NULL REFERENCES poll_options(id) ON DELETE CASCADE,
          value TEXT NOT NULL CHECK(value IN ('Yes', 'No', 'Abstain')),
          weight INTEGER NOT NULL CHECK(weight >= 0),
          PRIMARY KEY(option_id, value)
        );

        CREATE TABLE IF NOT EXISTS poll_counters (
          motion_id INTEGER PRIMARY KEY REFERENCES motions(id) ON DELETE CASCADE,
          value INTEGER NOT NULL
        );
        "#,
    )?;

    conn.execute(
        "INSERT INTO store_state(singleton, schema_version, created_at_ms, updated_at_ms) \
         VALUES (1, ?1, ?2, ?2) \
         ON CONFLICT(singleton) DO UPDATE SET schema_version=excluded.schema_version, updated_at_ms=excluded.updated_at_ms",
        params![SCHEMA_VERSION, now_ms()],
    )?;

    Ok(())
}
