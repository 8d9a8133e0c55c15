#![forbid(unsafe_code)]

use super::{SqliteStore, StoreError, ensure_motion_exists_tx, now_ms, to_sqlite_i64, to_usize};
use motion_core::ids::{MotionId, VersionId};
use motion_core::{MotionError, MotionVersion, VersionSnapshot};
use rusqlite::{Connection, OptionalExtension, Row, params};

const VERSION_COLUMNS: &str =
    "id, motion_id, title, text, reason, note, rejected, created_at_ms";

/// Append-only view of one motion's versions.
///
/// Creation order is the AUTOINCREMENT id order. There is no way to remove
/// or reorder entries through this handle.
#[derive(Debug)]
pub struct VersionLedger<'a> {
    conn: &'a Connection,
    motion_id: MotionId,
}

impl SqliteStore {
    pub fn ledger(&self, motion_id: MotionId) -> VersionLedger<'_> {
        VersionLedger {
            conn: &self.conn,
            motion_id,
        }
    }

    pub fn version(&self, version_id: VersionId) -> Result<Option<MotionVersion>, StoreError> {
        version_by_id_tx(&self.conn, version_id)
    }
}

impl VersionLedger<'_> {
    pub fn motion_id(&self) -> MotionId {
        self.motion_id
    }

    pub fn append(&self, snapshot: &VersionSnapshot) -> Result<MotionVersion, StoreError> {
        ensure_motion_exists_tx(self.conn, self.motion_id)?;
        append_version_tx(self.conn, self.motion_id, snapshot, now_ms())
    }

    pub fn last(&self) -> Result<Option<MotionVersion>, StoreError> {
        last_version_tx(self.conn, self.motion_id)
    }

    pub fn count(&self) -> Result<usize, StoreError> {
        count_versions_tx(self.conn, self.motion_id)
    }

    /// 1-based lookup in creation order.
    pub fn by_ordinal(&self, ordinal: usize) -> Result<MotionVersion, StoreError> {
        version_by_ordinal_tx(self.conn, self.motion_id, ordinal)
    }

    /// 1 + the number of this motion's versions created before `version`.
    pub fn version_number(&self, version: &MotionVersion) -> Result<usize, StoreError> {
        if version.motion_id != self.motion_id {
            return Err(MotionError::Validation("version belongs to a different motion").into());
        }
        version_number_tx(self.conn, version)
    }

    pub fn all(&self) -> Result<Vec<MotionVersion>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {VERSION_COLUMNS} FROM motion_versions WHERE motion_id=?1 ORDER BY id ASC"
        ))?;
        let rows = stmt.query_map(params![self.motion_id.get()], version_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

pub(super) fn version_from_row(row: &Row<'_>) -> rusqlite::Result<MotionVersion> {
    Ok(MotionVersion {
        id: VersionId::new(row.get(0)?),
        motion_id: MotionId::new(row.get(1)?),
        content: VersionSnapshot {
            title: row.get(2)?,
            text: row.get(3)?,
            reason: row.get(4)?,
        },
        note: row.get(5)?,
        rejected: row.get(6)?,
        created_at_ms: row.get(7)?,
    })
}

pub(super) fn append_version_tx(
    conn: &Connection,
    motion_id: MotionId,
    snapshot: &VersionSnapshot,
    now_ms: i64,
) -> Result<MotionVersion, StoreError> {
    conn.execute(
        "INSERT INTO motion_versions(motion_id, title, text, reason, note, rejected, created_at_ms) \
         VALUES (?1, ?2, ?3, ?4, NULL, 0, ?5)",
        params![
            motion_id.get(),
            snapshot.title,
            snapshot.text,
            snapshot.reason,
            now_ms
        ],
    )?;
    let version = MotionVersion {
        id: VersionId::new(conn.last_insert_rowid()),
        motion_id,
        content: snapshot.clone(),
        note: None,
        rejected: false,
        created_at_ms: now_ms,
    };
    tracing::info!(
        motion_id = motion_id.get(),
        version_id = version.id.get(),
        "appended motion version"
    );
    Ok(version)
}

/// The deliberate in-place path: overwrites the content of an existing version.
pub(super) fn rewrite_version_tx(
    conn: &Connection,
    motion_id: MotionId,
    version_id: VersionId,
    snapshot: &VersionSnapshot,
) -> Result<MotionVersion, StoreError> {
    let updated = conn.execute(
        "UPDATE motion_versions SET title=?3, text=?4, reason=?5 WHERE id=?1 AND motion_id=?2",
        params![
            version_id.get(),
            motion_id.get(),
            snapshot.title,
            snapshot.text,
            snapshot.reason
        ],
    )?;
    if updated == 0 {
        return Err(StoreError::UnknownId);
    }
    tracing::info!(
        motion_id = motion_id.get(),
        version_id = version_id.get(),
        "rewrote motion version in place"
    );
    version_by_id_tx(conn, version_id)?.ok_or(StoreError::UnknownId)
}

pub(super) fn version_by_id_tx(
    conn: &Connection,
    version_id: VersionId,
) -> Result<Option<MotionVersion>, StoreError> {
    Ok(conn
        .query_row(
            &format!("SELECT {VERSION_COLUMNS} FROM motion_versions WHERE id=?1"),
            params![version_id.get()],
            version_from_row,
        )
        .optional()?)
}

pub(super) fn last_version_tx(
    conn: &Connection,
    motion_id: MotionId,
) -> Result<Option<MotionVersion>, StoreError> {
    Ok(conn
        .query_row(
            &format!(
                "SELECT {VERSION_COLUMNS} FROM motion_versions WHERE motion_id=?1 ORDER BY id DESC LIMIT 1"
            ),
            params![motion_id.get()],
            version_from_row,
        )
        .optional()?)
}

pub(super) fn count_versions_tx(
    conn: &Connection,
    motion_id: MotionId,
) -> Result<usize, StoreError> {
    let count = conn.query_row(
        "SELECT COUNT(1) FROM motion_versions WHERE motion_id=?1",
        params![motion_id.get()],
        |row| row.get::<_, i64>(0),
    )?;
    to_usize(count)
}

fn version_by_ordinal_tx(
    conn: &Connection,
    motion_id: MotionId,
    ordinal: usize,
) -> Result<MotionVersion, StoreError> {
    let count = count_versions_tx(conn, motion_id)?;
    if ordinal == 0 || ordinal > count {
        return Err(MotionError::Range { ordinal, count }.into());
    }
    let offset = to_sqlite_i64(ordinal - 1)?;
    Ok(conn.query_row(
        &format!(
            "SELECT {VERSION_COLUMNS} FROM motion_versions WHERE motion_id=?1 ORDER BY id ASC LIMIT 1 OFFSET ?2"
        ),
        params![motion_id.get(), offset],
        version_from_row,
    )?)
}

fn version_number_tx(conn: &Connection, version: &MotionVersion) -> Result<usize, StoreError> {
    let before = conn.query_row(
        "SELECT COUNT(1) FROM motion_versions WHERE motion_id=?1 AND id < ?2",
        params![version.motion_id.get(), version.id.get()],
        |row| row.get::<_, i64>(0),
    )?;
    Ok(to_usize(before)? + 1)
}
