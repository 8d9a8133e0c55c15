#![forbid(unsafe_code)]

mod categories;
mod comments;
mod error;
mod gate;
mod ledger;
mod motions;
mod polls;
mod requests;
mod schema;
mod supporters;
mod types;

pub use error::StoreError;
pub use ledger::VersionLedger;
pub use requests::*;
pub use types::*;

use motion_core::ids::MotionId;
use rusqlite::{Connection, ErrorCode, OptionalExtension, Transaction, TransactionBehavior, params};
use std::path::{Path, PathBuf};
use std::time::Duration;

const DB_FILE_NAME: &str = "motions.db";

/// SQLite-backed store for motions and everything hanging off them.
///
/// Every mutating operation runs in an IMMEDIATE transaction, so the write
/// lock is held from the first read of a read-then-write sequence.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
    storage_dir: PathBuf,
}

impl SqliteStore {
    pub fn open(storage_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let storage_dir = storage_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&storage_dir)?;

        let db_path = storage_dir.join(DB_FILE_NAME);
        let conn = Connection::open(&db_path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        schema::preflight_gate(&conn)?;
        schema::install_schema(&conn)?;
        tracing::debug!(path = %db_path.display(), "motion store opened");

        Ok(Self { conn, storage_dir })
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    fn immediate_tx(&mut self) -> Result<Transaction<'_>, StoreError> {
        Ok(self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?)
    }
}

fn motion_exists_tx(conn: &Connection, motion_id: MotionId) -> Result<bool, StoreError> {
    Ok(conn
        .query_row(
            "SELECT 1 FROM motions WHERE id=?1",
            params![motion_id.get()],
            |row| row.get::<_, i64>(0),
        )
        .optional()?
        .is_some())
}

fn ensure_motion_exists_tx(conn: &Connection, motion_id: MotionId) -> Result<(), StoreError> {
    if motion_exists_tx(conn, motion_id)? {
        Ok(())
    } else {
        Err(StoreError::UnknownId)
    }
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(code, message) => {
            code.code == ErrorCode::ConstraintViolation
                || message.as_deref().is_some_and(|value| {
                    value.contains("UNIQUE constraint failed")
                        || value.contains("PRIMARY KEY constraint failed")
                })
        }
        _ => false,
    }
}

fn to_sqlite_i64(value: usize) -> Result<i64, StoreError> {
    i64::try_from(value).map_err(|_| StoreError::InvalidInput("numeric overflow"))
}

fn to_usize(value: i64) -> Result<usize, StoreError> {
    usize::try_from(value).map_err(|_| StoreError::InvalidInput("negative count"))
}

fn now_ms() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(duration) => duration,
        Err(_) => return 0,
    };

    i64::try_from(now.as_millis()).unwrap_or(i64::MAX)
}
