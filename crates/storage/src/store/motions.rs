#![forbid(unsafe_code)]

use super::ledger::{append_version_tx, last_version_tx, rewrite_version_tx, version_by_id_tx};
use super::{
    CommitAction, CommitOutcome, ListMotionsRequest, MotionSummary, SqliteStore, StoreError,
    is_constraint_violation, motion_exists_tx, now_ms, to_sqlite_i64,
};
use motion_core::ids::{CategoryId, MotionId, StateId, VersionId};
use motion_core::{
    CommitPlan, Motion, MotionError, MotionRecord, VersioningPolicy, WorkflowRegistry,
};
use rusqlite::{Connection, OptionalExtension, Row, params};

const MOTION_COLUMNS: &str = "id, revision, state_id, identifier, category_id, master_id, \
     permitted_version_id, created_at_ms, updated_at_ms";

impl SqliteStore {
    /// Persists the base record and reconciles staged edits with the ledger.
    ///
    /// The base write and the version write share one IMMEDIATE transaction.
    /// Saved motions are updated only if the stored revision still matches
    /// the one the motion was loaded with.
    pub fn commit_motion(
        &mut self,
        motion: &mut Motion,
        registry: &WorkflowRegistry,
        policy: VersioningPolicy,
    ) -> Result<CommitOutcome, StoreError> {
        motion.ensure_state(registry)?;
        let now_ms = now_ms();

        let tx = self.immediate_tx()?;
        check_references_tx(&tx, motion.record())?;

        let (motion_id, revision, created_at_ms) = match motion.id() {
            None => (
                insert_motion_tx(&tx, motion.record(), now_ms)?,
                1,
                now_ms,
            ),
            Some(motion_id) => (
                motion_id,
                update_motion_tx(&tx, motion_id, motion.record(), now_ms)?,
                motion.record().created_at_ms,
            ),
        };

        motion.refresh_last_version(last_version_tx(&tx, motion_id)?);
        let plan = motion.plan_commit(policy);
        tracing::debug!(
            motion_id = motion_id.get(),
            policy = %policy,
            plan = plan_label(&plan),
            "planned motion commit"
        );

        let (action, version) = match plan {
            CommitPlan::Skip => (CommitAction::Skipped, None),
            CommitPlan::Append(snapshot) => (
                CommitAction::Appended,
                Some(append_version_tx(&tx, motion_id, &snapshot, now_ms)?),
            ),
            CommitPlan::Rewrite {
                version_id,
                snapshot,
            } => (
                CommitAction::Rewritten,
                Some(rewrite_version_tx(&tx, motion_id, version_id, &snapshot)?),
            ),
        };

        tx.commit()?;

        motion.mark_saved(motion_id, revision, created_at_ms, now_ms);
        if let Some(version) = &version {
            motion.mark_version_written(version.clone());
        }

        Ok(CommitOutcome {
            motion_id,
            revision,
            action,
            version,
        })
    }

    pub fn load_motion(&self, motion_id: MotionId) -> Result<Motion, StoreError> {
        let record = self
            .conn
            .query_row(
                &format!("SELECT {MOTION_COLUMNS} FROM motions WHERE id=?1"),
                params![motion_id.get()],
                motion_record_from_row,
            )
            .optional()?
            .ok_or(StoreError::UnknownId)?;
        motion_from_record(&self.conn, record)
    }

    pub fn find_motion_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<Motion>, StoreError> {
        let record = self
            .conn
            .query_row(
                &format!("SELECT {MOTION_COLUMNS} FROM motions WHERE identifier=?1"),
                params![identifier.trim()],
                motion_record_from_row,
            )
            .optional()?;
        record
            .map(|record| motion_from_record(&self.conn, record))
            .transpose()
    }

    pub fn list_motions(
        &self,
        request: ListMotionsRequest,
    ) -> Result<Vec<MotionSummary>, StoreError> {
        let limit = to_sqlite_i64(request.limit)?;
        let offset = to_sqlite_i64(request.offset)?;

        let mut stmt = self.conn.prepare(
            "SELECT m.id, m.state_id, m.identifier, m.category_id, \
               (SELECT v.title FROM motion_versions v WHERE v.motion_id=m.id ORDER BY v.id DESC LIMIT 1), \
               (SELECT COUNT(1) FROM motion_versions v WHERE v.motion_id=m.id) \
             FROM motions m \
             WHERE (?1 IS NULL OR m.category_id=?1) \
             ORDER BY m.id ASC \
             LIMIT ?2 OFFSET ?3",
        )?;

        let mut rows = stmt.query(params![request.category.map(CategoryId::get), limit, offset])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let state_id = StateId::try_new(row.get::<_, String>(1)?)
                .map_err(|_| StoreError::InvalidInput("invalid motion row"))?;
            let version_count = usize::try_from(row.get::<_, i64>(5)?)
                .map_err(|_| StoreError::InvalidInput("invalid motion row"))?;
            out.push(MotionSummary {
                id: MotionId::new(row.get(0)?),
                state_id,
                identifier: row.get(2)?,
                category: row.get::<_, Option<i64>>(3)?.map(CategoryId::new),
                title: row.get(4)?,
                version_count,
            });
        }
        Ok(out)
    }

    /// Selects the `ordinal`-th version (1-based) as the one getters read from.
    pub fn select_version_by_ordinal(
        &self,
        motion: &mut Motion,
        ordinal: usize,
    ) -> Result<(), StoreError> {
        let Some(motion_id) = motion.id() else {
            return Err(
                MotionError::Validation("cannot select a version of an unsaved motion").into(),
            );
        };
        let version = self.ledger(motion_id).by_ordinal(ordinal)?;
        motion.select_by_handle(version)?;
        Ok(())
    }
}

fn plan_label(plan: &CommitPlan) -> &'static str {
    match plan {
        CommitPlan::Skip => "skip",
        CommitPlan::Append(_) => "append",
        CommitPlan::Rewrite { .. } => "rewrite",
    }
}

fn motion_record_from_row(row: &Row<'_>) -> rusqlite::Result<(MotionRecord, String)> {
    let record = MotionRecord {
        id: Some(MotionId::new(row.get(0)?)),
        revision: row.get(1)?,
        state_id: None,
        identifier: row.get(3)?,
        category: row.get::<_, Option<i64>>(4)?.map(CategoryId::new),
        master: row.get::<_, Option<i64>>(5)?.map(MotionId::new),
        permitted_version: row.get::<_, Option<i64>>(6)?.map(VersionId::new),
        created_at_ms: row.get(7)?,
        updated_at_ms: row.get(8)?,
    };
    Ok((record, row.get(2)?))
}

fn motion_from_record(
    conn: &Connection,
    (mut record, state_id): (MotionRecord, String),
) -> Result<Motion, StoreError> {
    record.state_id = Some(
        StateId::try_new(state_id).map_err(|_| StoreError::InvalidInput("invalid motion row"))?,
    );
    let last_version = match record.id {
        Some(motion_id) => last_version_tx(conn, motion_id)?,
        None => None,
    };
    Ok(Motion::from_record(record, last_version))
}

fn check_references_tx(conn: &Connection, record: &MotionRecord) -> Result<(), StoreError> {
    if let Some(master) = record.master {
        if record.id == Some(master) {
            return Err(MotionError::Validation("motion cannot be its own master").into());
        }
        if !motion_exists_tx(conn, master)? {
            return Err(StoreError::UnknownId);
        }
    }

    if let Some(category) = record.category {
        let exists = conn
            .query_row(
                "SELECT 1 FROM categories WHERE id=?1",
                params![category.get()],
                |row| row.get::<_, i64>(0),
            )
            .optional()?
            .is_some();
        if !exists {
            return Err(StoreError::UnknownId);
        }
    }

    if let Some(version_id) = record.permitted_version {
        let version = version_by_id_tx(conn, version_id)?.ok_or(StoreError::UnknownId)?;
        if record.id != Some(version.motion_id) {
            return Err(MotionError::Validation(
                "permitted version belongs to a different motion",
            )
            .into());
        }
    }

    Ok(())
}

fn state_column(record: &MotionRecord) -> Result<&str, StoreError> {
    record
        .state_id
        .as_ref()
        .map(StateId::as_str)
        .ok_or(StoreError::InvalidInput("motion state must be set before saving"))
}

fn map_identifier_conflict(err: rusqlite::Error, record: &MotionRecord) -> StoreError {
    if is_constraint_violation(&err)
        && let Some(identifier) = &record.identifier
    {
        return StoreError::IdentifierTaken(identifier.clone());
    }
    StoreError::Sql(err)
}

fn insert_motion_tx(
    conn: &Connection,
    record: &MotionRecord,
    now_ms: i64,
) -> Result<MotionId, StoreError> {
    conn.execute(
        "INSERT INTO motions(revision, state_id, identifier, category_id, master_id, \
           permitted_version_id, created_at_ms, updated_at_ms) \
         VALUES (1, ?1, ?2, ?3, ?4, NULL, ?5, ?5)",
        params![
            state_column(record)?,
            record.identifier,
            record.category.map(CategoryId::get),
            record.master.map(MotionId::get),
            now_ms,
        ],
    )
    .map_err(|err| map_identifier_conflict(err, record))?;
    let motion_id = MotionId::new(conn.last_insert_rowid());
    tracing::info!(motion_id = motion_id.get(), "created motion");
    Ok(motion_id)
}

fn update_motion_tx(
    conn: &Connection,
    motion_id: MotionId,
    record: &MotionRecord,
    now_ms: i64,
) -> Result<i64, StoreError> {
    let current: i64 = conn
        .query_row(
            "SELECT revision FROM motions WHERE id=?1",
            params![motion_id.get()],
            |row| row.get(0),
        )
        .optional()?
        .ok_or(StoreError::UnknownId)?;

    if current != record.revision {
        tracing::warn!(
            motion_id = motion_id.get(),
            expected = record.revision,
            actual = current,
            "stale motion rejected"
        );
        return Err(StoreError::RevisionMismatch {
            expected: record.revision,
            actual: current,
        });
    }

    let next = current + 1;
    conn.execute(
        "UPDATE motions SET revision=?2, state_id=?3, identifier=?4, category_id=?5, master_id=?6, \
           permitted_version_id=?7, updated_at_ms=?8 \
         WHERE id=?1",
        params![
            motion_id.get(),
            next,
            state_column(record)?,
            record.identifier,
            record.category.map(CategoryId::get),
            record.master.map(MotionId::get),
            record.permitted_version.map(VersionId::get),
            now_ms,
        ],
    )
    .map_err(|err| map_identifier_conflict(err, record))?;
    Ok(next)
}

