#![forbid(unsafe_code)]

use super::gate::require_capability_tx;
use super::{SqliteStore, StoreError, ensure_motion_exists_tx, now_ms};
use motion_core::ids::{MotionId, PersonRef};
use motion_core::{GatedAction, WorkflowRegistry};
use rusqlite::{Connection, OptionalExtension, params};

#[derive(Clone, Copy)]
enum Membership {
    Submitter,
    Supporter,
}

impl Membership {
    fn table(self) -> &'static str {
        match self {
            Self::Submitter => "motion_submitters",
            Self::Supporter => "motion_supporters",
        }
    }
}

impl SqliteStore {
    /// Adds `person` to the supporters. Returns `false` if already present.
    pub fn support(
        &mut self,
        registry: &WorkflowRegistry,
        motion_id: MotionId,
        person: &PersonRef,
    ) -> Result<bool, StoreError> {
        let tx = self.immediate_tx()?;
        require_capability_tx(&tx, registry, motion_id, GatedAction::Support)?;
        let inserted = insert_member_tx(&tx, Membership::Supporter, motion_id, person)?;
        tx.commit()?;
        tracing::debug!(motion_id = motion_id.get(), person = %person, inserted, "support");
        Ok(inserted)
    }

    /// Removes `person` from the supporters. Returns `false` if absent.
    pub fn unsupport(
        &mut self,
        registry: &WorkflowRegistry,
        motion_id: MotionId,
        person: &PersonRef,
    ) -> Result<bool, StoreError> {
        let tx = self.immediate_tx()?;
        require_capability_tx(&tx, registry, motion_id, GatedAction::Unsupport)?;
        let removed = delete_member_tx(&tx, Membership::Supporter, motion_id, person)?;
        tx.commit()?;
        tracing::debug!(motion_id = motion_id.get(), person = %person, removed, "unsupport");
        Ok(removed)
    }

    pub fn is_supporter(
        &self,
        motion_id: MotionId,
        person: &PersonRef,
    ) -> Result<bool, StoreError> {
        is_member(&self.conn, Membership::Supporter, motion_id, person)
    }

    pub fn supporters(&self, motion_id: MotionId) -> Result<Vec<PersonRef>, StoreError> {
        list_members(&self.conn, Membership::Supporter, motion_id)
    }

    /// Submitting is not state gated.
    pub fn add_submitter(
        &mut self,
        motion_id: MotionId,
        person: &PersonRef,
    ) -> Result<bool, StoreError> {
        let tx = self.immediate_tx()?;
        ensure_motion_exists_tx(&tx, motion_id)?;
        let inserted = insert_member_tx(&tx, Membership::Submitter, motion_id, person)?;
        tx.commit()?;
        Ok(inserted)
    }

    pub fn remove_submitter(
        &mut self,
        motion_id: MotionId,
        person: &PersonRef,
    ) -> Result<bool, StoreError> {
        let tx = self.immediate_tx()?;
        let removed = delete_member_tx(&tx, Membership::Submitter, motion_id, person)?;
        tx.commit()?;
        Ok(removed)
    }

    pub fn is_submitter(
        &self,
        motion_id: MotionId,
        person: &PersonRef,
    ) -> Result<bool, StoreError> {
        is_member(&self.conn, Membership::Submitter, motion_id, person)
    }

    pub fn submitters(&self, motion_id: MotionId) -> Result<Vec<PersonRef>, StoreError> {
        list_members(&self.conn, Membership::Submitter, motion_id)
    }
}

fn insert_member_tx(
    conn: &Connection,
    membership: Membership,
    motion_id: MotionId,
    person: &PersonRef,
) -> Result<bool, StoreError> {
    let inserted = conn.execute(
        &format!(
            "INSERT OR IGNORE INTO {}(motion_id, person, created_at_ms) VALUES (?1, ?2, ?3)",
            membership.table()
        ),
        params![motion_id.get(), person.as_str(), now_ms()],
    )?;
    Ok(inserted > 0)
}

fn delete_member_tx(
    conn: &Connection,
    membership: Membership,
    motion_id: MotionId,
    person: &PersonRef,
) -> Result<bool, StoreError> {
    let removed = conn.execute(
        &format!(
            "DELETE FROM {} WHERE motion_id=?1 AND person=?2",
            membership.table()
        ),
        params![motion_id.get(), person.as_str()],
    )?;
    Ok(removed > 0)
}

fn is_member(
    conn: &Connection,
    membership: Membership,
    motion_id: MotionId,
    person: &PersonRef,
) -> Result<bool, StoreError> {
    Ok(conn
        .query_row(
            &format!(
                "SELECT 1 FROM {} WHERE motion_id=?1 AND person=?2",
                membership.table()
            ),
            params![motion_id.get(), person.as_str()],
            |row| row.get::<_, i64>(0),
        )
        .optional()?
        .is_some())
}

fn list_members(
    conn: &Connection,
    membership: Membership,
    motion_id: MotionId,
) -> Result<Vec<PersonRef>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT person FROM {} WHERE motion_id=?1 ORDER BY created_at_ms ASC, person ASC",
        membership.table()
    ))?;
    let mut rows = stmt.query(params![motion_id.get()])?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let person = PersonRef::try_new(row.get::<_, String>(0)?)
            .map_err(|_| StoreError::InvalidInput("invalid member row"))?;
        out.push(person);
    }
    Ok(out)
}
