#![forbid(unsafe_code)]

use super::gate::require_capability_tx;
use super::{SqliteStore, StoreError, now_ms, to_usize};
use motion_core::ids::{MotionId, PollId};
use motion_core::poll::{
    CountingPolicy, MotionPoll, Tally, VoteCounts, VoteValue, next_poll_number, tally,
};
use motion_core::{GatedAction, WorkflowRegistry};
use rusqlite::{Connection, OptionalExtension, Row, params};

const POLL_COLUMNS: &str = "id, motion_id, poll_number, votes_cast, votes_invalid, created_at_ms";

impl SqliteStore {
    /// Creates the next numbered poll of a motion together with its default
    /// option. Numbers are read and written under the write lock, and the
    /// counter row keeps them from being reused after a delete.
    pub fn create_poll(
        &mut self,
        registry: &WorkflowRegistry,
        motion_id: MotionId,
    ) -> Result<MotionPoll, StoreError> {
        let now_ms = now_ms();
        let tx = self.immediate_tx()?;
        require_capability_tx(&tx, registry, motion_id, GatedAction::CreatePoll)?;

        let max_existing = tx.query_row(
            "SELECT MAX(poll_number) FROM polls WHERE motion_id=?1",
            params![motion_id.get()],
            |row| row.get::<_, Option<i64>>(0),
        )?;
        let counter = tx
            .query_row(
                "SELECT value FROM poll_counters WHERE motion_id=?1",
                params![motion_id.get()],
                |row| row.get::<_, i64>(0),
            )
            .optional()?
            .unwrap_or(0);
        let poll_number = next_poll_number(max_existing, counter);
        tracing::debug!(
            motion_id = motion_id.get(),
            ?max_existing,
            counter,
            poll_number,
            "allocated poll number"
        );

        tx.execute(
            r#"
            INSERT INTO poll_counters(motion_id, value) VALUES (?1, ?2)
            ON CONFLICT(motion_id) DO UPDATE SET value=excluded.value
            "#,
            params![motion_id.get(), poll_number],
        )?;
        tx.execute(
            "INSERT INTO polls(motion_id, poll_number, votes_cast, votes_invalid, created_at_ms) \
             VALUES (?1, ?2, NULL, NULL, ?3)",
            params![motion_id.get(), poll_number, now_ms],
        )?;
        let poll_id = PollId::new(tx.last_insert_rowid());
        tx.execute(
            "INSERT INTO poll_options(poll_id) VALUES (?1)",
            params![poll_id.get()],
        )?;
        tx.commit()?;

        tracing::info!(
            motion_id = motion_id.get(),
            poll_id = poll_id.get(),
            poll_number,
            "created poll"
        );
        Ok(MotionPoll {
            id: poll_id,
            motion_id,
            poll_number,
            votes_cast: None,
            votes_invalid: None,
            created_at_ms: now_ms,
        })
    }

    pub fn polls(&self, motion_id: MotionId) -> Result<Vec<MotionPoll>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {POLL_COLUMNS} FROM polls WHERE motion_id=?1 ORDER BY poll_number ASC"
        ))?;
        let rows = stmt.query_map(params![motion_id.get()], poll_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn poll(
        &self,
        motion_id: MotionId,
        poll_number: i64,
    ) -> Result<Option<MotionPoll>, StoreError> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {POLL_COLUMNS} FROM polls WHERE motion_id=?1 AND poll_number=?2"),
                params![motion_id.get(), poll_number],
                poll_from_row,
            )
            .optional()?)
    }

    /// Deletes a poll with its options and votes. Its number stays retired.
    pub fn delete_poll(&mut self, motion_id: MotionId, poll_number: i64) -> Result<(), StoreError> {
        let tx = self.immediate_tx()?;
        let deleted = tx.execute(
            "DELETE FROM polls WHERE motion_id=?1 AND poll_number=?2",
            params![motion_id.get(), poll_number],
        )?;
        if deleted == 0 {
            return Err(StoreError::UnknownId);
        }
        tx.commit()?;
        tracing::info!(motion_id = motion_id.get(), poll_number, "deleted poll");
        Ok(())
    }

    /// 1-based position of the poll among its motion's polls, in creation order.
    pub fn ballot(&self, poll: &MotionPoll) -> Result<usize, StoreError> {
        let count = self.conn.query_row(
            "SELECT COUNT(1) FROM polls WHERE motion_id=?1 AND id<=?2",
            params![poll.motion_id.get(), poll.id.get()],
            |row| row.get::<_, i64>(0),
        )?;
        to_usize(count)
    }

    /// Replaces the vote rows of the poll's default option.
    pub fn record_votes(&mut self, poll_id: PollId, counts: VoteCounts) -> Result<(), StoreError> {
        counts.validate().map_err(StoreError::InvalidInput)?;

        let tx = self.immediate_tx()?;
        let option_id = default_option_tx(&tx, poll_id)?;
        tx.execute("DELETE FROM votes WHERE option_id=?1", params![option_id])?;
        for value in VoteValue::ALL {
            tx.execute(
                "INSERT INTO votes(option_id, value, weight) VALUES (?1, ?2, ?3)",
                params![option_id, value.as_str(), counts.get(value)],
            )?;
        }
        tx.execute(
            "UPDATE polls SET votes_cast=?2, votes_invalid=?3 WHERE id=?1",
            params![poll_id.get(), counts.votes_cast, counts.votes_invalid],
        )?;
        tx.commit()?;
        tracing::debug!(poll_id = poll_id.get(), "recorded votes");
        Ok(())
    }

    pub fn vote_counts(&self, poll_id: PollId) -> Result<VoteCounts, StoreError> {
        let (votes_cast, votes_invalid) = self
            .conn
            .query_row(
                "SELECT votes_cast, votes_invalid FROM polls WHERE id=?1",
                params![poll_id.get()],
                |row| Ok((row.get::<_, Option<i64>>(0)?, row.get::<_, Option<i64>>(1)?)),
            )
            .optional()?
            .ok_or(StoreError::UnknownId)?;

        let option_id = default_option_tx(&self.conn, poll_id)?;
        let mut counts = VoteCounts {
            votes_cast,
            votes_invalid,
            ..VoteCounts::default()
        };
        let mut stmt = self
            .conn
            .prepare("SELECT value, weight FROM votes WHERE option_id=?1")?;
        let mut rows = stmt.query(params![option_id])?;
        while let Some(row) = rows.next()? {
            let value = row
                .get::<_, String>(0)?
                .parse::<VoteValue>()
                .map_err(StoreError::InvalidInput)?;
            let weight = row.get::<_, i64>(1)?;
            match value {
                VoteValue::Yes => counts.yes = weight,
                VoteValue::No => counts.no = weight,
                VoteValue::Abstain => counts.abstain = weight,
            }
        }
        Ok(counts)
    }

    pub fn poll_result(
        &self,
        poll_id: PollId,
        policy: &CountingPolicy,
    ) -> Result<Tally, StoreError> {
        let counts = self.vote_counts(poll_id)?;
        Ok(tally(&counts, policy))
    }
}

fn poll_from_row(row: &Row<'_>) -> rusqlite::Result<MotionPoll> {
    Ok(MotionPoll {
        id: PollId::new(row.get(0)?),
        motion_id: MotionId::new(row.get(1)?),
        poll_number: row.get(2)?,
        votes_cast: row.get(3)?,
        votes_invalid: row.get(4)?,
        created_at_ms: row.get(5)?,
    })
}

fn default_option_tx(conn: &Connection, poll_id: PollId) -> Result<i64, StoreError> {
    conn.query_row(
        "SELECT id FROM poll_options WHERE poll_id=?1 ORDER BY id ASC LIMIT 1",
        params![poll_id.get()],
        |row| row.get::<_, i64>(0),
    )
    .optional()?
    .ok_or(StoreError::UnknownId)
}
