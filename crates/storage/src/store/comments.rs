#![forbid(unsafe_code)]

use super::ledger::version_by_id_tx;
use super::{SqliteStore, StoreError, now_ms};
use motion_core::ids::{CommentId, PersonRef, VersionId};
use motion_core::version::Comment;
use rusqlite::params;

impl SqliteStore {
    pub fn add_comment(
        &mut self,
        version_id: VersionId,
        author: &PersonRef,
        text: &str,
    ) -> Result<Comment, StoreError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(StoreError::InvalidInput("comment text must not be empty"));
        }
        let now_ms = now_ms();

        let tx = self.immediate_tx()?;
        version_by_id_tx(&tx, version_id)?.ok_or(StoreError::UnknownId)?;
        tx.execute(
            "INSERT INTO comments(version_id, author, text, created_at_ms) VALUES (?1, ?2, ?3, ?4)",
            params![version_id.get(), author.as_str(), text, now_ms],
        )?;
        let id = CommentId::new(tx.last_insert_rowid());
        tx.commit()?;

        Ok(Comment {
            id,
            version_id,
            author: author.clone(),
            text: text.to_string(),
            created_at_ms: now_ms,
        })
    }

    pub fn comments(&self, version_id: VersionId) -> Result<Vec<Comment>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, author, text, created_at_ms FROM comments WHERE version_id=?1 ORDER BY id ASC",
        )?;
        let mut rows = stmt.query(params![version_id.get()])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let author = PersonRef::try_new(row.get::<_, String>(1)?)
                .map_err(|_| StoreError::InvalidInput("invalid comment row"))?;
            out.push(Comment {
                id: CommentId::new(row.get(0)?),
                version_id,
                author,
                text: row.get(2)?,
                created_at_ms: row.get(3)?,
            });
        }
        Ok(out)
    }
}
