#![forbid(unsafe_code)]

use super::{CreateCategoryRequest, SqliteStore, StoreError};
use motion_core::category::{Category, normalize_category};
use motion_core::ids::CategoryId;
use rusqlite::{OptionalExtension, Row, params};

impl SqliteStore {
    pub fn create_category(
        &mut self,
        request: CreateCategoryRequest,
    ) -> Result<Category, StoreError> {
        let (name, prefix) = normalize_category(&request.name, &request.prefix)
            .map_err(|_| StoreError::InvalidInput("invalid category"))?;
        self.conn.execute(
            "INSERT INTO categories(name, prefix) VALUES (?1, ?2)",
            params![name, prefix],
        )?;
        Ok(Category {
            id: CategoryId::new(self.conn.last_insert_rowid()),
            name,
            prefix,
        })
    }

    pub fn category(&self, category_id: CategoryId) -> Result<Option<Category>, StoreError> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, name, prefix FROM categories WHERE id=?1",
                params![category_id.get()],
                category_from_row,
            )
            .optional()?)
    }

    pub fn list_categories(&self) -> Result<Vec<Category>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, prefix FROM categories ORDER BY name ASC, id ASC")?;
        let rows = stmt.query_map([], category_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

fn category_from_row(row: &Row<'_>) -> rusqlite::Result<Category> {
    Ok(Category {
        id: CategoryId::new(row.get(0)?),
        name: row.get(1)?,
        prefix: row.get(2)?,
    })
}
