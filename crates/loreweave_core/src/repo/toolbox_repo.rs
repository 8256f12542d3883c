//! Read-only access to toolbox entities owned by other subsystems.
//!
//! Rows are written by the race/creature/npc/calendar editors; this core
//! only lists them to populate attachment pickers.

use crate::model::toolbox::{ToolboxCategory, ToolboxEntity};
use crate::repo::node_repo::{RepoError, RepoResult};
use crate::repo::schema::{ensure_table_ready, parse_bool};
use rusqlite::{Connection, Row};

const ENTITY_COLUMNS: &[&str] = &[
    "entity_id",
    "category",
    "owner_id",
    "name",
    "detail",
    "is_free",
];

/// Repository interface for toolbox entity reads.
pub trait ToolboxRepository {
    /// Lists every entity of one category ordered by name.
    ///
    /// Visibility is decided by the caller through `model::access`.
    fn list_entities(&self, category: ToolboxCategory) -> RepoResult<Vec<ToolboxEntity>>;
}

/// SQLite-backed toolbox entity reader.
pub struct SqliteToolboxRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteToolboxRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_table_ready(conn, "toolbox_entities", ENTITY_COLUMNS)?;
        Ok(Self { conn })
    }
}

impl ToolboxRepository for SqliteToolboxRepository<'_> {
    fn list_entities(&self, category: ToolboxCategory) -> RepoResult<Vec<ToolboxEntity>> {
        let mut stmt = self.conn.prepare(
            "SELECT entity_id, category, owner_id, name, detail, is_free
             FROM toolbox_entities
             WHERE category = ?1
             ORDER BY name COLLATE NOCASE ASC, entity_id ASC;",
        )?;
        let mut rows = stmt.query([category.as_str()])?;
        let mut entities = Vec::new();
        while let Some(row) = rows.next()? {
            entities.push(parse_entity_row(row)?);
        }
        Ok(entities)
    }
}

fn parse_entity_row(row: &Row<'_>) -> RepoResult<ToolboxEntity> {
    let category_text: String = row.get("category")?;
    let category = ToolboxCategory::parse(&category_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid toolbox category `{category_text}` in toolbox_entities.category"
        ))
    })?;

    Ok(ToolboxEntity {
        id: row.get("entity_id")?,
        category,
        owner_id: row.get("owner_id")?,
        name: row.get("name")?,
        detail: row.get("detail")?,
        is_free: parse_bool(row.get("is_free")?, "toolbox_entities.is_free")?,
    })
}
