//! Toolbox link repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist per-setting toolbox attachments, one row per attached entity.
//! - Replace a setting's full link set atomically.
//!
//! # Invariants
//! - `(setting_uuid, category, entity_id)` is unique, so categories keep set
//!   semantics in storage.
//! - Reads always return every category, defaulting to empty lists.
//! - Rows only reference existing nodes; the node kind check lives in the
//!   service layer.

use crate::model::node::NodeId;
use crate::model::toolbox::{LinksMap, ToolboxCategory};
use crate::repo::node_repo::{RepoError, RepoResult};
use crate::repo::schema::{ensure_table_ready, parse_uuid};
use rusqlite::{params, Connection, Transaction, TransactionBehavior};
use std::collections::HashMap;

const LINK_COLUMNS: &[&str] = &["setting_uuid", "category", "entity_id", "position"];

/// Repository interface for toolbox links.
pub trait LinkRepository {
    /// Loads the stored links of one setting.
    fn get_links(&self, setting_id: NodeId) -> RepoResult<LinksMap>;
    /// Replaces every category of one setting with `links`.
    fn replace_links(&self, setting_id: NodeId, links: &LinksMap) -> RepoResult<()>;
    /// Loads stored links for every setting owned by `owner_id`.
    ///
    /// Settings without saved links are absent from the result.
    fn list_links_for_owner(&self, owner_id: &str) -> RepoResult<HashMap<NodeId, LinksMap>>;
}

/// SQLite-backed toolbox link repository.
pub struct SqliteLinkRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteLinkRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_table_ready(conn, "toolbox_links", LINK_COLUMNS)?;
        Ok(Self { conn })
    }
}

impl LinkRepository for SqliteLinkRepository<'_> {
    fn get_links(&self, setting_id: NodeId) -> RepoResult<LinksMap> {
        let mut stmt = self.conn.prepare(
            "SELECT category, entity_id
             FROM toolbox_links
             WHERE setting_uuid = ?1
             ORDER BY category ASC, position ASC;",
        )?;
        let mut rows = stmt.query([setting_id.to_string()])?;
        let mut links = LinksMap::empty();
        while let Some(row) = rows.next()? {
            let category = parse_category(&row.get::<_, String>(0)?)?;
            links.push(category, row.get::<_, String>(1)?);
        }
        Ok(links)
    }

    fn replace_links(&self, setting_id: NodeId, links: &LinksMap) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        tx.execute(
            "DELETE FROM toolbox_links WHERE setting_uuid = ?1;",
            [setting_id.to_string()],
        )?;

        {
            let mut insert = tx.prepare(
                "INSERT INTO toolbox_links (setting_uuid, category, entity_id, position)
                 VALUES (?1, ?2, ?3, ?4);",
            )?;
            for (category, ids) in links.iter() {
                for (position, entity_id) in ids.iter().enumerate() {
                    insert.execute(params![
                        setting_id.to_string(),
                        category.as_str(),
                        entity_id.as_str(),
                        position as i64,
                    ])?;
                }
            }
        }

        tx.commit()?;
        Ok(())
    }

    fn list_links_for_owner(&self, owner_id: &str) -> RepoResult<HashMap<NodeId, LinksMap>> {
        let mut stmt = self.conn.prepare(
            "SELECT l.setting_uuid, l.category, l.entity_id
             FROM toolbox_links l
             INNER JOIN playground_nodes n ON n.node_uuid = l.setting_uuid
             WHERE n.owner_id = ?1
             ORDER BY l.setting_uuid ASC, l.category ASC, l.position ASC;",
        )?;
        let mut rows = stmt.query([owner_id])?;
        let mut result: HashMap<NodeId, LinksMap> = HashMap::new();
        while let Some(row) = rows.next()? {
            let setting_id = parse_uuid(&row.get::<_, String>(0)?, "toolbox_links.setting_uuid")?;
            let category = parse_category(&row.get::<_, String>(1)?)?;
            result
                .entry(setting_id)
                .or_default()
                .push(category, row.get::<_, String>(2)?);
        }
        Ok(result)
    }
}

fn parse_category(value: &str) -> RepoResult<ToolboxCategory> {
    ToolboxCategory::parse(value).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid toolbox category `{value}` in toolbox_links.category"))
    })
}
