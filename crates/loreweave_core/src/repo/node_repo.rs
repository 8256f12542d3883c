//! Playground node repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist the flat node collection with parent links.
//! - Keep SQL details, sibling ordering and subtree deletion inside the
//!   repository boundary.
//!
//! # Invariants
//! - Listing is deterministic: `created_at ASC, rowid ASC` (creation order).
//! - New nodes are appended after their current siblings.
//! - Deleting a node removes its whole subtree in one statement; toolbox
//!   links follow through `ON DELETE CASCADE`.

use crate::db::DbError;
use crate::model::node::{Node, NodeId, NodeKind, NodeValidationError, OwnerId};
use crate::repo::schema::{bool_to_int, ensure_table_ready, parse_bool, parse_uuid};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const NODE_SELECT_SQL: &str = "SELECT
    node_uuid,
    owner_id,
    kind,
    parent_uuid,
    sort_order,
    name,
    summary,
    tags_json,
    markdown,
    preview_text,
    meta_json,
    is_published,
    created_at,
    updated_at
FROM playground_nodes";

const NODE_COLUMNS: &[&str] = &[
    "node_uuid",
    "owner_id",
    "kind",
    "parent_uuid",
    "sort_order",
    "name",
    "summary",
    "tags_json",
    "markdown",
    "preview_text",
    "meta_json",
    "is_published",
    "created_at",
    "updated_at",
];

/// Result type used by playground repositories.
pub type RepoResult<T> = Result<T, RepoError>;

/// Errors from playground repository operations.
#[derive(Debug)]
pub enum RepoError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Node rejected by field validation before write.
    Validation(NodeValidationError),
    /// Target node does not exist.
    NodeNotFound(NodeId),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Required column is missing from expected table.
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    /// JSON column could not be encoded or decoded.
    Json(serde_json::Error),
    /// Persisted data cannot be converted to a valid read model.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::NodeNotFound(id) => write!(f, "playground node not found: {id}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "playground repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "playground repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "playground repository requires column `{column}` in table `{table}`"
            ),
            Self::Json(err) => write!(f, "invalid json column: {err}"),
            Self::InvalidData(message) => write!(f, "invalid playground data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Validation(err) => Some(err),
            Self::Json(err) => Some(err),
            Self::NodeNotFound(_)
            | Self::UninitializedConnection { .. }
            | Self::MissingRequiredTable(_)
            | Self::MissingRequiredColumn { .. }
            | Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<NodeValidationError> for RepoError {
    fn from(value: NodeValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<serde_json::Error> for RepoError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

/// Insert request for one node. The repository assigns id, order and
/// timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNode {
    pub owner_id: OwnerId,
    pub kind: NodeKind,
    pub parent_id: Option<NodeId>,
    pub name: String,
}

/// Repository interface for playground node storage.
pub trait NodeRepository {
    /// Creates one node appended after its siblings.
    fn create_node(&self, request: &NewNode) -> RepoResult<Node>;
    /// Loads one node by id.
    fn get_node(&self, node_id: NodeId) -> RepoResult<Option<Node>>;
    /// Lists an owner's nodes in creation order.
    fn list_nodes(&self, owner_id: &str, published_only: bool) -> RepoResult<Vec<Node>>;
    /// Writes the mutable fields of an existing node.
    fn update_node(&self, node: &Node) -> RepoResult<()>;
    /// Moves one node under another parent at an optional sibling index.
    fn move_node(
        &self,
        node_id: NodeId,
        new_parent_id: Option<NodeId>,
        target_index: Option<i64>,
    ) -> RepoResult<()>;
    /// Deletes one node and all of its descendants. Returns removed row count.
    fn delete_subtree(&self, node_id: NodeId) -> RepoResult<usize>;
}

/// SQLite-backed node repository.
pub struct SqliteNodeRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteNodeRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_table_ready(conn, "playground_nodes", NODE_COLUMNS)?;
        Ok(Self { conn })
    }
}

impl NodeRepository for SqliteNodeRepository<'_> {
    fn create_node(&self, request: &NewNode) -> RepoResult<Node> {
        let node_id = Uuid::new_v4();
        let sort_order = next_sort_order(self.conn, &request.owner_id, request.parent_id)?;
        self.conn.execute(
            "INSERT INTO playground_nodes (
                node_uuid,
                owner_id,
                kind,
                parent_uuid,
                sort_order,
                name
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                node_id.to_string(),
                request.owner_id.as_str(),
                request.kind.as_str(),
                request.parent_id.map(|value| value.to_string()),
                sort_order,
                request.name.as_str(),
            ],
        )?;
        load_required_node(self.conn, node_id)
    }

    fn get_node(&self, node_id: NodeId) -> RepoResult<Option<Node>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{NODE_SELECT_SQL} WHERE node_uuid = ?1;"))?;
        let mut rows = stmt.query([node_id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_node_row(row)?));
        }
        Ok(None)
    }

    fn list_nodes(&self, owner_id: &str, published_only: bool) -> RepoResult<Vec<Node>> {
        let mut stmt = self.conn.prepare(&format!(
            "{NODE_SELECT_SQL}
             WHERE owner_id = ?1
               AND (?2 = 0 OR is_published = 1)
             ORDER BY created_at ASC, rowid ASC;"
        ))?;
        let mut rows = stmt.query(params![owner_id, bool_to_int(published_only)])?;
        let mut nodes = Vec::new();
        while let Some(row) = rows.next()? {
            nodes.push(parse_node_row(row)?);
        }
        Ok(nodes)
    }

    fn update_node(&self, node: &Node) -> RepoResult<()> {
        node.validate()?;

        let changed = self.conn.execute(
            "UPDATE playground_nodes
             SET name = ?2,
                 summary = ?3,
                 tags_json = ?4,
                 sort_order = ?5,
                 markdown = ?6,
                 preview_text = ?7,
                 meta_json = ?8,
                 is_published = ?9,
                 updated_at = (CAST(strftime('%s', 'now') AS INTEGER) * 1000)
             WHERE node_uuid = ?1;",
            params![
                node.id.to_string(),
                node.name.as_str(),
                node.summary.as_deref(),
                serde_json::to_string(&node.tags)?,
                node.sort_order,
                node.markdown.as_deref(),
                node.preview_text.as_deref(),
                serde_json::to_string(&node.meta)?,
                bool_to_int(node.is_published),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NodeNotFound(node.id));
        }
        Ok(())
    }

    fn move_node(
        &self,
        node_id: NodeId,
        new_parent_id: Option<NodeId>,
        target_index: Option<i64>,
    ) -> RepoResult<()> {
        let owner_id: Option<String> = self
            .conn
            .query_row(
                "SELECT owner_id FROM playground_nodes WHERE node_uuid = ?1;",
                [node_id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        let owner_id = owner_id.ok_or(RepoError::NodeNotFound(node_id))?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let mut sibling_ids = list_child_ids(&tx, &owner_id, new_parent_id)?;
        sibling_ids.retain(|id| *id != node_id);

        let target_index = target_index
            .unwrap_or(sibling_ids.len() as i64)
            .clamp(0, sibling_ids.len() as i64) as usize;
        sibling_ids.insert(target_index, node_id);

        tx.execute(
            "UPDATE playground_nodes
             SET parent_uuid = ?2,
                 updated_at = (CAST(strftime('%s', 'now') AS INTEGER) * 1000)
             WHERE node_uuid = ?1;",
            params![node_id.to_string(), new_parent_id.map(|value| value.to_string())],
        )?;

        for (index, id) in sibling_ids.into_iter().enumerate() {
            tx.execute(
                "UPDATE playground_nodes
                 SET sort_order = ?2
                 WHERE node_uuid = ?1;",
                params![id.to_string(), index as i64],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    fn delete_subtree(&self, node_id: NodeId) -> RepoResult<usize> {
        let removed = self.conn.execute(
            "WITH RECURSIVE subtree(node_uuid) AS (
                SELECT node_uuid
                FROM playground_nodes
                WHERE node_uuid = ?1
                UNION
                SELECT child.node_uuid
                FROM playground_nodes child
                INNER JOIN subtree parent ON child.parent_uuid = parent.node_uuid
            )
            DELETE FROM playground_nodes
            WHERE node_uuid IN (SELECT node_uuid FROM subtree);",
            [node_id.to_string()],
        )?;
        if removed == 0 {
            return Err(RepoError::NodeNotFound(node_id));
        }
        Ok(removed)
    }
}

fn load_required_node(conn: &Connection, node_id: NodeId) -> RepoResult<Node> {
    let mut stmt = conn.prepare(&format!("{NODE_SELECT_SQL} WHERE node_uuid = ?1;"))?;
    let mut rows = stmt.query([node_id.to_string()])?;
    if let Some(row) = rows.next()? {
        return parse_node_row(row);
    }
    Err(RepoError::NodeNotFound(node_id))
}

/// Root-level siblings are scoped per owner; nested siblings by parent.
fn list_child_ids(
    conn: &Connection,
    owner_id: &str,
    parent_id: Option<NodeId>,
) -> RepoResult<Vec<NodeId>> {
    let mut ids = Vec::new();
    let mut stmt = conn.prepare(
        "SELECT node_uuid
         FROM playground_nodes
         WHERE owner_id = ?1
           AND ((?2 IS NULL AND parent_uuid IS NULL) OR parent_uuid = ?2)
         ORDER BY sort_order ASC, created_at ASC, rowid ASC;",
    )?;
    let mut rows = stmt.query(params![owner_id, parent_id.map(|value| value.to_string())])?;
    while let Some(row) = rows.next()? {
        let value: String = row.get(0)?;
        ids.push(parse_uuid(&value, "playground_nodes.node_uuid")?);
    }
    Ok(ids)
}

fn next_sort_order(conn: &Connection, owner_id: &str, parent_id: Option<NodeId>) -> RepoResult<i64> {
    let next = conn.query_row(
        "SELECT COALESCE(MAX(sort_order), -1) + 1
         FROM playground_nodes
         WHERE owner_id = ?1
           AND ((?2 IS NULL AND parent_uuid IS NULL) OR parent_uuid = ?2);",
        params![owner_id, parent_id.map(|value| value.to_string())],
        |row| row.get(0),
    )?;
    Ok(next)
}

fn parse_node_row(row: &Row<'_>) -> RepoResult<Node> {
    let node_uuid_text: String = row.get("node_uuid")?;
    let id = parse_uuid(&node_uuid_text, "playground_nodes.node_uuid")?;

    let parent_id = row
        .get::<_, Option<String>>("parent_uuid")?
        .map(|value| parse_uuid(&value, "playground_nodes.parent_uuid"))
        .transpose()?;

    let kind_text: String = row.get("kind")?;
    let kind = NodeKind::parse(&kind_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid node kind `{kind_text}` in playground_nodes.kind"
        ))
    })?;

    let tags_text: String = row.get("tags_json")?;
    let tags: Vec<String> = serde_json::from_str(&tags_text)?;
    let meta_text: String = row.get("meta_json")?;
    let meta: Map<String, Value> = serde_json::from_str(&meta_text)?;

    Ok(Node {
        id,
        owner_id: row.get("owner_id")?,
        kind,
        parent_id,
        sort_order: row.get("sort_order")?,
        name: row.get("name")?,
        summary: row.get("summary")?,
        tags,
        markdown: row.get("markdown")?,
        preview_text: row.get("preview_text")?,
        meta,
        is_published: parse_bool(row.get("is_published")?, "playground_nodes.is_published")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
