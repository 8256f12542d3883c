//! Use-case API over the playground core.
//!
//! # Responsibility
//! - Accept transport-shaped input (string ids, raw JSON payloads).
//! - Return one serializable envelope shape for every operation.
//!
//! # Invariants
//! - Functions never panic; every failure becomes an `ApiError`.
//! - `INTERNAL` failures carry a generic message; details go to the log.
//! - Malformed ids and payloads map to `VALIDATION` before the core runs.

use loreweave_core::db::{open_db, open_db_in_memory, DbError};
use loreweave_core::{
    Actor, CreateNodeRequest, EffectiveLinks, ErrorCode, LinksMap, Node, NodeId, NodePatch,
    PlaygroundService, PlaygroundServiceError, PlaygroundTree, RepoError, SqliteLinkRepository,
    SqliteNodeRepository, SqliteToolboxRepository, ToolboxCategory, ToolboxEntityRef,
    ToolboxService, TreeNode,
};
use log::error;
use rusqlite::Connection;
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use uuid::Uuid;

const INTERNAL_MESSAGE: &str = "internal error";

/// Caller-facing error payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::Validation,
            message: message.into(),
        }
    }

    /// Logs `details` and returns a generic internal error.
    fn internal(event: &str, details: impl std::fmt::Display) -> Self {
        error!("event={event} module=api status=error error_code=INTERNAL error={details}");
        Self {
            code: ErrorCode::Internal,
            message: INTERNAL_MESSAGE.to_string(),
        }
    }
}

impl From<PlaygroundServiceError> for ApiError {
    fn from(value: PlaygroundServiceError) -> Self {
        match value.code() {
            // Already logged by the service.
            ErrorCode::Internal => Self {
                code: ErrorCode::Internal,
                message: INTERNAL_MESSAGE.to_string(),
            },
            code => Self {
                code,
                message: value.to_string(),
            },
        }
    }
}

/// Response envelope shared by every operation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(error: ApiError) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(error),
        }
    }

    /// Error code of a failed response.
    pub fn error_code(&self) -> Option<ErrorCode> {
        self.error.as_ref().map(|error| error.code)
    }
}

impl<T> From<Result<T, ApiError>> for ApiResponse<T> {
    fn from(value: Result<T, ApiError>) -> Self {
        match value {
            Ok(data) => Self::success(data),
            Err(error) => Self::failure(error),
        }
    }
}

/// Result of `delete_node`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeleteOutcome {
    pub node_id: NodeId,
    pub removed: usize,
}

/// Open database handle shared by API calls.
pub struct ApiContext {
    conn: Connection,
}

impl ApiContext {
    /// Opens (and migrates) the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ApiError> {
        open_db(path)
            .map(|conn| Self { conn })
            .map_err(|err: DbError| ApiError::internal("api_open", err))
    }

    /// Opens a private in-memory database.
    pub fn in_memory() -> Result<Self, ApiError> {
        open_db_in_memory()
            .map(|conn| Self { conn })
            .map_err(|err| ApiError::internal("api_open", err))
    }

    /// Opens the process-wide database configured through the environment.
    pub fn from_env() -> Result<Self, ApiError> {
        Self::open(crate::config::resolve_db_path())
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn playground(
        &self,
    ) -> Result<PlaygroundService<SqliteNodeRepository<'_>, SqliteLinkRepository<'_>>, ApiError>
    {
        let nodes = SqliteNodeRepository::try_new(&self.conn)
            .map_err(|err| ApiError::internal("api_repo_init", err))?;
        let links = SqliteLinkRepository::try_new(&self.conn)
            .map_err(|err| ApiError::internal("api_repo_init", err))?;
        Ok(PlaygroundService::new(nodes, links))
    }

    fn toolbox(&self) -> Result<ToolboxService<SqliteToolboxRepository<'_>>, ApiError> {
        SqliteToolboxRepository::try_new(&self.conn)
            .map(ToolboxService::new)
            .map_err(|err| ApiError::internal("api_repo_init", err))
    }
}

/// Lists the full tree of `owner_id` as seen by `actor`.
pub fn list_tree(ctx: &ApiContext, actor: &Actor, owner_id: &str) -> ApiResponse<PlaygroundTree> {
    run(|| {
        let owner_id = parse_owner_id(owner_id)?;
        Ok(ctx.playground()?.list_tree(actor, owner_id)?)
    })
}

/// Lists the tree of `owner_id` pruned to nodes matching `query`.
pub fn search_tree(
    ctx: &ApiContext,
    actor: &Actor,
    owner_id: &str,
    query: &str,
) -> ApiResponse<Vec<TreeNode>> {
    run(|| {
        let owner_id = parse_owner_id(owner_id)?;
        Ok(ctx.playground()?.search_tree(actor, owner_id, query)?)
    })
}

pub fn get_node(ctx: &ApiContext, actor: &Actor, node_id: &str) -> ApiResponse<Node> {
    run(|| {
        let node_id = parse_node_id(node_id, "node_id")?;
        Ok(ctx.playground()?.get_node(actor, node_id)?)
    })
}

/// Creates a node from a `{ parent_id?, type, name }` payload.
pub fn create_node(ctx: &ApiContext, actor: &Actor, payload: &Value) -> ApiResponse<Node> {
    run(|| {
        let request: CreateNodeRequest = serde_json::from_value(payload.clone())
            .map_err(|err| ApiError::validation(format!("invalid create payload: {err}")))?;
        Ok(ctx.playground()?.create_node(actor, &request)?)
    })
}

/// Applies a partial update payload. Unknown fields are rejected.
pub fn update_node(
    ctx: &ApiContext,
    actor: &Actor,
    node_id: &str,
    payload: &Value,
) -> ApiResponse<Node> {
    run(|| {
        let node_id = parse_node_id(node_id, "node_id")?;
        let patch: NodePatch = serde_json::from_value(payload.clone())
            .map_err(|err| ApiError::validation(format!("invalid update payload: {err}")))?;
        Ok(ctx.playground()?.update_node(actor, node_id, patch)?)
    })
}

/// Deletes a node with its whole subtree.
pub fn delete_node(ctx: &ApiContext, actor: &Actor, node_id: &str) -> ApiResponse<DeleteOutcome> {
    run(|| {
        let node_id = parse_node_id(node_id, "node_id")?;
        let removed = ctx.playground()?.delete_node(actor, node_id)?;
        Ok(DeleteOutcome { node_id, removed })
    })
}

/// Moves a node and returns it as stored afterwards.
pub fn move_node(
    ctx: &ApiContext,
    actor: &Actor,
    node_id: &str,
    new_parent_id: Option<&str>,
    target_index: Option<i64>,
) -> ApiResponse<Node> {
    run(|| {
        let node_id = parse_node_id(node_id, "node_id")?;
        let new_parent_id = new_parent_id
            .map(|raw| parse_node_id(raw, "new_parent_id"))
            .transpose()?;
        let service = ctx.playground()?;
        service.move_node(actor, node_id, new_parent_id, target_index)?;
        Ok(service.get_node(actor, node_id)?)
    })
}

/// Returns the links visible from a node; `data` is `null` without a
/// setting ancestor or when the actor may not read that setting.
pub fn get_toolbox_links(
    ctx: &ApiContext,
    actor: &Actor,
    node_id: &str,
) -> ApiResponse<Option<EffectiveLinks>> {
    run(|| {
        let node_id = parse_node_id(node_id, "node_id")?;
        Ok(ctx.playground()?.get_toolbox_links(actor, node_id)?)
    })
}

/// Replaces a setting's links from a raw `{ category: [id, ...] }` object.
pub fn set_toolbox_links(
    ctx: &ApiContext,
    actor: &Actor,
    setting_id: &str,
    payload: &Value,
) -> ApiResponse<LinksMap> {
    run(|| {
        let setting_id = parse_node_id(setting_id, "setting_id")?;
        if !payload.is_object() {
            return Err(ApiError::validation("links payload must be a JSON object"));
        }
        let links = LinksMap::from_json(payload);
        Ok(ctx.playground()?.set_toolbox_links(actor, setting_id, &links)?)
    })
}

/// Lists picker entries for a category name (`race`, `creatures`, ...).
pub fn list_toolbox(
    ctx: &ApiContext,
    actor: &Actor,
    category: &str,
) -> ApiResponse<Vec<ToolboxEntityRef>> {
    run(|| {
        let category = ToolboxCategory::parse(category).ok_or_else(|| {
            ApiError::validation(format!("unknown toolbox category `{}`", category.trim()))
        })?;
        list_category(ctx, actor, category)
    })
}

pub fn list_races(ctx: &ApiContext, actor: &Actor) -> ApiResponse<Vec<ToolboxEntityRef>> {
    run(|| list_category(ctx, actor, ToolboxCategory::Race))
}

pub fn list_creatures(ctx: &ApiContext, actor: &Actor) -> ApiResponse<Vec<ToolboxEntityRef>> {
    run(|| list_category(ctx, actor, ToolboxCategory::Creature))
}

pub fn list_npcs(ctx: &ApiContext, actor: &Actor) -> ApiResponse<Vec<ToolboxEntityRef>> {
    run(|| list_category(ctx, actor, ToolboxCategory::Npc))
}

pub fn list_calendars(ctx: &ApiContext, actor: &Actor) -> ApiResponse<Vec<ToolboxEntityRef>> {
    run(|| list_category(ctx, actor, ToolboxCategory::Calendar))
}

fn list_category(
    ctx: &ApiContext,
    actor: &Actor,
    category: ToolboxCategory,
) -> Result<Vec<ToolboxEntityRef>, ApiError> {
    ctx.toolbox()?
        .list(actor, category)
        // ToolboxService logs its own failures.
        .map_err(|_: RepoError| ApiError {
            code: ErrorCode::Internal,
            message: INTERNAL_MESSAGE.to_string(),
        })
}

fn run<T>(f: impl FnOnce() -> Result<T, ApiError>) -> ApiResponse<T> {
    f().into()
}

fn parse_node_id(raw: &str, field: &str) -> Result<NodeId, ApiError> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| ApiError::validation(format!("{field} is not a valid UUID: `{raw}`")))
}

fn parse_owner_id(raw: &str) -> Result<&str, ApiError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation("owner_id cannot be empty"));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::{parse_node_id, ApiError, ApiResponse};
    use loreweave_core::ErrorCode;

    #[test]
    fn parse_node_id_rejects_garbage_as_validation() {
        let err = parse_node_id("not-a-uuid", "node_id").unwrap_err();
        assert_eq!(err.code, ErrorCode::Validation);
        assert!(err.message.contains("node_id"));
    }

    #[test]
    fn envelope_serializes_error_code_in_screaming_case() {
        let response: ApiResponse<()> = ApiResponse::failure(ApiError::validation("bad"));
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["ok"], false);
        assert_eq!(json["data"], serde_json::Value::Null);
        assert_eq!(json["error"]["code"], "VALIDATION");
        assert_eq!(json["error"]["message"], "bad");
    }
}
