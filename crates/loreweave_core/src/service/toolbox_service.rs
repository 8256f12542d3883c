//! Toolbox picker use-case service.
//!
//! Lists `{id, name, detail}` projections of external toolbox entities for
//! attachment pickers. Visibility goes through `can_view`: owners see their
//! own entities plus free ones; admins see everything.

use crate::model::access::{can_view, Actor};
use crate::model::toolbox::{ToolboxCategory, ToolboxEntityRef};
use crate::repo::node_repo::RepoError;
use crate::repo::toolbox_repo::ToolboxRepository;
use crate::service::error_code::ErrorCode;
use log::error;

/// Toolbox picker service facade.
pub struct ToolboxService<R: ToolboxRepository> {
    repo: R,
}

impl<R: ToolboxRepository> ToolboxService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Lists entities of one category visible to `actor`, ordered by name.
    pub fn list(
        &self,
        actor: &Actor,
        category: ToolboxCategory,
    ) -> Result<Vec<ToolboxEntityRef>, RepoError> {
        match self.repo.list_entities(category) {
            Ok(entities) => Ok(entities
                .into_iter()
                .filter(|entity| can_view(actor, entity))
                .map(ToolboxEntityRef::from)
                .collect()),
            Err(err) => {
                error!(
                    "event=toolbox_list module=toolbox status=error error_code={} category={} error={}",
                    ErrorCode::Internal,
                    category,
                    err
                );
                Err(err)
            }
        }
    }

    pub fn list_races(&self, actor: &Actor) -> Result<Vec<ToolboxEntityRef>, RepoError> {
        self.list(actor, ToolboxCategory::Race)
    }

    pub fn list_creatures(&self, actor: &Actor) -> Result<Vec<ToolboxEntityRef>, RepoError> {
        self.list(actor, ToolboxCategory::Creature)
    }

    pub fn list_npcs(&self, actor: &Actor) -> Result<Vec<ToolboxEntityRef>, RepoError> {
        self.list(actor, ToolboxCategory::Npc)
    }

    pub fn list_calendars(&self, actor: &Actor) -> Result<Vec<ToolboxEntityRef>, RepoError> {
        self.list(actor, ToolboxCategory::Calendar)
    }
}
