//! Toolbox attachment model.
//!
//! # Responsibility
//! - Define the categories of external entities a setting can attach.
//! - Normalize link payloads into a `LinksMap` with set semantics.
//!
//! # Invariants
//! - A `LinksMap` always carries every category, possibly empty.
//! - Entity ids within one category are trimmed, non-blank and unique.

use crate::model::node::{NodeId, OwnerId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::fmt::{Display, Formatter};

/// Identifier of an entity owned by an external toolbox subsystem.
pub type EntityId = String;

/// External entity categories that can be attached to a setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolboxCategory {
    Race,
    Creature,
    Npc,
    Calendar,
}

impl ToolboxCategory {
    pub const ALL: [ToolboxCategory; 4] = [Self::Race, Self::Creature, Self::Npc, Self::Calendar];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Race => "race",
            Self::Creature => "creature",
            Self::Npc => "npc",
            Self::Calendar => "calendar",
        }
    }

    /// Parses a category label. Plural forms are accepted as aliases.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "race" | "races" => Some(Self::Race),
            "creature" | "creatures" => Some(Self::Creature),
            "npc" | "npcs" => Some(Self::Npc),
            "calendar" | "calendars" => Some(Self::Calendar),
            _ => None,
        }
    }
}

impl Display for ToolboxCategory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category -> attached entity ids for one setting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Value")]
pub struct LinksMap(BTreeMap<ToolboxCategory, Vec<EntityId>>);

impl Default for LinksMap {
    fn default() -> Self {
        Self(
            ToolboxCategory::ALL
                .into_iter()
                .map(|category| (category, Vec::new()))
                .collect(),
        )
    }
}

impl LinksMap {
    /// Returns a map with every category present and empty.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a normalized map from `(category, ids)` pairs.
    ///
    /// Repeated categories are merged in input order.
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (ToolboxCategory, Vec<S>)>,
        S: Into<EntityId>,
    {
        let mut map = Self::empty();
        for (category, ids) in pairs {
            let slot = map.0.entry(category).or_default();
            slot.extend(ids.into_iter().map(Into::into));
        }
        map.normalized()
    }

    /// Normalizes a raw JSON payload.
    ///
    /// Unknown categories, non-array values and non-string ids are dropped.
    /// Anything other than a JSON object yields an empty map.
    pub fn from_json(value: &Value) -> Self {
        let Some(object) = value.as_object() else {
            return Self::empty();
        };

        let mut map = Self::empty();
        for (key, ids) in object {
            let Some(category) = ToolboxCategory::parse(key) else {
                continue;
            };
            let Some(ids) = ids.as_array() else {
                continue;
            };
            let slot = map.0.entry(category).or_default();
            slot.extend(ids.iter().filter_map(Value::as_str).map(str::to_string));
        }
        map.normalized()
    }

    /// Returns a copy with trimmed, non-blank, deduplicated ids.
    pub fn normalized(&self) -> Self {
        let mut result = Self::empty();
        for (category, ids) in &self.0 {
            result.0.insert(*category, normalize_entity_ids(ids));
        }
        result
    }

    /// Ids attached under `category`.
    pub fn get(&self, category: ToolboxCategory) -> &[EntityId] {
        self.0.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Appends one id to a category unless already present.
    pub fn push(&mut self, category: ToolboxCategory, id: impl Into<EntityId>) {
        let id = id.into();
        let id = id.trim();
        if id.is_empty() {
            return;
        }
        let slot = self.0.entry(category).or_default();
        if !slot.iter().any(|existing| existing == id) {
            slot.push(id.to_string());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (ToolboxCategory, &[EntityId])> {
        self.0.iter().map(|(category, ids)| (*category, ids.as_slice()))
    }

    /// Total attached ids across categories.
    pub fn total(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

impl From<Value> for LinksMap {
    fn from(value: Value) -> Self {
        Self::from_json(&value)
    }
}

fn normalize_entity_ids(ids: &[EntityId]) -> Vec<EntityId> {
    let mut seen = HashSet::new();
    ids.iter()
        .map(|id| id.trim())
        .filter(|id| !id.is_empty())
        .filter(|id| seen.insert(id.to_string()))
        .map(str::to_string)
        .collect()
}

/// Links visible from one node, resolved through its nearest setting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EffectiveLinks {
    /// Node the links were requested for.
    pub node_id: NodeId,
    /// Setting that owns the links.
    pub setting_id: NodeId,
    /// `true` when `node_id != setting_id`; inherited links are read-only.
    pub inherited: bool,
    pub links: LinksMap,
}

/// Full toolbox entity row as stored by the owning subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolboxEntity {
    pub id: EntityId,
    pub category: ToolboxCategory,
    pub owner_id: OwnerId,
    pub name: String,
    pub detail: Option<String>,
    /// Free entities are visible to every actor.
    pub is_free: bool,
}

/// Lightweight `{id, name, detail}` projection used by attachment pickers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolboxEntityRef {
    pub id: EntityId,
    pub name: String,
    pub detail: Option<String>,
}

impl From<ToolboxEntity> for ToolboxEntityRef {
    fn from(value: ToolboxEntity) -> Self {
        Self {
            id: value.id,
            name: value.name,
            detail: value.detail,
        }
    }
}
