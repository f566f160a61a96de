//! Directed, labelled relationships between two entities.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::EntityId;
use crate::error::{require_non_empty, Result};
use crate::project::ProjectId;

/// Unique identifier for relationships.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelationshipId(pub Uuid);

impl RelationshipId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RelationshipId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RelationshipId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A directed edge `source -> target` with a free-text label.
///
/// Endpoints are not checked against the entity store, so either one may
/// refer to an entity that no longer exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    pub id: RelationshipId,
    pub project_id: ProjectId,
    pub source: EntityId,
    pub target: EntityId,
    #[serde(rename = "type")]
    pub relationship_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Relationship {
    /// Check if the entity is either endpoint.
    pub fn involves(&self, entity: EntityId) -> bool {
        self.source == entity || self.target == entity
    }

    /// The endpoint on the other side of `entity`, if `entity` is an endpoint.
    pub fn other_end(&self, entity: EntityId) -> Option<EntityId> {
        if self.source == entity {
            Some(self.target)
        } else if self.target == entity {
            Some(self.source)
        } else {
            None
        }
    }
}

/// Payload for creating a relationship.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRelationship {
    pub project_id: ProjectId,
    pub source: EntityId,
    pub target: EntityId,
    #[serde(rename = "type", default)]
    pub relationship_type: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl NewRelationship {
    pub fn new(
        project_id: ProjectId,
        source: EntityId,
        target: EntityId,
        relationship_type: impl Into<String>,
    ) -> Self {
        Self {
            project_id,
            source,
            target,
            relationship_type: relationship_type.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        require_non_empty("type", &self.relationship_type)
    }

    pub fn into_relationship(self) -> Relationship {
        Relationship {
            id: RelationshipId::new(),
            project_id: self.project_id,
            source: self.source,
            target: self.target,
            relationship_type: self.relationship_type,
            description: self.description,
        }
    }
}
