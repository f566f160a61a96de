//! Entity records and their create/update payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::{EntityId, CUSTOM_ENTITY_TYPE};
use crate::error::{require_non_empty, Result};
use crate::project::ProjectId;

/// Free-form attribute data keyed by field name.
pub type EntityData = HashMap<String, serde_json::Value>;

/// A named, typed record belonging to a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub id: EntityId,
    pub project_id: ProjectId,
    pub name: String,

    /// Name of a template, or `"Custom"`.
    #[serde(rename = "type")]
    pub entity_type: String,

    #[serde(default)]
    pub data: EntityData,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity {
    /// Check whether the entity opts out of template data.
    pub fn is_custom(&self) -> bool {
        self.entity_type == CUSTOM_ENTITY_TYPE
    }
}

/// Payload for creating an entity. The project comes from the request scope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewEntity {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub entity_type: String,
    #[serde(default)]
    pub data: EntityData,
}

impl NewEntity {
    pub fn new(name: impl Into<String>, entity_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entity_type: entity_type.into(),
            data: EntityData::new(),
        }
    }

    /// Set a single data field.
    pub fn with_data(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    pub fn validate(&self) -> Result<()> {
        require_non_empty("name", &self.name)?;
        require_non_empty("type", &self.entity_type)
    }

    pub fn into_entity(self, project_id: ProjectId, now: DateTime<Utc>) -> Entity {
        Entity {
            id: EntityId::new(),
            project_id,
            name: self.name,
            entity_type: self.entity_type,
            data: self.data,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update for an entity. Absent fields are left unchanged;
/// a supplied `data` map replaces the old one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type", default)]
    pub entity_type: Option<String>,
    #[serde(default)]
    pub data: Option<EntityData>,
}

impl EntityPatch {
    pub fn validate(&self) -> Result<()> {
        if let Some(name) = &self.name {
            require_non_empty("name", name)?;
        }
        if let Some(entity_type) = &self.entity_type {
            require_non_empty("type", entity_type)?;
        }
        Ok(())
    }

    /// Apply the patch and refresh `updated_at`.
    pub fn apply_to(self, entity: &mut Entity, now: DateTime<Utc>) {
        if let Some(name) = self.name {
            entity.name = name;
        }
        if let Some(entity_type) = self.entity_type {
            entity.entity_type = entity_type;
        }
        if let Some(data) = self.data {
            entity.data = data;
        }
        entity.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    #[test]
    fn test_new_entity() {
        let entity = NewEntity::new("Aragorn", "Character")
            .with_data("Age", json!(87))
            .into_entity(ProjectId::new(), Utc::now());

        assert_eq!(entity.name, "Aragorn");
        assert_eq!(entity.created_at, entity.updated_at);
        assert_eq!(entity.data["Age"], json!(87));
        assert!(!entity.is_custom());
    }

    #[test]
    fn test_new_entity_requires_name_and_type() {
        assert!(NewEntity::new("", "Character").validate().is_err());
        assert!(NewEntity::new("Aragorn", "").validate().is_err());
        assert!(NewEntity::new("Aragorn", CUSTOM_ENTITY_TYPE).validate().is_ok());
    }

    #[test]
    fn test_patch_is_partial() {
        let created = Utc::now();
        let mut entity = NewEntity::new("Strider", "Character")
            .with_data("Age", json!(87))
            .into_entity(ProjectId::new(), created);

        let later = created + Duration::seconds(5);
        EntityPatch {
            name: Some("Aragorn".to_string()),
            ..Default::default()
        }
        .apply_to(&mut entity, later);

        assert_eq!(entity.name, "Aragorn");
        assert_eq!(entity.entity_type, "Character");
        assert_eq!(entity.data["Age"], json!(87));
        assert_eq!(entity.updated_at, later);
        assert_eq!(entity.created_at, created);
    }

    #[test]
    fn test_entity_wire_shape() {
        let entity = NewEntity::new("Gondor", "Location").into_entity(ProjectId::new(), Utc::now());
        let json = serde_json::to_value(&entity).unwrap();

        assert_eq!(json["type"], "Location");
        assert!(json["projectId"].is_string());
        assert!(json.get("updatedAt").is_some());
    }
}
