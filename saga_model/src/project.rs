//! Projects - the top-level container every entity and relationship belongs to.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{require_non_empty, Result};

/// Unique identifier for projects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProjectId(pub Uuid);

impl ProjectId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ProjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ProjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A writing project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Payload for creating a project.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewProject {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl NewProject {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        require_non_empty("name", &self.name)
    }

    /// Turn the payload into a stored project stamped with `now`.
    pub fn into_project(self, now: DateTime<Utc>) -> Project {
        Project {
            id: ProjectId::new(),
            name: self.name,
            description: self.description,
            created_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_project_requires_name() {
        assert!(NewProject::new("").validate().is_err());
        assert!(NewProject::new("Middle-earth").validate().is_ok());
    }

    #[test]
    fn test_project_serializes_camel_case() {
        let project = NewProject::new("Saga")
            .with_description("A long tale")
            .into_project(Utc::now());
        let json = serde_json::to_value(&project).unwrap();
        assert!(json.get("createdAt").is_some());
        assert_eq!(json["description"], "A long tale");
    }
}
