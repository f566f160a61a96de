//! Storage abstractions for the knowledge base.
//!
//! Each store is an independent keyed record store. There is no transaction
//! spanning stores: deleting an entity leaves relationships that point at it
//! in place.

mod memory;

pub use memory::*;

use saga_model::{
    Entity, EntityId, EntityPatch, KnowledgeError, NewProject, NewRelationship, NewTemplate,
    Project, ProjectId, Relationship, RelationshipId, Result, Template, TemplateId, TemplatePatch,
};
use serde_json::Value;

/// Storage for projects.
pub trait ProjectStore: Send + Sync {
    fn create(&self, project: NewProject) -> Result<Project>;

    fn get(&self, id: ProjectId) -> Result<Project>;

    /// All projects, newest first.
    fn list(&self) -> Result<Vec<Project>>;

    fn delete(&self, id: ProjectId) -> Result<Project>;

    fn exists(&self, id: ProjectId) -> Result<bool> {
        match self.get(id) {
            Ok(_) => Ok(true),
            Err(KnowledgeError::NotFound { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

/// Storage for entity templates. Template names are unique.
pub trait TemplateRegistry: Send + Sync {
    /// Fails with `Validation` if the name is empty or already taken.
    fn create(&self, template: NewTemplate) -> Result<Template>;

    fn list(&self) -> Result<Vec<Template>>;

    fn get(&self, id: TemplateId) -> Result<Template>;

    fn find_by_name(&self, name: &str) -> Result<Option<Template>>;

    fn update(&self, id: TemplateId, patch: TemplatePatch) -> Result<Template>;

    fn delete(&self, id: TemplateId) -> Result<Template>;

    /// Insert the template, or overwrite the one with the same name in place.
    fn upsert_by_name(&self, template: NewTemplate) -> Result<Template>;
}

/// Storage for entities, scoped by project.
///
/// Listing operations return entities in insertion order within a project.
pub trait EntityStore: Send + Sync {
    fn insert(&self, entity: Entity) -> Result<Entity>;

    fn get(&self, id: EntityId) -> Result<Entity>;

    /// Apply a partial patch and refresh `updated_at`.
    fn update(&self, id: EntityId, patch: EntityPatch) -> Result<Entity> {
        self.update_checked(id, patch, &|_| Ok(()))
    }

    /// Apply a partial patch, letting `check` veto the patched entity.
    ///
    /// `check` runs under the same write as the update, so no other update
    /// can land between the check and the store.
    fn update_checked(
        &self,
        id: EntityId,
        patch: EntityPatch,
        check: &dyn Fn(&Entity) -> Result<()>,
    ) -> Result<Entity>;

    fn delete(&self, id: EntityId) -> Result<Entity>;

    fn list_by_project(&self, project: ProjectId) -> Result<Vec<Entity>>;

    /// Entities of the project whose name is exactly one of `names`.
    fn find_by_names(&self, project: ProjectId, names: &[String]) -> Result<Vec<Entity>>;

    /// Remove every entity of the project, returning how many were removed.
    fn delete_by_project(&self, project: ProjectId) -> Result<usize>;
}

/// Storage for relationships, scoped by project.
pub trait RelationshipStore: Send + Sync {
    fn insert(&self, relationship: NewRelationship) -> Result<Relationship>;

    fn get(&self, id: RelationshipId) -> Result<Relationship>;

    fn delete(&self, id: RelationshipId) -> Result<Relationship>;

    fn list_by_project(&self, project: ProjectId) -> Result<Vec<Relationship>>;

    /// Every relationship where the entity is the source or the target.
    fn list_involving(&self, entity: EntityId) -> Result<Vec<Relationship>>;

    fn delete_by_project(&self, project: ProjectId) -> Result<usize>;
}

/// Parse a JSON name list for `find_by_names`.
///
/// Anything other than an array of strings is a validation error. Names are
/// trimmed and empty names dropped.
pub fn parse_name_list(value: &Value) -> Result<Vec<String>> {
    let items = value
        .as_array()
        .ok_or_else(|| KnowledgeError::validation("Names must be an array"))?;

    items
        .iter()
        .filter_map(|item| match item.as_str() {
            Some(name) if name.trim().is_empty() => None,
            Some(name) => Some(Ok(name.trim().to_string())),
            None => Some(Err(KnowledgeError::validation(
                "Names must be an array of strings",
            ))),
        })
        .collect()
}
