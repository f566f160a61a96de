//! In-memory implementations of the store traits.

use chrono::Utc;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use tracing::debug;

use saga_model::{
    Entity, EntityId, EntityPatch, KnowledgeError, NewProject, NewRelationship, NewTemplate,
    Project, ProjectId, RecordKind, Relationship, RelationshipId, Result, Template, TemplateId,
    TemplatePatch,
};

use super::{EntityStore, ProjectStore, RelationshipStore, TemplateRegistry};

// ============================================================================
// Projects
// ============================================================================

/// Project store backed by a hash map.
#[derive(Debug, Default)]
pub struct MemoryProjectStore {
    projects: RwLock<HashMap<ProjectId, Project>>,
}

impl MemoryProjectStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProjectStore for MemoryProjectStore {
    fn create(&self, project: NewProject) -> Result<Project> {
        project.validate()?;
        let project = project.into_project(Utc::now());
        self.projects.write().insert(project.id, project.clone());
        debug!(project_id = %project.id, "Created project");
        Ok(project)
    }

    fn get(&self, id: ProjectId) -> Result<Project> {
        self.projects
            .read()
            .get(&id)
            .cloned()
            .ok_or_else(|| KnowledgeError::not_found(RecordKind::Project, id))
    }

    fn list(&self) -> Result<Vec<Project>> {
        let mut projects: Vec<_> = self.projects.read().values().cloned().collect();
        projects.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(projects)
    }

    fn delete(&self, id: ProjectId) -> Result<Project> {
        let project = self
            .projects
            .write()
            .remove(&id)
            .ok_or_else(|| KnowledgeError::not_found(RecordKind::Project, id))?;
        debug!(project_id = %id, "Deleted project");
        Ok(project)
    }
}

// ============================================================================
// Templates
// ============================================================================

#[derive(Debug, Default)]
struct TemplateTable {
    templates: HashMap<TemplateId, Template>,
    /// Index: name -> template, enforcing name uniqueness.
    by_name: HashMap<String, TemplateId>,
}

impl TemplateTable {
    fn insert(&mut self, template: Template) -> Template {
        self.by_name.insert(template.name.clone(), template.id);
        self.templates.insert(template.id, template.clone());
        template
    }
}

fn name_taken(name: &str) -> KnowledgeError {
    KnowledgeError::validation(format!("Template name '{}' is already taken", name))
}

/// Template registry backed by a hash map with a unique name index.
#[derive(Debug, Default)]
pub struct MemoryTemplateRegistry {
    table: RwLock<TemplateTable>,
}

impl MemoryTemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TemplateRegistry for MemoryTemplateRegistry {
    fn create(&self, template: NewTemplate) -> Result<Template> {
        template.validate()?;
        let mut table = self.table.write();
        if table.by_name.contains_key(&template.name) {
            return Err(name_taken(&template.name));
        }
        let template = table.insert(template.into_template());
        debug!(template_id = %template.id, name = %template.name, "Created template");
        Ok(template)
    }

    fn list(&self) -> Result<Vec<Template>> {
        let mut templates: Vec<_> = self.table.read().templates.values().cloned().collect();
        templates.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(templates)
    }

    fn get(&self, id: TemplateId) -> Result<Template> {
        self.table
            .read()
            .templates
            .get(&id)
            .cloned()
            .ok_or_else(|| KnowledgeError::not_found(RecordKind::Template, id))
    }

    fn find_by_name(&self, name: &str) -> Result<Option<Template>> {
        let table = self.table.read();
        Ok(table
            .by_name
            .get(name)
            .and_then(|id| table.templates.get(id))
            .cloned())
    }

    fn update(&self, id: TemplateId, patch: TemplatePatch) -> Result<Template> {
        patch.validate()?;
        let mut guard = self.table.write();
        let table = &mut *guard;

        let template = table
            .templates
            .get_mut(&id)
            .ok_or_else(|| KnowledgeError::not_found(RecordKind::Template, id))?;

        if let Some(name) = &patch.name {
            if table.by_name.get(name).is_some_and(|owner| *owner != id) {
                return Err(name_taken(name));
            }
        }

        let old_name = template.name.clone();
        patch.apply_to(template);
        let updated = template.clone();

        if old_name != updated.name {
            table.by_name.remove(&old_name);
            table.by_name.insert(updated.name.clone(), id);
        }
        debug!(template_id = %id, name = %updated.name, "Updated template");
        Ok(updated)
    }

    fn delete(&self, id: TemplateId) -> Result<Template> {
        let mut table = self.table.write();
        let template = table
            .templates
            .remove(&id)
            .ok_or_else(|| KnowledgeError::not_found(RecordKind::Template, id))?;
        table.by_name.remove(&template.name);
        debug!(template_id = %id, name = %template.name, "Deleted template");
        Ok(template)
    }

    fn upsert_by_name(&self, template: NewTemplate) -> Result<Template> {
        template.validate()?;
        let mut guard = self.table.write();
        let table = &mut *guard;

        match table.by_name.get(&template.name).copied() {
            Some(id) => {
                let existing = table.templates.get_mut(&id).ok_or_else(|| {
                    KnowledgeError::Unexpected(format!(
                        "name index points at missing template {}",
                        id
                    ))
                })?;
                existing.description = template.description;
                existing.fields = template.fields;
                debug!(template_id = %id, name = %existing.name, "Replaced template");
                Ok(existing.clone())
            }
            None => {
                let created = table.insert(template.into_template());
                debug!(template_id = %created.id, name = %created.name, "Created template");
                Ok(created)
            }
        }
    }
}

// ============================================================================
// Entities
// ============================================================================

#[derive(Debug, Default)]
struct EntityTable {
    entities: HashMap<EntityId, Entity>,
    /// Index: project -> entity ids in insertion order.
    by_project: HashMap<ProjectId, Vec<EntityId>>,
}

impl EntityTable {
    fn project_entities(&self, project: ProjectId) -> impl Iterator<Item = &Entity> + '_ {
        self.by_project
            .get(&project)
            .into_iter()
            .flatten()
            .filter_map(|id| self.entities.get(id))
    }
}

/// Entity store backed by a hash map with a per-project ordering index.
#[derive(Debug, Default)]
pub struct MemoryEntityStore {
    table: RwLock<EntityTable>,
}

impl MemoryEntityStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EntityStore for MemoryEntityStore {
    fn insert(&self, entity: Entity) -> Result<Entity> {
        let mut table = self.table.write();
        table
            .by_project
            .entry(entity.project_id)
            .or_default()
            .push(entity.id);
        table.entities.insert(entity.id, entity.clone());
        debug!(entity_id = %entity.id, name = %entity.name, "Created entity");
        Ok(entity)
    }

    fn get(&self, id: EntityId) -> Result<Entity> {
        self.table
            .read()
            .entities
            .get(&id)
            .cloned()
            .ok_or_else(|| KnowledgeError::not_found(RecordKind::Entity, id))
    }

    fn update_checked(
        &self,
        id: EntityId,
        patch: EntityPatch,
        check: &dyn Fn(&Entity) -> Result<()>,
    ) -> Result<Entity> {
        patch.validate()?;
        let mut table = self.table.write();
        let entity = table
            .entities
            .get_mut(&id)
            .ok_or_else(|| KnowledgeError::not_found(RecordKind::Entity, id))?;

        let mut patched = entity.clone();
        patch.apply_to(&mut patched, Utc::now());
        check(&patched)?;
        *entity = patched.clone();
        debug!(entity_id = %id, "Updated entity");
        Ok(patched)
    }

    fn delete(&self, id: EntityId) -> Result<Entity> {
        let mut table = self.table.write();
        let entity = table
            .entities
            .remove(&id)
            .ok_or_else(|| KnowledgeError::not_found(RecordKind::Entity, id))?;
        if let Some(ids) = table.by_project.get_mut(&entity.project_id) {
            ids.retain(|existing| *existing != id);
        }
        debug!(entity_id = %id, "Deleted entity");
        Ok(entity)
    }

    fn list_by_project(&self, project: ProjectId) -> Result<Vec<Entity>> {
        Ok(self.table.read().project_entities(project).cloned().collect())
    }

    fn find_by_names(&self, project: ProjectId, names: &[String]) -> Result<Vec<Entity>> {
        let wanted: HashSet<&str> = names.iter().map(String::as_str).collect();
        Ok(self
            .table
            .read()
            .project_entities(project)
            .filter(|entity| wanted.contains(entity.name.as_str()))
            .cloned()
            .collect())
    }

    fn delete_by_project(&self, project: ProjectId) -> Result<usize> {
        let mut table = self.table.write();
        let ids = table.by_project.remove(&project).unwrap_or_default();
        let mut removed = 0;
        for id in ids {
            if table.entities.remove(&id).is_some() {
                removed += 1;
            }
        }
        debug!(project_id = %project, removed, "Deleted project entities");
        Ok(removed)
    }
}

// ============================================================================
// Relationships
// ============================================================================

#[derive(Debug, Default)]
struct RelationshipTable {
    relationships: HashMap<RelationshipId, Relationship>,
    /// Index: project -> relationship ids in insertion order.
    by_project: HashMap<ProjectId, Vec<RelationshipId>>,
    /// Index: entity -> relationships where it is source or target.
    by_entity: HashMap<EntityId, Vec<RelationshipId>>,
}

impl RelationshipTable {
    fn index(&mut self, rel: &Relationship) {
        self.by_project.entry(rel.project_id).or_default().push(rel.id);
        self.by_entity.entry(rel.source).or_default().push(rel.id);
        if rel.target != rel.source {
            self.by_entity.entry(rel.target).or_default().push(rel.id);
        }
    }

    fn unindex_entities(&mut self, rel: &Relationship) {
        for endpoint in [rel.source, rel.target] {
            if let Some(ids) = self.by_entity.get_mut(&endpoint) {
                ids.retain(|id| *id != rel.id);
                if ids.is_empty() {
                    self.by_entity.remove(&endpoint);
                }
            }
        }
    }

    fn resolve(&self, ids: Option<&Vec<RelationshipId>>) -> Vec<Relationship> {
        ids.into_iter()
            .flatten()
            .filter_map(|id| self.relationships.get(id))
            .cloned()
            .collect()
    }
}

/// Relationship store backed by a hash map with project and endpoint indexes.
#[derive(Debug, Default)]
pub struct MemoryRelationshipStore {
    table: RwLock<RelationshipTable>,
}

impl MemoryRelationshipStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RelationshipStore for MemoryRelationshipStore {
    fn insert(&self, relationship: NewRelationship) -> Result<Relationship> {
        relationship.validate()?;
        let relationship = relationship.into_relationship();
        let mut table = self.table.write();
        table.index(&relationship);
        table
            .relationships
            .insert(relationship.id, relationship.clone());
        debug!(
            relationship_id = %relationship.id,
            source = %relationship.source,
            target = %relationship.target,
            "Created relationship"
        );
        Ok(relationship)
    }

    fn get(&self, id: RelationshipId) -> Result<Relationship> {
        self.table
            .read()
            .relationships
            .get(&id)
            .cloned()
            .ok_or_else(|| KnowledgeError::not_found(RecordKind::Relationship, id))
    }

    fn delete(&self, id: RelationshipId) -> Result<Relationship> {
        let mut table = self.table.write();
        let relationship = table
            .relationships
            .remove(&id)
            .ok_or_else(|| KnowledgeError::not_found(RecordKind::Relationship, id))?;
        if let Some(ids) = table.by_project.get_mut(&relationship.project_id) {
            ids.retain(|existing| *existing != id);
        }
        table.unindex_entities(&relationship);
        debug!(relationship_id = %id, "Deleted relationship");
        Ok(relationship)
    }

    fn list_by_project(&self, project: ProjectId) -> Result<Vec<Relationship>> {
        let table = self.table.read();
        Ok(table.resolve(table.by_project.get(&project)))
    }

    fn list_involving(&self, entity: EntityId) -> Result<Vec<Relationship>> {
        let table = self.table.read();
        Ok(table.resolve(table.by_entity.get(&entity)))
    }

    fn delete_by_project(&self, project: ProjectId) -> Result<usize> {
        let mut table = self.table.write();
        let ids = table.by_project.remove(&project).unwrap_or_default();
        let mut removed = 0;
        for id in ids {
            if let Some(relationship) = table.relationships.remove(&id) {
                table.unindex_entities(&relationship);
                removed += 1;
            }
        }
        debug!(project_id = %project, removed, "Deleted project relationships");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use saga_model::{FieldType, NewEntity};

    fn entity(project: ProjectId, name: &str) -> Entity {
        NewEntity::new(name, "Character").into_entity(project, Utc::now())
    }

    #[test]
    fn test_template_names_are_unique() {
        let registry = MemoryTemplateRegistry::new();
        registry.create(NewTemplate::new("Character")).unwrap();

        let dup = registry.create(NewTemplate::new("Character"));
        assert!(matches!(dup, Err(KnowledgeError::Validation(_))));
        assert_eq!(registry.list().unwrap().len(), 1);
    }

    #[test]
    fn test_template_rename_updates_name_index() {
        let registry = MemoryTemplateRegistry::new();
        let item = registry.create(NewTemplate::new("Item")).unwrap();
        registry.create(NewTemplate::new("Location")).unwrap();

        let clash = registry.update(
            item.id,
            TemplatePatch {
                name: Some("Location".to_string()),
                ..Default::default()
            },
        );
        assert!(clash.is_err());

        registry
            .update(
                item.id,
                TemplatePatch {
                    name: Some("Artifact".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(registry.find_by_name("Item").unwrap().is_none());
        assert_eq!(registry.find_by_name("Artifact").unwrap().unwrap().id, item.id);

        // Keeping the same name is not a clash.
        let same = registry.update(
            item.id,
            TemplatePatch {
                name: Some("Artifact".to_string()),
                ..Default::default()
            },
        );
        assert!(same.is_ok());
    }

    #[test]
    fn test_template_missing_ids() {
        let registry = MemoryTemplateRegistry::new();
        let missing = TemplateId::new();
        assert!(registry.get(missing).unwrap_err().is_not_found());
        assert!(registry.delete(missing).unwrap_err().is_not_found());
        assert!(registry
            .update(missing, TemplatePatch::default())
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn test_upsert_keeps_id() {
        let registry = MemoryTemplateRegistry::new();
        let first = registry.upsert_by_name(NewTemplate::new("Character")).unwrap();
        let second = registry
            .upsert_by_name(NewTemplate::new("Character").with_field("Age", FieldType::Number))
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.fields.len(), 1);
        assert_eq!(registry.list().unwrap().len(), 1);
    }

    #[test]
    fn test_entities_listed_in_insertion_order() {
        let store = MemoryEntityStore::new();
        let project = ProjectId::new();
        for name in ["Frodo", "Sam", "Merry", "Pippin"] {
            store.insert(entity(project, name)).unwrap();
        }
        store.insert(entity(ProjectId::new(), "Boromir")).unwrap();

        let names: Vec<_> = store
            .list_by_project(project)
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["Frodo", "Sam", "Merry", "Pippin"]);
    }

    #[test]
    fn test_find_by_names_is_exact_and_scoped() {
        let store = MemoryEntityStore::new();
        let project = ProjectId::new();
        store.insert(entity(project, "Aragorn")).unwrap();
        store.insert(entity(project, "Gondor")).unwrap();
        store.insert(entity(ProjectId::new(), "Rohan")).unwrap();

        let names = vec![
            "Aragorn".to_string(),
            "gondor".to_string(),
            "Rohan".to_string(),
        ];
        let found = store.find_by_names(project, &names).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Aragorn");
    }

    #[test]
    fn test_entity_delete_and_missing() {
        let store = MemoryEntityStore::new();
        let project = ProjectId::new();
        let frodo = store.insert(entity(project, "Frodo")).unwrap();

        store.delete(frodo.id).unwrap();
        assert!(store.get(frodo.id).unwrap_err().is_not_found());
        assert!(store.delete(frodo.id).unwrap_err().is_not_found());
        assert!(store
            .update(frodo.id, EntityPatch::default())
            .unwrap_err()
            .is_not_found());
        assert!(store.list_by_project(project).unwrap().is_empty());
    }

    #[test]
    fn test_rejected_update_leaves_entity_unchanged() {
        let store = MemoryEntityStore::new();
        let project = ProjectId::new();
        let frodo = store.insert(entity(project, "Frodo")).unwrap();

        let patch = EntityPatch {
            name: Some("Mr. Underhill".to_string()),
            ..Default::default()
        };
        let vetoed = store.update_checked(frodo.id, patch.clone(), &|patched: &Entity| {
            assert_eq!(patched.name, "Mr. Underhill");
            Err(KnowledgeError::validation("no aliases"))
        });
        assert!(matches!(vetoed, Err(KnowledgeError::Validation(_))));
        assert_eq!(store.get(frodo.id).unwrap(), frodo);

        let renamed = store.update_checked(frodo.id, patch, &|_| Ok(())).unwrap();
        assert_eq!(store.get(frodo.id).unwrap().name, "Mr. Underhill");
        assert!(renamed.updated_at >= frodo.updated_at);
    }

    #[test]
    fn test_projects_listed_newest_first() {
        let store = MemoryProjectStore::new();
        let mut created = Vec::new();
        for name in ["First Age", "Second Age", "Third Age"] {
            created.push(store.create(NewProject::new(name)).unwrap().id);
            std::thread::sleep(std::time::Duration::from_millis(2));
        }

        let listed: Vec<_> = store.list().unwrap().into_iter().map(|p| p.id).collect();
        created.reverse();
        assert_eq!(listed, created);
    }

    #[test]
    fn test_list_involving_is_symmetric() {
        let store = MemoryRelationshipStore::new();
        let project = ProjectId::new();
        let (a, b, c) = (EntityId::new(), EntityId::new(), EntityId::new());

        let outgoing = store.insert(NewRelationship::new(project, a, b, "Ally")).unwrap();
        let incoming = store.insert(NewRelationship::new(project, c, a, "Enemy")).unwrap();
        let unrelated = store.insert(NewRelationship::new(project, b, c, "Rival")).unwrap();

        let ids: HashSet<_> = store
            .list_involving(a)
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&outgoing.id));
        assert!(ids.contains(&incoming.id));
        assert!(!ids.contains(&unrelated.id));
    }

    #[test]
    fn test_self_loop_listed_once() {
        let store = MemoryRelationshipStore::new();
        let a = EntityId::new();
        store
            .insert(NewRelationship::new(ProjectId::new(), a, a, "Haunts"))
            .unwrap();
        assert_eq!(store.list_involving(a).unwrap().len(), 1);
    }

    #[test]
    fn test_relationship_delete_unindexes() {
        let store = MemoryRelationshipStore::new();
        let project = ProjectId::new();
        let (a, b) = (EntityId::new(), EntityId::new());
        let rel = store.insert(NewRelationship::new(project, a, b, "Ally")).unwrap();

        store.delete(rel.id).unwrap();
        assert!(store.list_involving(a).unwrap().is_empty());
        assert!(store.list_by_project(project).unwrap().is_empty());
        assert!(store.delete(rel.id).unwrap_err().is_not_found());
    }

    #[test]
    fn test_delete_by_project() {
        let entities = MemoryEntityStore::new();
        let relationships = MemoryRelationshipStore::new();
        let project = ProjectId::new();
        let other = ProjectId::new();

        let a = entities.insert(entity(project, "A")).unwrap();
        let b = entities.insert(entity(project, "B")).unwrap();
        entities.insert(entity(other, "C")).unwrap();
        relationships
            .insert(NewRelationship::new(project, a.id, b.id, "Knows"))
            .unwrap();

        assert_eq!(entities.delete_by_project(project).unwrap(), 2);
        assert_eq!(relationships.delete_by_project(project).unwrap(), 1);
        assert_eq!(entities.list_by_project(other).unwrap().len(), 1);
        assert!(relationships.list_involving(a.id).unwrap().is_empty());
    }
}
