//! The knowledge base service - every operation the outer surfaces call.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use saga_model::{
    builtin_templates, Entity, EntityData, EntityId, EntityPatch, KnowledgeError, NewEntity,
    NewProject, NewRelationship, NewTemplate, Project, ProjectId, RecordKind, Relationship,
    RelationshipId, Result, Template, TemplateId, TemplatePatch, CUSTOM_ENTITY_TYPE,
};

use crate::backlink::{BacklinkResolver, LinkedText};
use crate::config::{KnowledgeConfig, SchemaPolicy};
use crate::knowledge_graph::{materialize, Graph};
use crate::store::{
    EntityStore, MemoryEntityStore, MemoryProjectStore, MemoryRelationshipStore,
    MemoryTemplateRegistry, ProjectStore, RelationshipStore, TemplateRegistry,
};

/// The set of stores a knowledge base reads and writes.
#[derive(Clone)]
pub struct Stores {
    pub projects: Arc<dyn ProjectStore>,
    pub templates: Arc<dyn TemplateRegistry>,
    pub entities: Arc<dyn EntityStore>,
    pub relationships: Arc<dyn RelationshipStore>,
}

impl Stores {
    /// Fresh, empty in-memory stores.
    pub fn in_memory() -> Self {
        Self {
            projects: Arc::new(MemoryProjectStore::new()),
            templates: Arc::new(MemoryTemplateRegistry::new()),
            entities: Arc::new(MemoryEntityStore::new()),
            relationships: Arc::new(MemoryRelationshipStore::new()),
        }
    }
}

/// One endpoint of a relationship, joined with the entity it names.
///
/// `name` and `type` are `None` when the entity no longer exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointView {
    pub id: EntityId,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub entity_type: Option<String>,
}

/// A relationship with both endpoints joined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationshipView {
    pub id: RelationshipId,
    pub project_id: ProjectId,
    pub source: EndpointView,
    pub target: EndpointView,
    #[serde(rename = "type")]
    pub relationship_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// The knowledge base: stores plus the graph and backlink engines.
pub struct KnowledgeBase {
    stores: Stores,
    config: KnowledgeConfig,
    resolver: BacklinkResolver,
}

impl KnowledgeBase {
    /// Create a knowledge base over in-memory stores.
    pub fn new(config: KnowledgeConfig) -> Self {
        Self::with_stores(Stores::in_memory(), config)
    }

    /// Create a knowledge base with default configuration.
    pub fn with_defaults() -> Self {
        Self::new(KnowledgeConfig::default())
    }

    pub fn with_stores(stores: Stores, config: KnowledgeConfig) -> Self {
        Self {
            stores,
            config,
            resolver: BacklinkResolver::new(),
        }
    }

    pub fn config(&self) -> &KnowledgeConfig {
        &self.config
    }

    // ========================================================================
    // Projects
    // ========================================================================

    pub fn create_project(&self, project: NewProject) -> Result<Project> {
        self.stores.projects.create(project)
    }

    pub fn get_project(&self, id: ProjectId) -> Result<Project> {
        self.stores.projects.get(id)
    }

    pub fn list_projects(&self) -> Result<Vec<Project>> {
        self.stores.projects.list()
    }

    /// Delete a project, then remove its relationships and entities.
    ///
    /// The cleanup is best-effort: once the project itself is gone, a
    /// cleanup failure is logged and the delete still succeeds.
    pub fn delete_project(&self, id: ProjectId) -> Result<Project> {
        let project = self.stores.projects.delete(id)?;

        match self.stores.relationships.delete_by_project(id) {
            Ok(removed) => debug!(project_id = %id, removed, "Removed project relationships"),
            Err(e) => warn!(project_id = %id, error = %e, "Failed to remove project relationships"),
        }
        match self.stores.entities.delete_by_project(id) {
            Ok(removed) => debug!(project_id = %id, removed, "Removed project entities"),
            Err(e) => warn!(project_id = %id, error = %e, "Failed to remove project entities"),
        }

        Ok(project)
    }

    // ========================================================================
    // Templates
    // ========================================================================

    pub fn create_template(&self, template: NewTemplate) -> Result<Template> {
        self.stores.templates.create(template)
    }

    pub fn list_templates(&self) -> Result<Vec<Template>> {
        self.stores.templates.list()
    }

    pub fn get_template(&self, id: TemplateId) -> Result<Template> {
        self.stores.templates.get(id)
    }

    pub fn update_template(&self, id: TemplateId, patch: TemplatePatch) -> Result<Template> {
        self.stores.templates.update(id, patch)
    }

    pub fn delete_template(&self, id: TemplateId) -> Result<Template> {
        self.stores.templates.delete(id)
    }

    /// Install the built-in templates, overwriting same-named ones.
    ///
    /// Safe to call any number of times.
    pub fn seed_templates(&self) -> Result<Vec<Template>> {
        let seeded = builtin_templates()
            .into_iter()
            .map(|template| self.stores.templates.upsert_by_name(template))
            .collect::<Result<Vec<_>>>()?;
        debug!(count = seeded.len(), "Seeded built-in templates");
        Ok(seeded)
    }

    // ========================================================================
    // Entities
    // ========================================================================

    /// Create an entity in an existing project.
    pub fn create_entity(&self, project: ProjectId, entity: NewEntity) -> Result<Entity> {
        if !self.stores.projects.exists(project)? {
            return Err(KnowledgeError::not_found(RecordKind::Project, project));
        }
        entity.validate()?;
        self.check_schema(&entity.entity_type, &entity.data)?;
        self.stores
            .entities
            .insert(entity.into_entity(project, Utc::now()))
    }

    pub fn get_entity(&self, id: EntityId) -> Result<Entity> {
        self.stores.entities.get(id)
    }

    pub fn list_entities(&self, project: ProjectId) -> Result<Vec<Entity>> {
        self.stores.entities.list_by_project(project)
    }

    /// Apply a partial update. Only supplied fields change.
    ///
    /// Under the strict policy a patch that touches `type` or `data` is
    /// checked against the template within the store's update, so a
    /// concurrent update cannot slip past the check.
    pub fn update_entity(&self, id: EntityId, patch: EntityPatch) -> Result<Entity> {
        patch.validate()?;
        let touches_schema = patch.entity_type.is_some() || patch.data.is_some();
        if self.config.schema_policy == SchemaPolicy::Strict && touches_schema {
            self.stores.entities.update_checked(id, patch, &|patched: &Entity| {
                self.check_schema(&patched.entity_type, &patched.data)
            })
        } else {
            self.stores.entities.update(id, patch)
        }
    }

    /// Delete an entity. Relationships that reference it are left in place.
    pub fn delete_entity(&self, id: EntityId) -> Result<Entity> {
        self.stores.entities.delete(id)
    }

    pub fn find_entities_by_names(&self, project: ProjectId, names: &[String]) -> Result<Vec<Entity>> {
        self.stores.entities.find_by_names(project, names)
    }

    fn check_schema(&self, entity_type: &str, data: &EntityData) -> Result<()> {
        match self.config.schema_policy {
            SchemaPolicy::Lenient => Ok(()),
            SchemaPolicy::Strict => {
                if entity_type == CUSTOM_ENTITY_TYPE {
                    return Ok(());
                }
                match self.stores.templates.find_by_name(entity_type)? {
                    Some(template) => template.validate_data(data),
                    None => Ok(()),
                }
            }
        }
    }

    // ========================================================================
    // Relationships
    // ========================================================================

    /// Create a relationship. Endpoints are not checked against the entity store.
    pub fn create_relationship(&self, relationship: NewRelationship) -> Result<Relationship> {
        self.stores.relationships.insert(relationship)
    }

    pub fn get_relationship(&self, id: RelationshipId) -> Result<Relationship> {
        self.stores.relationships.get(id)
    }

    pub fn delete_relationship(&self, id: RelationshipId) -> Result<Relationship> {
        self.stores.relationships.delete(id)
    }

    /// Every relationship where the entity is source or target, with both
    /// endpoints joined to their entity's name and type.
    pub fn relationships_for_entity(&self, entity: EntityId) -> Result<Vec<RelationshipView>> {
        let relationships = self.stores.relationships.list_involving(entity)?;

        let mut endpoints: HashMap<EntityId, Option<Entity>> = HashMap::new();
        for id in relationships.iter().flat_map(|r| [r.source, r.target]) {
            if endpoints.contains_key(&id) {
                continue;
            }
            let resolved = match self.stores.entities.get(id) {
                Ok(found) => Some(found),
                Err(KnowledgeError::NotFound { .. }) => None,
                Err(e) => return Err(e),
            };
            endpoints.insert(id, resolved);
        }

        let view = |id: EntityId| {
            let entity = endpoints.get(&id).and_then(Option::as_ref);
            EndpointView {
                id,
                name: entity.map(|e| e.name.clone()),
                entity_type: entity.map(|e| e.entity_type.clone()),
            }
        };

        Ok(relationships
            .into_iter()
            .map(|rel| RelationshipView {
                id: rel.id,
                project_id: rel.project_id,
                source: view(rel.source),
                target: view(rel.target),
                relationship_type: rel.relationship_type,
                description: rel.description,
            })
            .collect())
    }

    // ========================================================================
    // Graph and backlinks
    // ========================================================================

    /// Materialize the project's graph.
    pub fn materialize(&self, project: ProjectId) -> Result<Graph> {
        let entities = self.stores.entities.list_by_project(project)?;
        let relationships = self.stores.relationships.list_by_project(project)?;

        let graph = materialize(&entities, &relationships, &self.config.layout);
        debug!(
            %project,
            nodes = graph.nodes.len(),
            edges = graph.edges.len(),
            dangling = graph.dangling_edges().len(),
            "Materialized graph"
        );
        Ok(graph)
    }

    /// Link entity names mentioned in `text`.
    pub fn resolve_backlinks(&self, project: ProjectId, text: &str) -> Result<LinkedText> {
        self.resolver
            .resolve(self.stores.entities.as_ref(), project, text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use saga_model::FieldType;
    use serde_json::json;
    use std::collections::HashSet;

    fn setup() -> (KnowledgeBase, ProjectId) {
        let kb = KnowledgeBase::with_defaults();
        let project = kb.create_project(NewProject::new("Middle-earth")).unwrap();
        (kb, project.id)
    }

    #[test]
    fn test_create_entity_requires_project() {
        let kb = KnowledgeBase::with_defaults();
        let missing = ProjectId::new();

        let result = kb.create_entity(missing, NewEntity::new("Aragorn", "Character"));
        assert!(matches!(
            result,
            Err(KnowledgeError::NotFound {
                kind: RecordKind::Project,
                ..
            })
        ));
        assert!(kb.list_entities(missing).unwrap().is_empty());
    }

    #[test]
    fn test_update_entity_refreshes_timestamp() {
        let (kb, project) = setup();
        let created = kb
            .create_entity(project, NewEntity::new("Strider", "Character").with_data("Age", json!(87)))
            .unwrap();

        let updated = kb
            .update_entity(
                created.id,
                EntityPatch {
                    name: Some("Aragorn".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(updated.name, "Aragorn");
        assert_eq!(updated.data["Age"], json!(87));
        assert!(updated.updated_at >= created.updated_at);
        assert_eq!(updated.created_at, created.created_at);
    }

    #[test]
    fn test_seed_is_idempotent() {
        let kb = KnowledgeBase::with_defaults();
        for _ in 0..3 {
            kb.seed_templates().unwrap();
        }

        let templates = kb.list_templates().unwrap();
        let names: HashSet<_> = templates.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(templates.len(), 3);
        assert_eq!(
            names,
            HashSet::from(["Character", "Location", "Magic System"])
        );
    }

    #[test]
    fn test_seed_restores_modified_builtin() {
        let kb = KnowledgeBase::with_defaults();
        let seeded = kb.seed_templates().unwrap();
        let character = seeded.iter().find(|t| t.name == "Character").unwrap();

        kb.update_template(
            character.id,
            TemplatePatch {
                fields: Some(vec![]),
                ..Default::default()
            },
        )
        .unwrap();
        kb.seed_templates().unwrap();

        assert_eq!(kb.get_template(character.id).unwrap().fields.len(), 4);
    }

    #[test]
    fn test_lenient_policy_accepts_any_data() {
        let (kb, project) = setup();
        kb.seed_templates().unwrap();

        let entity = kb.create_entity(
            project,
            NewEntity::new("Aragorn", "Character").with_data("Sword", json!("Anduril")),
        );
        assert!(entity.is_ok());
    }

    #[test]
    fn test_strict_policy_checks_template_fields() {
        let kb = KnowledgeBase::new(KnowledgeConfig::strict());
        let project = kb.create_project(NewProject::new("Arda")).unwrap().id;
        kb.create_template(NewTemplate::new("Character").with_field("Age", FieldType::Number))
            .unwrap();

        let unknown_key = kb.create_entity(
            project,
            NewEntity::new("Aragorn", "Character").with_data("Sword", json!("Anduril")),
        );
        assert!(matches!(unknown_key, Err(KnowledgeError::Validation(_))));

        let wrong_type = kb.create_entity(
            project,
            NewEntity::new("Aragorn", "Character").with_data("Age", json!("old")),
        );
        assert!(wrong_type.is_err());

        let aragorn = kb
            .create_entity(project, NewEntity::new("Aragorn", "Character").with_data("Age", json!(87)))
            .unwrap();

        let bad_update = kb.update_entity(
            aragorn.id,
            EntityPatch {
                data: Some(EntityData::from([("Age".to_string(), json!(true))])),
                ..Default::default()
            },
        );
        assert!(bad_update.is_err());
        assert_eq!(kb.get_entity(aragorn.id).unwrap().data["Age"], json!(87));

        let renamed = kb.update_entity(
            aragorn.id,
            EntityPatch {
                name: Some("Elessar".to_string()),
                ..Default::default()
            },
        );
        assert_eq!(renamed.unwrap().name, "Elessar");

        let custom = kb.create_entity(
            project,
            NewEntity::new("Anduril", CUSTOM_ENTITY_TYPE).with_data("Forged", json!("Third Age")),
        );
        assert!(custom.is_ok());

        let no_template = kb.create_entity(
            project,
            NewEntity::new("Shire", "Region").with_data("Size", json!("small")),
        );
        assert!(no_template.is_ok());
    }

    #[test]
    fn test_relationships_for_entity_joins_endpoints() {
        let (kb, project) = setup();
        let aragorn = kb.create_entity(project, NewEntity::new("Aragorn", "Character")).unwrap();
        let gondor = kb.create_entity(project, NewEntity::new("Gondor", "Location")).unwrap();
        let arwen = kb.create_entity(project, NewEntity::new("Arwen", "Character")).unwrap();

        kb.create_relationship(NewRelationship::new(project, aragorn.id, gondor.id, "Rules"))
            .unwrap();
        kb.create_relationship(NewRelationship::new(project, arwen.id, aragorn.id, "Loves"))
            .unwrap();
        kb.create_relationship(NewRelationship::new(project, arwen.id, gondor.id, "Visits"))
            .unwrap();

        let views = kb.relationships_for_entity(aragorn.id).unwrap();
        assert_eq!(views.len(), 2);

        let rules = views.iter().find(|v| v.relationship_type == "Rules").unwrap();
        assert_eq!(rules.target.name.as_deref(), Some("Gondor"));
        assert_eq!(rules.target.entity_type.as_deref(), Some("Location"));

        let loves = views.iter().find(|v| v.relationship_type == "Loves").unwrap();
        assert_eq!(loves.source.name.as_deref(), Some("Arwen"));
    }

    #[test]
    fn test_deleted_endpoint_is_reported_empty() {
        let (kb, project) = setup();
        let frodo = kb.create_entity(project, NewEntity::new("Frodo", "Character")).unwrap();
        let gollum = kb.create_entity(project, NewEntity::new("Gollum", "Character")).unwrap();
        kb.create_relationship(NewRelationship::new(project, gollum.id, frodo.id, "Guides"))
            .unwrap();

        kb.delete_entity(gollum.id).unwrap();

        let views = kb.relationships_for_entity(frodo.id).unwrap();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].source.id, gollum.id);
        assert!(views[0].source.name.is_none());

        let graph = kb.materialize(project).unwrap();
        assert_eq!(graph.nodes.len(), 1);
        assert_eq!(graph.dangling_edges().len(), 1);
    }

    #[test]
    fn test_materialize_counts_match_stores() {
        let (kb, project) = setup();
        let ids: Vec<_> = ["Frodo", "Sam", "Gollum"]
            .iter()
            .map(|name| kb.create_entity(project, NewEntity::new(*name, "Character")).unwrap().id)
            .collect();
        kb.create_relationship(NewRelationship::new(project, ids[0], ids[1], "Friend"))
            .unwrap();

        let graph = kb.materialize(project).unwrap();
        assert_eq!(graph.nodes.len(), kb.list_entities(project).unwrap().len());
        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph, kb.materialize(project).unwrap());
    }

    #[test]
    fn test_empty_project_graph() {
        let (kb, project) = setup();
        let graph = kb.materialize(project).unwrap();
        assert!(graph.nodes.is_empty());
        assert!(graph.edges.is_empty());
    }

    #[test]
    fn test_resolve_backlinks() {
        let (kb, project) = setup();
        kb.create_entity(project, NewEntity::new("Aragorn", "Character")).unwrap();
        kb.create_entity(project, NewEntity::new("Gondor", "Location")).unwrap();

        let linked = kb
            .resolve_backlinks(project, "Aragorn met Gondor today")
            .unwrap();
        assert_eq!(linked.links().count(), 2);
    }

    /// Entity store whose project cleanup always fails.
    struct FailingCleanup(MemoryEntityStore);

    impl EntityStore for FailingCleanup {
        fn insert(&self, entity: Entity) -> Result<Entity> {
            self.0.insert(entity)
        }
        fn get(&self, id: EntityId) -> Result<Entity> {
            self.0.get(id)
        }
        fn update_checked(
            &self,
            id: EntityId,
            patch: EntityPatch,
            check: &dyn Fn(&Entity) -> Result<()>,
        ) -> Result<Entity> {
            self.0.update_checked(id, patch, check)
        }
        fn delete(&self, id: EntityId) -> Result<Entity> {
            self.0.delete(id)
        }
        fn list_by_project(&self, project: ProjectId) -> Result<Vec<Entity>> {
            self.0.list_by_project(project)
        }
        fn find_by_names(&self, project: ProjectId, names: &[String]) -> Result<Vec<Entity>> {
            self.0.find_by_names(project, names)
        }
        fn delete_by_project(&self, _project: ProjectId) -> Result<usize> {
            Err(KnowledgeError::Unexpected("disk on fire".to_string()))
        }
    }

    #[test]
    fn test_delete_project_survives_cleanup_failure() {
        let stores = Stores {
            entities: Arc::new(FailingCleanup(MemoryEntityStore::new())),
            ..Stores::in_memory()
        };
        let kb = KnowledgeBase::with_stores(stores, KnowledgeConfig::default());
        let project = kb.create_project(NewProject::new("Doomed")).unwrap().id;
        let a = kb.create_entity(project, NewEntity::new("A", "Custom")).unwrap();
        kb.create_relationship(NewRelationship::new(project, a.id, a.id, "Self"))
            .unwrap();

        assert!(kb.delete_project(project).is_ok());
        assert!(kb.get_project(project).unwrap_err().is_not_found());
        assert!(kb.materialize(project).unwrap().edges.is_empty());
    }

    #[test]
    fn test_delete_project_removes_contents() {
        let (kb, project) = setup();
        let a = kb.create_entity(project, NewEntity::new("A", "Custom")).unwrap();
        kb.create_relationship(NewRelationship::new(project, a.id, a.id, "Self"))
            .unwrap();

        kb.delete_project(project).unwrap();
        assert!(kb.materialize(project).unwrap().is_empty());
        assert!(kb.delete_project(project).unwrap_err().is_not_found());
    }
}
