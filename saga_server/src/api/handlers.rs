//! REST API request handlers.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use saga_core::{parse_name_list, Graph, KnowledgeBase, RelationshipView, TextSpan};
use saga_model::{
    Entity, EntityId, EntityPatch, NewEntity, NewProject, NewRelationship, NewTemplate, Project,
    ProjectId, Relationship, RelationshipId, Template, TemplateId, TemplatePatch,
};

use crate::api::{JsonBody, PathId};
use crate::error::ApiError;

/// Application state shared across handlers.
pub struct ApiState {
    pub knowledge: Arc<KnowledgeBase>,
}

impl ApiState {
    pub fn new(knowledge: Arc<KnowledgeBase>) -> Self {
        Self { knowledge }
    }
}

type SharedState = State<Arc<ApiState>>;
type ApiResult<T> = Result<T, ApiError>;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Result of seeding the built-in templates.
#[derive(Debug, Clone, Serialize)]
pub struct SeedResponse {
    pub message: String,
    pub templates: Vec<Template>,
}

/// Backlink resolution request.
#[derive(Debug, Clone, Deserialize)]
pub struct BacklinkRequest {
    pub text: String,
}

/// Backlink resolution response.
#[derive(Debug, Clone, Serialize)]
pub struct BacklinkResponse {
    pub spans: Vec<TextSpan>,
    pub markdown: String,
}

// ============================================================================
// Health
// ============================================================================

pub async fn health_handler() -> &'static str {
    "Saga API is running!"
}

// ============================================================================
// Projects
// ============================================================================

pub async fn list_projects_handler(State(state): SharedState) -> ApiResult<Json<Vec<Project>>> {
    Ok(Json(state.knowledge.list_projects()?))
}

pub async fn create_project_handler(
    State(state): SharedState,
    JsonBody(request): JsonBody<NewProject>,
) -> ApiResult<impl IntoResponse> {
    let project = state.knowledge.create_project(request)?;
    Ok((StatusCode::CREATED, Json(project)))
}

pub async fn get_project_handler(
    State(state): SharedState,
    PathId(project_id): PathId<ProjectId>,
) -> ApiResult<Json<Project>> {
    Ok(Json(state.knowledge.get_project(project_id)?))
}

pub async fn delete_project_handler(
    State(state): SharedState,
    PathId(project_id): PathId<ProjectId>,
) -> ApiResult<StatusCode> {
    state.knowledge.delete_project(project_id)?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Entities
// ============================================================================

pub async fn list_entities_handler(
    State(state): SharedState,
    PathId(project_id): PathId<ProjectId>,
) -> ApiResult<Json<Vec<Entity>>> {
    Ok(Json(state.knowledge.list_entities(project_id)?))
}

pub async fn create_entity_handler(
    State(state): SharedState,
    PathId(project_id): PathId<ProjectId>,
    JsonBody(request): JsonBody<NewEntity>,
) -> ApiResult<impl IntoResponse> {
    let entity = state.knowledge.create_entity(project_id, request)?;
    Ok((StatusCode::CREATED, Json(entity)))
}

pub async fn get_entity_handler(
    State(state): SharedState,
    PathId(entity_id): PathId<EntityId>,
) -> ApiResult<Json<Entity>> {
    Ok(Json(state.knowledge.get_entity(entity_id)?))
}

pub async fn update_entity_handler(
    State(state): SharedState,
    PathId(entity_id): PathId<EntityId>,
    JsonBody(patch): JsonBody<EntityPatch>,
) -> ApiResult<Json<Entity>> {
    Ok(Json(state.knowledge.update_entity(entity_id, patch)?))
}

pub async fn delete_entity_handler(
    State(state): SharedState,
    PathId(entity_id): PathId<EntityId>,
) -> ApiResult<StatusCode> {
    state.knowledge.delete_entity(entity_id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Body `{ "names": [...] }`. The body is taken as raw JSON so a `names`
/// value of the wrong shape gets the same validation error as a missing one.
pub async fn find_entities_by_name_handler(
    State(state): SharedState,
    PathId(project_id): PathId<ProjectId>,
    JsonBody(body): JsonBody<Value>,
) -> ApiResult<Json<Vec<Entity>>> {
    let names = parse_name_list(body.get("names").unwrap_or(&Value::Null))?;
    Ok(Json(state.knowledge.find_entities_by_names(project_id, &names)?))
}

pub async fn relationships_for_entity_handler(
    State(state): SharedState,
    PathId(entity_id): PathId<EntityId>,
) -> ApiResult<Json<Vec<RelationshipView>>> {
    Ok(Json(state.knowledge.relationships_for_entity(entity_id)?))
}

// ============================================================================
// Graph and backlinks
// ============================================================================

pub async fn graph_handler(
    State(state): SharedState,
    PathId(project_id): PathId<ProjectId>,
) -> ApiResult<Json<Graph>> {
    Ok(Json(state.knowledge.materialize(project_id)?))
}

pub async fn backlinks_handler(
    State(state): SharedState,
    PathId(project_id): PathId<ProjectId>,
    JsonBody(request): JsonBody<BacklinkRequest>,
) -> ApiResult<Json<BacklinkResponse>> {
    let linked = state.knowledge.resolve_backlinks(project_id, &request.text)?;
    let markdown = linked.to_markdown();
    Ok(Json(BacklinkResponse {
        spans: linked.spans,
        markdown,
    }))
}

// ============================================================================
// Relationships
// ============================================================================

pub async fn create_relationship_handler(
    State(state): SharedState,
    JsonBody(request): JsonBody<NewRelationship>,
) -> ApiResult<impl IntoResponse> {
    let relationship: Relationship = state.knowledge.create_relationship(request)?;
    Ok((StatusCode::CREATED, Json(relationship)))
}

pub async fn delete_relationship_handler(
    State(state): SharedState,
    PathId(relationship_id): PathId<RelationshipId>,
) -> ApiResult<StatusCode> {
    state.knowledge.delete_relationship(relationship_id)?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Templates
// ============================================================================

pub async fn list_templates_handler(State(state): SharedState) -> ApiResult<Json<Vec<Template>>> {
    Ok(Json(state.knowledge.list_templates()?))
}

pub async fn create_template_handler(
    State(state): SharedState,
    JsonBody(request): JsonBody<NewTemplate>,
) -> ApiResult<impl IntoResponse> {
    let template = state.knowledge.create_template(request)?;
    Ok((StatusCode::CREATED, Json(template)))
}

pub async fn seed_templates_handler(State(state): SharedState) -> ApiResult<impl IntoResponse> {
    let templates = state.knowledge.seed_templates()?;
    Ok((
        StatusCode::CREATED,
        Json(SeedResponse {
            message: "Default templates seeded successfully.".to_string(),
            templates,
        }),
    ))
}

pub async fn get_template_handler(
    State(state): SharedState,
    PathId(template_id): PathId<TemplateId>,
) -> ApiResult<Json<Template>> {
    Ok(Json(state.knowledge.get_template(template_id)?))
}

pub async fn update_template_handler(
    State(state): SharedState,
    PathId(template_id): PathId<TemplateId>,
    JsonBody(patch): JsonBody<TemplatePatch>,
) -> ApiResult<Json<Template>> {
    Ok(Json(state.knowledge.update_template(template_id, patch)?))
}

pub async fn delete_template_handler(
    State(state): SharedState,
    PathId(template_id): PathId<TemplateId>,
) -> ApiResult<StatusCode> {
    state.knowledge.delete_template(template_id)?;
    Ok(StatusCode::NO_CONTENT)
}
