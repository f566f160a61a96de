//! REST API router and configuration.

use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use saga_core::KnowledgeBase;

use crate::api::handlers::{
    backlinks_handler, create_entity_handler, create_project_handler,
    create_relationship_handler, create_template_handler, delete_entity_handler,
    delete_project_handler, delete_relationship_handler, delete_template_handler,
    find_entities_by_name_handler, get_entity_handler, get_project_handler, get_template_handler,
    graph_handler, health_handler, list_entities_handler, list_projects_handler,
    list_templates_handler, relationships_for_entity_handler, seed_templates_handler,
    update_entity_handler, update_template_handler, ApiState,
};
use crate::config::ServerConfig;

/// Create the REST API router.
///
/// Endpoints, under the configured prefix:
/// - GET/POST        /projects
/// - GET/DELETE      /projects/:project_id
/// - GET/POST        /projects/:project_id/entities
/// - POST            /projects/:project_id/entities/find-by-name
/// - GET             /projects/:project_id/graph
/// - POST            /projects/:project_id/backlinks
/// - GET/PUT/DELETE  /entities/:entity_id
/// - GET             /entities/:entity_id/relationships
/// - POST            /relationships
/// - DELETE          /relationships/:relationship_id
/// - GET/POST        /templates
/// - POST            /templates/seed
/// - GET/PUT/DELETE  /templates/:template_id
pub fn create_router(knowledge: Arc<KnowledgeBase>, config: &ServerConfig) -> Router {
    let state = Arc::new(ApiState::new(knowledge));

    let api_routes = Router::new()
        .route("/projects", get(list_projects_handler).post(create_project_handler))
        .route(
            "/projects/:project_id",
            get(get_project_handler).delete(delete_project_handler),
        )
        .route(
            "/projects/:project_id/entities",
            get(list_entities_handler).post(create_entity_handler),
        )
        .route(
            "/projects/:project_id/entities/find-by-name",
            post(find_entities_by_name_handler),
        )
        .route("/projects/:project_id/graph", get(graph_handler))
        .route("/projects/:project_id/backlinks", post(backlinks_handler))
        .route(
            "/entities/:entity_id",
            get(get_entity_handler)
                .put(update_entity_handler)
                .delete(delete_entity_handler),
        )
        .route(
            "/entities/:entity_id/relationships",
            get(relationships_for_entity_handler),
        )
        .route("/relationships", post(create_relationship_handler))
        .route(
            "/relationships/:relationship_id",
            axum::routing::delete(delete_relationship_handler),
        )
        .route("/templates", get(list_templates_handler).post(create_template_handler))
        .route("/templates/seed", post(seed_templates_handler))
        .route(
            "/templates/:template_id",
            get(get_template_handler)
                .put(update_template_handler)
                .delete(delete_template_handler),
        )
        .with_state(state);

    let router = Router::new().route("/", get(health_handler));
    let router = if config.api_prefix == "/" {
        router.merge(api_routes)
    } else {
        router.nest(&config.api_prefix, api_routes)
    };
    let router = router.layer(TraceLayer::new_for_http());

    if config.enable_cors {
        router.layer(cors_layer(&config.cors_origins))
    } else {
        router
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    if origins.iter().any(|o| o == "*") {
        return cors.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    cors.allow_origin(AllowOrigin::list(allowed))
}
