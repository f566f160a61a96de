//! Knowledge Graph - the displayable node/edge view of a project.
//!
//! The graph is derived on every request from the entity and relationship
//! stores and never persisted:
//! - **Nodes**: one per entity, placed on a ring
//! - **Edges**: one per relationship, labelled with its type

mod highlight;

pub use highlight::*;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::f64::consts::TAU;

use saga_model::{Entity, EntityId, Relationship, RelationshipId};

use crate::config::LayoutConfig;

/// A point on the layout plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// A node of the materialized graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: EntityId,
    pub label: String,
    pub position: Position,
}

/// An edge of the materialized graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub id: RelationshipId,
    pub source: EntityId,
    pub target: EntityId,
    pub label: String,
}

impl GraphEdge {
    /// Check if the node is either endpoint.
    pub fn touches(&self, node: EntityId) -> bool {
        self.source == node || self.target == node
    }
}

/// A materialized graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl Graph {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    pub fn node(&self, id: EntityId) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Edges whose source or target has no node in this graph.
    pub fn dangling_edges(&self) -> Vec<&GraphEdge> {
        let node_ids: HashSet<EntityId> = self.nodes.iter().map(|n| n.id).collect();
        self.edges
            .iter()
            .filter(|e| !node_ids.contains(&e.source) || !node_ids.contains(&e.target))
            .collect()
    }

    /// Annotate the graph for the given selection.
    pub fn highlight(&self, selected: Option<EntityId>) -> Highlight {
        highlight(&self.nodes, &self.edges, selected)
    }
}

/// Positions for `count` nodes evenly spaced on a circle.
///
/// Node `i` sits at angle `2π·i/count` on a circle of radius
/// `radius_per_node·count`. The result depends only on `count`.
pub fn circular_layout(count: usize, layout: &LayoutConfig) -> Vec<Position> {
    if count == 0 {
        return Vec::new();
    }

    let radius = layout.radius(count);
    (0..count)
        .map(|i| {
            let angle = TAU * i as f64 / count as f64;
            Position {
                x: radius * angle.cos(),
                y: radius * angle.sin(),
            }
        })
        .collect()
}

/// Build the graph for a project's entities and relationships.
///
/// Entities are placed in the order given. Every relationship becomes an
/// edge, including ones whose endpoints are missing from `entities`.
pub fn materialize(
    entities: &[Entity],
    relationships: &[Relationship],
    layout: &LayoutConfig,
) -> Graph {
    let positions = circular_layout(entities.len(), layout);

    let nodes = entities
        .iter()
        .zip(positions)
        .map(|(entity, position)| GraphNode {
            id: entity.id,
            label: entity.name.clone(),
            position,
        })
        .collect();

    let edges = relationships
        .iter()
        .map(|rel| GraphEdge {
            id: rel.id,
            source: rel.source,
            target: rel.target,
            label: rel.relationship_type.clone(),
        })
        .collect();

    Graph { nodes, edges }
}
