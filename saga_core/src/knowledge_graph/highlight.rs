//! Neighbor highlighting over a materialized graph.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use saga_model::{EntityId, RelationshipId};

use super::{GraphEdge, GraphNode};

/// Opacity of highlighted nodes and edges.
pub const FULL_OPACITY: f32 = 1.0;

/// Opacity of everything outside the selection's neighborhood.
pub const DIMMED_OPACITY: f32 = 0.2;

/// The currently selected node, if any.
///
/// Selecting the selected node again clears the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Selection(Option<EntityId>);

impl Selection {
    pub fn none() -> Self {
        Self(None)
    }

    pub fn of(id: EntityId) -> Self {
        Self(Some(id))
    }

    pub fn selected(&self) -> Option<EntityId> {
        self.0
    }

    /// Select `id`, or clear the selection if `id` is already selected.
    pub fn toggle(self, id: EntityId) -> Self {
        match self.0 {
            Some(current) if current == id => Self(None),
            _ => Self(Some(id)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodeHighlight {
    pub id: EntityId,
    pub opacity: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgeHighlight {
    pub id: RelationshipId,
    pub opacity: f32,
    pub animated: bool,
}

/// Visual weight for each node and edge, in input order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Highlight {
    pub nodes: Vec<NodeHighlight>,
    pub edges: Vec<EdgeHighlight>,
}

impl Highlight {
    pub fn node_opacity(&self, id: EntityId) -> Option<f32> {
        self.nodes.iter().find(|n| n.id == id).map(|n| n.opacity)
    }

    pub fn edge(&self, id: RelationshipId) -> Option<&EdgeHighlight> {
        self.edges.iter().find(|e| e.id == id)
    }
}

/// Annotate nodes and edges for the selected node.
///
/// With no selection everything is at full opacity. Otherwise the selected
/// node, its neighbors (in either direction) and the edges touching it are
/// at full opacity, connecting edges are animated, and the rest is dimmed.
pub fn highlight(nodes: &[GraphNode], edges: &[GraphEdge], selected: Option<EntityId>) -> Highlight {
    let Some(selected) = selected else {
        return Highlight {
            nodes: nodes
                .iter()
                .map(|n| NodeHighlight {
                    id: n.id,
                    opacity: FULL_OPACITY,
                })
                .collect(),
            edges: edges
                .iter()
                .map(|e| EdgeHighlight {
                    id: e.id,
                    opacity: FULL_OPACITY,
                    animated: false,
                })
                .collect(),
        };
    };

    let mut neighbors: HashSet<EntityId> = HashSet::new();
    let mut connecting: HashSet<RelationshipId> = HashSet::new();
    for edge in edges.iter().filter(|e| e.touches(selected)) {
        neighbors.insert(edge.source);
        neighbors.insert(edge.target);
        connecting.insert(edge.id);
    }

    let opacity = |lit: bool| if lit { FULL_OPACITY } else { DIMMED_OPACITY };

    Highlight {
        nodes: nodes
            .iter()
            .map(|n| NodeHighlight {
                id: n.id,
                opacity: opacity(n.id == selected || neighbors.contains(&n.id)),
            })
            .collect(),
        edges: edges
            .iter()
            .map(|e| {
                let lit = connecting.contains(&e.id);
                EdgeHighlight {
                    id: e.id,
                    opacity: opacity(lit),
                    animated: lit,
                }
            })
            .collect(),
    }
}
