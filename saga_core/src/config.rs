//! Runtime configuration for the knowledge base.

use saga_model::{KnowledgeError, Result};
use serde::{Deserialize, Serialize};

/// How entity data is checked against the template named by its type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaPolicy {
    /// Accept any keys and values; templates only guide editing.
    #[default]
    Lenient,
    /// Reject keys the template does not declare and values of the wrong type.
    Strict,
}

/// Configuration for the circular graph layout.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Circle radius contributed by each node, so the ring grows with the graph.
    pub radius_per_node: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            radius_per_node: 30.0,
        }
    }
}

impl LayoutConfig {
    /// Radius of the ring for `count` nodes.
    pub fn radius(&self, count: usize) -> f64 {
        self.radius_per_node * count as f64
    }
}

/// Configuration for the knowledge base.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeConfig {
    pub schema_policy: SchemaPolicy,
    pub layout: LayoutConfig,
}

impl KnowledgeConfig {
    pub fn strict() -> Self {
        Self {
            schema_policy: SchemaPolicy::Strict,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        let radius = self.layout.radius_per_node;
        if !radius.is_finite() || radius < 0.0 {
            return Err(KnowledgeError::validation(
                "layout.radius_per_node must be a finite, non-negative number",
            ));
        }
        Ok(())
    }
}
