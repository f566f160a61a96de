//! # Saga Core
//!
//! The knowledge-graph engine. This crate stores the records defined in
//! `saga_model`, materializes them into a displayable graph, and links prose
//! back to the entities it mentions.
//!
//! ## Core Components
//!
//! - **store**: Keyed record stores for projects, templates, entities and relationships
//! - **knowledge_base**: The service facade combining the stores into the public operations
//! - **knowledge_graph**: Graph materialization with a circular layout, plus neighbor highlighting
//! - **backlink**: Name-based auto-linking of free text to known entities

pub mod backlink;
pub mod config;
pub mod knowledge_base;
pub mod knowledge_graph;
pub mod store;

pub use backlink::*;
pub use config::*;
pub use knowledge_base::*;
pub use knowledge_graph::*;
pub use store::*;
