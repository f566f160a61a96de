//! # Saga Model
//!
//! The "world bible" crate - holds every record the knowledge base stores:
//! projects, entity templates, entities and the relationships between them.
//! This crate is the single source of truth for record shapes and contains no
//! storage or transport logic.

pub mod entities;
pub mod error;
pub mod project;
pub mod relationships;
pub mod templates;

pub use entities::*;
pub use error::*;
pub use project::*;
pub use relationships::*;
pub use templates::*;
