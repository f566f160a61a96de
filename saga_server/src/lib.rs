//! # Saga Server
//!
//! HTTP surface for the Saga knowledge base: entity, relationship and
//! template CRUD, graph materialization and backlink resolution.

pub mod api;
pub mod config;
pub mod error;

pub use api::{create_router, ApiState};
pub use config::{Config, ServerConfig};
pub use error::{ApiError, ConfigError};
