//! REST API for the knowledge base.

mod extract;
pub mod handlers;
mod rest;

pub use extract::{JsonBody, PathId};
pub use handlers::ApiState;
pub use rest::create_router;
