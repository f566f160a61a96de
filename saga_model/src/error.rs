//! Error taxonomy shared by every store and service.

use thiserror::Error;

/// Kinds of records that can be looked up by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Project,
    Entity,
    Relationship,
    Template,
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RecordKind::Project => "Project",
            RecordKind::Entity => "Entity",
            RecordKind::Relationship => "Relationship",
            RecordKind::Template => "Template",
        };
        f.write_str(name)
    }
}

/// Errors raised by the knowledge base.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum KnowledgeError {
    /// A referenced record does not exist. Never retried.
    #[error("{kind} not found: {id}")]
    NotFound { kind: RecordKind, id: String },

    /// Malformed input. Never retried.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Storage or transport fault.
    #[error("Unexpected failure: {0}")]
    Unexpected(String),
}

impl KnowledgeError {
    /// Build a `NotFound` error for the given record.
    pub fn not_found(kind: RecordKind, id: impl std::fmt::Display) -> Self {
        KnowledgeError::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// Build a `Validation` error.
    pub fn validation(message: impl Into<String>) -> Self {
        KnowledgeError::Validation(message.into())
    }

    /// Check whether this is a `NotFound` error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, KnowledgeError::NotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, KnowledgeError>;

/// Reject empty or whitespace-only values for a required field.
pub fn require_non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(KnowledgeError::validation(format!("{} is required", field)));
    }
    Ok(())
}
