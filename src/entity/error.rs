//! Error types for the entity table engine

use thiserror::Error;

/// Failures reported by an [`EntityRepository`](super::EntityRepository).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    /// The requested entity does not exist
    #[error("Entity not found: {0}")]
    NotFound(String),

    /// The collaborating service rejected or failed the request
    #[error("Request failed: {0}")]
    Request(String),

    /// The collaborating service cannot be reached
    #[error("Service unavailable: {0}")]
    Unavailable(String),
}

/// Errors raised by the table engine itself.
#[derive(Debug, Error)]
pub enum TableError {
    /// An operation needed state that `init` has not produced yet
    #[error("Table is not initialized")]
    NotInitialized,

    /// The action exists but its enablement predicate rejected the call
    #[error("Action is disabled: {0}")]
    ActionDisabled(String),

    /// No action with the given index or name
    #[error("Unknown action: {0}")]
    ActionNotFound(String),

    /// The view bound to a config has been dropped
    #[error("Bound view is no longer alive")]
    DetachedView,

    #[error("Invalid query: {0}")]
    InvalidQuery(#[from] crate::page::PageLinkError),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}
