//! # DomainError
//!
//! Centralized error handling for the Rusty-Social core.
//! Every port and service returns these; the boundary maps `ErrorKind`
//! to a status code.

use thiserror::Error;

/// The primary error type for all domain and service operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Malformed or missing input (e.g., page 0, empty post body)
    #[error("{0}")]
    Validation(String),

    /// Referenced entity absent (e.g., User, Post, FriendRequest)
    #[error("{entity} not found with ID {id}")]
    NotFound { entity: &'static str, id: String },

    /// The principal is authenticated but not allowed to do this
    #[error("{0}")]
    Forbidden(String),

    /// The action would violate a state invariant
    #[error("{0}")]
    Conflict(String),

    /// Actor and target are the same user where that is not allowed
    #[error("{0}")]
    SelfReference(String),

    /// Infrastructure failure (e.g., store unavailable, I/O error)
    #[error("storage error: {0}")]
    Storage(String),
}

/// Coarse classification used by the boundary and by metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Forbidden,
    Conflict,
    SelfReference,
    Storage,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::Conflict => "conflict",
            ErrorKind::SelfReference => "self_reference",
            ErrorKind::Storage => "storage",
        }
    }
}

impl DomainError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn storage(msg: impl ToString) -> Self {
        Self::Storage(msg.to_string())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            DomainError::Validation(_) => ErrorKind::Validation,
            DomainError::NotFound { .. } => ErrorKind::NotFound,
            DomainError::Forbidden(_) => ErrorKind::Forbidden,
            DomainError::Conflict(_) => ErrorKind::Conflict,
            DomainError::SelfReference(_) => ErrorKind::SelfReference,
            DomainError::Storage(_) => ErrorKind::Storage,
        }
    }

    /// Self-reference is a specialization of conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            DomainError::Conflict(_) | DomainError::SelfReference(_)
        )
    }
}

/// A specialized Result type for Rusty-Social logic.
pub type Result<T> = std::result::Result<T, DomainError>;
