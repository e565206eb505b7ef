use thiserror::Error;

use crate::contract::id::Id;

/// Errors that are safe to expose to other modules
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccountsError {
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Storage unavailable")]
    Unavailable,

    #[error("Internal error")]
    Internal,
}

impl AccountsError {
    pub fn client_not_found(id: Id) -> Self {
        Self::NotFound {
            entity: "client",
            key: id.to_string(),
        }
    }

    pub fn user_not_found(key: impl Into<String>) -> Self {
        Self::NotFound {
            entity: "user",
            key: key.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn unavailable() -> Self {
        Self::Unavailable
    }

    pub fn internal() -> Self {
        Self::Internal
    }
}
