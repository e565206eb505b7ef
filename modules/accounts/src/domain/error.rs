use db::DbError;
use thiserror::Error;

use crate::contract::id::{Id, IdError};

/// Domain-specific errors using thiserror
#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Client not found: {id}")]
    ClientNotFound { id: Id },

    #[error("User not found: {id}")]
    UserNotFound { id: Id },

    #[error("User not found: {email}")]
    UserEmailNotFound { email: String },

    #[error("Conflict: {message}")]
    Conflict {
        constraint: Option<String>,
        message: String,
    },

    #[error(transparent)]
    MalformedId(#[from] IdError),

    #[error("Validation failed: {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Storage unavailable: {message}")]
    Unavailable { message: String },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Transaction failed: {message}")]
    Transaction { message: String },

    #[error("Database error: {message}")]
    Database { message: String },
}

impl DomainError {
    pub fn client_not_found(id: Id) -> Self {
        Self::ClientNotFound { id }
    }

    pub fn user_not_found(id: Id) -> Self {
        Self::UserNotFound { id }
    }

    pub fn user_email_not_found(email: impl Into<String>) -> Self {
        Self::UserEmailNotFound {
            email: email.into(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
        }
    }

    /// Maps a storage failure that carries no entity context.
    /// A bare `NotFound` here means a lookup nobody anticipated and is reported
    /// as a database error; use [`StorageResultExt`] where absence is expected.
    pub fn storage(err: DbError) -> Self {
        match err {
            DbError::Conflict {
                constraint,
                message,
            } => Self::Conflict {
                constraint,
                message,
            },
            // user_clients.client_id is the only foreign key written by this module.
            DbError::ForeignKey { .. } => {
                Self::validation("client_ids", "references a client that does not exist")
            }
            DbError::Unavailable(e) => Self::Unavailable {
                message: e.to_string(),
            },
            DbError::Cancelled => Self::Cancelled,
            DbError::Transaction(e) => Self::Transaction {
                message: e.to_string(),
            },
            other => Self::database(other.to_string()),
        }
    }
}

impl From<DbError> for DomainError {
    fn from(err: DbError) -> Self {
        Self::storage(err)
    }
}

/// Turns `DbError::NotFound` into the entity-specific domain error.
pub trait StorageResultExt<T> {
    fn or_not_found(self, not_found: impl FnOnce() -> DomainError) -> Result<T, DomainError>;
}

impl<T> StorageResultExt<T> for db::Result<T> {
    fn or_not_found(self, not_found: impl FnOnce() -> DomainError) -> Result<T, DomainError> {
        self.map_err(|err| match err {
            DbError::NotFound => not_found(),
            other => DomainError::storage(other),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_entity_error() {
        let id = Id::new();
        let res: db::Result<()> = Err(DbError::NotFound);
        let err = res
            .or_not_found(|| DomainError::client_not_found(id))
            .unwrap_err();
        assert!(matches!(err, DomainError::ClientNotFound { id: got } if got == id));
    }

    #[test]
    fn foreign_key_violation_is_a_client_ids_validation_error() {
        let err = DomainError::from(DbError::ForeignKey {
            constraint: None,
            message: "FOREIGN KEY constraint failed".into(),
        });
        match err {
            DomainError::Validation { field, message } => {
                assert_eq!(field, "client_ids");
                assert!(!message.contains("FOREIGN KEY"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn storage_errors_keep_their_category() {
        let err = DomainError::from(DbError::Conflict {
            constraint: Some("clients_name_key".into()),
            message: "duplicate".into(),
        });
        assert!(matches!(err, DomainError::Conflict { .. }));
        assert!(matches!(
            DomainError::from(DbError::Cancelled),
            DomainError::Cancelled
        ));
        assert!(matches!(
            DomainError::from(DbError::NotFound),
            DomainError::Database { .. }
        ));
    }
}
