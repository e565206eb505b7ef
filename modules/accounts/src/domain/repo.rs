//! Storage ports used by the command handlers and the service.
//!
//! Implementations report a missing row as `DbError::NotFound`; callers
//! translate it into the entity-specific domain error.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::contract::id::Id;
use crate::contract::model::{Client, User};

#[async_trait]
pub trait ClientsRepository: Send + Sync {
    async fn get(&self, cancel: &CancellationToken, id: Id) -> db::Result<Client>;

    /// All clients ordered by name.
    async fn list(&self, cancel: &CancellationToken) -> db::Result<Vec<Client>>;

    /// Clients whose id is in `ids`, ordered by name. Empty input issues no query.
    async fn list_by_ids(&self, cancel: &CancellationToken, ids: &[Id]) -> db::Result<Vec<Client>>;

    async fn add(&self, cancel: &CancellationToken, client: &Client) -> db::Result<()>;

    /// Overwrites the stored row; `NotFound` when no row has that id.
    async fn set(&self, cancel: &CancellationToken, client: &Client) -> db::Result<()>;

    async fn remove(&self, cancel: &CancellationToken, id: Id) -> db::Result<()>;
}

/// User storage. Every read fills `client_ids`; every write replaces the
/// user's association rows in the same transaction as the user row.
#[async_trait]
pub trait UsersRepository: Send + Sync {
    async fn get(&self, cancel: &CancellationToken, id: Id) -> db::Result<User>;

    async fn get_by_email(&self, cancel: &CancellationToken, email: &str) -> db::Result<User>;

    /// All users ordered by email.
    async fn list(&self, cancel: &CancellationToken) -> db::Result<Vec<User>>;

    async fn list_by_ids(&self, cancel: &CancellationToken, ids: &[Id]) -> db::Result<Vec<User>>;

    async fn add(&self, cancel: &CancellationToken, user: &User) -> db::Result<()>;

    async fn set(&self, cancel: &CancellationToken, user: &User) -> db::Result<()>;
}
