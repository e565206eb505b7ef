use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::contract::id::Id;
use crate::contract::model::{Client, ClientPatch, NewClient, NewUser, User, UserPatch};

/// Public API trait for the accounts module that other modules can use
#[async_trait]
pub trait AccountsApi: Send + Sync {
    /// Get a client by ID
    async fn get_client(&self, cancel: &CancellationToken, id: Id) -> anyhow::Result<Client>;

    /// List clients, optionally restricted to `ids`
    async fn list_clients(
        &self,
        cancel: &CancellationToken,
        ids: Option<Vec<Id>>,
    ) -> anyhow::Result<Vec<Client>>;

    async fn create_client(
        &self,
        cancel: &CancellationToken,
        new_client: NewClient,
    ) -> anyhow::Result<Client>;

    async fn update_client(
        &self,
        cancel: &CancellationToken,
        id: Id,
        patch: ClientPatch,
    ) -> anyhow::Result<Client>;

    async fn delete_client(&self, cancel: &CancellationToken, id: Id) -> anyhow::Result<()>;

    /// Get a user by ID
    async fn get_user(&self, cancel: &CancellationToken, id: Id) -> anyhow::Result<User>;

    async fn get_user_by_email(
        &self,
        cancel: &CancellationToken,
        email: &str,
    ) -> anyhow::Result<User>;

    /// List users, optionally restricted to `ids`
    async fn list_users(
        &self,
        cancel: &CancellationToken,
        ids: Option<Vec<Id>>,
    ) -> anyhow::Result<Vec<User>>;

    async fn create_user(&self, cancel: &CancellationToken, new_user: NewUser)
        -> anyhow::Result<User>;

    async fn update_user(
        &self,
        cancel: &CancellationToken,
        id: Id,
        patch: UserPatch,
    ) -> anyhow::Result<User>;
}
