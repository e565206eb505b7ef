use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::contract::{
    client::AccountsApi,
    error::AccountsError,
    id::Id,
    model::{Client, ClientPatch, NewClient, NewUser, User, UserPatch},
};
use crate::domain::{error::DomainError, service::Service};

/// Local implementation of the AccountsApi trait that delegates to the domain service
pub struct AccountsLocalClient {
    service: Arc<Service>,
}

impl AccountsLocalClient {
    pub fn new(service: Arc<Service>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl AccountsApi for AccountsLocalClient {
    async fn get_client(&self, cancel: &CancellationToken, id: Id) -> anyhow::Result<Client> {
        self.service
            .get_client(cancel, id)
            .await
            .map_err(map_domain_error_to_anyhow)
    }

    async fn list_clients(
        &self,
        cancel: &CancellationToken,
        ids: Option<Vec<Id>>,
    ) -> anyhow::Result<Vec<Client>> {
        self.service
            .list_clients(cancel, ids.as_deref())
            .await
            .map_err(map_domain_error_to_anyhow)
    }

    async fn create_client(
        &self,
        cancel: &CancellationToken,
        new_client: NewClient,
    ) -> anyhow::Result<Client> {
        self.service
            .create_client(cancel, new_client)
            .await
            .map_err(map_domain_error_to_anyhow)
    }

    async fn update_client(
        &self,
        cancel: &CancellationToken,
        id: Id,
        patch: ClientPatch,
    ) -> anyhow::Result<Client> {
        self.service
            .update_client(cancel, id, patch)
            .await
            .map_err(map_domain_error_to_anyhow)
    }

    async fn delete_client(&self, cancel: &CancellationToken, id: Id) -> anyhow::Result<()> {
        self.service
            .delete_client(cancel, id)
            .await
            .map_err(map_domain_error_to_anyhow)
    }

    async fn get_user(&self, cancel: &CancellationToken, id: Id) -> anyhow::Result<User> {
        self.service
            .get_user(cancel, id)
            .await
            .map_err(map_domain_error_to_anyhow)
    }

    async fn get_user_by_email(
        &self,
        cancel: &CancellationToken,
        email: &str,
    ) -> anyhow::Result<User> {
        self.service
            .get_user_by_email(cancel, email)
            .await
            .map_err(map_domain_error_to_anyhow)
    }

    async fn list_users(
        &self,
        cancel: &CancellationToken,
        ids: Option<Vec<Id>>,
    ) -> anyhow::Result<Vec<User>> {
        self.service
            .list_users(cancel, ids.as_deref())
            .await
            .map_err(map_domain_error_to_anyhow)
    }

    async fn create_user(
        &self,
        cancel: &CancellationToken,
        new_user: NewUser,
    ) -> anyhow::Result<User> {
        self.service
            .create_user(cancel, new_user)
            .await
            .map_err(map_domain_error_to_anyhow)
    }

    async fn update_user(
        &self,
        cancel: &CancellationToken,
        id: Id,
        patch: UserPatch,
    ) -> anyhow::Result<User> {
        self.service
            .update_user(cancel, id, patch)
            .await
            .map_err(map_domain_error_to_anyhow)
    }
}

/// Map domain errors to contract errors wrapped in anyhow
fn map_domain_error_to_anyhow(domain_error: DomainError) -> anyhow::Error {
    anyhow::Error::new(AccountsError::from(domain_error))
}

impl From<DomainError> for AccountsError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::ClientNotFound { id } => AccountsError::client_not_found(id),
            DomainError::UserNotFound { id } => AccountsError::user_not_found(id.to_string()),
            DomainError::UserEmailNotFound { email } => AccountsError::user_not_found(email),
            DomainError::Conflict { message, .. } => AccountsError::conflict(message),
            DomainError::MalformedId(err) => AccountsError::validation(err.to_string()),
            DomainError::Validation { field, message } => {
                AccountsError::validation(format!("{field}: {message}"))
            }
            DomainError::Unavailable { .. } | DomainError::Cancelled => {
                AccountsError::unavailable()
            }
            DomainError::Transaction { .. } | DomainError::Database { .. } => {
                AccountsError::internal()
            }
        }
    }
}
