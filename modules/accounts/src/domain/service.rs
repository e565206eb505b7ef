use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::contract::id::Id;
use crate::contract::model::{Client, ClientPatch, NewClient, NewUser, User, UserPatch};
use crate::domain::bus::CommandBus;
use crate::domain::commands::{Command, CommandOutput};
use crate::domain::error::{DomainError, StorageResultExt};
use crate::domain::repo::{ClientsRepository, UsersRepository};

/// Domain service: reads go straight to the repositories, writes go through
/// the command bus.
pub struct Service {
    clients: Arc<dyn ClientsRepository>,
    users: Arc<dyn UsersRepository>,
    bus: Arc<CommandBus>,
}

impl Service {
    pub fn new(
        clients: Arc<dyn ClientsRepository>,
        users: Arc<dyn UsersRepository>,
        bus: Arc<CommandBus>,
    ) -> Self {
        Self {
            clients,
            users,
            bus,
        }
    }

    #[instrument(name = "accounts.service.get_client", skip(self, cancel), fields(client_id = %id))]
    pub async fn get_client(&self, cancel: &CancellationToken, id: Id) -> Result<Client, DomainError> {
        self.clients
            .get(cancel, id)
            .await
            .or_not_found(|| DomainError::client_not_found(id))
    }

    #[instrument(name = "accounts.service.list_clients", skip_all)]
    pub async fn list_clients(
        &self,
        cancel: &CancellationToken,
        ids: Option<&[Id]>,
    ) -> Result<Vec<Client>, DomainError> {
        let clients = match ids {
            Some(ids) => self.clients.list_by_ids(cancel, ids).await?,
            None => self.clients.list(cancel).await?,
        };
        debug!(count = clients.len(), "listed clients");
        Ok(clients)
    }

    #[instrument(name = "accounts.service.get_user", skip(self, cancel), fields(user_id = %id))]
    pub async fn get_user(&self, cancel: &CancellationToken, id: Id) -> Result<User, DomainError> {
        self.users
            .get(cancel, id)
            .await
            .or_not_found(|| DomainError::user_not_found(id))
    }

    #[instrument(name = "accounts.service.get_user_by_email", skip(self, cancel))]
    pub async fn get_user_by_email(
        &self,
        cancel: &CancellationToken,
        email: &str,
    ) -> Result<User, DomainError> {
        self.users
            .get_by_email(cancel, email)
            .await
            .or_not_found(|| DomainError::user_email_not_found(email))
    }

    #[instrument(name = "accounts.service.list_users", skip_all)]
    pub async fn list_users(
        &self,
        cancel: &CancellationToken,
        ids: Option<&[Id]>,
    ) -> Result<Vec<User>, DomainError> {
        let users = match ids {
            Some(ids) => self.users.list_by_ids(cancel, ids).await?,
            None => self.users.list(cancel).await?,
        };
        debug!(count = users.len(), "listed users");
        Ok(users)
    }

    pub async fn create_client(
        &self,
        cancel: &CancellationToken,
        new_client: NewClient,
    ) -> Result<Client, DomainError> {
        let out = self
            .bus
            .dispatch(cancel, Command::CreateClient(new_client))
            .await?;
        expect_client(out)
    }

    pub async fn update_client(
        &self,
        cancel: &CancellationToken,
        id: Id,
        patch: ClientPatch,
    ) -> Result<Client, DomainError> {
        let out = self
            .bus
            .dispatch(cancel, Command::UpdateClient { id, patch })
            .await?;
        expect_client(out)
    }

    pub async fn delete_client(&self, cancel: &CancellationToken, id: Id) -> Result<(), DomainError> {
        self.bus
            .dispatch(cancel, Command::DeleteClient { id })
            .await
            .map(|_| ())
    }

    pub async fn create_user(
        &self,
        cancel: &CancellationToken,
        new_user: NewUser,
    ) -> Result<User, DomainError> {
        let out = self
            .bus
            .dispatch(cancel, Command::CreateUser(new_user))
            .await?;
        expect_user(out)
    }

    pub async fn update_user(
        &self,
        cancel: &CancellationToken,
        id: Id,
        patch: UserPatch,
    ) -> Result<User, DomainError> {
        let out = self
            .bus
            .dispatch(cancel, Command::UpdateUser { id, patch })
            .await?;
        expect_user(out)
    }
}

fn expect_client(out: CommandOutput) -> Result<Client, DomainError> {
    match out {
        CommandOutput::Client(client) => Ok(client),
        other => Err(DomainError::database(format!(
            "handler returned {other:?} where a client was expected"
        ))),
    }
}

fn expect_user(out: CommandOutput) -> Result<User, DomainError> {
    match out {
        CommandOutput::User(user) => Ok(user),
        other => Err(DomainError::database(format!(
            "handler returned {other:?} where a user was expected"
        ))),
    }
}
