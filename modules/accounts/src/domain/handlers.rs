//! Command handlers for clients and users.

use std::sync::Arc;

use async_trait::async_trait;
use db::time::now_utc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::contract::id::Id;
use crate::contract::model::{Client, ClientPatch, NewClient, NewUser, User, UserPatch};
use crate::domain::commands::{Command, CommandKind, CommandOutput};
use crate::domain::error::{DomainError, StorageResultExt};
use crate::domain::repo::{ClientsRepository, UsersRepository};

/// A handler owns one or more command kinds.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    fn kinds(&self) -> &'static [CommandKind];

    async fn handle(
        &self,
        cancel: &CancellationToken,
        command: Command,
    ) -> Result<CommandOutput, DomainError>;
}

/// Input limits enforced before anything is written.
#[derive(Debug, Clone)]
pub struct Limits {
    pub max_name_len: usize,
    pub max_email_len: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_name_len: 100,
            max_email_len: 254,
        }
    }
}

impl Limits {
    fn check_name(&self, name: &str) -> Result<(), DomainError> {
        if name.trim().is_empty() {
            return Err(DomainError::validation("name", "must not be blank"));
        }
        let len = name.chars().count();
        if len > self.max_name_len {
            return Err(DomainError::validation(
                "name",
                format!("too long: {len} characters (max: {})", self.max_name_len),
            ));
        }
        Ok(())
    }

    fn check_email(&self, email: &str) -> Result<(), DomainError> {
        let Some((local, domain)) = email.split_once('@') else {
            return Err(DomainError::validation("email", "must contain '@'"));
        };
        if local.is_empty() || domain.is_empty() || email.chars().any(char::is_whitespace) {
            return Err(DomainError::validation("email", "is not a valid address"));
        }
        let len = email.chars().count();
        if len > self.max_email_len {
            return Err(DomainError::validation(
                "email",
                format!("too long: {len} characters (max: {})", self.max_email_len),
            ));
        }
        Ok(())
    }
}

/// Sorts and removes duplicates so the stored set matches what is returned.
fn normalize_client_ids(ids: &mut Vec<Id>) {
    ids.sort_unstable();
    ids.dedup();
}

pub struct ClientCommands {
    clients: Arc<dyn ClientsRepository>,
    limits: Limits,
}

impl ClientCommands {
    pub fn new(clients: Arc<dyn ClientsRepository>, limits: Limits) -> Self {
        Self { clients, limits }
    }

    async fn create(
        &self,
        cancel: &CancellationToken,
        new_client: NewClient,
    ) -> Result<Client, DomainError> {
        self.limits.check_name(&new_client.name)?;

        let now = now_utc();
        let client = Client {
            id: Id::new(),
            name: new_client.name,
            created_at: now,
            updated_at: now,
        };
        self.clients.add(cancel, &client).await?;
        debug!(id = %client.id, "client created");
        Ok(client)
    }

    async fn update(
        &self,
        cancel: &CancellationToken,
        id: Id,
        patch: ClientPatch,
    ) -> Result<Client, DomainError> {
        if let Some(name) = patch.name.as_set() {
            self.limits.check_name(name)?;
        }

        let mut client = self
            .clients
            .get(cancel, id)
            .await
            .or_not_found(|| DomainError::client_not_found(id))?;

        patch.name.apply(&mut client.name);
        client.updated_at = now_utc();

        self.clients
            .set(cancel, &client)
            .await
            .or_not_found(|| DomainError::client_not_found(id))?;
        Ok(client)
    }

    async fn delete(&self, cancel: &CancellationToken, id: Id) -> Result<(), DomainError> {
        self.clients
            .get(cancel, id)
            .await
            .or_not_found(|| DomainError::client_not_found(id))?;
        self.clients
            .remove(cancel, id)
            .await
            .or_not_found(|| DomainError::client_not_found(id))
    }
}

#[async_trait]
impl CommandHandler for ClientCommands {
    fn kinds(&self) -> &'static [CommandKind] {
        &[
            CommandKind::CreateClient,
            CommandKind::UpdateClient,
            CommandKind::DeleteClient,
        ]
    }

    async fn handle(
        &self,
        cancel: &CancellationToken,
        command: Command,
    ) -> Result<CommandOutput, DomainError> {
        match command {
            Command::CreateClient(new_client) => {
                self.create(cancel, new_client).await.map(CommandOutput::Client)
            }
            Command::UpdateClient { id, patch } => {
                self.update(cancel, id, patch).await.map(CommandOutput::Client)
            }
            Command::DeleteClient { id } => {
                self.delete(cancel, id).await.map(|()| CommandOutput::None)
            }
            other => unreachable!("client handler received {}", other.kind()),
        }
    }
}

pub struct UserCommands {
    users: Arc<dyn UsersRepository>,
    clients: Arc<dyn ClientsRepository>,
    limits: Limits,
}

impl UserCommands {
    pub fn new(
        users: Arc<dyn UsersRepository>,
        clients: Arc<dyn ClientsRepository>,
        limits: Limits,
    ) -> Self {
        Self {
            users,
            clients,
            limits,
        }
    }

    /// Every referenced client must exist.
    async fn check_client_ids(
        &self,
        cancel: &CancellationToken,
        ids: &[Id],
    ) -> Result<(), DomainError> {
        if ids.is_empty() {
            return Ok(());
        }
        let found = self.clients.list_by_ids(cancel, ids).await?;
        if let Some(missing) = ids.iter().find(|id| !found.iter().any(|c| c.id == **id)) {
            return Err(DomainError::validation(
                "client_ids",
                format!("unknown client {missing}"),
            ));
        }
        Ok(())
    }

    async fn create(
        &self,
        cancel: &CancellationToken,
        new_user: NewUser,
    ) -> Result<User, DomainError> {
        self.limits.check_email(&new_user.email)?;

        let mut client_ids = new_user.client_ids;
        normalize_client_ids(&mut client_ids);
        self.check_client_ids(cancel, &client_ids).await?;

        let now = now_utc();
        let user = User {
            id: Id::new(),
            email: new_user.email,
            created_at: now,
            updated_at: now,
            enabled: new_user.enabled,
            client_ids,
        };
        self.users.add(cancel, &user).await?;
        debug!(id = %user.id, clients = user.client_ids.len(), "user created");
        Ok(user)
    }

    async fn update(
        &self,
        cancel: &CancellationToken,
        id: Id,
        patch: UserPatch,
    ) -> Result<User, DomainError> {
        if let Some(email) = patch.email.as_set() {
            self.limits.check_email(email)?;
        }
        let client_ids = patch.client_ids.map(|mut ids| {
            normalize_client_ids(&mut ids);
            ids
        });
        if let Some(ids) = client_ids.as_set() {
            self.check_client_ids(cancel, ids).await?;
        }

        let mut user = self
            .users
            .get(cancel, id)
            .await
            .or_not_found(|| DomainError::user_not_found(id))?;

        patch.email.apply(&mut user.email);
        patch.enabled.apply(&mut user.enabled);
        client_ids.apply(&mut user.client_ids);
        user.updated_at = now_utc();

        self.users
            .set(cancel, &user)
            .await
            .or_not_found(|| DomainError::user_not_found(id))?;
        Ok(user)
    }
}

#[async_trait]
impl CommandHandler for UserCommands {
    fn kinds(&self) -> &'static [CommandKind] {
        &[CommandKind::CreateUser, CommandKind::UpdateUser]
    }

    async fn handle(
        &self,
        cancel: &CancellationToken,
        command: Command,
    ) -> Result<CommandOutput, DomainError> {
        match command {
            Command::CreateUser(new_user) => {
                self.create(cancel, new_user).await.map(CommandOutput::User)
            }
            Command::UpdateUser { id, patch } => {
                self.update(cancel, id, patch).await.map(CommandOutput::User)
            }
            other => unreachable!("user handler received {}", other.kind()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_must_be_present_and_bounded() {
        let limits = Limits {
            max_name_len: 5,
            ..Default::default()
        };
        assert!(limits.check_name("Acme").is_ok());
        assert!(matches!(
            limits.check_name("   "),
            Err(DomainError::Validation { .. })
        ));
        assert!(limits.check_name("Acme Corp").is_err());
    }

    #[test]
    fn emails_need_an_at_sign() {
        let limits = Limits::default();
        assert!(limits.check_email("ann@example.com").is_ok());
        assert!(limits.check_email("ann.example.com").is_err());
        assert!(limits.check_email("@example.com").is_err());
        assert!(limits.check_email("ann @example.com").is_err());
    }

    #[test]
    fn both_limits_count_characters() {
        let limits = Limits {
            max_name_len: 4,
            max_email_len: 10,
        };
        // Multi-byte text within the limit in characters but over it in bytes.
        assert!(limits.check_name("Zoë!").is_ok());
        assert!(limits.check_email("zoë@zoë.io").is_ok());
        assert!(limits.check_email("zoë@zoë.com").is_err());
    }

    #[test]
    fn client_ids_are_sorted_and_deduplicated() {
        let (a, b) = (Id::new(), Id::new());
        let mut ids = vec![b, a, b, a];
        normalize_client_ids(&mut ids);
        let mut expected = vec![a, b];
        expected.sort();
        assert_eq!(ids, expected);
    }
}
