use crate::contract::id::Id;
use crate::contract::model::{Client, ClientPatch, NewClient, NewUser, User, UserPatch};

/// Instruction handed to the [`CommandBus`](crate::domain::bus::CommandBus).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    CreateClient(NewClient),
    UpdateClient { id: Id, patch: ClientPatch },
    DeleteClient { id: Id },
    CreateUser(NewUser),
    UpdateUser { id: Id, patch: UserPatch },
}

/// Stable key handlers register under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    CreateClient,
    UpdateClient,
    DeleteClient,
    CreateUser,
    UpdateUser,
}

impl CommandKind {
    pub const ALL: [CommandKind; 5] = [
        CommandKind::CreateClient,
        CommandKind::UpdateClient,
        CommandKind::DeleteClient,
        CommandKind::CreateUser,
        CommandKind::UpdateUser,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CommandKind::CreateClient => "create_client",
            CommandKind::UpdateClient => "update_client",
            CommandKind::DeleteClient => "delete_client",
            CommandKind::CreateUser => "create_user",
            CommandKind::UpdateUser => "update_user",
        }
    }
}

impl std::fmt::Display for CommandKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Command {
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::CreateClient(_) => CommandKind::CreateClient,
            Command::UpdateClient { .. } => CommandKind::UpdateClient,
            Command::DeleteClient { .. } => CommandKind::DeleteClient,
            Command::CreateUser(_) => CommandKind::CreateUser,
            Command::UpdateUser { .. } => CommandKind::UpdateUser,
        }
    }
}

/// What a handler hands back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutput {
    Client(Client),
    User(User),
    None,
}
