use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::contract::id::{Id, IdError};
use crate::contract::model::{Client, ClientPatch, NewClient, NewUser, User, UserPatch};

/// REST DTO for client representation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ClientDto {
    #[schema(value_type = String, format = Uuid)]
    pub id: Id,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// REST DTO for creating a new client
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateClientReq {
    pub name: String,
}

/// REST DTO for updating a client (partial); absent or null fields are left unchanged
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct UpdateClientReq {
    #[serde(default)]
    pub name: Option<String>,
}

/// REST DTO for user representation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UserDto {
    #[schema(value_type = String, format = Uuid)]
    pub id: Id,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub enabled: bool,
    #[schema(value_type = Vec<String>)]
    pub client_ids: Vec<Id>,
}

/// REST DTO for creating a new user
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateUserReq {
    pub email: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    #[schema(value_type = Vec<String>)]
    pub client_ids: Vec<Id>,
}

/// REST DTO for updating a user (partial)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Default)]
pub struct UpdateUserReq {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    #[schema(value_type = Option<Vec<String>>)]
    pub client_ids: Option<Vec<Id>>,
}

/// Query string shared by the list endpoints.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListQuery {
    /// Comma-separated ids to restrict the listing to.
    pub ids: Option<String>,
}

impl ListQuery {
    /// `None` when no filter was given; blank entries are skipped.
    pub fn parse_ids(&self) -> Result<Option<Vec<Id>>, IdError> {
        let Some(raw) = self.ids.as_deref() else {
            return Ok(None);
        };
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(Id::parse)
            .collect::<Result<Vec<_>, _>>()
            .map(Some)
    }
}

// Conversion implementations between REST DTOs and contract models

impl From<Client> for ClientDto {
    fn from(client: Client) -> Self {
        Self {
            id: client.id,
            name: client.name,
            created_at: client.created_at,
            updated_at: client.updated_at,
        }
    }
}

impl From<User> for UserDto {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            created_at: user.created_at,
            updated_at: user.updated_at,
            enabled: user.enabled,
            client_ids: user.client_ids,
        }
    }
}

impl From<CreateClientReq> for NewClient {
    fn from(req: CreateClientReq) -> Self {
        Self { name: req.name }
    }
}

impl From<UpdateClientReq> for ClientPatch {
    fn from(req: UpdateClientReq) -> Self {
        Self {
            name: req.name.into(),
        }
    }
}

impl From<CreateUserReq> for NewUser {
    fn from(req: CreateUserReq) -> Self {
        Self {
            email: req.email,
            enabled: req.enabled,
            client_ids: req.client_ids,
        }
    }
}

impl From<UpdateUserReq> for UserPatch {
    fn from(req: UpdateUserReq) -> Self {
        Self {
            email: req.email.into(),
            enabled: req.enabled.into(),
            client_ids: req.client_ids.into(),
        }
    }
}
