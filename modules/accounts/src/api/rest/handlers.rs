use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, OriginalUri, Path, Query},
    http::StatusCode,
    response::Json,
    Extension,
};
use modkit::api::problem::{Problem, ProblemResponse};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::api::rest::dto::{
    ClientDto, CreateClientReq, CreateUserReq, ListQuery, UpdateClientReq, UpdateUserReq, UserDto,
};
use crate::api::rest::error::{bad_body, map_domain_error};
use crate::contract::id::Id;
use crate::domain::error::DomainError;
use crate::domain::service::Service;

/// Shared by every handler through an `Extension` layer.
#[derive(Clone)]
pub struct ApiState {
    pub service: Arc<Service>,
    /// Parent of the per-request tokens; cancelled on shutdown.
    pub shutdown: CancellationToken,
}

impl ApiState {
    /// Token for one request. Dropping the handler future (timeout, client gone)
    /// drops the guard and cancels in-flight storage work.
    fn request_token(&self) -> (CancellationToken, tokio_util::sync::DropGuard) {
        let token = self.shutdown.child_token();
        let guard = token.clone().drop_guard();
        (token, guard)
    }
}

type ApiResult<T> = Result<T, ProblemResponse>;

fn parse_id(raw: &str, instance: &str) -> ApiResult<Id> {
    Id::parse(raw).map_err(|e| map_domain_error(&DomainError::from(e), instance))
}

fn parse_list_ids(query: &ListQuery, instance: &str) -> ApiResult<Option<Vec<Id>>> {
    query
        .parse_ids()
        .map_err(|e| map_domain_error(&DomainError::from(e), instance))
}

fn body<T>(payload: Result<Json<T>, JsonRejection>, instance: &str) -> ApiResult<T> {
    match payload {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => Err(bad_body(rejection.body_text(), instance)),
    }
}

fn fail(e: DomainError, instance: &str) -> ProblemResponse {
    match &e {
        DomainError::Transaction { .. } | DomainError::Database { .. } => {}
        _ => info!(error = %e, path = instance, "request failed"),
    }
    map_domain_error(&e, instance)
}

/// List clients, optionally restricted to a set of ids
#[utoipa::path(
    get,
    path = "/clients",
    tag = "clients",
    params(ListQuery),
    responses(
        (status = 200, description = "Clients ordered by name", body = [ClientDto]),
        (status = 400, description = "Malformed id in filter", body = Problem),
        (status = 503, description = "Storage unavailable", body = Problem),
    )
)]
pub async fn list_clients(
    Extension(state): Extension<ApiState>,
    OriginalUri(uri): OriginalUri,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<ClientDto>>> {
    let path = uri.path();
    let ids = parse_list_ids(&query, path)?;
    let (cancel, _guard) = state.request_token();

    let clients = state
        .service
        .list_clients(&cancel, ids.as_deref())
        .await
        .map_err(|e| fail(e, path))?;
    Ok(Json(clients.into_iter().map(ClientDto::from).collect()))
}

/// Get a specific client by ID
#[utoipa::path(
    get,
    path = "/clients/{id}",
    tag = "clients",
    params(("id" = String, Path, description = "Client id (v4 UUID)")),
    responses(
        (status = 200, description = "Client found", body = ClientDto),
        (status = 400, description = "Malformed id", body = Problem),
        (status = 404, description = "Client not found", body = Problem),
    )
)]
pub async fn get_client(
    Extension(state): Extension<ApiState>,
    OriginalUri(uri): OriginalUri,
    Path(id): Path<String>,
) -> ApiResult<Json<ClientDto>> {
    let path = uri.path();
    let id = parse_id(&id, path)?;
    let (cancel, _guard) = state.request_token();

    let client = state
        .service
        .get_client(&cancel, id)
        .await
        .map_err(|e| fail(e, path))?;
    Ok(Json(client.into()))
}

/// Create a new client
#[utoipa::path(
    post,
    path = "/clients",
    tag = "clients",
    request_body = CreateClientReq,
    responses(
        (status = 201, description = "Created client", body = ClientDto),
        (status = 400, description = "Invalid input", body = Problem),
        (status = 409, description = "Name already taken", body = Problem),
    )
)]
pub async fn create_client(
    Extension(state): Extension<ApiState>,
    OriginalUri(uri): OriginalUri,
    payload: Result<Json<CreateClientReq>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ClientDto>)> {
    let path = uri.path();
    let req = body(payload, path)?;
    let (cancel, _guard) = state.request_token();

    let client = state
        .service
        .create_client(&cancel, req.into())
        .await
        .map_err(|e| fail(e, path))?;
    info!(client_id = %client.id, "client created");
    Ok((StatusCode::CREATED, Json(client.into())))
}

/// Update a client with partial data
#[utoipa::path(
    patch,
    path = "/clients/{id}",
    tag = "clients",
    params(("id" = String, Path, description = "Client id (v4 UUID)")),
    request_body = UpdateClientReq,
    responses(
        (status = 200, description = "Updated client", body = ClientDto),
        (status = 400, description = "Invalid input", body = Problem),
        (status = 404, description = "Client not found", body = Problem),
        (status = 409, description = "Name already taken", body = Problem),
    )
)]
pub async fn update_client(
    Extension(state): Extension<ApiState>,
    OriginalUri(uri): OriginalUri,
    Path(id): Path<String>,
    payload: Result<Json<UpdateClientReq>, JsonRejection>,
) -> ApiResult<Json<ClientDto>> {
    let path = uri.path();
    let id = parse_id(&id, path)?;
    let req = body(payload, path)?;
    let (cancel, _guard) = state.request_token();

    let client = state
        .service
        .update_client(&cancel, id, req.into())
        .await
        .map_err(|e| fail(e, path))?;
    Ok(Json(client.into()))
}

/// Delete a client by ID
#[utoipa::path(
    delete,
    path = "/clients/{id}",
    tag = "clients",
    params(("id" = String, Path, description = "Client id (v4 UUID)")),
    responses(
        (status = 204, description = "Client deleted"),
        (status = 400, description = "Malformed id", body = Problem),
        (status = 404, description = "Client not found", body = Problem),
    )
)]
pub async fn delete_client(
    Extension(state): Extension<ApiState>,
    OriginalUri(uri): OriginalUri,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let path = uri.path();
    let id = parse_id(&id, path)?;
    let (cancel, _guard) = state.request_token();

    state
        .service
        .delete_client(&cancel, id)
        .await
        .map_err(|e| fail(e, path))?;
    info!(client_id = %id, "client deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// List users, optionally restricted to a set of ids
#[utoipa::path(
    get,
    path = "/users",
    tag = "users",
    params(ListQuery),
    responses(
        (status = 200, description = "Users ordered by email", body = [UserDto]),
        (status = 400, description = "Malformed id in filter", body = Problem),
        (status = 503, description = "Storage unavailable", body = Problem),
    )
)]
pub async fn list_users(
    Extension(state): Extension<ApiState>,
    OriginalUri(uri): OriginalUri,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<UserDto>>> {
    let path = uri.path();
    let ids = parse_list_ids(&query, path)?;
    let (cancel, _guard) = state.request_token();

    let users = state
        .service
        .list_users(&cancel, ids.as_deref())
        .await
        .map_err(|e| fail(e, path))?;
    Ok(Json(users.into_iter().map(UserDto::from).collect()))
}

/// Get a specific user by ID
#[utoipa::path(
    get,
    path = "/users/{id}",
    tag = "users",
    params(("id" = String, Path, description = "User id (v4 UUID)")),
    responses(
        (status = 200, description = "User found", body = UserDto),
        (status = 400, description = "Malformed id", body = Problem),
        (status = 404, description = "User not found", body = Problem),
    )
)]
pub async fn get_user(
    Extension(state): Extension<ApiState>,
    OriginalUri(uri): OriginalUri,
    Path(id): Path<String>,
) -> ApiResult<Json<UserDto>> {
    let path = uri.path();
    let id = parse_id(&id, path)?;
    let (cancel, _guard) = state.request_token();

    let user = state
        .service
        .get_user(&cancel, id)
        .await
        .map_err(|e| fail(e, path))?;
    Ok(Json(user.into()))
}

/// Create a new user
#[utoipa::path(
    post,
    path = "/users",
    tag = "users",
    request_body = CreateUserReq,
    responses(
        (status = 201, description = "Created user", body = UserDto),
        (status = 400, description = "Invalid input or unknown client id", body = Problem),
        (status = 409, description = "Email already taken", body = Problem),
    )
)]
pub async fn create_user(
    Extension(state): Extension<ApiState>,
    OriginalUri(uri): OriginalUri,
    payload: Result<Json<CreateUserReq>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<UserDto>)> {
    let path = uri.path();
    let req = body(payload, path)?;
    let (cancel, _guard) = state.request_token();

    let user = state
        .service
        .create_user(&cancel, req.into())
        .await
        .map_err(|e| fail(e, path))?;
    info!(user_id = %user.id, "user created");
    Ok((StatusCode::CREATED, Json(user.into())))
}

/// Update a user with partial data
#[utoipa::path(
    patch,
    path = "/users/{id}",
    tag = "users",
    params(("id" = String, Path, description = "User id (v4 UUID)")),
    request_body = UpdateUserReq,
    responses(
        (status = 200, description = "Updated user", body = UserDto),
        (status = 400, description = "Invalid input or unknown client id", body = Problem),
        (status = 404, description = "User not found", body = Problem),
        (status = 409, description = "Email already taken", body = Problem),
    )
)]
pub async fn update_user(
    Extension(state): Extension<ApiState>,
    OriginalUri(uri): OriginalUri,
    Path(id): Path<String>,
    payload: Result<Json<UpdateUserReq>, JsonRejection>,
) -> ApiResult<Json<UserDto>> {
    let path = uri.path();
    let id = parse_id(&id, path)?;
    let req = body(payload, path)?;
    let (cancel, _guard) = state.request_token();

    let user = state
        .service
        .update_user(&cancel, id, req.into())
        .await
        .map_err(|e| fail(e, path))?;
    Ok(Json(user.into()))
}
