use axum::{
    routing::get,
    Extension, Json, Router,
};
use utoipa::OpenApi;

use crate::api::rest::handlers::{self, ApiState};
use crate::api::rest::openapi::AccountsApiDoc;

pub fn register_routes(router: Router, state: ApiState) -> Router {
    router
        .route(
            "/clients",
            get(handlers::list_clients).post(handlers::create_client),
        )
        .route(
            "/clients/{id}",
            get(handlers::get_client)
                .patch(handlers::update_client)
                .delete(handlers::delete_client),
        )
        .route(
            "/users",
            get(handlers::list_users).post(handlers::create_user),
        )
        .route(
            "/users/{id}",
            get(handlers::get_user).patch(handlers::update_user),
        )
        .route(
            "/openapi.json",
            get(|| async { Json(AccountsApiDoc::openapi()) }),
        )
        .layer(Extension(state))
}
