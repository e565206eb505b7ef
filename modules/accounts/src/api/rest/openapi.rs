use modkit::api::problem::{Problem, ValidationError};
use utoipa::OpenApi;

use crate::api::rest::{dto, handlers};

#[derive(OpenApi)]
#[openapi(
    info(title = "Accounts API", description = "Clients and the users that belong to them"),
    paths(
        handlers::list_clients,
        handlers::get_client,
        handlers::create_client,
        handlers::update_client,
        handlers::delete_client,
        handlers::list_users,
        handlers::get_user,
        handlers::create_user,
        handlers::update_user,
    ),
    components(schemas(
        dto::ClientDto,
        dto::CreateClientReq,
        dto::UpdateClientReq,
        dto::UserDto,
        dto::CreateUserReq,
        dto::UpdateUserReq,
        Problem,
        ValidationError,
    )),
    tags(
        (name = "clients", description = "Client management"),
        (name = "users", description = "User management"),
    )
)]
pub struct AccountsApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route() {
        let doc = AccountsApiDoc::openapi();
        let paths: Vec<&str> = doc.paths.paths.keys().map(String::as_str).collect();
        assert_eq!(
            paths,
            vec!["/clients", "/clients/{id}", "/users", "/users/{id}"]
        );
        let clients = &doc.paths.paths["/clients/{id}"];
        assert!(clients.get.is_some() && clients.patch.is_some() && clients.delete.is_some());
        assert!(doc.paths.paths["/users/{id}"].delete.is_none());
    }
}
