use std::sync::Arc;

use axum::Router;
use db::DbHandle;
use tokio_util::sync::CancellationToken;

use crate::api::rest::handlers::ApiState;
use crate::api::rest::routes::register_routes;
use crate::config::AccountsConfig;
use crate::contract::client::AccountsApi;
use crate::domain::bus::CommandBus;
use crate::domain::handlers::{ClientCommands, Limits, UserCommands};
use crate::domain::repo::{ClientsRepository, UsersRepository};
use crate::domain::service::Service;
use crate::gateways::local::AccountsLocalClient;
use crate::infra::storage::{ClientsSql, UsersSql};

fn command_bus(
    clients: &Arc<dyn ClientsRepository>,
    users: &Arc<dyn UsersRepository>,
    limits: Limits,
) -> CommandBus {
    CommandBus::builder()
        .register(Arc::new(ClientCommands::new(clients.clone(), limits.clone())))
        .register(Arc::new(UserCommands::new(
            users.clone(),
            clients.clone(),
            limits,
        )))
        .build()
}

/// The wired accounts module: SQL repositories, command bus and service.
pub struct AccountsModule {
    service: Arc<Service>,
}

impl AccountsModule {
    pub fn new(db: Arc<DbHandle>, config: &AccountsConfig) -> Self {
        let engine = db.engine();
        let clients: Arc<dyn ClientsRepository> = Arc::new(ClientsSql::new(db.clone()));
        let users: Arc<dyn UsersRepository> = Arc::new(UsersSql::new(db));

        let bus = command_bus(&clients, &users, config.limits());

        tracing::info!(?engine, max_name_len = config.max_name_len, "accounts module initialized");
        Self {
            service: Arc::new(Service::new(clients, users, Arc::new(bus))),
        }
    }

    pub fn service(&self) -> Arc<Service> {
        self.service.clone()
    }

    /// In-process client for other modules.
    pub fn local_client(&self) -> Arc<dyn AccountsApi> {
        Arc::new(AccountsLocalClient::new(self.service.clone()))
    }

    /// REST routes; requests in flight are cancelled once `shutdown` fires.
    pub fn router(&self, shutdown: CancellationToken) -> Router {
        register_routes(
            Router::new(),
            ApiState {
                service: self.service.clone(),
                shutdown,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::commands::CommandKind;
    use db::ConnectOpts;

    #[tokio::test]
    async fn every_command_kind_has_a_handler() {
        let db = Arc::new(
            DbHandle::connect("sqlite::memory:", ConnectOpts::default())
                .await
                .unwrap(),
        );
        let clients: Arc<dyn ClientsRepository> = Arc::new(ClientsSql::new(db.clone()));
        let users: Arc<dyn UsersRepository> = Arc::new(UsersSql::new(db));

        let bus = command_bus(&clients, &users, AccountsConfig::default().limits());
        for kind in CommandKind::ALL {
            assert!(bus.handles(kind), "{kind} is not registered");
        }
    }
}
