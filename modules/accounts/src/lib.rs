//! Clients, users and the association between them, stored through `db`
//! and exposed over REST and an in-process API.

pub mod api;
pub mod config;
pub mod contract;
pub mod domain;
pub mod gateways;
pub mod infra;
pub mod module;

pub use config::AccountsConfig;
pub use contract::{client::AccountsApi, error::AccountsError, id::Id};
pub use module::AccountsModule;

/// Schema DDL per engine; applied by deployment tooling and by tests.
pub mod schema {
    pub const POSTGRES: &str = include_str!("../schema/postgres.sql");
    pub const SQLITE: &str = include_str!("../schema/sqlite.sql");
}
