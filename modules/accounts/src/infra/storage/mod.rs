//! SQL repositories written against the neutral `?` placeholder.

pub mod clients_sql;
pub mod users_sql;

pub use clients_sql::ClientsSql;
pub use users_sql::UsersSql;
