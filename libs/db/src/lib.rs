//! Database abstraction crate providing a database-agnostic `DbHandle`.
//!
//! This crate provides a unified interface for working with different databases
//! (SQLite, PostgreSQL, MySQL) through SQLx. Statements are written once with `?`
//! bind markers and rewritten per engine by [`dialect`] before they run.
//!
//! # Features
//! - `pg`, `mysql`, `sqlite`: enable SQLx backends (at least one is required)
//!
//! # Example
//! ```rust,no_run
//! #[tokio::main]
//! async fn main() -> db::Result<()> {
//!     use db::{ColumnKind, ConnectOpts, DbHandle, SqlValue};
//!     use tokio_util::sync::CancellationToken;
//!
//!     let db = DbHandle::connect("sqlite://data/app.db?mode=rwc", ConnectOpts::default()).await?;
//!     let cancel = CancellationToken::new();
//!
//!     let rows = db
//!         .query(&cancel, "SELECT name FROM clients WHERE name = ?", &["acme".into()], &[ColumnKind::Text])
//!         .await?;
//!     for row in rows {
//!         println!("{}", row.text(0)?);
//!     }
//!
//!     db.with_tx(&cancel, |tx| {
//!         Box::pin(async move {
//!             tx.execute("DELETE FROM clients WHERE name = ?", &[SqlValue::from("acme")])
//!                 .await?;
//!             Ok(())
//!         })
//!     })
//!     .await?;
//!
//!     db.close().await;
//!     Ok(())
//! }
//! ```

#[cfg(not(any(feature = "pg", feature = "mysql", feature = "sqlite")))]
compile_error!("enable at least one database backend feature: `pg`, `mysql` or `sqlite`");

pub mod dialect;
pub mod errors;
pub mod time;
pub mod value;

use std::future::Future;
use std::time::Duration;

use futures::future::BoxFuture;
#[cfg(feature = "mysql")]
use sqlx::{mysql::MySqlPoolOptions, MySql, MySqlPool};
#[cfg(feature = "pg")]
use sqlx::{postgres::PgPoolOptions, PgPool, Postgres};
#[cfg(feature = "sqlite")]
use sqlx::{sqlite::SqlitePoolOptions, Sqlite, SqlitePool};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

pub use dialect::{Dialect, PostgresDialect, QuestionMarkDialect};
pub use value::{ColumnKind, Record, Rows, SqlValue};

use value::{bind_values, decode_row};

/// Library-local result type.
pub type Result<T> = std::result::Result<T, DbError>;

/// Typed error for the DB handle and helpers.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("Unknown DSN: {0}")]
    UnknownDsn(String),

    #[error("Feature not enabled: {0}")]
    FeatureDisabled(&'static str),

    #[error("no rows returned")]
    NotFound,

    #[error("unique constraint violated: {message}")]
    Conflict {
        constraint: Option<String>,
        message: String,
    },

    #[error("foreign key constraint violated: {message}")]
    ForeignKey {
        constraint: Option<String>,
        message: String,
    },

    #[error("database unavailable: {0}")]
    Unavailable(#[source] sqlx::Error),

    #[error("transaction failed: {0}")]
    Transaction(#[source] sqlx::Error),

    #[error("operation cancelled")]
    Cancelled,

    #[error("column {index} is not a {expected}")]
    Decode { index: usize, expected: ColumnKind },

    #[error(transparent)]
    Sqlx(sqlx::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Supported engines.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DbEngine {
    Postgres,
    MySql,
    Sqlite,
}

impl DbEngine {
    /// Placeholder strategy for this engine.
    pub fn dialect(self) -> &'static dyn Dialect {
        match self {
            DbEngine::Postgres => &PostgresDialect,
            DbEngine::MySql | DbEngine::Sqlite => &QuestionMarkDialect,
        }
    }
}

/// Connection options.
/// Extended to cover common sqlx pool knobs; each driver applies the subset it supports.
#[derive(Clone, Debug)]
pub struct ConnectOpts {
    /// Maximum number of connections in the pool.
    pub max_conns: Option<u32>,
    /// Minimum number of connections in the pool.
    pub min_conns: Option<u32>,
    /// Timeout to acquire a connection from the pool.
    pub acquire_timeout: Option<Duration>,
    /// Idle timeout before a connection is closed.
    pub idle_timeout: Option<Duration>,
    /// Maximum lifetime for a connection.
    pub max_lifetime: Option<Duration>,
    /// Test connection health before acquire.
    pub test_before_acquire: bool,

    /// SQLite-specific: busy timeout used via PRAGMA busy_timeout.
    pub sqlite_busy_timeout: Option<Duration>,
    /// For SQLite file DSNs, create parent directories if missing.
    pub create_sqlite_dirs: bool,
}

impl Default for ConnectOpts {
    fn default() -> Self {
        Self {
            max_conns: Some(10),
            min_conns: None,
            acquire_timeout: Some(Duration::from_secs(30)),
            idle_timeout: None,
            max_lifetime: None,
            test_before_acquire: false,

            sqlite_busy_timeout: Some(Duration::from_millis(5_000)),
            create_sqlite_dirs: true,
        }
    }
}

/// One concrete sqlx pool.
#[derive(Clone, Debug)]
pub enum DbPool {
    #[cfg(feature = "pg")]
    Postgres(PgPool),
    #[cfg(feature = "mysql")]
    MySql(MySqlPool),
    #[cfg(feature = "sqlite")]
    Sqlite(SqlitePool),
}

/// An open transaction on one of the enabled engines.
pub enum DbTransaction {
    #[cfg(feature = "pg")]
    Postgres(sqlx::Transaction<'static, Postgres>),
    #[cfg(feature = "mysql")]
    MySql(sqlx::Transaction<'static, MySql>),
    #[cfg(feature = "sqlite")]
    Sqlite(sqlx::Transaction<'static, Sqlite>),
}

// Expands `$body` once per enabled engine with `$p` bound to the concrete pool.
macro_rules! on_pool {
    ($pool:expr, |$p:ident| $body:expr) => {
        match $pool {
            #[cfg(feature = "pg")]
            DbPool::Postgres($p) => $body,
            #[cfg(feature = "mysql")]
            DbPool::MySql($p) => $body,
            #[cfg(feature = "sqlite")]
            DbPool::Sqlite($p) => $body,
        }
    };
}

macro_rules! apply_pool_opts {
    ($o:expr, $opts:expr) => {{
        let opts: &ConnectOpts = $opts;
        let mut o = $o;
        if let Some(n) = opts.max_conns {
            o = o.max_connections(n);
        }
        if let Some(n) = opts.min_conns {
            o = o.min_connections(n);
        }
        if let Some(t) = opts.acquire_timeout {
            o = o.acquire_timeout(t);
        }
        if let Some(t) = opts.idle_timeout {
            o = o.idle_timeout(t);
        }
        if let Some(t) = opts.max_lifetime {
            o = o.max_lifetime(t);
        }
        if opts.test_before_acquire {
            o = o.test_before_acquire(true);
        }
        o
    }};
}

// Expands `$body` once per engine with `$c` bound to the transaction's `&mut Connection`.
macro_rules! on_tx {
    ($tx:expr, |$c:ident| $body:expr) => {
        match $tx {
            #[cfg(feature = "pg")]
            DbTransaction::Postgres(tx) => {
                let $c = &mut **tx;
                $body
            }
            #[cfg(feature = "mysql")]
            DbTransaction::MySql(tx) => {
                let $c = &mut **tx;
                $body
            }
            #[cfg(feature = "sqlite")]
            DbTransaction::Sqlite(tx) => {
                let $c = &mut **tx;
                $body
            }
        }
    };
}

impl DbTransaction {
    pub fn engine(&self) -> DbEngine {
        match self {
            #[cfg(feature = "pg")]
            DbTransaction::Postgres(_) => DbEngine::Postgres,
            #[cfg(feature = "mysql")]
            DbTransaction::MySql(_) => DbEngine::MySql,
            #[cfg(feature = "sqlite")]
            DbTransaction::Sqlite(_) => DbEngine::Sqlite,
        }
    }

    /// Runs a query inside this transaction.
    pub async fn query(
        &mut self,
        sql: &str,
        args: &[SqlValue],
        columns: &[ColumnKind],
    ) -> Result<Rows> {
        let sql = prepare(self.engine(), sql, args);
        let records = on_tx!(self, |conn| {
            let rows = bind_values(sqlx::query(&sql), args).fetch_all(conn).await?;
            rows.iter()
                .map(|row| decode_row(row, columns))
                .collect::<Result<Vec<_>>>()?
        });
        Ok(Rows::new(records))
    }

    /// Like [`DbTransaction::query`] but expects exactly one row.
    pub async fn query_one(
        &mut self,
        sql: &str,
        args: &[SqlValue],
        columns: &[ColumnKind],
    ) -> Result<Record> {
        let sql = prepare(self.engine(), sql, args);
        on_tx!(self, |conn| {
            let row = bind_values(sqlx::query(&sql), args)
                .fetch_optional(conn)
                .await?
                .ok_or(DbError::NotFound)?;
            decode_row(&row, columns)
        })
    }

    /// Executes a statement inside this transaction, returning affected rows.
    pub async fn execute(&mut self, sql: &str, args: &[SqlValue]) -> Result<u64> {
        let sql = prepare(self.engine(), sql, args);
        on_tx!(self, |conn| {
            let done = bind_values(sqlx::query(&sql), args).execute(conn).await?;
            Ok(done.rows_affected())
        })
    }

    /// Commit the transaction.
    pub async fn commit(self) -> Result<()> {
        let res = match self {
            #[cfg(feature = "pg")]
            DbTransaction::Postgres(tx) => tx.commit().await,
            #[cfg(feature = "mysql")]
            DbTransaction::MySql(tx) => tx.commit().await,
            #[cfg(feature = "sqlite")]
            DbTransaction::Sqlite(tx) => tx.commit().await,
        };
        res.map_err(DbError::Transaction)
    }

    /// Roll back the transaction.
    pub async fn rollback(self) -> Result<()> {
        let res = match self {
            #[cfg(feature = "pg")]
            DbTransaction::Postgres(tx) => tx.rollback().await,
            #[cfg(feature = "mysql")]
            DbTransaction::MySql(tx) => tx.rollback().await,
            #[cfg(feature = "sqlite")]
            DbTransaction::Sqlite(tx) => tx.rollback().await,
        };
        res.map_err(DbError::Transaction)
    }
}

/// Main handle.
#[derive(Debug)]
pub struct DbHandle {
    engine: DbEngine,
    pool: DbPool,
    dsn: String,
}

impl DbHandle {
    /// Detect engine by DSN.
    ///
    /// Note: we only check scheme prefixes and don't mutate the tail (credentials etc.).
    pub fn detect(dsn: &str) -> Result<DbEngine> {
        // Trim only leading spaces/newlines to be forgiving with env files.
        let s = dsn.trim_start();

        if s.starts_with("postgres://") || s.starts_with("postgresql://") {
            Ok(DbEngine::Postgres)
        } else if s.starts_with("mysql://") {
            Ok(DbEngine::MySql)
        } else if s.starts_with("sqlite:") {
            Ok(DbEngine::Sqlite)
        } else {
            Err(DbError::UnknownDsn(dsn.to_string()))
        }
    }

    /// Connect and build handle.
    pub async fn connect(dsn: &str, opts: ConnectOpts) -> Result<Self> {
        let engine = Self::detect(dsn)?;
        let pool = match engine {
            #[cfg(feature = "pg")]
            DbEngine::Postgres => {
                let o = apply_pool_opts!(PgPoolOptions::new(), &opts);
                DbPool::Postgres(o.connect(dsn).await?)
            }
            #[cfg(feature = "mysql")]
            DbEngine::MySql => {
                let o = apply_pool_opts!(MySqlPoolOptions::new(), &opts);
                DbPool::MySql(o.connect(dsn).await?)
            }
            #[cfg(feature = "sqlite")]
            DbEngine::Sqlite => {
                prepare_sqlite_path(dsn, opts.create_sqlite_dirs)?;
                let mut o = apply_pool_opts!(SqlitePoolOptions::new(), &opts);

                // Copy busy timeout into the closure (per-connection PRAGMAs)
                let busy = opts.sqlite_busy_timeout;
                o = o.after_connect(move |conn, _meta| {
                    Box::pin(async move {
                        sqlx::query("PRAGMA journal_mode = WAL")
                            .execute(&mut *conn)
                            .await?;
                        sqlx::query("PRAGMA synchronous = NORMAL")
                            .execute(&mut *conn)
                            .await?;
                        if let Some(ms) = busy {
                            // PRAGMA can't use bind parameters; use a numeric literal.
                            let ms = i64::try_from(ms.as_millis()).unwrap_or(i64::MAX);
                            let stmt = format!("PRAGMA busy_timeout = {ms}");
                            sqlx::query(&stmt).execute(&mut *conn).await?;
                        }
                        Ok(())
                    })
                });

                DbPool::Sqlite(o.connect(dsn).await?)
            }
            #[cfg(not(feature = "pg"))]
            DbEngine::Postgres => {
                return Err(DbError::FeatureDisabled("PostgreSQL feature not enabled"))
            }
            #[cfg(not(feature = "mysql"))]
            DbEngine::MySql => return Err(DbError::FeatureDisabled("MySQL feature not enabled")),
            #[cfg(not(feature = "sqlite"))]
            DbEngine::Sqlite => return Err(DbError::FeatureDisabled("SQLite feature not enabled")),
        };

        tracing::debug!(engine = ?engine, "database pool connected");
        Ok(Self {
            engine,
            pool,
            dsn: dsn.to_string(),
        })
    }

    /// Graceful pool close. (Dropping the pool also closes it; this just makes it explicit.)
    pub async fn close(&self) {
        on_pool!(&self.pool, |p| p.close().await)
    }

    /// Get the backend.
    pub fn engine(&self) -> DbEngine {
        self.engine
    }

    /// Placeholder strategy of the connected engine.
    pub fn dialect(&self) -> &'static dyn Dialect {
        self.engine.dialect()
    }

    pub fn dsn(&self) -> &str {
        &self.dsn
    }

    /// Runs a query on a pooled connection and returns every row.
    pub async fn query(
        &self,
        cancel: &CancellationToken,
        sql: &str,
        args: &[SqlValue],
        columns: &[ColumnKind],
    ) -> Result<Rows> {
        let sql = prepare(self.engine, sql, args);
        let records = guard(cancel, async {
            on_pool!(&self.pool, |pool| {
                let rows = bind_values(sqlx::query(&sql), args).fetch_all(pool).await?;
                rows.iter()
                    .map(|row| decode_row(row, columns))
                    .collect::<Result<Vec<_>>>()
            })
        })
        .await?;
        Ok(Rows::new(records))
    }

    /// Runs a query expected to yield one row; zero rows is [`DbError::NotFound`].
    pub async fn query_one(
        &self,
        cancel: &CancellationToken,
        sql: &str,
        args: &[SqlValue],
        columns: &[ColumnKind],
    ) -> Result<Record> {
        let sql = prepare(self.engine, sql, args);
        guard(cancel, async {
            on_pool!(&self.pool, |pool| {
                let row = bind_values(sqlx::query(&sql), args)
                    .fetch_optional(pool)
                    .await?
                    .ok_or(DbError::NotFound)?;
                decode_row(&row, columns)
            })
        })
        .await
    }

    /// Executes a statement outside of an explicit transaction.
    pub async fn execute(
        &self,
        cancel: &CancellationToken,
        sql: &str,
        args: &[SqlValue],
    ) -> Result<u64> {
        let sql = prepare(self.engine, sql, args);
        guard(cancel, async {
            on_pool!(&self.pool, |pool| {
                let done = bind_values(sqlx::query(&sql), args).execute(pool).await?;
                Ok(done.rows_affected())
            })
        })
        .await
    }

    /// Begin a transaction (returns appropriate transaction type based on backend).
    pub async fn begin(&self) -> Result<DbTransaction> {
        on_pool!(&self.pool, |pool| Ok(pool.begin().await?.into()))
    }

    /// Runs `work` in a transaction.
    ///
    /// Commits when `work` succeeds. When it fails, or `cancel` fires while it runs,
    /// the transaction is rolled back and the original error is returned; a failing
    /// rollback is only logged. A failing commit is returned as
    /// [`DbError::Transaction`].
    pub async fn with_tx<T, F>(&self, cancel: &CancellationToken, work: F) -> Result<T>
    where
        T: Send,
        F: for<'t> FnOnce(&'t mut DbTransaction) -> BoxFuture<'t, Result<T>> + Send,
    {
        let mut tx = guard(cancel, self.begin()).await?;

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(DbError::Cancelled),
            res = work(&mut tx) => res,
        };

        match outcome {
            Ok(value) => {
                tx.commit().await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::warn!(
                        error = %rollback_err,
                        cause = %err,
                        "transaction rollback failed"
                    );
                }
                Err(err)
            }
        }
    }
}

#[cfg(feature = "pg")]
impl From<sqlx::Transaction<'static, Postgres>> for DbTransaction {
    fn from(tx: sqlx::Transaction<'static, Postgres>) -> Self {
        DbTransaction::Postgres(tx)
    }
}

#[cfg(feature = "mysql")]
impl From<sqlx::Transaction<'static, MySql>> for DbTransaction {
    fn from(tx: sqlx::Transaction<'static, MySql>) -> Self {
        DbTransaction::MySql(tx)
    }
}

#[cfg(feature = "sqlite")]
impl From<sqlx::Transaction<'static, Sqlite>> for DbTransaction {
    fn from(tx: sqlx::Transaction<'static, Sqlite>) -> Self {
        DbTransaction::Sqlite(tx)
    }
}

// ===================== helpers =====================

/// Normalizes `sql` for `engine` and logs the statement that will run.
fn prepare(engine: DbEngine, sql: &str, args: &[SqlValue]) -> String {
    let sql = dialect::normalize(engine.dialect(), sql);
    tracing::debug!(target: "db::statement", sql = %sql, args = args.len(), "executing statement");
    sql
}

/// Races `fut` against `cancel`; the future is dropped when the token fires.
async fn guard<T, Fut>(cancel: &CancellationToken, fut: Fut) -> Result<T>
where
    Fut: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(DbError::Cancelled),
        res = fut => res,
    }
}

#[cfg(feature = "sqlite")]
fn prepare_sqlite_path(dsn: &str, create_dirs: bool) -> Result<()> {
    // Only try to create directories for plain file paths; ignore :memory: cases.
    if !create_dirs || dsn.contains(":memory:") {
        return Ok(());
    }

    // Handles "sqlite:/path", "sqlite://path" and an optional "?mode=rwc" style query.
    // For URI forms like "sqlite:file:memdb?..." there is no filesystem dir to create.
    let raw = dsn
        .strip_prefix("sqlite://")
        .or_else(|| dsn.strip_prefix("sqlite:"))
        .unwrap_or(dsn);
    if raw.starts_with("file:") {
        return Ok(());
    }
    let path = raw.split('?').next().unwrap_or(raw);

    if let Some(parent) = std::path::Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            // One-time blocking call during startup; acceptable for setup paths.
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

// ===================== tests =====================
