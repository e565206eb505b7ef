#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use db::{ConnectOpts, DbHandle};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

use accounts::AccountsModule;

/// A migrated SQLite database living in a temp dir.
pub struct TestDb {
    pub db: Arc<DbHandle>,
    _dir: TempDir,
}

pub async fn apply_schema(db: &DbHandle, ddl: &str) {
    let cancel = CancellationToken::new();
    for stmt in ddl.split(';').map(str::trim).filter(|s| !s.is_empty()) {
        db.execute(&cancel, stmt, &[])
            .await
            .unwrap_or_else(|e| panic!("schema statement failed: {e}\n{stmt}"));
    }
}

pub async fn sqlite_db() -> TestDb {
    let dir = tempfile::tempdir().expect("tempdir");
    let dsn = format!("sqlite://{}?mode=rwc", dir.path().join("accounts.db").display());
    let db = DbHandle::connect(&dsn, ConnectOpts::default())
        .await
        .expect("connect sqlite");
    apply_schema(&db, accounts::schema::SQLITE).await;
    TestDb {
        db: Arc::new(db),
        _dir: dir,
    }
}

pub async fn module() -> (AccountsModule, TestDb) {
    let test_db = sqlite_db().await;
    let module = AccountsModule::new(test_db.db.clone(), &Default::default());
    (module, test_db)
}

/// Collects the SQL text of every statement the `db` crate logs.
#[derive(Clone, Default)]
pub struct StatementLog(Arc<Mutex<Vec<String>>>);

impl StatementLog {
    pub fn statements(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }

    pub fn count_matching(&self, needle: &str) -> usize {
        self.statements()
            .iter()
            .filter(|sql| sql.contains(needle))
            .count()
    }
}

struct SqlField(Option<String>);

impl Visit for SqlField {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "sql" {
            self.0 = Some(format!("{value:?}"));
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "sql" {
            self.0 = Some(value.to_owned());
        }
    }
}

impl<S: Subscriber> Layer<S> for StatementLog {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if event.metadata().target() != "db::statement" {
            return;
        }
        let mut visitor = SqlField(None);
        event.record(&mut visitor);
        if let Some(sql) = visitor.0 {
            self.0.lock().unwrap().push(sql);
        }
    }
}

/// Installs a statement recorder for the current thread.
pub fn record_statements() -> (StatementLog, tracing::subscriber::DefaultGuard) {
    use tracing_subscriber::layer::SubscriberExt;

    let log = StatementLog::default();
    let subscriber = tracing_subscriber::registry().with(log.clone());
    let guard = tracing::subscriber::set_default(subscriber);
    (log, guard)
}
