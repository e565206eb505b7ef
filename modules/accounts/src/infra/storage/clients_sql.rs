use std::sync::Arc;

use async_trait::async_trait;
use db::{dialect, ColumnKind, DbError, DbHandle, Record, SqlValue};
use tokio_util::sync::CancellationToken;

use crate::contract::id::Id;
use crate::contract::model::Client;
use crate::domain::repo::ClientsRepository;

/// Select-list order: id, name, created_at, updated_at.
pub const CLIENT_COLUMNS: [ColumnKind; 4] = [
    ColumnKind::Uuid,
    ColumnKind::Text,
    ColumnKind::Timestamp,
    ColumnKind::Timestamp,
];

const SELECT_CLIENTS: &str = "SELECT c.id, c.name, c.created_at, c.updated_at FROM clients AS c";

fn to_client(row: Record) -> db::Result<Client> {
    Ok(Client {
        id: Id::from_uuid(row.uuid(0)?),
        name: row.text(1)?.to_owned(),
        created_at: row.timestamp(2)?,
        updated_at: row.timestamp(3)?,
    })
}

pub struct ClientsSql {
    db: Arc<DbHandle>,
}

impl ClientsSql {
    pub fn new(db: Arc<DbHandle>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ClientsRepository for ClientsSql {
    async fn get(&self, cancel: &CancellationToken, id: Id) -> db::Result<Client> {
        let sql = format!("{SELECT_CLIENTS} WHERE c.id = ?");
        let row = self
            .db
            .query_one(cancel, &sql, &[id.into()], &CLIENT_COLUMNS)
            .await?;
        to_client(row)
    }

    async fn list(&self, cancel: &CancellationToken) -> db::Result<Vec<Client>> {
        let sql = format!("{SELECT_CLIENTS} ORDER BY c.name ASC");
        self.db
            .query(cancel, &sql, &[], &CLIENT_COLUMNS)
            .await?
            .map_into(to_client)
    }

    async fn list_by_ids(&self, cancel: &CancellationToken, ids: &[Id]) -> db::Result<Vec<Client>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "{SELECT_CLIENTS} WHERE c.id IN ({}) ORDER BY c.name ASC",
            dialect::list("?", ids.len())
        );
        let args: Vec<SqlValue> = ids.iter().copied().map(SqlValue::from).collect();
        self.db
            .query(cancel, &sql, &args, &CLIENT_COLUMNS)
            .await?
            .map_into(to_client)
    }

    async fn add(&self, cancel: &CancellationToken, client: &Client) -> db::Result<()> {
        let args: Vec<SqlValue> = vec![
            client.id.into(),
            client.name.clone().into(),
            client.created_at.into(),
            client.updated_at.into(),
        ];
        self.db
            .with_tx(cancel, move |tx| {
                Box::pin(async move {
                    tx.execute(
                        "INSERT INTO clients (id, name, created_at, updated_at) VALUES (?, ?, ?, ?)",
                        &args,
                    )
                    .await?;
                    Ok(())
                })
            })
            .await
    }

    async fn set(&self, cancel: &CancellationToken, client: &Client) -> db::Result<()> {
        let args: Vec<SqlValue> = vec![
            client.name.clone().into(),
            client.created_at.into(),
            client.updated_at.into(),
            client.id.into(),
        ];
        self.db
            .with_tx(cancel, move |tx| {
                Box::pin(async move {
                    let affected = tx
                        .execute(
                            "UPDATE clients SET name = ?, created_at = ?, updated_at = ? WHERE id = ?",
                            &args,
                        )
                        .await?;
                    if affected == 0 {
                        return Err(DbError::NotFound);
                    }
                    Ok(())
                })
            })
            .await
    }

    /// Association rows go with the client (`ON DELETE CASCADE`).
    async fn remove(&self, cancel: &CancellationToken, id: Id) -> db::Result<()> {
        self.db
            .with_tx(cancel, move |tx| {
                Box::pin(async move {
                    let affected = tx
                        .execute("DELETE FROM clients WHERE id = ?", &[id.into()])
                        .await?;
                    if affected == 0 {
                        return Err(DbError::NotFound);
                    }
                    Ok(())
                })
            })
            .await
    }
}
