use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use db::{dialect, ColumnKind, DbError, DbHandle, DbTransaction, Record, SqlValue};
use tokio_util::sync::CancellationToken;

use crate::contract::id::Id;
use crate::contract::model::User;
use crate::domain::repo::UsersRepository;

/// Select-list order: id, email, created_at, updated_at, enabled.
pub const USER_COLUMNS: [ColumnKind; 5] = [
    ColumnKind::Uuid,
    ColumnKind::Text,
    ColumnKind::Timestamp,
    ColumnKind::Timestamp,
    ColumnKind::Bool,
];

/// `user_clients` rows: user_id, client_id.
const LINK_COLUMNS: [ColumnKind; 2] = [ColumnKind::Uuid, ColumnKind::Uuid];

const SELECT_USERS: &str =
    "SELECT u.id, u.email, u.created_at, u.updated_at, u.enabled FROM users AS u";

fn to_user(row: Record) -> db::Result<User> {
    Ok(User {
        id: Id::from_uuid(row.uuid(0)?),
        email: row.text(1)?.to_owned(),
        created_at: row.timestamp(2)?,
        updated_at: row.timestamp(3)?,
        enabled: row.boolean(4)?,
        client_ids: Vec::new(),
    })
}

/// Replaces every association row of `user_id` with `client_ids`.
async fn replace_client_ids(
    tx: &mut DbTransaction,
    user_id: Id,
    client_ids: &[Id],
) -> db::Result<()> {
    tx.execute("DELETE FROM user_clients WHERE user_id = ?", &[user_id.into()])
        .await?;
    if client_ids.is_empty() {
        return Ok(());
    }

    let sql = format!(
        "INSERT INTO user_clients (user_id, client_id) VALUES {}",
        dialect::list("(?, ?)", client_ids.len())
    );
    let args: Vec<SqlValue> = client_ids
        .iter()
        .flat_map(|client_id| [SqlValue::from(user_id), SqlValue::from(*client_id)])
        .collect();
    tx.execute(&sql, &args).await?;
    Ok(())
}

pub struct UsersSql {
    db: Arc<DbHandle>,
}

impl UsersSql {
    pub fn new(db: Arc<DbHandle>) -> Self {
        Self { db }
    }

    /// Fills `client_ids` for all `users` with a single query.
    async fn attach_client_ids(
        &self,
        cancel: &CancellationToken,
        mut users: Vec<User>,
    ) -> db::Result<Vec<User>> {
        if users.is_empty() {
            return Ok(users);
        }

        let sql = format!(
            "SELECT user_id, client_id FROM user_clients WHERE user_id IN ({}) ORDER BY user_id, client_id",
            dialect::list("?", users.len())
        );
        let args: Vec<SqlValue> = users.iter().map(|u| u.id.into()).collect();
        let rows = self.db.query(cancel, &sql, &args, &LINK_COLUMNS).await?;

        let mut by_user: HashMap<Id, Vec<Id>> = HashMap::with_capacity(users.len());
        for row in rows {
            let user_id = Id::from_uuid(row.uuid(0)?);
            let client_id = Id::from_uuid(row.uuid(1)?);
            by_user.entry(user_id).or_default().push(client_id);
        }
        for user in &mut users {
            if let Some(mut ids) = by_user.remove(&user.id) {
                // Engines disagree on uuid collation; keep `Id` order.
                ids.sort_unstable();
                user.client_ids = ids;
            }
        }
        Ok(users)
    }

    async fn fetch_one(&self, cancel: &CancellationToken, sql: &str, arg: SqlValue) -> db::Result<User> {
        let row = self.db.query_one(cancel, sql, &[arg], &USER_COLUMNS).await?;
        let mut users = self.attach_client_ids(cancel, vec![to_user(row)?]).await?;
        users.pop().ok_or(DbError::NotFound)
    }
}

#[async_trait]
impl UsersRepository for UsersSql {
    async fn get(&self, cancel: &CancellationToken, id: Id) -> db::Result<User> {
        let sql = format!("{SELECT_USERS} WHERE u.id = ?");
        self.fetch_one(cancel, &sql, id.into()).await
    }

    async fn get_by_email(&self, cancel: &CancellationToken, email: &str) -> db::Result<User> {
        let sql = format!("{SELECT_USERS} WHERE u.email = ?");
        self.fetch_one(cancel, &sql, email.into()).await
    }

    async fn list(&self, cancel: &CancellationToken) -> db::Result<Vec<User>> {
        let sql = format!("{SELECT_USERS} ORDER BY u.email ASC");
        let users = self
            .db
            .query(cancel, &sql, &[], &USER_COLUMNS)
            .await?
            .map_into(to_user)?;
        self.attach_client_ids(cancel, users).await
    }

    async fn list_by_ids(&self, cancel: &CancellationToken, ids: &[Id]) -> db::Result<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "{SELECT_USERS} WHERE u.id IN ({}) ORDER BY u.email ASC",
            dialect::list("?", ids.len())
        );
        let args: Vec<SqlValue> = ids.iter().copied().map(SqlValue::from).collect();
        let users = self
            .db
            .query(cancel, &sql, &args, &USER_COLUMNS)
            .await?
            .map_into(to_user)?;
        self.attach_client_ids(cancel, users).await
    }

    async fn add(&self, cancel: &CancellationToken, user: &User) -> db::Result<()> {
        let id = user.id;
        let client_ids = user.client_ids.clone();
        let args: Vec<SqlValue> = vec![
            user.id.into(),
            user.email.clone().into(),
            user.created_at.into(),
            user.updated_at.into(),
            user.enabled.into(),
        ];
        self.db
            .with_tx(cancel, move |tx| {
                Box::pin(async move {
                    tx.execute(
                        "INSERT INTO users (id, email, created_at, updated_at, enabled) VALUES (?, ?, ?, ?, ?)",
                        &args,
                    )
                    .await?;
                    replace_client_ids(tx, id, &client_ids).await
                })
            })
            .await
    }

    async fn set(&self, cancel: &CancellationToken, user: &User) -> db::Result<()> {
        let id = user.id;
        let client_ids = user.client_ids.clone();
        let args: Vec<SqlValue> = vec![
            user.email.clone().into(),
            user.created_at.into(),
            user.updated_at.into(),
            user.enabled.into(),
            user.id.into(),
        ];
        self.db
            .with_tx(cancel, move |tx| {
                Box::pin(async move {
                    let affected = tx
                        .execute(
                            "UPDATE users SET email = ?, created_at = ?, updated_at = ?, enabled = ? WHERE id = ?",
                            &args,
                        )
                        .await?;
                    if affected == 0 {
                        return Err(DbError::NotFound);
                    }
                    replace_client_ids(tx, id, &client_ids).await
                })
            })
            .await
    }
}
