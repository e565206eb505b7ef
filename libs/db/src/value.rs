//! Bind arguments and decoded rows.
//!
//! Repositories describe their rows as an ordered list of [`ColumnKind`]s and read
//! them back through [`Record`]'s typed accessors, so the same mapping code works
//! on every engine.

use std::fmt;

use chrono::{DateTime, Utc};
use sqlx::query::Query;
use sqlx::{ColumnIndex, Database, Decode, Encode, Row, Type};
use uuid::Uuid;

use crate::{DbError, Result};

/// A bind argument.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SqlValue {
    Uuid(Uuid),
    Text(String),
    Bool(bool),
    Timestamp(DateTime<Utc>),
}

impl From<Uuid> for SqlValue {
    fn from(v: Uuid) -> Self {
        SqlValue::Uuid(v)
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::Text(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::Text(v.to_owned())
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        SqlValue::Bool(v)
    }
}

impl From<DateTime<Utc>> for SqlValue {
    fn from(v: DateTime<Utc>) -> Self {
        SqlValue::Timestamp(v)
    }
}

/// Expected type of a result column.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnKind {
    Uuid,
    Text,
    Bool,
    Timestamp,
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColumnKind::Uuid => "uuid",
            ColumnKind::Text => "text",
            ColumnKind::Bool => "bool",
            ColumnKind::Timestamp => "timestamp",
        };
        f.write_str(name)
    }
}

/// One decoded row, values in select-list order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    values: Vec<SqlValue>,
}

impl Record {
    pub fn new(values: Vec<SqlValue>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn uuid(&self, index: usize) -> Result<Uuid> {
        match self.values.get(index) {
            Some(SqlValue::Uuid(v)) => Ok(*v),
            _ => Err(mismatch(index, ColumnKind::Uuid)),
        }
    }

    pub fn text(&self, index: usize) -> Result<&str> {
        match self.values.get(index) {
            Some(SqlValue::Text(v)) => Ok(v),
            _ => Err(mismatch(index, ColumnKind::Text)),
        }
    }

    pub fn boolean(&self, index: usize) -> Result<bool> {
        match self.values.get(index) {
            Some(SqlValue::Bool(v)) => Ok(*v),
            _ => Err(mismatch(index, ColumnKind::Bool)),
        }
    }

    pub fn timestamp(&self, index: usize) -> Result<DateTime<Utc>> {
        match self.values.get(index) {
            Some(SqlValue::Timestamp(v)) => Ok(*v),
            _ => Err(mismatch(index, ColumnKind::Timestamp)),
        }
    }
}

fn mismatch(index: usize, expected: ColumnKind) -> DbError {
    DbError::Decode { index, expected }
}

/// Row cursor returned by `query`.
#[derive(Debug)]
pub struct Rows {
    inner: std::vec::IntoIter<Record>,
}

impl Rows {
    pub(crate) fn new(records: Vec<Record>) -> Self {
        Self {
            inner: records.into_iter(),
        }
    }

    /// Maps every remaining row, stopping at the first mapping error.
    pub fn map_into<T, F>(self, f: F) -> Result<Vec<T>>
    where
        F: FnMut(Record) -> Result<T>,
    {
        self.inner.map(f).collect()
    }
}

impl Iterator for Rows {
    type Item = Record;

    fn next(&mut self) -> Option<Record> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Rows {}

pub(crate) fn bind_values<'q, DB>(
    mut query: Query<'q, DB, <DB as Database>::Arguments<'q>>,
    args: &[SqlValue],
) -> Query<'q, DB, <DB as Database>::Arguments<'q>>
where
    DB: Database,
    Uuid: Encode<'q, DB> + Type<DB>,
    String: Encode<'q, DB> + Type<DB>,
    bool: Encode<'q, DB> + Type<DB>,
    DateTime<Utc>: Encode<'q, DB> + Type<DB>,
{
    for arg in args {
        query = match arg {
            SqlValue::Uuid(v) => query.bind(*v),
            SqlValue::Text(v) => query.bind(v.clone()),
            SqlValue::Bool(v) => query.bind(*v),
            SqlValue::Timestamp(v) => query.bind(*v),
        };
    }
    query
}

pub(crate) fn decode_row<R>(row: &R, columns: &[ColumnKind]) -> Result<Record>
where
    R: Row,
    usize: ColumnIndex<R>,
    Uuid: Type<R::Database> + for<'r> Decode<'r, R::Database>,
    String: Type<R::Database> + for<'r> Decode<'r, R::Database>,
    bool: Type<R::Database> + for<'r> Decode<'r, R::Database>,
    DateTime<Utc>: Type<R::Database> + for<'r> Decode<'r, R::Database>,
{
    let mut values = Vec::with_capacity(columns.len());
    for (index, kind) in columns.iter().enumerate() {
        let value = match kind {
            ColumnKind::Uuid => SqlValue::Uuid(row.try_get::<Uuid, _>(index)?),
            ColumnKind::Text => SqlValue::Text(row.try_get::<String, _>(index)?),
            ColumnKind::Bool => SqlValue::Bool(row.try_get::<bool, _>(index)?),
            ColumnKind::Timestamp => {
                SqlValue::Timestamp(row.try_get::<DateTime<Utc>, _>(index)?)
            }
        };
        values.push(value);
    }
    Ok(Record::new(values))
}
