//! Shared database error helpers (SQLSTATE categorization, etc.)

use crate::DbError;

/// Returns true if the given SQLSTATE code represents a unique constraint violation
/// across popular backends (Postgres 23505, SQLite 2067/1555, MySQL 1062).
pub fn is_unique_violation_code(code: &str) -> bool {
    matches!(code, "23505" | "2067" | "1555" | "1062")
}

/// Returns true if the given code represents a foreign key violation
/// (Postgres 23503, SQLite 787, MySQL 1452).
pub fn is_foreign_key_violation_code(code: &str) -> bool {
    matches!(code, "23503" | "787" | "1452")
}

pub fn is_sqlx_unique_violation(db: &dyn sqlx::error::DatabaseError) -> bool {
    db.is_unique_violation()
        || db
            .code()
            .map(|c| is_unique_violation_code(c.as_ref()))
            .unwrap_or(false)
}

pub fn is_sqlx_foreign_key_violation(db: &dyn sqlx::error::DatabaseError) -> bool {
    db.is_foreign_key_violation()
        || db
            .code()
            .map(|c| is_foreign_key_violation_code(c.as_ref()))
            .unwrap_or(false)
}

/// Errors that mean the database could not be reached rather than that the
/// statement itself was wrong.
pub fn is_connectivity_error(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
    )
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if is_sqlx_unique_violation(db_err.as_ref()) {
                return DbError::Conflict {
                    constraint: db_err.constraint().map(str::to_owned),
                    message: db_err.message().to_owned(),
                };
            }
            if is_sqlx_foreign_key_violation(db_err.as_ref()) {
                return DbError::ForeignKey {
                    constraint: db_err.constraint().map(str::to_owned),
                    message: db_err.message().to_owned(),
                };
            }
        }
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound,
            other if is_connectivity_error(&other) => DbError::Unavailable(other),
            other => DbError::Sqlx(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unique_codes_cover_all_engines() {
        for code in ["23505", "2067", "1555", "1062"] {
            assert!(is_unique_violation_code(code), "{code}");
        }
        assert!(!is_unique_violation_code("23503"));
    }

    #[test]
    fn foreign_key_codes_cover_all_engines() {
        for code in ["23503", "787", "1452"] {
            assert!(is_foreign_key_violation_code(code), "{code}");
        }
        assert!(!is_foreign_key_violation_code("23505"));
        assert!(!is_foreign_key_violation_code("2067"));
    }

    #[test]
    fn sqlx_errors_are_categorized() {
        assert!(matches!(
            DbError::from(sqlx::Error::RowNotFound),
            DbError::NotFound
        ));
        assert!(matches!(
            DbError::from(sqlx::Error::PoolTimedOut),
            DbError::Unavailable(_)
        ));
        assert!(matches!(
            DbError::from(sqlx::Error::ColumnNotFound("id".into())),
            DbError::Sqlx(_)
        ));
    }
}
