//! Error types for depot-db.

use diesel::result::DatabaseErrorKind;
use miette::Diagnostic;
use thiserror::Error;

/// Database error type for depot-db operations.
#[derive(Error, Diagnostic, Debug)]
pub enum DbError {
    #[error("Database connection failed: {0}")]
    #[diagnostic(
        code(depot_db::connection),
        help("Check if the database file exists and is accessible")
    )]
    ConnectionError(String),

    #[error("Database query failed: {0}")]
    #[diagnostic(
        code(depot_db::query),
        help("Re-run the command; a busy database is retried for a few seconds")
    )]
    QueryError(String),

    #[error("Duplicate key: {0}")]
    #[diagnostic(
        code(depot_db::duplicate_key),
        help("Another writer created the same row first")
    )]
    DuplicateKey(String),

    #[error("Database migration failed: {0}")]
    #[diagnostic(
        code(depot_db::migration),
        help("The database schema may be corrupted. Remove the database and restore from blobs.")
    )]
    MigrationError(String),

    #[error("Record not found: {0}")]
    #[diagnostic(code(depot_db::not_found))]
    NotFound(String),

    #[error("IO error: {0}")]
    #[diagnostic(code(depot_db::io), help("Check file permissions and disk space"))]
    IoError(#[from] std::io::Error),
}

impl DbError {
    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, DbError::DuplicateKey(_))
    }
}

impl From<diesel::result::Error> for DbError {
    fn from(err: diesel::result::Error) -> Self {
        match err {
            diesel::result::Error::NotFound => DbError::NotFound("Record not found".to_string()),
            diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, info) => {
                DbError::DuplicateKey(info.message().to_string())
            }
            diesel::result::Error::DatabaseError(_, info) => {
                DbError::QueryError(info.message().to_string())
            }
            other => DbError::QueryError(other.to_string()),
        }
    }
}

impl From<diesel::result::ConnectionError> for DbError {
    fn from(err: diesel::result::ConnectionError) -> Self {
        DbError::ConnectionError(err.to_string())
    }
}

/// Result type alias for depot-db operations.
pub type Result<T> = std::result::Result<T, DbError>;

#[cfg(test)]
mod tests {
    use diesel::result::{DatabaseErrorInformation, Error as DieselError};

    use super::*;

    struct Info(&'static str);

    impl DatabaseErrorInformation for Info {
        fn message(&self) -> &str {
            self.0
        }

        fn details(&self) -> Option<&str> {
            None
        }

        fn hint(&self) -> Option<&str> {
            None
        }

        fn table_name(&self) -> Option<&str> {
            None
        }

        fn column_name(&self) -> Option<&str> {
            None
        }

        fn constraint_name(&self) -> Option<&str> {
            None
        }

        fn statement_position(&self) -> Option<i32> {
            None
        }
    }

    #[test]
    fn test_unique_violation_maps_to_duplicate_key() {
        let err = DieselError::DatabaseError(
            DatabaseErrorKind::UniqueViolation,
            Box::new(Info("UNIQUE constraint failed")),
        );
        let err = DbError::from(err);
        assert!(err.is_duplicate_key());
        assert!(err.to_string().contains("UNIQUE constraint failed"));
    }

    #[test]
    fn test_not_found_maps() {
        let err = DbError::from(DieselError::NotFound);
        assert!(matches!(err, DbError::NotFound(_)));
    }

    #[test]
    fn test_other_database_errors_are_query_errors() {
        let err = DieselError::DatabaseError(
            DatabaseErrorKind::ForeignKeyViolation,
            Box::new(Info("FOREIGN KEY constraint failed")),
        );
        assert!(matches!(DbError::from(err), DbError::QueryError(_)));
    }
}
