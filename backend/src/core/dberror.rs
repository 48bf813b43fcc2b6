use sqlx::error::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("Database connection error: {0}")]
    ConnectionFailed(sqlx::Error),

    #[error("Database operation failed: {0}")]
    OperationFailed(sqlx::Error),

    /// Unique, foreign key, not-null or check constraint rejected the write.
    #[error("Constraint violated: {0}")]
    ConstraintViolated(String),

    #[error("Row not found")]
    RowNotFound,
}

impl From<sqlx::Error> for DbError {
    fn from(error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::RowNotFound => Self::RowNotFound,
            sqlx::Error::Database(ref e) if !matches!(e.kind(), ErrorKind::Other) => {
                Self::ConstraintViolated(e.message().to_string())
            }
            _ => Self::OperationFailed(error),
        }
    }
}

impl DbError {
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::RowNotFound)
    }

    #[must_use]
    pub const fn is_constraint_violation(&self) -> bool {
        matches!(self, Self::ConstraintViolated(_))
    }
}
