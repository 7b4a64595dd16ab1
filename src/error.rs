use rusqlite::ErrorCode;

/// Failure reported by the persistence layer. Nothing here is retried.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("duplicate value: {0}")]
    Duplicate(String),
    #[error("constraint violated: {0}")]
    Constraint(String),
    #[error("sqlite error: {0}")]
    Sqlite(#[source] rusqlite::Error),
    #[error("malformed row: {0}")]
    Malformed(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl PersistenceError {
    /// True when a unique column (e.g. a list name) already holds the value.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, PersistenceError::Duplicate(_))
    }
}

impl From<rusqlite::Error> for PersistenceError {
    fn from(error: rusqlite::Error) -> Self {
        let violation = match &error {
            rusqlite::Error::SqliteFailure(failure, message)
                if failure.code == ErrorCode::ConstraintViolation =>
            {
                Some((
                    failure.extended_code,
                    message.clone().unwrap_or_else(|| error.to_string()),
                ))
            }
            _ => None,
        };

        match violation {
            Some((code, message))
                if code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    || code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
            {
                PersistenceError::Duplicate(message)
            }
            Some((_, message)) => PersistenceError::Constraint(message),
            None => PersistenceError::Sqlite(error),
        }
    }
}

pub type SqlResult<T> = std::result::Result<T, PersistenceError>;
