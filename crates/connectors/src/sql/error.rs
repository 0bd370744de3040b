use thiserror::Error;

/// Server error numbers reported for key, foreign-key and NOT NULL violations.
const CONSTRAINT_CODES: [u32; 4] = [2627, 2601, 547, 515];

/// Deadlock victim, lock timeout and Azure throttling/failover numbers.
const TRANSIENT_CODES: [u32; 6] = [1205, 1222, 40197, 40501, 40613, 49918];

/// All errors coming from the database layer.
#[derive(Debug, Error)]
pub enum DbError {
    /// Low-level I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Any error reported by the SQL Server driver.
    #[error("SQL error: {0}")]
    Sql(#[from] tiberius::error::Error),

    /// Opening a connection failed before any statement ran.
    #[error("Connection error: {0}")]
    Connection(String),

    /// A key or reference constraint rejected the rows.
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// The server is temporarily unable to take the write.
    #[error("Transient database error: {0}")]
    Transient(String),

    /// Writing rows failed at the application level.
    #[error("Write error: {0}")]
    Write(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

/// Coarse category used to label failed work items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbErrorKind {
    ConstraintViolation,
    Database,
    System,
}

impl DbError {
    pub fn classify(&self) -> DbErrorKind {
        match self {
            DbError::ConstraintViolation(_) => DbErrorKind::ConstraintViolation,
            DbError::Sql(tiberius::error::Error::Server(token))
                if CONSTRAINT_CODES.contains(&token.code()) =>
            {
                DbErrorKind::ConstraintViolation
            }
            DbError::Sql(_) | DbError::Io(_) | DbError::Connection(_) | DbError::Transient(_) => {
                DbErrorKind::Database
            }
            DbError::Write(_) | DbError::Unknown(_) => DbErrorKind::System,
        }
    }

    /// Whether retrying the same write may succeed.
    pub fn is_transient(&self) -> bool {
        use tiberius::error::Error as Tds;

        match self {
            DbError::Io(_) | DbError::Connection(_) | DbError::Transient(_) => true,
            DbError::Sql(Tds::Io { .. } | Tds::Routing { .. }) => true,
            DbError::Sql(Tds::Server(token)) => TRANSIENT_CODES.contains(&token.code()),
            _ => false,
        }
    }
}
