//! Store error types

use thiserror::Error;

/// Errors raised by a store backend
#[derive(Error, Debug)]
pub enum StoreError {
    /// Could not open or reach the database
    #[error("Connection failed: {0}")]
    Connect(String),

    /// A statement or transaction failed
    #[error("Database error: {0}")]
    Database(String),

    /// Backend not compiled into this build
    #[error("Backend '{0}' is not available in this build")]
    Unsupported(String),
}

impl StoreError {
    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            StoreError::Connect(msg) => format!(
                "Could not connect to the database: {msg}\n\n\
                Hint: Check DB_HOST, DB_PORT, DB_USER and DB_PASSWORD, or set DB_BACKEND=duckdb."
            ),
            StoreError::Unsupported(backend) => format!(
                "Backend '{backend}' is not available.\n\n\
                Hint: Rebuild with the '{backend}-backend' feature enabled."
            ),
            _ => self.to_string(),
        }
    }
}

#[cfg(feature = "duckdb-backend")]
impl From<duckdb::Error> for StoreError {
    fn from(err: duckdb::Error) -> Self {
        StoreError::Database(err.to_string())
    }
}

#[cfg(feature = "postgres-backend")]
impl From<tokio_postgres::Error> for StoreError {
    fn from(err: tokio_postgres::Error) -> Self {
        StoreError::Database(err.to_string())
    }
}
