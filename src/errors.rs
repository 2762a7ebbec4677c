use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Schema operation failed for table {table}: {message}")]
    Schema { table: String, message: String },

    #[error("Seed failed for table {table} at row {row_index}: {message}")]
    Seed {
        table: String,
        row_index: usize,
        message: String,
    },

    #[error("Storage operation failed: {0}")]
    Storage(String),

    #[error("Snapshot '{name}' failed: {message}")]
    Snapshot { name: String, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database driver error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("Serde JSON error: {0}")]
    SerdeJson(#[from] serde_json::Error),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl AppError {
    /// True when the underlying database error reports a missing relation,
    /// the "already absent" condition that idempotent drops swallow.
    pub fn is_missing_relation(&self) -> bool {
        match self {
            AppError::Database(msg) => msg.contains("does not exist"),
            AppError::Sqlx(e) => e.to_string().contains("does not exist"),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
