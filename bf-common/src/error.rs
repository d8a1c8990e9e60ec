//! Common error types for BookFactory

use thiserror::Error;

/// Common result type for BookFactory operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across BookFactory services
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A stored value that no longer parses (bad UUID, timestamp, enum or JSON)
    #[error("Corrupt value in column {column}: {detail}")]
    CorruptRow { column: String, detail: String },

    /// No position follows `after`; the caller has to pick one
    #[error("No position after {after}; give an explicit position")]
    PositionExhausted { after: i64 },

    /// Serializing a JSON column failed
    #[error("Internal error: {0}")]
    Internal(String),
}
