//! Error types for Mitho Khana

use thiserror::Error;

/// Mitho Khana error type
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parse error (config and seed files)
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Recipe not found
    #[error("Recipe not found: {0}")]
    RecipeNotFound(i64),

    /// Comment not found
    #[error("Comment not found: {0}")]
    CommentNotFound(i64),

    /// User not found
    #[error("User not found: {0}")]
    UserNotFound(String),

    /// Category, region or festival not found
    #[error("{kind} not found: {key}")]
    NotFound { kind: &'static str, key: String },

    /// The acting user may not touch this record
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Invalid input
    #[error("{0}")]
    Validation(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type alias for Mitho Khana operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn not_found(kind: &'static str, key: impl ToString) -> Self {
        Error::NotFound {
            kind,
            key: key.to_string(),
        }
    }
}
