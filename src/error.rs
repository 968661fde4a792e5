// src/error.rs

use thiserror::Error;

/// Core error types for ReaPack
#[derive(Error, Debug)]
pub enum Error {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Database initialization error
    #[error("Failed to initialize database: {0}")]
    InitError(String),

    /// Database not found
    #[error("Database not found at path: {0}")]
    DatabaseNotFound(String),

    /// Malformed index data or version string
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid identity or unsupported package type
    #[error("Validation error: {0}")]
    Validation(String),

    /// Target paths already owned by another installed package
    #[error("File conflict: {} already owned by another package", .0.join(", "))]
    Conflict(Vec<String>),

    /// Lookup of a named object failed
    #[error("Not found: {0}")]
    NotFound(String),
}

/// Result type alias using ReaPack's Error type
pub type Result<T> = std::result::Result<T, Error>;
