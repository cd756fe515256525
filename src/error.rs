//! Error types for the cafe catalog

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Validation(String),

    #[error("A cafe named '{0}' already exists")]
    DuplicateName(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Sorry, that's not allowed. Make sure you have the correct api-key.")]
    Unauthorized,

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Machine-readable kind used in HTTP error bodies
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Validation(_) => "validation",
            Error::DuplicateName(_) => "duplicate_name",
            Error::NotFound(_) => "not_found",
            Error::Unauthorized => "unauthorized",
            Error::Database(_)
            | Error::Storage(_)
            | Error::Io(_)
            | Error::Toml(_)
            | Error::Config(_) => "internal",
        }
    }

    /// Not-found error for an unknown cafe id
    pub fn cafe_not_found() -> Self {
        Error::NotFound("Sorry, a cafe with that id was not found in the database.".into())
    }
}
