//! Error types for the blog API

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Post not found: {0}")]
    PostNotFound(i64),

    #[error("Invalid ID: {0}")]
    InvalidId(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
