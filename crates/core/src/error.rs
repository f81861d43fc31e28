//! Unified error types for remote-models.
//!
//! Every message starts with a stable code so callers and logs can match on it.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;

/// Unified error types for remote-models.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The remote fetch failed or returned a non-success status.
    #[error("REMOTE_UNAVAILABLE: {0}")]
    RemoteUnavailable(String),

    /// No explicit schema and the sample page had no records.
    #[error("EMPTY_SCHEMA: no data returned from remote model `{0}`")]
    EmptySchema(String),

    /// A declared schema names an unknown column type.
    #[error("INVALID_SCHEMA: {0}")]
    InvalidSchema(String),

    /// The remote endpoint could not be turned into a URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// Invalid input parameters (e.g., unknown filter column).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Model is unknown or not served outward.
    #[error("MODEL_NOT_FOUND: {0}")]
    ModelNotFound(String),

    /// Shared secret did not match.
    #[error("FORBIDDEN")]
    Forbidden,

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Cache file or directory operation failed.
    #[error("CACHE_IO: {0}")]
    CacheIo(String),
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::CacheIo(err.to_string())
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let (code, message) = match &err {
            Error::InvalidInput(msg) => (-32602, msg.clone()),
            Error::RemoteUnavailable(msg) => (-32000, msg.clone()),
            Error::EmptySchema(_) => (-32001, err.to_string()),
            Error::InvalidSchema(msg) => (-32003, msg.clone()),
            Error::InvalidUrl(msg) => (-32004, msg.clone()),
            Error::ModelNotFound(msg) => (-32005, msg.clone()),
            Error::Forbidden => (-32006, "Forbidden".to_string()),
            Error::Database(e) => (-32002, e.to_string()),
            Error::CacheIo(msg) => (-32002, msg.clone()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}
