use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Why a single source in the chain produced nothing.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("request timed out")]
    Timeout,
    #[error("http {0}")]
    Status(u16),
    #[error("malformed payload: {0}")]
    Payload(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl From<serde_json::Error> for SourceError {
    fn from(error: serde_json::Error) -> Self {
        SourceError::Payload(error.to_string())
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("settings error: {0}")]
    Settings(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("no remote source returned projects")]
    NothingToBake,
    #[error("authorization token is incorrect")]
    Unauthorized,
}
