use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, EventError>;

#[derive(Debug, Error)]
pub enum EventError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("invalid tag: {0}")]
    InvalidTag(String),
    #[error("invalid event timestamp: {0}")]
    InvalidTimestamp(String),
    #[error("invalid event id")]
    InvalidId,
    #[error("invalid filter: {0}")]
    InvalidFilter(String),
    #[error("invalid filter condition: {0}")]
    InvalidCondition(String),
    #[error("not found")]
    NotFound,
    #[error("storage read error: {0}")]
    ReadFailed(String),
    #[error("storage write error: {0}")]
    WriteFailed(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for EventError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<toml::ser::Error> for EventError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for EventError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
