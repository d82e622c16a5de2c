use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),
    #[error("Store call timed out after {0:?}")]
    Timeout(Duration),
    #[error("Watched key [{key}] was modified by another client")]
    Conflict {
        key: String
    },
    #[error("Key [{key}] has no value at [{path}]")]
    NotFound {
        key: String,
        path: String
    },
    #[error("Index [{index}] already exists")]
    IndexExists {
        index: String
    },
    #[error("Unknown index [{index}]")]
    UnknownIndex {
        index: String
    },
    #[error("Index [{index}] cannot answer this query: {reason}")]
    InvalidQuery {
        index: String,
        reason: String
    },
    #[error("Value at [{path}] of key [{key}] is not {expected}")]
    WrongType {
        key: String,
        path: String,
        expected: &'static str
    },
    #[error("Numeric overflow at [{path}] of key [{key}]")]
    Overflow {
        key: String,
        path: String
    },
    #[error("Invalid JSON path [{0}]")]
    InvalidPath(String),
    #[error("Serialization error: {0}")]
    Serialization(String)
}

impl StoreError {
    pub fn not_found(key: &str, path: &str) -> Self {
        Self::NotFound { key: key.to_string(), path: path.to_string() }
    }

    pub fn wrong_type(key: &str, path: &str, expected: &'static str) -> Self {
        Self::WrongType { key: key.to_string(), path: path.to_string(), expected }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}
