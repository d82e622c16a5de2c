use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LockError {
    #[error("Could not acquire lock [{name}] within {waited:?}")]
    Timeout {
        name: String,
        waited: Duration
    },
    #[error("Lock [{name}] expired or was taken over before release")]
    Lost {
        name: String
    },
    #[error("Lock service unavailable: {0}")]
    Unavailable(String)
}
