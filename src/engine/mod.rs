mod transfer_engine;

use std::time::Duration;

pub use transfer_engine::TransferEngine;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Commit attempts per transfer before giving up with `TransferFailed`.
    pub max_attempts: u32,
    pub store_timeout: Duration
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            store_timeout: Duration::from_secs(2)
        }
    }
}
