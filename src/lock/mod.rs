//! Cluster-wide advisory locks used to serialize transfers across service instances.

mod distributed_mutex;
mod errors;
mod memory_lock;
mod redis_lock;

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

pub use distributed_mutex::{DistributedMutex, LockScope};
#[cfg(test)]
pub use distributed_mutex::GLOBAL_MUTEX_NAME;
pub use errors::LockError;
pub use memory_lock::MemoryLockService;
pub use redis_lock::RedisLockService;

/// Proof of holding a named lock until `expires_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lease {
    pub name: String,
    pub token: String,
    pub expires_at: Instant
}

pub trait LockService: Send + Sync + 'static {
    /// Blocks until the named lock is obtained for `ttl`, or fails once the service gives up.
    fn acquire(&self, name: &str, ttl: Duration) -> impl Future<Output = Result<Lease, LockError>> + Send;

    /// Returns the lock. Fails with [`LockError::Lost`] if the lease is no longer the holder.
    fn release(&self, lease: Lease) -> impl Future<Output = Result<(), LockError>> + Send;
}
