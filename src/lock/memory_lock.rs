use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::time::{sleep, Instant};
use tracing::trace;
use uuid::Uuid;

use crate::lock::{Lease, LockError, LockService};

const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(10);

/// Leased locks held in process memory, shared by every holder of the same `Arc`.
///
/// An expired lease is free for the next caller, so a crashed holder only delays others
/// by at most its ttl.
pub struct MemoryLockService {
    leases: DashMap<String, Lease>,
    timeout: Duration,
    retry_delay: Duration
}

impl MemoryLockService {
    pub fn new(timeout: Duration) -> Self {
        Self {
            leases: DashMap::new(),
            timeout,
            retry_delay: DEFAULT_RETRY_DELAY
        }
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    fn try_acquire(&self, name: &str, ttl: Duration) -> Option<Lease> {
        let now = Instant::now();
        let lease = Lease {
            name: name.to_string(),
            token: Uuid::new_v4().to_string(),
            expires_at: now + ttl
        };

        match self.leases.entry(name.to_string()) {
            Entry::Occupied(mut entry) => {
                if entry.get().expires_at > now {
                    return None;
                }

                trace!("Taking over expired lock [{name}]");
                entry.insert(lease.clone());
            }
            Entry::Vacant(entry) => {
                entry.insert(lease.clone());
            }
        }

        Some(lease)
    }
}

impl LockService for MemoryLockService {
    async fn acquire(&self, name: &str, ttl: Duration) -> Result<Lease, LockError> {
        let deadline = Instant::now() + self.timeout;

        loop {
            if let Some(lease) = self.try_acquire(name, ttl) {
                return Ok(lease);
            }

            if Instant::now() >= deadline {
                return Err(LockError::Timeout { name: name.to_string(), waited: self.timeout });
            }

            sleep(self.retry_delay).await;
        }
    }

    async fn release(&self, lease: Lease) -> Result<(), LockError> {
        let removed = self.leases.remove_if(&lease.name, |_, held| held.token == lease.token);

        match removed {
            Some((_, held)) if held.expires_at > Instant::now() => Ok(()),
            _ => Err(LockError::Lost { name: lease.name })
        }
    }
}
