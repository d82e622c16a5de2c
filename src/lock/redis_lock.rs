use std::time::Duration;

use redis::aio::ConnectionManager;
use redis::{RedisError, Script};
use tokio::time::{sleep, Instant};
use tracing::trace;
use uuid::Uuid;

use crate::lock::{Lease, LockError, LockService};

const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(10);

/// Deletes the lock only while it still carries the caller's token.
const RELEASE_SCRIPT: &str = r#"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    return redis.call('DEL', KEYS[1])
end
return 0
"#;

/// Leased locks stored as plain Redis keys, visible to every instance on the server.
///
/// Acquisition is `SET name token NX PX ttl`; the key expires by itself if the holder
/// disappears.
pub struct RedisLockService {
    connection: ConnectionManager,
    release_script: Script,
    timeout: Duration,
    retry_delay: Duration
}

fn unavailable(error: RedisError) -> LockError {
    LockError::Unavailable(error.to_string())
}

impl RedisLockService {
    pub fn new(connection: ConnectionManager, timeout: Duration) -> Self {
        Self {
            connection,
            release_script: Script::new(RELEASE_SCRIPT),
            timeout,
            retry_delay: DEFAULT_RETRY_DELAY
        }
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    async fn try_acquire(&self, name: &str, ttl: Duration) -> Result<Option<Lease>, LockError> {
        let token = Uuid::new_v4().to_string();
        let ttl_ms = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);
        let expires_at = Instant::now() + ttl;
        let mut connection = self.connection.clone();

        let acquired: Option<String> = redis::cmd("SET")
            .arg(name)
            .arg(&token)
            .arg("NX")
            .arg("PX")
            .arg(ttl_ms)
            .query_async(&mut connection)
            .await
            .map_err(unavailable)?;

        Ok(acquired.map(|_| Lease { name: name.to_string(), token, expires_at }))
    }
}

impl LockService for RedisLockService {
    async fn acquire(&self, name: &str, ttl: Duration) -> Result<Lease, LockError> {
        let deadline = Instant::now() + self.timeout;

        loop {
            if let Some(lease) = self.try_acquire(name, ttl).await? {
                trace!("Acquired lock [{name}] with token [{}]", lease.token);
                return Ok(lease);
            }

            if Instant::now() >= deadline {
                return Err(LockError::Timeout { name: name.to_string(), waited: self.timeout });
            }

            sleep(self.retry_delay).await;
        }
    }

    async fn release(&self, lease: Lease) -> Result<(), LockError> {
        let mut connection = self.connection.clone();

        let deleted: i64 = self.release_script
            .key(&lease.name)
            .arg(&lease.token)
            .invoke_async(&mut connection)
            .await
            .map_err(unavailable)?;

        if deleted == 1 {
            Ok(())
        } else {
            Err(LockError::Lost { name: lease.name })
        }
    }
}
