#[cfg(test)]
mod tests;

use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;
use redis::{ConnectionAddr, ConnectionInfo, RedisConnectionInfo};
use thiserror::Error;
use tracing::info;
use tracing::level_filters::LevelFilter;

use crate::engine::{EngineConfig, DEFAULT_MAX_ATTEMPTS};
use crate::lock::LockScope;
use crate::store::{with_timeout, DocumentStore, MemoryStore, RedisStore, StoreError};
use crate::types::Monetary;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("--max-attempts must be at least 1")]
    MaxAttempts,
    #[error("--{0} must be greater than zero")]
    ZeroDuration(&'static str),
    #[error("--existence-cache-capacity must be at least 1")]
    CacheCapacity
}

const DEFAULT_STORE_PORT: u16 = 6379;

/// Command line flags, each overridable through its `LEDGER_*` environment variable.
#[derive(Debug, Clone, Parser)]
#[command(name = "wallet-ledger", version, about = "Horizontally-scalable wallet ledger")]
pub struct Config {
    /// Redis host as `host[:port]`; the in-process store is used when unset
    #[arg(long, env = "LEDGER_STORE_HOST")]
    pub store_host: Option<String>,

    #[arg(long, env = "LEDGER_STORE_USER")]
    pub store_user: Option<String>,

    #[arg(long, env = "LEDGER_STORE_PASSWORD", hide_env_values = true)]
    pub store_password: Option<String>,

    #[arg(long, env = "LEDGER_LISTEN_ADDRESS", default_value = "0.0.0.0:12000")]
    pub listen_address: SocketAddr,

    /// error, warn, info, debug or trace
    #[arg(long, env = "LEDGER_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    #[arg(long, env = "LEDGER_VAULT_ID", default_value = "vault")]
    pub vault_id: String,

    /// Starting balance of the vault wallet, created on first start only
    #[arg(long, env = "LEDGER_VAULT_BALANCE", default_value = "500")]
    pub vault_balance: Monetary,

    #[arg(long, env = "LEDGER_MAX_ATTEMPTS", default_value_t = DEFAULT_MAX_ATTEMPTS)]
    pub max_attempts: u32,

    #[arg(long, env = "LEDGER_LOCK_SCOPE", value_enum, default_value = "global")]
    pub lock_scope: LockScope,

    #[arg(long, env = "LEDGER_LOCK_TTL_MS", default_value_t = 8_000)]
    pub lock_ttl_ms: u64,

    #[arg(long, env = "LEDGER_LOCK_TIMEOUT_MS", default_value_t = 5_000)]
    pub lock_timeout_ms: u64,

    /// Pause between attempts to take a held lock
    #[arg(long, env = "LEDGER_LOCK_RETRY_MS", default_value_t = 10)]
    pub lock_retry_ms: u64,

    #[arg(long, env = "LEDGER_STORE_TIMEOUT_MS", default_value_t = 2_000)]
    pub store_timeout_ms: u64,

    #[arg(long, env = "LEDGER_EXISTENCE_CACHE_CAPACITY", default_value_t = 10_000)]
    pub existence_cache_capacity: u64
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::MaxAttempts);
        }

        for (name, value) in [
            ("lock-ttl-ms", self.lock_ttl_ms),
            ("lock-timeout-ms", self.lock_timeout_ms),
            ("lock-retry-ms", self.lock_retry_ms),
            ("store-timeout-ms", self.store_timeout_ms)
        ] {
            if value == 0 {
                return Err(ConfigError::ZeroDuration(name));
            }
        }

        if self.existence_cache_capacity == 0 {
            return Err(ConfigError::CacheCapacity);
        }

        Ok(())
    }

    pub fn log_level(&self) -> LevelFilter {
        parse_log_level(&self.log_level)
    }

    pub fn lock_ttl(&self) -> Duration {
        Duration::from_millis(self.lock_ttl_ms)
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    pub fn lock_retry_delay(&self) -> Duration {
        Duration::from_millis(self.lock_retry_ms)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            max_attempts: self.max_attempts,
            store_timeout: self.store_timeout()
        }
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            host: self.store_host.clone().filter(|host| !host.trim().is_empty()),
            user: self.store_user.clone(),
            password: self.store_password.clone(),
            timeout: self.store_timeout()
        }
    }
}

fn parse_log_level(level: &str) -> LevelFilter {
    match level.to_lowercase().as_str() {
        "trace" => LevelFilter::TRACE,
        "debug" => LevelFilter::DEBUG,
        "info" => LevelFilter::INFO,
        "warn" => LevelFilter::WARN,
        "error" => LevelFilter::ERROR,
        _ => {
            eprintln!("Invalid log level '{}', defaulting to 'info'", level);
            LevelFilter::INFO
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub host: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub timeout: Duration
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// The store selected at startup.
pub enum Backend {
    InProcess(MemoryStore),
    Redis(RedisStore)
}

impl StoreConfig {
    /// Redis address for the configured host, `None` when no host is set.
    pub fn connection_info(&self) -> Result<Option<ConnectionInfo>, StoreError> {
        let Some(host) = self.host.as_deref().map(str::trim) else {
            return Ok(None);
        };

        let (name, port) = match host.rsplit_once(':') {
            Some((name, port)) => {
                let port = port.parse::<u16>()
                    .map_err(|_| StoreError::Unavailable(format!("invalid port in store host [{host}]")))?;
                (name, port)
            }
            None => (host, DEFAULT_STORE_PORT)
        };

        Ok(Some(ConnectionInfo {
            addr: ConnectionAddr::Tcp(name.to_string(), port),
            redis: RedisConnectionInfo {
                username: self.user.clone(),
                password: self.password.clone(),
                ..Default::default()
            }
        }))
    }

    /// Connects and pings the configured store, bounded by the store timeout.
    pub async fn connect(&self) -> Result<Backend, StoreError> {
        match self.connection_info()? {
            None => {
                info!("Using in-process document store");
                let store = MemoryStore::new();
                store.ping().await?;
                Ok(Backend::InProcess(store))
            }
            Some(connection_info) => {
                info!("Connecting to store on {} with user {} ...", connection_info.addr, self.user.as_deref().unwrap_or("<none>"));
                let store = with_timeout(self.timeout, RedisStore::connect(connection_info)).await?;
                with_timeout(self.timeout, store.ping()).await?;
                Ok(Backend::Redis(store))
            }
        }
    }
}
