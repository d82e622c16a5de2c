use super::{Backend, Config, ConfigError};
use crate::lock::LockScope;
use anyhow::Result;
use clap::Parser;
use redis::ConnectionAddr;
use std::time::Duration;
use tracing::level_filters::LevelFilter;

#[test]
fn test_flags_override_defaults() -> Result<()> {
    let config = Config::try_parse_from([
        "wallet-ledger",
        "--listen-address", "127.0.0.1:9000",
        "--vault-id", "treasury",
        "--vault-balance", "1000.5",
        "--max-attempts", "5",
        "--lock-scope", "wallet-pair",
        "--store-timeout-ms", "250",
        "--log-level", "DEBUG",
    ])?;

    assert_eq!(config.listen_address.port(), 9000);
    assert_eq!(config.vault_id, "treasury");
    assert_eq!(config.vault_balance.to_string(), "1000.5000");
    assert_eq!(config.lock_scope, LockScope::WalletPair);
    assert_eq!(config.log_level(), LevelFilter::DEBUG);
    assert_eq!(config.engine_config().max_attempts, 5);
    assert_eq!(config.engine_config().store_timeout, Duration::from_millis(250));
    assert!(config.validate().is_ok());

    Ok(())
}

#[test]
fn test_invalid_values_are_rejected() -> Result<()> {
    assert!(Config::try_parse_from(["wallet-ledger", "--vault-balance", "abc"]).is_err());
    assert!(Config::try_parse_from(["wallet-ledger", "--vault-balance", "1.00001"]).is_err());
    assert!(Config::try_parse_from(["wallet-ledger", "--lock-scope", "per-table"]).is_err());

    let zero_attempts = Config::try_parse_from(["wallet-ledger", "--max-attempts", "0"])?;
    let zero_timeout = Config::try_parse_from(["wallet-ledger", "--lock-timeout-ms", "0"])?;

    assert_eq!(zero_attempts.validate(), Err(ConfigError::MaxAttempts));
    assert_eq!(zero_timeout.validate(), Err(ConfigError::ZeroDuration("lock-timeout-ms")));

    Ok(())
}

#[test]
fn test_unknown_log_level_falls_back_to_info() -> Result<()> {
    let config = Config::try_parse_from(["wallet-ledger", "--log-level", "loud"])?;

    assert_eq!(config.log_level(), LevelFilter::INFO);

    Ok(())
}

#[test]
fn test_blank_store_host_selects_in_process_store() -> Result<()> {
    let config = Config::try_parse_from(["wallet-ledger", "--store-host", " ", "--store-user", "ledger"])?;

    assert_eq!(config.store_config().host, None);
    assert_eq!(config.store_config().user.as_deref(), Some("ledger"));

    Ok(())
}

#[test]
fn test_store_host_becomes_redis_address() -> Result<()> {
    let config = Config::try_parse_from([
        "wallet-ledger",
        "--store-host", "redis.internal:6380",
        "--store-user", "ledger",
        "--store-password", "secret",
    ])?;
    let store = config.store_config();
    let info = store.connection_info()?.ok_or_else(|| anyhow::anyhow!("no connection info"))?;

    assert_eq!(info.addr, ConnectionAddr::Tcp("redis.internal".to_string(), 6380));
    assert_eq!(info.redis.username.as_deref(), Some("ledger"));
    assert_eq!(info.redis.password.as_deref(), Some("secret"));
    assert!(!format!("{store:?}").contains("secret"));

    let default_port = Config::try_parse_from(["wallet-ledger", "--store-host", "redis"])?;
    let info = default_port.store_config().connection_info()?.ok_or_else(|| anyhow::anyhow!("no connection info"))?;

    assert_eq!(info.addr, ConnectionAddr::Tcp("redis".to_string(), 6379));

    let bad_port = Config::try_parse_from(["wallet-ledger", "--store-host", "redis:http"])?;

    assert!(bad_port.store_config().connection_info().is_err());

    Ok(())
}

#[tokio::test]
async fn test_missing_store_host_connects_in_process() -> Result<()> {
    let config = Config::try_parse_from(["wallet-ledger"])?;

    assert!(matches!(config.store_config().connect().await?, Backend::InProcess(_)));

    Ok(())
}

#[tokio::test]
async fn test_unreachable_store_host_fails_fast() -> Result<()> {
    let config = Config::try_parse_from(["wallet-ledger", "--store-host", "127.0.0.1:1", "--store-timeout-ms", "500"])?;

    assert!(config.store_config().connect().await.is_err());

    Ok(())
}
