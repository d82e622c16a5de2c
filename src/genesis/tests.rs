use super::{wallet_indices, Genesis, GenesisError, GenesisOutcome, OWNER_INDEX, TAGS_INDEX};
use crate::models::WalletMetadata;
use crate::store::{DocumentStore, MemoryStore, SearchQuery};
use crate::types::Monetary;
use crate::wallets::WalletStore;
use anyhow::Result;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

fn create_genesis(store: Arc<MemoryStore>, vault_id: &str, balance: &str) -> Result<(Arc<WalletStore<MemoryStore>>, Genesis<MemoryStore>)> {
    let wallets = Arc::new(WalletStore::new(store.clone(), Duration::from_secs(1), 10));
    let genesis = Genesis::new(store, wallets.clone(), vault_id, Monetary::from_str(balance)?, Duration::from_secs(1));

    Ok((wallets, genesis))
}

#[tokio::test]
async fn test_genesis_creates_vault_with_starting_balance() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    let (wallets, genesis) = create_genesis(store, "vault", "500")?;

    let outcome = genesis.run().await?;

    assert!(matches!(outcome, GenesisOutcome::Created(ref vault) if vault.wallet_id == "vault"));
    assert_eq!(wallets.balance("vault").await?, Monetary::from_str("500")?);
    assert!(wallets.get("vault").await?.transactions.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_genesis_twice_keeps_a_single_vault_balance() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    let (wallets, genesis) = create_genesis(store.clone(), "vault", "500")?;
    let (_, restarted) = create_genesis(store.clone(), "vault", "500")?;

    genesis.run().await?;
    let second = restarted.run().await?;

    assert_eq!(second, GenesisOutcome::AlreadyPresent);
    assert_eq!(wallets.balance("vault").await?, Monetary::from_str("500")?);
    assert_eq!(store.search(TAGS_INDEX, &SearchQuery::Tag("any".to_string())).await?.total, 0);

    Ok(())
}

#[tokio::test]
async fn test_genesis_tolerates_existing_indices() -> Result<()> {
    let store = Arc::new(MemoryStore::new());

    for index in wallet_indices() {
        store.create_index(index).await?;
    }

    let (_, genesis) = create_genesis(store, "vault", "10")?;

    assert!(matches!(genesis.run().await?, GenesisOutcome::Created(_)));

    Ok(())
}

#[tokio::test]
async fn test_genesis_rejects_invalid_vault_configuration() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    let (_, empty_id) = create_genesis(store.clone(), "", "500")?;
    let (_, zero_balance) = create_genesis(store.clone(), "vault", "0")?;
    let (_, negative_balance) = create_genesis(store.clone(), "vault", "-1")?;

    assert!(matches!(empty_id.run().await, Err(GenesisError::EmptyVaultId)));
    assert!(matches!(zero_balance.run().await, Err(GenesisError::InvalidStartingBalance(_))));
    assert!(matches!(negative_balance.run().await, Err(GenesisError::InvalidStartingBalance(_))));
    assert!(!store.exists("wallet:vault").await?);

    Ok(())
}

#[tokio::test]
async fn test_genesis_indices_serve_wallet_search() -> Result<()> {
    let store = Arc::new(MemoryStore::new());
    let (wallets, genesis) = create_genesis(store.clone(), "vault", "500")?;
    genesis.run().await?;

    let metadata = WalletMetadata { owner: "Grace Hopper".to_string(), tags: vec!["navy".to_string()] };
    wallets.create("grace", Monetary::zero(), metadata).await?;

    assert_eq!(store.search(OWNER_INDEX, &SearchQuery::Text("hopper".to_string())).await?.total, 1);
    assert_eq!(store.search(TAGS_INDEX, &SearchQuery::Tag("navy".to_string())).await?.total, 1);

    Ok(())
}
