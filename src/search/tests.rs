use super::{SearchField, WalletSearch};
use crate::genesis::wallet_indices;
use crate::models::WalletMetadata;
use crate::store::{DocumentStore, MemoryStore, StoreError};
use crate::types::Monetary;
use crate::wallets::WalletStore;
use anyhow::Result;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

async fn create_search() -> Result<WalletSearch<MemoryStore>> {
    let store = Arc::new(MemoryStore::new());

    for index in wallet_indices() {
        store.create_index(index).await?;
    }

    let wallets = WalletStore::new(store.clone(), Duration::from_secs(1), 10);
    let people = [("ada", "Ada Lovelace", vec!["math", "savings"]), ("alan", "Alan Turing", vec!["math"]), ("grace", "Grace Hopper", vec![])];

    for (wallet_id, owner, tags) in people {
        let metadata = WalletMetadata { owner: owner.to_string(), tags: tags.into_iter().map(str::to_string).collect() };
        wallets.create(wallet_id, Monetary::zero(), metadata).await?;
    }

    store.set_if_absent("wallet:broken", json!({ "owner": "Ada", "tags": ["math"], "balance": [] })).await?;

    Ok(WalletSearch::new(store, Duration::from_secs(1)))
}

#[tokio::test]
async fn test_search_by_tag_returns_all_tagged_wallets() -> Result<()> {
    let search = create_search().await?;

    let matches = search.by_tag("math").await?;
    let ids: Vec<&str> = matches.wallets.iter().map(|wallet| wallet.wallet_id.as_str()).collect();

    assert_eq!(matches.total, 2);
    assert_eq!(ids, vec!["ada", "alan"]);

    Ok(())
}

#[tokio::test]
async fn test_search_by_owner_matches_words_case_insensitively() -> Result<()> {
    let search = create_search().await?;

    let matches = search.search(SearchField::Owner, "HOPPER").await?;

    assert_eq!(matches.total, 1);
    assert_eq!(matches.wallets[0].wallet_id, "grace");

    Ok(())
}

#[tokio::test]
async fn test_search_without_matches_is_empty() -> Result<()> {
    let search = create_search().await?;

    assert_eq!(search.search(SearchField::Tags, "crypto").await?.total, 0);

    Ok(())
}

#[tokio::test]
async fn test_search_without_indices_reports_unknown_index() {
    let search = WalletSearch::new(Arc::new(MemoryStore::new()), Duration::from_secs(1));

    assert!(matches!(search.by_tag("math").await, Err(StoreError::UnknownIndex { .. })));
}
