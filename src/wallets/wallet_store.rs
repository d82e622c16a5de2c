use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tracing::{debug, info};

use crate::models::{Wallet, WalletError, WalletMetadata, BALANCE_PATH};
use crate::store::{with_timeout, DocumentStore, StoreError};
use crate::types::{Monetary, WalletId};

/// Wallet lifecycle on top of a [`DocumentStore`].
///
/// Wallets are never deleted, so positive existence answers are cached; negative answers
/// always go back to the store.
pub struct WalletStore<S> {
    store: Arc<S>,
    known: Cache<WalletId, ()>,
    timeout: Duration
}

fn validate(wallet_id: &str) -> Result<(), WalletError> {
    if wallet_id.trim().is_empty() {
        return Err(WalletError::InvalidWalletId);
    }

    Ok(())
}

impl<S: DocumentStore> WalletStore<S> {
    pub fn new(store: Arc<S>, timeout: Duration, cache_capacity: u64) -> Self {
        Self {
            store,
            known: Cache::new(cache_capacity),
            timeout
        }
    }

    pub async fn exists(&self, wallet_id: &str) -> Result<bool, WalletError> {
        validate(wallet_id)?;

        if self.known.contains_key(wallet_id) {
            return Ok(true);
        }

        let exists = with_timeout(self.timeout, self.store.exists(&Wallet::store_key(wallet_id))).await?;

        if exists {
            self.known.insert(wallet_id.to_string(), ()).await;
        }

        Ok(exists)
    }

    /// Creates the wallet with an empty transaction list.
    ///
    /// The existence check and the write are one conditional store call, so two racing
    /// creators cannot both succeed.
    ///
    /// # Errors
    /// Returns `WalletError::WalletExists` if the id is taken; the stored wallet is left as it was.
    pub async fn create(&self, wallet_id: &str, initial_balance: Monetary, metadata: WalletMetadata) -> Result<Wallet, WalletError> {
        validate(wallet_id)?;

        let wallet = Wallet::new(wallet_id, initial_balance, metadata);
        let document = serde_json::to_value(&wallet).map_err(StoreError::from)?;
        let created = with_timeout(self.timeout, self.store.set_if_absent(&wallet.key(), document)).await?;

        self.known.insert(wallet_id.to_string(), ()).await;

        if !created {
            info!("Wallet [{wallet_id}] already exists, aborting");
            return Err(WalletError::exists(wallet_id));
        }

        info!("Successfully created wallet [{wallet_id}] with starting balance {initial_balance}");

        Ok(wallet)
    }

    pub async fn balance(&self, wallet_id: &str) -> Result<Monetary, WalletError> {
        validate(wallet_id)?;

        let value = match with_timeout(self.timeout, self.store.get(&Wallet::store_key(wallet_id), BALANCE_PATH)).await {
            Ok(value) => value,
            Err(StoreError::NotFound { .. }) => return Err(WalletError::not_found(wallet_id)),
            Err(error) => return Err(error.into())
        };

        debug!("Read balance {value} for wallet [{wallet_id}]");

        serde_json::from_value(value).map_err(|error| StoreError::from(error).into())
    }

    pub async fn get(&self, wallet_id: &str) -> Result<Wallet, WalletError> {
        validate(wallet_id)?;

        let value = match with_timeout(self.timeout, self.store.get(&Wallet::store_key(wallet_id), "$")).await {
            Ok(value) => value,
            Err(StoreError::NotFound { .. }) => return Err(WalletError::not_found(wallet_id)),
            Err(error) => return Err(error.into())
        };

        serde_json::from_value(value).map_err(|error| StoreError::from(error).into())
    }
}
