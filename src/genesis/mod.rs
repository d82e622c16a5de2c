//! One-time bootstrap: search indices plus the vault wallet holding the initial supply.

#[cfg(test)]
mod tests;

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info};

use crate::models::{Wallet, WalletError, WalletMetadata, WALLET_KEY_PREFIX};
use crate::store::{with_timeout, DocumentStore, FieldType, IndexDefinition, StoreError};
use crate::types::{Monetary, WalletId};
use crate::wallets::WalletStore;

pub const OWNER_INDEX: &str = "idx:wallet:owner";
pub const TAGS_INDEX: &str = "idx:wallet:tags";

#[derive(Debug, Error)]
pub enum GenesisError {
    #[error("Could not process genesis with an empty vault id")]
    EmptyVaultId,
    #[error("Could not process genesis with non-positive starting balance {0}")]
    InvalidStartingBalance(Monetary),
    #[error("Could not create index [{index}]: {reason}")]
    Index {
        index: String,
        #[source]
        reason: StoreError
    },
    #[error(transparent)]
    Wallet(#[from] WalletError)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenesisOutcome {
    Created(Wallet),
    AlreadyPresent
}

/// Index definitions used by wallet search.
pub fn wallet_indices() -> Vec<IndexDefinition> {
    vec![
        IndexDefinition {
            name: OWNER_INDEX.to_string(),
            prefix: WALLET_KEY_PREFIX.to_string(),
            field: "owner".to_string(),
            path: "$.owner".to_string(),
            field_type: FieldType::Text
        },
        IndexDefinition {
            name: TAGS_INDEX.to_string(),
            prefix: WALLET_KEY_PREFIX.to_string(),
            field: "tags".to_string(),
            path: "$.tags.*".to_string(),
            field_type: FieldType::Tag
        },
    ]
}

pub struct Genesis<S> {
    store: Arc<S>,
    wallets: Arc<WalletStore<S>>,
    vault_id: WalletId,
    starting_balance: Monetary,
    timeout: Duration
}

impl<S: DocumentStore> Genesis<S> {
    pub fn new(store: Arc<S>, wallets: Arc<WalletStore<S>>, vault_id: &str, starting_balance: Monetary, timeout: Duration) -> Self {
        Self {
            store,
            wallets,
            vault_id: vault_id.to_string(),
            starting_balance,
            timeout
        }
    }

    /// Safe to run on every start: existing indices and an existing vault are left alone.
    pub async fn run(&self) -> Result<GenesisOutcome, GenesisError> {
        if self.vault_id.trim().is_empty() {
            return Err(GenesisError::EmptyVaultId);
        }

        if !self.starting_balance.is_positive() {
            return Err(GenesisError::InvalidStartingBalance(self.starting_balance));
        }

        for index in wallet_indices() {
            self.create_index(index).await?;
        }

        if self.wallets.exists(&self.vault_id).await? {
            info!("Vault wallet [{}] already exists, skipping genesis", self.vault_id);
            return Ok(GenesisOutcome::AlreadyPresent);
        }

        match self.wallets.create(&self.vault_id, self.starting_balance, WalletMetadata::default()).await {
            Ok(vault) => {
                info!("Genesis created vault wallet [{}] with {}", vault.wallet_id, vault.balance);
                Ok(GenesisOutcome::Created(vault))
            }
            Err(WalletError::WalletExists { .. }) => Ok(GenesisOutcome::AlreadyPresent),
            Err(error) => Err(error.into())
        }
    }

    async fn create_index(&self, index: IndexDefinition) -> Result<(), GenesisError> {
        let name = index.name.clone();

        match with_timeout(self.timeout, self.store.create_index(index)).await {
            Ok(()) => {
                info!("Created index [{name}]");
                Ok(())
            }
            Err(StoreError::IndexExists { .. }) => {
                debug!("Index [{name}] already exists");
                Ok(())
            }
            Err(reason) => Err(GenesisError::Index { index: name, reason })
        }
    }
}
