//! Wallet discovery by owner text or tag. Serves lookups only, never balance truth.

#[cfg(test)]
mod tests;

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::genesis::{OWNER_INDEX, TAGS_INDEX};
use crate::models::Wallet;
use crate::store::{with_timeout, DocumentStore, SearchQuery, StoreError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchField {
    #[default]
    Tags,
    Owner
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WalletMatches {
    pub total: usize,
    pub wallets: Vec<Wallet>
}

pub struct WalletSearch<S> {
    store: Arc<S>,
    timeout: Duration
}

impl<S: DocumentStore> WalletSearch<S> {
    pub fn new(store: Arc<S>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    pub async fn search(&self, field: SearchField, query: &str) -> Result<WalletMatches, StoreError> {
        match field {
            SearchField::Tags => self.by_tag(query).await,
            SearchField::Owner => self.by_owner(query).await
        }
    }

    pub async fn by_owner(&self, text: &str) -> Result<WalletMatches, StoreError> {
        self.query(OWNER_INDEX, SearchQuery::Text(text.to_string())).await
    }

    pub async fn by_tag(&self, tag: &str) -> Result<WalletMatches, StoreError> {
        self.query(TAGS_INDEX, SearchQuery::Tag(tag.to_string())).await
    }

    async fn query(&self, index: &str, query: SearchQuery) -> Result<WalletMatches, StoreError> {
        let result = with_timeout(self.timeout, self.store.search(index, &query)).await?;

        let wallets: Vec<Wallet> = result.documents.into_iter()
            .filter_map(|(key, document)| match serde_json::from_value(document) {
                Ok(wallet) => Some(wallet),
                Err(error) => {
                    warn!("Skipping malformed wallet document [{key}]: {error}");
                    None
                }
            })
            .collect();

        Ok(WalletMatches { total: wallets.len(), wallets })
    }
}
