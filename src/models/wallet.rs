use serde::{Deserialize, Serialize};

use crate::models::Transaction;
use crate::types::{Monetary, WalletId};

pub const WALLET_KEY_PREFIX: &str = "wallet:";
pub const BALANCE_PATH: &str = "$.balance";
pub const TRANSACTIONS_PATH: &str = "$.transactions";

/// A wallet document, stored under `wallet:<id>`.
///
/// `balance` always equals the sum of the `transactions` amounts, plus the genesis
/// balance for the vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    /// Chosen by the creator, never generated.
    pub wallet_id: WalletId,
    /// Mirrored entries in commit order; debits carry a negated amount.
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    #[serde(default)]
    pub balance: Monetary,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub tags: Vec<String>
}

/// Descriptive fields indexed for search. Not part of any balance invariant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletMetadata {
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub tags: Vec<String>
}

impl Wallet {
    pub fn new(wallet_id: &str, balance: Monetary, metadata: WalletMetadata) -> Self {
        Self {
            wallet_id: wallet_id.to_string(),
            transactions: Vec::new(),
            balance,
            owner: metadata.owner,
            tags: metadata.tags
        }
    }

    pub fn store_key(wallet_id: &str) -> String {
        format!("{WALLET_KEY_PREFIX}{wallet_id}")
    }

    pub fn key(&self) -> String {
        Self::store_key(&self.wallet_id)
    }

    /// Sum of the recorded entries, `None` on overflow.
    #[cfg(test)]
    pub fn recorded_total(&self) -> Option<Monetary> {
        self.transactions.iter()
            .try_fold(Monetary::zero(), |total, transaction| total.checked_add(transaction.amount))
    }
}
